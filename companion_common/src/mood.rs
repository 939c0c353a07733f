//! Canonical mood vocabulary and per-mood intensity clamping.
//!
//! Mood intensity clamps are enforced here, in the expression arbitration
//! layer, and not re-checked by the face client — positive moods can run
//! brighter than negative ones so the robot never reads as more distressed
//! than the situation warrants.

use serde::{Deserialize, Serialize};

/// One of the thirteen canonical moods, matching the `mood u8` wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mood {
    Neutral = 0,
    Happy = 1,
    Excited = 2,
    Curious = 3,
    Sad = 4,
    Scared = 5,
    Angry = 6,
    Surprised = 7,
    Sleepy = 8,
    Love = 9,
    Silly = 10,
    Thinking = 11,
    Confused = 12,
}

impl Mood {
    /// Wire-level byte value.
    #[inline]
    pub const fn wire_id(self) -> u8 {
        self as u8
    }

    /// Maximum intensity this mood may be commanded at.
    ///
    /// Positive moods run brighter; SAD/CONFUSED/SURPRISED are capped
    /// lower, ANGRY lower still, and SCARED lowest of the negative set.
    pub const fn max_intensity(self) -> f32 {
        match self {
            Self::Sad | Self::Confused | Self::Surprised => 0.6,
            Self::Angry => 0.4,
            Self::Scared => 0.5,
            _ => 0.9,
        }
    }

    /// Clamp a requested intensity to this mood's allowed ceiling.
    /// Negative intensities clamp to zero.
    #[must_use]
    pub fn clamp_intensity(self, requested: f32) -> f32 {
        requested.clamp(0.0, self.max_intensity())
    }

    /// Normalize an incoming planner-supplied mood name through the alias
    /// table. Returns `None` for names with no known mapping.
    pub fn from_alias(name: &str) -> Option<Self> {
        let canonical = match name.to_ascii_lowercase().as_str() {
            "neutral" => Self::Neutral,
            "happy" => Self::Happy,
            "excited" => Self::Excited,
            "curious" => Self::Curious,
            "sad" => Self::Sad,
            "scared" | "afraid" => Self::Scared,
            "angry" | "mad" => Self::Angry,
            "surprised" => Self::Surprised,
            "sleepy" | "tired" => Self::Sleepy,
            "love" | "loving" => Self::Love,
            "silly" | "goofy" => Self::Silly,
            "thinking" => Self::Thinking,
            "confused" | "puzzled" => Self::Confused,
            _ => return None,
        };
        Some(canonical)
    }
}
