//! Canonical gesture vocabulary, matching the `gesture u8` wire values.

use serde::{Deserialize, Serialize};

/// One of the thirteen canonical gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Gesture {
    Blink = 0,
    WinkLeft = 1,
    WinkRight = 2,
    Confused = 3,
    Laugh = 4,
    Surprise = 5,
    Heart = 6,
    XEyes = 7,
    Sleepy = 8,
    Rage = 9,
    Nod = 10,
    Headshake = 11,
    Wiggle = 12,
}

impl Gesture {
    /// Wire-level byte value.
    #[inline]
    pub const fn wire_id(self) -> u8 {
        self as u8
    }

    /// Normalize an incoming planner-supplied gesture name through the
    /// alias table. Returns `None` for names with no known mapping.
    pub fn from_alias(name: &str) -> Option<Self> {
        let canonical = match name.to_ascii_lowercase().as_str() {
            "blink" => Self::Blink,
            "wink-l" | "wink_left" | "winkl" => Self::WinkLeft,
            "wink-r" | "wink_right" | "winkr" => Self::WinkRight,
            "confused" => Self::Confused,
            "laugh" => Self::Laugh,
            "surprise" => Self::Surprise,
            "heart" => Self::Heart,
            "x-eyes" | "xeyes" => Self::XEyes,
            "sleepy" => Self::Sleepy,
            "rage" => Self::Rage,
            "nod" => Self::Nod,
            "head-shake" | "headshake" | "shake" => Self::Headshake,
            "wiggle" => Self::Wiggle,
            _ => return None,
        };
        Some(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_ids_match_spec_table() {
        assert_eq!(Gesture::Blink.wire_id(), 0);
        assert_eq!(Gesture::Wiggle.wire_id(), 12);
    }

    #[test]
    fn alias_normalizes_head_shake_to_headshake() {
        assert_eq!(Gesture::from_alias("head-shake"), Some(Gesture::Headshake));
    }

    #[test]
    fn alias_unknown_name_is_none() {
        assert_eq!(Gesture::from_alias("moonwalk"), None);
    }
}
