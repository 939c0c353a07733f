//! Expression arbitration (§4.6): turns planner-supplied emote/gesture
//! intents into face commands, subject to conversation-state suppression,
//! alias normalization, and per-mood intensity clamping.

use companion_common::gesture::Gesture;
use companion_common::mood::Mood;

use crate::robot_state::ConversationState;

/// A planner's raw request for this tick, before normalization.
#[derive(Debug, Clone, Default)]
pub struct ExpressionIntent {
    pub mood_name: Option<String>,
    pub intensity: f32,
    pub gesture_name: Option<String>,
}

/// The arbitrated result: what, if anything, should actually be sent to
/// the Face MCU this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArbitratedExpression {
    pub mood: Option<(Mood, f32)>,
    pub gesture: Option<Gesture>,
}

/// Stateful arbitration layer. Owns the unknown-name counter across ticks.
#[derive(Debug, Clone, Default)]
pub struct Arbiter {
    unknown_expr_count: u64,
}

impl Arbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running count of planner expression names that matched no alias.
    #[inline]
    pub fn unknown_expr_count(&self) -> u64 {
        self.unknown_expr_count
    }

    /// Arbitrate one tick's planner intent against the current conversation
    /// state (§4.6). Unknown names are discarded and bump the counter but
    /// never reject the whole intent — a bad gesture name alongside a
    /// valid mood still produces the mood.
    pub fn arbitrate(
        &mut self,
        intent: &ExpressionIntent,
        conversation_state: ConversationState,
    ) -> ArbitratedExpression {
        match conversation_state {
            // The conversation pipeline owns the face entirely.
            ConversationState::Listening | ConversationState::Speaking => {
                ArbitratedExpression::default()
            }
            ConversationState::Thinking => ArbitratedExpression {
                mood: Some((Mood::Thinking, Mood::Thinking.clamp_intensity(1.0))),
                gesture: None,
            },
            ConversationState::Idle => {
                let mood = intent.mood_name.as_deref().and_then(|name| {
                    match Mood::from_alias(name) {
                        Some(mood) => Some((mood, mood.clamp_intensity(intent.intensity))),
                        None => {
                            self.unknown_expr_count += 1;
                            None
                        }
                    }
                });
                let gesture = intent.gesture_name.as_deref().and_then(|name| {
                    match Gesture::from_alias(name) {
                        Some(gesture) => Some(gesture),
                        None => {
                            self.unknown_expr_count += 1;
                            None
                        }
                    }
                });
                ArbitratedExpression { mood, gesture }
            }
        }
    }
}
