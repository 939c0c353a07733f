//! Connection fallback policy (§4.10): tracks the
//! `Normal -> ConfusedRetry -> SkippedThisTurn` degradation ladder for
//! mid-turn planner failures, in the same small event/state style as
//! `companion_common::state`'s mode machine.

use companion_ipc::data::PlannerConnectionState;

/// Input to the fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackEvent {
    /// A `/plan` (or `/converse`) round-trip failed.
    RequestFailed,
    /// A round-trip succeeded.
    RequestSucceeded,
}

/// Tracks connection degradation across consecutive planner failures.
///
/// One failure clears queued speech and briefly shows "confused"
/// (`ConfusedRetry`); the next failure after that gives up silently for
/// the turn (`SkippedThisTurn`). Any success resets to `Normal`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPolicy {
    state: PlannerConnectionState,
}

impl FallbackPolicy {
    /// Start in the `Normal` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current connection state.
    pub fn state(&self) -> PlannerConnectionState {
        self.state
    }

    /// Apply an event, returning the resulting state.
    pub fn handle_event(&mut self, event: FallbackEvent) -> PlannerConnectionState {
        self.state = match (self.state, event) {
            (_, FallbackEvent::RequestSucceeded) => PlannerConnectionState::Normal,
            (PlannerConnectionState::Normal, FallbackEvent::RequestFailed) => {
                PlannerConnectionState::ConfusedRetry
            }
            (PlannerConnectionState::ConfusedRetry, FallbackEvent::RequestFailed) => {
                PlannerConnectionState::SkippedThisTurn
            }
            (PlannerConnectionState::SkippedThisTurn, FallbackEvent::RequestFailed) => {
                PlannerConnectionState::SkippedThisTurn
            }
        };
        self.state
    }
}
