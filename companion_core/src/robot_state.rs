//! The tick-published snapshot and per-transport diagnostics.
//!
//! `RobotState` is owned exclusively by the control loop; published copies
//! reach the web layer through a `tokio::sync::watch` channel rather than
//! shared memory, since both live in the same process (§5).

use companion_common::fault::FaultSet;
use companion_common::state::Mode;
use companion_common::twist::Twist;
use companion_common::wire::{FaceStatus, ReflexState};
use serde::{Deserialize, Serialize};

/// Per-transport link health counters, surfaced in `RobotState` and read by
/// `companion_diagnostic`. Defined in `companion_common` so the device
/// clients in `companion_link` (which populate the byte/frame counters)
/// and the control loop (which owns `frames_ok`) share one type.
pub use companion_common::diagnostics::Diagnostics;

/// Conversation state driving expression arbitration (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConversationState {
    #[default]
    Idle,
    Listening,
    Thinking,
    Speaking,
}

/// Last-known Reflex telemetry, decorated with local receive timestamps.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReflexTelemetrySnapshot {
    pub state: ReflexState,
    pub t_src_us: u64,
    pub t_pi_rx_ns: u64,
}

/// Last-known Face telemetry, decorated with local receive timestamps.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FaceStatusSnapshot {
    pub status: FaceStatus,
    pub t_src_us: u64,
    pub t_pi_rx_ns: u64,
}

/// The tick-published snapshot (§3). `Clone`, never `Copy` — it owns
/// growable diagnostic strings.
///
/// Serialize-only: `safety_tag` is a `&'static str` borrowed from gate
/// constants, which cannot round-trip through `Deserialize`. Nothing in
/// this workspace deserializes a `RobotState` — it is always built fresh by
/// the control loop and only ever serialized outward to the web layer.
#[derive(Debug, Clone, Serialize)]
pub struct RobotState {
    pub mode: Mode,
    pub reflex_connected: bool,
    pub face_connected: bool,
    pub planner_connected: bool,
    pub faults: FaultSet,
    pub last_reflex_telemetry: Option<ReflexTelemetrySnapshot>,
    pub last_face_status: Option<FaceStatusSnapshot>,
    pub commanded_twist: Twist,
    pub desired_twist: Twist,
    pub safety_scale: f32,
    pub safety_tag: Option<&'static str>,
    pub conversation_state: ConversationState,
    pub unknown_expr_count: u64,
    pub reflex_diagnostics: Diagnostics,
    pub face_diagnostics: Diagnostics,
    pub tick_overruns: u64,
    pub session_started_ns: u64,
    pub session_duration_s: u64,
}

impl RobotState {
    /// A fresh, not-yet-connected snapshot stamped with the session start.
    pub fn new(session_started_ns: u64) -> Self {
        Self {
            mode: Mode::Boot,
            reflex_connected: false,
            face_connected: false,
            planner_connected: false,
            faults: FaultSet::empty(),
            last_reflex_telemetry: None,
            last_face_status: None,
            commanded_twist: Twist::ZERO,
            desired_twist: Twist::ZERO,
            safety_scale: 1.0,
            safety_tag: None,
            conversation_state: ConversationState::Idle,
            unknown_expr_count: 0,
            reflex_diagnostics: Diagnostics::default(),
            face_diagnostics: Diagnostics::default(),
            tick_overruns: 0,
            session_started_ns,
            session_duration_s: 0,
        }
    }

    /// Invariant check used by tests and debug assertions: when in ERROR,
    /// the commanded twist must be zero (§3).
    pub fn upholds_error_invariant(&self) -> bool {
        self.mode != Mode::Error || self.commanded_twist.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_boot_and_disconnected() {
        let state = RobotState::new(0);
        assert_eq!(state.mode, Mode::Boot);
        assert!(!state.reflex_connected);
        assert!(state.commanded_twist.is_zero());
    }

    #[test]
    fn error_invariant_holds_when_twist_zero() {
        let mut state = RobotState::new(0);
        state.mode = Mode::Error;
        assert!(state.upholds_error_invariant());
        state.commanded_twist = Twist::new(10, 0);
        assert!(!state.upholds_error_invariant());
    }
}
