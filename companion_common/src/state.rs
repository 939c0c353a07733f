//! Mode/fault state machine for the supervisor core.
//!
//! Global lifecycle: BOOT → IDLE ↔ TELEOP/WANDER, with any state collapsing
//! to ERROR on disconnect or a blocking fault, and ERROR recovering to IDLE
//! once faults clear and recovery is requested.

use crate::fault::FaultSet;
use serde::{Deserialize, Serialize};

/// Supervisor operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Power-on, before the Reflex link has been confirmed.
    Boot,
    /// Connected, idle, no active motion driver.
    Idle,
    /// Motion commanded directly by API-supplied desired twists.
    Teleop,
    /// Motion commanded by the onboard wander skill.
    Wander,
    /// Blocking fault or disconnect; commanded twist forced to zero.
    Error,
}

/// Result of a [`ModeStateMachine::handle_event`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded — new mode.
    Ok(Mode),
    /// Transition rejected — reason.
    Rejected(&'static str),
}

/// Event considered by the mode state machine on a single tick.
///
/// Built fresh each tick from device connection state, the current fault
/// set, and the last API request — the state machine itself holds no
/// knowledge of telemetry staleness or transport health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeEvent {
    pub reflex_connected: bool,
    pub face_connected: bool,
    pub faults: FaultSet,
    pub requested_mode: Option<RequestedMode>,
    pub clear_error: bool,
}

/// Mode requested by the web API. A request for a mode unreachable from
/// the current state is rejected, not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedMode {
    Idle,
    Teleop,
    Wander,
}

/// Mode/fault state machine (§3.2 of the control core).
#[derive(Debug, Clone)]
pub struct ModeStateMachine {
    mode: Mode,
}

impl Default for ModeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeStateMachine {
    /// Create a new state machine in BOOT.
    pub const fn new() -> Self {
        Self { mode: Mode::Boot }
    }

    /// Current mode.
    #[inline]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Advance the state machine by one tick's worth of inputs.
    ///
    /// Rule order mirrors the specification: any state collapses to ERROR
    /// first; only once that guard clears do forward transitions apply.
    pub fn handle_event(&mut self, event: ModeEvent) -> TransitionResult {
        // Rule 1: any → ERROR on disconnect or blocking fault.
        if !event.reflex_connected || event.faults.forces_error() {
            self.mode = Mode::Error;
            return TransitionResult::Ok(Mode::Error);
        }

        let next = match (self.mode, event.requested_mode, event.clear_error) {
            // Rule 2: ERROR → IDLE once recovery is requested and clear.
            (Mode::Error, _, true) if event.faults.clear_of_latching() => Mode::Idle,
            (Mode::Error, _, _) => {
                return TransitionResult::Rejected(
                    "ERROR: clear_error requires faults clear of latching bits",
                );
            }

            // Rule 3: BOOT → IDLE once connected with no blocking faults.
            (Mode::Boot, _, _) => Mode::Idle,

            // IDLE/TELEOP/WANDER can move between each other on request.
            (_, Some(RequestedMode::Idle), _) => Mode::Idle,
            (_, Some(RequestedMode::Teleop), _) => Mode::Teleop,
            (_, Some(RequestedMode::Wander), _) => Mode::Wander,

            // No request: hold current mode.
            (current, None, _) => current,
        };

        self.mode = next;
        TransitionResult::Ok(next)
    }

    /// True while motion commands from a mode driver are meaningful.
    #[inline]
    pub const fn allows_motion(&self) -> bool {
        matches!(self.mode, Mode::Teleop | Mode::Wander)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_no_faults() -> ModeEvent {
        ModeEvent {
            reflex_connected: true,
            face_connected: true,
            faults: FaultSet::empty(),
            requested_mode: None,
            clear_error: false,
        }
    }

    #[test]
    fn boot_then_idle() {
        let mut sm = ModeStateMachine::new();
        let result = sm.handle_event(connected_no_faults());
        assert_eq!(result, TransitionResult::Ok(Mode::Idle));
        assert_eq!(sm.mode(), Mode::Idle);
    }

    #[test]
    fn estop_forces_error_from_any_mode() {
        let mut sm = ModeStateMachine::new();
        sm.handle_event(connected_no_faults());
        sm.handle_event(ModeEvent {
            requested_mode: Some(RequestedMode::Teleop),
            ..connected_no_faults()
        });
        assert_eq!(sm.mode(), Mode::Teleop);

        let result = sm.handle_event(ModeEvent {
            faults: FaultSet::ESTOP,
            ..connected_no_faults()
        });
        assert_eq!(result, TransitionResult::Ok(Mode::Error));
    }

    #[test]
    fn disconnect_forces_error() {
        let mut sm = ModeStateMachine::new();
        sm.handle_event(connected_no_faults());
        let result = sm.handle_event(ModeEvent {
            reflex_connected: false,
            ..connected_no_faults()
        });
        assert_eq!(result, TransitionResult::Ok(Mode::Error));
    }

    #[test]
    fn error_recovers_to_idle_once_clear() {
        let mut sm = ModeStateMachine::new();
        sm.handle_event(connected_no_faults());
        sm.handle_event(ModeEvent {
            faults: FaultSet::ESTOP,
            ..connected_no_faults()
        });
        assert_eq!(sm.mode(), Mode::Error);

        // Still latched: clear_error alone is not enough.
        let rejected = sm.handle_event(ModeEvent {
            faults: FaultSet::ESTOP,
            clear_error: true,
            ..connected_no_faults()
        });
        assert!(matches!(rejected, TransitionResult::Rejected(_)));

        let result = sm.handle_event(ModeEvent {
            clear_error: true,
            ..connected_no_faults()
        });
        assert_eq!(result, TransitionResult::Ok(Mode::Idle));
    }

    #[test]
    fn obstacle_alone_does_not_force_error() {
        let mut sm = ModeStateMachine::new();
        sm.handle_event(connected_no_faults());
        sm.handle_event(ModeEvent {
            requested_mode: Some(RequestedMode::Wander),
            ..connected_no_faults()
        });
        let result = sm.handle_event(ModeEvent {
            faults: FaultSet::OBSTACLE,
            ..connected_no_faults()
        });
        assert_eq!(result, TransitionResult::Ok(Mode::Wander));
    }

    #[test]
    fn allows_motion_only_in_teleop_or_wander() {
        let mut sm = ModeStateMachine::new();
        assert!(!sm.allows_motion());
        sm.handle_event(connected_no_faults());
        assert!(!sm.allows_motion());
        sm.handle_event(ModeEvent {
            requested_mode: Some(RequestedMode::Teleop),
            ..connected_no_faults()
        });
        assert!(sm.allows_motion());
    }
}
