//! Shared message types for the Reflex and Face wire protocols.
//!
//! These are the logical (already-decoded) command and telemetry shapes.
//! Byte-level framing, CRC, and COBS stuffing live in `companion_link`;
//! this module only fixes the field layout both ends agree on so the
//! codec and its callers share one definition.

use crate::gesture::Gesture;
use crate::mood::Mood;
use serde::{Deserialize, Serialize};

/// Commands the supervisor core sends to the Reflex MCU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReflexCommand {
    /// `0x10 SET_TWIST`.
    SetTwist { v_mm_s: i16, w_mrad_s: i16 },
    /// `0x11 STOP`.
    Stop { reason: u8 },
    /// `0x12 ESTOP`.
    Estop,
    /// `0x14 CLEAR_FAULTS`.
    ClearFaults { mask: u16 },
    /// `0x15 SET_CONFIG`.
    SetConfig { param_id: u8, value: u32 },
}

impl ReflexCommand {
    /// Wire command id byte.
    pub const fn opcode(&self) -> u8 {
        match self {
            Self::SetTwist { .. } => 0x10,
            Self::Stop { .. } => 0x11,
            Self::Estop => 0x12,
            Self::ClearFaults { .. } => 0x14,
            Self::SetConfig { .. } => 0x15,
        }
    }
}

/// `0x80 STATE` telemetry from the Reflex MCU (13-byte payload).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReflexState {
    pub speed_l_mm_s: i16,
    pub speed_r_mm_s: i16,
    pub gyro_z_mrad_s: i16,
    pub battery_mv: u16,
    pub faults_mask: u16,
    pub range_mm: u16,
    pub range_status: RangeStatus,
}

/// Status byte accompanying a range sample.
///
/// The range gate treats `Valid` and `Warn` alike (both carry a trustworthy
/// reading); `Stale` is distinct from `SensorFault` — a stale reading is
/// one the MCU simply hasn't refreshed, not one it has flagged as bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum RangeStatus {
    #[default]
    Valid = 0,
    OutOfRange = 1,
    SensorFault = 2,
    /// Reading degraded (e.g. marginal echo) but still usable for gating.
    Warn = 3,
    /// MCU has not refreshed this reading within its own sample window.
    Stale = 4,
}

/// System mode mirrored on the face display, per `SET_SYSTEM`/`FACE_STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum FaceSystemMode {
    #[default]
    None = 0,
    Booting = 1,
    ErrorDisplay = 2,
    LowBattery = 3,
    Updating = 4,
    ShuttingDown = 5,
}

/// Commands the supervisor core sends to the Face MCU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceCommand {
    /// `0x20 SET_STATE`.
    SetState {
        mood: Mood,
        intensity: u8,
        gaze_x_i8: i8,
        gaze_y_i8: i8,
        brightness: u8,
    },
    /// `0x21 GESTURE`.
    Gesture { id: Gesture, duration_ms: u16 },
    /// `0x22 SET_SYSTEM`.
    SetSystem {
        mode: FaceSystemMode,
        phase: u8,
        param: u8,
    },
    /// `0x23 SET_TALKING`.
    SetTalking { talking: bool, energy: u8 },
    /// `0x24 SET_FLAGS`.
    SetFlags { bitmask: u8 },
}

impl FaceCommand {
    /// Wire command id byte.
    pub const fn opcode(&self) -> u8 {
        match self {
            Self::SetState { .. } => 0x20,
            Self::Gesture { .. } => 0x21,
            Self::SetSystem { .. } => 0x22,
            Self::SetTalking { .. } => 0x23,
            Self::SetFlags { .. } => 0x24,
        }
    }
}

/// `0x90 FACE_STATUS` telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FaceStatus {
    pub mood_id: u8,
    pub active_gesture_id: u8,
    pub system_mode: u8,
    pub flags: u8,
}

/// `0x91 TOUCH_EVENT` telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchEvent {
    pub event_type: u8,
    pub x: u16,
    pub y: u16,
}

/// `0x92 BUTTON_EVENT` telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub button_id: u8,
    pub event_type: u8,
    pub state: u8,
    pub reserved: u8,
}

/// `0x93 HEARTBEAT` telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub uptime_ms: u32,
    pub counters: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflex_opcode_matches_spec() {
        assert_eq!(ReflexCommand::SetTwist { v_mm_s: 0, w_mrad_s: 0 }.opcode(), 0x10);
        assert_eq!(ReflexCommand::Stop { reason: 0 }.opcode(), 0x11);
        assert_eq!(ReflexCommand::Estop.opcode(), 0x12);
        assert_eq!(ReflexCommand::ClearFaults { mask: 0 }.opcode(), 0x14);
        assert_eq!(ReflexCommand::SetConfig { param_id: 0, value: 0 }.opcode(), 0x15);
    }

    #[test]
    fn face_opcode_matches_spec() {
        assert_eq!(
            FaceCommand::SetState {
                mood: Mood::Neutral,
                intensity: 0,
                gaze_x_i8: 0,
                gaze_y_i8: 0,
                brightness: 0,
            }
            .opcode(),
            0x20
        );
        assert_eq!(
            FaceCommand::Gesture { id: Gesture::Blink, duration_ms: 0 }.opcode(),
            0x21
        );
        assert_eq!(
            FaceCommand::SetSystem { mode: FaceSystemMode::None, phase: 0, param: 0 }.opcode(),
            0x22
        );
        assert_eq!(
            FaceCommand::SetTalking { talking: false, energy: 0 }.opcode(),
            0x23
        );
        assert_eq!(FaceCommand::SetFlags { bitmask: 0 }.opcode(), 0x24);
    }
}
