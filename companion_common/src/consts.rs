//! System-wide constants for the companion workspace.
//!
//! Single source of truth for all numeric limits and default paths.
//! Imported by all crates — no duplication permitted.

/// Control loop cycle period [ms]. 50 Hz.
pub const CYCLE_PERIOD_MS: u64 = 20;

/// Broadcast telemetry every Nth tick (nominally ~16.7 Hz at 50 Hz cycle).
pub const TELEMETRY_BROADCAST_EVERY: u64 = 3;

/// Maximum payload length accepted by the framing codec, in bytes.
pub const MAX_PAYLOAD: usize = 256;

/// Teleop intent is considered stale after this many milliseconds without
/// a fresh API-supplied desired twist.
pub const TELEOP_STALE_MS: u64 = 200;

/// A device is considered logically disconnected after this many
/// milliseconds without fresh telemetry.
pub const DEVICE_TELEMETRY_STALE_MS: u64 = 500;

/// Vision detections older than this are treated as stale by the safety
/// pipeline's stale-vision gate.
pub const VISION_STALE_MS: u64 = 500;

/// Range samples older than this are treated as stale by the safety
/// pipeline's stale-range gate.
pub const RANGE_STALE_MS: u64 = 500;

/// Reconnect / respawn / retry backoff floor [s].
pub const BACKOFF_FLOOR_S: f64 = 0.5;

/// Reconnect / respawn / retry backoff cap [s].
pub const BACKOFF_CAP_S: f64 = 5.0;

/// Default planner HTTP request timeout [s].
pub const PLANNER_TIMEOUT_S: u64 = 15;

/// Default configuration directory path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/companion/config";

/// Default serial device alias for the Reflex MCU.
pub const DEFAULT_REFLEX_PORT: &str = "/dev/reflex";

/// Default serial device alias for the Face MCU.
pub const DEFAULT_FACE_PORT: &str = "/dev/face";

/// Both MCU links run at this baud rate.
pub const MCU_BAUD_RATE: u32 = 115_200;

/// Number of canonical mood values (§6.2).
pub const MOOD_COUNT: usize = 13;

/// Number of canonical gesture values (§6.2).
pub const GESTURE_COUNT: usize = 13;
