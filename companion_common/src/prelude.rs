//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use companion_common::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use companion_common::prelude::*;
//! ```

// ─── Logging & configuration ────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, SupervisorConfig};

// ─── System constants ───────────────────────────────────────────────
pub use crate::consts::*;

// ─── Domain types ────────────────────────────────────────────────────
pub use crate::fault::FaultSet;
pub use crate::gesture::Gesture;
pub use crate::mood::Mood;
pub use crate::param::{BatchError, ParamError, ParamSpec, ParamType, ParamValue};
pub use crate::state::{Mode, ModeEvent, ModeStateMachine, RequestedMode, TransitionResult};
pub use crate::twist::Twist;
pub use crate::wire::{
    ButtonEvent, FaceCommand, FaceStatus, FaceSystemMode, Heartbeat, RangeStatus, ReflexCommand,
    ReflexState, TouchEvent,
};

// ─── Watchdog ────────────────────────────────────────────────────────
pub use crate::watchdog::{HealthStatus, ManagedModule, Watchdog, WatchdogError};
