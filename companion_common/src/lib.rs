//! Companion Common Library
//!
//! Shared constants, configuration loading, and domain types for every
//! crate in the companion supervisor workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - System-wide numeric constants and default paths
//! - [`config`] - Configuration loading traits and types
//! - [`diagnostics`] - Per-link byte/frame/reconnect counters
//! - [`fault`] - `FaultSet` bitflags reported by the Reflex MCU
//! - [`twist`] - Differential-drive `Twist` type
//! - [`mood`] / [`gesture`] - Canonical face expression vocabularies
//! - [`state`] - Mode/fault state machine
//! - [`wire`] - Shared Reflex/Face command and telemetry shapes
//! - [`param`] - Parameter registry schema and batch validation
//! - [`watchdog`] - Worker process lifecycle contract
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use companion_common::prelude::*;
//! ```

pub mod config;
pub mod consts;
pub mod diagnostics;
pub mod fault;
pub mod gesture;
pub mod mood;
pub mod param;
pub mod prelude;
pub mod state;
pub mod twist;
pub mod watchdog;
pub mod wire;
