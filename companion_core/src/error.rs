//! Aggregate error type for the control loop and its direct collaborators.

use companion_common::config::ConfigError;
use companion_link::{DeviceError, TransportError};
use thiserror::Error;

/// Top-level error surfaced by [`crate::cycle::CycleRunner`] setup and run.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
