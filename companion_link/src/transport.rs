//! Serial transport with pluggable backend and reconnect backoff.
//!
//! Real device I/O goes through [`TransportBackend`], implemented for an
//! actual serial port (`tokio_serial`) and, behind `--mock`, an in-process
//! duplex pipe speaking the identical framed protocol.

use companion_common::consts::{BACKOFF_CAP_S, BACKOFF_FLOOR_S};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// Transport-level error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport disconnected")]
    Disconnected,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Pluggable transport backend. A real serial port and an in-memory mock
/// both implement `AsyncRead + AsyncWrite + Unpin + Send`, so the same
/// generic driver code runs against either.
pub trait TransportBackend: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> TransportBackend for T {}

/// Open a real serial port backend at the given path and baud rate.
pub fn open_serial(
    path: &str,
    baud_rate: u32,
) -> Result<tokio_serial::SerialStream, TransportError> {
    let builder = tokio_serial::new(path, baud_rate);
    tokio_serial::SerialStream::open(&builder).map_err(TransportError::from)
}

/// Same as [`open_serial`], boxed to a trait object so it can be handed to
/// [`crate::device::ReflexClient::connect`]/[`crate::device::FaceClient::connect`]
/// as a reopen callback without tying them to a concrete transport type.
pub fn open_serial_boxed(
    path: &str,
    baud_rate: u32,
) -> Result<Box<dyn TransportBackend>, TransportError> {
    open_serial(path, baud_rate).map(|port| Box::new(port) as Box<dyn TransportBackend>)
}

/// Exponential backoff policy for reconnects, worker respawns, and
/// planner retries: starts at a floor, doubles on each failure, caps at a
/// ceiling, and resets on success.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    floor_s: f64,
    cap_s: f64,
    current_s: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(BACKOFF_FLOOR_S, BACKOFF_CAP_S)
    }
}

impl BackoffPolicy {
    /// Build a policy with an explicit floor and cap.
    ///
    /// # Panics
    /// Panics if `floor_s <= 0.0` or `floor_s > cap_s`.
    pub fn new(floor_s: f64, cap_s: f64) -> Self {
        assert!(floor_s > 0.0, "backoff floor must be positive");
        assert!(floor_s <= cap_s, "backoff floor must not exceed cap");
        Self {
            floor_s,
            cap_s,
            current_s: floor_s,
        }
    }

    /// Current delay, as a `Duration`.
    pub fn current(&self) -> Duration {
        Duration::from_secs_f64(self.current_s)
    }

    /// Record a failure: returns the delay to wait before the next
    /// attempt, then doubles for the attempt after that (capped).
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current();
        self.current_s = (self.current_s * 2.0).min(self.cap_s);
        delay
    }

    /// Record a success: reset to the floor.
    pub fn reset(&mut self) {
        self.current_s = self.floor_s;
    }
}
