//! # Companion Link
//!
//! Serial transport and device clients for the two onboard microcontrollers:
//! the motion "Reflex" MCU and the "Face" display MCU.
//!
//! # Module Structure
//!
//! - [`codec`] - COBS framing + CRC16 wire codec
//! - [`transport`] - pluggable transport backend and reconnect backoff
//! - [`device`] - `ReflexClient` / `FaceClient`
//! - [`mock`] - in-process fake Reflex for `--mock` runs
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      companion_link                        │
//! │  ┌───────────┐   ┌─────────────┐   ┌────────────────────┐ │
//! │  │  codec    │◄─►│  transport  │◄─►│ ReflexClient /      │ │
//! │  │ (COBS+CRC)│   │ (real/mock) │   │ FaceClient          │ │
//! │  └───────────┘   └─────────────┘   └────────────────────┘ │
//! └───────────────────────────────────────────────────────────┘
//! ```

#![deny(warnings)]

pub mod codec;
pub mod device;
pub mod mock;
pub mod transport;

pub use crate::codec::{decode_frame, encode_frame, ParseError};
pub use crate::device::{DeviceClient, DeviceError, FaceClient, FaceEvent, ReflexClient};
pub use crate::transport::{
    open_serial, open_serial_boxed, BackoffPolicy, TransportBackend, TransportError,
};
