//! Vision and audio worker processes.
//!
//! Each worker is a standalone OS process spawned by `companion_supervisor`
//! (per [`companion_common::watchdog::Watchdog`]) and owns exactly one
//! sensing/output pipeline. Workers never talk to each other or to the
//! control loop directly — they only publish onto their `companion_ipc`
//! segment, the same single-writer/multi-reader discipline the core's
//! device clients use over serial.
//!
//! Actual camera/microphone access and the detection/synthesis models
//! behind them are out of scope; both workers here generate deterministic,
//! time-varying placeholder signals through the same segment shapes a real
//! pipeline would publish, so the core and `companion_supervisor` can be
//! built and exercised against a faithful wire contract.

pub mod cli;
pub mod heartbeat;
pub mod waveform;

use companion_ipc::{SegmentWriter, ShmResult};
use serde::Serialize;

/// Serialize `value` as JSON and publish it to `writer`.
///
/// Every worker message is small and infrequent enough that JSON's
/// overhead over the wire doesn't matter — this mirrors the teacher's
/// `serde_json::to_vec` + `writer.write` pattern used for every HAL
/// segment.
pub fn publish_json<T: Serialize>(writer: &mut SegmentWriter, value: &T) -> ShmResult<()> {
    let bytes = serde_json::to_vec(value).expect("worker message types always serialize");
    writer.write(&bytes)
}
