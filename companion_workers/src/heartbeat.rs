//! Worker heartbeat publishing.

use crate::publish_json;
use companion_ipc::ShmResult;
use companion_ipc::SegmentWriter;
use companion_ipc::data::WorkerStatus;
use std::time::Instant;

/// Owns a worker's heartbeat segment and tracks the counters the
/// supervisor's watchdog reads to tell a hang from a healthy, quiet
/// worker (`spawn_module`'s doc calls this out as the hang-detection
/// half of `health_check`, distinct from plain process liveness).
pub struct HeartbeatPublisher {
    writer: SegmentWriter,
    started_at: Instant,
    pid: u32,
    heartbeat_seq: u64,
}

impl HeartbeatPublisher {
    /// Create the heartbeat segment. `segment_name` is one of the
    /// `WORKER_HEALTH_*` constants in `companion_ipc::data::segments`.
    pub fn new(segment_name: &str) -> ShmResult<Self> {
        use companion_ipc::data::segments::STANDARD_SEGMENT_SIZE;
        let writer = SegmentWriter::create(segment_name, STANDARD_SEGMENT_SIZE)?;
        Ok(Self {
            writer,
            started_at: Instant::now(),
            pid: std::process::id(),
            heartbeat_seq: 0,
        })
    }

    /// Publish the current heartbeat and advance its sequence number.
    pub fn beat(&mut self) -> ShmResult<()> {
        self.heartbeat_seq += 1;
        let status = WorkerStatus {
            pid: self.pid,
            uptime_s: self.started_at.elapsed().as_secs(),
            heartbeat_seq: self.heartbeat_seq,
        };
        publish_json(&mut self.writer, &status)
    }
}
