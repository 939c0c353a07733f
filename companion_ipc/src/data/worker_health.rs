//! Worker heartbeat/status messages consumed by `companion_supervisor`.

use serde::{Deserialize, Serialize};

/// Status published by a worker process so the supervisor's watchdog can
/// detect hangs in addition to process exit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub pid: u32,
    pub uptime_s: u64,
    pub heartbeat_seq: u64,
}
