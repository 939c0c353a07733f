//! Per-link health counters shared between `companion_link`'s device
//! clients (which update them) and `companion_core`/`companion_diagnostic`
//! (which read and surface them).

use serde::{Deserialize, Serialize};

/// Byte/frame/reconnect counters for one MCU transport.
///
/// `rx_bytes`/`tx_bytes`/`frames_bad`/`reconnects`/`last_open_ns`/
/// `last_close_ns`/`last_error_kind` are owned by the transport's
/// background read loop. `frames_ok` is owned by the control loop, which
/// counts only frames it actually consumed into a telemetry snapshot —
/// the two halves are merged once per tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub frames_ok: u64,
    pub frames_bad: u64,
    pub reconnects: u64,
    pub last_open_ns: Option<u64>,
    pub last_close_ns: Option<u64>,
    pub last_error_kind: Option<String>,
}

impl Diagnostics {
    /// Copy every field owned by the transport layer from `source`,
    /// leaving `frames_ok` (owned by the control loop) untouched.
    pub fn merge_link_counters(&mut self, source: &Diagnostics) {
        self.rx_bytes = source.rx_bytes;
        self.tx_bytes = source.tx_bytes;
        self.frames_bad = source.frames_bad;
        self.reconnects = source.reconnects;
        self.last_open_ns = source.last_open_ns;
        self.last_close_ns = source.last_close_ns;
        self.last_error_kind = source.last_error_kind.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_link_counters_preserves_frames_ok() {
        let mut target = Diagnostics {
            frames_ok: 42,
            ..Default::default()
        };
        let source = Diagnostics {
            rx_bytes: 100,
            tx_bytes: 50,
            frames_ok: 999, // never copied
            frames_bad: 3,
            reconnects: 1,
            last_open_ns: Some(7),
            last_close_ns: Some(9),
            last_error_kind: Some("io".into()),
        };
        target.merge_link_counters(&source);
        assert_eq!(target.frames_ok, 42);
        assert_eq!(target.rx_bytes, 100);
        assert_eq!(target.tx_bytes, 50);
        assert_eq!(target.frames_bad, 3);
        assert_eq!(target.reconnects, 1);
        assert_eq!(target.last_open_ns, Some(7));
        assert_eq!(target.last_close_ns, Some(9));
        assert_eq!(target.last_error_kind.as_deref(), Some("io"));
    }
}
