//! Messages published by the TTS/audio worker.

use serde::{Deserialize, Serialize};

/// Lip-sync energy track published at ~50 Hz while audio plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioMessage {
    pub talking: bool,
    pub energy_u8: u8,
    pub t_audio_ns: u64,
}
