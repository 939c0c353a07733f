//! TTS/audio worker: consumes synthesized PCM from the planner and a
//! lip-sync energy track; publishes `(talking_bool, energy_u8, t_audio_ns)`
//! at ~50 Hz.
//!
//! PCM consumption and real synthesis are out of scope (see crate docs);
//! this loop alternates speaking bursts and silence on a fixed cadence so
//! the face's mouth animation and the expression arbiter's conversation
//! state have a realistic signal to follow.

use clap::Parser;
use companion_common::config::{ConfigLoader, SharedConfig};
use companion_ipc::data::segments::{AUDIO_ENERGY, STANDARD_SEGMENT_SIZE, WORKER_HEALTH_AUDIO};
use companion_ipc::data::AudioMessage;
use companion_ipc::SegmentWriter;
use companion_workers::cli::WorkerArgs;
use companion_workers::heartbeat::HeartbeatPublisher;
use companion_workers::publish_json;
use companion_workers::waveform::{energy_at_tick, talking_at_tick};
use serde::Deserialize;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

fn default_tick_interval_ms() -> u64 {
    20 // 50 Hz
}
fn default_energy_period_ticks() -> u64 {
    25
}
fn default_burst_ticks() -> u64 {
    150 // ~3s of talking
}
fn default_silence_ticks() -> u64 {
    100 // ~2s of silence
}
fn default_heartbeat_every() -> u64 {
    50
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct AudioSection {
    #[serde(default = "default_tick_interval_ms")]
    tick_interval_ms: u64,
    #[serde(default = "default_energy_period_ticks")]
    energy_period_ticks: u64,
    #[serde(default = "default_burst_ticks")]
    burst_ticks: u64,
    #[serde(default = "default_silence_ticks")]
    silence_ticks: u64,
    #[serde(default = "default_heartbeat_every")]
    heartbeat_every: u64,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            energy_period_ticks: default_energy_period_ticks(),
            burst_ticks: default_burst_ticks(),
            silence_ticks: default_silence_ticks(),
            heartbeat_every: default_heartbeat_every(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AudioWorkerConfig {
    shared: SharedConfig,
    #[serde(default)]
    audio_worker: AudioSection,
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_nanos() as u64
}

fn main() -> ExitCode {
    let args = WorkerArgs::parse();

    let config = match AudioWorkerConfig::load(&args.section_file("audio.toml")) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("audio worker: configuration error: {err}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(config.shared.log_level.as_filter_str())
        .init();

    info!(pid = std::process::id(), "audio worker starting");

    let mut energy_writer = match SegmentWriter::create(AUDIO_ENERGY, STANDARD_SEGMENT_SIZE) {
        Ok(w) => w,
        Err(err) => {
            error!(%err, "failed to create audio energy segment");
            return ExitCode::FAILURE;
        }
    };

    let mut heartbeat = match HeartbeatPublisher::new(WORKER_HEALTH_AUDIO) {
        Ok(h) => h,
        Err(err) => {
            error!(%err, "failed to create audio heartbeat segment");
            return ExitCode::FAILURE;
        }
    };

    let section = &config.audio_worker;
    let mut tick = 0u64;
    loop {
        let talking = talking_at_tick(tick, section.burst_ticks, section.silence_ticks);
        let energy_u8 = if talking {
            energy_at_tick(tick, section.energy_period_ticks)
        } else {
            0
        };

        let message = AudioMessage {
            talking,
            energy_u8,
            t_audio_ns: now_ns(),
        };

        if let Err(err) = publish_json(&mut energy_writer, &message) {
            error!(%err, "failed to publish audio message");
        }

        if tick % section.heartbeat_every == 0 {
            if let Err(err) = heartbeat.beat() {
                warn!(%err, "failed to publish audio heartbeat");
            }
        }

        tick += 1;
        thread::sleep(Duration::from_millis(section.tick_interval_ms));
    }
}
