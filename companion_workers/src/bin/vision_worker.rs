//! Vision worker: owns the camera, runs detection, publishes
//! `(frame_seq, t_cam_ns, t_det_done_ns, detections, confidence)` messages.
//!
//! The detector itself is out of scope (see crate docs); this loop
//! produces a single in-forward-cone detection whose confidence follows a
//! slow, deterministic curve so the control loop's vision gate has a
//! realistic signal to attenuate against.

use clap::Parser;
use companion_common::config::{ConfigLoader, SharedConfig};
use companion_common::consts::VISION_STALE_MS;
use companion_ipc::data::segments::{LARGE_SEGMENT_SIZE, VISION_DETECTIONS, WORKER_HEALTH_VISION};
use companion_ipc::data::{Detection, VisionMessage};
use companion_ipc::SegmentWriter;
use companion_workers::cli::WorkerArgs;
use companion_workers::heartbeat::HeartbeatPublisher;
use companion_workers::waveform::forward_confidence_at_tick;
use companion_workers::publish_json;
use serde::Deserialize;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

fn default_frame_interval_ms() -> u64 {
    66 // ~15 fps
}
fn default_confidence_period_ticks() -> u64 {
    150
}
fn default_heartbeat_every() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct VisionSection {
    #[serde(default = "default_frame_interval_ms")]
    frame_interval_ms: u64,
    #[serde(default = "default_confidence_period_ticks")]
    confidence_period_ticks: u64,
    #[serde(default = "default_heartbeat_every")]
    heartbeat_every: u64,
}

impl Default for VisionSection {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
            confidence_period_ticks: default_confidence_period_ticks(),
            heartbeat_every: default_heartbeat_every(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VisionWorkerConfig {
    shared: SharedConfig,
    #[serde(default)]
    vision_worker: VisionSection,
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_nanos() as u64
}

fn main() -> ExitCode {
    let args = WorkerArgs::parse();

    let config = match VisionWorkerConfig::load(&args.section_file("vision.toml")) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("vision worker: configuration error: {err}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(config.shared.log_level.as_filter_str())
        .init();

    info!(pid = std::process::id(), "vision worker starting");

    let mut detections_writer =
        match SegmentWriter::create(VISION_DETECTIONS, LARGE_SEGMENT_SIZE) {
            Ok(w) => w,
            Err(err) => {
                error!(%err, "failed to create vision detections segment");
                return ExitCode::FAILURE;
            }
        };

    let mut heartbeat = match HeartbeatPublisher::new(WORKER_HEALTH_VISION) {
        Ok(h) => h,
        Err(err) => {
            error!(%err, "failed to create vision heartbeat segment");
            return ExitCode::FAILURE;
        }
    };

    let section = &config.vision_worker;
    if section.frame_interval_ms as u128 * 2 > VISION_STALE_MS as u128 {
        warn!(
            frame_interval_ms = section.frame_interval_ms,
            "frame interval is more than half the vision staleness threshold; \
             the safety pipeline may treat frames as stale even while healthy"
        );
    }

    let mut frame_seq = 0u64;
    loop {
        let t_cam_ns = now_ns();
        let confidence = forward_confidence_at_tick(frame_seq, section.confidence_period_ticks);

        let detections = if confidence > 0.0 {
            vec![Detection {
                label: "obstacle".to_string(),
                confidence,
                bbox: [0.4, 0.3, 0.6, 0.7],
                in_forward_cone: true,
            }]
        } else {
            Vec::new()
        };

        let message = VisionMessage {
            frame_seq,
            t_cam_ns,
            t_det_done_ns: now_ns(),
            detections,
            max_forward_confidence: confidence,
        };

        if let Err(err) = publish_json(&mut detections_writer, &message) {
            error!(%err, "failed to publish vision message");
        }

        if frame_seq % section.heartbeat_every == 0 {
            if let Err(err) = heartbeat.beat() {
                warn!(%err, "failed to publish vision heartbeat");
            }
        }

        frame_seq += 1;
        thread::sleep(Duration::from_millis(section.frame_interval_ms));
    }
}
