//! Planner worker process (§4.7, §4.10): issues periodic `/plan`
//! requests, applies the fallback policy to consecutive failures, and
//! publishes the resulting plan artifact / connection state onto the
//! worker bus.
//!
//! Turn-triggering (e.g. "the child just finished a sentence, ask the
//! planner what's next") belongs to whatever upstream signal starts a
//! conversation turn; that trigger isn't itself in scope here. This loop
//! polls on a fixed cadence instead, so the artifact segment always
//! carries a recent connection-state signal even without that wiring.

use clap::Parser;
use companion_common::config::{ConfigLoader, PlannerConfig, SharedConfig};
use companion_ipc::SegmentWriter;
use companion_ipc::data::PlannerMessage;
use companion_ipc::data::segments::{PLANNER_ARTIFACTS, STANDARD_SEGMENT_SIZE, WORKER_HEALTH_PLANNER};
use companion_link::BackoffPolicy;
use companion_planner::{FallbackEvent, FallbackPolicy, PlannerClient};
use companion_workers::cli::WorkerArgs;
use companion_workers::heartbeat::HeartbeatPublisher;
use companion_workers::publish_json;
use serde::Deserialize;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

fn default_poll_interval_s() -> u64 {
    10
}
fn default_heartbeat_every() -> u64 {
    3
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlannerWorkerSection {
    #[serde(default = "default_poll_interval_s")]
    poll_interval_s: u64,
    #[serde(default = "default_heartbeat_every")]
    heartbeat_every: u64,
}

impl Default for PlannerWorkerSection {
    fn default() -> Self {
        Self {
            poll_interval_s: default_poll_interval_s(),
            heartbeat_every: default_heartbeat_every(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlannerWorkerConfig {
    shared: SharedConfig,
    #[serde(default)]
    planner: PlannerConfig,
    #[serde(default)]
    planner_worker: PlannerWorkerSection,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = WorkerArgs::parse();

    let config = match PlannerWorkerConfig::load(&args.section_file("planner.toml")) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("planner worker: configuration error: {err}");
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(config.shared.log_level.as_filter_str())
        .init();

    info!(pid = std::process::id(), "planner worker starting");

    let mut artifacts_writer =
        match SegmentWriter::create(PLANNER_ARTIFACTS, STANDARD_SEGMENT_SIZE) {
            Ok(w) => w,
            Err(err) => {
                error!(%err, "failed to create planner artifacts segment");
                return ExitCode::FAILURE;
            }
        };
    let mut heartbeat = match HeartbeatPublisher::new(WORKER_HEALTH_PLANNER) {
        Ok(h) => h,
        Err(err) => {
            error!(%err, "failed to create planner heartbeat segment");
            return ExitCode::FAILURE;
        }
    };

    let client = PlannerClient::new(&config.planner);
    let mut fallback = FallbackPolicy::new();
    let mut backoff = BackoffPolicy::default();
    let mut seq = 0u64;
    let mut tick = 0u64;

    loop {
        seq += 1;
        let monotonic_ts_ms = tick * config.planner_worker.poll_interval_s * 1000;
        let result = client
            .plan(seq, monotonic_ts_ms, serde_json::json!({}))
            .await;

        let (connected, state, artifact) = match result {
            Ok(artifact) => {
                let state = fallback.handle_event(FallbackEvent::RequestSucceeded);
                backoff.reset();
                (true, state, Some(artifact))
            }
            Err(err) => {
                warn!(%err, "planner request failed");
                let state = fallback.handle_event(FallbackEvent::RequestFailed);
                (false, state, None)
            }
        };

        let message = PlannerMessage {
            connected,
            state,
            artifact,
        };
        if let Err(err) = publish_json(&mut artifacts_writer, &message) {
            error!(%err, "failed to publish planner message");
        }

        if tick % config.planner_worker.heartbeat_every == 0 {
            if let Err(err) = heartbeat.beat() {
                warn!(%err, "failed to publish planner heartbeat");
            }
        }

        tick += 1;
        let delay = if connected {
            Duration::from_secs(config.planner_worker.poll_interval_s)
        } else {
            backoff.next_delay()
        };
        tokio::time::sleep(delay).await;
    }
}
