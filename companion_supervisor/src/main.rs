//! Top-level process: loads configuration, wires the serial links, the
//! control loop, the worker watchdog, and the web API server together,
//! and runs them concurrently until shutdown.
//!
//! `companion_supervisor` is the only process with real hardware access —
//! vision, audio, and the planner client run as separate processes,
//! supervised here, talking back over `companion_ipc` shared-memory
//! segments.

mod bridge;
mod watchdog;

use std::future::IntoFuture;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use companion_common::config::{ConfigLoader, SupervisorConfig};
use companion_common::consts::DEFAULT_CONFIG_PATH;
use companion_common::watchdog::{ManagedModule, Watchdog};
use companion_core::config::CoreConfig;
use companion_core::cycle::{CycleInputs, CycleRunner};
use companion_core::params::{load_schema, ParamRegistry};
use companion_link::mock::{spawn_fake_face, spawn_fake_reflex};
use companion_link::{open_serial_boxed, FaceClient, ReflexClient};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use crate::watchdog::CompanionWatchdog;

/// Top-level CLI surface. Workers take `--config-dir` alone; this process
/// additionally accepts `--mock` since it is the one that owns the MCU
/// links.
#[derive(Debug, Parser)]
struct Args {
    /// Directory containing `config.toml` and `params.toml`.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config_dir: PathBuf,
    /// Substitute in-process fake MCUs for the Reflex/Face serial links,
    /// overriding `[link].mock` from the config file.
    #[arg(long)]
    mock: bool,
}

fn current_time_ns() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match SupervisorConfig::load(&args.config_dir.join("config.toml")) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config.toml: {err}");
            return ExitCode::from(2);
        }
    };
    if let Err(err) = config.validate() {
        eprintln!("invalid configuration: {err}");
        return ExitCode::from(2);
    }
    let core_config = match CoreConfig::from_table(config.core.clone()) {
        Ok(core_config) => core_config,
        Err(err) => {
            eprintln!("invalid [core] configuration: {err}");
            return ExitCode::from(2);
        }
    };

    let (log_tx, _) = broadcast::channel(1024);
    let fmt_layer = tracing_subscriber::fmt::layer();
    let ws_layer = companion_api::logging::layer(log_tx.clone());
    let filter = tracing_subscriber::EnvFilter::new(config.shared.log_level.as_filter_str());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ws_layer)
        .init();

    info!(config_dir = %args.config_dir.display(), "starting companion supervisor");

    let specs = match load_schema(&PathBuf::from(&core_config.params_path)) {
        Ok(specs) => specs,
        Err(err) => {
            error!(%err, path = %core_config.params_path, "failed to load parameter schema");
            return ExitCode::from(2);
        }
    };
    let params = Arc::new(ParamRegistry::new(specs));

    let use_mock = config.link.mock || args.mock;
    let session_started_ns = current_time_ns();

    // Real links are opened by a background reconnect loop rather than
    // once at boot (§4.2): a missing/unplugged MCU at startup no longer
    // aborts the process, it just reports disconnected until the port
    // shows up.
    let reflex = if use_mock {
        info!("using in-process fake Reflex MCU");
        ReflexClient::new(spawn_fake_reflex())
    } else {
        let reflex_port = config.link.reflex_port.clone();
        let baud_rate = config.link.baud_rate;
        ReflexClient::connect(move || open_serial_boxed(&reflex_port, baud_rate))
    };
    let face = if use_mock {
        info!("using in-process fake Face MCU");
        FaceClient::new(spawn_fake_face())
    } else {
        let face_port = config.link.face_port.clone();
        let baud_rate = config.link.baud_rate;
        FaceClient::connect(move || open_serial_boxed(&face_port, baud_rate))
    };

    let (teleop_intent_tx, teleop_intent_rx) = watch::channel(None);
    let (mode_request_tx, mode_request_rx) = mpsc::channel(8);
    let (reflex_action_tx, reflex_action_rx) = mpsc::channel(8);
    let (expression_intent_tx, expression_intent_rx) = mpsc::channel(4);
    let (vision_tx, vision_rx) = mpsc::channel(4);
    let (reflex_config_tx, reflex_config_rx) = mpsc::channel(8);
    let (planner_connected_tx, planner_connected_rx) = watch::channel(false);

    let inputs = CycleInputs {
        teleop_intent_rx,
        mode_request_rx,
        reflex_action_rx,
        expression_intent_rx,
        vision_rx,
        reflex_config_rx,
        planner_connected_rx,
    };
    let (cycle_runner, robot_state_rx) =
        CycleRunner::new(reflex, face, core_config, inputs, session_started_ns);

    let mut watchdog = CompanionWatchdog::new(config.watchdog.clone());
    for module in [ManagedModule::Planner, ManagedModule::Audio] {
        if let Err(err) = watchdog.spawn_module(module, &args.config_dir) {
            error!(?module, %err, "failed to spawn worker");
            return ExitCode::from(1);
        }
    }
    if config.api.vision_enabled {
        if let Err(err) = watchdog.spawn_module(ManagedModule::Vision, &args.config_dir) {
            error!(%err, "failed to spawn vision worker");
            return ExitCode::from(1);
        }
    } else {
        info!("vision disabled, not spawning vision_worker");
    }

    bridge::spawn_vision_bridge(vision_tx);
    bridge::spawn_planner_bridge(planner_connected_tx, expression_intent_tx);

    let api_state = companion_api::ApiState {
        robot_state_rx,
        params,
        mode_request_tx,
        reflex_action_tx,
        reflex_config_tx,
        teleop_intent_tx,
        log_tx,
        vision_enabled: config.api.vision_enabled,
    };
    let router = companion_api::router(api_state);

    let listener = match tokio::net::TcpListener::bind(&config.api.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, addr = %config.api.bind_addr, "failed to bind web API listener");
            watchdog.shutdown_all().ok();
            return ExitCode::from(1);
        }
    };
    info!(addr = %config.api.bind_addr, "web API listening");

    tokio::select! {
        _ = cycle_runner.run() => {
            warn!("control loop exited unexpectedly");
        }
        result = axum::serve(listener, router).into_future() => {
            if let Err(err) = result {
                error!(%err, "web API server exited");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    if let Err(err) = watchdog.shutdown_all() {
        warn!(%err, "error shutting down workers");
    }
    ExitCode::SUCCESS
}
