//! Diagnostic aggregation CLI.
//!
//! Fetches a `RobotState` snapshot (and optionally the live parameter
//! registry) from a running supervisor's web API and prints a
//! human-readable report. Replaces the teacher's unimplemented
//! gRPC/MQTT-fed aggregator: this workspace's supervisor runs as a single
//! process with one diagnostic surface, its own web API, so there is
//! nothing left to aggregate across.

mod client;
mod error;
mod report;

use clap::{Parser, Subcommand};
use client::DiagnosticClient;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;

#[derive(Debug, Parser)]
struct Args {
    /// Base URL of the supervisor's web API.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    api_base_url: String,

    /// Per-request HTTP timeout, in seconds.
    #[arg(long, default_value_t = 5)]
    timeout_s: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the current `RobotState` snapshot (default).
    Status,
    /// Print the status snapshot plus the full live parameter registry.
    Dump,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().compact().init();
    let args = Args::parse();
    let client = DiagnosticClient::new(args.api_base_url, Duration::from_secs(args.timeout_s));

    match args.command.unwrap_or(Command::Status) {
        Command::Status => match client.status().await {
            Ok(report) => {
                print!("{}", report.format());
                if report.is_healthy() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(1)
                }
            }
            Err(err) => {
                error!(%err, "failed to fetch status");
                ExitCode::from(2)
            }
        },
        Command::Dump => {
            let status = client.status().await;
            let params = client.params().await;
            match (&status, &params) {
                (Ok(report), Ok(params)) => {
                    print!("{}", report.format());
                    println!("params: {}", serde_json::to_string_pretty(params).unwrap());
                }
                _ => {}
            }
            if let Err(err) = &status {
                error!(%err, "failed to fetch status");
            }
            if let Err(err) = &params {
                error!(%err, "failed to fetch params");
            }
            if status.is_err() || params.is_err() {
                ExitCode::from(2)
            } else if status.map(|r| r.is_healthy()).unwrap_or(false) {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
    }
}
