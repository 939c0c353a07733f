//! Shared CLI surface for worker binaries.

use clap::Parser;
use companion_common::consts::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;

fn default_config_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

/// Arguments every worker binary accepts. `companion_supervisor` spawns
/// workers with `--config-dir` pointed at the directory holding the
/// top-level `config.toml` (per the `Watchdog::spawn_module` contract);
/// each worker reads its own section out of it.
#[derive(Debug, Parser)]
pub struct WorkerArgs {
    /// Directory containing the shared `config.toml`.
    #[arg(long, default_value_os_t = default_config_dir())]
    pub config_dir: PathBuf,
}

impl WorkerArgs {
    /// Path to a worker's own config file under `config_dir`, e.g.
    /// `vision.toml` or `audio.toml`. Workers own a narrower config
    /// schema than `companion_supervisor`'s `config.toml`, so each gets
    /// its own file rather than sharing the supervisor's
    /// `deny_unknown_fields` top-level struct.
    pub fn section_file(&self, name: &str) -> PathBuf {
        self.config_dir.join(name)
    }
}
