//! Configuration loading traits and types.
//!
//! Provides a standardized way to load TOML configuration files across all
//! companion workspace binaries: a `ConfigLoader` trait with a blanket
//! implementation for any `serde`-deserializable type, a shared
//! `ConfigError` taxonomy, and the top-level sections every binary embeds.
//!
//! # Usage
//!
//! ```rust,no_run
//! use companion_common::config::{ConfigLoader, SharedConfig, ConfigError};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct AppConfig {
//!     shared: SharedConfig,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = AppConfig::load(Path::new("config.toml"))?;
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Log level for configuration (replaces `log::Level`).
///
/// Serializes to lowercase strings: "trace", "debug", "info", "warn", "error".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level verbosity.
    Trace,
    /// Debug-level verbosity.
    Debug,
    /// Info-level verbosity (default).
    Info,
    /// Warning-level verbosity.
    Warn,
    /// Error-level verbosity.
    Error,
}

impl LogLevel {
    /// Convert to the `tracing_subscriber::EnvFilter` directive string.
    pub const fn as_filter_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Common configuration fields shared across every companion binary.
///
/// Embedded in each binary's top-level config struct to provide consistent
/// base configuration (service identity, log level).
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "companion-core"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    pub service_name: String,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// Provides a default implementation that works with any type implementing
/// `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist.
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── WatchdogConfig ────────────────────────────────────────────────

fn default_max_restarts() -> u32 {
    5
}
fn default_initial_backoff_s() -> f64 {
    crate::consts::BACKOFF_FLOOR_S
}
fn default_max_backoff_s() -> f64 {
    crate::consts::BACKOFF_CAP_S
}
fn default_sigterm_timeout_s() -> f64 {
    2.0
}

/// Watchdog configuration — how `companion_supervisor` manages worker
/// processes (vision, audio, planner).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchdogConfig {
    /// Maximum consecutive restarts before a worker is left dead (1..=100).
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    /// Initial respawn backoff in seconds (0.1..=60.0).
    #[serde(default = "default_initial_backoff_s")]
    pub initial_backoff_s: f64,
    /// Maximum respawn backoff in seconds (1.0..=300.0).
    #[serde(default = "default_max_backoff_s")]
    pub max_backoff_s: f64,
    /// Timeout before escalating SIGTERM to SIGKILL, in seconds (0.5..=30.0).
    #[serde(default = "default_sigterm_timeout_s")]
    pub sigterm_timeout_s: f64,
}

impl WatchdogConfig {
    /// Validate all fields against allowed bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.max_restarts) {
            return Err(ConfigError::ValidationError(format!(
                "watchdog.max_restarts={} out of range [1, 100]",
                self.max_restarts
            )));
        }
        if !(0.1..=60.0).contains(&self.initial_backoff_s) {
            return Err(ConfigError::ValidationError(format!(
                "watchdog.initial_backoff_s={} out of range [0.1, 60.0]",
                self.initial_backoff_s
            )));
        }
        if !(1.0..=300.0).contains(&self.max_backoff_s) {
            return Err(ConfigError::ValidationError(format!(
                "watchdog.max_backoff_s={} out of range [1.0, 300.0]",
                self.max_backoff_s
            )));
        }
        if !(0.5..=30.0).contains(&self.sigterm_timeout_s) {
            return Err(ConfigError::ValidationError(format!(
                "watchdog.sigterm_timeout_s={} out of range [0.5, 30.0]",
                self.sigterm_timeout_s
            )));
        }
        Ok(())
    }
}

// ─── Link (serial transport) configuration ─────────────────────────

fn default_reflex_port() -> String {
    crate::consts::DEFAULT_REFLEX_PORT.to_string()
}
fn default_face_port() -> String {
    crate::consts::DEFAULT_FACE_PORT.to_string()
}
fn default_baud() -> u32 {
    crate::consts::MCU_BAUD_RATE
}
fn default_mock() -> bool {
    false
}

/// Serial link configuration, shared by `companion_link` and
/// `companion_supervisor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    /// Reflex MCU serial device path.
    #[serde(default = "default_reflex_port")]
    pub reflex_port: String,
    /// Face MCU serial device path.
    #[serde(default = "default_face_port")]
    pub face_port: String,
    /// Baud rate for both links.
    #[serde(default = "default_baud")]
    pub baud_rate: u32,
    /// Substitute an in-process fake Reflex/Face speaking the same wire
    /// protocol instead of opening real serial devices.
    #[serde(default = "default_mock")]
    pub mock: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reflex_port: default_reflex_port(),
            face_port: default_face_port(),
            baud_rate: default_baud(),
            mock: default_mock(),
        }
    }
}

// ─── Planner client configuration ──────────────────────────────────

fn default_planner_base_url() -> String {
    "http://localhost:8088".to_string()
}
fn default_planner_timeout_s() -> u64 {
    crate::consts::PLANNER_TIMEOUT_S
}
fn default_robot_id() -> String {
    "robot-01".to_string()
}

/// Remote planner client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerConfig {
    /// Base URL of the remote planner service.
    #[serde(default = "default_planner_base_url")]
    pub base_url: String,
    /// Per-call HTTP timeout, in seconds.
    #[serde(default = "default_planner_timeout_s")]
    pub timeout_s: u64,
    /// This robot's identity, sent with every `/plan` request.
    #[serde(default = "default_robot_id")]
    pub robot_id: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            base_url: default_planner_base_url(),
            timeout_s: default_planner_timeout_s(),
            robot_id: default_robot_id(),
        }
    }
}

// ─── Web API configuration ──────────────────────────────────────────

fn default_api_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Web API surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Socket address the HTTP/WS server binds to.
    #[serde(default = "default_api_bind")]
    pub bind_addr: String,
    /// Whether the vision pipeline (and therefore `/video`) is enabled.
    #[serde(default)]
    pub vision_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_api_bind(),
            vision_enabled: false,
        }
    }
}

// ─── SupervisorConfig (top-level, loaded from config.toml) ─────────

/// Top-level supervisor configuration — loaded from `config.toml` by
/// `companion_supervisor` and shared (read-only) with workers via CLI args.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Shared identity/logging section.
    pub shared: SharedConfig,
    /// Worker respawn policy.
    #[serde(default = "default_watchdog")]
    pub watchdog: WatchdogConfig,
    /// Serial link configuration.
    #[serde(default)]
    pub link: LinkConfig,
    /// Remote planner configuration.
    #[serde(default)]
    pub planner: PlannerConfig,
    /// Web API configuration.
    #[serde(default)]
    pub api: ApiConfig,
    /// Control-loop configuration (`companion_core::config::CoreConfig`).
    /// Kept untyped here to avoid a dependency cycle; `companion_supervisor`
    /// re-deserializes this table into `CoreConfig` after loading.
    #[serde(default)]
    pub core: toml::Table,
}

fn default_watchdog() -> WatchdogConfig {
    WatchdogConfig {
        max_restarts: default_max_restarts(),
        initial_backoff_s: default_initial_backoff_s(),
        max_backoff_s: default_max_backoff_s(),
        sigterm_timeout_s: default_sigterm_timeout_s(),
    }
}

impl SupervisorConfig {
    /// Validate every embedded section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.watchdog.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_serializes_lowercase() {
        let s = serde_json::to_string(&LogLevel::Warn).unwrap();
        assert_eq!(s, "\"warn\"");
    }

    #[test]
    fn shared_config_rejects_empty_service_name() {
        let cfg = SharedConfig {
            log_level: LogLevel::Info,
            service_name: String::new(),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn watchdog_config_rejects_out_of_range() {
        let mut cfg = default_watchdog();
        cfg.max_restarts = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_file_is_file_not_found() {
        let err = SharedConfig::load(Path::new("/nonexistent/path/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound));
    }

    #[test]
    fn supervisor_config_round_trips_toml() {
        let toml_src = r#"
            [shared]
            service_name = "companion-supervisor"

            [link]
            mock = true
        "#;
        let cfg: SupervisorConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(cfg.shared.service_name, "companion-supervisor");
        assert!(cfg.link.mock);
        assert_eq!(cfg.watchdog.max_restarts, 5);
    }
}
