//! Top-level configuration for the control loop itself.
//!
//! `companion_supervisor` loads [`companion_common::config::SupervisorConfig`]
//! and passes the `[core]` section (this module's [`CoreConfig`]) down when
//! constructing the [`crate::cycle::CycleRunner`].

use companion_common::consts::{
    DEVICE_TELEMETRY_STALE_MS, RANGE_STALE_MS, TELEOP_STALE_MS, VISION_STALE_MS,
};
use serde::{Deserialize, Serialize};

fn default_teleop_stale_ms() -> u64 {
    TELEOP_STALE_MS
}
fn default_range_stale_ms() -> u64 {
    RANGE_STALE_MS
}
fn default_vision_stale_ms() -> u64 {
    VISION_STALE_MS
}
fn default_device_stale_ms() -> u64 {
    DEVICE_TELEMETRY_STALE_MS
}
fn default_hard_stop_mm() -> u16 {
    250
}
fn default_half_scale_mm() -> u16 {
    500
}
fn default_forward_epsilon_mm_s() -> i16 {
    10
}

/// Safety-pipeline thresholds. Mirrors the param registry's `safety.*`
/// keys at startup; the registry, not this struct, is the live source of
/// truth once the control loop is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SafetyConfig {
    /// Range at/below which forward motion is hard-stopped, in mm.
    #[serde(default = "default_hard_stop_mm")]
    pub hard_stop_mm: u16,
    /// Range at/below which forward motion is scaled by 0.5, in mm.
    #[serde(default = "default_half_scale_mm")]
    pub half_scale_mm: u16,
    /// Range samples older than this are treated as stale, in ms.
    #[serde(default = "default_range_stale_ms")]
    pub range_stale_ms: u64,
    /// Vision messages older than this are treated as stale, in ms.
    #[serde(default = "default_vision_stale_ms")]
    pub vision_stale_ms: u64,
    /// Device telemetry older than this counts as a logical disconnect, in ms.
    #[serde(default = "default_device_stale_ms")]
    pub device_stale_ms: u64,
    /// `|v_mm_s|` below this is treated as pure in-place rotation and is
    /// never attenuated by range/vision gates.
    #[serde(default = "default_forward_epsilon_mm_s")]
    pub forward_epsilon_mm_s: i16,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            hard_stop_mm: default_hard_stop_mm(),
            half_scale_mm: default_half_scale_mm(),
            range_stale_ms: default_range_stale_ms(),
            vision_stale_ms: default_vision_stale_ms(),
            device_stale_ms: default_device_stale_ms(),
            forward_epsilon_mm_s: default_forward_epsilon_mm_s(),
        }
    }
}

fn default_wander_v_mm_s() -> i16 {
    120
}
fn default_wander_curve_w_mrad_s() -> i16 {
    150
}
fn default_wander_curve_period_ticks() -> u32 {
    250
}

/// Wander skill drift/avoid policy tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WanderConfig {
    /// Nominal forward speed while wandering, mm/s.
    #[serde(default = "default_wander_v_mm_s")]
    pub forward_v_mm_s: i16,
    /// Peak angular velocity of the gentle drift curve, mrad/s.
    #[serde(default = "default_wander_curve_w_mrad_s")]
    pub curve_w_mrad_s: i16,
    /// Ticks per full left-right drift cycle.
    #[serde(default = "default_wander_curve_period_ticks")]
    pub curve_period_ticks: u32,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            forward_v_mm_s: default_wander_v_mm_s(),
            curve_w_mrad_s: default_wander_curve_w_mrad_s(),
            curve_period_ticks: default_wander_curve_period_ticks(),
        }
    }
}

fn default_teleop_stale() -> u64 {
    TELEOP_STALE_MS
}

/// The `[core]` section of `companion_supervisor`'s top-level config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    /// API-supplied teleop desired twist is dropped after this many ms.
    #[serde(default = "default_teleop_stale")]
    pub teleop_stale_ms: u64,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub wander: WanderConfig,
    /// Path to the TOML file declaring the parameter registry schema.
    #[serde(default = "default_params_path")]
    pub params_path: String,
}

fn default_params_path() -> String {
    "/etc/companion/params.toml".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            teleop_stale_ms: default_teleop_stale(),
            safety: SafetyConfig::default(),
            wander: WanderConfig::default(),
            params_path: default_params_path(),
        }
    }
}

impl CoreConfig {
    /// Resolve the untyped `[core]` table embedded in
    /// `SupervisorConfig` into a `CoreConfig`, applying this struct's
    /// defaults for any field the table omits.
    pub fn from_table(table: toml::Table) -> Result<Self, toml::de::Error> {
        Self::deserialize(toml::Value::Table(table))
    }
}
