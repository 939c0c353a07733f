//! Shared axum handler state.

use std::sync::Arc;

use companion_core::cycle::{ModeRequest, ReflexActionRequest, TeleopIntent};
use companion_core::params::ReflexConfigUpdate;
use companion_core::robot_state::RobotState;
use companion_core::params::ParamRegistry;
use tokio::sync::{broadcast, mpsc, watch};

/// Everything a route handler needs, cloned cheaply per request. Every
/// field is itself a lightweight handle (a channel sender, a watch
/// receiver, an `Arc`) — the actual state lives with `CycleRunner` and the
/// registry it's built from.
#[derive(Clone)]
pub struct ApiState {
    pub robot_state_rx: watch::Receiver<RobotState>,
    pub params: Arc<ParamRegistry>,
    pub mode_request_tx: mpsc::Sender<ModeRequest>,
    pub reflex_action_tx: mpsc::Sender<ReflexActionRequest>,
    pub reflex_config_tx: mpsc::Sender<ReflexConfigUpdate>,
    /// Desired twist for TELEOP mode (spec.md §3 "Teleop with obstacle"
    /// scenario), fed by `/ws` inbound messages.
    pub teleop_intent_tx: watch::Sender<Option<TeleopIntent>>,
    pub log_tx: broadcast::Sender<String>,
    pub vision_enabled: bool,
}
