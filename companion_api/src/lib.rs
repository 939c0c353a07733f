//! Web API surface (§6.3): `GET /status`, `GET`/`POST /params`,
//! `POST /actions`, the `GET /video` contract stub, and the `/ws`/`/ws/logs`
//! WebSocket streams.
//!
//! This crate builds an [`axum::Router`] and hands it back to
//! `companion_supervisor`, which owns the actual `axum::serve` call
//! alongside the rest of process startup — there is no standalone binary
//! here, since the web layer only ever runs embedded in the same process
//! as the control loop (§5).

pub mod actions;
pub mod error;
pub mod logging;
pub mod state;
pub mod status;
pub mod ws;

pub use state::ApiState;

use axum::routing::{get, post};
use axum::Router;

/// Build the full route table over a given [`ApiState`].
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(status::get_status))
        .route("/params", get(status::get_params).post(status::post_params))
        .route("/actions", post(actions::post_actions))
        .route("/video", get(ws::get_video))
        .route("/ws", get(ws::ws_telemetry))
        .route("/ws/logs", get(ws::ws_logs))
        .with_state(state)
}
