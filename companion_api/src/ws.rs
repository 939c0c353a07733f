//! `WS /ws`, `WS /ws/logs`, and the `GET /video` stub (§6.3).

use std::time::Instant;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use companion_common::twist::Twist;
use companion_core::cycle::TeleopIntent;
use serde::Deserialize;
use tracing::warn;

use crate::state::ApiState;

/// Inbound `/ws` message: the only thing a client sends is a desired
/// teleop twist (spec.md §3's "Teleop with obstacle" scenario). Anything
/// else client-sent is ignored rather than closing the connection, so a
/// future message type can be added without breaking older clients.
#[derive(Debug, Deserialize)]
struct TeleopCommand {
    v_mm_s: i16,
    w_mrad_s: i16,
}

/// `WS /ws` — one newline-delimited JSON `RobotState` snapshot per
/// broadcast tick. Follows the control loop's own broadcast cadence
/// (§4.8: every `TELEMETRY_BROADCAST_EVERY` ticks) rather than polling on
/// a separate timer, so there's exactly one definition of the telemetry
/// rate in the system.
pub async fn ws_telemetry(State(state): State<ApiState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| telemetry_loop(socket, state))
}

async fn telemetry_loop(mut socket: WebSocket, mut state: ApiState) {
    loop {
        tokio::select! {
            changed = state.robot_state_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                let snapshot = state.robot_state_rx.borrow().clone();
                let line = match serde_json::to_string(&snapshot) {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(%err, "failed to serialize robot state for /ws");
                        continue;
                    }
                };
                if socket.send(Message::Text(line)).await.is_err() {
                    return;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Err(_)) => return,
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(command) = serde_json::from_str::<TeleopCommand>(&text) {
                            let intent = TeleopIntent {
                                twist: Twist::new(command.v_mm_s, command.w_mrad_s),
                                received_at: Instant::now(),
                            };
                            let _ = state.teleop_intent_tx.send(Some(intent));
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

/// `WS /ws/logs` — live log stream, tapping whatever `tracing` forwards
/// onto `state.log_tx` via [`crate::logging::BroadcastWriter`].
pub async fn ws_logs(State(state): State<ApiState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| logs_loop(socket, state))
}

async fn logs_loop(mut socket: WebSocket, state: ApiState) {
    let mut log_rx = state.log_tx.subscribe();
    loop {
        tokio::select! {
            line = log_rx.recv() => {
                let line = match line {
                    Ok(line) => line,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                };
                if socket.send(Message::Text(line)).await.is_err() {
                    return;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Err(_)) => return,
                    _ => {}
                }
            }
        }
    }
}

/// `GET /video` — contract-only. Actual MJPEG encoding is out of scope
/// (spec.md §1's Out-of-scope list); this always returns 503, since vision
/// in this workspace only ever produces detection summaries, never frames.
pub async fn get_video(State(state): State<ApiState>) -> Response {
    let reason = if state.vision_enabled {
        "MJPEG encoding is not implemented; vision publishes detection summaries only"
    } else {
        "vision pipeline disabled"
    };
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [("retry-after", HeaderValue::from_static("30"))],
        reason,
    )
        .into_response()
}
