//! `POST /actions` (§6.3, §3.2): `set_mode`, `e_stop`, `clear_e_stop`.
//!
//! All three forward into the control loop over a channel and wait for its
//! reply rather than mutating any state directly here — the loop is the
//! single writer of both the mode state machine and the Reflex MCU link.

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use companion_common::state::{Mode, RequestedMode, TransitionResult};
use companion_core::cycle::{ModeRequest, ReflexAction, ReflexActionRequest};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::ApiError;
use crate::state::ApiState;

/// How long a route handler waits for the control loop to answer a
/// request before giving up — generously more than one cycle period
/// (§5: 20 ms), to absorb a slow tick without absorbing a dead loop.
const CONTROL_LOOP_REPLY_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    SetMode { mode: RequestedMode },
    EStop,
    ClearEStop,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub mode: Mode,
}

/// `POST /actions`.
pub async fn post_actions(
    State(state): State<ApiState>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let transition = match request {
        ActionRequest::SetMode { mode } => {
            let (reply, reply_rx) = oneshot::channel();
            let req = ModeRequest {
                requested_mode: Some(mode),
                clear_error: false,
                reply,
            };
            send_and_await(&state.mode_request_tx, req, reply_rx).await?
        }
        ActionRequest::EStop => {
            let (reply, reply_rx) = oneshot::channel();
            let req = ReflexActionRequest {
                action: ReflexAction::EStop,
                reply,
            };
            send_and_await(&state.reflex_action_tx, req, reply_rx).await?
        }
        ActionRequest::ClearEStop => {
            let (reply, reply_rx) = oneshot::channel();
            let req = ReflexActionRequest {
                action: ReflexAction::ClearEStop,
                reply,
            };
            send_and_await(&state.reflex_action_tx, req, reply_rx).await?
        }
    };

    match transition {
        TransitionResult::Ok(mode) => Ok(Json(ActionResponse { mode })),
        TransitionResult::Rejected(reason) => Err(ApiError::refused(StatusCode::CONFLICT, reason)),
    }
}

async fn send_and_await<T: Send>(
    tx: &tokio::sync::mpsc::Sender<T>,
    msg: T,
    reply_rx: oneshot::Receiver<TransitionResult>,
) -> Result<TransitionResult, ApiError> {
    if tx.send(msg).await.is_err() {
        return Err(ApiError::control_loop_unreachable());
    }
    match tokio::time::timeout(CONTROL_LOOP_REPLY_TIMEOUT, reply_rx).await {
        Ok(Ok(transition)) => Ok(transition),
        _ => Err(ApiError::control_loop_unreachable()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_request_parses_set_mode() {
        let req: ActionRequest =
            serde_json::from_str(r#"{"action": "set_mode", "mode": "teleop"}"#).unwrap();
        assert!(matches!(
            req,
            ActionRequest::SetMode {
                mode: RequestedMode::Teleop
            }
        ));
    }

    #[test]
    fn action_request_parses_bare_e_stop() {
        let req: ActionRequest = serde_json::from_str(r#"{"action": "e_stop"}"#).unwrap();
        assert!(matches!(req, ActionRequest::EStop));
    }

    #[tokio::test]
    async fn send_and_await_reports_rejection() {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<ModeRequest>(1);
        tokio::spawn(async move {
            let req = rx.recv().await.unwrap();
            let _ = req
                .reply
                .send(TransitionResult::Rejected("no active connection"));
        });
        let (reply, reply_rx) = oneshot::channel();
        let req = ModeRequest {
            requested_mode: Some(RequestedMode::Teleop),
            clear_error: false,
            reply,
        };
        let transition = send_and_await(&tx, req, reply_rx).await.unwrap();
        assert_eq!(
            transition,
            TransitionResult::Rejected("no active connection")
        );
    }

    #[tokio::test]
    async fn send_and_await_errors_when_loop_is_gone() {
        let (tx, rx) = tokio::sync::mpsc::channel::<ModeRequest>(1);
        drop(rx);
        let (reply, reply_rx) = oneshot::channel();
        let req = ModeRequest {
            requested_mode: None,
            clear_error: true,
            reply,
        };
        let err = send_and_await(&tx, req, reply_rx).await.unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
