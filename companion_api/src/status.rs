//! `GET /status`, `GET /params`, `POST /params` (§6.3).

use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use companion_common::param::{ParamError, ParamSpec, ParamValue};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::ApiState;

/// `GET /status` — a snapshot of the control loop's most recent published
/// `RobotState`. Serves whatever is currently held by the `watch` channel;
/// never blocks waiting for a fresher tick.
pub async fn get_status(State(state): State<ApiState>) -> Json<companion_core::robot_state::RobotState> {
    Json(state.robot_state_rx.borrow().clone())
}

#[derive(Debug, Serialize)]
pub struct ParamsResponse {
    specs: &'static [ParamSpec],
    values: BTreeMap<String, ParamValue>,
}

/// `GET /params` — full schema (types, defaults, bounds) plus current values.
pub async fn get_params(State(state): State<ApiState>) -> Json<ParamsResponse> {
    let snapshot = state.params.load();
    let values = snapshot
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Json(ParamsResponse {
        specs: state.params.specs(),
        values,
    })
}

/// `POST /params` — transactional batch update (§3, §4.9). Either every
/// key in the body validates and applies, or none do; rejected keys are
/// reported individually rather than collapsing to one generic error.
pub async fn post_params(
    State(state): State<ApiState>,
    Json(batch): Json<BTreeMap<String, ParamValue>>,
) -> Result<Json<BTreeMap<String, ParamValue>>, ApiError> {
    if let Err(batch_error) = state.params.check_hot_reloadable(&batch) {
        return Err(ApiError::invalid_batch(stringify_errors(&batch_error.errors)));
    }

    let changed = match state.params.update(&batch) {
        Ok(changed) => changed,
        Err(batch_error) => {
            return Err(ApiError::invalid_batch(stringify_errors(&batch_error.errors)));
        }
    };

    for update in changed {
        // A full mailbox here means the control loop is badly behind;
        // dropping the update leaves the stale value live in hardware
        // until the next change, which is the same user-visible failure
        // mode as a dropped `SET_CONFIG` frame on the wire itself.
        let _ = state.reflex_config_tx.try_send(update);
    }

    Ok(Json(batch))
}

fn stringify_errors(errors: &BTreeMap<String, ParamError>) -> BTreeMap<String, String> {
    errors.iter().map(|(k, v)| (k.clone(), v.to_string())).collect()
}
