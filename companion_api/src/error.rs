//! Shared error envelope for the web API (§6.3).
//!
//! `POST /params` and `POST /actions` both report failure the same way: a
//! flat `{"error": "..."}` for outright refusals (409), or the same shape
//! plus a `details` map of per-key reasons for a rejected batch (400).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

/// An error response the route handlers can build directly and return.
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// A plain refusal with no per-key breakdown — 409s in this API.
    pub fn refused(status: StatusCode, reason: &'static str) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: reason,
                details: None,
            },
        }
    }

    /// A rejected batch with per-key reasons — 400s in this API.
    pub fn invalid_batch(details: BTreeMap<String, String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: "one or more parameters were rejected",
                details: Some(details),
            },
        }
    }

    /// The control loop didn't answer within the reply deadline — most
    /// likely it has died and the watchdog hasn't respawned it yet.
    pub fn control_loop_unreachable() -> Self {
        Self::refused(
            StatusCode::SERVICE_UNAVAILABLE,
            "control loop did not respond in time",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_has_no_details() {
        let err = ApiError::refused(StatusCode::CONFLICT, "already in that mode");
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert!(err.body.details.is_none());
        assert_eq!(err.body.error, "already in that mode");
    }

    #[test]
    fn invalid_batch_is_bad_request_with_details() {
        let mut details = BTreeMap::new();
        details.insert("max_speed_mm_s".to_string(), "out of range".to_string());
        let err = ApiError::invalid_batch(details);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            err.body.details.unwrap().get("max_speed_mm_s").unwrap(),
            "out of range"
        );
    }

    #[test]
    fn control_loop_unreachable_is_503() {
        let err = ApiError::control_loop_unreachable();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.body.details.is_none());
    }

    #[test]
    fn error_body_omits_details_key_when_none() {
        let body = ErrorBody {
            error: "nope",
            details: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"nope"}"#);
    }
}
