//! Planner client error taxonomy.

use thiserror::Error;

/// Errors from talking to the remote planner service.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Non-2xx HTTP response.
    #[error("planner returned HTTP {status}")]
    Http {
        /// The response status code.
        status: u16,
    },

    /// Underlying HTTP transport failure (connect, TLS, timeout, decode).
    #[error("planner transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Underlying WebSocket transport failure.
    #[error("planner websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// `/converse` was called while a session was already active for
    /// this robot — only one is allowed at a time.
    #[error("a converse session is already active for this robot")]
    SessionBusy,
}
