//! Errors talking to the supervisor's web API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiagnosticError {
    /// Non-2xx response from `companion_api`.
    #[error("supervisor returned HTTP {status}")]
    Http { status: u16 },

    /// Connect, TLS, timeout, or decode failure.
    #[error("transport error talking to supervisor: {0}")]
    Transport(#[from] reqwest::Error),
}
