//! HTTP client for `companion_api`'s read-only diagnostic surface.

use std::time::Duration;

use crate::error::DiagnosticError;
use crate::report::StatusReport;

/// Talks to a running supervisor's `companion_api` over plain HTTP. No
/// SHM, no gRPC, no MQTT — the web API is the only diagnostic surface a
/// single-process supervisor exposes (§5).
pub struct DiagnosticClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DiagnosticClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    /// `GET /status`.
    pub async fn status(&self) -> Result<StatusReport, DiagnosticError> {
        let url = format!("{}/status", self.base_url);
        let response = self.http.get(&url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            return Err(DiagnosticError::Http {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json::<StatusReport>().await?)
    }

    /// `GET /params`, returned as raw JSON — the full `ParamSpec` schema
    /// lives in `companion_api`, and this CLI has no reason to duplicate
    /// that type just to print it back out.
    pub async fn params(&self) -> Result<serde_json::Value, DiagnosticError> {
        let url = format!("{}/params", self.base_url);
        let response = self.http.get(&url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            return Err(DiagnosticError::Http {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json::<serde_json::Value>().await?)
    }
}
