//! HTTP/WS client for the remote planner service.

use crate::error::PlannerError;
use companion_common::config::PlannerConfig;
use companion_ipc::data::PlanArtifact;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

#[derive(Debug, Serialize)]
struct PlanRequest<'a> {
    robot_id: &'a str,
    seq: u64,
    monotonic_ts_ms: u64,
    world_state: serde_json::Value,
}

/// Client for `/plan`, `/tts`, and `/converse` (§4.10). One instance per
/// process; `converse()` enforces "one active session per `robot_id`" via
/// an internal flag shared with the returned [`ConverseSession`].
pub struct PlannerClient {
    http: reqwest::Client,
    base_url: String,
    robot_id: String,
    timeout: Duration,
    converse_busy: Arc<AtomicBool>,
}

impl PlannerClient {
    /// Build a client from the workspace's `[planner]` config section.
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            robot_id: config.robot_id.clone(),
            timeout: Duration::from_secs(config.timeout_s),
            converse_busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// `POST /plan`. A non-200 response or a timeout is surfaced as an
    /// error; the caller (the planner worker loop) is responsible for
    /// feeding that into a [`crate::FallbackPolicy`].
    pub async fn plan(
        &self,
        seq: u64,
        monotonic_ts_ms: u64,
        world_state: serde_json::Value,
    ) -> Result<PlanArtifact, PlannerError> {
        let url = format!("{}/plan", self.base_url);
        let body = PlanRequest {
            robot_id: &self.robot_id,
            seq,
            monotonic_ts_ms,
            world_state,
        };
        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PlannerError::Http {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json::<PlanArtifact>().await?)
    }

    /// `POST /tts`: direct speech synthesis, returning raw audio bytes.
    pub async fn tts(&self, text: &str) -> Result<Vec<u8>, PlannerError> {
        let url = format!("{}/tts", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "text": text }))
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PlannerError::Http {
                status: response.status().as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Open the single allowed `/converse` session for this robot.
    pub async fn converse(&self) -> Result<ConverseSession, PlannerError> {
        if self.converse_busy.swap(true, Ordering::AcqRel) {
            return Err(PlannerError::SessionBusy);
        }
        let ws_url = format!(
            "{}/converse",
            self.base_url.replacen("http", "ws", 1)
        );
        let stream = match tokio_tungstenite::connect_async(ws_url).await {
            Ok((stream, _response)) => stream,
            Err(err) => {
                self.converse_busy.store(false, Ordering::Release);
                return Err(PlannerError::from(err));
            }
        };
        Ok(ConverseSession {
            stream,
            busy_flag: self.converse_busy.clone(),
        })
    }
}

/// A single full-duplex STT/TTS streaming session. Mid-turn failure (a
/// `recv`/`send_audio` error) should be treated by the caller as a
/// cancelled turn: clear queued speech and fall back, per §4.10.
pub struct ConverseSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    busy_flag: Arc<AtomicBool>,
}

impl ConverseSession {
    /// Send a chunk of PCM audio upstream.
    pub async fn send_audio(&mut self, pcm: Vec<u8>) -> Result<(), PlannerError> {
        self.stream.send(Message::Binary(pcm)).await?;
        Ok(())
    }

    /// Receive the next message (synthesized audio or control frame), or
    /// `None` once the remote end closes the stream.
    pub async fn recv(&mut self) -> Result<Option<Message>, PlannerError> {
        match self.stream.next().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(err)) => Err(err.into()),
            None => Ok(None),
        }
    }
}

impl Drop for ConverseSession {
    fn drop(&mut self) {
        self.busy_flag.store(false, Ordering::Release);
    }
}
