//! Bridges the worker bus (shared-memory segments published by the
//! vision/planner workers) into the control loop's in-process channels.
//!
//! Mirrors the teacher's pattern of a background task per upstream feed
//! polling its segment on a short interval and forwarding parsed messages
//! onward — the same shape `companion_workers`' own publishers use in
//! reverse.

use std::time::Instant;

use companion_core::arbitration::ExpressionIntent;
use companion_core::cycle::VisionSample;
use companion_ipc::data::segments::{PLANNER_ARTIFACTS, VISION_DETECTIONS};
use companion_ipc::data::{PlanAction, PlannerMessage, VisionMessage};
use companion_ipc::SegmentReader;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const ATTACH_RETRY_INTERVAL: Duration = Duration::from_millis(250);

async fn attach_with_retry(name: &str) -> SegmentReader {
    loop {
        match SegmentReader::attach(name) {
            Ok(reader) => return reader,
            Err(err) => {
                debug!(segment = name, %err, "segment not yet available, retrying");
                tokio::time::sleep(ATTACH_RETRY_INTERVAL).await;
            }
        }
    }
}

/// Forward the vision worker's detections into `CycleInputs::vision_rx`
/// as a `VisionSample`, one per changed frame.
pub fn spawn_vision_bridge(vision_tx: mpsc::Sender<VisionSample>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = attach_with_retry(VISION_DETECTIONS).await;
        let mut ticker = interval(POLL_INTERVAL);
        loop {
            ticker.tick().await;
            if !reader.has_changed() {
                continue;
            }
            let data = match reader.read() {
                Ok(data) => data,
                Err(err) => {
                    warn!(%err, "failed to read vision segment");
                    continue;
                }
            };
            match serde_json::from_slice::<VisionMessage>(data) {
                Ok(message) => {
                    let sample = VisionSample {
                        forward_confidence: message.max_forward_confidence,
                        received_at: Instant::now(),
                    };
                    if vision_tx.try_send(sample).is_err() {
                        debug!("vision channel full, dropping sample");
                    }
                }
                Err(err) => warn!(%err, "failed to parse vision message"),
            }
        }
    })
}

fn expression_intent_from_actions(actions: &[PlanAction]) -> Option<ExpressionIntent> {
    let mut intent = ExpressionIntent::default();
    let mut found = false;
    for action in actions {
        match action {
            PlanAction::Emote { name, intensity } => {
                intent.mood_name = Some(name.clone());
                intent.intensity = *intensity;
                found = true;
            }
            PlanAction::Gesture { name, .. } => {
                intent.gesture_name = Some(name.clone());
                found = true;
            }
            PlanAction::Say { .. } | PlanAction::Skill { .. } => {}
        }
    }
    found.then_some(intent)
}

/// Republish the planner worker's connection state onto
/// `CycleInputs::planner_connected_rx`, and translate any fresh plan
/// artifact's emote/gesture actions into an `ExpressionIntent` for the
/// expression arbiter. `Say`/`Skill` actions have no consumer in this
/// workspace (speech playback and onboard skills beyond wander are out of
/// scope) and are dropped here rather than queued nowhere.
pub fn spawn_planner_bridge(
    connected_tx: watch::Sender<bool>,
    expression_intent_tx: mpsc::Sender<ExpressionIntent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = attach_with_retry(PLANNER_ARTIFACTS).await;
        let mut ticker = interval(POLL_INTERVAL);
        let mut last_plan_id: Option<String> = None;
        loop {
            ticker.tick().await;
            if !reader.has_changed() {
                continue;
            }
            let data = match reader.read() {
                Ok(data) => data,
                Err(err) => {
                    warn!(%err, "failed to read planner artifacts segment");
                    continue;
                }
            };
            match serde_json::from_slice::<PlannerMessage>(data) {
                Ok(message) => {
                    let _ = connected_tx.send(message.connected);
                    if let Some(artifact) = message.artifact {
                        if last_plan_id.as_deref() != Some(artifact.plan_id.as_str()) {
                            last_plan_id = Some(artifact.plan_id.clone());
                            if let Some(intent) = expression_intent_from_actions(&artifact.actions) {
                                if expression_intent_tx.try_send(intent).is_err() {
                                    debug!("expression intent channel full, dropping");
                                }
                            }
                        }
                    }
                }
                Err(err) => warn!(%err, "failed to parse planner message"),
            }
        }
    })
}
