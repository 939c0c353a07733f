//! Messages published by the planner worker/client.

use serde::{Deserialize, Serialize};

/// One action returned by a `/plan` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanAction {
    Say { text: String },
    Emote { name: String, intensity: f32 },
    Gesture { name: String, params: Option<String> },
    Skill { name: String },
}

/// A plan artifact latched by the core until consumed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanArtifact {
    pub plan_id: String,
    pub actions: Vec<PlanAction>,
}

/// Connection state published alongside plan artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerConnectionState {
    #[default]
    Normal,
    ConfusedRetry,
    SkippedThisTurn,
}

/// One published planner message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerMessage {
    pub connected: bool,
    pub state: PlannerConnectionState,
    pub artifact: Option<PlanArtifact>,
}
