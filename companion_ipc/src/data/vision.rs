//! Messages published by the vision worker.

use serde::{Deserialize, Serialize};

/// A single detected object in the vision worker's frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    /// Bounding box, normalized to `[0.0, 1.0]` of frame width/height.
    pub bbox: [f32; 4],
    /// True if the detection falls in the robot's forward travel cone.
    pub in_forward_cone: bool,
}

/// One published vision message: a frame's detections plus timing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionMessage {
    pub frame_seq: u64,
    pub t_cam_ns: u64,
    pub t_det_done_ns: u64,
    pub detections: Vec<Detection>,
    /// Highest-confidence in-cone detection's confidence, or 0.0 if none.
    pub max_forward_confidence: f32,
}
