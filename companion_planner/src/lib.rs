//! HTTP/WS client for the remote planner service (§4.10), plus the
//! `Normal -> ConfusedRetry -> SkippedThisTurn` fallback ladder described
//! for mid-turn planner failures. The `planner_worker` binary in
//! `src/bin/` wraps this client into a worker-bus process matching the
//! vision/audio workers' shape.

pub mod client;
pub mod error;
pub mod fallback;

pub use client::{ConverseSession, PlannerClient};
pub use error::PlannerError;
pub use fallback::{FallbackEvent, FallbackPolicy};
