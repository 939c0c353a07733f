//! A `Deserialize`-able mirror of [`companion_core::robot_state::RobotState`].
//!
//! `RobotState` itself is serialize-only — `safety_tag` is a borrowed
//! `&'static str` that can't round-trip through `Deserialize` — so this CLI,
//! being the one place in the workspace that reads a `RobotState` back in
//! off the wire instead of building one fresh, owns its own copy with that
//! one field widened to `String`. Every other field reuses the
//! `companion_core`/`companion_common` types directly.

use companion_common::fault::FaultSet;
use companion_common::state::Mode;
use companion_common::twist::Twist;
use companion_core::robot_state::{ConversationState, Diagnostics, FaceStatusSnapshot, ReflexTelemetrySnapshot};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct StatusReport {
    pub mode: Mode,
    pub reflex_connected: bool,
    pub face_connected: bool,
    pub planner_connected: bool,
    pub faults: FaultSet,
    pub last_reflex_telemetry: Option<ReflexTelemetrySnapshot>,
    pub last_face_status: Option<FaceStatusSnapshot>,
    pub commanded_twist: Twist,
    pub desired_twist: Twist,
    pub safety_scale: f32,
    pub safety_tag: Option<String>,
    pub conversation_state: ConversationState,
    pub unknown_expr_count: u64,
    pub reflex_diagnostics: Diagnostics,
    pub face_diagnostics: Diagnostics,
    pub tick_overruns: u64,
    pub session_started_ns: u64,
    pub session_duration_s: u64,
}

impl StatusReport {
    /// True if any latching fault is set or a transport is disconnected —
    /// the single yes/no health question most callers actually want.
    pub fn is_healthy(&self) -> bool {
        !self.faults.intersects(FaultSet::LATCHING_MASK) && self.reflex_connected && self.face_connected
    }

    /// Human-readable multi-line report, in the style of a `Debug`-derived
    /// dump but ordered for a human scanning it, not a machine parsing it.
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("mode: {:?}\n", self.mode));
        out.push_str(&format!(
            "links: reflex={} face={} planner={}\n",
            conn(self.reflex_connected),
            conn(self.face_connected),
            conn(self.planner_connected)
        ));
        out.push_str(&format!("faults: {:?}\n", self.faults));
        out.push_str(&format!(
            "twist: commanded={:?} desired={:?} safety_scale={:.2} safety_tag={}\n",
            self.commanded_twist,
            self.desired_twist,
            self.safety_scale,
            self.safety_tag.as_deref().unwrap_or("-")
        ));
        out.push_str(&format!(
            "conversation: {:?} unknown_expr_count={}\n",
            self.conversation_state, self.unknown_expr_count
        ));
        out.push_str(&format!(
            "reflex diagnostics: {}\n",
            format_diagnostics(&self.reflex_diagnostics)
        ));
        out.push_str(&format!(
            "face diagnostics:   {}\n",
            format_diagnostics(&self.face_diagnostics)
        ));
        out.push_str(&format!(
            "tick_overruns: {} session_duration_s: {}\n",
            self.tick_overruns, self.session_duration_s
        ));
        out
    }
}

fn conn(up: bool) -> &'static str {
    if up { "up" } else { "down" }
}

fn format_diagnostics(d: &Diagnostics) -> String {
    format!(
        "rx={} tx={} ok={} bad={} reconnects={} last_error={}",
        d.rx_bytes,
        d.tx_bytes,
        d.frames_ok,
        d.frames_bad,
        d.reconnects,
        d.last_error_kind.as_deref().unwrap_or("-")
    )
}
