//! Layered safety pipeline (§4.5): an ordered chain of gates that reduce a
//! desired twist to a commanded twist. The first gate that zeroes the twist
//! short-circuits the rest, and its tag becomes the tick's attribution.

use companion_common::fault::FaultSet;
use companion_common::state::Mode;
use companion_common::twist::Twist;
use companion_common::wire::RangeStatus;

/// Everything a gate needs to know about this tick, gathered once by the
/// control loop before folding over the gate chain.
#[derive(Debug, Clone, Copy)]
pub struct SafetyContext {
    pub mode: Mode,
    pub faults: FaultSet,
    pub reflex_connected: bool,
    pub range_mm: u16,
    pub range_status: RangeStatus,
    pub range_age_ms: u64,
    pub vision_forward_confidence: Option<f32>,
    pub vision_age_ms: Option<u64>,
    pub hard_stop_mm: u16,
    pub half_scale_mm: u16,
    pub range_stale_ms: u64,
    pub vision_stale_ms: u64,
    pub forward_epsilon_mm_s: i16,
}

/// Result of running the full pipeline for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOutcome {
    pub twist: Twist,
    pub scale: f32,
    pub tag: Option<&'static str>,
}

/// Scale only the forward (v) component, leaving angular velocity (w)
/// untouched — range/vision attenuation never affects in-place rotation.
fn scale_forward_v(twist: Twist, factor: f32) -> Twist {
    let scaled = (f32::from(twist.v_mm_s) * factor).round();
    let v = if scaled >= f32::from(i16::MAX) {
        i16::MAX
    } else if scaled <= f32::from(i16::MIN) {
        i16::MIN
    } else {
        scaled as i16
    };
    Twist::new(v, twist.w_mrad_s)
}

fn is_pure_rotation(twist: Twist, ctx: &SafetyContext) -> bool {
    twist.v_mm_s.abs() < ctx.forward_epsilon_mm_s
}

/// 1. Mode gate — only TELEOP/WANDER may command motion.
fn mode_gate(twist: Twist, ctx: &SafetyContext) -> (Twist, Option<&'static str>) {
    if !matches!(ctx.mode, Mode::Teleop | Mode::Wander) {
        (Twist::ZERO, Some("mode"))
    } else {
        (twist, None)
    }
}

/// 2. Fault gate — any fault other than OBSTACLE zeroes the twist.
fn fault_gate(twist: Twist, ctx: &SafetyContext) -> (Twist, Option<&'static str>) {
    let blocking = ctx.faults & !FaultSet::OBSTACLE;
    if !blocking.is_empty() {
        (Twist::ZERO, Some("fault"))
    } else {
        (twist, None)
    }
}

/// 3. Disconnect gate.
fn disconnect_gate(twist: Twist, ctx: &SafetyContext) -> (Twist, Option<&'static str>) {
    if !ctx.reflex_connected {
        (Twist::ZERO, Some("disconnect"))
    } else {
        (twist, None)
    }
}

/// 4. Range gate — hard stop or half-scale on a fresh, valid/warn sample.
fn range_gate(twist: Twist, ctx: &SafetyContext) -> (Twist, Option<&'static str>) {
    if is_pure_rotation(twist, ctx) || twist.v_mm_s < 0 {
        return (twist, None);
    }
    if !matches!(ctx.range_status, RangeStatus::Valid | RangeStatus::Warn) {
        return (twist, None);
    }
    if ctx.range_mm <= ctx.hard_stop_mm {
        (scale_forward_v(twist, 0.0), Some("range_hardstop"))
    } else if ctx.range_mm <= ctx.half_scale_mm {
        (scale_forward_v(twist, 0.5), Some("range_scale_0.5"))
    } else {
        (twist, None)
    }
}

/// 5. Stale range gate.
fn stale_range_gate(twist: Twist, ctx: &SafetyContext) -> (Twist, Option<&'static str>) {
    if is_pure_rotation(twist, ctx) || twist.v_mm_s < 0 {
        return (twist, None);
    }
    let stale = ctx.range_age_ms > ctx.range_stale_ms || matches!(ctx.range_status, RangeStatus::Stale);
    if stale {
        (scale_forward_v(twist, 0.5), Some("range_stale"))
    } else {
        (twist, None)
    }
}

/// 6. Vision gate — confident forward-cone detections attenuate forward v.
fn vision_gate(twist: Twist, ctx: &SafetyContext) -> (Twist, Option<&'static str>) {
    if is_pure_rotation(twist, ctx) || twist.v_mm_s < 0 {
        return (twist, None);
    }
    match ctx.vision_forward_confidence {
        Some(confidence) if confidence > 0.0 => {
            let factor = (1.0 - confidence).max(0.25);
            (scale_forward_v(twist, factor), Some("vision"))
        }
        _ => (twist, None),
    }
}

/// 7. Stale vision gate.
fn stale_vision_gate(twist: Twist, ctx: &SafetyContext) -> (Twist, Option<&'static str>) {
    if is_pure_rotation(twist, ctx) || twist.v_mm_s < 0 {
        return (twist, None);
    }
    match ctx.vision_age_ms {
        Some(age) if age > ctx.vision_stale_ms => (scale_forward_v(twist, 0.5), Some("vision_stale")),
        None => (scale_forward_v(twist, 0.5), Some("vision_stale")),
        _ => (twist, None),
    }
}

type Gate = fn(Twist, &SafetyContext) -> (Twist, Option<&'static str>);

const GATES: &[Gate] = &[
    mode_gate,
    fault_gate,
    disconnect_gate,
    range_gate,
    stale_range_gate,
    vision_gate,
    stale_vision_gate,
];

/// Run the full pipeline. Attribution goes to the first gate that changes
/// the twist at all; later gates still run and their scales still
/// multiply in, but only the first tag is kept (gates after a zeroing gate
/// are no-ops anyway, since a zero twist trivially passes the pure-rotation
/// check in gates 4-7).
pub fn run_pipeline(desired: Twist, ctx: &SafetyContext) -> PipelineOutcome {
    let mut twist = desired;
    let mut tag: Option<&'static str> = None;

    for gate in GATES {
        let (next, gate_tag) = gate(twist, ctx);
        if tag.is_none() && gate_tag.is_some() && next != twist {
            tag = gate_tag;
        }
        twist = next;
    }

    let scale = if desired.v_mm_s == 0 {
        1.0
    } else {
        f32::from(twist.v_mm_s) / f32::from(desired.v_mm_s)
    };

    PipelineOutcome { twist, scale, tag }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_ctx() -> SafetyContext {
        SafetyContext {
            mode: Mode::Teleop,
            faults: FaultSet::empty(),
            reflex_connected: true,
            range_mm: 2000,
            range_status: RangeStatus::Valid,
            range_age_ms: 0,
            vision_forward_confidence: None,
            vision_age_ms: Some(0),
            hard_stop_mm: 250,
            half_scale_mm: 500,
            range_stale_ms: 500,
            vision_stale_ms: 500,
            forward_epsilon_mm_s: 10,
        }
    }

    #[test]
    fn non_teleop_mode_zeroes_with_mode_tag() {
        let ctx = SafetyContext { mode: Mode::Idle, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert!(outcome.twist.is_zero());
        assert_eq!(outcome.tag, Some("mode"));
    }

    #[test]
    fn estop_fault_zeroes_with_fault_tag() {
        let ctx = SafetyContext { faults: FaultSet::ESTOP, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert!(outcome.twist.is_zero());
        assert_eq!(outcome.tag, Some("fault"));
    }

    #[test]
    fn obstacle_alone_does_not_trigger_fault_gate() {
        let ctx = SafetyContext { faults: FaultSet::OBSTACLE, range_mm: 2000, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(300, 0));
    }

    #[test]
    fn disconnected_zeroes_with_disconnect_tag() {
        let ctx = SafetyContext { reflex_connected: false, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert!(outcome.twist.is_zero());
        assert_eq!(outcome.tag, Some("disconnect"));
    }

    #[test]
    fn range_hardstop_at_220mm() {
        let ctx = SafetyContext { range_mm: 220, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(0, 0));
        assert_eq!(outcome.tag, Some("range_hardstop"));
    }

    #[test]
    fn range_half_scale_at_400mm() {
        let ctx = SafetyContext { range_mm: 400, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(150, 0));
        assert_eq!(outcome.tag, Some("range_scale_0.5"));
    }

    #[test]
    fn backward_motion_never_attenuated_by_range() {
        let ctx = SafetyContext { range_mm: 100, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(-300, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(-300, 0));
    }

    #[test]
    fn pure_rotation_unaffected_by_range() {
        let ctx = SafetyContext { range_mm: 100, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(0, 500), &ctx);
        assert_eq!(outcome.twist, Twist::new(0, 500));
    }

    #[test]
    fn stale_range_halves_forward_v() {
        let ctx = SafetyContext { range_age_ms: 600, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(150, 0));
        assert_eq!(outcome.tag, Some("range_stale"));
    }

    #[test]
    fn warn_status_still_gates_like_valid() {
        let ctx = SafetyContext { range_mm: 220, range_status: RangeStatus::Warn, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(0, 0));
        assert_eq!(outcome.tag, Some("range_hardstop"));
    }

    #[test]
    fn stale_status_halves_forward_v_even_when_fresh() {
        let ctx = SafetyContext { range_status: RangeStatus::Stale, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(150, 0));
        assert_eq!(outcome.tag, Some("range_stale"));
    }

    #[test]
    fn sensor_fault_status_skips_range_gates_entirely() {
        let ctx = SafetyContext { range_mm: 100, range_status: RangeStatus::SensorFault, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(300, 0));
        assert_eq!(outcome.tag, None);
    }

    #[test]
    fn vision_detection_scales_by_one_minus_confidence_floored_at_quarter() {
        let ctx = SafetyContext { vision_forward_confidence: Some(0.9), ..base_ctx() };
        let outcome = run_pipeline(Twist::new(400, 0), &ctx);
        // max(0.25, 1 - 0.9) = 0.25
        assert_eq!(outcome.twist, Twist::new(100, 0));
    }

    #[test]
    fn stale_vision_halves_forward_v() {
        let ctx = SafetyContext { vision_age_ms: Some(600), ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(150, 0));
        assert_eq!(outcome.tag, Some("vision_stale"));
    }

    #[test]
    fn missing_vision_message_counts_as_stale() {
        let ctx = SafetyContext { vision_age_ms: None, ..base_ctx() };
        let outcome = run_pipeline(Twist::new(300, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(150, 0));
    }

    #[test]
    fn cascading_scales_multiply() {
        // Stale range (0.5) then stale vision (0.5) → 0.25 of desired.
        let ctx = SafetyContext { range_age_ms: 600, vision_age_ms: Some(600), ..base_ctx() };
        let outcome = run_pipeline(Twist::new(400, 0), &ctx);
        assert_eq!(outcome.twist, Twist::new(100, 0));
    }

    #[test]
    fn commanded_v_never_exceeds_desired_v_magnitude() {
        for range in [50u16, 220, 300, 400, 600, 2000] {
            for confidence in [None, Some(0.1), Some(0.9)] {
                let ctx = SafetyContext { range_mm: range, vision_forward_confidence: confidence, ..base_ctx() };
                let outcome = run_pipeline(Twist::new(500, 0), &ctx);
                assert!(outcome.twist.v_mm_s.abs() <= 500);
                assert!(outcome.twist.v_mm_s >= 0);
            }
        }
    }
}
