//! The 50 Hz control loop (§4.8): reads buffered telemetry, advances the
//! mode/fault state machine, computes a desired twist from the active mode
//! driver, runs it through the safety pipeline, emits commands to both
//! MCUs, drains worker messages, arbitrates expressions, and periodically
//! broadcasts a `RobotState` snapshot.
//!
//! Modeled on the teacher's cycle runner: a fixed-period loop that counts
//! overruns rather than panicking on them. Where the teacher used an
//! absolute-time `clock_nanosleep` RT loop, this loop uses
//! `tokio::time::interval` with `MissedTickBehavior::Skip` — the supervisor
//! core has no hard real-time budget, only a soft 20 ms nominal period.

use std::time::Instant;

use companion_common::consts::{CYCLE_PERIOD_MS, TELEMETRY_BROADCAST_EVERY};
use companion_common::fault::FaultSet;
use companion_common::state::{ModeEvent, ModeStateMachine, RequestedMode, TransitionResult};
use companion_common::twist::Twist;
use companion_common::wire::FaceCommand;
use companion_link::{DeviceClient, FaceClient, FaceEvent, ReflexClient};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::arbitration::{Arbiter, ArbitratedExpression, ExpressionIntent};
use crate::config::CoreConfig;
use crate::params::ReflexConfigUpdate;
use crate::robot_state::{ConversationState, Diagnostics, FaceStatusSnapshot, ReflexTelemetrySnapshot, RobotState};
use crate::safety::{run_pipeline, SafetyContext};
use crate::skills::WanderSkill;

/// Desired twist supplied by the web API for TELEOP mode, stamped with the
/// instant it arrived so the loop can detect staleness (§4.2: an API
/// desired twist older than `teleop_stale_ms` is treated as zero).
#[derive(Debug, Clone, Copy)]
pub struct TeleopIntent {
    pub twist: Twist,
    pub received_at: Instant,
}

/// A mode/clear-error request from the web API, with a reply channel for
/// the synchronous 200/409 response.
#[derive(Debug)]
pub struct ModeRequest {
    pub requested_mode: Option<RequestedMode>,
    pub clear_error: bool,
    pub reply: oneshot::Sender<TransitionResult>,
}

/// `POST /actions` requests that talk to the Reflex MCU directly rather
/// than through the mode state machine's `requested_mode`/`clear_error`
/// inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflexAction {
    /// Command an immediate hardware e-stop. Fault propagation is the next
    /// telemetry frame's concern — this tick's reply reflects the command
    /// being issued, not the resulting transition.
    EStop,
    /// Acknowledge the latching faults and ask the mode state machine to
    /// leave ERROR in the same tick, same as `clear_error`.
    ClearEStop,
}

/// A `ReflexAction` request from the web API, with a reply channel.
#[derive(Debug)]
pub struct ReflexActionRequest {
    pub action: ReflexAction,
    pub reply: oneshot::Sender<TransitionResult>,
}

/// Inbound channels the control loop drains once per tick. Each field is a
/// `try_recv`-only consumer — a send while the loop is mid-tick simply
/// waits for the next one.
pub struct CycleInputs {
    pub teleop_intent_rx: watch::Receiver<Option<TeleopIntent>>,
    pub mode_request_rx: mpsc::Receiver<ModeRequest>,
    pub reflex_action_rx: mpsc::Receiver<ReflexActionRequest>,
    pub expression_intent_rx: mpsc::Receiver<ExpressionIntent>,
    pub vision_rx: mpsc::Receiver<VisionSample>,
    pub reflex_config_rx: mpsc::Receiver<ReflexConfigUpdate>,
    /// Whether the planner worker currently reports a connected session
    /// (§3: `PlannerMessage.connected`), polled off its shared-memory
    /// segment by whatever assembles `CycleInputs` and republished here as
    /// a `watch` so the loop always has a current value, not a
    /// once-per-change event to miss.
    pub planner_connected_rx: watch::Receiver<bool>,
}

/// A single forward-cone obstacle estimate from the vision worker.
#[derive(Debug, Clone, Copy)]
pub struct VisionSample {
    pub forward_confidence: f32,
    pub received_at: Instant,
}

/// Per-tick counters, surfaced for diagnostics and logged on shutdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickStats {
    pub count: u64,
    pub overruns: u64,
}

/// Owns every piece of long-lived state the control loop touches across
/// ticks. Constructed once by `companion_supervisor` and driven by
/// [`CycleRunner::run`].
pub struct CycleRunner {
    reflex: ReflexClient,
    face: FaceClient,
    mode_sm: ModeStateMachine,
    faults: FaultSet,
    wander: WanderSkill,
    arbiter: Arbiter,
    config: CoreConfig,
    state_tx: watch::Sender<RobotState>,
    inputs: CycleInputs,
    stats: TickStats,
    last_reflex_telemetry: Option<ReflexTelemetrySnapshot>,
    last_face_status: Option<FaceStatusSnapshot>,
    last_vision: Option<VisionSample>,
    planner_connected: bool,
    reflex_diagnostics: Diagnostics,
    face_diagnostics: Diagnostics,
    conversation_state: ConversationState,
    session_started_ns: u64,
}

impl CycleRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reflex: ReflexClient,
        face: FaceClient,
        config: CoreConfig,
        inputs: CycleInputs,
        session_started_ns: u64,
    ) -> (Self, watch::Receiver<RobotState>) {
        let (state_tx, state_rx) = watch::channel(RobotState::new(session_started_ns));
        let runner = Self {
            reflex,
            face,
            mode_sm: ModeStateMachine::new(),
            faults: FaultSet::empty(),
            wander: WanderSkill::new(),
            arbiter: Arbiter::new(),
            config,
            state_tx,
            inputs,
            stats: TickStats::default(),
            last_reflex_telemetry: None,
            last_face_status: None,
            last_vision: None,
            planner_connected: false,
            reflex_diagnostics: Diagnostics::default(),
            face_diagnostics: Diagnostics::default(),
            conversation_state: ConversationState::Idle,
            session_started_ns,
        };
        (runner, state_rx)
    }

    /// Run until the process is torn down. Errors bubbling out of a single
    /// tick are logged and the loop continues — only transport construction
    /// failures are fatal, and those happen before this is ever called.
    pub async fn run(mut self) {
        let mut ticker = interval(std::time::Duration::from_millis(CYCLE_PERIOD_MS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("control loop starting");
        loop {
            let tick_start = Instant::now();
            ticker.tick().await;
            if tick_start.elapsed() > std::time::Duration::from_millis(CYCLE_PERIOD_MS) {
                self.stats.overruns += 1;
            }

            self.tick().await;
            self.stats.count += 1;
        }
    }

    async fn tick(&mut self) {
        self.drain_reflex_telemetry();
        self.drain_face_events();
        self.drain_vision();
        self.reflex_diagnostics.merge_link_counters(&self.reflex.diagnostics());
        self.face_diagnostics.merge_link_counters(&self.face.diagnostics());
        self.planner_connected = *self.inputs.planner_connected_rx.borrow();
        self.forward_reflex_config_updates().await;
        let mode_request = self.drain_mode_request();
        let reflex_action = self.drain_reflex_action();

        if let Some(req) = &reflex_action {
            match req.action {
                ReflexAction::EStop => {
                    if let Err(e) = self.reflex.estop().await {
                        warn!(error = %e, "failed to send estop to reflex MCU");
                    }
                }
                ReflexAction::ClearEStop => {
                    let mask = FaultSet::LATCHING_MASK.bits();
                    if let Err(e) = self.reflex.clear_faults(mask).await {
                        warn!(error = %e, "failed to send clear_faults to reflex MCU");
                    }
                }
            }
        }

        let reflex_connected = self.reflex_connected();
        let face_connected = self.face_connected();
        self.faults = self.faults.with_disconnect(!reflex_connected);

        let (requested_mode, mut clear_error) = match &mode_request {
            Some(req) => (req.requested_mode, req.clear_error),
            None => (None, false),
        };
        if let Some(ReflexActionRequest { action: ReflexAction::ClearEStop, .. }) = &reflex_action {
            clear_error = true;
        }

        let previous_mode = self.mode_sm.mode();
        let transition = self.mode_sm.handle_event(ModeEvent {
            reflex_connected,
            face_connected,
            faults: self.faults,
            requested_mode,
            clear_error,
        });

        if let Some(req) = mode_request {
            let _ = req.reply.send(transition);
        }
        if let Some(req) = reflex_action {
            let _ = req.reply.send(transition);
        }

        if let TransitionResult::Ok(new_mode) = transition {
            if new_mode != previous_mode {
                debug!(from = ?previous_mode, to = ?new_mode, "mode transition");
            }
        }

        if previous_mode != companion_common::state::Mode::Wander
            && transition == TransitionResult::Ok(companion_common::state::Mode::Wander)
        {
            self.wander.reset();
        }

        let desired = self.compute_desired_twist();
        let outcome = run_pipeline(desired, &self.safety_context());

        if let Err(e) = self.reflex.set_twist(outcome.twist.v_mm_s, outcome.twist.w_mrad_s).await {
            warn!(error = %e, "failed to send twist to reflex MCU");
        }

        self.drive_expression().await;

        let state = self.snapshot_state(desired, outcome.twist, outcome.scale, outcome.tag);
        debug_assert!(state.upholds_error_invariant());
        if self.stats.count % TELEMETRY_BROADCAST_EVERY == 0 {
            let _ = self.state_tx.send(state);
        }
    }

    /// Whether the Reflex MCU link is live: telemetry has arrived, and
    /// recently enough to trust (§7: no telemetry for
    /// `device_stale_ms` is a logical disconnect, not merely "never heard
    /// from it").
    fn reflex_connected(&self) -> bool {
        self.reflex
            .last_telemetry_at()
            .map(|at| at.elapsed().as_millis() as u64 <= self.config.safety.device_stale_ms)
            .unwrap_or(false)
    }

    /// Same staleness check as [`Self::reflex_connected`], for the Face MCU.
    fn face_connected(&self) -> bool {
        self.face
            .last_telemetry_at()
            .map(|at| at.elapsed().as_millis() as u64 <= self.config.safety.device_stale_ms)
            .unwrap_or(false)
    }

    fn drain_reflex_telemetry(&mut self) {
        while let Some(state) = self.reflex.try_recv_state() {
            self.faults = FaultSet::from_bits_truncate(state.faults_mask)
                .with_obstacle(state.range_mm <= self.config.safety.hard_stop_mm);
            self.reflex_diagnostics.frames_ok += 1;
            self.last_reflex_telemetry = Some(ReflexTelemetrySnapshot {
                state,
                t_src_us: 0,
                t_pi_rx_ns: now_ns(),
            });
        }
    }

    fn drain_face_events(&mut self) {
        while let Some(event) = self.face.try_recv_event() {
            if let FaceEvent::Status(status) = event {
                self.face_diagnostics.frames_ok += 1;
                self.last_face_status = Some(FaceStatusSnapshot {
                    status,
                    t_src_us: 0,
                    t_pi_rx_ns: now_ns(),
                });
            }
        }
    }

    fn drain_vision(&mut self) {
        while let Ok(sample) = self.inputs.vision_rx.try_recv() {
            self.last_vision = Some(sample);
        }
    }

    fn drain_mode_request(&mut self) -> Option<ModeRequest> {
        self.inputs.mode_request_rx.try_recv().ok()
    }

    fn drain_reflex_action(&mut self) -> Option<ReflexActionRequest> {
        self.inputs.reflex_action_rx.try_recv().ok()
    }

    /// Forward any parameter changes tagged with a Reflex `SET_CONFIG`
    /// binding. The param registry itself lives with the API task; this
    /// loop only ever sees the already-validated diffs it emits.
    async fn forward_reflex_config_updates(&mut self) {
        while let Ok(update) = self.inputs.reflex_config_rx.try_recv() {
            if let Err(e) = self.reflex.set_config(update.param_id, update.value).await {
                warn!(error = %e, param_id = update.param_id, "failed to forward param to reflex MCU");
            }
        }
    }

    fn compute_desired_twist(&mut self) -> Twist {
        use companion_common::state::Mode;
        match self.mode_sm.mode() {
            Mode::Teleop => {
                let intent = *self.inputs.teleop_intent_rx.borrow();
                match intent {
                    Some(intent) if intent.received_at.elapsed().as_millis() as u64 <= self.config.teleop_stale_ms => {
                        intent.twist
                    }
                    _ => Twist::ZERO,
                }
            }
            Mode::Wander => self.wander.step(&self.config.wander),
            _ => Twist::ZERO,
        }
    }

    fn safety_context(&self) -> SafetyContext {
        let range_mm = self
            .last_reflex_telemetry
            .map(|t| t.state.range_mm)
            .unwrap_or(u16::MAX);
        let range_status = self
            .last_reflex_telemetry
            .map(|t| t.state.range_status)
            .unwrap_or(companion_common::wire::RangeStatus::SensorFault);
        let range_age_ms = self
            .reflex
            .last_telemetry_at()
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(u64::MAX);
        let (vision_forward_confidence, vision_age_ms) = match self.last_vision {
            Some(sample) => (
                Some(sample.forward_confidence),
                Some(sample.received_at.elapsed().as_millis() as u64),
            ),
            None => (None, None),
        };

        SafetyContext {
            mode: self.mode_sm.mode(),
            faults: self.faults,
            reflex_connected: self.reflex_connected(),
            range_mm,
            range_status,
            range_age_ms,
            vision_forward_confidence,
            vision_age_ms,
            hard_stop_mm: self.config.safety.hard_stop_mm,
            half_scale_mm: self.config.safety.half_scale_mm,
            range_stale_ms: self.config.safety.range_stale_ms,
            vision_stale_ms: self.config.safety.vision_stale_ms,
            forward_epsilon_mm_s: self.config.safety.forward_epsilon_mm_s,
        }
    }

    async fn drive_expression(&mut self) {
        let intent = self
            .inputs
            .expression_intent_rx
            .try_recv()
            .unwrap_or_default();
        let ArbitratedExpression { mood, gesture } =
            self.arbiter.arbitrate(&intent, self.conversation_state);

        if let Some((mood, intensity)) = mood {
            let command = FaceCommand::SetState {
                mood,
                intensity: (intensity * 255.0).round() as u8,
                gaze_x_i8: 0,
                gaze_y_i8: 0,
                brightness: 255,
            };
            if let Err(e) = self.face.set_state(command).await {
                warn!(error = %e, "failed to send mood to face MCU");
            }
        }
        if let Some(gesture) = gesture {
            let command = FaceCommand::Gesture { id: gesture, duration_ms: 600 };
            if let Err(e) = self.face.gesture(command).await {
                warn!(error = %e, "failed to send gesture to face MCU");
            }
        }
    }

    fn snapshot_state(
        &self,
        desired: Twist,
        commanded: Twist,
        scale: f32,
        tag: Option<&'static str>,
    ) -> RobotState {
        RobotState {
            mode: self.mode_sm.mode(),
            reflex_connected: self.reflex_connected(),
            face_connected: self.face_connected(),
            planner_connected: self.planner_connected,
            faults: self.faults,
            last_reflex_telemetry: self.last_reflex_telemetry,
            last_face_status: self.last_face_status,
            commanded_twist: commanded,
            desired_twist: desired,
            safety_scale: scale,
            safety_tag: tag,
            conversation_state: self.conversation_state,
            unknown_expr_count: self.arbiter.unknown_expr_count(),
            reflex_diagnostics: self.reflex_diagnostics.clone(),
            face_diagnostics: self.face_diagnostics.clone(),
            tick_overruns: self.stats.overruns,
            session_started_ns: self.session_started_ns,
            session_duration_s: self.stats.count * CYCLE_PERIOD_MS / 1000,
        }
    }
}

fn now_ns() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_stats_start_at_zero() {
        let stats = TickStats::default();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.overruns, 0);
    }
}
