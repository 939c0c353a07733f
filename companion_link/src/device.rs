//! Device clients: thin wrappers over a framed transport, one per MCU.
//!
//! Both clients share a `DeviceClient` trait for the supervisor core to
//! depend on generically (useful in tests, where a mock transport stands
//! in for real serial hardware).

use crate::codec::{decode_frame, encode_frame, ParseError};
use crate::transport::{BackoffPolicy, TransportBackend, TransportError};
use companion_common::diagnostics::Diagnostics;
use companion_common::wire::{
    ButtonEvent, FaceCommand, FaceStatus, Heartbeat, RangeStatus, ReflexCommand, ReflexState,
    TouchEvent,
};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

fn now_ns() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Error surfaced by a device client call.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("frame encode/decode error: {0}")]
    Frame(#[from] ParseError),
}

/// Common shape for the Reflex and Face clients: send raw commands and
/// expose the most recent telemetry timestamp for staleness checks.
pub trait DeviceClient {
    /// Monotonic sequence number of the last command sent, for diagnostics.
    fn last_seq(&self) -> u8;
    /// Instant the last telemetry frame was received, if any.
    fn last_telemetry_at(&self) -> Option<Instant>;
    /// Byte/frame/reconnect counters for this link, as of the last update
    /// from the background read task.
    fn diagnostics(&self) -> Diagnostics;
}

/// Last-value slot for Reflex telemetry, updated by the read loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReflexTelemetry {
    pub state: ReflexState,
    pub received_at: Option<Instant>,
}

/// Client for the Reflex (motion) MCU.
///
/// Commands are written directly; telemetry arrives on a background read
/// task and is exposed via `subscribe_state()`.
pub struct ReflexClient {
    writer: Arc<Mutex<Option<Box<dyn tokio::io::AsyncWrite + Unpin + Send>>>>,
    seq: AtomicU8,
    last_telemetry_at: Arc<std::sync::Mutex<Option<Instant>>>,
    state_rx: mpsc::Receiver<ReflexState>,
    diagnostics: Arc<std::sync::Mutex<Diagnostics>>,
}

impl ReflexClient {
    /// Wrap an already-connected transport, spawning a background frame
    /// reader. Used for `--mock` and tests, where there is exactly one
    /// transport for the client's whole lifetime and no reconnect is
    /// needed.
    pub fn new<T>(transport: T) -> Self
    where
        T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let (mut read_half, write_half) = tokio::io::split(transport);
        let (state_tx, state_rx) = mpsc::channel(4);
        let last_telemetry_at = Arc::new(std::sync::Mutex::new(None));
        let last_telemetry_at_writer = Arc::clone(&last_telemetry_at);
        let diagnostics = Arc::new(std::sync::Mutex::new(Diagnostics::default()));
        let diagnostics_task = Arc::clone(&diagnostics);

        tokio::spawn(async move {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 256];
            loop {
                let n = match read_half.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                diagnostics_task.lock().unwrap().rx_bytes += n as u64;
                buf.extend_from_slice(&chunk[..n]);
                while let Some(pos) = buf.iter().position(|&b| b == 0) {
                    let frame_bytes: Vec<u8> = buf.drain(..=pos).collect();
                    match decode_frame(&frame_bytes[..frame_bytes.len() - 1]) {
                        Ok(frame) if frame.opcode == 0x80 => {
                            if let Some(state) = parse_reflex_state(&frame.payload) {
                                *last_telemetry_at_writer.lock().unwrap() = Some(Instant::now());
                                let _ = state_tx.try_send(state);
                            }
                        }
                        Ok(_) => {}
                        Err(_) => diagnostics_task.lock().unwrap().frames_bad += 1,
                    }
                }
            }
        });

        Self {
            writer: Arc::new(Mutex::new(Some(Box::new(write_half)))),
            seq: AtomicU8::new(0),
            last_telemetry_at,
            state_rx,
            diagnostics,
        }
    }

    /// Connect to a real serial link with automatic reconnect: `open` is
    /// called again with exponential backoff every time the link drops,
    /// and the client's writer/telemetry are transparently rebound to the
    /// fresh transport. `open` itself should be cheap (a syscall, not a
    /// retrying loop of its own) — [`crate::transport::open_serial_boxed`]
    /// is the usual argument.
    pub fn connect<F>(open: F) -> Self
    where
        F: Fn() -> Result<Box<dyn TransportBackend>, TransportError> + Send + Sync + 'static,
    {
        let (state_tx, state_rx) = mpsc::channel(4);
        let last_telemetry_at = Arc::new(std::sync::Mutex::new(None));
        let last_telemetry_at_task = Arc::clone(&last_telemetry_at);
        let writer: Arc<Mutex<Option<Box<dyn tokio::io::AsyncWrite + Unpin + Send>>>> =
            Arc::new(Mutex::new(None));
        let writer_task = Arc::clone(&writer);
        let diagnostics = Arc::new(std::sync::Mutex::new(Diagnostics::default()));
        let diagnostics_task = Arc::clone(&diagnostics);

        tokio::spawn(async move {
            let mut backoff = BackoffPolicy::default();
            let mut connected_before = false;
            loop {
                let transport = match open() {
                    Ok(transport) => transport,
                    Err(err) => {
                        warn!(error = %err, "failed to open reflex link, retrying");
                        let mut d = diagnostics_task.lock().unwrap();
                        d.last_error_kind = Some(err.to_string());
                        drop(d);
                        tokio::time::sleep(backoff.next_delay()).await;
                        continue;
                    }
                };
                if connected_before {
                    diagnostics_task.lock().unwrap().reconnects += 1;
                }
                connected_before = true;
                backoff.reset();
                diagnostics_task.lock().unwrap().last_open_ns = Some(now_ns());

                let (mut read_half, write_half) = tokio::io::split(transport);
                *writer_task.lock().await = Some(Box::new(write_half));

                let mut buf = Vec::new();
                let mut chunk = [0u8; 256];
                loop {
                    let n = match read_half.read(&mut chunk).await {
                        Ok(0) => {
                            warn!("reflex link closed (eof)");
                            let mut d = diagnostics_task.lock().unwrap();
                            d.last_close_ns = Some(now_ns());
                            d.last_error_kind = Some("eof".to_string());
                            break;
                        }
                        Err(err) => {
                            warn!(error = %err, "reflex link read error");
                            let mut d = diagnostics_task.lock().unwrap();
                            d.last_close_ns = Some(now_ns());
                            d.last_error_kind = Some(err.to_string());
                            break;
                        }
                        Ok(n) => n,
                    };
                    diagnostics_task.lock().unwrap().rx_bytes += n as u64;
                    buf.extend_from_slice(&chunk[..n]);
                    while let Some(pos) = buf.iter().position(|&b| b == 0) {
                        let frame_bytes: Vec<u8> = buf.drain(..=pos).collect();
                        match decode_frame(&frame_bytes[..frame_bytes.len() - 1]) {
                            Ok(frame) if frame.opcode == 0x80 => {
                                if let Some(state) = parse_reflex_state(&frame.payload) {
                                    *last_telemetry_at_task.lock().unwrap() = Some(Instant::now());
                                    let _ = state_tx.try_send(state);
                                }
                            }
                            Ok(_) => {}
                            Err(_) => diagnostics_task.lock().unwrap().frames_bad += 1,
                        }
                    }
                }
                *writer_task.lock().await = None;
                tokio::time::sleep(backoff.next_delay()).await;
            }
        });

        Self {
            writer,
            seq: AtomicU8::new(0),
            last_telemetry_at,
            state_rx,
            diagnostics,
        }
    }

    /// Receive the next telemetry update, if the background reader has
    /// produced one. Non-blocking semantics are the caller's
    /// responsibility (use `try_recv`).
    pub fn try_recv_state(&mut self) -> Option<ReflexState> {
        self.state_rx.try_recv().ok()
    }

    async fn send(&self, command: ReflexCommand) -> Result<(), DeviceError> {
        let payload = encode_reflex_payload(&command);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let frame = encode_frame(command.opcode(), seq, &payload)?;
        let mut w = self.writer.lock().await;
        let writer = w.as_mut().ok_or(TransportError::Disconnected)?;
        writer.write_all(&frame).await.map_err(TransportError::from)?;
        self.diagnostics.lock().unwrap().tx_bytes += frame.len() as u64;
        Ok(())
    }

    pub async fn set_twist(&self, v_mm_s: i16, w_mrad_s: i16) -> Result<(), DeviceError> {
        self.send(ReflexCommand::SetTwist { v_mm_s, w_mrad_s }).await
    }

    pub async fn stop(&self, reason: u8) -> Result<(), DeviceError> {
        self.send(ReflexCommand::Stop { reason }).await
    }

    pub async fn estop(&self) -> Result<(), DeviceError> {
        self.send(ReflexCommand::Estop).await
    }

    pub async fn clear_faults(&self, mask: u16) -> Result<(), DeviceError> {
        self.send(ReflexCommand::ClearFaults { mask }).await
    }

    pub async fn set_config(&self, param_id: u8, value: u32) -> Result<(), DeviceError> {
        self.send(ReflexCommand::SetConfig { param_id, value }).await
    }
}

impl DeviceClient for ReflexClient {
    fn last_seq(&self) -> u8 {
        self.seq.load(Ordering::Relaxed).wrapping_sub(1)
    }

    fn last_telemetry_at(&self) -> Option<Instant> {
        *self.last_telemetry_at.lock().unwrap()
    }

    fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.lock().unwrap().clone()
    }
}

fn encode_reflex_payload(command: &ReflexCommand) -> Vec<u8> {
    match *command {
        ReflexCommand::SetTwist { v_mm_s, w_mrad_s } => {
            let mut buf = Vec::with_capacity(4);
            buf.extend_from_slice(&v_mm_s.to_le_bytes());
            buf.extend_from_slice(&w_mrad_s.to_le_bytes());
            buf
        }
        ReflexCommand::Stop { reason } => vec![reason],
        ReflexCommand::Estop => Vec::new(),
        ReflexCommand::ClearFaults { mask } => mask.to_le_bytes().to_vec(),
        ReflexCommand::SetConfig { param_id, value } => {
            let mut buf = Vec::with_capacity(5);
            buf.push(param_id);
            buf.extend_from_slice(&value.to_le_bytes());
            buf
        }
    }
}

fn parse_reflex_state(payload: &[u8]) -> Option<ReflexState> {
    if payload.len() < 13 {
        return None;
    }
    Some(ReflexState {
        speed_l_mm_s: i16::from_le_bytes([payload[0], payload[1]]),
        speed_r_mm_s: i16::from_le_bytes([payload[2], payload[3]]),
        gyro_z_mrad_s: i16::from_le_bytes([payload[4], payload[5]]),
        battery_mv: u16::from_le_bytes([payload[6], payload[7]]),
        faults_mask: u16::from_le_bytes([payload[8], payload[9]]),
        range_mm: u16::from_le_bytes([payload[10], payload[11]]),
        range_status: match payload[12] {
            0 => RangeStatus::Valid,
            1 => RangeStatus::OutOfRange,
            3 => RangeStatus::Warn,
            4 => RangeStatus::Stale,
            _ => RangeStatus::SensorFault,
        },
    })
}

/// Telemetry events surfaced by the Face client's background reader.
#[derive(Debug, Clone, Copy)]
pub enum FaceEvent {
    Status(FaceStatus),
    Touch(TouchEvent),
    Button(ButtonEvent),
    Heartbeat(Heartbeat),
}

/// Client for the Face (display) MCU.
pub struct FaceClient {
    writer: Arc<Mutex<Option<Box<dyn tokio::io::AsyncWrite + Unpin + Send>>>>,
    seq: AtomicU8,
    last_telemetry_at: Arc<std::sync::Mutex<Option<Instant>>>,
    event_rx: mpsc::Receiver<FaceEvent>,
    diagnostics: Arc<std::sync::Mutex<Diagnostics>>,
}

impl FaceClient {
    /// Wrap an already-connected transport. See
    /// [`ReflexClient::new`] — same single-transport, no-reconnect shape.
    pub fn new<T>(transport: T) -> Self
    where
        T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let (mut read_half, write_half) = tokio::io::split(transport);
        let (event_tx, event_rx) = mpsc::channel(16);
        let last_telemetry_at = Arc::new(std::sync::Mutex::new(None));
        let last_telemetry_at_writer = Arc::clone(&last_telemetry_at);
        let diagnostics = Arc::new(std::sync::Mutex::new(Diagnostics::default()));
        let diagnostics_task = Arc::clone(&diagnostics);

        tokio::spawn(async move {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 256];
            loop {
                let n = match read_half.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                diagnostics_task.lock().unwrap().rx_bytes += n as u64;
                buf.extend_from_slice(&chunk[..n]);
                while let Some(pos) = buf.iter().position(|&b| b == 0) {
                    let frame_bytes: Vec<u8> = buf.drain(..=pos).collect();
                    match decode_frame(&frame_bytes[..frame_bytes.len() - 1]) {
                        Ok(frame) => {
                            if let Some(event) = parse_face_event(frame.opcode, &frame.payload) {
                                *last_telemetry_at_writer.lock().unwrap() = Some(Instant::now());
                                let _ = event_tx.try_send(event);
                            }
                        }
                        Err(_) => diagnostics_task.lock().unwrap().frames_bad += 1,
                    }
                }
            }
        });

        Self {
            writer: Arc::new(Mutex::new(Some(Box::new(write_half)))),
            seq: AtomicU8::new(0),
            last_telemetry_at,
            event_rx,
            diagnostics,
        }
    }

    /// Connect to a real serial link with automatic reconnect. See
    /// [`ReflexClient::connect`] for the reopen/backoff contract.
    pub fn connect<F>(open: F) -> Self
    where
        F: Fn() -> Result<Box<dyn TransportBackend>, TransportError> + Send + Sync + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel(16);
        let last_telemetry_at = Arc::new(std::sync::Mutex::new(None));
        let last_telemetry_at_task = Arc::clone(&last_telemetry_at);
        let writer: Arc<Mutex<Option<Box<dyn tokio::io::AsyncWrite + Unpin + Send>>>> =
            Arc::new(Mutex::new(None));
        let writer_task = Arc::clone(&writer);
        let diagnostics = Arc::new(std::sync::Mutex::new(Diagnostics::default()));
        let diagnostics_task = Arc::clone(&diagnostics);

        tokio::spawn(async move {
            let mut backoff = BackoffPolicy::default();
            let mut connected_before = false;
            loop {
                let transport = match open() {
                    Ok(transport) => transport,
                    Err(err) => {
                        warn!(error = %err, "failed to open face link, retrying");
                        diagnostics_task.lock().unwrap().last_error_kind = Some(err.to_string());
                        tokio::time::sleep(backoff.next_delay()).await;
                        continue;
                    }
                };
                if connected_before {
                    diagnostics_task.lock().unwrap().reconnects += 1;
                }
                connected_before = true;
                backoff.reset();
                diagnostics_task.lock().unwrap().last_open_ns = Some(now_ns());

                let (mut read_half, write_half) = tokio::io::split(transport);
                *writer_task.lock().await = Some(Box::new(write_half));

                let mut buf = Vec::new();
                let mut chunk = [0u8; 256];
                loop {
                    let n = match read_half.read(&mut chunk).await {
                        Ok(0) => {
                            warn!("face link closed (eof)");
                            let mut d = diagnostics_task.lock().unwrap();
                            d.last_close_ns = Some(now_ns());
                            d.last_error_kind = Some("eof".to_string());
                            break;
                        }
                        Err(err) => {
                            warn!(error = %err, "face link read error");
                            let mut d = diagnostics_task.lock().unwrap();
                            d.last_close_ns = Some(now_ns());
                            d.last_error_kind = Some(err.to_string());
                            break;
                        }
                        Ok(n) => n,
                    };
                    diagnostics_task.lock().unwrap().rx_bytes += n as u64;
                    buf.extend_from_slice(&chunk[..n]);
                    while let Some(pos) = buf.iter().position(|&b| b == 0) {
                        let frame_bytes: Vec<u8> = buf.drain(..=pos).collect();
                        match decode_frame(&frame_bytes[..frame_bytes.len() - 1]) {
                            Ok(frame) => {
                                if let Some(event) = parse_face_event(frame.opcode, &frame.payload) {
                                    *last_telemetry_at_task.lock().unwrap() = Some(Instant::now());
                                    let _ = event_tx.try_send(event);
                                }
                            }
                            Err(_) => diagnostics_task.lock().unwrap().frames_bad += 1,
                        }
                    }
                }
                *writer_task.lock().await = None;
                tokio::time::sleep(backoff.next_delay()).await;
            }
        });

        Self {
            writer,
            seq: AtomicU8::new(0),
            last_telemetry_at,
            event_rx,
            diagnostics,
        }
    }

    pub fn try_recv_event(&mut self) -> Option<FaceEvent> {
        self.event_rx.try_recv().ok()
    }

    async fn send(&self, command: FaceCommand) -> Result<(), DeviceError> {
        let payload = encode_face_payload(&command);
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let frame = encode_frame(command.opcode(), seq, &payload)?;
        let mut w = self.writer.lock().await;
        let writer = w.as_mut().ok_or(TransportError::Disconnected)?;
        writer.write_all(&frame).await.map_err(TransportError::from)?;
        self.diagnostics.lock().unwrap().tx_bytes += frame.len() as u64;
        Ok(())
    }

    pub async fn set_state(&self, command: FaceCommand) -> Result<(), DeviceError> {
        self.send(command).await
    }

    pub async fn gesture(&self, command: FaceCommand) -> Result<(), DeviceError> {
        self.send(command).await
    }

    pub async fn set_system(&self, command: FaceCommand) -> Result<(), DeviceError> {
        self.send(command).await
    }

    pub async fn set_talking(&self, command: FaceCommand) -> Result<(), DeviceError> {
        self.send(command).await
    }

    pub async fn set_flags(&self, command: FaceCommand) -> Result<(), DeviceError> {
        self.send(command).await
    }
}

impl DeviceClient for FaceClient {
    fn last_seq(&self) -> u8 {
        self.seq.load(Ordering::Relaxed).wrapping_sub(1)
    }

    fn last_telemetry_at(&self) -> Option<Instant> {
        *self.last_telemetry_at.lock().unwrap()
    }

    fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.lock().unwrap().clone()
    }
}

fn encode_face_payload(command: &FaceCommand) -> Vec<u8> {
    match *command {
        FaceCommand::SetState {
            mood,
            intensity,
            gaze_x_i8,
            gaze_y_i8,
            brightness,
        } => vec![
            mood.wire_id(),
            intensity,
            gaze_x_i8 as u8,
            gaze_y_i8 as u8,
            brightness,
        ],
        FaceCommand::Gesture { id, duration_ms } => {
            let mut buf = vec![id.wire_id()];
            buf.extend_from_slice(&duration_ms.to_le_bytes());
            buf
        }
        FaceCommand::SetSystem { mode, phase, param } => vec![mode as u8, phase, param],
        FaceCommand::SetTalking { talking, energy } => vec![talking as u8, energy],
        FaceCommand::SetFlags { bitmask } => vec![bitmask],
    }
}

fn parse_face_event(opcode: u8, payload: &[u8]) -> Option<FaceEvent> {
    match opcode {
        0x90 if payload.len() >= 4 => Some(FaceEvent::Status(FaceStatus {
            mood_id: payload[0],
            active_gesture_id: payload[1],
            system_mode: payload[2],
            flags: payload[3],
        })),
        0x91 if payload.len() >= 5 => Some(FaceEvent::Touch(TouchEvent {
            event_type: payload[0],
            x: u16::from_le_bytes([payload[1], payload[2]]),
            y: u16::from_le_bytes([payload[3], payload[4]]),
        })),
        0x92 if payload.len() >= 4 => Some(FaceEvent::Button(ButtonEvent {
            button_id: payload[0],
            event_type: payload[1],
            state: payload[2],
            reserved: payload[3],
        })),
        0x93 if payload.len() >= 8 => Some(FaceEvent::Heartbeat(Heartbeat {
            uptime_ms: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
            counters: u32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]),
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use companion_common::mood::Mood;

    #[tokio::test]
    async fn reflex_client_set_twist_round_trips_over_duplex() {
        let (client_side, mock_side) = tokio::io::duplex(256);
        let client = ReflexClient::new(client_side);
        client.set_twist(300, -100).await.unwrap();

        let (mut mock_read, _mock_write) = tokio::io::split(mock_side);
        let mut buf = [0u8; 64];
        let n = mock_read.read(&mut buf).await.unwrap();
        let delimiter = buf[..n].iter().position(|&b| b == 0).unwrap();
        let frame = decode_frame(&buf[..delimiter]).unwrap();
        assert_eq!(frame.opcode, 0x10);
        assert_eq!(i16::from_le_bytes([frame.payload[0], frame.payload[1]]), 300);
        assert_eq!(i16::from_le_bytes([frame.payload[2], frame.payload[3]]), -100);
    }

    #[tokio::test]
    async fn face_client_set_state_encodes_mood_and_intensity() {
        let (client_side, mock_side) = tokio::io::duplex(256);
        let client = FaceClient::new(client_side);
        client
            .set_state(FaceCommand::SetState {
                mood: Mood::Happy,
                intensity: 200,
                gaze_x_i8: -5,
                gaze_y_i8: 5,
                brightness: 255,
            })
            .await
            .unwrap();

        let (mut mock_read, _mock_write) = tokio::io::split(mock_side);
        let mut buf = [0u8; 64];
        let n = mock_read.read(&mut buf).await.unwrap();
        let delimiter = buf[..n].iter().position(|&b| b == 0).unwrap();
        let frame = decode_frame(&buf[..delimiter]).unwrap();
        assert_eq!(frame.opcode, 0x20);
        assert_eq!(frame.payload[0], Mood::Happy.wire_id());
        assert_eq!(frame.payload[1], 200);
    }

    #[tokio::test]
    async fn reflex_client_reconnects_after_link_drop() {
        use std::sync::atomic::AtomicUsize;
        use std::time::Duration;

        let attempt = Arc::new(AtomicUsize::new(0));
        let attempt_open = Arc::clone(&attempt);

        let mut client = ReflexClient::connect(move || {
            let n = attempt_open.fetch_add(1, Ordering::SeqCst);
            let (client_side, mcu_side) = tokio::io::duplex(256);
            if n == 0 {
                // First "port" is dead on arrival: the background reader
                // should see EOF, back off, and retry rather than giving up.
                drop(mcu_side);
            } else {
                tokio::spawn(async move {
                    let (_r, mut w) = tokio::io::split(mcu_side);
                    let frame = encode_frame(0x80, 0, &[0u8; 13]).unwrap();
                    let _ = w.write_all(&frame).await;
                });
            }
            Ok(Box::new(client_side) as Box<dyn TransportBackend>)
        });

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(client.try_recv_state().is_some(), "expected telemetry after reconnect");
        assert!(client.diagnostics().reconnects >= 1);
    }
}
