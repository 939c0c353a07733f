//! In-process fake Reflex MCU, selected by `--mock`.
//!
//! Speaks the identical framed wire protocol as the real hardware over a
//! `tokio::io::duplex` pipe, so `ReflexClient`/`FaceClient` run unmodified
//! against it. Used for local development and CI without real serial
//! hardware attached.

use crate::codec::{decode_frame, encode_frame};
use companion_common::wire::RangeStatus;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Spawn a fake Reflex MCU and return the client-facing end of the pipe.
///
/// The fake always reports `faults=0`, a fixed battery voltage, and an
/// out-of-range ultrasonic reading (so the safety pipeline's range gate
/// never fires against simulated telemetry unless a test drives it).
pub fn spawn_fake_reflex() -> tokio::io::DuplexStream {
    let (client_side, mut mcu_side) = tokio::io::duplex(1024);

    tokio::spawn(async move {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 256];
        let mut faults_mask: u16 = 0;
        let mut seq: u8 = 0;
        loop {
            // Periodically emit STATE telemetry regardless of inbound traffic.
            let state_payload = encode_reflex_state(0, 0, 0, 8200, faults_mask, 4000, RangeStatus::OutOfRange);
            if let Ok(frame) = encode_frame(0x80, seq, &state_payload) {
                seq = seq.wrapping_add(1);
                if mcu_side.write_all(&frame).await.is_err() {
                    return;
                }
            }

            tokio::select! {
                n = mcu_side.read(&mut chunk) => {
                    let n = match n {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);
                    while let Some(pos) = buf.iter().position(|&b| b == 0) {
                        let frame_bytes: Vec<u8> = buf.drain(..=pos).collect();
                        if let Ok(frame) = decode_frame(&frame_bytes[..frame_bytes.len() - 1]) {
                            match frame.opcode {
                                0x12 => faults_mask |= 0x0001, // ESTOP
                                0x14 if frame.payload.len() >= 2 => {
                                    let mask = u16::from_le_bytes([frame.payload[0], frame.payload[1]]);
                                    faults_mask &= !mask;
                                }
                                _ => {}
                            }
                        }
                    }
                }
                _ = tokio::time::sleep(std::time::Duration::from_millis(20)) => {}
            }
        }
    });

    client_side
}

/// Spawn a fake Face MCU and return the client-facing end of the pipe.
///
/// Reports a fixed idle `FaceStatus` (no active mood, no gesture) on a
/// steady cadence, and otherwise just drains whatever `FaceClient` sends
/// it without reacting — good enough for a `--mock` run to see a
/// connected face display without an attached board.
pub fn spawn_fake_face() -> tokio::io::DuplexStream {
    let (client_side, mut mcu_side) = tokio::io::duplex(1024);

    tokio::spawn(async move {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 256];
        let mut seq: u8 = 0;
        loop {
            let status_payload = vec![0u8, 0u8, 0u8, 0u8];
            if let Ok(frame) = encode_frame(0x90, seq, &status_payload) {
                seq = seq.wrapping_add(1);
                if mcu_side.write_all(&frame).await.is_err() {
                    return;
                }
            }

            tokio::select! {
                n = mcu_side.read(&mut chunk) => {
                    let n = match n {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);
                    while let Some(pos) = buf.iter().position(|&b| b == 0) {
                        let _: Vec<u8> = buf.drain(..=pos).collect();
                    }
                }
                _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {}
            }
        }
    });

    client_side
}

fn encode_reflex_state(
    speed_l: i16,
    speed_r: i16,
    gyro_z: i16,
    battery_mv: u16,
    faults: u16,
    range_mm: u16,
    range_status: RangeStatus,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(13);
    buf.extend_from_slice(&speed_l.to_le_bytes());
    buf.extend_from_slice(&speed_r.to_le_bytes());
    buf.extend_from_slice(&gyro_z.to_le_bytes());
    buf.extend_from_slice(&battery_mv.to_le_bytes());
    buf.extend_from_slice(&faults.to_le_bytes());
    buf.extend_from_slice(&range_mm.to_le_bytes());
    buf.push(range_status as u8);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ReflexClient;
    use std::time::Duration;

    #[tokio::test]
    async fn fake_reflex_reports_telemetry() {
        let pipe = spawn_fake_reflex();
        let mut client = ReflexClient::new(pipe);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(client.try_recv_state().is_some());
    }

    #[tokio::test]
    async fn estop_then_clear_faults_round_trips() {
        let pipe = spawn_fake_reflex();
        let client = ReflexClient::new(pipe);
        client.estop().await.unwrap();
        client.clear_faults(0x0001).await.unwrap();
        // No panics, no errors: the fake accepted both commands.
    }

    #[tokio::test]
    async fn fake_face_reports_status() {
        use crate::device::FaceClient;

        let pipe = spawn_fake_face();
        let mut client = FaceClient::new(pipe);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(client.try_recv_event().is_some());
    }

    #[tokio::test]
    async fn fake_face_accepts_commands_without_panicking() {
        use crate::device::FaceClient;
        use companion_common::wire::{FaceCommand, Gesture};

        let pipe = spawn_fake_face();
        let client = FaceClient::new(pipe);
        client
            .set_talking(FaceCommand::SetTalking { talking: true, energy: 128 })
            .await
            .unwrap();
        client
            .gesture(FaceCommand::Gesture { id: Gesture::Blink, duration_ms: 200 })
            .await
            .unwrap();
    }
}
