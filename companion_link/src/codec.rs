//! Frame codec for the Reflex/Face wire protocols.
//!
//! Frames are COBS-stuffed (zero-free, `0x00` delimited) byte strings
//! carrying `[opcode:u8][seq:u8][payload][crc16:u16 LE]`. CRC16-CCITT (poly
//! 0x1021, init 0xFFFF) covers the opcode, seq, and payload.

use companion_common::consts::MAX_PAYLOAD;
use thiserror::Error;

/// Errors raised while decoding a wire frame.
///
/// `decode_frame` never panics on arbitrary bytes — malformed input always
/// maps to one of these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("frame shorter than the minimum opcode+crc length")]
    TooShort,
    #[error("payload length {0} exceeds maximum {MAX_PAYLOAD}")]
    PayloadTooLarge(usize),
    #[error("COBS decoding failed")]
    CobsInvalid,
    #[error("CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch { expected: u16, actual: u16 },
}

/// A decoded frame: opcode, sequence number, plus raw payload bytes (CRC
/// already verified and stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: u8,
    pub seq: u8,
    pub payload: Vec<u8>,
}

/// CRC16-CCITT (poly 0x1021, init 0xFFFF), computed byte-at-a-time.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// COBS-encode `data`, which must not itself contain the `0x00` delimiter
/// (the encoding removes zero bytes from the payload, so this is always
/// true of its own output).
fn cobs_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 254 + 2);
    let mut code_idx = 0;
    out.push(0); // placeholder for first code byte
    let mut code: u8 = 1;

    for &byte in data {
        if byte == 0 {
            out[code_idx] = code;
            code_idx = out.len();
            out.push(0);
            code = 1;
        } else {
            out.push(byte);
            code += 1;
            if code == 0xFF {
                out[code_idx] = code;
                code_idx = out.len();
                out.push(0);
                code = 1;
            }
        }
    }
    out[code_idx] = code;
    out
}

/// COBS-decode a single frame (without its trailing `0x00` delimiter).
fn cobs_decode(data: &[u8]) -> Result<Vec<u8>, ParseError> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let code = data[i] as usize;
        if code == 0 || i + code > data.len() + 1 {
            return Err(ParseError::CobsInvalid);
        }
        i += 1;
        let chunk_end = i + code - 1;
        if chunk_end > data.len() {
            return Err(ParseError::CobsInvalid);
        }
        out.extend_from_slice(&data[i..chunk_end]);
        i = chunk_end;
        if code != 0xFF && i < data.len() {
            out.push(0);
        }
    }
    Ok(out)
}

/// Encode an opcode + seq + payload into a COBS-stuffed, `0x00`-terminated
/// wire frame ready to write to the serial port.
pub fn encode_frame(opcode: u8, seq: u8, payload: &[u8]) -> Result<Vec<u8>, ParseError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(ParseError::PayloadTooLarge(payload.len()));
    }
    let mut body = Vec::with_capacity(2 + payload.len() + 2);
    body.push(opcode);
    body.push(seq);
    body.extend_from_slice(payload);
    let crc = crc16_ccitt(&body);
    body.extend_from_slice(&crc.to_le_bytes());

    let mut framed = cobs_encode(&body);
    framed.push(0x00);
    Ok(framed)
}

/// Decode one COBS-stuffed frame (delimiter already stripped by the
/// caller's line-splitting) into an opcode + seq + payload, verifying CRC.
pub fn decode_frame(cobs_payload: &[u8]) -> Result<Frame, ParseError> {
    let body = cobs_decode(cobs_payload)?;
    if body.len() < 4 {
        return Err(ParseError::TooShort);
    }
    let (head, crc_bytes) = body.split_at(body.len() - 2);
    let actual = crc16_ccitt(head);
    let expected = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
    if actual != expected {
        return Err(ParseError::CrcMismatch { expected, actual });
    }
    let opcode = head[0];
    let seq = head[1];
    let payload = head[2..].to_vec();
    if payload.len() > MAX_PAYLOAD {
        return Err(ParseError::PayloadTooLarge(payload.len()));
    }
    Ok(Frame { opcode, seq, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trip_simple_payload() {
        let payload = [1u8, 2, 3, 4];
        let encoded = encode_frame(0x80, 7, &payload).unwrap();
        assert_eq!(*encoded.last().unwrap(), 0x00);
        let frame = decode_frame(&encoded[..encoded.len() - 1]).unwrap();
        assert_eq!(frame.opcode, 0x80);
        assert_eq!(frame.seq, 7);
        assert_eq!(frame.payload, payload);
    }

    #[test]
    fn round_trip_payload_with_embedded_zeros() {
        let payload = [0u8, 0, 5, 0, 9];
        let encoded = encode_frame(0x10, 3, &payload).unwrap();
        assert!(!encoded[..encoded.len() - 1].contains(&0));
        let frame = decode_frame(&encoded[..encoded.len() - 1]).unwrap();
        assert_eq!(frame.seq, 3);
        assert_eq!(frame.payload, payload);
    }

    #[test]
    fn payload_over_max_is_rejected() {
        let payload = vec![0xAB; MAX_PAYLOAD + 1];
        assert_eq!(
            encode_frame(0x80, 0, &payload),
            Err(ParseError::PayloadTooLarge(MAX_PAYLOAD + 1))
        );
    }

    #[test]
    fn corrupted_crc_is_detected() {
        let encoded = encode_frame(0x80, 1, &[1, 2, 3]).unwrap();
        let mut corrupted = encoded[..encoded.len() - 1].to_vec();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;
        assert!(matches!(
            decode_frame(&corrupted),
            Err(ParseError::CrcMismatch { .. }) | Err(ParseError::CobsInvalid)
        ));
    }

    proptest! {
        #[test]
        fn decode_never_panics_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..300)) {
            let _ = decode_frame(&bytes);
        }

        #[test]
        fn encode_decode_round_trips_for_any_valid_payload(
            opcode in any::<u8>(),
            seq in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD),
        ) {
            let encoded = encode_frame(opcode, seq, &payload).unwrap();
            let frame = decode_frame(&encoded[..encoded.len() - 1]).unwrap();
            prop_assert_eq!(frame.opcode, opcode);
            prop_assert_eq!(frame.seq, seq);
            prop_assert_eq!(frame.payload, payload);
        }
    }
}
