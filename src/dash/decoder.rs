//! # Dashboard Frame Decoder
//!
//! Reads a binary dashboard frame back into its fields. Used to inspect
//! what the bridge puts on the wire.

use bytes::Buf;

use super::checksum::checksum;
use super::protocol::*;
use crate::error::{BridgeError, Result};

const FORMAT: &str = "dash-frame";

/// Decode a complete binary dashboard frame
///
/// Trailing bytes after the checksum (a terminator) are ignored.
///
/// # Errors
///
/// Returns `Decode` if:
/// - Frame is too short
/// - Start marker is incorrect
/// - Checksum does not match
pub fn decode_dash_frame(frame: &[u8]) -> Result<DashFrame> {
    if frame.len() < FRAME_LEN {
        return Err(BridgeError::decode(
            FORMAT,
            format!("frame too short: expected {} bytes, got {}", FRAME_LEN, frame.len()),
        ));
    }

    if frame[0] != FRAME_START {
        return Err(BridgeError::decode(
            FORMAT,
            format!("invalid start marker: 0x{:02X}", frame[0]),
        ));
    }

    let received = frame[CHECKSUM_OFFSET];
    let calculated = checksum(&frame[1..CHECKSUM_OFFSET]);
    if received != calculated {
        return Err(BridgeError::decode(
            FORMAT,
            format!("checksum mismatch: expected 0x{:02X}, got 0x{:02X}", calculated, received),
        ));
    }

    let mut buf = &frame[1..CHECKSUM_OFFSET];
    Ok(DashFrame {
        year: buf.get_u8(),
        month: buf.get_u8(),
        day: buf.get_u8(),
        hour: buf.get_u8(),
        minute: buf.get_u8(),
        second: buf.get_u8(),
        rpm: buf.get_u16_le(),
        speed_x10: buf.get_u16_le(),
        gear: buf.get_u8(),
        water_temp: buf.get_u8(),
        oil_temp: buf.get_u8(),
        fuel_x1000: buf.get_u16_le(),
        showlights: buf.get_u32_le(),
        showlights_ext: buf.get_u8(),
        injection: buf.get_u16_le(),
        light_number: buf.get_u16_le(),
        light_on: buf.get_u8() != 0,
        gear_mode: buf.get_u8() as char,
        cruise_speed_x10: buf.get_u16_le(),
        cruise_mode: buf.get_u8(),
        ignition_state: buf.get_u8(),
        engine_state: buf.get_u8(),
    })
}
