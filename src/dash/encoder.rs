//! # Dashboard Frame Encoder
//!
//! Packs a telemetry sample and derived values into the outbound serial frame.
//!
//! All numeric fields are clamped to their wire width; telemetry routinely
//! overshoots physical ranges for a frame or two and that must never fail
//! the cycle.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{Datelike, NaiveDateTime, Timelike};

use super::checksum::checksum;
use super::protocol::*;
use crate::command::OverrideState;
use crate::telemetry::TelemetrySample;

/// Everything that goes into one frame
#[derive(Debug, Clone)]
pub struct FrameInput<'a> {
    pub sample: &'a TelemetrySample,
    /// Micro-liters per 100 ms
    pub injection: u32,
    pub lights: Dashlights,
    pub overrides: OverrideState,
    /// Wall clock or in-game clock
    pub timestamp: NaiveDateTime,
}

/// Encode a binary dashboard frame
///
/// # Arguments
///
/// * `input` - Sample, derived values and clock for this cycle
/// * `terminator` - Byte appended after the checksum, if the firmware expects one
///
/// # Returns
///
/// * `Bytes` - [`FRAME_LEN`] bytes, plus one when a terminator is set
pub fn encode_dash_frame(input: &FrameInput<'_>, terminator: Option<u8>) -> Bytes {
    let sample = input.sample;
    let ts = input.timestamp;

    let mut frame = BytesMut::with_capacity(FRAME_LEN + 1);
    frame.put_u8(FRAME_START);

    frame.put_u8(ts.year().rem_euclid(2000) as u8);
    frame.put_u8(ts.month() as u8);
    frame.put_u8(ts.day() as u8);
    frame.put_u8(ts.hour() as u8);
    frame.put_u8(ts.minute() as u8);
    frame.put_u8(ts.second() as u8);

    frame.put_u16_le(clamp_u16(f64::from(sample.rpm)));
    frame.put_u16_le(speed_x10(sample.speed));
    frame.put_u8(wire_gear(sample.gear));
    frame.put_u8(clamp_u8(f64::from(sample.water_temp)));
    frame.put_u8(clamp_u8(f64::from(sample.oil_temp)));
    frame.put_u16_le(clamp_u16(f64::from(sample.fuel) * 1000.0));

    // i32 on the wire; same bit pattern
    frame.put_u32_le(input.lights.showlights);
    frame.put_u8(input.lights.showlights_ext);

    frame.put_u16_le(clamp_injection(input.injection));
    frame.put_u16_le(input.overrides.light_number.min(MAX_LIGHT_NUMBER));
    frame.put_u8(u8::from(input.overrides.light_on));
    frame.put_u8(gear_mode_byte(sample.gear_mode));
    frame.put_u16_le(speed_x10(sample.cruise_speed));
    frame.put_u8(sample.cruise_mode.min(u32::from(u8::MAX)) as u8);
    frame.put_u8(sample.ignition_state.min(u16::from(u8::MAX)) as u8);
    frame.put_u8(sample.engine_state.min(u16::from(u8::MAX)) as u8);

    let sum = checksum(&frame[1..]);
    frame.put_u8(sum);

    if let Some(byte) = terminator {
        frame.put_u8(byte);
    }

    frame.freeze()
}

/// Encode the legacy newline terminated ASCII frame
///
/// Every numeric field is zero padded and clamped to its digit count, so
/// the line is always [`ASCII_LINE_LEN`] bytes.
pub fn encode_ascii_frame(input: &FrameInput<'_>) -> Bytes {
    let sample = input.sample;
    let lights = input.lights;
    let tf = |on: bool| if on { 'T' } else { 'F' };
    let temp = f64::from(sample.water_temp);

    let mut line = String::with_capacity(ASCII_LINE_LEN);
    line.push(FRAME_START as char);
    line.push_str(&input.timestamp.format("%Y%m%d%H%M%S").to_string());
    line.push_str(&pad(f64::from(sample.rpm), 5));
    line.push_str(&pad(f64::from(sample.speed) * 36.0, 4));
    line.push_str(&pad(f64::from(wire_gear(sample.gear)), 1));
    line.push_str(&pad(temp, 3));
    line.push_str(&pad(f64::from(sample.fuel) * 1000.0, 4));

    for bit in [
        DL_SHIFT, DL_FULLBEAM, DL_HANDBRAKE, DL_TC, DL_SIGNAL_L, DL_SIGNAL_R, DL_OILWARN,
        DL_BATTERY, DL_ABS,
    ] {
        line.push(tf(lights.has(bit)));
    }
    line.push(tf(temp > 105.0));
    line.push(tf(temp > 120.0));

    line.push_str(&pad(f64::from(clamp_injection(input.injection)), 4));
    line.push_str(&pad(f64::from(input.overrides.light_number), 4));
    line.push(tf(input.overrides.light_on));
    line.push(gear_mode_byte(sample.gear_mode) as char);

    for bit in [DL_LOWBEAM, DL_ESC, DL_CHECKENGINE, DL_CLUTCHTEMP] {
        line.push(tf(lights.has(bit)));
    }
    line.push('\n');

    Bytes::from(line)
}

/// Wire gear: 0 reverse, 1 neutral, 2.. forward
pub fn wire_gear(gear: i16) -> u8 {
    (i32::from(gear) + 1).clamp(0, i32::from(u8::MAX)) as u8
}

/// Clamp an injection rate to the displayable range
pub fn clamp_injection(injection: u32) -> u16 {
    injection.min(u32::from(MAX_INJECTION)) as u16
}

/// m/s to km/h × 10
fn speed_x10(speed_ms: f32) -> u16 {
    clamp_u16(f64::from(speed_ms) * 36.0)
}

fn clamp_u16(value: f64) -> u16 {
    // NaN casts to 0
    value.round().clamp(0.0, f64::from(u16::MAX)) as u16
}

fn clamp_u8(value: f64) -> u8 {
    value.round().clamp(0.0, f64::from(u8::MAX)) as u8
}

fn gear_mode_byte(mode: char) -> u8 {
    if mode.is_ascii() {
        mode as u8
    } else {
        b'N'
    }
}

/// Zero padded, clamped to `width` digits
fn pad(value: f64, width: usize) -> String {
    let max = 10f64.powi(width as i32) - 1.0;
    let value = value.round().clamp(0.0, max) as u32;
    format!("{:0width$}", value, width = width)
}
