//! # Telemetry Module
//!
//! Normalizes simulator telemetry into [`TelemetrySample`] values.
//!
//! This module handles:
//! - OutGauge-family binary datagrams (basic and extended layouts)
//! - Truck simulator telemetry events delivered as JSON
//! - Receiving raw datagrams over UDP

pub mod listener;
pub mod outgauge;
pub mod sample;
pub mod trucksim;

pub use sample::{Indicators, SourceFormat, TelemetrySample};

use crate::error::Result;

/// Decode a raw payload according to its declared source format
///
/// # Errors
///
/// Returns [`crate::error::BridgeError::Decode`] if the payload is shorter
/// than the format requires or a truck simulator event is not valid JSON.
pub fn decode(format: SourceFormat, payload: &[u8]) -> Result<TelemetrySample> {
    match format {
        SourceFormat::BasicV1 => outgauge::decode_basic(payload),
        SourceFormat::ExtendedV1 => outgauge::decode_extended(payload),
        SourceFormat::TruckSimEvent => trucksim::decode_event_bytes(payload),
    }
}
