//! # Bridge Loop
//!
//! Per-datagram pipeline: decode, estimate injection, map dashlights,
//! encode, then hand the frame to the serial link.
//!
//! The bridge owns the fuel estimator and holds handles to the shared
//! override state and the link. One bridge serves one telemetry source.

use bytes::Bytes;
use chrono::{DateTime, Local, NaiveDateTime};
use tracing::{debug, warn};

use crate::command::SharedOverride;
use crate::dash::encoder::{encode_ascii_frame, encode_dash_frame, FrameInput};
use crate::dash::lights::map_dashlights;
use crate::dash::protocol::FrameFormat;
use crate::error::{BridgeError, Result};
use crate::fuel::FuelRateEstimator;
use crate::serial::{LinkManager, WriteOutcome};
use crate::telemetry::{self, SourceFormat, TelemetrySample};

/// Pipeline settings fixed at startup
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub source: SourceFormat,
    pub frame_format: FrameFormat,
    /// Appended to binary frames only
    pub terminator: Option<u8>,
    /// Tank size when the datagram does not carry one
    pub default_tank_capacity: f32,
}

/// Running totals, logged on shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub received: u64,
    pub sent: u64,
    pub dropped: u64,
    pub decode_errors: u64,
    pub write_errors: u64,
}

/// Telemetry to dashboard pipeline
#[derive(Debug)]
pub struct Bridge {
    settings: BridgeSettings,
    estimator: FuelRateEstimator,
    overrides: SharedOverride,
    link: LinkManager,
    stats: BridgeStats,
}

impl Bridge {
    pub fn new(settings: BridgeSettings, overrides: SharedOverride, link: LinkManager) -> Self {
        Self {
            settings,
            estimator: FuelRateEstimator::new(),
            overrides,
            link,
            stats: BridgeStats::default(),
        }
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Build the outbound frame for one telemetry payload
    ///
    /// Updates the fuel estimator as a side effect.
    ///
    /// # Errors
    ///
    /// Returns `Decode` if the payload does not match the source format.
    pub fn build_frame(&mut self, payload: &[u8], now: DateTime<Local>) -> Result<Bytes> {
        let sample = telemetry::decode(self.settings.source, payload)?;

        let injection = if self.settings.source.estimates_injection() {
            let capacity = sample.tank_capacity_or(self.settings.default_tank_capacity);
            self.estimator
                .update(sample.fuel, now.timestamp_millis(), capacity)
        } else {
            0
        };

        let input = FrameInput {
            sample: &sample,
            injection,
            lights: map_dashlights(&sample),
            overrides: self.overrides.get(),
            timestamp: frame_timestamp(&sample, now),
        };

        Ok(match self.settings.frame_format {
            FrameFormat::Binary => encode_dash_frame(&input, self.settings.terminator),
            FrameFormat::Ascii => encode_ascii_frame(&input),
        })
    }

    /// Run one datagram through the pipeline and submit the frame
    ///
    /// Undecodable payloads are logged and dropped. Frames are dropped
    /// while the link is down.
    ///
    /// # Errors
    ///
    /// Returns `Decode` or `LinkWrite`; neither stops the bridge.
    pub async fn handle_datagram(&mut self, payload: &[u8]) -> Result<WriteOutcome> {
        self.stats.received += 1;

        let frame = match self.build_frame(payload, Local::now()) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.decode_errors += 1;
                warn!("Dropping datagram ({} bytes): {}", payload.len(), e);
                return Err(e);
            }
        };

        match self.link.write(&frame).await {
            Ok(WriteOutcome::Sent) => {
                self.stats.sent += 1;
                Ok(WriteOutcome::Sent)
            }
            Ok(WriteOutcome::Dropped) => {
                self.stats.dropped += 1;
                debug!("Link not writable, frame dropped");
                Ok(WriteOutcome::Dropped)
            }
            Err(e @ BridgeError::LinkWrite(_)) => {
                self.stats.dropped += 1;
                self.stats.write_errors += 1;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

/// Clock shown on the dashboard
///
/// Sources with an in-game clock use today's date at the game time;
/// everything else uses local wall-clock time.
pub fn frame_timestamp(sample: &TelemetrySample, now: DateTime<Local>) -> NaiveDateTime {
    let wall_clock = now.naive_local();
    match sample.clock_minutes {
        Some(minutes) => {
            let hour = (minutes / 60) % 24;
            let minute = minutes % 60;
            now.date_naive()
                .and_hms_opt(hour, minute, 0)
                .unwrap_or(wall_clock)
        }
        None => wall_clock,
    }
}
