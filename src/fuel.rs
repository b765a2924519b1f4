//! # Fuel Injection Rate
//!
//! Derives a gauge-friendly "micro-liters per 100 ms" value from the fuel
//! level channel, which simulators only report as a coarse tank fraction.
//!
//! The estimate is a rate over a sliding window of the last
//! [`HISTORY_CAPACITY`] genuine consumption readings rather than an
//! instantaneous derivative, so single noisy readings barely move it.

use std::collections::VecDeque;

use tracing::debug;

/// Maximum number of readings kept in the window
pub const HISTORY_CAPACITY: usize = 10;

/// Readings further apart than this are treated as a pause, not consumption
const MAX_READING_GAP_MINUTES: f64 = 5.0;

/// Length of one injection cycle in milliseconds
const CYCLE_MS: f64 = 100.0;

/// An accepted fuel level reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelReading {
    /// Fraction of tank capacity (0..1)
    pub level: f32,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

/// Sliding-window fuel consumption filter
///
/// Holds process-lifetime state; create one per telemetry source.
#[derive(Debug, Default)]
pub struct FuelRateEstimator {
    history: VecDeque<FuelReading>,
    previous_level: f32,
    previous_timestamp_ms: i64,
}

impl FuelRateEstimator {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            ..Self::default()
        }
    }

    /// Feed one fuel reading and return the filtered injection rate
    ///
    /// # Arguments
    ///
    /// * `level` - Fuel level as fraction of the tank (0..1)
    /// * `now_ms` - Reading time in milliseconds
    /// * `tank_capacity_liters` - Tank size used to convert fractions to volume
    ///
    /// # Returns
    ///
    /// * `u32` - Micro-liters consumed per 100 ms, or 0 when the reading was
    ///   rejected or the window holds fewer than two readings
    pub fn update(&mut self, level: f32, now_ms: i64, tank_capacity_liters: f32) -> u32 {
        let delta_fuel = self.previous_level - level;
        let delta_minutes = (now_ms - self.previous_timestamp_ms) as f64 / 60_000.0;

        // Always compare against the latest raw reading, accepted or not
        self.previous_level = level;
        self.previous_timestamp_ms = now_ms;

        if delta_fuel < 0.0 {
            if !self.history.is_empty() {
                debug!("Fuel level rose to {:.4}, clearing injection history", level);
                self.history.clear();
            }
            return 0;
        }

        if !(delta_fuel > 0.0 && delta_minutes > 0.0 && delta_minutes < MAX_READING_GAP_MINUTES) {
            return 0;
        }

        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(FuelReading {
            level,
            timestamp_ms: now_ms,
        });

        self.window_rate(tank_capacity_liters)
    }

    fn window_rate(&self, tank_capacity_liters: f32) -> u32 {
        let (Some(oldest), Some(newest)) = (self.history.front(), self.history.back()) else {
            return 0;
        };
        if self.history.len() < 2 {
            return 0;
        }

        let consumed_ul =
            f64::from(oldest.level - newest.level) * f64::from(tank_capacity_liters) * 1e6;
        let cycles = (newest.timestamp_ms - oldest.timestamp_ms) as f64 / CYCLE_MS;

        if consumed_ul > 0.0 && cycles > 0.0 {
            (consumed_ul / cycles).round() as u32
        } else {
            0
        }
    }

    /// Number of readings currently in the window
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Readings currently in the window, oldest first
    pub fn history(&self) -> impl Iterator<Item = &FuelReading> {
        self.history.iter()
    }
}
