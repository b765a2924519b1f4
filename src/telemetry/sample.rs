//! Normalized telemetry sample and source format descriptor.

use serde::Deserialize;

/// One decoded telemetry event
///
/// Built fresh for every inbound datagram and discarded after encoding.
/// Fields a source does not deliver keep their [`Default`] value.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    /// Four character car tag (OutGauge only)
    pub car: String,

    /// OutGauge `OG_*` flags
    pub flags: u16,

    /// Unique id of the viewed player
    pub player_id: u8,

    /// Speed in m/s
    pub speed: f32,

    /// Engine speed in rev/min
    pub rpm: f32,

    /// Turbo pressure in bar
    pub turbo: f32,

    /// -1 reverse, 0 neutral, 1.. forward gears
    pub gear: i16,

    /// Water/engine temperature in °C
    pub water_temp: f32,

    /// Oil temperature in °C
    pub oil_temp: f32,

    /// Oil pressure in bar
    pub oil_pressure: f32,

    /// Fuel level as fraction of capacity (0..1)
    pub fuel: f32,

    /// Tank capacity in liters, when the source provides it
    pub fuel_capacity: Option<f32>,

    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,

    /// Lights the car has available
    pub dashlights: u32,

    /// Lights currently switched on
    pub showlights: u32,

    /// Per-subsystem indicator state for sources without a native bitfield
    pub indicators: Option<Indicators>,

    /// Transmission mode: `A`utomatic, `N`eutral or `R`everse
    pub gear_mode: char,

    /// Cruise control set speed in m/s
    pub cruise_speed: f32,

    /// Cruise control mode, 0 when disengaged
    pub cruise_mode: u32,

    pub ignition_state: u16,
    pub engine_state: u16,

    /// In-game clock as minutes since midnight, when the source has one
    pub clock_minutes: Option<u32>,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            car: String::new(),
            flags: 0,
            player_id: 0,
            speed: 0.0,
            rpm: 0.0,
            turbo: 0.0,
            gear: 0,
            water_temp: 0.0,
            oil_temp: 0.0,
            oil_pressure: 0.0,
            fuel: 0.0,
            fuel_capacity: None,
            throttle: 0.0,
            brake: 0.0,
            clutch: 0.0,
            dashlights: 0,
            showlights: 0,
            indicators: None,
            gear_mode: 'N',
            cruise_speed: 0.0,
            cruise_mode: 0,
            ignition_state: 0,
            engine_state: 0,
            clock_minutes: None,
        }
    }
}

impl TelemetrySample {
    /// Whether cruise control is engaged
    pub fn cruise_enabled(&self) -> bool {
        self.cruise_mode != 0
    }

    /// Tank capacity to use for fuel-rate estimation
    ///
    /// Falls back to `default_liters` when the source did not deliver a
    /// positive capacity.
    pub fn tank_capacity_or(&self, default_liters: f32) -> f32 {
        match self.fuel_capacity {
            Some(capacity) if capacity > 0.0 => capacity,
            _ => default_liters,
        }
    }
}

/// Indicator and warning state reported subsystem by subsystem
///
/// Sources that already deliver an OutGauge style bitfield leave this unset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Indicators {
    pub high_beam: bool,
    pub low_beam: bool,
    pub parking_lights: bool,
    pub beacon: bool,
    pub left_blinker: bool,
    pub right_blinker: bool,
    pub hazard: bool,
    pub parking_brake: bool,
    pub oil_pressure_warning: bool,
    pub battery_warning: bool,
    /// Engine wear, 0..1
    pub engine_damage: f32,
    /// Transmission wear, 0..1
    pub transmission_damage: f32,
    pub air_pressure_warning: bool,
    pub air_pressure_emergency: bool,
    pub retarder_steps: u32,
    pub retarder_level: u32,
}

/// Telemetry source format
///
/// Selects the decoder and which derived values the bridge computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SourceFormat {
    /// Plain OutGauge layout (speed, rpm, temperatures, fuel, lights, pedals)
    #[serde(rename = "basic", alias = "outgauge")]
    BasicV1,

    /// OutGauge plus cruise control, tank capacity and ignition fields
    #[serde(rename = "extended", alias = "beamng")]
    ExtendedV1,

    /// Truck simulator event object (JSON)
    #[serde(rename = "trucksim", alias = "truck")]
    TruckSimEvent,
}

impl SourceFormat {
    /// Human readable name used in logs and errors
    pub fn name(self) -> &'static str {
        match self {
            Self::BasicV1 => "outgauge",
            Self::ExtendedV1 => "outgauge-extended",
            Self::TruckSimEvent => "trucksim",
        }
    }

    /// Minimum payload length in bytes (`None` for JSON events)
    pub fn required_len(self) -> Option<usize> {
        match self {
            Self::BasicV1 => Some(crate::telemetry::outgauge::BASIC_PACKET_SIZE),
            Self::ExtendedV1 => Some(crate::telemetry::outgauge::EXTENDED_PACKET_SIZE),
            Self::TruckSimEvent => None,
        }
    }

    /// UDP port the source conventionally sends to
    pub fn default_port(self) -> u16 {
        match self {
            Self::BasicV1 => 4444,
            Self::ExtendedV1 | Self::TruckSimEvent => 4568,
        }
    }

    /// Whether the injection rate is derived from fuel level readings
    pub fn estimates_injection(self) -> bool {
        !matches!(self, Self::TruckSimEvent)
    }

    /// Whether the source delivers an already aligned dashlight bitfield
    pub fn native_dashlights(self) -> bool {
        !matches!(self, Self::TruckSimEvent)
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
