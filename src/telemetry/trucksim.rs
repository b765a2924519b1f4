//! # Truck Simulator Events
//!
//! Maps truck telemetry SDK event objects onto [`TelemetrySample`].
//!
//! Events arrive as JSON mirroring the SDK tree (`game.*`, `truck.*`). Every
//! node may be missing or `null`; an absent subsystem decodes conservatively
//! (engine stopped, vehicle at rest, lights off).

use serde::{Deserialize, Deserializer};

use super::sample::{Indicators, TelemetrySample};
use crate::error::{BridgeError, Result};

/// Treat `null` the same as a missing field
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One polled telemetry event
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TruckSimEvent {
    #[serde(deserialize_with = "nullable")]
    pub game: GameState,
    #[serde(deserialize_with = "nullable")]
    pub truck: TruckState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GameState {
    #[serde(deserialize_with = "nullable")]
    pub paused: bool,
    /// In-game minutes
    #[serde(deserialize_with = "nullable")]
    pub time: Reading<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TruckState {
    #[serde(deserialize_with = "nullable")]
    pub engine: Engine,
    /// m/s, negative while reversing
    #[serde(deserialize_with = "nullable")]
    pub speed: Reading<f32>,
    #[serde(deserialize_with = "nullable")]
    pub transmission: Transmission,
    #[serde(deserialize_with = "nullable")]
    pub cruise_control: CruiseControl,
    #[serde(deserialize_with = "nullable")]
    pub fuel: Fuel,
    #[serde(deserialize_with = "nullable")]
    pub lights: Lights,
    #[serde(deserialize_with = "nullable")]
    pub brakes: Brakes,
    #[serde(deserialize_with = "nullable")]
    pub electric: Switch,
}

/// A `{ "value": ... }` node
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reading<T> {
    pub value: Option<T>,
}

/// A `{ "enabled": bool }` node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Switch {
    #[serde(deserialize_with = "nullable")]
    pub enabled: bool,
}

/// A `{ "warning": { "enabled": bool } }` node
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Gauge {
    #[serde(deserialize_with = "nullable")]
    pub warning: Switch,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Engine {
    #[serde(deserialize_with = "nullable")]
    pub enabled: bool,
    #[serde(deserialize_with = "nullable")]
    pub damage: f32,
    #[serde(deserialize_with = "nullable")]
    pub rpm: Reading<f32>,
    #[serde(deserialize_with = "nullable")]
    pub water_temperature: Reading<f32>,
    #[serde(deserialize_with = "nullable")]
    pub oil_temperature: Reading<f32>,
    #[serde(deserialize_with = "nullable")]
    pub oil_pressure: Gauge,
    #[serde(deserialize_with = "nullable")]
    pub battery_voltage: Gauge,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Transmission {
    #[serde(deserialize_with = "nullable")]
    pub gear: GearReading,
    #[serde(deserialize_with = "nullable")]
    pub damage: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GearReading {
    /// Gear shown on the truck display; negative for reverse gears
    pub displayed: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CruiseControl {
    pub kph: Option<f32>,
    #[serde(deserialize_with = "nullable")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fuel {
    /// Liters in the tank
    #[serde(deserialize_with = "nullable")]
    pub value: f32,
    /// Tank size in liters
    #[serde(deserialize_with = "nullable")]
    pub capacity: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Lights {
    #[serde(deserialize_with = "nullable")]
    pub beam_high: Switch,
    #[serde(deserialize_with = "nullable")]
    pub beam_low: Switch,
    #[serde(deserialize_with = "nullable")]
    pub parking: Switch,
    #[serde(deserialize_with = "nullable")]
    pub beacon: Switch,
    #[serde(deserialize_with = "nullable")]
    pub hazard: Switch,
    #[serde(deserialize_with = "nullable")]
    pub blinker: Blinkers,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Blinkers {
    #[serde(deserialize_with = "nullable")]
    pub left: Switch,
    #[serde(deserialize_with = "nullable")]
    pub right: Switch,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Brakes {
    #[serde(deserialize_with = "nullable")]
    pub parking: Switch,
    #[serde(deserialize_with = "nullable")]
    pub air_pressure: AirPressure,
    #[serde(deserialize_with = "nullable")]
    pub retarder: Retarder,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AirPressure {
    #[serde(deserialize_with = "nullable")]
    pub warning: Switch,
    #[serde(deserialize_with = "nullable")]
    pub emergency: Switch,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Retarder {
    #[serde(deserialize_with = "nullable")]
    pub steps: u32,
    #[serde(deserialize_with = "nullable")]
    pub level: u32,
}

/// Parse and decode a JSON encoded event
///
/// # Errors
///
/// Returns `Decode` if the payload is not a JSON event object.
pub fn decode_event_bytes(payload: &[u8]) -> Result<TelemetrySample> {
    let event: TruckSimEvent = serde_json::from_slice(payload)
        .map_err(|e| BridgeError::decode("trucksim", e.to_string()))?;
    Ok(decode_event(&event))
}

/// Map an event onto a telemetry sample
pub fn decode_event(event: &TruckSimEvent) -> TelemetrySample {
    let truck = &event.truck;

    let speed = if event.game.paused {
        0.0
    } else {
        truck.speed.value.unwrap_or(0.0).abs()
    };

    let displayed = truck.transmission.gear.displayed.unwrap_or(0);
    let gear = displayed.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    let gear_mode = if displayed >= 0 { 'A' } else { 'R' };

    let capacity = truck.fuel.capacity;
    let fuel = if capacity > 0.0 {
        truck.fuel.value / capacity
    } else {
        truck.fuel.value
    };

    TelemetrySample {
        speed,
        rpm: truck.engine.rpm.value.unwrap_or(0.0),
        gear,
        gear_mode,
        water_temp: truck.engine.water_temperature.value.unwrap_or(0.0),
        oil_temp: truck.engine.oil_temperature.value.unwrap_or(0.0),
        fuel: fuel.clamp(0.0, 1.0),
        fuel_capacity: (capacity > 0.0).then_some(capacity),
        cruise_speed: truck.cruise_control.kph.unwrap_or(0.0) / 3.6,
        cruise_mode: u32::from(truck.cruise_control.enabled),
        ignition_state: if truck.electric.enabled { 2 } else { 0 },
        engine_state: u16::from(truck.engine.enabled),
        clock_minutes: event.game.time.value,
        indicators: Some(indicators(truck)),
        ..TelemetrySample::default()
    }
}

fn indicators(truck: &TruckState) -> Indicators {
    let lights = &truck.lights;
    let brakes = &truck.brakes;

    Indicators {
        high_beam: lights.beam_high.enabled,
        low_beam: lights.beam_low.enabled,
        parking_lights: lights.parking.enabled,
        beacon: lights.beacon.enabled,
        left_blinker: lights.blinker.left.enabled,
        right_blinker: lights.blinker.right.enabled,
        hazard: lights.hazard.enabled,
        parking_brake: brakes.parking.enabled,
        oil_pressure_warning: truck.engine.oil_pressure.warning.enabled,
        battery_warning: truck.engine.battery_voltage.warning.enabled,
        engine_damage: truck.engine.damage,
        transmission_damage: truck.transmission.damage,
        air_pressure_warning: brakes.air_pressure.warning.enabled,
        air_pressure_emergency: brakes.air_pressure.emergency.enabled,
        retarder_steps: brakes.retarder.steps,
        retarder_level: brakes.retarder.level,
    }
}
