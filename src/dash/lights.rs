//! # Dashlight Mapper
//!
//! Produces the dashboard indicator bitfields for a telemetry sample.
//!
//! OutGauge sources already use the dashboard's bit assignment and pass
//! straight through. Sources reporting per-subsystem state are folded into
//! the same bits here.

use super::protocol::*;
use crate::telemetry::{Indicators, TelemetrySample};

/// Engine wear at which CHECKENGINE lights up
const ENGINE_DAMAGE_WARNING: f32 = 0.2;

/// Transmission wear above which GEARBOX_ISSUE lights up
const GEARBOX_DAMAGE_WARNING: f32 = 0.1;

/// Indicator bitfields for `sample`
pub fn map_dashlights(sample: &TelemetrySample) -> Dashlights {
    match &sample.indicators {
        Some(indicators) => map_indicators(indicators),
        None => Dashlights {
            showlights: sample.showlights,
            showlights_ext: 0,
        },
    }
}

/// Fold per-subsystem indicator state into dashboard bits
pub fn map_indicators(ind: &Indicators) -> Dashlights {
    let mut showlights = 0u32;
    let mut set = |on: bool, bit: u32| {
        if on {
            showlights |= bit;
        }
    };

    set(ind.high_beam, DL_FULLBEAM);
    set(ind.low_beam || ind.parking_lights, DL_LOWBEAM);
    set(ind.left_blinker || ind.hazard, DL_SIGNAL_L);
    set(ind.right_blinker || ind.hazard, DL_SIGNAL_R);
    set(ind.parking_brake, DL_HANDBRAKE);
    set(ind.oil_pressure_warning, DL_OILWARN);
    set(ind.battery_warning, DL_BATTERY);
    set(ind.engine_damage >= ENGINE_DAMAGE_WARNING, DL_CHECKENGINE);
    set(ind.beacon, DL_BEACON);

    let mut showlights_ext = 0u8;
    if ind.transmission_damage > GEARBOX_DAMAGE_WARNING {
        showlights_ext |= DL_EXT_GEARBOX_ISSUE;
    }
    if ind.air_pressure_warning && !ind.air_pressure_emergency {
        showlights_ext |= DL_EXT_YELLOWTRIANGLE;
    }
    if ind.air_pressure_emergency {
        showlights_ext |= DL_EXT_REDTRIANGLE;
    }
    if ind.retarder_steps > 0 && ind.retarder_level > 0 {
        showlights_ext |= DL_EXT_BRAKERED;
    }

    Dashlights {
        showlights,
        showlights_ext,
    }
}
