//! # OutGauge Decoders
//!
//! Decodes OutGauge-family UDP datagrams (LFS layout, as sent by BeamNG.drive).
//!
//! Layout (little-endian):
//! ```text
//! car[4]@4  flags u16@8  gear u8@10  plid u8@11  speed f32@12  rpm f32@16
//! turbo f32@20  engTemp f32@24  fuel f32@28  oilPressure f32@32
//! oilTemp f32@36  dashLights i32@40  showLights i32@44
//! throttle f32@48  brake f32@52  clutch f32@56
//! ```
//! The extended layout appends:
//! ```text
//! gearMode u8@96  cruiseSpeed f32@100  cruiseMode u32@104
//! fuelCapacity f32@108  ignitionState u16@112  engineState u16@114
//! ```

use super::sample::{SourceFormat, TelemetrySample};
use crate::error::{BridgeError, Result};

/// Basic layout size (through `clutch`)
pub const BASIC_PACKET_SIZE: usize = 60;

/// Extended layout size (through `engineState`)
pub const EXTENDED_PACKET_SIZE: usize = 116;

const OFF_CAR: usize = 4;
const OFF_FLAGS: usize = 8;
const OFF_GEAR: usize = 10;
const OFF_PLID: usize = 11;
const OFF_SPEED: usize = 12;
const OFF_RPM: usize = 16;
const OFF_TURBO: usize = 20;
const OFF_ENG_TEMP: usize = 24;
const OFF_FUEL: usize = 28;
const OFF_OIL_PRESSURE: usize = 32;
const OFF_OIL_TEMP: usize = 36;
const OFF_DASHLIGHTS: usize = 40;
const OFF_SHOWLIGHTS: usize = 44;
const OFF_THROTTLE: usize = 48;
const OFF_BRAKE: usize = 52;
const OFF_CLUTCH: usize = 56;

const OFF_GEAR_MODE: usize = 96;
const OFF_CRUISE_SPEED: usize = 100;
const OFF_CRUISE_MODE: usize = 104;
const OFF_FUEL_CAPACITY: usize = 108;
const OFF_IGNITION: usize = 112;
const OFF_ENGINE: usize = 114;

/// Decode a basic OutGauge datagram
///
/// The gear-mode byte at offset 96 is picked up when the datagram is long
/// enough to carry it; otherwise the mode stays `N`.
///
/// # Errors
///
/// Returns `Decode` if the payload is shorter than [`BASIC_PACKET_SIZE`].
pub fn decode_basic(data: &[u8]) -> Result<TelemetrySample> {
    check_len(data, SourceFormat::BasicV1)?;

    let mut sample = decode_common(data);
    if data.len() > OFF_GEAR_MODE {
        sample.gear_mode = gear_mode(data[OFF_GEAR_MODE]);
    }
    Ok(sample)
}

/// Decode an extended OutGauge datagram
///
/// # Errors
///
/// Returns `Decode` if the payload is shorter than [`EXTENDED_PACKET_SIZE`].
pub fn decode_extended(data: &[u8]) -> Result<TelemetrySample> {
    check_len(data, SourceFormat::ExtendedV1)?;

    let mut sample = decode_common(data);
    sample.gear_mode = gear_mode(data[OFF_GEAR_MODE]);
    sample.cruise_speed = read_f32(data, OFF_CRUISE_SPEED);
    sample.cruise_mode = read_u32(data, OFF_CRUISE_MODE);
    sample.fuel_capacity = Some(read_f32(data, OFF_FUEL_CAPACITY));
    sample.ignition_state = read_u16(data, OFF_IGNITION);
    sample.engine_state = read_u16(data, OFF_ENGINE);
    Ok(sample)
}

fn check_len(data: &[u8], format: SourceFormat) -> Result<()> {
    let required = format.required_len().unwrap_or(0);
    if data.len() < required {
        return Err(BridgeError::decode(
            format.name(),
            format!("packet too short: expected {} bytes, got {}", required, data.len()),
        ));
    }
    Ok(())
}

/// Fields shared by both layouts; caller guarantees `data.len() >= BASIC_PACKET_SIZE`
fn decode_common(data: &[u8]) -> TelemetrySample {
    TelemetrySample {
        car: String::from_utf8_lossy(&data[OFF_CAR..OFF_CAR + 4])
            .trim_end_matches('\0')
            .to_string(),
        flags: read_u16(data, OFF_FLAGS),
        // OutGauge: 0=R, 1=N, 2=1st
        gear: i16::from(data[OFF_GEAR]) - 1,
        player_id: data[OFF_PLID],
        speed: read_f32(data, OFF_SPEED),
        rpm: read_f32(data, OFF_RPM),
        turbo: read_f32(data, OFF_TURBO),
        water_temp: read_f32(data, OFF_ENG_TEMP),
        fuel: read_f32(data, OFF_FUEL),
        oil_pressure: read_f32(data, OFF_OIL_PRESSURE),
        oil_temp: read_f32(data, OFF_OIL_TEMP),
        dashlights: read_u32(data, OFF_DASHLIGHTS),
        showlights: read_u32(data, OFF_SHOWLIGHTS),
        throttle: read_f32(data, OFF_THROTTLE),
        brake: read_f32(data, OFF_BRAKE),
        clutch: read_f32(data, OFF_CLUTCH),
        ..TelemetrySample::default()
    }
}

fn gear_mode(byte: u8) -> char {
    if byte.is_ascii_graphic() {
        byte as char
    } else {
        'N'
    }
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&data[offset..offset + N]);
    buf
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(read_array(data, offset))
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(read_array(data, offset))
}

fn read_f32(data: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes(read_array(data, offset))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builder for OutGauge test datagrams
    pub(crate) struct PacketBuilder {
        data: Vec<u8>,
    }

    impl PacketBuilder {
        pub(crate) fn basic() -> Self {
            let mut data = vec![0u8; BASIC_PACKET_SIZE];
            data[OFF_CAR..OFF_CAR + 4].copy_from_slice(b"beam");
            Self { data }
        }

        pub(crate) fn extended() -> Self {
            let mut builder = Self::basic();
            builder.data.resize(EXTENDED_PACKET_SIZE, 0);
            builder.data[OFF_GEAR_MODE] = b'N';
            builder
        }

        fn f32_at(mut self, offset: usize, value: f32) -> Self {
            self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            self
        }

        pub(crate) fn speed(self, v: f32) -> Self { self.f32_at(OFF_SPEED, v) }
        pub(crate) fn rpm(self, v: f32) -> Self { self.f32_at(OFF_RPM, v) }
        pub(crate) fn engine_temp(self, v: f32) -> Self { self.f32_at(OFF_ENG_TEMP, v) }
        pub(crate) fn oil_temp(self, v: f32) -> Self { self.f32_at(OFF_OIL_TEMP, v) }
        pub(crate) fn fuel(self, v: f32) -> Self { self.f32_at(OFF_FUEL, v) }
        pub(crate) fn cruise_speed(self, v: f32) -> Self { self.f32_at(OFF_CRUISE_SPEED, v) }
        pub(crate) fn fuel_capacity(self, v: f32) -> Self { self.f32_at(OFF_FUEL_CAPACITY, v) }

        pub(crate) fn gear(mut self, raw: u8) -> Self {
            self.data[OFF_GEAR] = raw;
            self
        }

        pub(crate) fn showlights(mut self, bits: u32) -> Self {
            self.data[OFF_SHOWLIGHTS..OFF_SHOWLIGHTS + 4].copy_from_slice(&bits.to_le_bytes());
            self
        }

        pub(crate) fn gear_mode(mut self, mode: u8) -> Self {
            if self.data.len() <= OFF_GEAR_MODE {
                self.data.resize(OFF_GEAR_MODE + 1, 0);
            }
            self.data[OFF_GEAR_MODE] = mode;
            self
        }

        pub(crate) fn cruise_mode(mut self, mode: u32) -> Self {
            self.data[OFF_CRUISE_MODE..OFF_CRUISE_MODE + 4].copy_from_slice(&mode.to_le_bytes());
            self
        }

        pub(crate) fn ignition(mut self, ignition: u16, engine: u16) -> Self {
            self.data[OFF_IGNITION..OFF_IGNITION + 2].copy_from_slice(&ignition.to_le_bytes());
            self.data[OFF_ENGINE..OFF_ENGINE + 2].copy_from_slice(&engine.to_le_bytes());
            self
        }

        pub(crate) fn build(self) -> Vec<u8> {
            self.data
        }
    }

    #[test]
    fn test_decode_basic_fields() {
        let packet = PacketBuilder::basic()
            .speed(27.78)
            .rpm(3000.0)
            .gear(3)
            .engine_temp(90.0)
            .oil_temp(95.5)
            .fuel(0.5)
            .showlights(0x0000_0201)
            .build();

        let sample = decode_basic(&packet).unwrap();
        assert_eq!(sample.car, "beam");
        assert_eq!(sample.speed, 27.78);
        assert_eq!(sample.rpm, 3000.0);
        assert_eq!(sample.gear, 2);
        assert_eq!(sample.water_temp, 90.0);
        assert_eq!(sample.oil_temp, 95.5);
        assert_eq!(sample.fuel, 0.5);
        assert_eq!(sample.showlights, 0x0000_0201);
        assert_eq!(sample.gear_mode, 'N');
        assert_eq!(sample.fuel_capacity, None);
    }

    #[test]
    fn test_decode_basic_matches_raw_offsets() {
        // Every byte distinct so a wrong offset shows up
        let packet: Vec<u8> = (0..BASIC_PACKET_SIZE as u8).collect();
        let sample = decode_basic(&packet).unwrap();

        assert_eq!(sample.flags, u16::from_le_bytes([8, 9]));
        assert_eq!(sample.gear, 10 - 1);
        assert_eq!(sample.player_id, 11);
        assert_eq!(sample.speed, f32::from_le_bytes([12, 13, 14, 15]));
        assert_eq!(sample.turbo, f32::from_le_bytes([20, 21, 22, 23]));
        assert_eq!(sample.oil_pressure, f32::from_le_bytes([32, 33, 34, 35]));
        assert_eq!(sample.dashlights, u32::from_le_bytes([40, 41, 42, 43]));
        assert_eq!(sample.showlights, u32::from_le_bytes([44, 45, 46, 47]));
        assert_eq!(sample.throttle, f32::from_le_bytes([48, 49, 50, 51]));
        assert_eq!(sample.brake, f32::from_le_bytes([52, 53, 54, 55]));
        assert_eq!(sample.clutch, f32::from_le_bytes([56, 57, 58, 59]));
    }

    #[test]
    fn test_decode_basic_reads_gear_mode_when_present() {
        let packet = PacketBuilder::basic().gear_mode(b'A').build();
        assert_eq!(decode_basic(&packet).unwrap().gear_mode, 'A');
    }

    #[test]
    fn test_decode_basic_too_short() {
        let result = decode_basic(&[0u8; BASIC_PACKET_SIZE - 1]);
        match result {
            Err(BridgeError::Decode { format, reason }) => {
                assert_eq!(format, "outgauge");
                assert!(reason.contains("59"));
            }
            other => panic!("Expected Decode error, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_extended_fields() {
        let packet = PacketBuilder::extended()
            .rpm(1500.0)
            .gear_mode(b'A')
            .cruise_speed(25.0)
            .cruise_mode(1)
            .fuel_capacity(70.0)
            .ignition(2, 1)
            .build();

        let sample = decode_extended(&packet).unwrap();
        assert_eq!(sample.rpm, 1500.0);
        assert_eq!(sample.gear_mode, 'A');
        assert_eq!(sample.cruise_speed, 25.0);
        assert!(sample.cruise_enabled());
        assert_eq!(sample.fuel_capacity, Some(70.0));
        assert_eq!(sample.ignition_state, 2);
        assert_eq!(sample.engine_state, 1);
    }

    #[test]
    fn test_decode_extended_rejects_basic_packet() {
        let packet = PacketBuilder::basic().build();
        assert!(decode_extended(&packet).is_err());
    }

    #[test]
    fn test_gear_mode_falls_back_on_unprintable_byte() {
        let packet = PacketBuilder::extended().gear_mode(0).build();
        assert_eq!(decode_extended(&packet).unwrap().gear_mode, 'N');
    }
}
