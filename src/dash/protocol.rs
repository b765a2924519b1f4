//! # Dashboard Protocol Constants and Types
//!
//! Core definitions for the serial frame sent to the dashboard.
//!
//! Binary frame layout (little-endian, 33 bytes plus optional terminator):
//! ```text
//! 0  'S'            1  year % 2000    2  month        3  day
//! 4  hour           5  minute         6  second       7  rpm u16
//! 9  speed×10 u16   11 gear           12 water temp   13 oil temp
//! 14 fuel×1000 u16  16 showlights i32 20 showlightsExt
//! 21 injection u16  23 light no. u16  25 light state  26 gear mode
//! 27 cruise×10 u16  29 cruise mode    30 ignition     31 engine
//! 32 checksum
//! ```

/// Frame start marker
pub const FRAME_START: u8 = b'S';

/// Binary frame length up to and including the checksum
pub const FRAME_LEN: usize = 33;

/// Offset of the checksum byte
pub const CHECKSUM_OFFSET: usize = FRAME_LEN - 1;

/// Legacy ASCII line length including the trailing newline
pub const ASCII_LINE_LEN: usize = 58;

/// Largest injection value the dashboard displays
pub const MAX_INJECTION: u16 = 9999;

/// Largest custom light number
pub const MAX_LIGHT_NUMBER: u16 = 9999;

// Showlights bits (OutGauge DL_* assignment)
pub const DL_SHIFT: u32 = 1 << 0;
pub const DL_FULLBEAM: u32 = 1 << 1;
pub const DL_HANDBRAKE: u32 = 1 << 2;
pub const DL_TC: u32 = 1 << 4;
pub const DL_SIGNAL_L: u32 = 1 << 5;
pub const DL_SIGNAL_R: u32 = 1 << 6;
pub const DL_OILWARN: u32 = 1 << 8;
pub const DL_BATTERY: u32 = 1 << 9;
pub const DL_ABS: u32 = 1 << 10;
pub const DL_BEACON: u32 = 1 << 11;
pub const DL_LOWBEAM: u32 = 1 << 12;
pub const DL_ESC: u32 = 1 << 13;
pub const DL_CHECKENGINE: u32 = 1 << 14;
pub const DL_CLUTCHTEMP: u32 = 1 << 15;
pub const DL_FOGLIGHTS: u32 = 1 << 16;

// Extended showlights bits
pub const DL_EXT_YELLOWTRIANGLE: u8 = 1 << 0;
pub const DL_EXT_REDTRIANGLE: u8 = 1 << 1;
pub const DL_EXT_GEARBOX_ISSUE: u8 = 1 << 2;
pub const DL_EXT_BRAKERED: u8 = 1 << 3;

/// Indicator bitfields sent to the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dashlights {
    pub showlights: u32,
    pub showlights_ext: u8,
}

impl Dashlights {
    /// Whether every bit in `mask` is set in `showlights`
    pub fn has(&self, mask: u32) -> bool {
        self.showlights & mask == mask
    }
}

/// Outbound frame encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// Fixed 33 byte binary frame with additive checksum
    #[default]
    Binary,
    /// Newline terminated ASCII line for older dashboard firmware
    Ascii,
}

/// Values carried by a binary frame, as read back from the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashFrame {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub rpm: u16,
    /// km/h × 10
    pub speed_x10: u16,
    /// 0 reverse, 1 neutral, 2.. forward
    pub gear: u8,
    pub water_temp: u8,
    pub oil_temp: u8,
    /// Tank fraction × 1000
    pub fuel_x1000: u16,
    pub showlights: u32,
    pub showlights_ext: u8,
    pub injection: u16,
    pub light_number: u16,
    pub light_on: bool,
    pub gear_mode: char,
    /// km/h × 10
    pub cruise_speed_x10: u16,
    pub cruise_mode: u8,
    pub ignition_state: u8,
    pub engine_state: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(FRAME_START, b'S');
        assert_eq!(FRAME_LEN, 33);
        assert_eq!(CHECKSUM_OFFSET, 32);
        assert_eq!(MAX_INJECTION, 9999);
    }

    #[test]
    fn test_dashlight_bits_are_distinct() {
        let bits = [
            DL_SHIFT, DL_FULLBEAM, DL_HANDBRAKE, DL_TC, DL_SIGNAL_L, DL_SIGNAL_R,
            DL_OILWARN, DL_BATTERY, DL_ABS, DL_BEACON, DL_LOWBEAM, DL_ESC,
            DL_CHECKENGINE, DL_CLUTCHTEMP, DL_FOGLIGHTS,
        ];
        let combined = bits.iter().fold(0u32, |acc, b| {
            assert_eq!(acc & b, 0);
            acc | b
        });
        assert_eq!(combined.count_ones() as usize, bits.len());
        assert_eq!(DL_CLUTCHTEMP, 0x8000);
    }

    #[test]
    fn test_dashlights_has() {
        let lights = Dashlights {
            showlights: DL_SHIFT | DL_BATTERY,
            showlights_ext: 0,
        };
        assert!(lights.has(DL_SHIFT));
        assert!(lights.has(DL_SHIFT | DL_BATTERY));
        assert!(!lights.has(DL_ABS));
    }
}
