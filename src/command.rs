//! # Operator Commands
//!
//! Lets an operator force the dashboard's custom indicator light from the
//! console, independently of telemetry.
//!
//! Commands are 1-4 digits followed by `T` (on) or `F` (off), e.g. `5T` or
//! `0012f`.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::error::{BridgeError, Result};

const LIGHT_ON_BIT: u32 = 1 << 16;

/// Custom light override sent with every frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverrideState {
    /// 0..=9999
    pub light_number: u16,
    pub light_on: bool,
}

impl OverrideState {
    /// Light number as the four digit code shown to the operator
    pub fn light_code(&self) -> String {
        format!("{:04}", self.light_number)
    }

    fn pack(self) -> u32 {
        u32::from(self.light_number) | if self.light_on { LIGHT_ON_BIT } else { 0 }
    }

    fn unpack(bits: u32) -> Self {
        Self {
            light_number: (bits & 0xFFFF) as u16,
            light_on: bits & LIGHT_ON_BIT != 0,
        }
    }
}

/// Override state shared between the operator console and the bridge
///
/// Last writer wins; readers always see a whole (number, on/off) pair.
#[derive(Debug, Clone, Default)]
pub struct SharedOverride(Arc<AtomicU32>);

impl SharedOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> OverrideState {
        OverrideState::unpack(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: OverrideState) {
        self.0.store(state.pack(), Ordering::Release);
    }
}

/// Parse one operator command line
///
/// Surrounding whitespace is ignored and the on/off flag is case-insensitive.
///
/// # Errors
///
/// Returns `CommandParse` if the line is not 1-4 digits followed by `T`/`F`.
///
/// # Examples
///
/// ```
/// use simdash_bridge::command::parse_command;
///
/// let state = parse_command("7t").unwrap();
/// assert_eq!(state.light_code(), "0007");
/// assert!(state.light_on);
/// ```
pub fn parse_command(line: &str) -> Result<OverrideState> {
    let input = line.trim().to_ascii_uppercase();
    let invalid = || BridgeError::CommandParse(line.trim().to_string());

    if !input.is_ascii() || input.len() < 2 || input.len() > 5 {
        return Err(invalid());
    }

    let (digits, flag) = input.split_at(input.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let light_on = match flag {
        "T" => true,
        "F" => false,
        _ => return Err(invalid()),
    };
    let light_number = digits.parse::<u16>().map_err(|_| invalid())?;

    Ok(OverrideState {
        light_number,
        light_on,
    })
}

/// Apply one command line to the shared state
///
/// Invalid input is reported and leaves the state unchanged.
pub fn apply_command(line: &str, overrides: &SharedOverride) -> Result<OverrideState> {
    match parse_command(line) {
        Ok(state) => {
            overrides.set(state);
            info!(
                "Set custom light {} = {}",
                state.light_code(),
                if state.light_on { "ON" } else { "OFF" }
            );
            Ok(state)
        }
        Err(e) => {
            warn!("{}", e);
            Err(e)
        }
    }
}

/// Read operator commands until the input closes
///
/// Blank lines are skipped. Returns when `reader` reaches EOF.
pub async fn run_operator_input<R>(reader: R, overrides: SharedOverride) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let _ = apply_command(&line, &overrides);
    }
    info!("Operator input closed");
    Ok(())
}
