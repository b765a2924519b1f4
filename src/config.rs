//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; a missing file section falls back
//! to the same defaults the command line uses.

use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dash::protocol::FrameFormat;
use crate::error::{BridgeError, Result};
use crate::serial::DEFAULT_BAUD_RATE;
use crate::telemetry::SourceFormat;

/// Baud rates the dashboard firmware has been built for
pub const SUPPORTED_BAUD_RATES: [u32; 8] = [
    9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub frame: FrameConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path; may be left empty and given on the command line
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Telemetry input configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_source")]
    pub source: SourceFormat,

    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Defaults to the usual port of `source` when unset
    #[serde(default)]
    pub udp_port: Option<u16>,

    /// Used when the datagram does not report tank capacity
    #[serde(default = "default_fuel_capacity_liters")]
    pub fuel_capacity_liters: f32,
}

/// Outbound frame configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FrameConfig {
    #[serde(default)]
    pub format: FrameFormat,

    /// Extra byte after the binary checksum, e.g. 10 for `\n`
    #[serde(default)]
    pub terminator: Option<u8>,
}

/// Log file configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Write a daily log file here in addition to stderr
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

// Default value functions
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }
fn default_reconnect_interval_ms() -> u64 { 2000 }

fn default_source() -> SourceFormat { SourceFormat::ExtendedV1 }
fn default_bind_address() -> IpAddr { IpAddr::V4(Ipv4Addr::UNSPECIFIED) }
fn default_fuel_capacity_liters() -> f32 { 61.0 }

fn default_file_prefix() -> String { "simdash-bridge.log".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            bind_address: default_bind_address(),
            udp_port: None,
            fuel_capacity_liters: default_fuel_capacity_liters(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use simdash_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// The serial port is not checked here since the command line may
    /// still provide it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if any value is out of its valid range
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(BridgeError::InvalidConfig(format!(
                "baud_rate {} is not one of {:?}",
                self.serial.baud_rate, SUPPORTED_BAUD_RATES
            )));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(BridgeError::InvalidConfig(
                "reconnect_interval_ms must be between 1 and 60000".to_string(),
            ));
        }

        if self.telemetry.udp_port == Some(0) {
            return Err(BridgeError::InvalidConfig(
                "udp_port must be greater than 0".to_string(),
            ));
        }

        let capacity = self.telemetry.fuel_capacity_liters;
        if capacity.is_nan() || capacity <= 0.0 {
            return Err(BridgeError::InvalidConfig(
                "fuel_capacity_liters must be greater than 0".to_string(),
            ));
        }

        if self.logging.directory.is_some() && self.logging.file_prefix.is_empty() {
            return Err(BridgeError::InvalidConfig(
                "logging file_prefix cannot be empty when a directory is set".to_string(),
            ));
        }

        Ok(())
    }

    /// UDP port to listen on: the configured one, else the source's usual port
    pub fn udp_port(&self) -> u16 {
        self.telemetry
            .udp_port
            .unwrap_or_else(|| self.telemetry.source.default_port())
    }

    /// Delay between serial reconnect attempts
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.serial.reconnect_interval_ms)
    }
}
