//! # Error Types
//!
//! Custom error types for SimDash Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for SimDash Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Telemetry payload too short or malformed for its declared format
    #[error("{format} decode error: {reason}")]
    Decode {
        format: &'static str,
        reason: String,
    },

    /// Serial device could not be opened (busy, missing, permission denied)
    #[error("Failed to open {path}: {reason}")]
    LinkOpen { path: String, reason: String },

    /// Write to an open serial device failed
    #[error("Serial write failed: {0}")]
    LinkWrite(String),

    /// Operator command did not match `^\d{1,4}[TF]$`
    #[error("Invalid command {0:?}, use e.g. 5T or 12F")]
    CommandParse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration values out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Shorthand for a [`BridgeError::Decode`] with a formatted reason
    pub fn decode(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode {
            format,
            reason: reason.into(),
        }
    }
}

/// Result type alias for SimDash Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
