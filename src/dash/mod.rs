//! # Dashboard Protocol Module
//!
//! Implementation of the serial protocol spoken by the dashboard.
//!
//! This module handles:
//! - Mapping indicator state onto the dashboard's light bits
//! - Binary frame encoding (33 bytes, additive checksum)
//! - Legacy ASCII line encoding
//! - Decoding binary frames for inspection

pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod lights;
pub mod protocol;
