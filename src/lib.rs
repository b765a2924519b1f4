//! # SimDash Bridge Library
//!
//! Forward racing and truck simulator telemetry to a serial dashboard.
//!
//! This library provides the pipeline that turns simulator UDP telemetry
//! (OutGauge, its extended BeamNG layout, and truck simulator events) into
//! the fixed-size frames the dashboard firmware reads from its serial port.

pub mod bridge;
pub mod command;
pub mod config;
pub mod dash;
pub mod error;
pub mod fuel;
pub mod serial;
pub mod telemetry;
