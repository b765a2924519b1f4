//! # SimDash Bridge
//!
//! Forward racing and truck simulator telemetry to a serial dashboard.
//!
//! Listens for simulator telemetry on UDP, converts every datagram into a
//! dashboard frame and writes it to the dashboard's serial port. The serial
//! link is reopened automatically when the device is unplugged. Lines typed
//! on stdin (e.g. `5T`, `12F`) switch the dashboard's custom light.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use simdash_bridge::bridge::{Bridge, BridgeSettings};
use simdash_bridge::command::{run_operator_input, SharedOverride};
use simdash_bridge::config::{Config, LoggingConfig};
use simdash_bridge::dash::protocol::FrameFormat;
use simdash_bridge::serial::port_trait::TokioSerialOpener;
use simdash_bridge::serial::{LinkManager, LinkSettings};
use simdash_bridge::telemetry::listener::TelemetryListener;
use simdash_bridge::telemetry::SourceFormat;

/// Grace period for background tasks once the bridge loop has stopped
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(250);

/// SimDash Bridge - simulator telemetry to serial dashboard
#[derive(Parser, Debug)]
#[command(name = "simdash-bridge")]
#[command(about = "Forward simulator telemetry to a serial dashboard", long_about = None)]
#[command(version)]
struct Cli {
    /// Serial device of the dashboard (e.g. /dev/ttyUSB0 or COM3)
    device: Option<String>,

    /// Serial baud rate
    #[arg(short, long, value_name = "BAUD")]
    baud: Option<u32>,

    /// UDP port to listen on for telemetry
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// BeamNG extended OutGauge telemetry (default)
    #[arg(long, conflicts_with_all = ["outgauge", "trucksim"])]
    beamng: bool,

    /// Plain OutGauge telemetry
    #[arg(long, conflicts_with = "trucksim")]
    outgauge: bool,

    /// Truck simulator JSON telemetry events
    #[arg(long)]
    trucksim: bool,

    /// Send the legacy ASCII line instead of binary frames
    #[arg(long)]
    ascii: bool,
}

impl Cli {
    /// Source format picked by a mode flag, if any
    fn source(&self) -> Option<SourceFormat> {
        if self.beamng {
            Some(SourceFormat::ExtendedV1)
        } else if self.outgauge {
            Some(SourceFormat::BasicV1)
        } else if self.trucksim {
            Some(SourceFormat::TruckSimEvent)
        } else {
            None
        }
    }
}

/// Apply command line arguments on top of the loaded configuration
///
/// A mode flag only changes the source; the UDP port follows it unless
/// `--port` or the config file sets one.
fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(device) = &cli.device {
        config.serial.port = device.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(source) = cli.source() {
        config.telemetry.source = source;
    }
    if let Some(port) = cli.port {
        config.telemetry.udp_port = Some(port);
    }
    if cli.ascii {
        config.frame.format = FrameFormat::Ascii;
    }
}

/// Install the stderr subscriber plus an optional daily log file
///
/// The returned guard must stay alive for file output to be flushed.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Main entry point for SimDash Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration, apply command line overrides
///    - Set up logging
///    - Bind the UDP telemetry listener (fatal on failure)
///    - Open the serial link (retried in the background on failure)
///    - Start reading operator commands from stdin
///
/// 2. **Main Loop**
///    - Decode, encode and forward every telemetry datagram
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Release the serial device and reconnect timer
///    - Log frame totals
///
/// # Examples
///
/// ```bash
/// simdash-bridge /dev/ttyUSB0 --beamng
/// simdash-bridge COM3 --trucksim --port 30001
/// ```
fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    apply_cli_overrides(&mut config, &cli);
    config.validate()?;

    let _log_guard = init_logging(&config.logging);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(run(config));

    // A pending stdin read would otherwise keep the runtime alive
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    result
}

async fn run(config: Config) -> Result<()> {
    info!("SimDash Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    if config.serial.port.is_empty() {
        bail!("No serial device given; pass it as the first argument or set [serial] port");
    }

    let source = config.telemetry.source;
    let udp_port = config.udp_port();
    let mut listener = TelemetryListener::bind(config.telemetry.bind_address, udp_port)
        .await
        .with_context(|| format!("Failed to bind UDP port {}", udp_port))?;

    let link = LinkManager::new(
        LinkSettings {
            device_path: config.serial.port.clone(),
            baud_rate: config.serial.baud_rate,
            reconnect_interval: config.reconnect_interval(),
        },
        Arc::new(TokioSerialOpener),
    );
    if link.open().await.is_err() {
        info!("Dashboard not available yet, frames are dropped until it connects");
    }

    let overrides = SharedOverride::new();
    let operator = tokio::spawn(run_operator_input(
        BufReader::new(tokio::io::stdin()),
        overrides.clone(),
    ));

    let mut bridge = Bridge::new(
        BridgeSettings {
            source,
            frame_format: config.frame.format,
            terminator: config.frame.terminator,
            default_tank_capacity: config.telemetry.fuel_capacity_liters,
        },
        overrides,
        link.clone(),
    );

    info!(
        "Forwarding {} telemetry to {} at {} baud",
        source,
        link.device_path(),
        config.serial.baud_rate
    );
    debug!(
        "Dashlights {}",
        if source.native_dashlights() { "passed through" } else { "mapped from indicators" }
    );
    info!("Type e.g. 5T or 12F to switch a custom light, Ctrl+C to exit");

    loop {
        tokio::select! {
            datagram = listener.next_datagram() => {
                match datagram {
                    Ok(payload) => {
                        if let Err(e) = bridge.handle_datagram(payload).await {
                            debug!("Telemetry cycle failed: {}", e);
                        }
                    }
                    Err(e) => warn!("UDP receive failed: {}", e),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    operator.abort();
    drop(listener);
    link.shutdown().await;

    let stats = bridge.stats();
    info!(
        "Datagrams received: {}, frames sent: {}, dropped: {}, decode errors: {}, write errors: {}",
        stats.received, stats.sent, stats.dropped, stats.decode_errors, stats.write_errors
    );

    Ok(())
}
