//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Trait for serial port write operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Byte stream coming back from the dashboard
pub type DeviceReader = Box<dyn AsyncRead + Send + Unpin>;

/// A freshly opened device, split into its two directions
pub struct OpenedPort {
    pub writer: Box<dyn SerialPortIO>,
    /// `None` for write-only devices
    pub reader: Option<DeviceReader>,
}

/// Opens the serial device; called on startup and by every reconnect attempt
#[cfg_attr(test, mockall::automock)]
pub trait PortOpener: Send + Sync {
    fn open(&self, path: &str, baud_rate: u32) -> io::Result<OpenedPort>;
}

/// Opens real serial ports as 8N1 without flow control
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSerialOpener;

impl PortOpener for TokioSerialOpener {
    fn open(&self, path: &str, baud_rate: u32) -> io::Result<OpenedPort> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(io::Error::from)?;

        let (reader, writer) = tokio::io::split(port);
        Ok(OpenedPort {
            writer: Box::new(TokioSerialPort::new(writer)),
            reader: Some(Box::new(reader)),
        })
    }
}

/// Write half of a tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: WriteHalf<SerialStream>,
}

impl TokioSerialPort {
    pub fn new(port: WriteHalf<SerialStream>) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }
}
