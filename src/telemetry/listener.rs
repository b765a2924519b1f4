//! UDP datagram listener for inbound telemetry.

use std::net::{IpAddr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::Result;

/// Largest UDP payload; anything shorter would truncate big JSON events
const MAX_DATAGRAM_SIZE: usize = 65_536;

/// Receives telemetry datagrams from the simulator
///
/// Payload shape is trusted; no sender validation is done.
pub struct TelemetryListener {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl std::fmt::Debug for TelemetryListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryListener")
            .field("local_addr", &self.socket.local_addr().ok())
            .finish_non_exhaustive()
    }
}

impl TelemetryListener {
    /// Bind the listener socket
    ///
    /// # Errors
    ///
    /// Returns `Io` if the address is in use or not permitted. The bridge
    /// has nothing to do without its input, so callers treat this as fatal.
    pub async fn bind(address: IpAddr, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(address, port)).await?;
        info!("UDP telemetry listener bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the next datagram and return its payload
    pub async fn next_datagram(&mut self) -> Result<&[u8]> {
        let (len, peer) = self.socket.recv_from(&mut self.buf).await?;
        debug!("Received {} byte datagram from {}", len, peer);
        Ok(&self.buf[..len])
    }
}
