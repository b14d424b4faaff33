// # UDP Trap Source
//
// This crate provides the socket form of the trap listener: a UDP socket
// bound on the notification port (162 by default).
//
// ## Privileges
//
// Binding a port below 1024 needs root or `CAP_NET_BIND_SERVICE`. Without it
// `open()` fails fast with a transport error naming the address, and the
// daemon exits with a startup failure.
//
// ## Architecture
//
// `open()` binds the socket and wraps it in a stream that reads one datagram
// per poll, stamped with its arrival time. Nothing is read ahead of the
// engine: datagrams it has not asked for stay in the kernel buffer. Dropping
// the stream closes the socket.

use trapd_core::config::{ListenerConfig, TrapConfig};
use trapd_core::traits::{InboundStream, InboundUnit, TrapSource};
use trapd_core::{Error, Result};

use futures_util::stream;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;

/// Largest datagram a UDP socket can deliver
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// UDP socket trap listener
pub struct UdpTrapSource {
    /// Local address to bind
    bind_addr: SocketAddr,
}

impl UdpTrapSource {
    /// Create a new UDP trap source
    ///
    /// # Parameters
    ///
    /// - `bind_addr`: Local address to bind (e.g., "0.0.0.0:162")
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self { bind_addr }
    }

    /// Create a source from the listener section of a config
    pub fn from_config(config: &TrapConfig) -> Result<Self> {
        match &config.listener {
            ListenerConfig::Socket { bind_addr } => Ok(Self::new(*bind_addr)),
            other => Err(Error::config(format!(
                "Invalid listener config for UDP source: {}",
                other.type_name()
            ))),
        }
    }

    /// Address this source binds
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    async fn bind(&self) -> Result<UdpSocket> {
        UdpSocket::bind(self.bind_addr).await.map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => Error::transport(format!(
                "Permission denied binding {} (needs root or CAP_NET_BIND_SERVICE)",
                self.bind_addr
            )),
            _ => Error::transport(format!("Failed to bind {}: {}", self.bind_addr, e)),
        })
    }
}

/// Receive errors that only affect one datagram
fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionRefused
    )
}

/// Turn a bound socket into a unit stream
///
/// `recv_from` only runs while the stream is polled, so at most one datagram
/// is ever out of the socket and not yet handled.
fn datagram_stream(socket: Arc<UdpSocket>) -> InboundStream {
    let buf = vec![0u8; MAX_DATAGRAM_SIZE];

    Box::pin(stream::unfold((socket, buf), |(socket, mut buf)| async move {
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, peer)) => {
                    tracing::debug!("Datagram of {} bytes from {}", len, peer);
                    let unit = InboundUnit::datagram(buf[..len].to_vec(), peer);
                    return Some((unit, (socket, buf)));
                }
                Err(e) if is_transient(e.kind()) => {
                    tracing::warn!("Transient receive error on trap socket: {}", e);
                }
                Err(e) => {
                    tracing::error!("Receive failed on trap socket: {}", e);
                    return None;
                }
            }
        }
    }))
}

#[async_trait::async_trait]
impl TrapSource for UdpTrapSource {
    async fn open(&self) -> Result<InboundStream> {
        let socket = self.bind().await?;
        let local_addr = socket.local_addr()?;

        tracing::info!("Listening for SNMP traps on udp://{}", local_addr);

        Ok(datagram_stream(Arc::new(socket)))
    }

    fn source_name(&self) -> &'static str {
        "udp"
    }
}
