// # Trap Source Trait
//
// Defines the receive side of a listener: something that opens a transport
// and yields inbound units until it is closed.
//
// ## Implementations
//
// - UDP socket on port 162: `trapd-source-udp` crate
// - tcpdump subprocess stdout: `trapd-source-capture` crate
//
// ## Usage
//
// ```rust,ignore
// use trapd_core::TrapSource;
// use tokio_stream::StreamExt;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* TrapSource implementation */;
//
//     let mut units = source.open().await?;
//     while let Some(unit) = units.next().await {
//         println!("received: {:?}", unit);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::net::SocketAddr;
use std::pin::Pin;
use tokio_stream::Stream;

/// One unit of input handed from a listener to a decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUnit {
    /// A raw notification datagram
    Datagram {
        /// BER-encoded SNMP message
        payload: Vec<u8>,
        /// Transport-layer sender
        source: SocketAddr,
        /// When the listener read the datagram
        received_at: DateTime<Local>,
    },

    /// One line of packet-capture output
    CaptureLine {
        /// The line, without its trailing newline
        line: String,
    },
}

impl InboundUnit {
    /// Create a datagram unit stamped with the current local time
    pub fn datagram(payload: Vec<u8>, source: SocketAddr) -> Self {
        InboundUnit::Datagram {
            payload,
            source,
            received_at: Local::now(),
        }
    }

    /// Create a capture-line unit
    pub fn capture_line(line: impl Into<String>) -> Self {
        InboundUnit::CaptureLine { line: line.into() }
    }

    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            InboundUnit::Datagram { .. } => "datagram",
            InboundUnit::CaptureLine { .. } => "capture line",
        }
    }
}

/// Stream of inbound units produced by an open listener
pub type InboundStream = Pin<Box<dyn Stream<Item = InboundUnit> + Send + 'static>>;

/// Trait for listener implementations
///
/// A source owns a transport handle (socket or subprocess). `open()` acquires
/// it and fails fast when that is impossible, for example when binding a
/// privileged port without the required capability.
///
/// # Stream Contract
///
/// - Units are yielded in the order they were received
/// - Transient receive errors are logged by the source and skipped
/// - The stream ends only when the transport is gone for good (socket error
///   that cannot be recovered, capture process exited)
/// - Dropping the stream releases the transport handle
///
/// # Forbidden Capabilities
/// - ❌ Decoding payloads (owned by `TrapDecoder`)
/// - ❌ Writing to the sink (owned by `TrapEngine`)
/// - ❌ Restarting a dead transport behind the engine's back
#[async_trait]
pub trait TrapSource: Send + Sync {
    /// Acquire the transport and start yielding units
    ///
    /// # Returns
    ///
    /// - `Ok(InboundStream)`: The unit stream
    /// - `Err(Error::Transport)`: If the transport could not be acquired
    async fn open(&self) -> Result<InboundStream, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
