//! Datagram transport
//!
//! The engine only needs to send to an address, answer a request, and issue
//! its own request with a timeout. `UdpTransport` provides those over one
//! UDP socket, splitting large payloads into fragments, and hands every
//! inbound request or message to a channel.

mod frame;
mod reassembly;
#[cfg(test)]
pub mod testing;
mod udp;

pub use frame::{
    Frame, FrameKind, HEADER_LEN, MAX_DATAGRAM, MAX_FRAGMENTS, MAX_FRAGMENT_PAYLOAD,
};
pub use reassembly::Reassembler;
pub use udp::UdpTransport;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport closed")]
    Closed,

    #[error("Packet did not arrive as a request and cannot be answered")]
    NotARequest,

    #[error("Malformed datagram: {0}")]
    Malformed(String),

    #[error("Payload of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
}

/// A request or message received from a peer
#[derive(Debug, Clone)]
pub struct InboundPacket {
    pub peer: SocketAddr,
    /// Present when the peer expects a response
    pub correlation: Option<u32>,
    pub payload: Bytes,
}

impl InboundPacket {
    pub fn expects_response(&self) -> bool {
        self.correlation.is_some()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Fire-and-forget datagram
    async fn send(&self, peer: SocketAddr, payload: Bytes) -> Result<(), TransportError>;

    /// Send a request and wait for its response. `Ok(None)` means no
    /// response arrived within `timeout`.
    async fn request(
        &self,
        peer: SocketAddr,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Option<Bytes>, TransportError>;

    /// Answer a request received earlier
    async fn respond(&self, packet: &InboundPacket, payload: Bytes) -> Result<(), TransportError>;
}

/// Shared handle to a transport
pub type SharedTransport = Arc<dyn Transport>;
