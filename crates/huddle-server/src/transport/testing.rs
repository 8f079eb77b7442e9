//! In-process transport double for handler and scheduler tests

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::{InboundPacket, Transport, TransportError};

/// Records everything sent through it.
///
/// Heartbeat requests succeed unless the peer was marked unresponsive.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(SocketAddr, Bytes)>>,
    responses: Mutex<Vec<(SocketAddr, Bytes)>>,
    requested: Mutex<Vec<SocketAddr>>,
    unresponsive: Mutex<HashSet<SocketAddr>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests to `peer` will time out
    pub fn set_unresponsive(&self, peer: SocketAddr) {
        self.unresponsive.lock().insert(peer);
    }

    pub fn sent(&self) -> Vec<(SocketAddr, Bytes)> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, peer: SocketAddr) -> Vec<Bytes> {
        self.sent
            .lock()
            .iter()
            .filter(|(addr, _)| *addr == peer)
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    pub fn responses(&self) -> Vec<(SocketAddr, Bytes)> {
        self.responses.lock().clone()
    }

    pub fn requested(&self) -> Vec<SocketAddr> {
        self.requested.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
        self.responses.lock().clear();
        self.requested.lock().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, peer: SocketAddr, payload: Bytes) -> Result<(), TransportError> {
        self.sent.lock().push((peer, payload));
        Ok(())
    }

    async fn request(
        &self,
        peer: SocketAddr,
        _payload: Bytes,
        _timeout: Duration,
    ) -> Result<Option<Bytes>, TransportError> {
        self.requested.lock().push(peer);
        if self.unresponsive.lock().contains(&peer) {
            return Ok(None);
        }
        Ok(Some(Bytes::new()))
    }

    async fn respond(&self, packet: &InboundPacket, payload: Bytes) -> Result<(), TransportError> {
        if packet.correlation.is_none() {
            return Err(TransportError::NotARequest);
        }
        self.responses.lock().push((packet.peer, payload));
        Ok(())
    }
}
