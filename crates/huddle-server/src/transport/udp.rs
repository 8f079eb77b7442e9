//! UDP transport
//!
//! One socket per hosted server. The receive loop reassembles fragments,
//! routes `Response` frames to the task waiting on them and pushes
//! everything else into a bounded channel. It never waits on that channel,
//! so heartbeat responses keep flowing while the dispatcher is busy.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::frame::{Frame, FrameKind, MAX_DATAGRAM};
use super::reassembly::Reassembler;
use super::{InboundPacket, Transport, TransportError};

/// Inbound packets buffered before new ones are dropped
const INBOUND_CAPACITY: usize = 1024;

/// How long the fragments of one payload may take to arrive
const REASSEMBLY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    /// Server-initiated requests waiting for a response, by correlation id
    pending: DashMap<u32, oneshot::Sender<Bytes>>,
    next_correlation: AtomicU32,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
    recv_task: Mutex<Option<JoinHandle<()>>>,
}

impl UdpTransport {
    /// Bind `addr` and start the receive loop
    pub async fn listen(
        addr: SocketAddr,
    ) -> Result<(Arc<Self>, mpsc::Receiver<InboundPacket>), TransportError> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let transport = Arc::new(Self {
            socket,
            local_addr,
            pending: DashMap::new(),
            next_correlation: AtomicU32::new(1),
            closed: AtomicBool::new(false),
            shutdown,
            recv_task: Mutex::new(None),
        });

        let handle = tokio::spawn(Arc::clone(&transport).receive_loop(inbound_tx, shutdown_rx));
        *transport.recv_task.lock() = Some(handle);

        debug!(addr = %local_addr, "UDP transport listening");
        Ok((transport, inbound_rx))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop receiving and fail every outstanding request.
    ///
    /// The inbound channel closes once the receive loop exits.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.send(true);
        // Dropping the senders wakes every waiter with "no response"
        self.pending.clear();

        let handle = self.recv_task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(addr = %self.local_addr, error = %e, "UDP receive loop panicked");
            }
        }
        debug!(addr = %self.local_addr, "UDP transport closed");
    }

    async fn receive_loop(
        self: Arc<Self>,
        inbound: mpsc::Sender<InboundPacket>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let mut reassembler = Reassembler::new(REASSEMBLY_TIMEOUT);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                result = self.socket.recv_from(&mut buf) => match result {
                    Ok((len, peer)) => self.route(&buf[..len], peer, &inbound, &mut reassembler),
                    Err(e) => {
                        // ICMP errors from earlier sends surface here; the socket stays usable
                        debug!(addr = %self.local_addr, error = %e, "UDP receive error");
                    }
                },
            }
        }

        trace!(addr = %self.local_addr, "UDP receive loop ended");
    }

    fn route(
        &self,
        datagram: &[u8],
        peer: SocketAddr,
        inbound: &mpsc::Sender<InboundPacket>,
        reassembler: &mut Reassembler,
    ) {
        let frame = match Frame::decode(datagram) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(peer = %peer, error = %e, "Dropping datagram");
                return;
            }
        };
        let Some(frame) = reassembler.accept(peer, frame, tokio::time::Instant::now()) else {
            // Waiting on more fragments
            return;
        };

        let correlation = match frame.kind {
            FrameKind::Response => {
                match self.pending.remove(&frame.correlation) {
                    Some((_, waiter)) => {
                        let _ = waiter.send(frame.payload);
                    }
                    None => trace!(
                        peer = %peer,
                        correlation = frame.correlation,
                        "Late or unsolicited response"
                    ),
                }
                return;
            }
            FrameKind::Request => Some(frame.correlation),
            FrameKind::Message => None,
        };

        let packet = InboundPacket {
            peer,
            correlation,
            payload: frame.payload,
        };
        if let Err(e) = inbound.try_send(packet) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!(peer = %peer, "Inbound queue full, dropping packet");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    trace!(peer = %peer, "Inbound queue closed, dropping packet");
                }
            }
        }
    }

    fn next_correlation(&self) -> u32 {
        self.next_correlation.fetch_add(1, Ordering::Relaxed)
    }

    /// Send `payload`, fragmented if it does not fit one datagram
    async fn send_payload(
        &self,
        peer: SocketAddr,
        kind: FrameKind,
        correlation: u32,
        payload: Bytes,
    ) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let frames = Frame::split(kind, correlation, payload)?;
        if frames.len() == 1 {
            self.socket.send_to(&frames[0].encode(), peer).await?;
            return Ok(());
        }

        trace!(peer = %peer, correlation, fragments = frames.len(), "Sending fragmented payload");
        for frame in frames {
            self.socket.send_to(&frame.encode(), peer).await?;
            // Pace fragments so a busy receiver's socket buffer can drain
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, peer: SocketAddr, payload: Bytes) -> Result<(), TransportError> {
        // Messages get their own id so their fragments can be told apart
        self.send_payload(peer, FrameKind::Message, self.next_correlation(), payload)
            .await
    }

    async fn request(
        &self,
        peer: SocketAddr,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Option<Bytes>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let correlation = self.next_correlation();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(correlation, tx);

        if let Err(e) = self
            .send_payload(peer, FrameKind::Request, correlation, payload)
            .await
        {
            self.pending.remove(&correlation);
            return Err(e);
        }

        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(bytes)) => Some(bytes),
            // Sender dropped by close(), or the deadline passed
            Ok(Err(_)) | Err(_) => None,
        };
        self.pending.remove(&correlation);
        Ok(response)
    }

    async fn respond(&self, packet: &InboundPacket, payload: Bytes) -> Result<(), TransportError> {
        let correlation = packet.correlation.ok_or(TransportError::NotARequest)?;
        self.send_payload(packet.peer, FrameKind::Response, correlation, payload)
            .await
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.local_addr)
            .field("pending", &self.pending.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MAX_FRAGMENT_PAYLOAD;
    use std::net::Ipv4Addr;

    fn loopback() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    #[tokio::test]
    async fn test_request_response_round_trip() {
        let (server, _server_rx) = UdpTransport::listen(loopback()).await.unwrap();
        let (client, mut client_rx) = UdpTransport::listen(loopback()).await.unwrap();

        // Echo every request the client receives
        let responder = Arc::clone(&client);
        tokio::spawn(async move {
            while let Some(packet) = client_rx.recv().await {
                let reply = packet.payload.clone();
                responder.respond(&packet, reply).await.unwrap();
            }
        });

        let response = server
            .request(
                client.local_addr(),
                Bytes::from_static(b"ping"),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(response.as_deref(), Some(&b"ping"[..]));
        assert!(server.pending.is_empty());
    }

    #[tokio::test]
    async fn test_request_times_out_without_response() {
        let (server, _server_rx) = UdpTransport::listen(loopback()).await.unwrap();
        let (silent, _silent_rx) = UdpTransport::listen(loopback()).await.unwrap();

        let response = server
            .request(
                silent.local_addr(),
                Bytes::from_static(b"anyone?"),
                Duration::from_millis(100),
            )
            .await
            .unwrap();
        assert!(response.is_none());
        assert!(server.pending.is_empty());
    }

    #[tokio::test]
    async fn test_messages_reach_the_inbound_channel() {
        let (server, mut server_rx) = UdpTransport::listen(loopback()).await.unwrap();
        let (client, _client_rx) = UdpTransport::listen(loopback()).await.unwrap();

        client
            .send(server.local_addr(), Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let packet = tokio::time::timeout(Duration::from_secs(2), server_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(packet.peer, client.local_addr());
        assert!(!packet.expects_response());
        assert_eq!(&packet.payload[..], b"hello");

        assert!(matches!(
            server.respond(&packet, Bytes::new()).await,
            Err(TransportError::NotARequest)
        ));
    }

    #[tokio::test]
    async fn test_close_ends_inbound_stream_and_rejects_sends() {
        let (server, mut server_rx) = UdpTransport::listen(loopback()).await.unwrap();
        server.close().await;

        assert!(server_rx.recv().await.is_none());
        assert!(matches!(
            server.send(loopback(), Bytes::new()).await,
            Err(TransportError::Closed)
        ));
        // Second close is a no-op
        server.close().await;
    }

    #[tokio::test]
    async fn test_large_response_arrives_in_fragments() {
        let (server, mut server_rx) = UdpTransport::listen(loopback()).await.unwrap();
        let (client, _client_rx) = UdpTransport::listen(loopback()).await.unwrap();

        let big = Bytes::from(
            (0..MAX_DATAGRAM + MAX_FRAGMENT_PAYLOAD)
                .map(|i| (i % 253) as u8)
                .collect::<Vec<u8>>(),
        );
        let expected = big.clone();
        let responder = Arc::clone(&server);
        tokio::spawn(async move {
            if let Some(packet) = server_rx.recv().await {
                responder.respond(&packet, big).await.unwrap();
            }
        });

        let response = client
            .request(
                server.local_addr(),
                Bytes::from_static(b"history please"),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(response, Some(expected));
    }

    #[tokio::test]
    async fn test_large_message_is_reassembled() {
        let (server, mut server_rx) = UdpTransport::listen(loopback()).await.unwrap();
        let (client, _client_rx) = UdpTransport::listen(loopback()).await.unwrap();

        let big = Bytes::from(vec![42u8; MAX_DATAGRAM + 1]);
        client.send(server.local_addr(), big.clone()).await.unwrap();

        let packet = tokio::time::timeout(Duration::from_secs(2), server_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!packet.expects_response());
        assert_eq!(packet.payload, big);
    }
}
