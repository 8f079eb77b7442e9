//! Test helpers for integration tests
//!
//! Provides a hosted server backed by the in-memory store and a UDP client
//! that frames requests the way real clients do.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket as StdUdpSocket};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use huddle_core::{BoundedName, PersistenceGateway, UserFilter};
use huddle_db::MemoryGateway;
use huddle_server::broadcast::SchedulerConfig;
use huddle_server::protocol::{
    decode_response, request_packet, ChannelList, CreateNewChannelRequest, Decode, Empty, Encode,
    JoinServerRequest, JoinedServerData, LoadChannelDataRequest, MessageBatch, RequestType,
    ResponseInfo, SendMessageRequest, Status,
};
use huddle_server::server::{HostedServer, ServerSettings};
use huddle_server::transport::{Frame, FrameKind, Reassembler, MAX_DATAGRAM};
use tokio::net::UdpSocket;
use tokio::time::Instant;

/// Last octet for the next client address; each client gets its own
/// 127.0.0.x so the one-user-per-IP rule does not collide
static CLIENT_COUNTER: AtomicU8 = AtomicU8::new(2);

/// How long to wait for a response that should arrive
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait before concluding nothing will arrive
pub const SILENCE: Duration = Duration::from_millis(300);

/// A UDP port that is free right now
pub fn get_test_port() -> u16 {
    StdUdpSocket::bind((Ipv4Addr::LOCALHOST, 0))
        .and_then(|socket| socket.local_addr())
        .map(|addr| addr.port())
        .unwrap_or(0)
}

/// Fast timings so broadcast and heartbeat behavior shows up quickly
pub fn fast_scheduler() -> SchedulerConfig {
    SchedulerConfig {
        tick: Duration::from_millis(20),
        heartbeat_stale_after: Duration::from_secs(60),
        heartbeat_timeout: Duration::from_millis(200),
    }
}

/// A running hosted server backed by the in-memory store
pub struct TestServer {
    pub server: Arc<HostedServer>,
    pub gateway: Arc<MemoryGateway>,
}

impl TestServer {
    /// Start a new test server
    pub async fn start() -> Result<Self> {
        Self::start_with_scheduler(fast_scheduler()).await
    }

    /// Start a test server with custom scheduler timings
    pub async fn start_with_scheduler(scheduler: SchedulerConfig) -> Result<Self> {
        let id = get_test_port();
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_hosted_server(id).await?;

        let settings = ServerSettings {
            bind_host: Ipv4Addr::LOCALHOST.into(),
            scheduler,
        };
        let server = Arc::new(HostedServer::new(id, gateway.clone(), settings));
        server.start().await?;

        Ok(Self { server, gateway })
    }

    pub fn addr(&self) -> SocketAddr {
        self.server.address()
    }

    /// Connect a client from a fresh loopback address
    pub async fn client(&self) -> Result<TestClient> {
        TestClient::connect(self.addr()).await
    }

    /// Insert a channel directly into the store
    pub async fn channel(&self, name: &str) -> Result<u32> {
        let channel = self
            .gateway
            .insert_channel(&BoundedName::new(name)?, self.server.id())
            .await?;
        Ok(channel.id)
    }

    /// Store `count` messages of `len` bytes from a joined user
    pub async fn seed_history(
        &self,
        channel_id: u32,
        username: &str,
        count: usize,
        len: usize,
    ) -> Result<()> {
        let sender = self
            .gateway
            .select_users(&UserFilter::server(self.server.id()))
            .await?
            .into_iter()
            .find(|user| user.username.as_str() == username)
            .with_context(|| format!("{username} has not joined"))?;
        let text = "x".repeat(len);
        for _ in 0..count {
            self.gateway
                .insert_message(&text, channel_id, sender.id)
                .await?;
        }
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.server.stop().await?;
        Ok(())
    }
}

/// Client side of the wire protocol
pub struct TestClient {
    socket: UdpSocket,
    server: SocketAddr,
    next_correlation: u32,
    /// Pushes that arrived while waiting for something else
    pushes: VecDeque<Bytes>,
    reassembler: Reassembler,
    /// Whether heartbeat requests get answered
    pub answer_heartbeats: bool,
}

impl TestClient {
    pub async fn connect(server: SocketAddr) -> Result<Self> {
        let octet = CLIENT_COUNTER.fetch_add(1, Ordering::SeqCst);
        let socket = UdpSocket::bind((Ipv4Addr::new(127, 0, 0, octet), 0))
            .await
            .with_context(|| format!("binding client on 127.0.0.{octet}"))?;
        Ok(Self {
            socket,
            server,
            next_correlation: 1,
            pushes: VecDeque::new(),
            reassembler: Reassembler::new(Duration::from_secs(5)),
            answer_heartbeats: true,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    async fn send_request<P: Encode>(
        &mut self,
        request_type: RequestType,
        payload: &P,
    ) -> Result<u32> {
        let correlation = self.next_correlation;
        self.next_correlation += 1;
        let frame = Frame::new(
            FrameKind::Request,
            correlation,
            request_packet(request_type, payload),
        );
        self.socket.send_to(&frame.encode(), self.server).await?;
        Ok(correlation)
    }

    /// Send raw bytes as a request frame
    pub async fn send_raw(&mut self, payload: Bytes) -> Result<()> {
        let frame = Frame::new(FrameKind::Request, 0, payload);
        self.socket.send_to(&frame.encode(), self.server).await?;
        Ok(())
    }

    /// Receive one whole frame, answering heartbeats and stashing pushes.
    /// Returns response frames only.
    async fn recv_frame(&mut self, deadline: Instant) -> Result<Option<Frame>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let received =
                tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await;
            let (len, peer) = match received {
                Ok(result) => result?,
                Err(_) => return Ok(None),
            };
            let frame = Frame::decode(&buf[..len])?;
            let Some(frame) = self.reassembler.accept(peer, frame, Instant::now()) else {
                continue;
            };
            match frame.kind {
                FrameKind::Response => return Ok(Some(frame)),
                FrameKind::Message => self.pushes.push_back(frame.payload),
                FrameKind::Request => {
                    if self.answer_heartbeats {
                        let reply =
                            Frame::new(FrameKind::Response, frame.correlation, Bytes::new());
                        self.socket.send_to(&reply.encode(), self.server).await?;
                    }
                }
            }
        }
    }

    /// Send a request and wait for its response
    pub async fn request<P: Encode>(
        &mut self,
        request_type: RequestType,
        payload: &P,
    ) -> Result<Option<Bytes>> {
        let correlation = self.send_request(request_type, payload).await?;
        self.wait_response(correlation, RESPONSE_TIMEOUT).await
    }

    async fn wait_response(&mut self, correlation: u32, wait: Duration) -> Result<Option<Bytes>> {
        let deadline = Instant::now() + wait;
        while let Some(frame) = self.recv_frame(deadline).await? {
            if frame.correlation == correlation {
                return Ok(Some(frame.payload));
            }
        }
        Ok(None)
    }

    /// Send a request that should never be answered; errors if it is
    pub async fn request_expecting_silence<P: Encode>(
        &mut self,
        request_type: RequestType,
        payload: &P,
    ) -> Result<()> {
        let correlation = self.send_request(request_type, payload).await?;
        if self.wait_response(correlation, SILENCE).await?.is_some() {
            bail!("{request_type} was answered");
        }
        Ok(())
    }

    /// Answer heartbeats and collect pushes for `duration`
    pub async fn pump(&mut self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        while self.recv_frame(deadline).await?.is_some() {}
        Ok(())
    }

    /// Next push, waiting up to `wait`
    pub async fn next_push(&mut self, wait: Duration) -> Result<Option<MessageBatch>> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(bytes) = self.pushes.pop_front() {
                let (info, batch) = decode_response::<MessageBatch>(&bytes)?;
                if info.request_type != RequestType::PeriodicUpdate {
                    bail!("unexpected push type {}", info.request_type);
                }
                return Ok(Some(batch));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            // Responses arriving here are stale; drop them
            let _ = self.recv_frame(deadline).await?;
        }
    }

    // ------------------------------------------------------------------
    // Typed requests
    // ------------------------------------------------------------------

    pub async fn join(&mut self, username: &str) -> Result<Status> {
        let request = JoinServerRequest {
            username: BoundedName::new(username)?,
        };
        let response = self
            .request(RequestType::JoinServer, &request)
            .await?
            .context("join was not answered")?;
        Ok(header(&response)?.status)
    }

    pub async fn load_channel(&mut self, channel_id: u32) -> Result<Option<MessageBatch>> {
        let Some(response) = self
            .request(RequestType::LoadChannelData, &LoadChannelDataRequest { channel_id })
            .await?
        else {
            return Ok(None);
        };
        let (info, batch) = decode_response::<MessageBatch>(&response)?;
        if info.status != Status::Success {
            bail!("channel load failed");
        }
        Ok(Some(batch))
    }

    /// Send a message; the server never answers these
    pub async fn send_message(&mut self, channel_id: u32, text: &str) -> Result<()> {
        self.send_request(
            RequestType::SendMessage,
            &SendMessageRequest {
                channel_id,
                text: text.to_string(),
            },
        )
        .await?;
        Ok(())
    }

    pub async fn channels(&mut self, request_type: RequestType) -> Result<ChannelList> {
        let response = self
            .request(request_type, &Empty)
            .await?
            .context("channel list was not answered")?;
        Ok(decode_response::<ChannelList>(&response)?.1)
    }

    pub async fn create_channel(&mut self, name: &str) -> Result<Status> {
        let request = CreateNewChannelRequest {
            name: BoundedName::new(name)?,
        };
        let response = self
            .request(RequestType::CreateNewChannel, &request)
            .await?
            .context("channel creation was not answered")?;
        Ok(header(&response)?.status)
    }

    pub async fn joined_server_data(&mut self) -> Result<Option<JoinedServerData>> {
        let Some(response) = self
            .request(RequestType::LoadJoinedServerData, &Empty)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(decode_response::<JoinedServerData>(&response)?.1))
    }
}

fn header(response: &[u8]) -> Result<ResponseInfo> {
    Ok(ResponseInfo::from_bytes(response)?)
}
