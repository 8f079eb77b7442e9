//! Broadcast scheduler
//!
//! Every tick drains the pending queue, pushes one batch per channel to
//! the users viewing it, then heartbeats online users that have gone quiet.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use huddle_core::ChannelMessage;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::presence::{PresenceTracker, StaleUser};
use crate::protocol::{
    request_packet, response_packet, Empty, MessageBatch, MessageRow, RequestType, Status,
};
use crate::server::SharedState;
use crate::transport::{SharedTransport, MAX_FRAGMENT_PAYLOAD};

/// Response header plus the message count
const PUSH_OVERHEAD: usize = 12;

/// Encoded size a push aims to stay under, so it fits one datagram
pub const MAX_PUSH_BYTES: usize = MAX_FRAGMENT_PAYLOAD;

/// Shortest tick the run loop will use; `interval` rejects zero
const MIN_TICK: Duration = Duration::from_millis(1);

/// Scheduler timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Interval between ticks
    pub tick: Duration,
    /// Online users silent for this long get a heartbeat
    pub heartbeat_stale_after: Duration,
    /// How long a heartbeat waits for its answer
    pub heartbeat_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&huddle_common::BroadcastConfig::default())
    }
}

impl From<&huddle_common::BroadcastConfig> for SchedulerConfig {
    fn from(config: &huddle_common::BroadcastConfig) -> Self {
        Self {
            tick: config.tick(),
            heartbeat_stale_after: config.heartbeat_stale_after(),
            heartbeat_timeout: config.heartbeat_timeout(),
        }
    }
}

/// One push for one tick; a busy channel may get several
#[derive(Debug, Clone)]
struct ChannelPush {
    channel_id: u32,
    packet: Bytes,
    recipients: Vec<SocketAddr>,
}

/// What a tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub messages: usize,
    pub channels: usize,
    pub pushes_sent: usize,
    pub heartbeats: usize,
    pub demoted: usize,
}

pub struct BroadcastScheduler {
    server_id: u16,
    state: SharedState,
    transport: SharedTransport,
    config: SchedulerConfig,
}

impl BroadcastScheduler {
    pub fn new(
        server_id: u16,
        state: SharedState,
        transport: SharedTransport,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            server_id,
            state,
            transport,
            config,
        }
    }

    /// Tick until `shutdown` turns true or its sender goes away
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let tick = self.config.tick.max(MIN_TICK);
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            server_id = self.server_id,
            tick_ms = tick.as_millis() as u64,
            "Broadcast scheduler started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let report = self.tick().await;
                    if report.messages > 0 || report.heartbeats > 0 {
                        tracing::trace!(server_id = self.server_id, ?report, "Broadcast tick");
                    }
                }
            }
        }

        tracing::debug!(server_id = self.server_id, "Broadcast scheduler stopped");
    }

    /// Fan out queued messages, then run the heartbeat sweep
    pub async fn tick(&self) -> TickReport {
        let mut report = self.fan_out().await;
        let (heartbeats, demoted) = self.heartbeat_sweep().await;
        report.heartbeats = heartbeats;
        report.demoted = demoted;
        report
    }

    async fn fan_out(&self) -> TickReport {
        // Drain and recipient lookup happen under one lock
        let drained = {
            let mut state = self.state.lock();
            let drained = state.drain_pending();
            let messages = drained.len();
            let groups = group_by_channel(drained);
            let channels = groups.len();
            let mut pushes = Vec::new();
            for (channel_id, batch) in groups {
                let recipients = state.presence.recipients(channel_id);
                for chunk in split_batch(batch, MAX_PUSH_BYTES) {
                    pushes.push(ChannelPush {
                        channel_id,
                        packet: response_packet(
                            RequestType::PeriodicUpdate,
                            Status::Success,
                            &chunk.iter().collect::<MessageBatch>(),
                        ),
                        recipients: recipients.clone(),
                    });
                }
            }
            (messages, channels, pushes)
        };
        let (messages, channels, pushes) = drained;

        let mut report = TickReport {
            messages,
            channels,
            ..TickReport::default()
        };

        for push in pushes {
            for peer in push.recipients {
                match self.transport.send(peer, push.packet.clone()).await {
                    Ok(()) => report.pushes_sent += 1,
                    Err(e) => tracing::warn!(
                        server_id = self.server_id,
                        channel_id = push.channel_id,
                        peer = %peer,
                        error = %e,
                        "Failed to push messages"
                    ),
                }
            }
        }

        report
    }

    /// Heartbeat every stale online user in parallel.
    ///
    /// Returns `(heartbeats sent, users demoted)`.
    async fn heartbeat_sweep(&self) -> (usize, usize) {
        let stale = self
            .state
            .lock()
            .presence
            .stale(self.config.heartbeat_stale_after, Instant::now());
        if stale.is_empty() {
            return (0, 0);
        }

        let online_check = request_packet(RequestType::ClientOnlineCheck, &Empty);
        let checks = stale.iter().map(|user| {
            let online_check = online_check.clone();
            async move {
                let alive = match self
                    .transport
                    .request(user.address, online_check, self.config.heartbeat_timeout)
                    .await
                {
                    Ok(response) => response.is_some(),
                    Err(e) => {
                        tracing::debug!(
                            server_id = self.server_id,
                            user_id = user.id,
                            error = %e,
                            "Heartbeat could not be sent"
                        );
                        false
                    }
                };
                (*user, alive)
            }
        });
        let results = join_all(checks).await;

        let mut demoted = 0;
        let mut state = self.state.lock();
        let now = Instant::now();
        for (user, alive) in results {
            if !unchanged_since(&state.presence, &user) {
                // Heard from them while the heartbeat was out
                continue;
            }
            if alive {
                state.presence.mark_online(user.id, user.address, now);
            } else {
                state.presence.mark_offline(user.id);
                demoted += 1;
                tracing::info!(
                    server_id = self.server_id,
                    user_id = user.id,
                    peer = %user.address,
                    "User went offline"
                );
            }
        }

        (stale.len(), demoted)
    }
}

fn unchanged_since(presence: &PresenceTracker, user: &StaleUser) -> bool {
    presence
        .get(user.id)
        .is_some_and(|current| current.is_online() && current.last_contact == user.last_contact)
}

/// Split one channel's messages into runs whose encoded push stays within
/// `limit` bytes. Order is kept; a message too large on its own goes alone.
pub fn split_batch(batch: Vec<ChannelMessage>, limit: usize) -> Vec<Vec<ChannelMessage>> {
    let mut chunks = Vec::new();
    let mut current: Vec<ChannelMessage> = Vec::new();
    let mut size = PUSH_OVERHEAD;
    for message in batch {
        let len = MessageRow::wire_len(&message.content);
        if !current.is_empty() && size + len > limit {
            chunks.push(std::mem::take(&mut current));
            size = PUSH_OVERHEAD;
        }
        size += len;
        current.push(message);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Group messages by channel. Channels appear in order of their first
/// message; messages keep arrival order within a channel.
pub fn group_by_channel(messages: Vec<ChannelMessage>) -> Vec<(u32, Vec<ChannelMessage>)> {
    let mut groups: Vec<(u32, Vec<ChannelMessage>)> = Vec::new();
    for message in messages {
        match groups.iter_mut().find(|(id, _)| *id == message.channel_id) {
            Some((_, batch)) => batch.push(message),
            None => groups.push((message.channel_id, vec![message])),
        }
    }
    groups
}

impl std::fmt::Debug for BroadcastScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastScheduler")
            .field("server_id", &self.server_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
