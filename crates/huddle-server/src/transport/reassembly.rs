//! Fragment reassembly
//!
//! Collects fragments per `(peer, kind, correlation)` until every one has
//! arrived. Partial payloads that stall are discarded after a timeout.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;

use super::frame::{Frame, FrameKind};

/// Partial payloads kept at once; fragments of new ones are dropped beyond this
const MAX_PARTIALS: usize = 256;

type PartialKey = (SocketAddr, FrameKind, u32);

#[derive(Debug)]
struct Partial {
    parts: Vec<Option<Bytes>>,
    received: usize,
    started: Instant,
}

#[derive(Debug)]
pub struct Reassembler {
    partials: HashMap<PartialKey, Partial>,
    timeout: Duration,
}

impl Reassembler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            partials: HashMap::new(),
            timeout,
        }
    }

    /// Feed one frame. Returns the whole frame once its last fragment
    /// arrives; unsplit frames come straight back.
    pub fn accept(&mut self, peer: SocketAddr, frame: Frame, now: Instant) -> Option<Frame> {
        if !frame.is_fragment() {
            return Some(frame);
        }
        if frame.fragment >= frame.fragments {
            return None;
        }

        let timeout = self.timeout;
        self.partials
            .retain(|_, partial| now.saturating_duration_since(partial.started) < timeout);

        let key = (peer, frame.kind, frame.correlation);
        let count = usize::from(frame.fragments);
        if !self.partials.contains_key(&key) && self.partials.len() >= MAX_PARTIALS {
            tracing::debug!(peer = %peer, "Too many partial payloads, dropping fragment");
            return None;
        }
        let partial = self.partials.entry(key).or_insert_with(|| Partial {
            parts: vec![None; count],
            received: 0,
            started: now,
        });
        if partial.parts.len() != count {
            // Correlation reused with a different shape; start over
            *partial = Partial {
                parts: vec![None; count],
                received: 0,
                started: now,
            };
        }

        let slot = &mut partial.parts[usize::from(frame.fragment)];
        if slot.is_none() {
            *slot = Some(frame.payload);
            partial.received += 1;
        }
        if partial.received < count {
            return None;
        }

        let partial = self.partials.remove(&key)?;
        let mut payload = BytesMut::new();
        for part in partial.parts.into_iter().flatten() {
            payload.extend_from_slice(&part);
        }
        Some(Frame::new(frame.kind, frame.correlation, payload.freeze()))
    }

    pub fn pending(&self) -> usize {
        self.partials.len()
    }
}
