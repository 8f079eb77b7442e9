//! Shared handler plumbing

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use huddle_core::{ChannelFilter, SharedGateway};

use super::{HandlerError, HandlerResult};
use crate::presence::ServerUser;
use crate::protocol::{CodecError, Decode, RequestType};
use crate::server::SharedState;

/// Dependencies every handler gets
#[derive(Clone)]
pub struct HandlerContext {
    pub server_id: u16,
    pub gateway: SharedGateway,
    pub state: SharedState,
}

impl HandlerContext {
    pub fn new(server_id: u16, gateway: SharedGateway, state: SharedState) -> Self {
        Self {
            server_id,
            gateway,
            state,
        }
    }

    /// Snapshot of the user behind `peer`, if any
    pub fn find_user(&self, peer: SocketAddr) -> Option<ServerUser> {
        self.state.lock().presence.find_by_address(peer).cloned()
    }

    /// Fails unless `channel_id` names a channel of this hosted server
    pub async fn require_channel(&self, channel_id: u32) -> HandlerResult<()> {
        let filter = ChannelFilter {
            id: Some(channel_id),
            server_id: Some(self.server_id),
            ..ChannelFilter::default()
        };
        if self.gateway.select_channels(&filter).await?.is_empty() {
            return Err(HandlerError::ForeignChannel {
                channel_id,
                server_id: self.server_id,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("server_id", &self.server_id)
            .finish_non_exhaustive()
    }
}

/// A decoded request header with its undecoded payload
#[derive(Debug, Clone)]
pub struct Request {
    pub peer: SocketAddr,
    pub request_type: RequestType,
    /// Bytes following `RequestInfo`
    pub payload: Bytes,
}

impl Request {
    pub fn decode_payload<P: Decode>(&self) -> Result<P, CodecError> {
        P::from_bytes(&self.payload)
    }
}

/// What the dispatcher should send back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Respond(Bytes),
    /// No response at all
    Silent,
}

/// One request type's behavior
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, ctx: &HandlerContext, request: &Request) -> HandlerResult<Reply>;
}
