//! Handler error types

use std::net::SocketAddr;

use huddle_core::DomainError;
use thiserror::Error;

use crate::protocol::CodecError;
use crate::transport::TransportError;

/// Handler error type.
///
/// None of these reach the peer; the dispatcher logs and drops them.
/// Failures a peer should hear about are answered with `Status::Fail`.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Short or malformed payload
    #[error("Malformed payload: {0}")]
    Truncated(#[from] CodecError),

    /// Request needs a joined user and none is known at this address
    #[error("No joined user at {0}")]
    UnknownUser(SocketAddr),

    #[error("User {user_id} is offline")]
    UserOffline { user_id: u32 },

    /// Channel id unknown or owned by another hosted server
    #[error("Channel {channel_id} does not belong to server {server_id}")]
    ForeignChannel { channel_id: u32, server_id: u16 },

    /// Store error on a request that has no response to carry it
    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] DomainError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl HandlerError {
    /// Dropped requests the peer caused, as opposed to local failures
    pub fn is_peer_error(&self) -> bool {
        matches!(
            self,
            Self::Truncated(_)
                | Self::UnknownUser(_)
                | Self::UserOffline { .. }
                | Self::ForeignChannel { .. }
        )
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
