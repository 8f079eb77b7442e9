//! # huddle-server
//!
//! Session, presence, and broadcast engine for self-hosted chat servers.
//!
//! Each hosted server listens on one UDP port. Inbound requests go through
//! the [`handlers::RequestDispatcher`]; new messages are queued and pushed
//! to viewers of their channel by the [`broadcast::BroadcastScheduler`].

pub mod broadcast;
pub mod handlers;
pub mod presence;
pub mod protocol;
pub mod server;
pub mod transport;
