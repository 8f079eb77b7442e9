//! Database models - SQLx-compatible structs for SQLite tables

mod channel;
mod hosted_server;
mod message;
mod user;

pub use channel::ChannelModel;
pub use hosted_server::HostedServerModel;
pub use message::MessageModel;
pub use user::UserModel;
