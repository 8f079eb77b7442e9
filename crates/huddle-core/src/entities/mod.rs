//! Domain entities - core business objects

mod channel;
mod hosted_server;
mod message;
mod user;

pub use channel::Channel;
pub use hosted_server::HostedServerRecord;
pub use message::{ChannelMessage, InsertedMessage};
pub use user::UserRecord;
