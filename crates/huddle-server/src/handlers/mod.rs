//! Request handlers
//!
//! One handler per client request type, registered with the
//! [`RequestDispatcher`] by type.

mod channel_data;
mod channels;
mod context;
mod dispatcher;
mod error;
mod join;
mod joined_data;
mod send_message;

pub use channel_data::ChannelDataHandler;
pub use channels::{AdminMenuHandler, CreateChannelHandler, ServerInformationHandler};
pub use context::{HandlerContext, Reply, Request, RequestHandler};
pub use dispatcher::RequestDispatcher;
pub use error::{HandlerError, HandlerResult};
pub use join::JoinServerHandler;
pub use joined_data::JoinedServerDataHandler;
pub use send_message::SendMessageHandler;
