//! Message entity <-> model mapper

use huddle_core::{BoundedName, ChannelMessage, DomainError};

use super::narrow;
use crate::models::MessageModel;

impl TryFrom<MessageModel> for ChannelMessage {
    type Error = DomainError;

    fn try_from(model: MessageModel) -> Result<Self, Self::Error> {
        Ok(ChannelMessage::new(
            narrow(model.id, "channel_messages.id")?,
            narrow(model.channel_id, "channel_messages.channel_id")?,
            narrow(model.sender_id, "channel_messages.sender_id")?,
            BoundedName::new(model.sender_username)?,
            model.message,
        ))
    }
}
