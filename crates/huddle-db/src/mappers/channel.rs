//! Channel entity <-> model mapper

use huddle_core::{BoundedName, Channel, DomainError};

use super::narrow;
use crate::models::ChannelModel;

impl TryFrom<ChannelModel> for Channel {
    type Error = DomainError;

    fn try_from(model: ChannelModel) -> Result<Self, Self::Error> {
        Ok(Channel::new(
            narrow(model.id, "server_chat_channels.id")?,
            BoundedName::new(model.name)?,
            narrow(model.hosted_server_id, "server_chat_channels.hosted_server_id")?,
        ))
    }
}
