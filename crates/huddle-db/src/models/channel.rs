//! Channel database model

use sqlx::FromRow;

/// Database model for server_chat_channels table
#[derive(Debug, Clone, FromRow)]
pub struct ChannelModel {
    pub id: i64,
    pub name: String,
    pub hosted_server_id: i64,
}
