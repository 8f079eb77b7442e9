//! Message database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for channel_messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: i64,
    pub message: String,
    pub channel_id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub created_at: DateTime<Utc>,
}
