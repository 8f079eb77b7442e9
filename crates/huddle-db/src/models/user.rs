//! User database model

use sqlx::FromRow;

/// Database model for hosted_server_users table
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: i64,
    pub server_id: i64,
    /// IP only, stored in its textual form
    pub ip_address: String,
    pub username: String,
    /// 0 = member, 1 = admin
    pub user_type: i64,
}
