//! Hosted server database model

use sqlx::FromRow;

/// Database model for hosted_servers table
#[derive(Debug, Clone, FromRow)]
pub struct HostedServerModel {
    pub id: i64,
}
