//! SQLite implementation of PersistenceGateway

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

use huddle_core::{
    BoundedName, Channel, ChannelFilter, ChannelMessage, DomainError, HostedServerRecord,
    InsertedMessage, MessageFilter, PersistenceGateway, RepoResult, UserFilter, UserRecord,
    UserRole,
};

use crate::mappers::narrow;
use crate::models::{ChannelModel, HostedServerModel, MessageModel, UserModel};

use super::error::{map_constraint_violation, map_db_error};

/// SQLite implementation of PersistenceGateway
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    /// Create a new SqliteGateway over a pool whose schema is already bootstrapped
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    #[instrument(skip(self))]
    async fn select_hosted_servers(
        &self,
        server_id: Option<u16>,
    ) -> RepoResult<Vec<HostedServerRecord>> {
        let rows = sqlx::query_as::<_, HostedServerModel>(
            r"
            SELECT id
            FROM hosted_servers
            WHERE (?1 IS NULL OR id = ?1)
            ORDER BY id
            ",
        )
        .bind(server_id.map(i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(HostedServerRecord::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn select_users(&self, filter: &UserFilter) -> RepoResult<Vec<UserRecord>> {
        let rows = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, server_id, ip_address, username, user_type
            FROM hosted_server_users
            WHERE (?1 IS NULL OR server_id = ?1)
              AND (?2 IS NULL OR user_type = ?2)
              AND (?3 IS NULL OR username = ?3)
              AND (?4 IS NULL OR ip_address = ?4)
            ORDER BY id
            ",
        )
        .bind(filter.server_id.map(i64::from))
        .bind(filter.role.map(UserRole::as_i64))
        .bind(filter.username.as_deref())
        .bind(filter.address.map(|ip| ip.to_string()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(UserRecord::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn select_channels(&self, filter: &ChannelFilter) -> RepoResult<Vec<Channel>> {
        let rows = sqlx::query_as::<_, ChannelModel>(
            r"
            SELECT id, name, hosted_server_id
            FROM server_chat_channels
            WHERE (?1 IS NULL OR id = ?1)
              AND (?2 IS NULL OR name = ?2)
              AND (?3 IS NULL OR hosted_server_id = ?3)
            ORDER BY id
            ",
        )
        .bind(filter.id.map(i64::from))
        .bind(filter.name.as_deref())
        .bind(filter.server_id.map(i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(Channel::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn select_messages(&self, filter: &MessageFilter) -> RepoResult<Vec<ChannelMessage>> {
        let rows = sqlx::query_as::<_, MessageModel>(
            r"
            SELECT id, message, channel_id, sender_id, sender_username, created_at
            FROM channel_messages
            WHERE (?1 IS NULL OR id = ?1)
              AND (?2 IS NULL OR message = ?2)
              AND (?3 IS NULL OR sender_id = ?3)
              AND (?4 IS NULL OR channel_id = ?4)
            ORDER BY id
            ",
        )
        .bind(filter.id.map(i64::from))
        .bind(filter.text.as_deref())
        .bind(filter.sender_id.map(i64::from))
        .bind(filter.channel_id.map(i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(ChannelMessage::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn insert_hosted_server(&self, server_id: u16) -> RepoResult<HostedServerRecord> {
        sqlx::query("INSERT INTO hosted_servers (id) VALUES (?1)")
            .bind(i64::from(server_id))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_constraint_violation(
                    e,
                    || DomainError::ServerAlreadyExists(server_id),
                    || DomainError::InternalError("hosted_servers has no foreign keys".into()),
                )
            })?;

        Ok(HostedServerRecord::new(server_id))
    }

    #[instrument(skip(self, username), fields(username = %username))]
    async fn insert_user(
        &self,
        server_id: u16,
        address: IpAddr,
        username: &BoundedName,
    ) -> RepoResult<UserRecord> {
        let result = sqlx::query(
            r"
            INSERT INTO hosted_server_users (server_id, ip_address, username, user_type)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(i64::from(server_id))
        .bind(address.to_string())
        .bind(username.as_str())
        .bind(UserRole::Member.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_constraint_violation(
                e,
                || DomainError::AlreadyJoined(address),
                || DomainError::ServerNotFound(server_id),
            )
        })?;

        let id = narrow(result.last_insert_rowid(), "hosted_server_users.id")?;
        Ok(UserRecord::new(id, server_id, username.clone(), address))
    }

    #[instrument(skip(self, name), fields(name = %name))]
    async fn insert_channel(&self, name: &BoundedName, server_id: u16) -> RepoResult<Channel> {
        let result =
            sqlx::query("INSERT INTO server_chat_channels (name, hosted_server_id) VALUES (?1, ?2)")
                .bind(name.as_str())
                .bind(i64::from(server_id))
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    map_constraint_violation(
                        e,
                        || DomainError::ValidationError(format!("duplicate channel '{name}'")),
                        || DomainError::ServerNotFound(server_id),
                    )
                })?;

        let id = narrow(result.last_insert_rowid(), "server_chat_channels.id")?;
        Ok(Channel::new(id, name.clone(), server_id))
    }

    #[instrument(skip(self, text), fields(len = text.len()))]
    async fn insert_message(
        &self,
        text: &str,
        channel_id: u32,
        sender_id: u32,
    ) -> RepoResult<InsertedMessage> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let sender: Option<(String,)> =
            sqlx::query_as("SELECT username FROM hosted_server_users WHERE id = ?1")
                .bind(i64::from(sender_id))
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_error)?;
        let sender_username = match sender {
            Some((username,)) => BoundedName::new(username)?,
            None => return Err(DomainError::UserNotFound(sender_id.to_string())),
        };

        let result = sqlx::query(
            r"
            INSERT INTO channel_messages (message, channel_id, sender_id, sender_username, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(text)
        .bind(i64::from(channel_id))
        .bind(i64::from(sender_id))
        .bind(sender_username.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_constraint_violation(
                e,
                || DomainError::InternalError("channel_messages has no unique keys".into()),
                || DomainError::ChannelNotFound(channel_id),
            )
        })?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(InsertedMessage {
            id: narrow(result.last_insert_rowid(), "channel_messages.id")?,
            sender_username,
        })
    }

    #[instrument(skip(self))]
    async fn update_user_role(
        &self,
        server_id: u16,
        username: &str,
        role: UserRole,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE hosted_server_users
            SET user_type = ?1
            WHERE server_id = ?2 AND username = ?3
            ",
        )
        .bind(role.as_i64())
        .bind(i64::from(server_id))
        .bind(username)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
