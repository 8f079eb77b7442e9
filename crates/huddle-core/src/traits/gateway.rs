//! Persistence gateway trait (port) - the record-oriented store the engine consumes
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Every select takes a filter whose unset
//! fields match everything.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entities::{Channel, ChannelMessage, HostedServerRecord, InsertedMessage, UserRecord};
use crate::error::DomainError;
use crate::value_objects::{BoundedName, UserRole};

/// Result type for gateway operations
pub type RepoResult<T> = Result<T, DomainError>;

/// Shared handle to a gateway implementation
pub type SharedGateway = Arc<dyn PersistenceGateway>;

// ============================================================================
// Filters
// ============================================================================

/// Filter for user selects
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub server_id: Option<u16>,
    pub role: Option<UserRole>,
    pub username: Option<String>,
    /// Matched on IP only; ports are never persisted
    pub address: Option<IpAddr>,
}

impl UserFilter {
    /// Every user of one hosted server
    pub fn server(server_id: u16) -> Self {
        Self {
            server_id: Some(server_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Check whether a record passes this filter
    pub fn matches(&self, user: &UserRecord) -> bool {
        self.server_id.map_or(true, |id| user.server_id == id)
            && self.role.map_or(true, |role| user.role == role)
            && self
                .username
                .as_deref()
                .map_or(true, |name| user.username.as_str() == name)
            && self.address.map_or(true, |ip| user.ip_address == ip)
    }
}

/// Filter for channel selects
#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
    pub id: Option<u32>,
    pub name: Option<String>,
    pub server_id: Option<u16>,
}

impl ChannelFilter {
    /// Every channel of one hosted server
    pub fn server(server_id: u16) -> Self {
        Self {
            server_id: Some(server_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, channel: &Channel) -> bool {
        self.id.map_or(true, |id| channel.id == id)
            && self
                .name
                .as_deref()
                .map_or(true, |name| channel.name.as_str() == name)
            && self
                .server_id
                .map_or(true, |id| channel.hosted_server_id == id)
    }
}

/// Filter for message selects
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub id: Option<u32>,
    pub text: Option<String>,
    pub sender_id: Option<u32>,
    pub channel_id: Option<u32>,
}

impl MessageFilter {
    /// Full history of one channel
    pub fn channel(channel_id: u32) -> Self {
        Self {
            channel_id: Some(channel_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, message: &ChannelMessage) -> bool {
        self.id.map_or(true, |id| message.id == id)
            && self
                .text
                .as_deref()
                .map_or(true, |text| message.content == text)
            && self.sender_id.map_or(true, |id| message.sender_id == id)
            && self.channel_id.map_or(true, |id| message.channel_id == id)
    }
}

// ============================================================================
// Persistence Gateway
// ============================================================================

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// List hosted servers, optionally a single one
    async fn select_hosted_servers(
        &self,
        server_id: Option<u16>,
    ) -> RepoResult<Vec<HostedServerRecord>>;

    /// List users matching a filter
    async fn select_users(&self, filter: &UserFilter) -> RepoResult<Vec<UserRecord>>;

    /// List channels matching a filter, ordered by id
    async fn select_channels(&self, filter: &ChannelFilter) -> RepoResult<Vec<Channel>>;

    /// List messages matching a filter, ordered by id (history order)
    async fn select_messages(&self, filter: &MessageFilter) -> RepoResult<Vec<ChannelMessage>>;

    /// Register a hosted server
    async fn insert_hosted_server(&self, server_id: u16) -> RepoResult<HostedServerRecord>;

    /// Register a user on a hosted server as a Member
    async fn insert_user(
        &self,
        server_id: u16,
        address: IpAddr,
        username: &BoundedName,
    ) -> RepoResult<UserRecord>;

    /// Create a channel on a hosted server
    async fn insert_channel(&self, name: &BoundedName, server_id: u16) -> RepoResult<Channel>;

    /// Store a message, capturing the sender's current username
    async fn insert_message(
        &self,
        text: &str,
        channel_id: u32,
        sender_id: u32,
    ) -> RepoResult<InsertedMessage>;

    /// Change the role of a user by username. Returns whether a matching user exists.
    async fn update_user_role(
        &self,
        server_id: u16,
        username: &str,
        role: UserRole,
    ) -> RepoResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn user(server_id: u16, name: &str, last_octet: u8) -> UserRecord {
        UserRecord::new(
            1,
            server_id,
            BoundedName::new(name).unwrap(),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet)),
        )
    }

    #[test]
    fn test_user_filter_defaults_match_everything() {
        assert!(UserFilter::default().matches(&user(1, "alice", 2)));
    }

    #[test]
    fn test_user_filter_combines_fields() {
        let filter = UserFilter::server(1)
            .with_role(UserRole::Member)
            .with_address(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));

        assert!(filter.matches(&user(1, "alice", 2)));
        assert!(!filter.matches(&user(2, "alice", 2)));
        assert!(!filter.matches(&user(1, "alice", 3)));
        assert!(!filter.matches(&user(1, "alice", 2).with_role(UserRole::Admin)));
    }

    #[test]
    fn test_channel_and_message_filters() {
        let channel = Channel::new(5, BoundedName::new("general").unwrap(), 9);
        assert!(ChannelFilter::server(9).matches(&channel));
        assert!(!ChannelFilter::server(8).matches(&channel));

        let message = ChannelMessage::new(1, 5, 2, BoundedName::new("bob").unwrap(), "hi".into());
        assert!(MessageFilter::channel(5).matches(&message));
        assert!(!MessageFilter::channel(6).matches(&message));
    }
}
