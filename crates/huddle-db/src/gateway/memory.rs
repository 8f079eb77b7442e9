//! In-process implementation of PersistenceGateway
//!
//! Enforces the same keys and references as the SQLite schema so callers
//! see the same errors from either store.

use std::collections::BTreeSet;
use std::net::IpAddr;

use async_trait::async_trait;
use parking_lot::Mutex;

use huddle_core::{
    BoundedName, Channel, ChannelFilter, ChannelMessage, DomainError, HostedServerRecord,
    InsertedMessage, MessageFilter, PersistenceGateway, RepoResult, UserFilter, UserRecord,
    UserRole,
};

#[derive(Debug, Default)]
struct Tables {
    servers: BTreeSet<u16>,
    users: Vec<UserRecord>,
    channels: Vec<Channel>,
    messages: Vec<ChannelMessage>,
    last_user_id: u32,
    last_channel_id: u32,
    last_message_id: u32,
}

impl Tables {
    fn require_server(&self, server_id: u16) -> RepoResult<()> {
        if self.servers.contains(&server_id) {
            Ok(())
        } else {
            Err(DomainError::ServerNotFound(server_id))
        }
    }
}

fn next_id(counter: &mut u32) -> RepoResult<u32> {
    *counter = counter
        .checked_add(1)
        .ok_or_else(|| DomainError::DatabaseError("id space exhausted".into()))?;
    Ok(*counter)
}

/// Gateway backed by plain collections behind one lock
#[derive(Debug, Default)]
pub struct MemoryGateway {
    tables: Mutex<Tables>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn select_hosted_servers(
        &self,
        server_id: Option<u16>,
    ) -> RepoResult<Vec<HostedServerRecord>> {
        let tables = self.tables.lock();
        Ok(tables
            .servers
            .iter()
            .filter(|id| server_id.map_or(true, |wanted| **id == wanted))
            .map(|id| HostedServerRecord::new(*id))
            .collect())
    }

    async fn select_users(&self, filter: &UserFilter) -> RepoResult<Vec<UserRecord>> {
        let tables = self.tables.lock();
        Ok(tables
            .users
            .iter()
            .filter(|user| filter.matches(user))
            .cloned()
            .collect())
    }

    async fn select_channels(&self, filter: &ChannelFilter) -> RepoResult<Vec<Channel>> {
        let tables = self.tables.lock();
        Ok(tables
            .channels
            .iter()
            .filter(|channel| filter.matches(channel))
            .cloned()
            .collect())
    }

    async fn select_messages(&self, filter: &MessageFilter) -> RepoResult<Vec<ChannelMessage>> {
        let tables = self.tables.lock();
        Ok(tables
            .messages
            .iter()
            .filter(|message| filter.matches(message))
            .cloned()
            .collect())
    }

    async fn insert_hosted_server(&self, server_id: u16) -> RepoResult<HostedServerRecord> {
        let mut tables = self.tables.lock();
        if !tables.servers.insert(server_id) {
            return Err(DomainError::ServerAlreadyExists(server_id));
        }
        Ok(HostedServerRecord::new(server_id))
    }

    async fn insert_user(
        &self,
        server_id: u16,
        address: IpAddr,
        username: &BoundedName,
    ) -> RepoResult<UserRecord> {
        let mut tables = self.tables.lock();
        tables.require_server(server_id)?;
        if tables
            .users
            .iter()
            .any(|u| u.server_id == server_id && u.ip_address == address)
        {
            return Err(DomainError::AlreadyJoined(address));
        }

        let id = next_id(&mut tables.last_user_id)?;
        let user = UserRecord::new(id, server_id, username.clone(), address);
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn insert_channel(&self, name: &BoundedName, server_id: u16) -> RepoResult<Channel> {
        let mut tables = self.tables.lock();
        tables.require_server(server_id)?;

        let id = next_id(&mut tables.last_channel_id)?;
        let channel = Channel::new(id, name.clone(), server_id);
        tables.channels.push(channel.clone());
        Ok(channel)
    }

    async fn insert_message(
        &self,
        text: &str,
        channel_id: u32,
        sender_id: u32,
    ) -> RepoResult<InsertedMessage> {
        let mut tables = self.tables.lock();
        let sender_username = tables
            .users
            .iter()
            .find(|u| u.id == sender_id)
            .map(|u| u.username.clone())
            .ok_or_else(|| DomainError::UserNotFound(sender_id.to_string()))?;
        if !tables.channels.iter().any(|c| c.id == channel_id) {
            return Err(DomainError::ChannelNotFound(channel_id));
        }

        let id = next_id(&mut tables.last_message_id)?;
        tables.messages.push(ChannelMessage::new(
            id,
            channel_id,
            sender_id,
            sender_username.clone(),
            text.to_string(),
        ));
        Ok(InsertedMessage {
            id,
            sender_username,
        })
    }

    async fn update_user_role(
        &self,
        server_id: u16,
        username: &str,
        role: UserRole,
    ) -> RepoResult<bool> {
        let mut tables = self.tables.lock();
        let mut matched = false;
        for user in tables
            .users
            .iter_mut()
            .filter(|u| u.server_id == server_id && u.username.as_str() == username)
        {
            user.role = role;
            matched = true;
        }
        Ok(matched)
    }
}
