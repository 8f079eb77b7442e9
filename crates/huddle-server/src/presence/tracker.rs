//! Presence tracker
//!
//! Known users of one hosted server keyed by persisted user id. Not
//! synchronized on its own; callers hold the server state lock.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use huddle_core::{BoundedName, UserRecord, UserRole};
use tokio::time::Instant;

/// Online/offline status of a user on one hosted server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresenceStatus {
    #[default]
    Offline,
    Online,
}

impl PresenceStatus {
    #[inline]
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// A known user and their live presence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUser {
    pub id: u32,
    pub username: BoundedName,
    /// Persisted IP, used to recognise a client coming back on a new port
    pub ip: IpAddr,
    /// Last address a packet arrived from; cleared when the user goes offline
    pub address: Option<SocketAddr>,
    pub role: UserRole,
    pub status: PresenceStatus,
    /// Only meaningful while online
    pub active_channel_id: Option<u32>,
    pub last_contact: Instant,
}

impl ServerUser {
    fn from_record(record: &UserRecord, now: Instant) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
            ip: record.ip_address,
            address: None,
            role: record.role,
            status: PresenceStatus::Offline,
            active_channel_id: None,
            last_contact: now,
        }
    }

    #[inline]
    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }

    /// Online and currently viewing `channel_id`
    pub fn is_viewing(&self, channel_id: u32) -> bool {
        self.is_online() && self.active_channel_id == Some(channel_id)
    }
}

/// Users that are online but have not been heard from recently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleUser {
    pub id: u32,
    pub address: SocketAddr,
    pub last_contact: Instant,
}

#[derive(Debug, Default)]
pub struct PresenceTracker {
    users: HashMap<u32, ServerUser>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked set with persisted users, all offline
    pub fn load<'a>(&mut self, records: impl IntoIterator<Item = &'a UserRecord>, now: Instant) {
        self.users = records
            .into_iter()
            .map(|record| (record.id, ServerUser::from_record(record, now)))
            .collect();
    }

    /// Track a freshly joined user. They stay offline until their first
    /// channel load or message.
    pub fn upsert_on_join(&mut self, record: &UserRecord, address: SocketAddr, now: Instant) {
        let mut user = ServerUser::from_record(record, now);
        user.address = Some(address);
        self.users.insert(record.id, user);
    }

    /// Find the user behind `address`.
    ///
    /// An exact address match wins; otherwise the first user registered
    /// from the same IP.
    pub fn find_by_address(&self, address: SocketAddr) -> Option<&ServerUser> {
        self.users
            .values()
            .find(|user| user.address == Some(address))
            .or_else(|| {
                let mut candidates: Vec<&ServerUser> = self
                    .users
                    .values()
                    .filter(|user| user.ip == address.ip())
                    .collect();
                candidates.sort_by_key(|user| user.id);
                candidates.into_iter().next()
            })
    }

    pub fn get(&self, id: u32) -> Option<&ServerUser> {
        self.users.get(&id)
    }

    /// Online, with `last_contact` reset and the latest address remembered
    pub fn mark_online(&mut self, id: u32, address: SocketAddr, now: Instant) -> bool {
        match self.users.get_mut(&id) {
            Some(user) => {
                user.status = PresenceStatus::Online;
                user.address = Some(address);
                user.last_contact = now;
                true
            }
            None => false,
        }
    }

    /// Offline; address and active channel are forgotten
    pub fn mark_offline(&mut self, id: u32) -> bool {
        match self.users.get_mut(&id) {
            Some(user) => {
                user.status = PresenceStatus::Offline;
                user.address = None;
                user.active_channel_id = None;
                true
            }
            None => false,
        }
    }

    /// Record contact without changing status
    pub fn touch(&mut self, id: u32, address: SocketAddr, now: Instant) {
        if let Some(user) = self.users.get_mut(&id) {
            user.address = Some(address);
            user.last_contact = now;
        }
    }

    pub fn set_active_channel(&mut self, id: u32, channel_id: u32) {
        if let Some(user) = self.users.get_mut(&id) {
            user.active_channel_id = Some(channel_id);
        }
    }

    /// Update the role of the user named `username`; returns whether one was tracked
    pub fn set_role(&mut self, username: &str, role: UserRole) -> bool {
        let mut found = false;
        for user in self
            .users
            .values_mut()
            .filter(|user| user.username.as_str() == username)
        {
            user.role = role;
            found = true;
        }
        found
    }

    pub fn all(&self) -> impl Iterator<Item = &ServerUser> {
        self.users.values()
    }

    /// Addresses of online users viewing `channel_id`
    pub fn recipients(&self, channel_id: u32) -> Vec<SocketAddr> {
        self.users
            .values()
            .filter(|user| user.is_viewing(channel_id))
            .filter_map(|user| user.address)
            .collect()
    }

    /// Online users whose last contact is at least `threshold` old
    pub fn stale(&self, threshold: Duration, now: Instant) -> Vec<StaleUser> {
        self.users
            .values()
            .filter(|user| user.is_online())
            .filter(|user| now.saturating_duration_since(user.last_contact) >= threshold)
            .filter_map(|user| {
                user.address.map(|address| StaleUser {
                    id: user.id,
                    address,
                    last_contact: user.last_contact,
                })
            })
            .collect()
    }

    pub fn online_count(&self) -> usize {
        self.users.values().filter(|user| user.is_online()).count()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr(last: u8, port: u16) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::new(10, 0, 0, last), port))
    }

    fn record(id: u32, name: &str, last: u8) -> UserRecord {
        UserRecord::new(
            id,
            4000,
            BoundedName::new(name).unwrap(),
            addr(last, 0).ip(),
        )
    }

    #[test]
    fn test_join_leaves_user_offline() {
        let now = Instant::now();
        let mut tracker = PresenceTracker::new();
        tracker.upsert_on_join(&record(1, "alice", 2), addr(2, 5000), now);

        let alice = tracker.find_by_address(addr(2, 5000)).unwrap();
        assert_eq!(alice.status, PresenceStatus::Offline);
        assert_eq!(alice.address, Some(addr(2, 5000)));
        assert!(tracker.recipients(1).is_empty());
    }

    #[test]
    fn test_find_by_address_falls_back_to_ip() {
        let now = Instant::now();
        let mut tracker = PresenceTracker::new();
        tracker.load([&record(1, "alice", 2), &record(2, "bob", 3)], now);

        // Loaded users have no address yet
        let found = tracker.find_by_address(addr(3, 6123)).unwrap();
        assert_eq!(found.username.as_str(), "bob");
        assert!(tracker.find_by_address(addr(9, 6123)).is_none());
    }

    #[test]
    fn test_exact_address_beats_ip_match() {
        let now = Instant::now();
        let mut tracker = PresenceTracker::new();
        // Two users sharing one host
        tracker.load([&record(1, "alice", 2), &record(2, "twin", 2)], now);
        tracker.mark_online(2, addr(2, 7000), now);

        assert_eq!(tracker.find_by_address(addr(2, 7000)).unwrap().id, 2);
        assert_eq!(tracker.find_by_address(addr(2, 7001)).unwrap().id, 1);
    }

    #[test]
    fn test_recipients_require_online_and_matching_channel() {
        let now = Instant::now();
        let mut tracker = PresenceTracker::new();
        tracker.load([&record(1, "a", 2), &record(2, "b", 3), &record(3, "c", 4)], now);

        tracker.mark_online(1, addr(2, 1), now);
        tracker.set_active_channel(1, 10);
        tracker.mark_online(2, addr(3, 1), now);
        tracker.set_active_channel(2, 20);
        // Viewing channel 10 but offline
        tracker.set_active_channel(3, 10);

        assert_eq!(tracker.recipients(10), vec![addr(2, 1)]);
        assert_eq!(tracker.recipients(20), vec![addr(3, 1)]);
        assert_eq!(tracker.online_count(), 2);
    }

    #[test]
    fn test_mark_offline_forgets_address_and_channel() {
        let now = Instant::now();
        let mut tracker = PresenceTracker::new();
        tracker.load([&record(1, "a", 2)], now);
        tracker.mark_online(1, addr(2, 1), now);
        tracker.set_active_channel(1, 10);

        assert!(tracker.mark_offline(1));
        let user = tracker.get(1).unwrap();
        assert!(!user.is_online());
        assert_eq!(user.address, None);
        assert_eq!(user.active_channel_id, None);
        assert!(!tracker.mark_offline(99));
    }

    #[test]
    fn test_stale_only_reports_online_users_past_threshold() {
        let start = Instant::now();
        let later = start + Duration::from_secs(61);
        let mut tracker = PresenceTracker::new();
        tracker.load([&record(1, "a", 2), &record(2, "b", 3), &record(3, "c", 4)], start);

        tracker.mark_online(1, addr(2, 1), start);
        tracker.mark_online(2, addr(3, 1), later);

        let stale = tracker.stale(Duration::from_secs(60), later);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, 1);
        assert_eq!(stale[0].last_contact, start);
    }

    #[test]
    fn test_set_role_by_username() {
        let now = Instant::now();
        let mut tracker = PresenceTracker::new();
        tracker.load([&record(1, "alice", 2)], now);

        assert!(tracker.set_role("alice", UserRole::Admin));
        assert!(tracker.get(1).unwrap().role.is_admin());
        assert!(!tracker.set_role("nobody", UserRole::Admin));
    }
}
