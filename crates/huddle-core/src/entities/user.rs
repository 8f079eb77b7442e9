//! User entity - a persisted member of one hosted server

use std::net::IpAddr;

use crate::value_objects::{BoundedName, UserRole};

/// Persisted user row.
///
/// Identity is `(server_id, id)`. Only the IP part of the address is stored:
/// a reconnecting client usually arrives from a new ephemeral port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: u32,
    pub server_id: u16,
    pub username: BoundedName,
    pub ip_address: IpAddr,
    pub role: UserRole,
}

impl UserRecord {
    /// Create a new member record
    pub fn new(id: u32, server_id: u16, username: BoundedName, ip_address: IpAddr) -> Self {
        Self {
            id,
            server_id,
            username,
            ip_address,
            role: UserRole::Member,
        }
    }

    /// Set the role
    #[must_use]
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_user_defaults_to_member() {
        let user = UserRecord::new(
            1,
            4000,
            BoundedName::new("alice").unwrap(),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
        );
        assert_eq!(user.role, UserRole::Member);
        assert!(!user.is_admin());
        assert!(user.with_role(UserRole::Admin).is_admin());
    }
}
