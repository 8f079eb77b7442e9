//! Request types and response statuses
//!
//! Both travel as little-endian `u32` in the envelope headers.

use std::fmt;

/// Request type carried by every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RequestType {
    /// Register a username for the sender's address (client only)
    JoinServer = 0,
    /// Channel list (client only)
    LoadServerInformation = 1,
    /// Full history of one channel; also selects the active channel (client only)
    LoadChannelData = 2,
    /// New message into a channel, no direct response (client only)
    SendMessage = 3,
    /// Caller's role (client only)
    LoadJoinedServerData = 4,
    /// Channel list for the admin view (client only)
    LoadAdminMenuData = 5,
    /// Create a channel (client only)
    CreateNewChannel = 6,
    /// Batched new messages for one channel (server push only)
    PeriodicUpdate = 7,
    /// Liveness check (server-initiated request only)
    ClientOnlineCheck = 8,
}

impl RequestType {
    /// Every type a client may send
    pub const CLIENT_REQUESTS: [Self; 7] = [
        Self::JoinServer,
        Self::LoadServerInformation,
        Self::LoadChannelData,
        Self::SendMessage,
        Self::LoadJoinedServerData,
        Self::LoadAdminMenuData,
        Self::CreateNewChannel,
    ];

    /// Create a `RequestType` from its wire value
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::JoinServer),
            1 => Some(Self::LoadServerInformation),
            2 => Some(Self::LoadChannelData),
            3 => Some(Self::SendMessage),
            4 => Some(Self::LoadJoinedServerData),
            5 => Some(Self::LoadAdminMenuData),
            6 => Some(Self::CreateNewChannel),
            7 => Some(Self::PeriodicUpdate),
            8 => Some(Self::ClientOnlineCheck),
            _ => None,
        }
    }

    /// Get the wire value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Check if a client may send this type
    #[must_use]
    pub const fn is_client_request(self) -> bool {
        !matches!(self, Self::PeriodicUpdate | Self::ClientOnlineCheck)
    }

    /// Get the name of this request type
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::JoinServer => "JoinServer",
            Self::LoadServerInformation => "LoadServerInformation",
            Self::LoadChannelData => "LoadChannelData",
            Self::SendMessage => "SendMessage",
            Self::LoadJoinedServerData => "LoadJoinedServerData",
            Self::LoadAdminMenuData => "LoadAdminMenuData",
            Self::CreateNewChannel => "CreateNewChannel",
            Self::PeriodicUpdate => "PeriodicUpdate",
            Self::ClientOnlineCheck => "ClientOnlineCheck",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome carried in a response header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    Success = 0,
    Fail = 1,
}

impl Status {
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::Fail),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl<T, E> From<&Result<T, E>> for Status {
    fn from(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Self::Success
        } else {
            Self::Fail
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_type_wire_values() {
        for value in 0..=8 {
            let request_type = RequestType::from_u32(value).unwrap();
            assert_eq!(request_type.as_u32(), value);
        }
        assert!(RequestType::from_u32(9).is_none());
        assert!(RequestType::from_u32(u32::MAX).is_none());
    }

    #[test]
    fn test_client_requests() {
        assert!(RequestType::CLIENT_REQUESTS
            .iter()
            .all(|t| t.is_client_request()));
        assert!(!RequestType::PeriodicUpdate.is_client_request());
        assert!(!RequestType::ClientOnlineCheck.is_client_request());
    }

    #[test]
    fn test_status_from_result() {
        let ok: Result<(), ()> = Ok(());
        let err: Result<(), ()> = Err(());
        assert_eq!(Status::from(&ok), Status::Success);
        assert_eq!(Status::from(&err), Status::Fail);
        assert_eq!(Status::from_u32(1), Some(Status::Fail));
        assert!(Status::from_u32(2).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(RequestType::LoadChannelData.to_string(), "LoadChannelData");
    }
}
