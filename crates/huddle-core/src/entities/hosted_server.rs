//! Hosted server registration

/// A chat-room instance this host runs.
///
/// The id doubles as the UDP port the server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostedServerRecord {
    pub id: u16,
}

impl HostedServerRecord {
    pub fn new(id: u16) -> Self {
        Self { id }
    }
}
