//! Invitation codes
//!
//! A code packs the advertised IPv4 address and the server id (which is
//! also its UDP port) into a short string users can paste into a client.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;

const CODE_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvitationError {
    #[error("Invitation codes only carry IPv4 addresses, got {0}")]
    NotIpv4(IpAddr),

    #[error("Invitation code is not valid base64")]
    InvalidEncoding,

    #[error("Invitation code has {0} bytes, expected {CODE_LEN}")]
    WrongLength(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvitationCode {
    pub host: Ipv4Addr,
    pub server_id: u16,
}

impl InvitationCode {
    pub fn new(host: IpAddr, server_id: u16) -> Result<Self, InvitationError> {
        match host {
            IpAddr::V4(host) => Ok(Self { host, server_id }),
            IpAddr::V6(_) => Err(InvitationError::NotIpv4(host)),
        }
    }

    /// Where a client should send its requests
    pub fn address(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.server_id))
    }

    pub fn encode(&self) -> String {
        let mut raw = [0u8; CODE_LEN];
        raw[..4].copy_from_slice(&self.host.octets());
        raw[4..].copy_from_slice(&self.server_id.to_le_bytes());
        URL_SAFE_NO_PAD.encode(raw)
    }

    pub fn parse(code: &str) -> Result<Self, InvitationError> {
        let raw = URL_SAFE_NO_PAD
            .decode(code.trim())
            .map_err(|_| InvitationError::InvalidEncoding)?;
        if raw.len() != CODE_LEN {
            return Err(InvitationError::WrongLength(raw.len()));
        }
        Ok(Self {
            host: Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]),
            server_id: u16::from_le_bytes([raw[4], raw[5]]),
        })
    }
}

impl fmt::Display for InvitationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for InvitationCode {
    type Err = InvitationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
