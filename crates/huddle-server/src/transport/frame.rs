//! Datagram framing
//!
//! Every datagram starts with `kind:u8`, `correlation:u32 LE`,
//! `fragment:u16 LE` and `fragments:u16 LE`; a slice of the protocol
//! envelope follows. Payloads larger than one datagram are split into
//! numbered fragments sharing a correlation id.

use bytes::{BufMut, Bytes, BytesMut};

use super::TransportError;

pub const HEADER_LEN: usize = 9;

/// Largest datagram the receive loop accepts
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// Payload bytes carried by one fragment
pub const MAX_FRAGMENT_PAYLOAD: usize = 32 * 1024;

/// Most fragments one payload may be split into
pub const MAX_FRAGMENTS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Fire-and-forget, no reply expected
    Message = 0,
    /// Expects a `Response` with the same correlation id
    Request = 1,
    Response = 2,
}

impl FrameKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Message),
            1 => Some(Self::Request),
            2 => Some(Self::Response),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub correlation: u32,
    /// Zero-based position of this fragment
    pub fragment: u16,
    /// Number of fragments in the whole payload; 1 when unsplit
    pub fragments: u16,
    pub payload: Bytes,
}

impl Frame {
    /// A frame carrying a whole payload
    pub fn new(kind: FrameKind, correlation: u32, payload: Bytes) -> Self {
        Self {
            kind,
            correlation,
            fragment: 0,
            fragments: 1,
            payload,
        }
    }

    /// Split `payload` into as many frames as it needs
    pub fn split(
        kind: FrameKind,
        correlation: u32,
        payload: Bytes,
    ) -> Result<Vec<Self>, TransportError> {
        if payload.len() <= MAX_FRAGMENT_PAYLOAD {
            return Ok(vec![Self::new(kind, correlation, payload)]);
        }
        let count = payload.len().div_ceil(MAX_FRAGMENT_PAYLOAD);
        if count > MAX_FRAGMENTS {
            return Err(TransportError::TooLarge {
                len: payload.len(),
                max: MAX_FRAGMENTS * MAX_FRAGMENT_PAYLOAD,
            });
        }

        Ok((0..count)
            .map(|index| {
                let start = index * MAX_FRAGMENT_PAYLOAD;
                let end = (start + MAX_FRAGMENT_PAYLOAD).min(payload.len());
                Self {
                    kind,
                    correlation,
                    fragment: index as u16,
                    fragments: count as u16,
                    payload: payload.slice(start..end),
                }
            })
            .collect())
    }

    pub fn is_fragment(&self) -> bool {
        self.fragments > 1
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u8(self.kind as u8);
        buf.put_u32_le(self.correlation);
        buf.put_u16_le(self.fragment);
        buf.put_u16_le(self.fragments);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    pub fn decode(datagram: &[u8]) -> Result<Self, TransportError> {
        if datagram.len() < HEADER_LEN {
            return Err(TransportError::Malformed(format!(
                "{} byte datagram is shorter than the frame header",
                datagram.len()
            )));
        }
        let kind = FrameKind::from_u8(datagram[0]).ok_or_else(|| {
            TransportError::Malformed(format!("unknown frame kind {}", datagram[0]))
        })?;
        let correlation =
            u32::from_le_bytes([datagram[1], datagram[2], datagram[3], datagram[4]]);
        let fragment = u16::from_le_bytes([datagram[5], datagram[6]]);
        let fragments = u16::from_le_bytes([datagram[7], datagram[8]]);
        if fragments == 0 || fragment >= fragments || usize::from(fragments) > MAX_FRAGMENTS {
            return Err(TransportError::Malformed(format!(
                "fragment {fragment} of {fragments}"
            )));
        }
        Ok(Self {
            kind,
            correlation,
            fragment,
            fragments,
            payload: Bytes::copy_from_slice(&datagram[HEADER_LEN..]),
        })
    }
}
