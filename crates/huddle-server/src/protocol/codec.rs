//! Fixed-layout binary codec
//!
//! All integers are little-endian. Names are `NAME_CAPACITY`-byte arrays,
//! NUL-padded; a name of exactly `NAME_CAPACITY` bytes carries no terminator.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use huddle_core::{BoundedName, NAME_CAPACITY};
use thiserror::Error;

/// Codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Truncated packet: needed {needed} bytes, {remaining} remaining")]
    TruncatedPacket { needed: usize, remaining: usize },

    #[error("Unknown request type: {0}")]
    UnknownRequestType(u32),

    #[error("Unknown status: {0}")]
    UnknownStatus(u32),

    #[error("Invalid UTF-8 in text field")]
    InvalidUtf8,

    #[error("Name too long: {len} bytes (max {max})")]
    NameTooLong { len: usize, max: usize },
}

/// Types that can be appended to an outbound buffer
pub trait Encode {
    /// Append the encoded form to `buf`
    fn encode(&self, buf: &mut BytesMut);

    /// Encode into a fresh buffer
    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// Types that can be read from an inbound buffer
pub trait Decode: Sized {
    /// Read one value, advancing the reader
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError>;

    /// Decode from the start of a byte slice, ignoring trailing bytes
    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Self::decode(&mut Reader::new(bytes))
    }
}

/// Cursor over an inbound buffer
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Everything not yet consumed
    pub fn rest(&self) -> &'a [u8] {
        self.buf
    }

    fn ensure(&self, needed: usize) -> Result<(), CodecError> {
        if self.buf.len() < needed {
            return Err(CodecError::TruncatedPacket {
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    /// Take `len` raw bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), CodecError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read a fixed-capacity name, stopping at the first NUL
    pub fn read_name(&mut self) -> Result<BoundedName, CodecError> {
        let raw = self.read_bytes(NAME_CAPACITY)?;
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        let text = std::str::from_utf8(&raw[..end]).map_err(|_| CodecError::InvalidUtf8)?;
        BoundedName::new(text).map_err(|_| CodecError::NameTooLong {
            len: text.len(),
            max: NAME_CAPACITY,
        })
    }

    /// Read `len` bytes of NUL-terminated text; the terminator is optional
    pub fn read_text(&mut self, len: usize) -> Result<String, CodecError> {
        let raw = self.read_bytes(len)?;
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        String::from_utf8(raw[..end].to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

/// Append a name, NUL-padded to `NAME_CAPACITY`
pub fn put_name(buf: &mut BytesMut, name: &BoundedName) {
    let bytes = name.as_bytes();
    buf.put_slice(bytes);
    buf.put_bytes(0, NAME_CAPACITY - bytes.len());
}

/// Wire length of NUL-terminated text
pub fn text_wire_len(text: &str) -> u32 {
    u32::try_from(text.len() + 1).unwrap_or(u32::MAX)
}

/// Append text followed by its NUL terminator
pub fn put_text(buf: &mut BytesMut, text: &str) {
    buf.put_slice(text.as_bytes());
    buf.put_u8(0);
}

/// Element count of a list, as carried on the wire
pub fn wire_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
