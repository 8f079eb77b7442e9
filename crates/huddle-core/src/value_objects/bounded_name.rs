//! Bounded name - a UTF-8 string that fits a fixed-capacity wire field
//!
//! Usernames, channel names, and denormalized sender names all travel as
//! 20-byte NUL-padded arrays. Values longer than the field are rejected at
//! construction instead of being silently cut.

use std::fmt;

use crate::error::DomainError;

/// Capacity in bytes of every fixed-width name field
pub const NAME_CAPACITY: usize = 20;

/// Name bounded to [`NAME_CAPACITY`] bytes of UTF-8
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BoundedName(String);

impl BoundedName {
    /// Create a bounded name, rejecting values longer than the field capacity.
    ///
    /// Empty names are accepted here; use [`BoundedName::non_empty`] where an
    /// empty value is meaningless.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.len() > NAME_CAPACITY {
            return Err(DomainError::NameTooLong {
                len: value.len(),
                max: NAME_CAPACITY,
            });
        }
        Ok(Self(value))
    }

    /// Create a bounded name that must contain at least one non-whitespace character
    pub fn non_empty(value: impl Into<String>) -> Result<Self, DomainError> {
        let name = Self::new(value)?;
        if name.is_blank() {
            return Err(DomainError::EmptyName);
        }
        Ok(name)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the name is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for BoundedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BoundedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BoundedName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for BoundedName {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BoundedName> for String {
    fn from(name: BoundedName) -> Self {
        name.0
    }
}
