//! User role within a hosted server

use std::fmt;
use std::str::FromStr;

/// Role of a user on one hosted server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum UserRole {
    #[default]
    Member = 0,
    Admin = 1,
}

impl UserRole {
    /// Get the numeric value as stored in the `user_type` column
    #[inline]
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Map a stored numeric value back to a role
    #[must_use]
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Member),
            1 => Some(Self::Admin),
            _ => None,
        }
    }

    #[inline]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member => write!(f, "member"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Invalid role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_mapping() {
        assert_eq!(UserRole::Member.as_i64(), 0);
        assert_eq!(UserRole::Admin.as_i64(), 1);
        assert_eq!(UserRole::from_i64(1), Some(UserRole::Admin));
        assert_eq!(UserRole::from_i64(7), None);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("ADMIN".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!("member".parse::<UserRole>(), Ok(UserRole::Member));
        assert!("owner".parse::<UserRole>().is_err());
        assert_eq!(UserRole::Admin.to_string(), "admin");
    }
}
