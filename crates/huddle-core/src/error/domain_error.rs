//! Domain errors - error types for the domain layer

use std::net::IpAddr;

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Hosted server not found: {0}")]
    ServerNotFound(u16),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(u32),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Name too long: {len} bytes (max {max})")]
    NameTooLong { len: usize, max: usize },

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Invalid user role: {0}")]
    InvalidRole(String),

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Hosted server already exists: {0}")]
    ServerAlreadyExists(u16),

    #[error("Address {0} already joined this server")]
    AlreadyJoined(IpAddr),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for logs and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::ServerNotFound(_) => "UNKNOWN_SERVER",
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::ChannelNotFound(_) => "UNKNOWN_CHANNEL",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::NameTooLong { .. } => "NAME_TOO_LONG",
            Self::EmptyName => "EMPTY_NAME",
            Self::InvalidRole(_) => "INVALID_ROLE",

            // Conflict
            Self::ServerAlreadyExists(_) => "SERVER_ALREADY_EXISTS",
            Self::AlreadyJoined(_) => "ALREADY_JOINED",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ServerNotFound(_) | Self::UserNotFound(_) | Self::ChannelNotFound(_)
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::NameTooLong { .. }
                | Self::EmptyName
                | Self::InvalidRole(_)
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ServerAlreadyExists(_) | Self::AlreadyJoined(_))
    }
}
