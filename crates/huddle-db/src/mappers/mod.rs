//! Model to entity mappers
//!
//! Rows are converted with `TryFrom` because the database does not enforce
//! the domain's bounds (name length, id width, parsable addresses).

mod channel;
mod hosted_server;
mod message;
mod user;

use huddle_core::DomainError;

/// Narrow a SQLite integer into a domain id
pub(crate) fn narrow<T: TryFrom<i64>>(value: i64, column: &str) -> Result<T, DomainError> {
    T::try_from(value)
        .map_err(|_| DomainError::DatabaseError(format!("{column} out of range: {value}")))
}
