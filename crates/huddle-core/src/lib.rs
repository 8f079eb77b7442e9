//! # huddle-core
//!
//! Domain layer containing entities, value objects, the persistence gateway port,
//! and domain errors. This crate has zero dependencies on infrastructure
//! (database, sockets, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Channel, ChannelMessage, HostedServerRecord, InsertedMessage, UserRecord};
pub use error::DomainError;
pub use traits::{
    ChannelFilter, MessageFilter, PersistenceGateway, RepoResult, SharedGateway, UserFilter,
};
pub use value_objects::{BoundedName, UserRole, NAME_CAPACITY};
