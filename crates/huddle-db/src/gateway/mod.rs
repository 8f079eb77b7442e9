//! Persistence gateway implementations
//!
//! `SqliteGateway` is the durable store; `MemoryGateway` keeps the same
//! contract in process for tests and throwaway runs.

mod error;
mod memory;
mod sqlite;

pub use memory::MemoryGateway;
pub use sqlite::SqliteGateway;
