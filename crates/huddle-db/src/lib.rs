//! # huddle-db
//!
//! Database layer implementing the persistence gateway with SQLite via SQLx.
//!
//! ## Overview
//!
//! - Connection pool management and schema bootstrap
//! - Database models with SQLx `FromRow` derives
//! - Model → entity mappers
//! - `SqliteGateway` and the in-process `MemoryGateway`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use huddle_db::pool::{create_pool, DatabaseConfig};
//! use huddle_db::SqliteGateway;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::default()).await?;
//!     let gateway = SqliteGateway::new(pool);
//!
//!     // Hand the gateway to a hosted server...
//!     Ok(())
//! }
//! ```

mod mappers;
pub mod models;
pub mod pool;

mod gateway;

// Re-export commonly used types
pub use gateway::{MemoryGateway, SqliteGateway};
pub use pool::{create_memory_pool, create_pool, DatabaseConfig, SqlitePool};
