//! Database connection pool management

mod schema;
mod sqlite;

pub use schema::bootstrap_schema;
pub use sqlite::{create_memory_pool, create_pool, DatabaseConfig};

// Re-export SqlitePool for convenience
pub use sqlx::sqlite::SqlitePool;
