//! Hosted server lifecycle, registry, and shared state

mod hosted;
mod invitation;
mod registry;
mod settings;
mod state;

pub use hosted::{HostedServer, LifecycleError, ServerStatus};
pub use invitation::{InvitationCode, InvitationError};
pub use registry::{ServerRegistry, MIN_SERVER_ID};
pub use settings::ServerSettings;
pub use state::{ServerState, SharedState};

use huddle_common::{AppConfig, AppError};
use huddle_core::SharedGateway;
use huddle_db::{MemoryGateway, SqliteGateway};
use std::sync::Arc;

/// Open the configured store, or an empty in-process one
pub async fn connect_gateway(config: &AppConfig, in_memory: bool) -> Result<SharedGateway, AppError> {
    if in_memory {
        tracing::info!("Using in-memory store");
        return Ok(Arc::new(MemoryGateway::new()));
    }

    tracing::info!(url = %config.database.url, "Connecting to SQLite...");
    let pool = huddle_db::create_pool(&huddle_db::DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("SQLite connection established");

    Ok(Arc::new(SqliteGateway::new(pool)))
}
