//! Every hosted server registered on this host

use std::sync::Arc;

use dashmap::DashMap;
use huddle_core::{DomainError, SharedGateway};
use rand::Rng;

use super::{HostedServer, LifecycleError, ServerSettings, ServerStatus};

/// Ports below this are left to the system
pub const MIN_SERVER_ID: u16 = 1024;

const CREATE_ATTEMPTS: usize = 64;

pub struct ServerRegistry {
    gateway: SharedGateway,
    settings: ServerSettings,
    servers: DashMap<u16, Arc<HostedServer>>,
}

impl ServerRegistry {
    pub fn new(gateway: SharedGateway, settings: ServerSettings) -> Self {
        Self {
            gateway,
            settings,
            servers: DashMap::new(),
        }
    }

    /// Register a stopped server for every persisted one; returns how many
    /// were added
    pub async fn load(&self) -> Result<usize, DomainError> {
        let records = self.gateway.select_hosted_servers(None).await?;
        let mut added = 0;
        for record in records {
            if !self.servers.contains_key(&record.id) {
                self.insert(record.id);
                added += 1;
            }
        }
        tracing::debug!(servers = added, "Hosted servers loaded");
        Ok(added)
    }

    /// Persist and register a new server under a random free id
    pub async fn create_server(&self) -> Result<Arc<HostedServer>, DomainError> {
        for _ in 0..CREATE_ATTEMPTS {
            let id = rand::thread_rng().gen_range(MIN_SERVER_ID..=u16::MAX);
            if self.servers.contains_key(&id) {
                continue;
            }
            match self.gateway.insert_hosted_server(id).await {
                Ok(_) => {
                    tracing::info!(server_id = id, "Hosted server created");
                    return Ok(self.insert(id));
                }
                // Registered by another process since we loaded
                Err(DomainError::ServerAlreadyExists(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(DomainError::InternalError(
            "no free hosted server id found".to_string(),
        ))
    }

    /// Load persisted servers, then create `create` more. Returns the ids
    /// of the created ones.
    pub async fn bootstrap(&self, create: usize) -> Result<Vec<u16>, DomainError> {
        let loaded = self.load().await?;
        let mut created = Vec::with_capacity(create);
        for _ in 0..create {
            created.push(self.create_server().await?.id());
        }
        tracing::info!(loaded, created = created.len(), "Hosted servers registered");
        Ok(created)
    }

    fn insert(&self, id: u16) -> Arc<HostedServer> {
        let server = Arc::new(HostedServer::new(id, self.gateway.clone(), self.settings));
        self.servers.insert(id, Arc::clone(&server));
        server
    }

    pub fn get(&self, id: u16) -> Option<Arc<HostedServer>> {
        self.servers.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Registered ids in ascending order
    pub fn ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.servers.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<HostedServer>> {
        let mut servers: Vec<_> = self
            .servers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        servers.sort_by_key(|server| server.id());
        servers
    }

    /// Start every stopped server. Failures are logged and skipped.
    pub async fn start_all(&self) -> usize {
        let mut started = 0;
        for server in self.snapshot() {
            if server.status().await == ServerStatus::Running {
                continue;
            }
            match server.start().await {
                Ok(()) => started += 1,
                Err(e) => log_failure(server.id(), "start", &e),
            }
        }
        started
    }

    /// Stop every running server. Failures are logged and skipped.
    pub async fn stop_all(&self) -> usize {
        let mut stopped = 0;
        for server in self.snapshot() {
            if server.status().await == ServerStatus::Stopped {
                continue;
            }
            match server.stop().await {
                Ok(()) => stopped += 1,
                Err(e) => log_failure(server.id(), "stop", &e),
            }
        }
        stopped
    }
}

fn log_failure(server_id: u16, action: &str, error: &LifecycleError) {
    tracing::error!(server_id, action, error = %error, "Hosted server lifecycle failure");
}

impl std::fmt::Debug for ServerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerRegistry")
            .field("servers", &self.ids())
            .finish_non_exhaustive()
    }
}
