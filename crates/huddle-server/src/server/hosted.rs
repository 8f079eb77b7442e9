//! Hosted server lifecycle
//!
//! A running server owns one UDP transport, a dispatcher task draining its
//! inbound packets, and a scheduler task ticking broadcasts. Stopping tears
//! all three down and forgets live presence.

use std::net::SocketAddr;
use std::sync::Arc;

use huddle_core::{DomainError, SharedGateway, UserFilter, UserRole};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{ServerSettings, SharedState};
use crate::broadcast::BroadcastScheduler;
use crate::handlers::{HandlerContext, RequestDispatcher};
use crate::presence::ServerUser;
use crate::transport::{TransportError, UdpTransport};

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Hosted server {0} is already running")]
    AlreadyRunning(u16),

    #[error("Hosted server {0} is not running")]
    NotRunning(u16),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: TransportError,
    },

    #[error("Failed to load users: {0}")]
    Persistence(#[from] DomainError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Running,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Tasks and handles that exist only while running
struct RunningServer {
    transport: Arc<UdpTransport>,
    shutdown: watch::Sender<bool>,
    dispatcher_task: JoinHandle<()>,
    scheduler_task: JoinHandle<()>,
}

pub struct HostedServer {
    id: u16,
    gateway: SharedGateway,
    settings: ServerSettings,
    state: SharedState,
    running: Mutex<Option<RunningServer>>,
}

impl HostedServer {
    /// A stopped server
    pub fn new(id: u16, gateway: SharedGateway, settings: ServerSettings) -> Self {
        Self {
            id,
            gateway,
            settings,
            state: SharedState::new(),
            running: Mutex::new(None),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    /// Address this server listens on while running
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.settings.bind_host, self.id)
    }

    pub async fn status(&self) -> ServerStatus {
        if self.running.lock().await.is_some() {
            ServerStatus::Running
        } else {
            ServerStatus::Stopped
        }
    }

    /// Load persisted users, bind the socket, and start the dispatcher and
    /// scheduler
    pub async fn start(&self) -> Result<(), LifecycleError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(LifecycleError::AlreadyRunning(self.id));
        }

        let users = self
            .gateway
            .select_users(&UserFilter::server(self.id))
            .await?;

        let addr = self.address();
        let (transport, inbound) = UdpTransport::listen(addr)
            .await
            .map_err(|source| LifecycleError::Bind { addr, source })?;

        {
            let mut state = self.state.lock();
            state.clear();
            state.presence.load(&users, Instant::now());
        }

        let dispatcher = RequestDispatcher::with_default_handlers(
            HandlerContext::new(self.id, self.gateway.clone(), self.state.clone()),
            transport.clone(),
        );
        let dispatcher_task = tokio::spawn(async move { dispatcher.run(inbound).await });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let scheduler = BroadcastScheduler::new(
            self.id,
            self.state.clone(),
            transport.clone(),
            self.settings.scheduler,
        );
        let scheduler_task = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

        *running = Some(RunningServer {
            transport,
            shutdown,
            dispatcher_task,
            scheduler_task,
        });

        tracing::info!(
            server_id = self.id,
            addr = %addr,
            users = users.len(),
            "Hosted server started"
        );
        Ok(())
    }

    /// Close the socket, stop both tasks, and clear presence and the queue.
    ///
    /// The lifecycle lock is held until teardown finishes, so a concurrent
    /// `start` waits and then loads fresh presence.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        let mut running = self.running.lock().await;
        let Some(server) = running.take() else {
            return Err(LifecycleError::NotRunning(self.id));
        };

        // Closing the transport ends the dispatcher's inbound stream
        server.transport.close().await;
        let _ = server.shutdown.send(true);

        if let Err(e) = server.scheduler_task.await {
            tracing::warn!(server_id = self.id, error = %e, "Scheduler task failed");
        }
        if let Err(e) = server.dispatcher_task.await {
            tracing::warn!(server_id = self.id, error = %e, "Dispatcher task failed");
        }

        self.state.lock().clear();
        drop(running);

        tracing::info!(server_id = self.id, "Hosted server stopped");
        Ok(())
    }

    /// Persist a role change and apply it to the live user, if tracked.
    ///
    /// Returns whether a user with that name exists on this server.
    pub async fn set_user_role(&self, username: &str, role: UserRole) -> Result<bool, DomainError> {
        let found = self
            .gateway
            .update_user_role(self.id, username, role)
            .await?;
        if found {
            self.state.lock().presence.set_role(username, role);
            tracing::info!(server_id = self.id, username, %role, "User role changed");
        }
        Ok(found)
    }

    /// Snapshot of every tracked user, ordered by id
    pub fn presence(&self) -> Vec<ServerUser> {
        let mut users: Vec<ServerUser> = self.state.lock().presence.all().cloned().collect();
        users.sort_by_key(|user| user.id);
        users
    }

    /// Messages waiting for the next broadcast tick
    pub fn pending_messages(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl std::fmt::Debug for HostedServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedServer")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
