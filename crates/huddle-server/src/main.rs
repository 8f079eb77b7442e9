//! Huddle server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p huddle-server -- serve
//! cargo run -p huddle-server -- serve --memory
//! ```
//!
//! Configuration is loaded from environment variables.

use std::net::IpAddr;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use huddle_common::{try_init_tracing_with_config, AppConfig, AppError, TracingConfig};
use huddle_core::{SharedGateway, UserFilter, UserRole};
use huddle_server::server::{connect_gateway, InvitationCode, ServerRegistry, ServerSettings};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Self-hosted group chat server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start every registered hosted server and run until Ctrl+C
    Serve {
        /// Keep everything in memory instead of the configured database
        #[arg(long)]
        memory: bool,
        /// Create this many new hosted servers before starting; defaults to
        /// one with `--memory`, none otherwise
        #[arg(long, value_name = "N")]
        create: Option<usize>,
    },
    /// Register a new hosted server with a random id
    CreateServer,
    /// List registered hosted servers with their invitation codes
    ListServers,
    /// Change a user's role on one hosted server
    SetRole {
        server_id: u16,
        username: String,
        role: UserRole,
    },
    /// List users of one hosted server
    ListUsers {
        server_id: u16,
        #[arg(long)]
        role: Option<UserRole>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize tracing
    let tracing_config = TracingConfig::from_settings(config.app.env, &config.log);
    if let Err(e) = try_init_tracing_with_config(&tracing_config) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(cli.command, config).await {
        error!(error = %e, code = e.error_code(), "Command failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(command: Command, config: AppConfig) -> Result<(), AppError> {
    let settings = ServerSettings::from_config(&config)?;
    let in_memory = matches!(command, Command::Serve { memory: true, .. });
    let gateway = connect_gateway(&config, in_memory).await?;

    match command {
        Command::Serve { memory, create } => {
            let create = create.unwrap_or(usize::from(memory));
            serve(&config, gateway, settings, create).await
        }
        Command::CreateServer => {
            let registry = ServerRegistry::new(gateway, settings);
            registry.load().await?;
            let server = registry.create_server().await?;
            println!("{}\t{}", server.id(), invitation(&config, server.id())?);
            Ok(())
        }
        Command::ListServers => {
            let registry = ServerRegistry::new(gateway, settings);
            registry.load().await?;
            for id in registry.ids() {
                println!("{id}\t{}", invitation(&config, id)?);
            }
            Ok(())
        }
        Command::SetRole {
            server_id,
            username,
            role,
        } => {
            if !gateway.update_user_role(server_id, &username, role).await? {
                return Err(AppError::not_found(format!(
                    "user '{username}' on server {server_id}"
                )));
            }
            println!("{username} is now {role} on server {server_id}");
            Ok(())
        }
        Command::ListUsers { server_id, role } => list_users(&gateway, server_id, role).await,
    }
}

async fn serve(
    config: &AppConfig,
    gateway: SharedGateway,
    settings: ServerSettings,
    create: usize,
) -> Result<(), AppError> {
    let registry = ServerRegistry::new(gateway, settings);
    for id in registry.bootstrap(create).await? {
        println!("{id}\t{}", invitation(config, id)?);
    }
    if registry.is_empty() {
        info!("No hosted servers registered; use `create-server` or `--create` first");
    }

    let started = registry.start_all().await;
    info!(started, registered = registry.len(), "Hosted servers running");

    tokio::signal::ctrl_c()
        .await
        .map_err(AppError::internal)?;
    info!("Shutdown signal received");

    let stopped = registry.stop_all().await;
    info!(stopped, "Hosted servers stopped");
    Ok(())
}

async fn list_users(
    gateway: &SharedGateway,
    server_id: u16,
    role: Option<UserRole>,
) -> Result<(), AppError> {
    let mut filter = UserFilter::server(server_id);
    filter.role = role;
    for user in gateway.select_users(&filter).await? {
        println!(
            "{}\t{}\t{}\t{}",
            user.id, user.username, user.ip_address, user.role
        );
    }
    Ok(())
}

fn invitation(config: &AppConfig, server_id: u16) -> Result<InvitationCode, AppError> {
    let host: IpAddr = config.network.advertise_host.parse().map_err(|_| {
        AppError::invalid_input(format!(
            "ADVERTISE_HOST '{}' is not an IP address",
            config.network.advertise_host
        ))
    })?;
    InvitationCode::new(host, server_id).map_err(AppError::invalid_input)
}
