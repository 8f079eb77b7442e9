//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub network: NetworkConfig,
    pub database: DatabaseConfig,
    pub broadcast: BroadcastConfig,
    pub log: LogConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Where hosted servers listen and how they are advertised
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Interface every hosted server binds; the server id is the port
    pub bind_host: String,
    /// Host written into invitation codes
    pub advertise_host: String,
}

impl NetworkConfig {
    /// Socket address string for one hosted server
    #[must_use]
    pub fn address(&self, server_id: u16) -> String {
        format!("{}:{}", self.bind_host, server_id)
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Broadcast scheduler timing
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    pub tick_ms: u64,
    pub heartbeat_stale_secs: u64,
    pub heartbeat_timeout_ms: u64,
}

impl BroadcastConfig {
    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    #[must_use]
    pub fn heartbeat_stale_after(&self) -> Duration {
        Duration::from_secs(self.heartbeat_stale_secs)
    }

    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            heartbeat_stale_secs: default_heartbeat_stale_secs(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub format: LogFormat,
}

// Default value functions
fn default_app_name() -> String {
    "huddle".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_database_url() -> String {
    "sqlite://huddle.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_tick_ms() -> u64 {
    200
}

fn default_heartbeat_stale_secs() -> u64 {
    60
}

fn default_heartbeat_timeout_ms() -> u64 {
    5000
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set to a value that does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env: Environment = parse_or(&lookup, "APP_ENV", Environment::default)?;
        let bind_host = lookup("BIND_HOST").unwrap_or_else(default_host);

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            network: NetworkConfig {
                advertise_host: lookup("ADVERTISE_HOST").unwrap_or_else(|| bind_host.clone()),
                bind_host,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").unwrap_or_else(default_database_url),
                max_connections: parse_positive(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    default_max_connections,
                )?,
            },
            broadcast: BroadcastConfig {
                tick_ms: parse_positive(&lookup, "BROADCAST_TICK_MS", default_tick_ms)?,
                heartbeat_stale_secs: parse_or(
                    &lookup,
                    "HEARTBEAT_STALE_SECS",
                    default_heartbeat_stale_secs,
                )?,
                heartbeat_timeout_ms: parse_positive(
                    &lookup,
                    "HEARTBEAT_TIMEOUT_MS",
                    default_heartbeat_timeout_ms,
                )?,
            },
            log: LogConfig {
                format: parse_or(&lookup, "LOG_FORMAT", || {
                    if env.is_production() {
                        LogFormat::Json
                    } else {
                        LogFormat::Pretty
                    }
                })?,
            },
        })
    }
}

fn parse_or<F, T, D>(lookup: &F, key: &'static str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    D: FnOnce() -> T,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default()),
    }
}

/// Like `parse_or`, but zero is rejected
fn parse_positive<F, T, D>(lookup: &F, key: &'static str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq,
    D: FnOnce() -> T,
{
    let value = parse_or(lookup, key, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidValue(key, "0".to_string()));
    }
    Ok(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
