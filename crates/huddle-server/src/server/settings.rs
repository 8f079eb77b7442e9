//! Settings shared by every hosted server on this host

use std::net::{IpAddr, Ipv4Addr};

use huddle_common::{AppConfig, ConfigError};

use crate::broadcast::SchedulerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Interface to bind; each hosted server listens on its id as port
    pub bind_host: IpAddr,
    pub scheduler: SchedulerConfig,
}

impl ServerSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let bind_host = config
            .network
            .bind_host
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BIND_HOST", config.network.bind_host.clone()))?;
        Ok(Self {
            bind_host,
            scheduler: SchedulerConfig::from(&config.broadcast),
        })
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            scheduler: SchedulerConfig::default(),
        }
    }
}
