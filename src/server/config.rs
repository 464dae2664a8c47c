//! Server configuration

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::registry::HubConfig;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration options
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Interval between keep-alive broadcasts
    pub heartbeat_interval: Duration,

    /// Payload sent to every connection on each heartbeat
    pub heartbeat_payload: String,

    /// Registry configuration
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_payload: "ping".to_string(),
            hub: HubConfig::default(),
        }
    }
}

/// On-disk layout of the TOML config file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    server: ServerSection,
    heartbeat: HeartbeatSection,
    hub: HubConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServerSection {
    addr: Option<SocketAddr>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct HeartbeatSection {
    interval_secs: Option<u64>,
    payload: Option<String>,
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the heartbeat interval
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the heartbeat payload
    pub fn heartbeat_payload(mut self, payload: impl Into<String>) -> Self {
        self.heartbeat_payload = payload.into();
        self
    }

    /// Set the registry configuration
    pub fn hub(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(text)?;
        let defaults = Self::default();

        let config = Self {
            bind_addr: file.server.addr.unwrap_or(defaults.bind_addr),
            heartbeat_interval: file
                .heartbeat
                .interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
            heartbeat_payload: file
                .heartbeat
                .payload
                .unwrap_or(defaults.heartbeat_payload),
            hub: file.hub,
        };

        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loading config file");
        Self::from_toml(&text)
    }

    /// Check that the values can back a running server
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(Error::Config(
                "heartbeat.interval_secs must be greater than zero".into(),
            ));
        }
        self.hub.validate()
    }
}
