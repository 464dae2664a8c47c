//! Hub configuration

use serde::Deserialize;

/// Default outbound buffer capacity per connection
pub const DEFAULT_BUFFER_CAPACITY: usize = 255;

/// Configuration for the connection registry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Number of payloads a connection may have queued before new ones are dropped
    pub buffer_capacity: usize,

    /// Evict a connection whose buffer is full at publish time
    pub drop_slow_clients: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            drop_slow_clients: false,
        }
    }
}

impl HubConfig {
    /// Set the per-connection buffer capacity
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Enable or disable slow-client eviction
    pub fn drop_slow_clients(mut self, enabled: bool) -> Self {
        self.drop_slow_clients = enabled;
        self
    }

    /// Check that the values can back a running hub
    pub fn validate(&self) -> crate::Result<()> {
        if self.buffer_capacity == 0 {
            return Err(crate::Error::Config(
                "hub.buffer_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
