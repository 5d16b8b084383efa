//! Configuration types for the subdomain engine
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubdnsConfig {
    /// DNS gateway configuration
    pub gateway: GatewayConfig,

    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SubdnsConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.gateway.validate()?;
        self.store.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// DNS gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayConfig {
    /// Bunny DNS
    Bunny {
        /// Bunny account API key
        api_key: String,
        /// API base URL override (defaults to the public endpoint)
        #[serde(default)]
        base_url: Option<String>,
        /// Per-request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom gateway
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl GatewayConfig {
    /// Validate the gateway configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            GatewayConfig::Bunny {
                api_key,
                timeout_secs,
                ..
            } => {
                if api_key.trim().is_empty() {
                    return Err(crate::Error::config("Bunny DNS API key cannot be empty"));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Gateway timeout must be > 0"));
                }
                Ok(())
            }
            GatewayConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom gateway factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom gateway config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the gateway type name
    pub fn type_name(&self) -> &str {
        match self {
            GatewayConfig::Bunny { .. } => "bunny",
            GatewayConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig::Bunny {
            api_key: String::new(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// JSON file store
    File {
        /// Path to the store file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.is_empty() => {
                Err(crate::Error::config("File store path cannot be empty"))
            }
            StoreConfig::Custom { factory, .. } if factory.is_empty() => {
                Err(crate::Error::config("Custom store factory cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::File { .. } => "file",
            StoreConfig::Memory => "memory",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of subdomains a single workload may hold
    ///
    /// Values below 1 are treated as 1.
    #[serde(default = "default_max_subdomains_per_workload")]
    pub max_subdomains_per_workload: usize,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Quota actually enforced (never below 1)
    pub fn effective_quota(&self) -> usize {
        self.max_subdomains_per_workload.max(1)
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_subdomains_per_workload: default_max_subdomains_per_workload(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_subdomains_per_workload() -> usize {
    1
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_quota_floor() {
        let config = EngineConfig {
            max_subdomains_per_workload: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.effective_quota(), 1);

        let config = EngineConfig {
            max_subdomains_per_workload: 5,
            ..EngineConfig::default()
        };
        assert_eq!(config.effective_quota(), 5);
    }

    #[test]
    fn test_gateway_config_from_json() {
        let config: SubdnsConfig = serde_json::from_value(serde_json::json!({
            "gateway": { "type": "bunny", "api_key": "key" },
            "store": { "type": "file", "path": "/var/lib/subdns/state.json" }
        }))
        .unwrap();

        assert_eq!(config.gateway.type_name(), "bunny");
        assert_eq!(config.store.type_name(), "file");
        assert_eq!(config.engine.effective_quota(), 1);
        assert!(config.validate().is_ok());

        match config.gateway {
            GatewayConfig::Bunny { timeout_secs, .. } => assert_eq!(timeout_secs, 15),
            other => panic!("unexpected gateway config: {:?}", other),
        }
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let config = SubdnsConfig::default();
        assert!(config.validate().is_err());
    }
}
