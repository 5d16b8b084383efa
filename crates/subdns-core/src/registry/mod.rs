//! Plugin-based component registry
//!
//! The registry allows DNS gateways and subdomain stores to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use subdns_core::registry::Registry;
//! use subdns_core::config::GatewayConfig;
//!
//! let registry = Registry::new();
//! subdns_core::state::register(&registry);
//! subdns_provider_bunny::register(&registry);
//!
//! let gateway = registry.create_gateway(&GatewayConfig::Bunny { .. })?;
//! ```
//!
//! ## Registration
//!
//! Implementations register themselves during initialization:
//!
//! ```rust,ignore
//! // In subdns-provider-bunny
//! pub fn register(registry: &Registry) {
//!     registry.register_gateway("bunny", Box::new(BunnyGatewayFactory));
//! }
//! ```

use crate::config::{GatewayConfig, StoreConfig};
use crate::error::{Error, Result};
use crate::traits::{DnsGateway, DnsGatewayFactory, StoreFactory, SubdomainStore};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of gateway and store factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes. A poisoned lock is recovered rather than
/// propagated; the maps hold no invariants a panicking writer could break.
#[derive(Default)]
pub struct Registry {
    /// Registered DNS gateway factories
    gateways: RwLock<HashMap<String, Box<dyn DnsGatewayFactory>>>,

    /// Registered store factories
    stores: RwLock<HashMap<String, Arc<dyn StoreFactory>>>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS gateway factory
    ///
    /// # Parameters
    ///
    /// - `name`: Gateway type name (e.g., "bunny")
    /// - `factory`: Factory object for creating gateway instances
    pub fn register_gateway(&self, name: impl Into<String>, factory: Box<dyn DnsGatewayFactory>) {
        let mut gateways = self.gateways.write().unwrap_or_else(PoisonError::into_inner);
        gateways.insert(name.into(), factory);
    }

    /// Register a store factory
    ///
    /// # Parameters
    ///
    /// - `name`: Store type name (e.g., "file", "memory")
    /// - `factory`: Factory object for creating store instances
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn StoreFactory>) {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), Arc::from(factory));
    }

    /// Create a DNS gateway from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsGateway>)`: Created gateway instance
    /// - `Err(Error)`: If the gateway type is not registered or creation fails
    pub fn create_gateway(&self, config: &GatewayConfig) -> Result<Box<dyn DnsGateway>> {
        let gateway_type = config.type_name();
        let gateways = self.gateways.read().unwrap_or_else(PoisonError::into_inner);

        let factory = gateways
            .get(gateway_type)
            .ok_or_else(|| Error::config(format!("Unknown gateway type: {}", gateway_type)))?;

        factory.create(config)
    }

    /// Create a store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn SubdomainStore>)`: Created store instance
    /// - `Err(Error)`: If the store type is not registered or creation fails
    pub async fn create_store(&self, config: &StoreConfig) -> Result<Arc<dyn SubdomainStore>> {
        let store_type = config.type_name();

        let factory = {
            let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
            stores
                .get(store_type)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown store type: {}", store_type)))?
        };

        // Lock released before awaiting the factory
        factory.create(config).await
    }

    /// List all registered gateway types
    pub fn list_gateways(&self) -> Vec<String> {
        let gateways = self.gateways.read().unwrap_or_else(PoisonError::into_inner);
        gateways.keys().cloned().collect()
    }

    /// List all registered store types
    pub fn list_stores(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.keys().cloned().collect()
    }

    /// Check if a gateway type is registered
    pub fn has_gateway(&self, name: &str) -> bool {
        let gateways = self.gateways.read().unwrap_or_else(PoisonError::into_inner);
        gateways.contains_key(name)
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockGatewayFactory;

    impl DnsGatewayFactory for MockGatewayFactory {
        fn create(&self, _config: &GatewayConfig) -> Result<Box<dyn DnsGateway>> {
            Err(Error::not_found("Mock gateway not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = Registry::new();

        assert!(!registry.has_gateway("mock"));

        registry.register_gateway("mock", Box::new(MockGatewayFactory));

        assert!(registry.has_gateway("mock"));
        assert!(registry.list_gateways().contains(&"mock".to_string()));
    }

    #[test]
    fn test_unknown_gateway_type() {
        let registry = Registry::new();
        let err = registry
            .create_gateway(&GatewayConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_builtin_stores() {
        let registry = Registry::new();
        crate::state::register(&registry);

        assert!(registry.has_store("memory"));
        assert!(registry.has_store("file"));

        let store = registry.create_store(&StoreConfig::Memory).await.unwrap();
        assert_eq!(store.count_by_workload(1).await.unwrap(), 0);

        let err = registry
            .create_store(&StoreConfig::Custom {
                factory: "redis".to_string(),
                config: serde_json::json!({}),
            })
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
