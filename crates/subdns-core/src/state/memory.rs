// # Memory Store
//
// In-memory implementation of SubdomainStore.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing and for embedding the engine behind a host that owns
// its own persistence.
//
// ## Crash Behavior
//
// - All domains and subdomains are lost on restart/crash
// - Provider-side records survive and become orphans unless cleaned up

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::snapshot::StoreSnapshot;
use crate::Error;
use crate::config::StoreConfig;
use crate::model::{
    Domain, DomainId, DomainUpdate, NewDomain, NewSubdomain, Subdomain, SubdomainId, WorkloadId,
};
use crate::traits::{StoreFactory, SubdomainStore};

/// In-memory store implementation
///
/// # Example
///
/// ```rust,no_run
/// use subdns_core::model::{NewDomain, ProtocolMapping};
/// use subdns_core::state::MemoryStore;
/// use subdns_core::traits::SubdomainStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///     let domain = store
///         .insert_domain(NewDomain::new("play.example.com", vec![ProtocolMapping::new(1)]))
///         .await?;
///     assert_eq!(store.domain(domain.id).await?, Some(domain));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreSnapshot>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subdomain rows in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store holds no subdomains
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SubdomainStore for MemoryStore {
    async fn domain(&self, id: DomainId) -> Result<Option<Domain>, Error> {
        Ok(self.inner.read().await.domain(id).cloned())
    }

    async fn insert_domain(&self, domain: NewDomain) -> Result<Domain, Error> {
        Ok(self.inner.write().await.insert_domain(domain))
    }

    async fn update_domain(&self, id: DomainId, update: DomainUpdate) -> Result<Domain, Error> {
        self.inner.write().await.update_domain(id, update)
    }

    async fn delete_domain(&self, id: DomainId) -> Result<bool, Error> {
        Ok(self.inner.write().await.delete_domain(id))
    }

    async fn set_zone_id(&self, id: DomainId, zone_id: Option<String>) -> Result<(), Error> {
        self.inner.write().await.set_zone_id(id, zone_id)
    }

    async fn subdomain(&self, id: SubdomainId) -> Result<Option<Subdomain>, Error> {
        Ok(self.inner.read().await.subdomain(id).cloned())
    }

    async fn find_by_label(
        &self,
        domain_id: DomainId,
        label: &str,
    ) -> Result<Option<Subdomain>, Error> {
        Ok(self.inner.read().await.find_by_label(domain_id, label).cloned())
    }

    async fn list_by_workload(&self, workload_id: WorkloadId) -> Result<Vec<Subdomain>, Error> {
        Ok(self.inner.read().await.list_by_workload(workload_id))
    }

    async fn count_by_workload(&self, workload_id: WorkloadId) -> Result<usize, Error> {
        Ok(self.inner.read().await.count_by_workload(workload_id))
    }

    async fn count_by_domain(&self, domain_id: DomainId) -> Result<usize, Error> {
        Ok(self.inner.read().await.count_by_domain(domain_id))
    }

    async fn insert_subdomain(&self, subdomain: NewSubdomain) -> Result<Subdomain, Error> {
        self.inner.write().await.insert_subdomain(subdomain)
    }

    async fn delete_subdomain(&self, id: SubdomainId) -> Result<bool, Error> {
        Ok(self.inner.write().await.delete_subdomain(id))
    }

    async fn delete_by_workload(&self, workload_id: WorkloadId) -> Result<usize, Error> {
        Ok(self.inner.write().await.delete_by_workload(workload_id))
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}

/// Factory for in-memory stores
pub struct MemoryStoreFactory;

#[async_trait]
impl StoreFactory for MemoryStoreFactory {
    async fn create(&self, _config: &StoreConfig) -> Result<Arc<dyn SubdomainStore>, Error> {
        Ok(Arc::new(MemoryStore::new()))
    }
}
