// # Subdomain Store Trait
//
// Defines the interface for local persistence of domains and subdomains.
//
// ## Purpose
//
// The store is the local source of truth for:
// - Managed domains, their protocol mappings and cached zone ids
// - Provisioned subdomains and the provider record ids behind them
//
// ## Implementations
//
// - Memory: `MemoryStore` (tests, ephemeral deployments)
// - File: `FileStore` (JSON with atomic writes)

use async_trait::async_trait;

use crate::model::{
    Domain, DomainId, DomainUpdate, NewDomain, NewSubdomain, Subdomain, SubdomainId, WorkloadId,
};

/// Trait for store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// # Uniqueness
///
/// `insert_subdomain` must reject a second row for the same
/// (domain, label) pair with `Error::LabelConflict`, regardless of what the
/// engine checked beforehand.
#[async_trait]
pub trait SubdomainStore: Send + Sync {
    /// Get a domain by id
    async fn domain(&self, id: DomainId) -> Result<Option<Domain>, crate::Error>;

    /// Persist a new domain and return it with its assigned id
    async fn insert_domain(&self, domain: NewDomain) -> Result<Domain, crate::Error>;

    /// Apply an administrator update and return the stored result
    ///
    /// A changed hostname must clear the cached zone id. Unknown ids fail
    /// with `Error::NotFound`.
    async fn update_domain(
        &self,
        id: DomainId,
        update: DomainUpdate,
    ) -> Result<Domain, crate::Error>;

    /// Delete a domain
    ///
    /// Returns `true` if the domain existed.
    async fn delete_domain(&self, id: DomainId) -> Result<bool, crate::Error>;

    /// Set or clear the cached provider zone id for a domain
    async fn set_zone_id(
        &self,
        id: DomainId,
        zone_id: Option<String>,
    ) -> Result<(), crate::Error>;

    /// Get a subdomain by id
    async fn subdomain(&self, id: SubdomainId) -> Result<Option<Subdomain>, crate::Error>;

    /// Find the subdomain holding a label under a domain
    async fn find_by_label(
        &self,
        domain_id: DomainId,
        label: &str,
    ) -> Result<Option<Subdomain>, crate::Error>;

    /// All subdomains owned by a workload
    async fn list_by_workload(&self, workload_id: WorkloadId)
    -> Result<Vec<Subdomain>, crate::Error>;

    /// Number of subdomains owned by a workload
    async fn count_by_workload(&self, workload_id: WorkloadId) -> Result<usize, crate::Error>;

    /// Number of subdomains under a domain
    async fn count_by_domain(&self, domain_id: DomainId) -> Result<usize, crate::Error>;

    /// Persist a new subdomain row
    async fn insert_subdomain(&self, subdomain: NewSubdomain) -> Result<Subdomain, crate::Error>;

    /// Delete a subdomain row
    ///
    /// Returns `true` if the row existed.
    async fn delete_subdomain(&self, id: SubdomainId) -> Result<bool, crate::Error>;

    /// Delete every subdomain row owned by a workload
    ///
    /// Returns the number of rows removed.
    async fn delete_by_workload(&self, workload_id: WorkloadId) -> Result<usize, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing stores from configuration
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Create a store instance from configuration
    async fn create(
        &self,
        config: &crate::config::StoreConfig,
    ) -> Result<std::sync::Arc<dyn SubdomainStore>, crate::Error>;
}
