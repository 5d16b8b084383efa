//! Subdomain provisioning engine
//!
//! The SubdomainEngine is responsible for:
//! - Deciding the record shape for a workload's network target
//! - Creating provider records in the correct order
//! - Persisting subdomains once every provider call succeeded
//! - Tearing subdomains down, singly or per workload
//!
//! ## Architecture
//!
//! ```text
//!                 ┌────────────────────┐
//!   request ────▶ │  SubdomainEngine   │ ───▶ EngineEvent
//!                 └────────────────────┘
//!                           │
//!        ┌──────────────────┼──────────────────┐
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//! ┌─────────────┐   ┌───────────────┐   ┌─────────────┐
//! │  Inventory  │   │  DnsGateway   │   │ Subdomain   │
//! │  (lookup)   │   │  (records)    │   │ Store       │
//! └─────────────┘   └───────────────┘   └─────────────┘
//! ```
//!
//! ## Provisioning Flow
//!
//! 1. Admission: quota, then (domain, label) uniqueness
//! 2. Plan the records (CNAME, or SRV plus optional A/AAAA)
//! 3. Resolve and cache the zone id
//! 4. Pre-flight collision checks, then create records in plan order
//! 5. Persist the subdomain
//!
//! No step is rolled back. Records created before a later failure are
//! reported through [`EngineEvent::OrphanRisk`].
//!
//! ## Exclusivity
//!
//! Requests are serialized per workload, per (domain, label) and, while the
//! zone id is being resolved, per domain. Locks are always taken in that
//! order.

mod cleanup;
mod domains;
mod locks;
pub mod plan;
mod provision;
mod teardown;

pub use cleanup::CleanupReport;
pub use plan::{RecordPlan, RecordShape, address_cleanup_required};
pub use provision::ProvisionRequest;
pub use teardown::TeardownOutcome;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::model::{Allocation, Domain, DomainId, RecordKind, SubdomainId, WorkloadId};
use crate::traits::{DnsGateway, Inventory, SubdomainStore};
use locks::KeyedLocks;

/// Events emitted by the SubdomainEngine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// All records created and the subdomain persisted
    SubdomainProvisioned {
        subdomain_id: SubdomainId,
        workload_id: WorkloadId,
        fqdn: String,
        kind: RecordKind,
    },

    /// Subdomain row removed
    SubdomainRemoved {
        subdomain_id: SubdomainId,
        workload_id: WorkloadId,
        fqdn: String,
        /// False when a provider call failed or was skipped
        external_cleanup_complete: bool,
    },

    /// Bulk cleanup finished for a workload
    WorkloadCleaned {
        workload_id: WorkloadId,
        rows_removed: usize,
        provider_failures: usize,
    },

    /// Provider records exist that no local subdomain refers to
    OrphanRisk {
        zone_id: String,
        record_ids: Vec<String>,
        reason: String,
    },
}

/// Core subdomain engine
///
/// ## Lifecycle
///
/// 1. Create with [`SubdomainEngine::new()`]
/// 2. Call [`provision`](SubdomainEngine::provision),
///    [`teardown`](SubdomainEngine::teardown) and
///    [`cleanup_workload`](SubdomainEngine::cleanup_workload) as requests arrive
/// 3. Drop the engine; [`flush`](SubdomainEngine::flush) first when the
///    store buffers writes
///
/// ## Threading
///
/// Every operation runs on the caller's task as one sequential chain of
/// provider calls. The engine is `Send + Sync` and is typically shared
/// behind an `Arc`.
pub struct SubdomainEngine {
    /// DNS provider gateway
    gateway: Arc<dyn DnsGateway>,

    /// Local domains and subdomains
    store: Arc<dyn SubdomainStore>,

    /// Workloads, allocations and nodes
    inventory: Arc<dyn Inventory>,

    config: EngineConfig,

    workload_locks: KeyedLocks<WorkloadId>,
    label_locks: KeyedLocks<(DomainId, String)>,
    zone_locks: KeyedLocks<DomainId>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SubdomainEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        gateway: Arc<dyn DnsGateway>,
        store: Arc<dyn SubdomainStore>,
        inventory: Arc<dyn Inventory>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            gateway,
            store,
            inventory,
            config,
            workload_locks: KeyedLocks::new(),
            label_locks: KeyedLocks::new(),
            zone_locks: KeyedLocks::new(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The store this engine persists to
    pub fn store(&self) -> &Arc<dyn SubdomainStore> {
        &self.store
    }

    /// Effective per-workload subdomain limit
    pub fn quota(&self) -> usize {
        self.config.effective_quota()
    }

    /// Flush the store
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }

    /// Zone id for a domain, resolving and caching it on first use
    ///
    /// Concurrent first resolutions for one domain are serialized; the
    /// second caller picks up the cached value instead of asking the
    /// provider again.
    async fn zone_for(&self, domain: &Domain) -> Result<String> {
        if let Some(zone_id) = cached_zone(domain) {
            return Ok(zone_id.to_string());
        }

        let _zone_guard = self.zone_locks.lock(domain.id).await;

        let stored = self.store.domain(domain.id).await?;
        if let Some(zone_id) = stored.as_ref().and_then(cached_zone) {
            debug!("Zone for {} resolved concurrently: {}", domain.hostname, zone_id);
            return Ok(zone_id.to_string());
        }

        // A rename may have landed since the caller read the domain
        let hostname = stored
            .as_ref()
            .map_or(domain.hostname.as_str(), |d| d.hostname.as_str());

        let zone_id = match self.gateway.resolve_zone(hostname).await {
            Ok(Some(zone_id)) => zone_id,
            Ok(None) => {
                warn!("No zone at {} for {}", self.gateway.gateway_name(), hostname);
                return Err(Error::ZoneResolutionFailed(hostname.to_string()));
            }
            Err(e) => {
                warn!("Zone lookup for {} failed: {}", hostname, e);
                return Err(Error::ZoneResolutionFailed(hostname.to_string()));
            }
        };

        if let Err(e) = self.store.set_zone_id(domain.id, Some(zone_id.clone())).await {
            // Next request resolves again; nothing else depends on the cache
            warn!("Failed to cache zone id for {}: {}", hostname, e);
        } else {
            info!("Resolved zone {} for {}", zone_id, hostname);
        }

        Ok(zone_id)
    }

    /// Allocation of a workload, for teardown decisions
    ///
    /// Lookup failures are logged and treated as "no allocation".
    async fn workload_allocation(&self, workload_id: WorkloadId) -> Option<Allocation> {
        let lookup = async {
            match self.inventory.workload(workload_id).await? {
                Some(workload) => self.inventory.allocation(workload.allocation_id).await,
                None => Ok(None),
            }
        };

        match lookup.await {
            Ok(allocation) => allocation,
            Err(e) => {
                warn!("Allocation lookup for workload {} failed: {}", workload_id, e);
                None
            }
        }
    }

    /// Attribute a gateway failure to the gateway
    fn gateway_error(&self, err: Error) -> Error {
        if err.kind() == ErrorKind::Provider {
            err
        } else {
            Error::provider(self.gateway.gateway_name(), err.to_string())
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event receiver dropped, discarding event");
            }
        }
    }
}

fn cached_zone(domain: &Domain) -> Option<&str> {
    domain.zone_id.as_deref().filter(|z| !z.is_empty())
}
