use serde::Serialize;
use tracing::{debug, info, warn};

use super::plan::{RecordShape, address_cleanup_required};
use super::{EngineEvent, SubdomainEngine};
use crate::error::{Error, Result};
use crate::model::{Allocation, Domain, ProtocolMapping, RecordKind, Subdomain, SubdomainId, WorkloadId};
use crate::resolver::resolve_mapping;
use crate::traits::RecordType;

/// Result of removing one subdomain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownOutcome {
    /// The removed row
    pub subdomain: Subdomain,

    /// False when a provider call failed or had to be skipped; the local
    /// row is gone either way
    pub external_cleanup_complete: bool,
}

impl SubdomainEngine {
    /// Remove one of a workload's subdomains
    ///
    /// Provider records are deleted best-effort; the local row is removed
    /// even if the provider is unreachable.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such subdomain for this workload, or its domain is gone
    /// - `Persistence`: the row could not be deleted
    pub async fn teardown(
        &self,
        workload_id: WorkloadId,
        subdomain_id: SubdomainId,
    ) -> Result<TeardownOutcome> {
        let _workload_guard = self.workload_locks.lock(workload_id).await;

        let subdomain = self
            .store
            .subdomain(subdomain_id)
            .await?
            .filter(|s| s.workload_id == workload_id)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Subdomain {} of workload {}",
                    subdomain_id, workload_id
                ))
            })?;

        let domain = self
            .store
            .domain(subdomain.domain_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Domain {}", subdomain.domain_id)))?;

        let mapping = resolve_mapping(&domain.mappings, subdomain.recipe_id);
        let allocation = self.workload_allocation(workload_id).await;

        self.teardown_locked(subdomain, &domain, mapping, allocation.as_ref())
            .await
    }

    /// Remove a subdomain with caller-supplied context
    ///
    /// `mapping` is needed to rebuild SRV names when no record id was
    /// stored; `allocation` decides whether A/AAAA records are cleaned up.
    pub async fn teardown_with(
        &self,
        subdomain: Subdomain,
        domain: &Domain,
        mapping: Option<&ProtocolMapping>,
        allocation: Option<&Allocation>,
    ) -> Result<TeardownOutcome> {
        let _workload_guard = self.workload_locks.lock(subdomain.workload_id).await;
        self.teardown_locked(subdomain, domain, mapping, allocation).await
    }

    async fn teardown_locked(
        &self,
        subdomain: Subdomain,
        domain: &Domain,
        mapping: Option<&ProtocolMapping>,
        allocation: Option<&Allocation>,
    ) -> Result<TeardownOutcome> {
        let complete = self
            .remove_external(&subdomain, domain, mapping, allocation)
            .await;

        if !self.store.delete_subdomain(subdomain.id).await? {
            debug!("Subdomain {} was already removed", subdomain.id);
        }

        let fqdn = domain.fqdn(&subdomain.label);
        info!("Removed subdomain {} (workload {})", fqdn, subdomain.workload_id);
        self.emit_event(EngineEvent::SubdomainRemoved {
            subdomain_id: subdomain.id,
            workload_id: subdomain.workload_id,
            fqdn,
            external_cleanup_complete: complete,
        });

        Ok(TeardownOutcome {
            subdomain,
            external_cleanup_complete: complete,
        })
    }

    /// Delete the provider records behind a subdomain
    ///
    /// Never fails; returns whether every required call succeeded. A record
    /// that is already gone counts as success.
    pub(super) async fn remove_external(
        &self,
        subdomain: &Subdomain,
        domain: &Domain,
        mapping: Option<&ProtocolMapping>,
        allocation: Option<&Allocation>,
    ) -> bool {
        let zone_id = match self.zone_for(domain).await {
            Ok(zone_id) => zone_id,
            Err(e) => {
                warn!(
                    "Skipping provider cleanup for {}: {}",
                    domain.fqdn(&subdomain.label),
                    e
                );
                return false;
            }
        };

        let fqdn = domain.fqdn(&subdomain.label);
        let mut complete = true;

        match &subdomain.record_id {
            Some(record_id) => match self.gateway.delete_record(&zone_id, record_id).await {
                Ok(true) => debug!("Deleted record {} for {}", record_id, fqdn),
                Ok(false) => debug!("Record {} for {} was already gone", record_id, fqdn),
                Err(e) => {
                    warn!("Failed to delete record {} for {}: {}", record_id, fqdn, e);
                    complete = false;
                }
            },
            None => match RecordShape::reconstruct(subdomain.kind, mapping) {
                Some(shape) => {
                    let name = shape.record_name(&fqdn);
                    complete &= self
                        .delete_by_name(&zone_id, shape.record_type(), &name)
                        .await;
                }
                None => {
                    warn!(
                        "Cannot rebuild the SRV name for {} without a service mapping; skipping",
                        fqdn
                    );
                    complete = false;
                }
            },
        }

        if subdomain.kind == RecordKind::Srv && address_cleanup_required(allocation) {
            for record_type in [RecordType::A, RecordType::Aaaa] {
                complete &= self.delete_by_name(&zone_id, record_type, &fqdn).await;
            }
        }

        complete
    }

    async fn delete_by_name(&self, zone_id: &str, record_type: RecordType, name: &str) -> bool {
        match self
            .gateway
            .delete_record_by_name(zone_id, record_type, name)
            .await
        {
            Ok(deleted) => {
                debug!("Delete {} {}: {}", record_type, name, if deleted { "removed" } else { "none found" });
                true
            }
            Err(e) => {
                warn!("Failed to delete {} record {}: {}", record_type, name, e);
                false
            }
        }
    }
}
