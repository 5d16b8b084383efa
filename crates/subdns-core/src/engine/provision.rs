use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::plan::RecordPlan;
use super::{EngineEvent, SubdomainEngine};
use crate::error::{Error, Result};
use crate::model::{
    AllocationId, Domain, DomainId, NetworkTarget, NewSubdomain, ProtocolMapping, Subdomain,
    Workload, WorkloadId,
};
use crate::resolver::{resolve_mapping, resolve_target};
use crate::traits::RecordType;
use crate::validate;

/// A tenant's request for a subdomain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub domain_id: DomainId,
    pub workload_id: WorkloadId,

    /// Raw label; trimmed and lowercased before validation
    pub label: String,
}

impl SubdomainEngine {
    /// Provision a subdomain for a workload
    ///
    /// Looks up the domain, workload, mapping and network target, then runs
    /// the same sequence as [`provision_with`](Self::provision_with).
    ///
    /// # Errors
    ///
    /// - `Validation`: malformed label
    /// - `NotAvailable`: domain missing or inactive, or not offered for the
    ///   workload's recipe
    /// - `NotFound`: unknown workload
    /// - `QuotaExceeded`, `LabelConflict`: admission refused, nothing external
    ///   happened
    /// - `AllocationNotFound`, `PortMissing`: target cannot be derived
    /// - `ZoneResolutionFailed`, `RecordExists`, `AddressRecordExists`,
    ///   `AddressRecordCreateFailed`, `Provider`: provider side
    /// - `Persistence`: records were created but the row was not saved
    pub async fn provision(&self, request: ProvisionRequest) -> Result<Subdomain> {
        let label = validate::label(&request.label)?;

        let domain = self
            .store
            .domain(request.domain_id)
            .await?
            .filter(|d| d.active)
            .ok_or_else(|| {
                Error::not_available(format!(
                    "Domain {} not found or inactive",
                    request.domain_id
                ))
            })?;

        let workload = self
            .inventory
            .workload(request.workload_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Workload {}", request.workload_id)))?;

        let mapping = resolve_mapping(&domain.mappings, workload.recipe_id)
            .cloned()
            .ok_or_else(|| {
                Error::not_available(format!(
                    "Domain {} is not available for recipe {}",
                    domain.hostname, workload.recipe_id
                ))
            })?;

        let _workload_guard = self.workload_locks.lock(workload.id).await;
        let _label_guard = self.label_locks.lock((domain.id, label.clone())).await;

        self.check_admission(&domain, workload.id, &label).await?;

        let (allocation, target) =
            resolve_target(self.inventory.as_ref(), workload.allocation_id).await?;

        self.create_locked(&domain, &workload, &label, &mapping, &target, allocation.id)
            .await
    }

    /// Provision with an already-resolved domain, mapping and target
    ///
    /// The label is still normalized and validated, and the mapping's
    /// service name checked.
    pub async fn provision_with(
        &self,
        domain: &Domain,
        workload: &Workload,
        label: &str,
        mapping: &ProtocolMapping,
        target: &NetworkTarget,
    ) -> Result<Subdomain> {
        let label = validate::label(label)?;
        mapping.validate()?;

        if !domain.active {
            return Err(Error::not_available(format!(
                "Domain {} is inactive",
                domain.hostname
            )));
        }

        let _workload_guard = self.workload_locks.lock(workload.id).await;
        let _label_guard = self.label_locks.lock((domain.id, label.clone())).await;

        self.check_admission(domain, workload.id, &label).await?;

        self.create_locked(domain, workload, &label, mapping, target, workload.allocation_id)
            .await
    }

    /// Quota, then local uniqueness
    ///
    /// Must run under the workload and label locks.
    async fn check_admission(&self, domain: &Domain, workload_id: WorkloadId, label: &str) -> Result<()> {
        let limit = self.quota();
        let held = self.store.count_by_workload(workload_id).await?;
        if held >= limit {
            debug!("Workload {} holds {} subdomain(s), limit {}", workload_id, held, limit);
            return Err(Error::QuotaExceeded { limit });
        }

        if self.store.find_by_label(domain.id, label).await?.is_some() {
            return Err(Error::LabelConflict {
                domain: domain.hostname.clone(),
                label: label.to_string(),
            });
        }

        Ok(())
    }

    /// Provider calls and persistence
    ///
    /// Must run under the workload and label locks, after admission.
    async fn create_locked(
        &self,
        domain: &Domain,
        workload: &Workload,
        label: &str,
        mapping: &ProtocolMapping,
        target: &NetworkTarget,
        allocation_id: AllocationId,
    ) -> Result<Subdomain> {
        let plan = RecordPlan::build(domain, label, mapping, target, allocation_id)?;
        let zone_id = self.zone_for(domain).await?;

        let primary = plan.primary_spec();
        if !self.is_absent(&zone_id, primary.record_type(), primary.name()).await? {
            return Err(Error::RecordExists {
                record_type: primary.record_type().to_string(),
                name: primary.name().to_string(),
            });
        }

        let mut created = Vec::new();

        if let Some(address) = plan.address_spec() {
            if !self.is_absent(&zone_id, address.record_type(), address.name()).await? {
                return Err(Error::AddressRecordExists {
                    record_type: address.record_type().to_string(),
                    name: address.name().to_string(),
                });
            }

            let address_id = self
                .gateway
                .create_record(&zone_id, &address)
                .await
                .map_err(|e| Error::AddressRecordCreateFailed(e.to_string()))?;
            debug!(
                "Created {} record {} at {}",
                address.record_type(),
                address_id,
                address.name()
            );
            created.push(address_id);
        }

        let record_id = match self.gateway.create_record(&zone_id, &primary).await {
            Ok(record_id) => record_id,
            Err(e) => {
                if !created.is_empty() {
                    self.report_orphans(&zone_id, created, format!("{} creation failed", primary.record_type()));
                }
                return Err(self.gateway_error(e));
            }
        };
        info!(
            "Created {} record {} at {}",
            primary.record_type(),
            record_id,
            primary.name()
        );
        created.push(record_id.clone());

        let row = NewSubdomain {
            domain_id: domain.id,
            workload_id: workload.id,
            recipe_id: workload.recipe_id,
            label: label.to_string(),
            kind: plan.kind(),
            port: plan.port(),
            record_id: Some(record_id),
        };

        match self.store.insert_subdomain(row).await {
            Ok(subdomain) => {
                info!(
                    "Provisioned {} ({}) for workload {}",
                    plan.fqdn(),
                    subdomain.kind,
                    workload.id
                );
                self.emit_event(EngineEvent::SubdomainProvisioned {
                    subdomain_id: subdomain.id,
                    workload_id: workload.id,
                    fqdn: plan.fqdn().to_string(),
                    kind: subdomain.kind,
                });
                Ok(subdomain)
            }
            Err(e) => {
                error!(
                    "Records for {} were created but the subdomain was not saved: {}",
                    plan.fqdn(),
                    e
                );
                self.report_orphans(&zone_id, created, format!("persisting {} failed", plan.fqdn()));
                Err(match e {
                    Error::LabelConflict { .. } | Error::Persistence(_) => e,
                    other => Error::persistence(other.to_string()),
                })
            }
        }
    }

    /// Pre-flight collision check
    async fn is_absent(&self, zone_id: &str, record_type: RecordType, name: &str) -> Result<bool> {
        self.gateway
            .record_absent(zone_id, record_type, name)
            .await
            .map_err(|e| self.gateway_error(e))
    }

    fn report_orphans(&self, zone_id: &str, record_ids: Vec<String>, reason: String) {
        warn!(
            "Orphaned provider record(s) in zone {}: {:?} ({})",
            zone_id, record_ids, reason
        );
        self.emit_event(EngineEvent::OrphanRisk {
            zone_id: zone_id.to_string(),
            record_ids,
            reason,
        });
    }
}
