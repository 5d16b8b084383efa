use serde::Serialize;
use tracing::{info, warn};

use super::{EngineEvent, SubdomainEngine};
use crate::model::WorkloadId;
use crate::resolver::resolve_mapping;

/// Summary of a bulk cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub workload_id: WorkloadId,

    /// Subdomains found for the workload
    pub subdomains: usize,

    /// Subdomains whose provider cleanup failed or was skipped
    pub provider_failures: usize,

    /// Local rows deleted
    pub rows_removed: usize,
}

impl SubdomainEngine {
    /// Remove every subdomain of a decommissioned workload
    ///
    /// Best-effort: provider and store failures are logged and counted,
    /// never returned. Local rows are removed in one operation after all
    /// provider calls, whatever their outcome.
    pub async fn cleanup_workload(&self, workload_id: WorkloadId) -> CleanupReport {
        let _workload_guard = self.workload_locks.lock(workload_id).await;

        let mut report = CleanupReport {
            workload_id,
            ..CleanupReport::default()
        };

        let subdomains = match self.store.list_by_workload(workload_id).await {
            Ok(subdomains) => subdomains,
            Err(e) => {
                warn!("Failed to list subdomains of workload {}: {}", workload_id, e);
                Vec::new()
            }
        };
        report.subdomains = subdomains.len();

        if !subdomains.is_empty() {
            let allocation = self.workload_allocation(workload_id).await;

            for subdomain in &subdomains {
                let domain = match self.store.domain(subdomain.domain_id).await {
                    Ok(Some(domain)) => domain,
                    Ok(None) => {
                        warn!(
                            "Domain {} of subdomain {} is gone; skipping provider cleanup",
                            subdomain.domain_id, subdomain.id
                        );
                        report.provider_failures += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!("Failed to load domain {}: {}", subdomain.domain_id, e);
                        report.provider_failures += 1;
                        continue;
                    }
                };

                let mapping = resolve_mapping(&domain.mappings, subdomain.recipe_id);
                if !self
                    .remove_external(subdomain, &domain, mapping, allocation.as_ref())
                    .await
                {
                    report.provider_failures += 1;
                }
            }
        }

        report.rows_removed = match self.store.delete_by_workload(workload_id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Failed to delete subdomains of workload {}: {}", workload_id, e);
                0
            }
        };

        info!(
            "Cleaned up workload {}: {} row(s) removed, {} provider failure(s)",
            workload_id, report.rows_removed, report.provider_failures
        );
        self.emit_event(EngineEvent::WorkloadCleaned {
            workload_id,
            rows_removed: report.rows_removed,
            provider_failures: report.provider_failures,
        });

        report
    }
}
