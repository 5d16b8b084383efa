//! In-memory table shared by the store implementations
//!
//! `StoreSnapshot` holds domains and subdomains and enforces the row-level
//! invariants (id assignment, (domain, label) uniqueness). Store
//! implementations wrap it in a lock and decide how it is persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::model::{
    Domain, DomainId, DomainUpdate, NewDomain, NewSubdomain, Subdomain, SubdomainId, WorkloadId,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreSnapshot {
    #[serde(default)]
    next_domain_id: DomainId,
    #[serde(default)]
    next_subdomain_id: SubdomainId,
    #[serde(default)]
    domains: BTreeMap<DomainId, Domain>,
    #[serde(default)]
    subdomains: BTreeMap<SubdomainId, Subdomain>,
}

impl StoreSnapshot {
    pub(crate) fn domain(&self, id: DomainId) -> Option<&Domain> {
        self.domains.get(&id)
    }

    pub(crate) fn insert_domain(&mut self, new: NewDomain) -> Domain {
        self.next_domain_id = self.next_domain_id.max(self.max_domain_id()) + 1;
        let domain = Domain {
            id: self.next_domain_id,
            hostname: new.hostname,
            active: new.active,
            zone_id: None,
            mappings: new.mappings,
        };
        self.domains.insert(domain.id, domain.clone());
        domain
    }

    pub(crate) fn delete_domain(&mut self, id: DomainId) -> bool {
        self.domains.remove(&id).is_some()
    }

    pub(crate) fn set_zone_id(&mut self, id: DomainId, zone_id: Option<String>) -> Result<()> {
        let domain = self
            .domains
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("Domain {} not found", id)))?;
        domain.zone_id = zone_id;
        Ok(())
    }

    /// Apply an update; a new hostname clears the cached zone id
    pub(crate) fn update_domain(&mut self, id: DomainId, update: DomainUpdate) -> Result<Domain> {
        let domain = self
            .domains
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("Domain {} not found", id)))?;

        if let Some(hostname) = update.hostname
            && hostname != domain.hostname
        {
            domain.hostname = hostname;
            domain.zone_id = None;
        }
        if let Some(active) = update.active {
            domain.active = active;
        }
        if let Some(mappings) = update.mappings {
            domain.mappings = mappings;
        }

        Ok(domain.clone())
    }

    pub(crate) fn subdomain(&self, id: SubdomainId) -> Option<&Subdomain> {
        self.subdomains.get(&id)
    }

    pub(crate) fn find_by_label(&self, domain_id: DomainId, label: &str) -> Option<&Subdomain> {
        self.subdomains
            .values()
            .find(|s| s.domain_id == domain_id && s.label == label)
    }

    pub(crate) fn list_by_workload(&self, workload_id: WorkloadId) -> Vec<Subdomain> {
        self.subdomains
            .values()
            .filter(|s| s.workload_id == workload_id)
            .cloned()
            .collect()
    }

    pub(crate) fn count_by_workload(&self, workload_id: WorkloadId) -> usize {
        self.subdomains
            .values()
            .filter(|s| s.workload_id == workload_id)
            .count()
    }

    pub(crate) fn count_by_domain(&self, domain_id: DomainId) -> usize {
        self.subdomains
            .values()
            .filter(|s| s.domain_id == domain_id)
            .count()
    }

    /// Insert a row, rejecting a duplicate (domain, label) pair
    pub(crate) fn insert_subdomain(&mut self, new: NewSubdomain) -> Result<Subdomain> {
        if self.find_by_label(new.domain_id, &new.label).is_some() {
            let domain = self
                .domains
                .get(&new.domain_id)
                .map(|d| d.hostname.clone())
                .unwrap_or_else(|| new.domain_id.to_string());
            return Err(Error::LabelConflict {
                domain,
                label: new.label,
            });
        }

        self.next_subdomain_id = self.next_subdomain_id.max(self.max_subdomain_id()) + 1;
        let subdomain = new.into_subdomain(self.next_subdomain_id);
        self.subdomains.insert(subdomain.id, subdomain.clone());
        Ok(subdomain)
    }

    pub(crate) fn delete_subdomain(&mut self, id: SubdomainId) -> bool {
        self.subdomains.remove(&id).is_some()
    }

    pub(crate) fn delete_by_workload(&mut self, workload_id: WorkloadId) -> usize {
        let before = self.subdomains.len();
        self.subdomains.retain(|_, s| s.workload_id != workload_id);
        before - self.subdomains.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.subdomains.len()
    }

    // Guards against hand-edited files whose counters lag behind the rows
    fn max_domain_id(&self) -> DomainId {
        self.domains.keys().next_back().copied().unwrap_or(0)
    }

    fn max_subdomain_id(&self) -> SubdomainId {
        self.subdomains.keys().next_back().copied().unwrap_or(0)
    }
}
