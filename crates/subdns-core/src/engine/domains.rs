use tracing::{info, warn};

use super::SubdomainEngine;
use crate::error::{Error, Result};
use crate::model::{Domain, DomainId, DomainUpdate, NewDomain, ProtocolMapping};
use crate::validate;

impl SubdomainEngine {
    /// Register a parent domain
    ///
    /// The hostname is trimmed and lowercased. Every mapping must name a
    /// known recipe. Zone resolution is attempted once; if it fails the
    /// zone is resolved on first provisioning instead.
    pub async fn register_domain(&self, mut new: NewDomain) -> Result<Domain> {
        new.hostname = normalize_hostname(&new.hostname)?;
        self.check_mappings(&mut new.mappings).await?;

        let mut domain = self.store.insert_domain(new).await?;
        info!("Registered domain {} (id {})", domain.hostname, domain.id);

        match self.zone_for(&domain).await {
            Ok(zone_id) => domain.zone_id = Some(zone_id),
            Err(e) => warn!(
                "Zone for {} not resolved yet, will retry on first use: {}",
                domain.hostname, e
            ),
        }

        Ok(domain)
    }

    /// Change a domain's hostname, availability or mappings
    ///
    /// Fields left as `None` keep their current value; new mappings replace
    /// the old list and go through the same checks as at registration. A
    /// new hostname drops the cached zone id and resolves the zone again,
    /// best-effort.
    ///
    /// # Errors
    ///
    /// - `NotFound`: unknown domain
    /// - `Validation`: bad hostname or mappings
    /// - `DomainInUse`: hostname change while subdomains exist under it
    pub async fn update_domain(
        &self,
        domain_id: DomainId,
        mut update: DomainUpdate,
    ) -> Result<Domain> {
        let current = self
            .store
            .domain(domain_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Domain {}", domain_id)))?;

        if let Some(hostname) = update.hostname.as_deref() {
            let hostname = normalize_hostname(hostname)?;
            update.hostname = (hostname != current.hostname).then_some(hostname);
        }
        if let Some(mappings) = update.mappings.as_mut() {
            self.check_mappings(mappings).await?;
        }

        if update.is_empty() {
            return Ok(current);
        }

        let renamed = update.hostname.is_some();
        if renamed {
            // Existing records live under the old name
            let count = self.store.count_by_domain(domain_id).await?;
            if count > 0 {
                return Err(Error::DomainInUse {
                    domain: current.hostname,
                    count,
                });
            }
        }

        let mut domain = {
            let _zone_guard = self.zone_locks.lock(domain_id).await;
            self.store.update_domain(domain_id, update).await?
        };
        info!(
            "Updated domain {} (id {}, active {}, {} mapping(s))",
            domain.hostname,
            domain.id,
            domain.active,
            domain.mappings.len()
        );

        if renamed {
            info!("Domain {} renamed from {}", domain.hostname, current.hostname);
            match self.zone_for(&domain).await {
                Ok(zone_id) => domain.zone_id = Some(zone_id),
                Err(e) => warn!(
                    "Zone for {} not resolved yet, will retry on first use: {}",
                    domain.hostname, e
                ),
            }
        }

        Ok(domain)
    }

    /// Normalize and check a mapping list against the inventory
    async fn check_mappings(&self, mappings: &mut [ProtocolMapping]) -> Result<()> {
        if mappings.is_empty() {
            return Err(Error::validation("At least one recipe mapping is required"));
        }

        for mapping in mappings.iter_mut() {
            mapping.service = mapping.service().map(str::to_string);
            mapping.validate()?;
            if !self.inventory.recipe_exists(mapping.recipe_id).await? {
                return Err(Error::validation(format!(
                    "Invalid recipe id: {}",
                    mapping.recipe_id
                )));
            }
        }

        Ok(())
    }

    /// Remove a domain that no subdomain refers to
    ///
    /// # Errors
    ///
    /// - `NotFound`: unknown domain
    /// - `DomainInUse`: subdomains still exist under it
    pub async fn remove_domain(&self, domain_id: DomainId) -> Result<Domain> {
        let domain = self
            .store
            .domain(domain_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Domain {}", domain_id)))?;

        let count = self.store.count_by_domain(domain_id).await?;
        if count > 0 {
            return Err(Error::DomainInUse {
                domain: domain.hostname,
                count,
            });
        }

        self.store.delete_domain(domain_id).await?;
        info!("Removed domain {}", domain.hostname);
        Ok(domain)
    }

    /// Forget the cached zone id of a domain
    pub async fn invalidate_zone(&self, domain_id: DomainId) -> Result<()> {
        let _zone_guard = self.zone_locks.lock(domain_id).await;
        self.store.set_zone_id(domain_id, None).await?;
        info!("Invalidated cached zone for domain {}", domain_id);
        Ok(())
    }
}

fn normalize_hostname(raw: &str) -> Result<String> {
    let hostname = raw.trim().to_ascii_lowercase();
    validate::hostname(&hostname)?;
    Ok(hostname)
}
