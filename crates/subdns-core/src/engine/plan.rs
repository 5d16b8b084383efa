//! Record shape decisions
//!
//! A [`RecordPlan`] is computed once per provisioning request and says
//! exactly which records will be created, and in which order. Teardown uses
//! [`RecordShape`] to rebuild the same record names from what was stored.

use std::net::IpAddr;

use crate::error::{Error, Result};
use crate::model::{
    Allocation, AllocationId, Domain, NetworkTarget, ProtocolMapping, RecordKind, Transport,
};
use crate::traits::{RecordSpec, RecordType};

/// Naming-relevant part of a record, recoverable from a stored subdomain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordShape {
    /// CNAME at `<label>.<domain>`
    Alias,
    /// SRV at `<service>._<transport>.<label>.<domain>`
    Service { service: String, transport: Transport },
}

impl RecordShape {
    /// Mappings with a service name yield SRV records, all others CNAME
    pub fn from_mapping(mapping: &ProtocolMapping) -> Self {
        match mapping.service() {
            Some(service) => RecordShape::Service {
                service: service.to_string(),
                transport: mapping.transport,
            },
            None => RecordShape::Alias,
        }
    }

    /// Rebuild the shape of a stored record
    ///
    /// SRV names cannot be rebuilt without the mapping's service name;
    /// `None` is returned in that case.
    pub fn reconstruct(kind: RecordKind, mapping: Option<&ProtocolMapping>) -> Option<Self> {
        match kind {
            RecordKind::Cname => Some(RecordShape::Alias),
            RecordKind::Srv => {
                let mapping = mapping?;
                let service = mapping.service()?;
                Some(RecordShape::Service {
                    service: service.to_string(),
                    transport: mapping.transport,
                })
            }
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            RecordShape::Alias => RecordKind::Cname,
            RecordShape::Service { .. } => RecordKind::Srv,
        }
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            RecordShape::Alias => RecordType::Cname,
            RecordShape::Service { .. } => RecordType::Srv,
        }
    }

    /// Fully-qualified name of the record for a subdomain FQDN
    pub fn record_name(&self, fqdn: &str) -> String {
        match self {
            RecordShape::Alias => fqdn.to_string(),
            RecordShape::Service { service, transport } => {
                format!("{}._{}.{}", service, transport, fqdn)
            }
        }
    }
}

/// The records a provisioning request will create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPlan {
    /// One CNAME pointing at the target address
    Alias {
        fqdn: String,
        target: String,
        ttl: u32,
    },

    /// One SRV record, preceded by an address record when the target is a
    /// literal IP
    Service {
        fqdn: String,
        service: String,
        transport: Transport,
        /// IP to publish at `fqdn` before the SRV record
        address: Option<IpAddr>,
        /// SRV target host: `fqdn` when `address` is set, else the alias
        target: String,
        port: u16,
        priority: u16,
        weight: u16,
        ttl: u32,
    },
}

impl RecordPlan {
    /// Decide the records for `label` under `domain`
    ///
    /// # Errors
    ///
    /// `Error::PortMissing` for SRV plans whose target has no port. This is
    /// checked here so that no provider call is made for such a request.
    pub fn build(
        domain: &Domain,
        label: &str,
        mapping: &ProtocolMapping,
        target: &NetworkTarget,
        allocation_id: AllocationId,
    ) -> Result<Self> {
        let fqdn = domain.fqdn(label);

        match RecordShape::from_mapping(mapping) {
            RecordShape::Alias => Ok(RecordPlan::Alias {
                fqdn,
                target: target.address.clone(),
                ttl: mapping.ttl,
            }),
            RecordShape::Service { service, transport } => {
                if target.port == 0 {
                    return Err(Error::PortMissing(allocation_id));
                }

                let address = target.ip();
                let srv_target = match address {
                    Some(_) => fqdn.clone(),
                    None => target.address.clone(),
                };

                Ok(RecordPlan::Service {
                    fqdn,
                    service,
                    transport,
                    address,
                    target: srv_target,
                    port: target.port,
                    priority: mapping.priority,
                    weight: mapping.weight,
                    ttl: mapping.ttl,
                })
            }
        }
    }

    pub fn fqdn(&self) -> &str {
        match self {
            RecordPlan::Alias { fqdn, .. } | RecordPlan::Service { fqdn, .. } => fqdn,
        }
    }

    pub fn shape(&self) -> RecordShape {
        match self {
            RecordPlan::Alias { .. } => RecordShape::Alias,
            RecordPlan::Service {
                service, transport, ..
            } => RecordShape::Service {
                service: service.clone(),
                transport: *transport,
            },
        }
    }

    pub fn kind(&self) -> RecordKind {
        self.shape().kind()
    }

    /// Port to store with the subdomain; SRV only
    pub fn port(&self) -> Option<u16> {
        match self {
            RecordPlan::Alias { .. } => None,
            RecordPlan::Service { port, .. } => Some(*port),
        }
    }

    /// Address record to create first, if any
    pub fn address_spec(&self) -> Option<RecordSpec> {
        match self {
            RecordPlan::Service {
                fqdn,
                address: Some(ip),
                ttl,
                ..
            } => Some(RecordSpec::simple(
                RecordType::for_ip(ip),
                fqdn.clone(),
                ip.to_string(),
                *ttl,
            )),
            _ => None,
        }
    }

    /// The CNAME or SRV record the subdomain is stored against
    pub fn primary_spec(&self) -> RecordSpec {
        match self {
            RecordPlan::Alias { fqdn, target, ttl } => {
                RecordSpec::simple(RecordType::Cname, fqdn.clone(), target.clone(), *ttl)
            }
            RecordPlan::Service {
                fqdn,
                service,
                transport,
                target,
                port,
                priority,
                weight,
                ttl,
                ..
            } => RecordSpec::Service {
                name: self.shape().record_name(fqdn),
                ttl: *ttl,
                service: service.clone(),
                transport: *transport,
                host: fqdn.clone(),
                priority: *priority,
                weight: *weight,
                port: *port,
                target: target.clone(),
            },
        }
    }
}

/// Whether teardown of an SRV subdomain should also remove A/AAAA records
///
/// An address record was plausibly created when the allocation has no
/// alias or its alias is itself a literal IP. A missing allocation counts
/// as having no alias.
pub fn address_cleanup_required(allocation: Option<&Allocation>) -> bool {
    match allocation.and_then(Allocation::alias) {
        None => true,
        Some(alias) => alias.parse::<IpAddr>().is_ok(),
    }
}
