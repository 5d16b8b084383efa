//! Data model for managed domains and provisioned subdomains
//!
//! Domains and their protocol mappings are administrator-owned. Subdomains are
//! owned by a workload's tenant, but every external DNS side-effect for them
//! goes through the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type DomainId = u64;
pub type WorkloadId = u64;
pub type RecipeId = u64;
pub type SubdomainId = u64;
pub type AllocationId = u64;
pub type NodeId = u64;

/// Default SRV priority when a mapping leaves it unset
pub const DEFAULT_PRIORITY: u16 = 1;

/// Default SRV weight when a mapping leaves it unset
pub const DEFAULT_WEIGHT: u16 = 1;

/// Default record TTL in seconds
pub const DEFAULT_TTL: u32 = 120;

/// Transport protocol advertised in SRV records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Transport {
    #[default]
    Tcp,
    Udp,
    Tls,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
            Transport::Tls => "tls",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Transport::Tcp),
            "udp" => Ok(Transport::Udp),
            "tls" => Ok(Transport::Tls),
            other => Err(Error::validation(format!(
                "Protocol type must be tcp, udp or tls (got '{}')",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Transport {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Binds a workload recipe to the record shape used under a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMapping {
    /// Recipe this mapping applies to
    pub recipe_id: RecipeId,

    /// SRV service name; absent means a plain CNAME is provisioned
    #[serde(default, deserialize_with = "deserialize_service")]
    pub service: Option<String>,

    #[serde(default)]
    pub transport: Transport,

    #[serde(default = "default_priority")]
    pub priority: u16,

    #[serde(default = "default_weight")]
    pub weight: u16,

    /// TTL in seconds, applied to every record created under this mapping
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl ProtocolMapping {
    /// A CNAME mapping with default SRV parameters
    pub fn new(recipe_id: RecipeId) -> Self {
        Self {
            recipe_id,
            service: None,
            transport: Transport::Tcp,
            priority: DEFAULT_PRIORITY,
            weight: DEFAULT_WEIGHT,
            ttl: DEFAULT_TTL,
        }
    }

    /// Set the SRV service name (an empty name clears it)
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        let service = service.into();
        let service = service.trim();
        self.service = (!service.is_empty()).then(|| service.to_string());
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Service name, trimmed, treating an empty string as absent
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Validate the mapping's free-form fields
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(service) = self.service() {
            crate::validate::service_name(service)?;
        }
        Ok(())
    }
}

fn deserialize_service<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let service: Option<String> = Option::deserialize(deserializer)?;
    Ok(service
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn default_priority() -> u16 {
    DEFAULT_PRIORITY
}

fn default_weight() -> u16 {
    DEFAULT_WEIGHT
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

/// A parent DNS zone under management
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,

    /// Zone apex hostname (e.g. "play.example.com")
    pub hostname: String,

    pub active: bool,

    /// Provider zone identifier, resolved lazily and reused once known
    #[serde(default)]
    pub zone_id: Option<String>,

    /// Ordered; the first mapping for a recipe wins
    #[serde(default)]
    pub mappings: Vec<ProtocolMapping>,
}

impl Domain {
    /// Fully-qualified name for a label under this domain
    pub fn fqdn(&self, label: &str) -> String {
        format!("{}.{}", label, self.hostname)
    }
}

/// Administrator input for registering a domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDomain {
    pub hostname: String,

    #[serde(default = "default_active")]
    pub active: bool,

    pub mappings: Vec<ProtocolMapping>,
}

impl NewDomain {
    pub fn new(hostname: impl Into<String>, mappings: Vec<ProtocolMapping>) -> Self {
        Self {
            hostname: hostname.into(),
            active: true,
            mappings,
        }
    }
}

fn default_active() -> bool {
    true
}

/// Administrator changes to an existing domain
///
/// Absent fields keep their current value. A hostname change drops the
/// cached zone id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainUpdate {
    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub active: Option<bool>,

    /// Replaces the whole mapping list when present
    #[serde(default)]
    pub mappings: Option<Vec<ProtocolMapping>>,
}

impl DomainUpdate {
    pub fn is_empty(&self) -> bool {
        self.hostname.is_none() && self.active.is_none() && self.mappings.is_none()
    }
}

/// Shape of the primary record behind a subdomain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    Cname,
    Srv,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Cname => "CNAME",
            RecordKind::Srv => "SRV",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provisioned subdomain
///
/// Rows are never mutated after creation; re-pointing is delete + create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subdomain {
    pub id: SubdomainId,
    pub domain_id: DomainId,
    pub workload_id: WorkloadId,

    /// Recipe captured at creation time
    pub recipe_id: RecipeId,

    pub label: String,
    pub kind: RecordKind,

    /// Present iff `kind` is SRV
    pub port: Option<u16>,

    /// Provider record id; absent for legacy or externally-created entries
    pub record_id: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Subdomain row before the store assigns an id and timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubdomain {
    pub domain_id: DomainId,
    pub workload_id: WorkloadId,
    pub recipe_id: RecipeId,
    pub label: String,
    pub kind: RecordKind,
    pub port: Option<u16>,
    pub record_id: Option<String>,
}

impl NewSubdomain {
    /// Materialize the row
    ///
    /// # Visibility
    ///
    /// `pub(crate)` so that only store implementations in this crate mint ids
    /// and timestamps.
    pub(crate) fn into_subdomain(self, id: SubdomainId) -> Subdomain {
        Subdomain {
            id,
            domain_id: self.domain_id,
            workload_id: self.workload_id,
            recipe_id: self.recipe_id,
            label: self.label,
            kind: self.kind,
            port: self.port,
            record_id: self.record_id,
            created_at: chrono::Utc::now(),
        }
    }
}

/// A workload as seen by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub id: WorkloadId,
    pub recipe_id: RecipeId,

    /// Primary network allocation
    pub allocation_id: AllocationId,
}

/// A network allocation bound to a workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,

    /// Raw bound address
    pub ip: String,

    /// Bound port; 0 means unknown
    #[serde(default)]
    pub port: u16,

    /// Explicit alias, assumed to already exist at the provider
    #[serde(default)]
    pub alias: Option<String>,

    #[serde(default)]
    pub node_id: Option<NodeId>,
}

impl Allocation {
    /// Alias, treating an empty string as absent
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }
}

/// Host machine of an allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,

    #[serde(default)]
    pub public_ipv4: Option<String>,
}

/// Where a subdomain should point; derived at provisioning time, never stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTarget {
    /// Hostname alias or literal IP
    pub address: String,

    /// Bound port; 0 when the allocation has none
    pub port: u16,
}

impl NetworkTarget {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// The address parsed as a literal IP, if it is one
    pub fn ip(&self) -> Option<std::net::IpAddr> {
        self.address.parse().ok()
    }
}
