// # DNS Gateway Trait
//
// Defines the typed interface to an external DNS provider's zone/record API.
//
// ## Implementations
//
// - Bunny DNS: `subdns-provider-bunny` crate
//
// ## Usage
//
// ```rust,ignore
// use subdns_core::traits::{DnsGateway, RecordSpec, RecordType};
//
// let zone_id = gateway.resolve_zone("example.com").await?.expect("zone exists");
// if gateway.record_absent(&zone_id, RecordType::Cname, "mc.example.com").await? {
//     let spec = RecordSpec::simple(RecordType::Cname, "mc.example.com", "node1.example.net", 120);
//     let record_id = gateway.create_record(&zone_id, &spec).await?;
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::Transport;

/// DNS record types the engine creates or deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Srv,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Srv => "SRV",
        }
    }

    /// Address record type matching an IP's version
    pub fn for_ip(ip: &std::net::IpAddr) -> Self {
        match ip {
            std::net::IpAddr::V4(_) => RecordType::A,
            std::net::IpAddr::V6(_) => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of a record to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSpec {
    /// CNAME, A or AAAA
    Simple {
        record_type: RecordType,
        /// Fully-qualified record name
        name: String,
        content: String,
        ttl: u32,
    },

    /// SRV record for `<service>._<transport>.<host>`
    Service {
        /// Fully-qualified record name
        name: String,
        ttl: u32,
        service: String,
        transport: Transport,
        /// `label.domain` the service is advertised under
        host: String,
        priority: u16,
        weight: u16,
        port: u16,
        /// Hostname clients connect to
        target: String,
    },
}

impl RecordSpec {
    pub fn simple(
        record_type: RecordType,
        name: impl Into<String>,
        content: impl Into<String>,
        ttl: u32,
    ) -> Self {
        RecordSpec::Simple {
            record_type,
            name: name.into(),
            content: content.into(),
            ttl,
        }
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            RecordSpec::Simple { record_type, .. } => *record_type,
            RecordSpec::Service { .. } => RecordType::Srv,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RecordSpec::Simple { name, .. } | RecordSpec::Service { name, .. } => name,
        }
    }
}

/// Trait for DNS provider gateways
///
/// A gateway is a thin typed client: one logical provider call per method,
/// no retries, no caching beyond the request. Ordering, collision checks and
/// zone-id memoization are owned by the engine.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Errors
///
/// Network failures, timeouts and non-2xx responses are returned as
/// `Err`. A timeout is a call failure like any other and is not retried.
#[async_trait]
pub trait DnsGateway: Send + Sync {
    /// Resolve a zone id by exact hostname match against the provider's zones
    ///
    /// # Returns
    ///
    /// - `Ok(Some(id))`: Zone found
    /// - `Ok(None)`: No zone with this hostname
    /// - `Err(Error)`: The lookup failed
    async fn resolve_zone(&self, hostname: &str) -> Result<Option<String>, crate::Error>;

    /// Check that no record of this type and name exists
    ///
    /// Returns `true` only when the provider reports zero matches.
    async fn record_absent(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
    ) -> Result<bool, crate::Error>;

    /// Create a record and return its provider id
    async fn create_record(&self, zone_id: &str, spec: &RecordSpec)
    -> Result<String, crate::Error>;

    /// Delete a record by provider id
    ///
    /// Returns `false` when the provider reports nothing was deleted.
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool, crate::Error>;

    /// Delete the first record matching type and name
    ///
    /// Returns `false` when no record matched.
    async fn delete_record_by_name(
        &self,
        zone_id: &str,
        record_type: RecordType,
        name: &str,
    ) -> Result<bool, crate::Error>;

    /// Gateway name (for logging/debugging)
    fn gateway_name(&self) -> &'static str;
}

/// Helper trait for constructing gateways from configuration
pub trait DnsGatewayFactory: Send + Sync {
    /// Create a gateway instance from configuration
    fn create(
        &self,
        config: &crate::config::GatewayConfig,
    ) -> Result<Box<dyn DnsGateway>, crate::Error>;
}
