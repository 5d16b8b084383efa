//! Command-line surface of subdnsctl.

use clap::{Parser, Subcommand};
use subdns_core::model::{DomainId, ProtocolMapping, SubdomainId, Transport, WorkloadId};

/// Provision and reconcile per-workload DNS subdomains.
#[derive(Parser, Debug)]
#[command(name = "subdnsctl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a subdomain for a workload.
    Provision {
        /// Domain id.
        #[arg(long)]
        domain: DomainId,

        /// Workload id.
        #[arg(long)]
        workload: WorkloadId,

        /// Subdomain label (2-63 chars of a-z, 0-9, -).
        #[arg(long)]
        label: String,
    },

    /// Remove one subdomain owned by a workload.
    Teardown {
        /// Owning workload id.
        #[arg(long)]
        workload: WorkloadId,

        /// Subdomain id.
        #[arg(long)]
        subdomain: SubdomainId,
    },

    /// Remove every subdomain of a workload.
    Cleanup {
        /// Workload id.
        #[arg(long)]
        workload: WorkloadId,
    },

    /// Domain administration.
    #[command(subcommand)]
    Domain(DomainCommand),
}

#[derive(Subcommand, Debug)]
pub enum DomainCommand {
    /// Register a parent domain.
    Add {
        /// Parent domain hostname.
        #[arg(long)]
        hostname: String,

        /// Protocol mapping: recipe[:service[:transport[:priority[:weight[:ttl]]]]].
        #[arg(long = "mapping", required = true, value_parser = parse_mapping)]
        mappings: Vec<ProtocolMapping>,

        /// Register the domain as unavailable for new subdomains.
        #[arg(long)]
        inactive: bool,
    },

    /// Change a domain's hostname, availability or mappings.
    Update {
        /// Domain id.
        #[arg(long)]
        id: DomainId,

        /// New parent domain hostname.
        #[arg(long)]
        hostname: Option<String>,

        /// Whether new subdomains may be created (true or false).
        #[arg(long)]
        active: Option<bool>,

        /// Replacement mappings; the current list is kept when none are given.
        #[arg(long = "mapping", value_parser = parse_mapping)]
        mappings: Vec<ProtocolMapping>,
    },

    /// Remove a domain that no subdomain references.
    Remove {
        /// Domain id.
        #[arg(long)]
        id: DomainId,
    },

    /// Forget the cached zone id so the next use resolves it again.
    InvalidateZone {
        /// Domain id.
        #[arg(long)]
        id: DomainId,
    },
}

/// Parse `recipe[:service[:transport[:priority[:weight[:ttl]]]]]`
///
/// Empty fields keep their defaults, so `2::udp` is recipe 2 with no
/// service and UDP transport.
pub fn parse_mapping(raw: &str) -> Result<ProtocolMapping, String> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    if parts.len() > 6 {
        return Err(format!(
            "too many fields in mapping '{}' (expected recipe[:service[:transport[:priority[:weight[:ttl]]]]])",
            raw
        ));
    }

    let recipe_id = parts[0]
        .parse()
        .map_err(|e| format!("invalid recipe id '{}': {}", parts[0], e))?;
    let mut mapping = ProtocolMapping::new(recipe_id);

    let field = |index: usize| parts.get(index).copied().filter(|s| !s.is_empty());

    if let Some(service) = field(1) {
        mapping = mapping.with_service(service);
    }
    if let Some(transport) = field(2) {
        let transport: Transport = transport.parse().map_err(|e| format!("{}", e))?;
        mapping = mapping.with_transport(transport);
    }
    if let Some(priority) = field(3) {
        let priority = priority
            .parse()
            .map_err(|e| format!("invalid priority '{}': {}", priority, e))?;
        mapping = mapping.with_priority(priority);
    }
    if let Some(weight) = field(4) {
        let weight = weight
            .parse()
            .map_err(|e| format!("invalid weight '{}': {}", weight, e))?;
        mapping = mapping.with_weight(weight);
    }
    if let Some(ttl) = field(5) {
        let ttl = ttl.parse().map_err(|e| format!("invalid ttl '{}': {}", ttl, e))?;
        mapping = mapping.with_ttl(ttl);
    }

    mapping.validate().map_err(|e| e.to_string())?;
    Ok(mapping)
}
