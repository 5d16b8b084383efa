//! Error types for the subdomain engine
//!
//! Every failure the engine can report is a variant of [`Error`]. Callers that
//! need to branch on the broad category use [`Error::kind`]; callers that need
//! a stable machine-readable code (HTTP layers, the CLI) use [`Error::code`].

use thiserror::Error;

/// Result type alias for subdomain engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the subdomain engine
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed label, service name, transport or hostname
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Domain inactive, missing, or not offered for the workload's recipe
    #[error("Not available: {0}")]
    NotAvailable(String),

    /// Workload already holds the maximum number of subdomains
    #[error("Subdomain quota exceeded (limit: {limit})")]
    QuotaExceeded {
        /// Effective per-workload limit
        limit: usize,
    },

    /// A local subdomain already uses this label under the domain
    #[error("Label '{label}' is already in use for domain '{domain}'")]
    LabelConflict {
        /// Parent domain hostname
        domain: String,
        /// Requested label
        label: String,
    },

    /// The provider already holds a record with the planned type and name
    #[error("A {record_type} record already exists at {name}")]
    RecordExists {
        /// Record type (CNAME or SRV)
        record_type: String,
        /// Fully-qualified record name
        name: String,
    },

    /// The provider already holds an address record at the label's FQDN
    #[error("An address record ({record_type}) already exists at {name}")]
    AddressRecordExists {
        /// A or AAAA
        record_type: String,
        /// Fully-qualified record name
        name: String,
    },

    /// The address record backing an SRV target could not be created
    #[error("Failed to create address record for SRV target: {0}")]
    AddressRecordCreateFailed(String),

    /// Domain still referenced by subdomains
    #[error("Domain '{domain}' still has {count} subdomain(s)")]
    DomainInUse {
        /// Domain hostname
        domain: String,
        /// Number of remaining subdomains
        count: usize,
    },

    /// Network allocation could not be found
    #[error("Allocation not found: {0}")]
    AllocationNotFound(u64),

    /// SRV provisioning requires a non-zero port
    #[error("Allocation {0} has no port, which SRV records require")]
    PortMissing(u64),

    /// The provider has no zone for the domain, or the lookup failed
    #[error("Failed to resolve DNS zone for '{0}'")]
    ZoneResolutionFailed(String),

    /// Any gateway call failure (network, timeout, non-2xx)
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Gateway name
        provider: String,
        /// Error message
        message: String,
    },

    /// Local store write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Broad failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller's fault, nothing external happened
    Validation,
    /// Domain or mapping not offered
    NotAvailable,
    /// Per-workload limit reached
    QuotaExceeded,
    /// Collision, locally or at the provider
    Conflict,
    /// Allocation or port absent
    DependencyMissing,
    /// Gateway failure
    Provider,
    /// Local store failure
    Persistence,
    /// Entity lookup failed
    NotFound,
    /// Configuration or plumbing failure
    Internal,
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a "not available" error
    pub fn not_available(msg: impl Into<String>) -> Self {
        Self::NotAvailable(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Broad category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotAvailable(_) => ErrorKind::NotAvailable,
            Error::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Error::LabelConflict { .. }
            | Error::RecordExists { .. }
            | Error::AddressRecordExists { .. }
            | Error::DomainInUse { .. } => ErrorKind::Conflict,
            Error::AllocationNotFound(_) | Error::PortMissing(_) => ErrorKind::DependencyMissing,
            Error::AddressRecordCreateFailed(_)
            | Error::ZoneResolutionFailed(_)
            | Error::Provider { .. }
            | Error::Http(_)
            | Error::Authentication(_)
            | Error::RateLimited(_) => ErrorKind::Provider,
            Error::Persistence(_) | Error::Io(_) => ErrorKind::Persistence,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Config(_) | Error::Json(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for this condition
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_FAILED",
            Error::NotAvailable(_) => "DOMAIN_NOT_AVAILABLE",
            Error::QuotaExceeded { .. } => "SUBDOMAIN_LIMIT_REACHED",
            Error::LabelConflict { .. } => "SUBDOMAIN_EXISTS",
            Error::RecordExists { .. } => "RECORD_EXISTS",
            Error::AddressRecordExists { .. } => "ADDRESS_RECORD_EXISTS",
            Error::AddressRecordCreateFailed(_) => "DNS_ADDRESS_CREATE_FAILED",
            Error::DomainInUse { .. } => "DOMAIN_IN_USE",
            Error::AllocationNotFound(_) => "PRIMARY_ALLOCATION_NOT_FOUND",
            Error::PortMissing(_) => "ALLOCATION_PORT_MISSING",
            Error::ZoneResolutionFailed(_) => "DNS_ZONE_ERROR",
            Error::Provider { .. }
            | Error::Http(_)
            | Error::Authentication(_)
            | Error::RateLimited(_) => "DNS_CREATE_FAILED",
            Error::Persistence(_) | Error::Io(_) => "SUBDOMAIN_CREATE_FAILED",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Config(_) => "CONFIGURATION_ERROR",
            Error::Json(_) | Error::Other(_) => "INTERNAL_ERROR",
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
