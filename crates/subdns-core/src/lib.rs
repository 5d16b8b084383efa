// # subdns-core
//
// Core library for per-tenant DNS subdomain provisioning.
//
// ## Architecture Overview
//
// This library provides the logic that turns "workload W wants label L under
// domain D" into provider-side DNS records, and reverses it:
// - **DnsGateway**: Trait for creating and deleting records via a provider API
// - **SubdomainStore**: Trait for local persistence of domains and subdomains
// - **Inventory**: Trait for read-only lookup of workloads and allocations
// - **SubdomainEngine**: Provisioning, teardown and bulk cleanup
// - **Registry**: Plugin-based registry for gateways and stores
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Plugin-Based**: Gateways are registered dynamically, no hard-coded if-else
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Best-Effort Teardown**: Local state is cleaned even when the provider is not

pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod state;
pub mod traits;
pub mod validate;

// Re-export core types for convenience
pub use config::{EngineConfig, GatewayConfig, StoreConfig, SubdnsConfig};
pub use engine::{
    CleanupReport, EngineEvent, ProvisionRequest, RecordPlan, RecordShape, SubdomainEngine,
    TeardownOutcome,
};
pub use error::{Error, ErrorKind, Result};
pub use inventory::StaticInventory;
pub use registry::Registry;
pub use state::{FileStore, MemoryStore};
pub use traits::{DnsGateway, Inventory, SubdomainStore};
