//! Core traits for the subdomain engine
//!
//! This module defines the abstract interfaces the engine is written against.
//!
//! - [`DnsGateway`]: Create and delete records at the external DNS provider
//! - [`SubdomainStore`]: Local persistence of domains and subdomains
//! - [`Inventory`]: Read-only lookup of workloads, allocations and nodes

pub mod dns_gateway;
pub mod inventory;
pub mod subdomain_store;

pub use dns_gateway::{DnsGateway, DnsGatewayFactory, RecordSpec, RecordType};
pub use inventory::Inventory;
pub use subdomain_store::{StoreFactory, SubdomainStore};
