//! Pure lookups the engine performs before touching the provider
//!
//! - [`target`]: where a subdomain should point
//! - [`mapping`]: which protocol mapping applies to a recipe

pub mod mapping;
pub mod target;

pub use mapping::resolve_mapping;
pub use target::{resolve_target, target_for};
