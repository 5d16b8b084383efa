// # Store Implementations
//
// This module provides implementations of the SubdomainStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;
mod snapshot;

pub use file::{FileStore, FileStoreFactory};
pub use memory::{MemoryStore, MemoryStoreFactory};

/// Register the built-in store factories ("memory", "file")
pub fn register(registry: &crate::Registry) {
    registry.register_store("memory", Box::new(MemoryStoreFactory));
    registry.register_store("file", Box::new(FileStoreFactory));
}
