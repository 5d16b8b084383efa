// # Inventory Trait
//
// Read-only view of the hosting platform: workloads, their network
// allocations, the nodes those allocations live on, and known recipes.
// The engine never writes through this interface.

use async_trait::async_trait;

use crate::model::{Allocation, AllocationId, Node, NodeId, RecipeId, Workload, WorkloadId};

/// Read-only lookup of workloads, allocations, nodes and recipes
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn workload(&self, id: WorkloadId) -> Result<Option<Workload>, crate::Error>;

    async fn allocation(&self, id: AllocationId) -> Result<Option<Allocation>, crate::Error>;

    async fn node(&self, id: NodeId) -> Result<Option<Node>, crate::Error>;

    /// Whether a recipe id refers to a known recipe
    async fn recipe_exists(&self, id: RecipeId) -> Result<bool, crate::Error>;
}
