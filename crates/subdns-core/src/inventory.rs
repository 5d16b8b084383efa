//! Static inventory
//!
//! An [`Inventory`] backed by a fixed snapshot of workloads, allocations,
//! nodes and recipes. The CLI loads one from a JSON export of the hosting
//! platform; tests build one in code.
//!
//! ```json
//! {
//!   "recipes": [1, 2],
//!   "workloads": [{ "id": 10, "recipe_id": 1, "allocation_id": 100 }],
//!   "allocations": [{ "id": 100, "ip": "10.0.0.5", "port": 25565, "node_id": 1 }],
//!   "nodes": [{ "id": 1, "public_ipv4": "203.0.113.9" }]
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{Allocation, AllocationId, Node, NodeId, RecipeId, Workload, WorkloadId};
use crate::traits::Inventory;

/// On-disk shape of an inventory export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    recipes: Vec<RecipeId>,
    #[serde(default)]
    workloads: Vec<Workload>,
    #[serde(default)]
    allocations: Vec<Allocation>,
    #[serde(default)]
    nodes: Vec<Node>,
}

/// In-memory inventory snapshot
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    recipes: BTreeSet<RecipeId>,
    workloads: HashMap<WorkloadId, Workload>,
    allocations: HashMap<AllocationId, Allocation>,
    nodes: HashMap<NodeId, Node>,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an inventory export
    pub fn from_json(json: &str) -> Result<Self> {
        let file: InventoryFile = serde_json::from_str(json)?;
        let mut inventory = Self::new();
        inventory.recipes.extend(file.recipes);
        for workload in file.workloads {
            inventory = inventory.with_workload(workload);
        }
        for allocation in file.allocations {
            inventory = inventory.with_allocation(allocation);
        }
        for node in file.nodes {
            inventory = inventory.with_node(node);
        }
        Ok(inventory)
    }

    /// Load an inventory export from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config(format!(
                "Failed to read inventory file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    pub fn with_recipe(mut self, id: RecipeId) -> Self {
        self.recipes.insert(id);
        self
    }

    /// Add a workload; its recipe becomes known as well
    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.recipes.insert(workload.recipe_id);
        self.workloads.insert(workload.id, workload);
        self
    }

    pub fn with_allocation(mut self, allocation: Allocation) -> Self {
        self.allocations.insert(allocation.id, allocation);
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.insert(node.id, node);
        self
    }
}

#[async_trait]
impl Inventory for StaticInventory {
    async fn workload(&self, id: WorkloadId) -> Result<Option<Workload>> {
        Ok(self.workloads.get(&id).cloned())
    }

    async fn allocation(&self, id: AllocationId) -> Result<Option<Allocation>> {
        Ok(self.allocations.get(&id).cloned())
    }

    async fn node(&self, id: NodeId) -> Result<Option<Node>> {
        Ok(self.nodes.get(&id).cloned())
    }

    async fn recipe_exists(&self, id: RecipeId) -> Result<bool> {
        Ok(self.recipes.contains(&id))
    }
}
