//! Network target resolution
//!
//! Resolution order, first match wins:
//! 1. The allocation's explicit alias, used verbatim
//! 2. The owning node's public IPv4 address
//! 3. The allocation's raw bound address
//!
//! The port is returned as bound; callers that need one must check for 0.

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Allocation, AllocationId, NetworkTarget, Node};
use crate::traits::Inventory;

/// Derive the target for an allocation and its (optional) node
pub fn target_for(allocation: &Allocation, node: Option<&Node>) -> NetworkTarget {
    let node_ip = node
        .and_then(|n| n.public_ipv4.as_deref())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let address = allocation
        .alias()
        .or(node_ip)
        .unwrap_or(allocation.ip.as_str());

    NetworkTarget::new(address, allocation.port)
}

/// Look up an allocation (and its node) and derive its target
///
/// # Errors
///
/// `Error::AllocationNotFound` when the allocation does not exist. A missing
/// node is not an error; resolution falls through to the raw address.
pub async fn resolve_target(
    inventory: &dyn Inventory,
    allocation_id: AllocationId,
) -> Result<(Allocation, NetworkTarget)> {
    let allocation = inventory
        .allocation(allocation_id)
        .await?
        .ok_or(Error::AllocationNotFound(allocation_id))?;

    let node = match (allocation.alias(), allocation.node_id) {
        (None, Some(node_id)) => inventory.node(node_id).await?,
        _ => None,
    };

    let target = target_for(&allocation, node.as_ref());
    debug!(
        "Resolved allocation {} to target {}:{}",
        allocation_id, target.address, target.port
    );

    Ok((allocation, target))
}
