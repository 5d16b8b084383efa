//! Protocol mapping lookup

use crate::model::{ProtocolMapping, RecipeId};

/// First mapping bound to `recipe_id`, or `None` when the domain is not
/// offered for that recipe
///
/// Duplicate mappings for one recipe are a configuration mistake; the first
/// one in order is used.
pub fn resolve_mapping(mappings: &[ProtocolMapping], recipe_id: RecipeId) -> Option<&ProtocolMapping> {
    mappings.iter().find(|m| m.recipe_id == recipe_id)
}
