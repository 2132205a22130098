//! Items and the display-name catalog.
//!
//! Item identity is a plain string id (`"health_potion"`); the catalog maps
//! ids to display names for the inventory lines shown to the LLM. The
//! catalog is an explicit handle passed where needed -- there is no global
//! item database.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A stack of identical items occupying one inventory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Stable item identifier.
    pub item_id: String,
    /// Number of units in the stack. Always at least one; a slot with
    /// zero units is represented as an empty slot instead.
    pub quantity: u32,
}

impl ItemStack {
    /// Create a stack of `quantity` units of the item.
    pub const fn new(item_id: String, quantity: u32) -> Self {
        Self { item_id, quantity }
    }
}

/// Maps item ids to human-readable display names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCatalog {
    names: BTreeMap<String, String>,
}

impl ItemCatalog {
    /// Create an empty catalog.
    pub const fn new() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    /// Register a display name for an item id.
    pub fn register(&mut self, item_id: impl Into<String>, display_name: impl Into<String>) {
        self.names.insert(item_id.into(), display_name.into());
    }

    /// The display name for an item, falling back to the raw id when the
    /// item is not in the catalog.
    pub fn display_name<'a>(&'a self, item_id: &'a str) -> &'a str {
        self.names.get(item_id).map_or(item_id, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_registered() {
        let mut catalog = ItemCatalog::new();
        catalog.register("health_potion", "Health Potion");
        assert_eq!(catalog.display_name("health_potion"), "Health Potion");
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let catalog = ItemCatalog::new();
        assert_eq!(catalog.display_name("mystery_orb"), "mystery_orb");
    }

    #[test]
    fn stack_construction() {
        let stack = ItemStack::new("iron_sword".to_owned(), 2);
        assert_eq!(stack.item_id, "iron_sword");
        assert_eq!(stack.quantity, 2);
    }
}
