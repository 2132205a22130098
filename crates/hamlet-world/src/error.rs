//! Error types for world-side operations.

/// Errors from character inventory operations.
///
/// Inventory mutation is all-or-nothing: a failed add or remove leaves the
/// slots untouched, which is what lets `transfer_item` roll back cleanly.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InventoryError {
    /// Every slot is occupied by a different item.
    #[error("no free inventory slot for {item_id}")]
    Full {
        /// The item that could not be stored.
        item_id: String,
    },

    /// The inventory does not hold enough of the item.
    #[error("item {item_id}: requested {requested}, held {held}")]
    Insufficient {
        /// The item that was requested.
        item_id: String,
        /// How many units were requested.
        requested: u32,
        /// How many units are actually held.
        held: u32,
    },

    /// Stacking the item would overflow its quantity counter.
    #[error("quantity overflow for {item_id}")]
    Overflow {
        /// The item whose stack overflowed.
        item_id: String,
    },
}
