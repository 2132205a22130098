//! Interactive world entities: doors, chests, furniture.
//!
//! Entities are host-owned; the decision core only reads them. Identity is
//! a stable string id, and doors are recognized by convention: any entity
//! whose id contains `"door"` renders as `D` in the observation grid.

use hamlet_types::world_to_tile;
use serde::{Deserialize, Serialize};

/// An interactive entity placed in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldEntity {
    /// Stable identifier, e.g. `"door_12_2"`.
    pub id: String,
    /// Coarse kind, e.g. `"door"`, `"chest"`.
    pub kind: String,
    /// World x of the entity's anchor point, in pixels.
    pub x: i32,
    /// World y of the entity's anchor point, in pixels.
    pub y: i32,
}

impl WorldEntity {
    /// Create an entity at a world position.
    pub const fn new(id: String, kind: String, x: i32, y: i32) -> Self {
        Self { id, kind, x, y }
    }

    /// The tile the entity's anchor point is on.
    pub const fn tile_pos(&self) -> (i32, i32) {
        world_to_tile(self.x, self.y)
    }

    /// Whether this entity is a door (id contains `"door"`, any case).
    pub fn is_door(&self) -> bool {
        self.id.to_lowercase().contains("door")
    }
}
