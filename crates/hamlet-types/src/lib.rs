//! Shared type definitions for the Hamlet NPC decision core.
//!
//! Everything that crosses a crate boundary lives here: tile-grid geometry,
//! the [`Action`] contract the LLM must produce, the closed
//! [`ActionOutcome`] result vocabulary the controller reports back, and the
//! [`Observation`] payload serialized into the LLM prompt.

pub mod action;
pub mod geometry;
pub mod observation;
pub mod outcome;

pub use action::{Action, MOVE_DISTANCE_MAX, MOVE_DISTANCE_MIN, SAY_TEXT_MAX_LEN};
pub use geometry::{
    Direction, TILE_SIZE, WorldRect, distance_between, tile_center, tile_to_world, world_to_tile,
};
pub use observation::{
    CooldownSnapshot, LocalTiles, NpcActivity, NpcSnapshot, OBSERVATION_GRID_SIZE, Observation,
    PlayerSnapshot, VisibleEntity,
};
pub use outcome::{ActionOutcome, BlockReason};
