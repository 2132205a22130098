//! Engine-facing world interfaces for the Hamlet NPC decision core.
//!
//! The decision core does not render, load assets, or own the main loop;
//! it consumes a narrow slice of the host engine: characters that can
//! [`step`] and [`say`], a read-only wall set, and interactive entities.
//! This crate defines those interfaces plus the observation builder that
//! compacts them into the bounded payload the LLM sees.
//!
//! [`step`]: Character::step
//! [`say`]: Character::say

pub mod character;
pub mod entity;
pub mod error;
pub mod item;
pub mod observation;

pub use character::{CHARACTER_SIZE, Character, DEFAULT_SPEECH_DURATION_MS};
pub use entity::WorldEntity;
pub use error::InventoryError;
pub use item::{ItemCatalog, ItemStack};
pub use observation::{WorldView, build_observation};
