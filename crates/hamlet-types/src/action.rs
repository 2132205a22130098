//! The NPC action contract: a tagged union keyed by the `action` field.
//!
//! The LLM must reply with exactly one JSON object of the shape
//! `{"action": <name>, "args": {...}}`. Serialization of this enum produces
//! that wire form; strict validation of inbound text (bounds, unknown keys,
//! the closed error vocabulary) lives in the parser in `hamlet-npc`.

use serde::{Deserialize, Serialize};

use crate::geometry::Direction;

/// Maximum length of a spoken line, in characters.
pub const SAY_TEXT_MAX_LEN: usize = 100;

/// Smallest distance a `move` action may request, in tiles.
pub const MOVE_DISTANCE_MIN: f64 = 0.1;

/// Largest distance a `move` action may request, in tiles.
pub const MOVE_DISTANCE_MAX: f64 = 5.0;

/// One decision made by the NPC's model, validated and ready to execute.
///
/// Exactly one action executes per tick. Variant names are the wire names
/// (`say`, `move`, `move_to`, `interact`, `transfer_item`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "args", rename_all = "snake_case")]
pub enum Action {
    /// Speak one line to the player (1..=100 characters).
    Say {
        /// The text to display in the NPC's speech bubble.
        text: String,
    },
    /// Walk in a cardinal direction for a distance in tiles (0.1..=5.0).
    Move {
        /// Which way to walk.
        direction: Direction,
        /// How far, in tiles.
        distance: f64,
    },
    /// Walk to a tile coordinate, pathfinding around obstacles.
    MoveTo {
        /// Target tile x.
        x: i32,
        /// Target tile y.
        y: i32,
    },
    /// Interact with a nearby entity (door, chest, furniture).
    Interact {
        /// Stable id of the entity, e.g. `"door_12_2"`.
        entity_id: String,
    },
    /// Hand one unit of an item to a nearby character.
    TransferItem {
        /// Id of the receiving character, e.g. `"player"`.
        entity_id: String,
        /// Id of the item to hand over.
        item_id: String,
    },
}

impl Action {
    /// The wire name of this action.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Say { .. } => "say",
            Self::Move { .. } => "move",
            Self::MoveTo { .. } => "move_to",
            Self::Interact { .. } => "interact",
            Self::TransferItem { .. } => "transfer_item",
        }
    }

    /// The spoken line, when this is a `say` action.
    pub fn spoken_text(&self) -> Option<&str> {
        match self {
            Self::Say { text } => Some(text.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn say_serializes_to_wire_shape() {
        let action = Action::Say {
            text: "Hello!".to_owned(),
        };
        let json = serde_json::to_value(&action).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({"action": "say", "args": {"text": "Hello!"}})
        );
    }

    #[test]
    fn move_serializes_direction_letter() {
        let action = Action::Move {
            direction: Direction::East,
            distance: 2.0,
        };
        let json = serde_json::to_value(&action).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({"action": "move", "args": {"direction": "E", "distance": 2.0}})
        );
    }

    #[test]
    fn move_to_uses_snake_case_name() {
        let action = Action::MoveTo { x: 12, y: 5 };
        let json = serde_json::to_value(&action).unwrap_or_default();
        assert_eq!(
            json.get("action").and_then(serde_json::Value::as_str),
            Some("move_to")
        );
    }

    #[test]
    fn deserialize_transfer_item() {
        let raw = r#"{"action":"transfer_item","args":{"entity_id":"player","item_id":"iron_sword"}}"#;
        let action: Result<Action, _> = serde_json::from_str(raw);
        assert_eq!(
            action.ok(),
            Some(Action::TransferItem {
                entity_id: "player".to_owned(),
                item_id: "iron_sword".to_owned(),
            })
        );
    }

    #[test]
    fn action_names() {
        assert_eq!(
            Action::Interact {
                entity_id: "chest_1".to_owned()
            }
            .name(),
            "interact"
        );
        assert_eq!(Action::MoveTo { x: 0, y: 0 }.name(), "move_to");
    }

    #[test]
    fn spoken_text_only_for_say() {
        let say = Action::Say {
            text: "hi".to_owned(),
        };
        assert_eq!(say.spoken_text(), Some("hi"));
        assert_eq!(Action::MoveTo { x: 1, y: 1 }.spoken_text(), None);
    }
}
