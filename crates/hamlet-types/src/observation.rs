//! Observation payload types serialized into the LLM prompt.
//!
//! The observation is the **only** information the model receives about the
//! world each tick. If something is not in the observation, the NPC does
//! not know about it. The payload is kept small and bounded: an 11x11
//! ASCII window around the NPC, the entities inside that window, and a
//! handful of status fields.

use serde::{Deserialize, Serialize};

/// Side length of the local tile window, in tiles. Always odd so the NPC
/// sits in the centre cell.
pub const OBSERVATION_GRID_SIZE: i32 = 11;

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// The complete observation delivered to the model for one decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// The NPC's own state summary.
    pub npc: NpcSnapshot,
    /// What the NPC knows about the player.
    pub player: PlayerSnapshot,
    /// The ASCII map window centred on the NPC.
    pub local_tiles: LocalTiles,
    /// The player plus every entity whose tile lies inside the window.
    pub visible_entities: Vec<VisibleEntity>,
    /// Current goals, as plain instructions.
    pub goals: Vec<String>,
    /// Remaining action cooldowns in milliseconds.
    pub cooldowns: CooldownSnapshot,
    /// String form of the previous decision's outcome, if any.
    pub last_result: Option<String>,
    /// Current engine tick.
    pub tick: u64,
}

// ---------------------------------------------------------------------------
// NpcSnapshot
// ---------------------------------------------------------------------------

/// The NPC's own state as presented in the observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcSnapshot {
    /// Tile position `[x, y]`.
    pub pos: [i32; 2],
    /// Current health.
    pub hp: u32,
    /// What the NPC is currently doing.
    pub state: NpcActivity,
    /// Inventory rendered as `"<qty>x <Name>"` lines, or `["Empty"]`.
    pub inventory: Vec<String>,
}

/// Derived activity state, in priority order: patrolling beats approaching
/// beats talking beats idling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NpcActivity {
    /// Walking a scripted patrol route.
    Patrol,
    /// Moving (usually toward the player or a target tile).
    Approach,
    /// Speech bubble currently visible.
    Talk,
    /// Nothing in particular.
    Idle,
}

// ---------------------------------------------------------------------------
// PlayerSnapshot
// ---------------------------------------------------------------------------

/// What the NPC can observe about the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Tile position `[x, y]`.
    pub pos: [i32; 2],
    /// The player's fresh utterance, exposed exactly once per utterance.
    pub last_said: Option<String>,
}

// ---------------------------------------------------------------------------
// LocalTiles
// ---------------------------------------------------------------------------

/// The 11x11 ASCII window. Cell legend: `N` NPC, `P` player, `#` wall,
/// `.` floor, `D` door. Walls dominate every other marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTiles {
    /// Tile coordinate of the window's top-left cell.
    pub origin: [i32; 2],
    /// Eleven rows of eleven cells each, top to bottom.
    pub grid: Vec<String>,
}

// ---------------------------------------------------------------------------
// VisibleEntity
// ---------------------------------------------------------------------------

/// An entity inside the observation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleEntity {
    /// Stable identifier, e.g. `"door_12_2"` or `"player"`.
    pub id: String,
    /// Coarse kind, e.g. `"door"`, `"chest"`, `"player"`.
    pub kind: String,
    /// Tile position `[x, y]`.
    pub pos: [i32; 2],
}

// ---------------------------------------------------------------------------
// CooldownSnapshot
// ---------------------------------------------------------------------------

/// Remaining cooldowns in milliseconds, clamped at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownSnapshot {
    /// Movement cooldown (`move` on the wire; `move` is reserved in Rust).
    #[serde(rename = "move")]
    pub movement: u64,
    /// Interaction cooldown.
    pub interact: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_observation() -> Observation {
        Observation {
            npc: NpcSnapshot {
                pos: [10, 5],
                hp: 100,
                state: NpcActivity::Idle,
                inventory: vec!["Empty".to_owned()],
            },
            player: PlayerSnapshot {
                pos: [13, 5],
                last_said: Some("hello".to_owned()),
            },
            local_tiles: LocalTiles {
                origin: [5, 0],
                grid: vec!["...........".to_owned(); 11],
            },
            visible_entities: vec![VisibleEntity {
                id: "player".to_owned(),
                kind: "player".to_owned(),
                pos: [13, 5],
            }],
            goals: vec!["greet player".to_owned()],
            cooldowns: CooldownSnapshot {
                movement: 0,
                interact: 0,
            },
            last_result: None,
            tick: 12345,
        }
    }

    #[test]
    fn cooldown_field_renames_to_move() {
        let obs = sample_observation();
        let json = serde_json::to_value(&obs).unwrap_or_default();
        let cooldowns = json.get("cooldowns").cloned().unwrap_or_default();
        assert!(cooldowns.get("move").is_some());
        assert!(cooldowns.get("movement").is_none());
        assert!(cooldowns.get("interact").is_some());
    }

    #[test]
    fn activity_serializes_capitalized() {
        let json = serde_json::to_string(&NpcActivity::Approach).unwrap_or_default();
        assert_eq!(json, "\"Approach\"");
    }

    #[test]
    fn observation_roundtrip() {
        let obs = sample_observation();
        let json = serde_json::to_string(&obs).unwrap_or_default();
        let back: Result<Observation, _> = serde_json::from_str(&json);
        assert_eq!(back.ok(), Some(obs));
    }

    #[test]
    fn null_last_said_serializes_as_null() {
        let mut obs = sample_observation();
        obs.player.last_said = None;
        let json = serde_json::to_value(&obs).unwrap_or_default();
        let last_said = json
            .get("player")
            .and_then(|p| p.get("last_said"))
            .cloned()
            .unwrap_or_default();
        assert!(last_said.is_null());
    }
}
