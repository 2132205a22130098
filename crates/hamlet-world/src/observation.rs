//! The observation builder: compacts the world around an NPC into the
//! bounded payload the LLM sees.
//!
//! The window is always 11x11 tiles centred on the NPC. Cell priority is
//! wall over door over floor; the `N`/`P` markers are stamped in a
//! post-pass and never overwrite a wall -- the grid's first job is spatial
//! awareness, and a character standing in a doorway must not hide the
//! doorway's walls.

use hamlet_types::{
    CooldownSnapshot, LocalTiles, NpcActivity, NpcSnapshot, OBSERVATION_GRID_SIZE, Observation,
    PlayerSnapshot, VisibleEntity, WorldRect,
};

use crate::character::Character;
use crate::entity::WorldEntity;
use crate::item::ItemCatalog;

/// Read-only world state plus controller status, everything the builder
/// needs beyond the two characters.
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    /// Wall rectangles.
    pub walls: &'a [WorldRect],
    /// Interactive entities.
    pub entities: &'a [WorldEntity],
    /// Current engine tick.
    pub tick: u64,
    /// The NPC's current goals.
    pub goals: &'a [String],
    /// Remaining cooldowns.
    pub cooldowns: CooldownSnapshot,
    /// String form of the previous decision's outcome.
    pub last_result: Option<&'a str>,
    /// Item display names for inventory rendering.
    pub catalog: &'a ItemCatalog,
}

/// Build the observation for one decision.
///
/// `player_last_said` is the player's fresh utterance, already consumed
/// from the player by the controller so it is exposed exactly once.
pub fn build_observation(
    npc: &Character,
    player: &Character,
    player_last_said: Option<&str>,
    view: &WorldView<'_>,
) -> Observation {
    let (npc_tx, npc_ty) = npc.tile_pos();
    let (player_tx, player_ty) = player.tile_pos();

    let half = OBSERVATION_GRID_SIZE / 2;
    let origin_x = npc_tx.saturating_sub(half);
    let origin_y = npc_ty.saturating_sub(half);

    let grid = build_grid(origin_x, origin_y, npc_tx, npc_ty, player_tx, player_ty, view);

    let mut visible_entities = Vec::with_capacity(view.entities.len().saturating_add(1));
    visible_entities.push(VisibleEntity {
        id: "player".to_owned(),
        kind: "player".to_owned(),
        pos: [player_tx, player_ty],
    });
    for entity in view.entities {
        let (etx, ety) = entity.tile_pos();
        if in_window(etx, ety, origin_x, origin_y) {
            visible_entities.push(VisibleEntity {
                id: entity.id.clone(),
                kind: entity.kind.clone(),
                pos: [etx, ety],
            });
        }
    }

    Observation {
        npc: NpcSnapshot {
            pos: [npc_tx, npc_ty],
            hp: npc.health,
            state: derive_activity(npc),
            inventory: npc.inventory_lines(view.catalog),
        },
        player: PlayerSnapshot {
            pos: [player_tx, player_ty],
            last_said: player_last_said.map(ToOwned::to_owned),
        },
        local_tiles: LocalTiles {
            origin: [origin_x, origin_y],
            grid,
        },
        visible_entities,
        goals: view.goals.to_vec(),
        cooldowns: view.cooldowns,
        last_result: view.last_result.map(ToOwned::to_owned),
        tick: view.tick,
    }
}

/// Render the 11x11 ASCII window.
fn build_grid(
    origin_x: i32,
    origin_y: i32,
    npc_tx: i32,
    npc_ty: i32,
    player_tx: i32,
    player_ty: i32,
    view: &WorldView<'_>,
) -> Vec<String> {
    let size = usize::try_from(OBSERVATION_GRID_SIZE).unwrap_or(11);
    let mut rows = Vec::with_capacity(size);

    for row in 0..OBSERVATION_GRID_SIZE {
        let mut line = String::with_capacity(size);
        for col in 0..OBSERVATION_GRID_SIZE {
            let tile_x = origin_x.saturating_add(col);
            let tile_y = origin_y.saturating_add(row);

            let mut cell = cell_terrain(tile_x, tile_y, view);

            // Character markers overwrite floor and doors, never walls.
            if cell != '#' {
                if tile_x == player_tx && tile_y == player_ty {
                    cell = 'P';
                } else if tile_x == npc_tx && tile_y == npc_ty {
                    cell = 'N';
                }
            }
            line.push(cell);
        }
        rows.push(line);
    }
    rows
}

/// Terrain character for one cell: wall, door, or floor.
fn cell_terrain(tile_x: i32, tile_y: i32, view: &WorldView<'_>) -> char {
    let tile_rect = WorldRect::for_tile(tile_x, tile_y);
    if view.walls.iter().any(|wall| tile_rect.overlaps(wall)) {
        return '#';
    }
    let occupied_by_door = view
        .entities
        .iter()
        .any(|entity| entity.is_door() && entity.tile_pos() == (tile_x, tile_y));
    if occupied_by_door { 'D' } else { '.' }
}

/// Whether a tile lies inside the observation window.
const fn in_window(tile_x: i32, tile_y: i32, origin_x: i32, origin_y: i32) -> bool {
    tile_x >= origin_x
        && tile_x < origin_x.saturating_add(OBSERVATION_GRID_SIZE)
        && tile_y >= origin_y
        && tile_y < origin_y.saturating_add(OBSERVATION_GRID_SIZE)
}

/// Derive the NPC's activity state: Patrol beats Approach beats Talk
/// beats Idle.
fn derive_activity(npc: &Character) -> NpcActivity {
    if npc.patrolling {
        NpcActivity::Patrol
    } else if npc.is_moving {
        NpcActivity::Approach
    } else if npc.speech().is_some() {
        NpcActivity::Talk
    } else {
        NpcActivity::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary_walls() -> Vec<WorldRect> {
        vec![
            WorldRect::new(0, 0, 800, 32),
            WorldRect::new(0, 0, 32, 600),
            WorldRect::new(768, 0, 32, 600),
            WorldRect::new(0, 568, 800, 32),
        ]
    }

    fn make_view<'a>(
        walls: &'a [WorldRect],
        entities: &'a [WorldEntity],
        goals: &'a [String],
        catalog: &'a ItemCatalog,
    ) -> WorldView<'a> {
        WorldView {
            walls,
            entities,
            tick: 12345,
            goals,
            cooldowns: CooldownSnapshot::default(),
            last_result: None,
            catalog,
        }
    }

    fn char_at(grid: &[String], row: usize, col: usize) -> char {
        grid.get(row)
            .and_then(|line| line.chars().nth(col))
            .unwrap_or(' ')
    }

    #[test]
    fn window_is_11_by_11_centred_on_npc() {
        // NPC at world (320, 160): centre tile (10, 5).
        let npc = Character::new("npc", "shopkeeper", 320.0, 160.0, 4, 4);
        let player = Character::new("player", "player", 416.0, 160.0, 4, 4);
        let catalog = ItemCatalog::new();
        let view = make_view(&[], &[], &[], &catalog);

        let obs = build_observation(&npc, &player, None, &view);
        assert_eq!(obs.local_tiles.origin, [5, 0]);
        assert_eq!(obs.local_tiles.grid.len(), 11);
        assert!(obs.local_tiles.grid.iter().all(|row| row.len() == 11));
        // NPC is in the centre cell.
        assert_eq!(char_at(&obs.local_tiles.grid, 5, 5), 'N');
    }

    #[test]
    fn walls_render_and_dominate_markers() {
        let npc = Character::new("npc", "shopkeeper", 320.0, 160.0, 4, 4);
        // Player standing overlapping the top boundary wall row (tile y=0).
        let player = Character::new("player", "player", 320.0, 0.0, 4, 4);
        let walls = boundary_walls();
        let catalog = ItemCatalog::new();
        let view = make_view(&walls, &[], &[], &catalog);

        let obs = build_observation(&npc, &player, None, &view);
        // Player tile is (10, 0) -> window row 0, col 5. Wall wins.
        assert_eq!(char_at(&obs.local_tiles.grid, 0, 5), '#');
    }

    #[test]
    fn doors_render_inside_window() {
        let npc = Character::new("npc", "shopkeeper", 320.0, 160.0, 4, 4);
        let player = Character::new("player", "player", 416.0, 160.0, 4, 4);
        let entities = vec![WorldEntity::new(
            "door_12_2".to_owned(),
            "door".to_owned(),
            384,
            64,
        )];
        let catalog = ItemCatalog::new();
        let view = make_view(&[], &entities, &[], &catalog);

        let obs = build_observation(&npc, &player, None, &view);
        // Door tile (12, 2) -> window row 2, col 7.
        assert_eq!(char_at(&obs.local_tiles.grid, 2, 7), 'D');
        assert!(
            obs.visible_entities
                .iter()
                .any(|entity| entity.id == "door_12_2" && entity.pos == [12, 2])
        );
    }

    #[test]
    fn player_marker_in_grid() {
        let npc = Character::new("npc", "shopkeeper", 320.0, 160.0, 4, 4);
        let player = Character::new("player", "player", 416.0, 160.0, 4, 4);
        let catalog = ItemCatalog::new();
        let view = make_view(&[], &[], &[], &catalog);

        let obs = build_observation(&npc, &player, None, &view);
        // Player tile (13, 5) -> window row 5, col 8.
        assert_eq!(char_at(&obs.local_tiles.grid, 5, 8), 'P');
        assert_eq!(obs.player.pos, [13, 5]);
    }

    #[test]
    fn player_always_listed_even_outside_window() {
        let npc = Character::new("npc", "shopkeeper", 320.0, 160.0, 4, 4);
        // Player far to the east, outside the 11x11 window.
        let player = Character::new("player", "player", 3200.0, 160.0, 4, 4);
        let catalog = ItemCatalog::new();
        let view = make_view(&[], &[], &[], &catalog);

        let obs = build_observation(&npc, &player, None, &view);
        assert_eq!(
            obs.visible_entities.first().map(|entity| entity.id.as_str()),
            Some("player")
        );
    }

    #[test]
    fn entities_outside_window_are_excluded() {
        let npc = Character::new("npc", "shopkeeper", 320.0, 160.0, 4, 4);
        let player = Character::new("player", "player", 416.0, 160.0, 4, 4);
        let entities = vec![WorldEntity::new(
            "chest_far".to_owned(),
            "chest".to_owned(),
            3200,
            3200,
        )];
        let catalog = ItemCatalog::new();
        let view = make_view(&[], &entities, &[], &catalog);

        let obs = build_observation(&npc, &player, None, &view);
        assert!(
            obs.visible_entities
                .iter()
                .all(|entity| entity.id != "chest_far")
        );
    }

    #[test]
    fn activity_priority_order() {
        let mut npc = Character::new("npc", "shopkeeper", 320.0, 160.0, 4, 4);
        let player = Character::new("player", "player", 416.0, 160.0, 4, 4);
        let catalog = ItemCatalog::new();
        let view = make_view(&[], &[], &[], &catalog);

        assert_eq!(
            build_observation(&npc, &player, None, &view).npc.state,
            NpcActivity::Idle
        );

        npc.say("hmm");
        assert_eq!(
            build_observation(&npc, &player, None, &view).npc.state,
            NpcActivity::Talk
        );

        npc.is_moving = true;
        assert_eq!(
            build_observation(&npc, &player, None, &view).npc.state,
            NpcActivity::Approach
        );

        npc.patrolling = true;
        assert_eq!(
            build_observation(&npc, &player, None, &view).npc.state,
            NpcActivity::Patrol
        );
    }

    #[test]
    fn inventory_and_last_said_pass_through() {
        let mut npc = Character::new("npc", "shopkeeper", 320.0, 160.0, 4, 4);
        assert!(npc.add_item("health_potion", 5).is_ok());
        let player = Character::new("player", "player", 416.0, 160.0, 4, 4);

        let mut catalog = ItemCatalog::new();
        catalog.register("health_potion", "Health Potion");
        let goals = vec!["greet player".to_owned()];
        let walls = Vec::new();
        let entities = Vec::new();
        let mut view = make_view(&walls, &entities, &goals, &catalog);
        view.last_result = Some("ok");

        let obs = build_observation(&npc, &player, Some("hello"), &view);
        assert_eq!(obs.npc.inventory, vec!["5x Health Potion".to_owned()]);
        assert_eq!(obs.player.last_said.as_deref(), Some("hello"));
        assert_eq!(obs.last_result.as_deref(), Some("ok"));
        assert_eq!(obs.goals, goals);
        assert_eq!(obs.tick, 12345);
    }
}
