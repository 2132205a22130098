//! Grid-level pathfinding: A*, line of sight, and path smoothing.
//!
//! A* uses 8-way movement with corner-cut prevention: a diagonal step is
//! rejected when either orthogonal neighbour is blocked, so paths never
//! clip the corner of a wall. Costs are integer milli-tiles (1000 per
//! straight step, 1414 per diagonal) which keeps the priority queue on
//! `Ord` types -- a `BTreeSet<(cost, tile)>` serves as the min-heap.

use std::collections::{BTreeMap, BTreeSet};

use hamlet_types::distance_between;

use crate::grid::NavGrid;

/// Cost of one straight step, in milli-tiles.
const STRAIGHT_COST: u64 = 1000;

/// Cost of one diagonal step, in milli-tiles (sqrt(2) scaled).
const DIAGONAL_COST: u64 = 1414;

/// The eight movement directions.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Euclidean heuristic in milli-tiles, floored so it stays admissible.
fn heuristic(from: (i32, i32), to: (i32, i32)) -> u64 {
    let distance = distance_between(
        f64::from(from.0),
        f64::from(from.1),
        f64::from(to.0),
        f64::from(to.1),
    );
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (distance * 1000.0).floor() as u64
    }
}

/// Find a tile path between two walkable tiles in the same region.
///
/// Returns the ordered tile list from start to goal inclusive, or `None`
/// when the goal is unreachable.
pub fn find_tile_path(
    grid: &NavGrid,
    start: (i32, i32),
    goal: (i32, i32),
) -> Option<Vec<(i32, i32)>> {
    if start == goal {
        return Some(vec![start]);
    }
    if !grid.is_walkable(start.0, start.1) || !grid.is_walkable(goal.0, goal.1) {
        return None;
    }

    let mut open: BTreeSet<(u64, (i32, i32))> = BTreeSet::new();
    let mut came_from: BTreeMap<(i32, i32), (i32, i32)> = BTreeMap::new();
    let mut g_score: BTreeMap<(i32, i32), u64> = BTreeMap::new();

    g_score.insert(start, 0);
    open.insert((heuristic(start, goal), start));

    while let Some(&(f, current)) = open.iter().next() {
        open.remove(&(f, current));

        if current == goal {
            return Some(reconstruct(&came_from, start, goal));
        }

        let current_g = g_score.get(&current).copied().unwrap_or(u64::MAX);

        for (dx, dy) in NEIGHBOURS {
            let neighbour = (
                current.0.saturating_add(dx),
                current.1.saturating_add(dy),
            );
            if !grid.is_walkable(neighbour.0, neighbour.1) {
                continue;
            }

            let diagonal = dx != 0 && dy != 0;
            if diagonal {
                // Corner-cut prevention: both orthogonal neighbours must
                // be clear before a diagonal step is allowed.
                let side_a = grid.is_walkable(current.0.saturating_add(dx), current.1);
                let side_b = grid.is_walkable(current.0, current.1.saturating_add(dy));
                if !side_a || !side_b {
                    continue;
                }
            }

            let step_cost = if diagonal { DIAGONAL_COST } else { STRAIGHT_COST };
            let Some(tentative) = current_g.checked_add(step_cost) else {
                continue;
            };

            let better = g_score
                .get(&neighbour)
                .is_none_or(|&existing| tentative < existing);
            if better {
                if let Some(&old_g) = g_score.get(&neighbour) {
                    let old_f = old_g.saturating_add(heuristic(neighbour, goal));
                    open.remove(&(old_f, neighbour));
                }
                came_from.insert(neighbour, current);
                g_score.insert(neighbour, tentative);
                open.insert((tentative.saturating_add(heuristic(neighbour, goal)), neighbour));
            }
        }
    }

    None
}

/// Walk the predecessor map back from goal to start.
fn reconstruct(
    came_from: &BTreeMap<(i32, i32), (i32, i32)>,
    start: (i32, i32),
    goal: (i32, i32),
) -> Vec<(i32, i32)> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&previous) = came_from.get(&current) {
        path.push(previous);
        current = previous;
        if current == start {
            break;
        }
    }
    path.reverse();
    path
}

/// Whether a straight world-space segment crosses only walkable tiles.
///
/// Uses Bresenham's line algorithm over the tiles under the segment.
pub fn line_of_sight(grid: &NavGrid, from: (f64, f64), to: (f64, f64)) -> bool {
    let tile_size = f64::from(grid.tile_size());
    let tile_of = |v: f64| {
        #[allow(clippy::cast_possible_truncation)]
        {
            (v / tile_size).floor() as i32
        }
    };

    let (mut x, mut y) = (tile_of(from.0), tile_of(from.1));
    let (goal_x, goal_y) = (tile_of(to.0), tile_of(to.1));

    if (x, y) == (goal_x, goal_y) {
        return true;
    }

    let dx = goal_x.saturating_sub(x).saturating_abs();
    let dy = goal_y.saturating_sub(y).saturating_abs();
    let x_inc = if x < goal_x { 1 } else { -1 };
    let y_inc = if y < goal_y { 1 } else { -1 };
    let mut error = dx.saturating_sub(dy);

    // Bresenham terminates well within dx + dy steps; the margin guards
    // against degenerate inputs.
    let max_steps = dx.saturating_add(dy).saturating_add(10);
    let mut steps = 0;

    while steps < max_steps {
        if !grid.is_walkable(x, y) {
            return false;
        }
        if x == goal_x && y == goal_y {
            break;
        }

        let doubled = error.saturating_mul(2);
        if doubled > dy.saturating_neg() {
            error = error.saturating_sub(dy);
            x = x.saturating_add(x_inc);
        }
        if doubled < dx {
            error = error.saturating_add(dx);
            y = y.saturating_add(y_inc);
        }
        steps = steps.saturating_add(1);
    }

    true
}

/// Theta*-style smoothing: drop every waypoint that the previous kept
/// waypoint can already see, so the NPC walks long straight legs instead
/// of tile-by-tile staircases.
pub fn smooth_path(grid: &NavGrid, waypoints: &[(f64, f64)]) -> Vec<(f64, f64)> {
    if waypoints.len() <= 2 {
        return waypoints.to_vec();
    }

    let Some(&first) = waypoints.first() else {
        return Vec::new();
    };
    let mut smoothed = vec![first];
    let mut i = 0;

    while let Some(&anchor) = waypoints.get(i) {
        if i >= waypoints.len().saturating_sub(1) {
            break;
        }

        // Find the farthest waypoint visible from the anchor.
        let mut last_reachable = i;
        let mut j = i.saturating_add(1);
        while let Some(&candidate) = waypoints.get(j) {
            if line_of_sight(grid, anchor, candidate) {
                last_reachable = j;
                j = j.saturating_add(1);
            } else {
                break;
            }
        }

        if last_reachable > i {
            i = last_reachable;
        } else {
            i = i.saturating_add(1);
        }

        if i < waypoints.len().saturating_sub(1)
            && let Some(&keep) = waypoints.get(i)
        {
            smoothed.push(keep);
        }
    }

    // The goal itself is always kept.
    if let Some(&goal) = waypoints.last()
        && smoothed.last() != Some(&goal)
    {
        smoothed.push(goal);
    }

    smoothed
}

/// Total Euclidean length of a waypoint chain.
pub fn path_length(waypoints: &[(f64, f64)]) -> f64 {
    waypoints
        .windows(2)
        .filter_map(|pair| {
            let (ax, ay) = pair.first().copied()?;
            let (bx, by) = pair.get(1).copied()?;
            Some(distance_between(ax, ay, bx, by))
        })
        .sum()
}
