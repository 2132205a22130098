//! The hierarchical navigator: regions, portals, and the two-layer path
//! query.
//!
//! Doorways are detected as corridor "neck" tiles: walkable tiles whose
//! opposite orthogonal neighbours are both blocked (a gap in a wall).
//! Regions are flood-filled over the remaining walkable tiles, so two rooms
//! joined only by a doorway stay distinct regions, and each contiguous neck
//! span becomes one portal joining them. Closing a portal removes the
//! doorway from path queries without touching the walkability grid.
//!
//! Queries inside one region run grid A* directly. Cross-region queries run
//! Dijkstra over the portal graph (with per-portal cost bias and an
//! optional indoor preference), stitch the grid segments together, and
//! smooth the result.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use hamlet_types::{WorldRect, distance_between, tile_center};
use tracing::debug;

use crate::astar;
use crate::grid::NavGrid;
use crate::portal::{Portal, Region};

/// Default distance at which a waypoint counts as reached, in pixels
/// (half a tile).
pub const WAYPOINT_TOLERANCE: f64 = 16.0;

/// Cost discount applied to indoor portals when a query prefers indoors.
const INDOOR_DISCOUNT: f64 = 0.9;

// ---------------------------------------------------------------------------
// Query and response types
// ---------------------------------------------------------------------------

/// Parameters for one path query. Coordinates are world-space pixels.
#[derive(Debug, Clone)]
pub struct PathQuery {
    /// Start x in pixels.
    pub start_x: f64,
    /// Start y in pixels.
    pub start_y: f64,
    /// Goal x in pixels.
    pub goal_x: f64,
    /// Goal y in pixels.
    pub goal_y: f64,
    /// Per-portal cost multipliers, keyed by portal id.
    pub cost_bias: BTreeMap<String, f64>,
    /// Discount indoor portals (e.g. route NPCs through buildings).
    pub prefer_indoor: bool,
}

impl PathQuery {
    /// A plain query with no bias.
    pub const fn new(start_x: f64, start_y: f64, goal_x: f64, goal_y: f64) -> Self {
        Self {
            start_x,
            start_y,
            goal_x,
            goal_y,
            cost_bias: BTreeMap::new(),
            prefer_indoor: false,
        }
    }
}

/// Why a path query succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathReason {
    /// A path was found.
    Success,
    /// Start and goal are valid but not connected (or all doors closed).
    NoPath,
    /// The start position is on a blocked tile.
    InvalidStart,
    /// The goal position is on a blocked tile.
    InvalidGoal,
}

impl PathReason {
    /// The screaming-case wire form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::NoPath => "NO_PATH",
            Self::InvalidStart => "INVALID_START",
            Self::InvalidGoal => "INVALID_GOAL",
        }
    }
}

/// The result of a path query.
#[derive(Debug, Clone)]
pub struct PathResponse {
    /// Whether a path was found.
    pub ok: bool,
    /// Success or the failure reason.
    pub reason: PathReason,
    /// World-space waypoints from start to goal, smoothed.
    pub waypoints: Vec<(f64, f64)>,
    /// Estimated path cost in pixels.
    pub total_cost: f64,
}

impl PathResponse {
    const fn success(waypoints: Vec<(f64, f64)>, total_cost: f64) -> Self {
        Self {
            ok: true,
            reason: PathReason::Success,
            waypoints,
            total_cost,
        }
    }

    const fn failure(reason: PathReason) -> Self {
        Self {
            ok: false,
            reason,
            waypoints: Vec::new(),
            total_cost: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Navigator
// ---------------------------------------------------------------------------

/// Two-layer pathfinder over a tile grid.
#[derive(Debug, Clone)]
pub struct HierarchicalNavigator {
    grid: NavGrid,
    regions: BTreeMap<u32, Region>,
    portals: BTreeMap<String, Portal>,
    tile_to_region: BTreeMap<(i32, i32), u32>,
    /// Intra-region edges: portal id -> (neighbouring portal id, pixel cost).
    portal_graph: BTreeMap<String, Vec<(String, f64)>>,
}

impl HierarchicalNavigator {
    /// Create a navigator over an all-blocked grid. Call
    /// [`fill_from_walls`] (or `set_tile_walkable`) and then [`build`].
    ///
    /// [`fill_from_walls`]: Self::fill_from_walls
    /// [`build`]: Self::build
    pub fn new(grid_width: i32, grid_height: i32) -> Self {
        Self {
            grid: NavGrid::new(grid_width, grid_height),
            regions: BTreeMap::new(),
            portals: BTreeMap::new(),
            tile_to_region: BTreeMap::new(),
            portal_graph: BTreeMap::new(),
        }
    }

    /// Convenience constructor: derive walkability from wall rectangles and
    /// build regions and portals immediately.
    pub fn from_walls(grid_width: i32, grid_height: i32, walls: &[WorldRect]) -> Self {
        let mut navigator = Self::new(grid_width, grid_height);
        navigator.grid.fill_from_walls(walls);
        navigator.build();
        navigator
    }

    /// The walkability grid.
    pub const fn grid(&self) -> &NavGrid {
        &self.grid
    }

    /// Derive walkability from wall rectangles. Invalidates regions until
    /// [`build`] runs again.
    ///
    /// [`build`]: Self::build
    pub fn fill_from_walls(&mut self, walls: &[WorldRect]) {
        self.grid.fill_from_walls(walls);
    }

    /// Set one tile's walkability. Invalidates regions until [`build`]
    /// runs again.
    ///
    /// [`build`]: Self::build
    pub fn set_tile_walkable(&mut self, tile_x: i32, tile_y: i32, walkable: bool) {
        self.grid.set_walkable(tile_x, tile_y, walkable);
    }

    /// Number of regions after the last [`build`].
    ///
    /// [`build`]: Self::build
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Number of portals after the last [`build`].
    ///
    /// [`build`]: Self::build
    pub fn portal_count(&self) -> usize {
        self.portals.len()
    }

    /// Iterate over all portals.
    pub fn portals(&self) -> impl Iterator<Item = &Portal> {
        self.portals.values()
    }

    /// The region a tile belongs to, if any. Portal tiles belong to no
    /// region.
    pub fn region_at(&self, tile_x: i32, tile_y: i32) -> Option<u32> {
        self.tile_to_region.get(&(tile_x, tile_y)).copied()
    }

    /// The first portal joining two regions, in either order.
    pub fn portal_between(&self, first: u32, second: u32) -> Option<&Portal> {
        self.portals
            .values()
            .find(|portal| portal.connects(first, second))
    }

    /// Open or close a portal. Unknown ids are ignored.
    pub fn set_portal_open(&mut self, portal_id: &str, open: bool) {
        if let Some(portal) = self.portals.get_mut(portal_id) {
            portal.is_open = open;
            debug!(portal_id, open, "portal state changed");
        }
    }

    /// Mark a region (and its portals) indoor or outdoor.
    pub fn set_region_indoor(&mut self, region_id: u32, indoor: bool) {
        let portal_ids = match self.regions.get_mut(&region_id) {
            Some(region) => {
                region.is_indoor = indoor;
                region.portal_ids.clone()
            }
            None => return,
        };
        for id in portal_ids {
            if let Some(portal) = self.portals.get_mut(&id) {
                portal.is_indoor = indoor;
            }
        }
    }

    // -------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------

    /// Rebuild regions, portals, and the portal graph from the grid.
    ///
    /// Doorway necks (walkable tiles whose opposite orthogonal neighbours
    /// are both blocked) are excluded from the flood fill so rooms joined
    /// only by a doorway stay distinct. Contiguous necks form one portal
    /// span; a span touching fewer than two regions is absorbed into its
    /// surrounding region instead.
    pub fn build(&mut self) {
        self.regions.clear();
        self.portals.clear();
        self.tile_to_region.clear();
        self.portal_graph.clear();

        let necks = self.collect_necks();
        self.flood_fill_regions(&necks);
        self.detect_portals(&necks);
        self.build_portal_graph();

        debug!(
            regions = self.regions.len(),
            portals = self.portals.len(),
            "navigation graph built"
        );
    }

    /// Walkable tiles that form a corridor neck: both vertical neighbours
    /// blocked (a gap in a horizontal run of wall) or both horizontal
    /// neighbours blocked.
    fn collect_necks(&self) -> BTreeSet<(i32, i32)> {
        let mut necks = BTreeSet::new();
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                if !self.grid.is_walkable(x, y) {
                    continue;
                }
                let up = self.grid.is_walkable(x, y.saturating_sub(1));
                let down = self.grid.is_walkable(x, y.saturating_add(1));
                let left = self.grid.is_walkable(x.saturating_sub(1), y);
                let right = self.grid.is_walkable(x.saturating_add(1), y);

                if (!up && !down) || (!left && !right) {
                    necks.insert((x, y));
                }
            }
        }
        necks
    }

    /// Flood-fill 4-connected regions over walkable tiles, skipping necks.
    fn flood_fill_regions(&mut self, necks: &BTreeSet<(i32, i32)>) {
        let mut visited: BTreeSet<(i32, i32)> = BTreeSet::new();
        let mut next_region: u32 = 0;

        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                let seed = (x, y);
                if visited.contains(&seed)
                    || !self.grid.is_walkable(x, y)
                    || necks.contains(&seed)
                {
                    continue;
                }

                let mut tiles = BTreeSet::new();
                let mut stack = vec![seed];
                while let Some((cx, cy)) = stack.pop() {
                    if visited.contains(&(cx, cy))
                        || !self.grid.is_walkable(cx, cy)
                        || necks.contains(&(cx, cy))
                    {
                        continue;
                    }
                    visited.insert((cx, cy));
                    tiles.insert((cx, cy));
                    for (dx, dy) in [(0, 1), (0, -1), (1, 0), (-1, 0)] {
                        stack.push((cx.saturating_add(dx), cy.saturating_add(dy)));
                    }
                }

                if !tiles.is_empty() {
                    for &tile in &tiles {
                        self.tile_to_region.insert(tile, next_region);
                    }
                    self.regions.insert(next_region, Region::new(next_region, tiles));
                    next_region = next_region.saturating_add(1);
                }
            }
        }
    }

    /// Group contiguous neck tiles into spans and turn every span that
    /// borders two regions into a portal.
    fn detect_portals(&mut self, necks: &BTreeSet<(i32, i32)>) {
        let mut remaining = necks.clone();
        let mut portal_index: u32 = 0;

        while let Some(&seed) = remaining.iter().next() {
            // Collect the 4-connected span around the seed.
            let mut span = Vec::new();
            let mut stack = vec![seed];
            while let Some(tile) = stack.pop() {
                if !remaining.remove(&tile) {
                    continue;
                }
                span.push(tile);
                for (dx, dy) in [(0, 1), (0, -1), (1, 0), (-1, 0)] {
                    stack.push((tile.0.saturating_add(dx), tile.1.saturating_add(dy)));
                }
            }
            span.sort_unstable();

            // Which regions does the span touch?
            let mut touching: BTreeSet<u32> = BTreeSet::new();
            for &(x, y) in &span {
                for (dx, dy) in [(0, 1), (0, -1), (1, 0), (-1, 0)] {
                    let neighbour = (x.saturating_add(dx), y.saturating_add(dy));
                    if let Some(&region) = self.tile_to_region.get(&neighbour) {
                        touching.insert(region);
                    }
                }
            }

            let mut regions = touching.into_iter();
            match (regions.next(), regions.next()) {
                (Some(region_a), Some(region_b)) => {
                    let (center_x, center_y) = span_center(&span);
                    let id = format!("portal_{portal_index}");
                    portal_index = portal_index.saturating_add(1);

                    let portal =
                        Portal::new(id.clone(), region_a, region_b, center_x, center_y, span);
                    if let Some(region) = self.regions.get_mut(&region_a) {
                        region.portal_ids.push(id.clone());
                    }
                    if let Some(region) = self.regions.get_mut(&region_b) {
                        region.portal_ids.push(id.clone());
                    }
                    self.portals.insert(id, portal);
                }
                (Some(only), None) => {
                    // Dead-end neck: absorb into its surrounding region.
                    for tile in span {
                        self.tile_to_region.insert(tile, only);
                        if let Some(region) = self.regions.get_mut(&only) {
                            region.tiles.insert(tile);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Connect every pair of portals that border the same region.
    fn build_portal_graph(&mut self) {
        for region in self.regions.values() {
            for (i, first_id) in region.portal_ids.iter().enumerate() {
                for second_id in region.portal_ids.iter().skip(i.saturating_add(1)) {
                    let (Some(first), Some(second)) =
                        (self.portals.get(first_id), self.portals.get(second_id))
                    else {
                        continue;
                    };
                    let cost = distance_between(
                        first.center_x,
                        first.center_y,
                        second.center_x,
                        second.center_y,
                    );
                    self.portal_graph
                        .entry(first_id.clone())
                        .or_default()
                        .push((second_id.clone(), cost));
                    self.portal_graph
                        .entry(second_id.clone())
                        .or_default()
                        .push((first_id.clone(), cost));
                }
            }
        }
        // Every portal gets a node even if isolated.
        for id in self.portals.keys() {
            self.portal_graph.entry(id.clone()).or_default();
        }
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Find a path between two world-space positions.
    pub fn find_path(&self, query: &PathQuery) -> PathResponse {
        let start_tile = self.tile_of(query.start_x, query.start_y);
        let goal_tile = self.tile_of(query.goal_x, query.goal_y);

        if !self.grid.is_walkable(start_tile.0, start_tile.1) {
            return PathResponse::failure(PathReason::InvalidStart);
        }
        if !self.grid.is_walkable(goal_tile.0, goal_tile.1) {
            return PathResponse::failure(PathReason::InvalidGoal);
        }

        let Some(start_region) = self.region_for_query(start_tile) else {
            return PathResponse::failure(PathReason::NoPath);
        };
        let Some(goal_region) = self.region_for_query(goal_tile) else {
            return PathResponse::failure(PathReason::NoPath);
        };

        if start_region == goal_region {
            return self.direct_path(start_tile, goal_tile);
        }
        self.hierarchical_path(query, start_region, goal_region, start_tile, goal_tile)
    }

    /// Same-region query: grid A*, then smoothing.
    fn direct_path(&self, start_tile: (i32, i32), goal_tile: (i32, i32)) -> PathResponse {
        let Some(tiles) = astar::find_tile_path(&self.grid, start_tile, goal_tile) else {
            return PathResponse::failure(PathReason::NoPath);
        };
        let world: Vec<(f64, f64)> = tiles.iter().map(|&(x, y)| tile_center(x, y)).collect();
        let smoothed = astar::smooth_path(&self.grid, &world);
        let cost = astar::path_length(&smoothed);
        PathResponse::success(smoothed, cost)
    }

    /// Cross-region query: Dijkstra over the portal graph, then stitch and
    /// smooth the grid segments.
    fn hierarchical_path(
        &self,
        query: &PathQuery,
        start_region: u32,
        goal_region: u32,
        start_tile: (i32, i32),
        goal_tile: (i32, i32),
    ) -> PathResponse {
        let start_portals = self.open_portals_of(start_region);
        let goal_portals = self.open_portals_of(goal_region);
        if start_portals.is_empty() || goal_portals.is_empty() {
            return PathResponse::failure(PathReason::NoPath);
        }

        let mut best: Option<(f64, &Portal, &Portal, Vec<String>)> = None;

        for &entry in &start_portals {
            for &exit in &goal_portals {
                let Some(chain) = self.portal_chain(&entry.id, &exit.id, query) else {
                    continue;
                };

                // Bias applies to every portal traversed, the entry
                // included -- otherwise a single-portal chain (the common
                // two-room case) would never feel it.
                let mut total =
                    distance_between(query.start_x, query.start_y, entry.center_x, entry.center_y)
                        * portal_factor(entry, query);
                for pair in chain.windows(2) {
                    let (Some(from_id), Some(to_id)) = (pair.first(), pair.get(1)) else {
                        continue;
                    };
                    let (Some(from), Some(to)) =
                        (self.portals.get(from_id), self.portals.get(to_id))
                    else {
                        continue;
                    };
                    total += self.edge_cost(from, to, query);
                }
                total +=
                    distance_between(exit.center_x, exit.center_y, query.goal_x, query.goal_y);

                let better = best
                    .as_ref()
                    .is_none_or(|(best_cost, ..)| total < *best_cost);
                if better {
                    best = Some((total, entry, exit, chain));
                }
            }
        }

        let Some((best_cost, entry, exit, chain)) = best else {
            return PathResponse::failure(PathReason::NoPath);
        };

        let mut waypoints: Vec<(f64, f64)> = Vec::new();

        // Start position to the entry portal, excluding the portal tile
        // itself (its centre is pushed from the chain below).
        let entry_tile = self.tile_of(entry.center_x, entry.center_y);
        if let Some(segment) = astar::find_tile_path(&self.grid, start_tile, entry_tile) {
            let keep = segment.len().saturating_sub(1);
            waypoints.extend(
                segment
                    .iter()
                    .take(keep)
                    .map(|&(x, y)| tile_center(x, y)),
            );
        }

        for id in &chain {
            if let Some(portal) = self.portals.get(id) {
                waypoints.push((portal.center_x, portal.center_y));
            }
        }

        let exit_tile = self.tile_of(exit.center_x, exit.center_y);
        if let Some(segment) = astar::find_tile_path(&self.grid, exit_tile, goal_tile) {
            waypoints.extend(segment.iter().skip(1).map(|&(x, y)| tile_center(x, y)));
        }

        waypoints.push((query.goal_x, query.goal_y));

        let smoothed = astar::smooth_path(&self.grid, &waypoints);
        PathResponse::success(smoothed, best_cost)
    }

    /// Dijkstra through the portal graph. Portal counts are tiny (tens at
    /// most), so a linear minimum scan beats priority-queue bookkeeping.
    fn portal_chain(
        &self,
        start_id: &str,
        goal_id: &str,
        query: &PathQuery,
    ) -> Option<Vec<String>> {
        if start_id == goal_id {
            return Some(vec![start_id.to_owned()]);
        }

        let mut distances: BTreeMap<&str, f64> = BTreeMap::new();
        let mut previous: BTreeMap<&str, &str> = BTreeMap::new();
        let mut unvisited: BTreeSet<&str> =
            self.portal_graph.keys().map(String::as_str).collect();

        distances.insert(start_id, 0.0);

        while !unvisited.is_empty() {
            let current = unvisited
                .iter()
                .copied()
                .min_by(|a, b| {
                    let da = distances.get(a).copied().unwrap_or(f64::INFINITY);
                    let db = distances.get(b).copied().unwrap_or(f64::INFINITY);
                    da.partial_cmp(&db).unwrap_or(Ordering::Equal)
                })?;

            let current_dist = distances.get(current).copied().unwrap_or(f64::INFINITY);
            if current_dist.is_infinite() {
                return None;
            }

            if current == goal_id {
                let mut chain = vec![current.to_owned()];
                let mut walk = current;
                while let Some(&prior) = previous.get(walk) {
                    chain.push(prior.to_owned());
                    walk = prior;
                }
                chain.reverse();
                return Some(chain);
            }

            unvisited.remove(current);

            for (neighbour_id, base_cost) in
                self.portal_graph.get(current).map_or(&[][..], Vec::as_slice)
            {
                if !unvisited.contains(neighbour_id.as_str()) {
                    continue;
                }
                let Some(neighbour) = self.portals.get(neighbour_id) else {
                    continue;
                };
                if !neighbour.is_open {
                    continue;
                }

                let cost = *base_cost * portal_factor(neighbour, query);
                let alternative = current_dist + cost;
                let existing = distances
                    .get(neighbour_id.as_str())
                    .copied()
                    .unwrap_or(f64::INFINITY);
                if alternative < existing {
                    distances.insert(neighbour_id.as_str(), alternative);
                    previous.insert(neighbour_id.as_str(), current);
                }
            }
        }

        None
    }

    /// Per-edge cost with bias and indoor preference applied to the
    /// destination portal.
    fn edge_cost(&self, from: &Portal, to: &Portal, query: &PathQuery) -> f64 {
        distance_between(from.center_x, from.center_y, to.center_x, to.center_y)
            * portal_factor(to, query)
    }

    /// Open portals bordering a region.
    fn open_portals_of(&self, region_id: u32) -> Vec<&Portal> {
        self.regions
            .get(&region_id)
            .map(|region| {
                region
                    .portal_ids
                    .iter()
                    .filter_map(|id| self.portals.get(id))
                    .filter(|portal| portal.is_open)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Region for path-query purposes: a portal tile counts as one of the
    /// regions it joins, so a character standing in a doorway can still
    /// path.
    fn region_for_query(&self, tile: (i32, i32)) -> Option<u32> {
        if let Some(&region) = self.tile_to_region.get(&tile) {
            return Some(region);
        }
        self.portals
            .values()
            .find(|portal| portal.is_open && portal.span.contains(&tile))
            .map(|portal| portal.region_a)
    }

    fn tile_of(&self, world_x: f64, world_y: f64) -> (i32, i32) {
        let tile_size = f64::from(self.grid.tile_size());
        #[allow(clippy::cast_possible_truncation)]
        {
            (
                (world_x / tile_size).floor() as i32,
                (world_y / tile_size).floor() as i32,
            )
        }
    }
}

/// Combined cost multiplier for traversing a portal under a query's bias
/// and indoor preference.
fn portal_factor(portal: &Portal, query: &PathQuery) -> f64 {
    let mut factor = query.cost_bias.get(&portal.id).copied().unwrap_or(1.0);
    if query.prefer_indoor && portal.is_indoor {
        factor *= INDOOR_DISCOUNT;
    }
    factor
}

/// World centre of a portal span.
fn span_center(span: &[(i32, i32)]) -> (f64, f64) {
    if span.is_empty() {
        return (0.0, 0.0);
    }
    let count = span.len();
    let (sum_x, sum_y) = span.iter().fold((0.0, 0.0), |(sx, sy), &(x, y)| {
        let (cx, cy) = tile_center(x, y);
        (sx + cx, sy + cy)
    });
    #[allow(clippy::cast_precision_loss)]
    {
        (sum_x / count as f64, sum_y / count as f64)
    }
}

/// The first waypoint farther than `tolerance` pixels from the current
/// position, or `None` once every waypoint has been reached.
pub fn next_waypoint(
    current_x: f64,
    current_y: f64,
    waypoints: &[(f64, f64)],
    tolerance: f64,
) -> Option<(f64, f64)> {
    waypoints
        .iter()
        .copied()
        .find(|&(wx, wy)| distance_between(current_x, current_y, wx, wy) > tolerance)
}
