//! The walkability grid backing the navigator.
//!
//! A flat `Vec<bool>` indexed by `y * width + x`. All out-of-bounds queries
//! answer "not walkable", which keeps every algorithm bounds-safe without
//! scattering range checks.

use hamlet_types::{TILE_SIZE, WorldRect};

/// A rectangular grid of walkable/blocked tiles.
#[derive(Debug, Clone)]
pub struct NavGrid {
    width: i32,
    height: i32,
    tile_size: i32,
    walkable: Vec<bool>,
}

impl NavGrid {
    /// Create a grid with every tile blocked.
    ///
    /// Non-positive dimensions produce an empty grid where no tile is
    /// walkable.
    pub fn new(width: i32, height: i32) -> Self {
        let cells = usize::try_from(width.max(0))
            .unwrap_or(0)
            .saturating_mul(usize::try_from(height.max(0)).unwrap_or(0));
        Self {
            width: width.max(0),
            height: height.max(0),
            tile_size: TILE_SIZE,
            walkable: vec![false; cells],
        }
    }

    /// Grid width in tiles.
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in tiles.
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Tile side length in pixels.
    pub const fn tile_size(&self) -> i32 {
        self.tile_size
    }

    fn index(&self, tile_x: i32, tile_y: i32) -> Option<usize> {
        if tile_x < 0 || tile_y < 0 || tile_x >= self.width || tile_y >= self.height {
            return None;
        }
        let x = usize::try_from(tile_x).ok()?;
        let y = usize::try_from(tile_y).ok()?;
        let w = usize::try_from(self.width).ok()?;
        y.checked_mul(w)?.checked_add(x)
    }

    /// Whether a tile is inside the grid and walkable.
    pub fn is_walkable(&self, tile_x: i32, tile_y: i32) -> bool {
        self.index(tile_x, tile_y)
            .and_then(|i| self.walkable.get(i).copied())
            .unwrap_or(false)
    }

    /// Set the walkability of one tile. Out-of-bounds coordinates are
    /// ignored.
    pub fn set_walkable(&mut self, tile_x: i32, tile_y: i32, walkable: bool) {
        if let Some(i) = self.index(tile_x, tile_y)
            && let Some(cell) = self.walkable.get_mut(i)
        {
            *cell = walkable;
        }
    }

    /// Mark every tile walkable, then block every tile whose 32x32 world
    /// rectangle intersects a wall.
    pub fn fill_from_walls(&mut self, walls: &[WorldRect]) {
        for cell in &mut self.walkable {
            *cell = true;
        }

        for wall in walls {
            let start_x = wall.x.div_euclid(self.tile_size).max(0);
            let end_x = wall
                .x
                .saturating_add(wall.width)
                .saturating_add(self.tile_size.saturating_sub(1))
                .div_euclid(self.tile_size)
                .min(self.width);
            let start_y = wall.y.div_euclid(self.tile_size).max(0);
            let end_y = wall
                .y
                .saturating_add(wall.height)
                .saturating_add(self.tile_size.saturating_sub(1))
                .div_euclid(self.tile_size)
                .min(self.height);

            for y in start_y..end_y {
                for x in start_x..end_x {
                    self.set_walkable(x, y, false);
                }
            }
        }
    }

    /// ASCII rows of the grid for tests and debugging: `.` walkable,
    /// `#` blocked.
    pub fn debug_rows(&self) -> Vec<String> {
        let mut rows = Vec::with_capacity(usize::try_from(self.height).unwrap_or(0));
        for y in 0..self.height {
            let mut row = String::with_capacity(usize::try_from(self.width).unwrap_or(0));
            for x in 0..self.width {
                row.push(if self.is_walkable(x, y) { '.' } else { '#' });
            }
            rows.push(row);
        }
        rows
    }
}
