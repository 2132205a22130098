//! Tile-grid geometry: world coordinates are pixels, grid coordinates are
//! 32 px tiles.
//!
//! World positions come from the host engine as pixel coordinates; the
//! observation builder and navigator work in tile coordinates. Conversion
//! uses floored division so negative world coordinates land on the correct
//! tile (plain integer division truncates toward zero and would be off by
//! one left of the origin).

use serde::{Deserialize, Serialize};

/// Side length of one tile in pixels.
pub const TILE_SIZE: i32 = 32;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// A cardinal movement direction, serialized as the single letters the
/// action schema uses (`"N"`, `"E"`, `"S"`, `"W"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Up on screen (negative y).
    #[serde(rename = "N")]
    North,
    /// Right on screen (positive x).
    #[serde(rename = "E")]
    East,
    /// Down on screen (positive y).
    #[serde(rename = "S")]
    South,
    /// Left on screen (negative x).
    #[serde(rename = "W")]
    West,
}

impl Direction {
    /// Pixel displacement for one step of `step` pixels in this direction.
    pub const fn delta(self, step: i32) -> (i32, i32) {
        match self {
            Self::North => (0, -step),
            Self::East => (step, 0),
            Self::South => (0, step),
            Self::West => (-step, 0),
        }
    }

    /// The single-letter wire form.
    pub const fn as_letter(self) -> &'static str {
        match self {
            Self::North => "N",
            Self::East => "E",
            Self::South => "S",
            Self::West => "W",
        }
    }

    /// Parse the single-letter wire form. Case-sensitive.
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "N" => Some(Self::North),
            "E" => Some(Self::East),
            "S" => Some(Self::South),
            "W" => Some(Self::West),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rectangles
// ---------------------------------------------------------------------------

/// An axis-aligned rectangle in world (pixel) coordinates.
///
/// Used for walls, entity footprints, and character collision boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldRect {
    /// Left edge in pixels.
    pub x: i32,
    /// Top edge in pixels.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl WorldRect {
    /// Create a rectangle from its top-left corner and size.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// The 32x32 rectangle covering a single tile.
    pub const fn for_tile(tile_x: i32, tile_y: i32) -> Self {
        Self {
            x: tile_x.saturating_mul(TILE_SIZE),
            y: tile_y.saturating_mul(TILE_SIZE),
            width: TILE_SIZE,
            height: TILE_SIZE,
        }
    }

    /// Whether two rectangles overlap. Touching edges do not count.
    pub const fn overlaps(&self, other: &Self) -> bool {
        let self_right = self.x.saturating_add(self.width);
        let self_bottom = self.y.saturating_add(self.height);
        let other_right = other.x.saturating_add(other.width);
        let other_bottom = other.y.saturating_add(other.height);

        !(self_right <= other.x
            || other_right <= self.x
            || self_bottom <= other.y
            || other_bottom <= self.y)
    }

    /// Centre point in pixels.
    pub const fn center(&self) -> (i32, i32) {
        (
            self.x.saturating_add(self.width / 2),
            self.y.saturating_add(self.height / 2),
        )
    }
}

// ---------------------------------------------------------------------------
// Coordinate conversion
// ---------------------------------------------------------------------------

/// Convert world (pixel) coordinates to the tile they fall in.
pub const fn world_to_tile(world_x: i32, world_y: i32) -> (i32, i32) {
    (world_x.div_euclid(TILE_SIZE), world_y.div_euclid(TILE_SIZE))
}

/// World coordinates of a tile's top-left corner.
pub const fn tile_to_world(tile_x: i32, tile_y: i32) -> (i32, i32) {
    (
        tile_x.saturating_mul(TILE_SIZE),
        tile_y.saturating_mul(TILE_SIZE),
    )
}

/// World coordinates of a tile's centre point.
pub fn tile_center(tile_x: i32, tile_y: i32) -> (f64, f64) {
    let (wx, wy) = tile_to_world(tile_x, tile_y);
    let half = f64::from(TILE_SIZE) / 2.0;
    (f64::from(wx) + half, f64::from(wy) + half)
}

/// Euclidean distance between two world-space points.
pub fn distance_between(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    dx.hypot(dy)
}
