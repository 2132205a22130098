//! Regions and portals: the high-level layer of the navigator.
//!
//! A region is a connected component of walkable tiles (4-neighbour flood
//! fill). A portal is a walkable tile span on the border between two
//! regions -- a doorway. Portals can be closed at runtime, which removes
//! them from path queries until reopened.

use std::collections::BTreeSet;

/// A connected component of walkable tiles.
#[derive(Debug, Clone)]
pub struct Region {
    /// Region identifier, assigned in flood-fill order.
    pub id: u32,
    /// Every walkable tile belonging to this region.
    pub tiles: BTreeSet<(i32, i32)>,
    /// Ids of the portals on this region's border.
    pub portal_ids: Vec<String>,
    /// Whether the region is indoors (affects `prefer_indoor` costing).
    pub is_indoor: bool,
}

impl Region {
    /// Create a region from its flood-filled tile set.
    pub const fn new(id: u32, tiles: BTreeSet<(i32, i32)>) -> Self {
        Self {
            id,
            tiles,
            portal_ids: Vec::new(),
            is_indoor: false,
        }
    }
}

/// A doorway connecting two regions.
#[derive(Debug, Clone)]
pub struct Portal {
    /// Stable identifier, e.g. `"portal_0"`.
    pub id: String,
    /// One side of the doorway.
    pub region_a: u32,
    /// The other side of the doorway.
    pub region_b: u32,
    /// World-space x of the portal centre.
    pub center_x: f64,
    /// World-space y of the portal centre.
    pub center_y: f64,
    /// The tiles forming the doorway span.
    pub span: Vec<(i32, i32)>,
    /// Closed portals are skipped by path queries.
    pub is_open: bool,
    /// Whether the portal is indoors (affects `prefer_indoor` costing).
    pub is_indoor: bool,
}

impl Portal {
    /// Create an open outdoor portal.
    pub const fn new(
        id: String,
        region_a: u32,
        region_b: u32,
        center_x: f64,
        center_y: f64,
        span: Vec<(i32, i32)>,
    ) -> Self {
        Self {
            id,
            region_a,
            region_b,
            center_x,
            center_y,
            span,
            is_open: true,
            is_indoor: false,
        }
    }

    /// Whether this portal joins the two given regions, in either order.
    pub const fn connects(&self, first: u32, second: u32) -> bool {
        (self.region_a == first && self.region_b == second)
            || (self.region_a == second && self.region_b == first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portal_connects_in_either_order() {
        let portal = Portal::new("portal_0".to_owned(), 0, 1, 96.0, 48.0, vec![(3, 1)]);
        assert!(portal.connects(0, 1));
        assert!(portal.connects(1, 0));
        assert!(!portal.connects(0, 2));
    }

    #[test]
    fn new_portal_is_open_and_outdoor() {
        let portal = Portal::new("portal_1".to_owned(), 2, 3, 0.0, 0.0, Vec::new());
        assert!(portal.is_open);
        assert!(!portal.is_indoor);
    }
}
