//! Region descriptors and spatial helpers.
//!
//! A [`RegionDescriptor`] is an immutable snapshot of a region's identity
//! and placement on the grid. Positions and sizes are in meters. A region
//! that moves gets a new descriptor; nothing in Gridlink mutates one in
//! place.

use serde::{Deserialize, Serialize};

use crate::ids::{RegionId, ScopeId};

/// Packed grid position of a region: `(x << 32) | y`, both in meters.
///
/// Handles are how in-process scenes are looked up during hand-off and how
/// pending viewer events are keyed per region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionHandle(pub u64);

impl RegionHandle {
    /// Pack a world position (meters) into a handle.
    pub fn from_position(x: u32, y: u32) -> Self {
        Self((u64::from(x) << 32) | u64::from(y))
    }

    /// X coordinate in meters.
    pub fn x(self) -> u32 {
        u32::try_from(self.0 >> 32).unwrap_or(u32::MAX)
    }

    /// Y coordinate in meters.
    pub fn y(self) -> u32 {
        u32::try_from(self.0 & u64::from(u32::MAX)).unwrap_or(u32::MAX)
    }
}

impl core::fmt::Display for RegionHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive axis-aligned box in world meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewBounds {
    /// Smallest X inside the box.
    pub min_x: i32,
    /// Largest X inside the box.
    pub max_x: i32,
    /// Smallest Y inside the box.
    pub min_y: i32,
    /// Largest Y inside the box.
    pub max_y: i32,
}

impl ViewBounds {
    /// Whether the point lies inside the box (edges included).
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Identity and placement of a region on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    /// Region identity.
    pub region_id: RegionId,
    /// Human-readable region name.
    pub name: String,
    /// West edge in meters.
    pub loc_x: i32,
    /// South edge in meters.
    pub loc_y: i32,
    /// Width in meters.
    pub size_x: i32,
    /// Depth in meters.
    pub size_y: i32,
    /// Grid namespace this region belongs to.
    pub scope_id: ScopeId,
    /// Base URI of the server process hosting the region.
    pub server_uri: String,
}

impl RegionDescriptor {
    /// Packed handle of the region's position.
    ///
    /// Negative coordinates are not valid grid positions and clamp to zero.
    pub fn handle(&self) -> RegionHandle {
        RegionHandle::from_position(
            u32::try_from(self.loc_x).unwrap_or(0),
            u32::try_from(self.loc_y).unwrap_or(0),
        )
    }

    /// The inclusive box this region occupies.
    pub const fn footprint(&self) -> ViewBounds {
        self.view_bounds(0, 0)
    }

    /// The box visible from this region given a view distance per axis.
    ///
    /// Spans `[pos - view, pos + view + size - 1]` on each axis.
    pub const fn view_bounds(&self, view_x: i32, view_y: i32) -> ViewBounds {
        ViewBounds {
            min_x: self.loc_x.saturating_sub(view_x),
            max_x: self
                .loc_x
                .saturating_add(view_x)
                .saturating_add(self.size_x)
                .saturating_sub(1),
            min_y: self.loc_y.saturating_sub(view_y),
            max_y: self
                .loc_y
                .saturating_add(view_y)
                .saturating_add(self.size_y)
                .saturating_sub(1),
        }
    }

    /// Whether a world point falls inside this region.
    pub const fn contains_point(&self, x: i32, y: i32) -> bool {
        self.footprint().contains(x, y)
    }

    /// Whether this region's footprint overlaps the given box.
    pub const fn intersects(&self, bounds: &ViewBounds) -> bool {
        let own = self.footprint();
        own.min_x <= bounds.max_x
            && own.max_x >= bounds.min_x
            && own.min_y <= bounds.max_y
            && own.max_y >= bounds.min_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: i32, y: i32, size: i32) -> RegionDescriptor {
        RegionDescriptor {
            region_id: RegionId::new(),
            name: format!("r{x}_{y}"),
            loc_x: x,
            loc_y: y,
            size_x: size,
            size_y: size,
            scope_id: ScopeId::nil(),
            server_uri: "http://localhost:9000".to_owned(),
        }
    }

    #[test]
    fn handle_packs_position() {
        let handle = RegionHandle::from_position(256_000, 512_000);
        assert_eq!(handle.x(), 256_000);
        assert_eq!(handle.y(), 512_000);
        assert_eq!(region(256, 512, 256).handle(), RegionHandle::from_position(256, 512));
    }

    #[test]
    fn view_bounds_cover_view_on_both_sides() {
        let bounds = region(0, 0, 1).view_bounds(1, 1);
        assert_eq!(bounds.min_x, -1);
        assert_eq!(bounds.max_x, 1);
        assert_eq!(bounds.min_y, -1);
        assert_eq!(bounds.max_y, 1);
    }

    #[test]
    fn adjacent_regions_intersect_view_box() {
        let center = region(256, 256, 256);
        let east = region(512, 256, 256);
        let far = region(1024, 256, 256);
        let bounds = center.view_bounds(256, 256);
        assert!(east.intersects(&bounds));
        assert!(!far.intersects(&bounds));
    }

    #[test]
    fn contains_point_includes_edges() {
        let r = region(256, 256, 256);
        assert!(r.contains_point(256, 256));
        assert!(r.contains_point(511, 511));
        assert!(!r.contains_point(512, 256));
    }

    #[test]
    fn view_bounds_saturate() {
        let near_edge = i32::MAX.saturating_sub(1);
        let r = region(near_edge, 0, 256);
        // Clamps at i32::MAX before the trailing `- 1`.
        assert_eq!(r.view_bounds(256, 0).max_x, near_edge);
        assert_eq!(region(i32::MIN, 0, 256).view_bounds(256, 0).min_x, i32::MIN);
    }
}
