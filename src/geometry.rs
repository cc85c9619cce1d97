//! Geometric helpers for 3D collision detection and support checks.
//!
//! This module provides functions for checking overlap between placed
//! items and for computing overlaps along single axes and in the XY plane.

use crate::model::PlacedItem;

/// Checks whether two placed items overlap in space.
///
/// Uses Axis-Aligned Bounding Box (AABB) collision detection. Two boxes do
/// NOT overlap if they are separated along at least one axis.
///
/// # Parameters
/// * `a` - First placed item
/// * `b` - Second placed item
///
/// # Returns
/// `true` if the items overlap, otherwise `false`
#[allow(dead_code)]
pub fn intersects(a: &PlacedItem, b: &PlacedItem) -> bool {
    let (ax, ay, az) = a.position;
    let (aw, ad, ah) = a.dimensions;
    let (bx, by, bz) = b.position;
    let (bw, bd, bh) = b.dimensions;

    // Separating Axis Theorem: no overlap if fully separated on any axis
    !(ax + aw <= bx
        || bx + bw <= ax
        || ay + ad <= by
        || by + bd <= ay
        || az + ah <= bz
        || bz + bh <= az)
}

/// Computes the overlap of two intervals along one axis.
///
/// # Parameters
/// * `a1` - Start of the first interval
/// * `a2` - End of the first interval
/// * `b1` - Start of the second interval
/// * `b2` - End of the second interval
///
/// # Returns
/// Length of the overlap, at least 0.0
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Computes the overlap area of two placed items in the XY plane.
///
/// # Parameters
/// * `a` - First placed item
/// * `b` - Second placed item
///
/// # Returns
/// Area of the overlap in the XY plane
pub fn overlap_area_xy(a: &PlacedItem, b: &PlacedItem) -> f64 {
    let overlap_x = overlap_1d(
        a.position.0,
        a.position.0 + a.dimensions.0,
        b.position.0,
        b.position.0 + b.dimensions.0,
    );
    let overlap_y = overlap_1d(
        a.position.1,
        a.position.1 + a.dimensions.1,
        b.position.1,
        b.position.1 + b.dimensions.1,
    );
    overlap_x * overlap_y
}

/// Checks whether a point lies inside a placed item.
///
/// # Parameters
/// * `point` - The point to test (x, y, z)
/// * `placed` - The placed item
///
/// # Returns
/// `true` if the point lies inside the item
pub fn point_inside(point: (f64, f64, f64), placed: &PlacedItem) -> bool {
    let (px, py, pz) = point;
    let (bx, by, bz) = placed.position;
    let (bw, bd, bh) = placed.dimensions;

    px >= bx && px <= bx + bw && py >= by && py <= by + bd && pz >= bz && pz <= bz + bh
}
