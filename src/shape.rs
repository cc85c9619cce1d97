//! Shape classification from geometry markers and boundary point clouds.
//!
//! Maps a solid's partial boundary description onto a closed set of shape
//! families and derives the two correction scalars used by the estimators:
//! `volume_factor` (solid volume vs. bounding box) and `packing_efficiency`
//! (achievable fraction of a perfect grid). Classification never fails;
//! degenerate input yields the conservative `unknown` profile.

use crate::model::{ShapeKind, ShapeProfile};
use crate::types::Vec3;

/// Z tolerance when collecting points into a horizontal cross-section.
const SECTION_TOLERANCE: f64 = 0.1;

/// Maximum number of evenly spaced cross-section heights to sample.
const MAX_CROSS_SECTIONS: usize = 5;

/// A cross-section must hold more points than this to be considered.
const MIN_SECTION_POINTS: usize = 5;

/// Marker token counts extracted from a boundary-representation source.
///
/// Filled by the content scanner; consumed by [`classify_markers`]. The
/// counts beyond the primitive surfaces/curves (edges, faces, vertices)
/// only feed the complexity grade, not the classification itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarkerCounts {
    pub spherical_surfaces: usize,
    pub cylindrical_surfaces: usize,
    pub conical_surfaces: usize,
    pub bspline_surfaces: usize,
    pub bspline_curves: usize,
    pub nurbs: usize,
    pub trimmed_curves: usize,
    pub ellipses: usize,
    pub circles: usize,
    pub planes: usize,
    pub edge_curves: usize,
    pub advanced_faces: usize,
    pub vertex_points: usize,
}

impl MarkerCounts {
    /// True when no classification-relevant marker was found.
    pub fn is_empty(&self) -> bool {
        self.spherical_surfaces == 0
            && self.cylindrical_surfaces == 0
            && self.conical_surfaces == 0
            && self.bspline_surfaces == 0
            && self.bspline_curves == 0
            && self.nurbs == 0
            && self.trimmed_curves == 0
            && self.ellipses == 0
            && self.circles == 0
            && self.planes == 0
    }

    /// Total entity count used for the complexity grade.
    pub fn entity_total(&self) -> usize {
        self.advanced_faces
            + self.edge_curves
            + self.vertex_points
            + self.bspline_curves
            + self.bspline_surfaces
    }
}

/// Shape name fragments with their shape family and volume factor.
///
/// The factors are the area ratio of the named regular shape to its
/// bounding square, extended to volume for revolved solids.
const NAME_SHAPE_PATTERNS: [(&str, ShapeKind, f64); 9] = [
    ("hexagon", ShapeKind::Hexagonal, 0.866),
    ("triangle", ShapeKind::Triangular, 0.5),
    ("cylinder", ShapeKind::Cylindrical, 0.785), // π/4
    ("sphere", ShapeKind::Spherical, 0.524),     // π/6
    ("cone", ShapeKind::Conical, 0.262),         // π/12
    ("octagon", ShapeKind::Octagonal, 0.828),
    ("pentagon", ShapeKind::Pentagonal, 0.688),
    ("ellipse", ShapeKind::Elliptical, 0.785),
    ("oval", ShapeKind::Elliptical, 0.785),
];

/// Classifies a solid from whatever boundary information is available.
///
/// Priority: shape fragments in the source name, then content markers,
/// then the boundary point cloud, then the conservative `unknown` profile.
///
/// # Parameters
/// * `name` - Source name (file name or catalog label)
/// * `markers` - Marker counts from the content scanner
/// * `points` - Boundary sample points (may be empty)
pub fn classify(name: &str, markers: &MarkerCounts, points: &[Vec3]) -> ShapeProfile {
    if let Some((kind, factor)) = classify_name(name) {
        return profile_for(kind, factor);
    }
    if let Some((kind, factor)) = classify_markers(markers) {
        return profile_for(kind, factor);
    }
    if !points.is_empty() {
        let (kind, factor) = classify_point_cloud(points);
        return profile_for(kind, factor);
    }
    unknown_profile()
}

/// Looks for an explicit shape fragment in the source name.
pub fn classify_name(name: &str) -> Option<(ShapeKind, f64)> {
    let lower = name.to_ascii_lowercase();
    NAME_SHAPE_PATTERNS
        .iter()
        .find(|(pattern, _, _)| lower.contains(pattern))
        .map(|(_, kind, factor)| (*kind, *factor))
}

/// Maps content markers to a shape family, most specific first.
///
/// Returns `None` when no classification-relevant marker is present so the
/// caller can fall through to point-cloud analysis. A non-empty marker set
/// that matches no rule classifies as plain rectangular.
pub fn classify_markers(markers: &MarkerCounts) -> Option<(ShapeKind, f64)> {
    if markers.is_empty() {
        return None;
    }
    let result = if markers.spherical_surfaces > 0 {
        (ShapeKind::Spherical, 0.524)
    } else if markers.cylindrical_surfaces > 0 {
        (ShapeKind::Cylindrical, 0.785)
    } else if markers.conical_surfaces > 0 {
        (ShapeKind::Conical, 0.262)
    } else if markers.bspline_surfaces > 0 && markers.trimmed_curves > 0 {
        (ShapeKind::ComplexCurved, 0.65)
    } else if markers.bspline_curves > 0 && markers.nurbs > 0 {
        (ShapeKind::ComplexCurved, 0.7)
    } else if markers.ellipses > 0 {
        (ShapeKind::Elliptical, 0.785)
    } else if markers.circles > 0 {
        (ShapeKind::Circular, 0.785)
    } else if markers.planes > 0 {
        classify_plane_count(markers.planes)
    } else {
        (ShapeKind::Rectangular, 1.0)
    };
    Some(result)
}

/// Refines a planar-faces-only solid into a polygon family by face count.
fn classify_plane_count(planes: usize) -> (ShapeKind, f64) {
    if planes >= 8 {
        (ShapeKind::Octagonal, 0.828)
    } else if planes >= 6 {
        (ShapeKind::Hexagonal, 0.866)
    } else if planes >= 5 {
        (ShapeKind::Pentagonal, 0.688)
    } else if planes >= 3 {
        (ShapeKind::Triangular, 0.5)
    } else {
        (ShapeKind::Rectangular, 1.0)
    }
}

/// Classifies from boundary sample points alone.
///
/// The densest horizontal cross-section decides via its convex hull; a
/// rectangular hull falls through to the radial and extent pattern checks.
fn classify_point_cloud(points: &[Vec3]) -> (ShapeKind, f64) {
    if let Some(section) = densest_cross_section(points) {
        let (kind, factor) = classify_section(&section);
        if kind != ShapeKind::Rectangular {
            return (kind, factor);
        }
    }
    if has_concentric_radii(points) {
        return (ShapeKind::Cylindrical, 0.785);
    }
    if has_uniform_extents(points) {
        return (ShapeKind::Spherical, 0.524);
    }
    (ShapeKind::Rectangular, 1.0)
}

/// Collects the cross-section with the most points among up to
/// [`MAX_CROSS_SECTIONS`] evenly spaced heights.
fn densest_cross_section(points: &[Vec3]) -> Option<Vec<(f64, f64)>> {
    let mut unique_z: Vec<f64> = points.iter().map(|p| round_to(p.z, 100.0)).collect();
    unique_z.sort_by(f64::total_cmp);
    unique_z.dedup();

    let stride = unique_z.len().div_ceil(MAX_CROSS_SECTIONS).max(1);
    let mut best: Option<Vec<(f64, f64)>> = None;
    for level in unique_z.iter().step_by(stride) {
        let section: Vec<(f64, f64)> = points
            .iter()
            .filter(|p| (p.z - level).abs() < SECTION_TOLERANCE)
            .map(|p| (p.x, p.y))
            .collect();
        if section.len() > MIN_SECTION_POINTS
            && best.as_ref().is_none_or(|b| section.len() > b.len())
        {
            best = Some(section);
        }
    }
    best
}

/// Classifies a 2D cross-section by the vertex count of its convex hull.
fn classify_section(section: &[(f64, f64)]) -> (ShapeKind, f64) {
    if section.len() <= MIN_SECTION_POINTS {
        return (ShapeKind::Rectangular, 1.0);
    }
    let hull = convex_hull(section);
    match hull.len() {
        0..=4 => (ShapeKind::Rectangular, 1.0),
        5 => (ShapeKind::Pentagonal, 0.688),
        6 => (ShapeKind::Hexagonal, 0.866),
        8 => (ShapeKind::Octagonal, 0.828),
        n if n >= 12 => (ShapeKind::Circular, 0.785),
        _ => (ShapeKind::Polygonal, 0.75),
    }
}

/// Convex hull of 2D points (Andrew's monotone chain).
///
/// Collinear boundary points are dropped, so an axis-aligned rectangle
/// sampled along its edges still yields exactly 4 hull vertices.
fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut pts: Vec<(f64, f64)> = points.to_vec();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    pts.dedup();
    if pts.len() <= 2 {
        return pts;
    }

    fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    }

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    // Last point of each half repeats the start of the other
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Detects concentric radial grouping in the XY plane.
///
/// At least 3 distinct radii with 2+ groups of 4+ points each suggest a
/// revolved (cylindrical) solid.
fn has_concentric_radii(points: &[Vec3]) -> bool {
    if points.len() < 8 {
        return false;
    }
    let (min_x, max_x) = extent(points.iter().map(|p| p.x));
    let (min_y, max_y) = extent(points.iter().map(|p| p.y));
    let center_x = (max_x + min_x) / 2.0;
    let center_y = (max_y + min_y) / 2.0;

    let distances: Vec<f64> = points
        .iter()
        .map(|p| ((p.x - center_x).powi(2) + (p.y - center_y).powi(2)).sqrt())
        .collect();

    let mut radii: Vec<f64> = distances
        .iter()
        .filter(|d| **d > 0.0)
        .map(|d| round_to(*d, 10.0))
        .collect();
    radii.sort_by(f64::total_cmp);
    radii.dedup();
    if radii.len() < 3 {
        return false;
    }

    let significant = radii
        .iter()
        .filter(|radius| {
            distances.iter().filter(|d| (**d - **radius).abs() < 1.0).count() >= 4
        })
        .count();
    significant >= 2
}

/// Detects near-equal extents on all three axes over a large sample,
/// suggesting a spherical solid.
fn has_uniform_extents(points: &[Vec3]) -> bool {
    if points.len() <= 20 {
        return false;
    }
    let (min_x, max_x) = extent(points.iter().map(|p| p.x));
    let (min_y, max_y) = extent(points.iter().map(|p| p.y));
    let (min_z, max_z) = extent(points.iter().map(|p| p.z));
    let x_range = max_x - min_x;
    let y_range = max_y - min_y;
    let z_range = max_z - min_z;

    let avg_range = (x_range + y_range + z_range) / 3.0;
    let deviation = (x_range - avg_range)
        .abs()
        .max((y_range - avg_range).abs())
        .max((z_range - avg_range).abs());
    deviation < 0.2 * avg_range
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
        (min.min(v), max.max(v))
    })
}

fn round_to(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}

/// Packing efficiency per shape family: the realizable fraction of a
/// perfect grid of bounding boxes.
pub fn packing_efficiency_for(kind: ShapeKind) -> f64 {
    match kind {
        ShapeKind::Rectangular => 1.0,
        ShapeKind::Hexagonal => 0.9,
        ShapeKind::Octagonal => 0.85,
        ShapeKind::Pentagonal => 0.8,
        ShapeKind::Triangular => 0.75,
        ShapeKind::Cylindrical => 0.7,
        ShapeKind::Spherical => 0.64, // theoretical sphere-packing limit
        ShapeKind::Elliptical => 0.7,
        ShapeKind::Conical => 0.6,
        ShapeKind::ComplexCurved => 0.65,
        ShapeKind::Circular => 0.7,
        ShapeKind::Polygonal => 0.75,
        ShapeKind::Unknown => 0.75,
    }
}

/// Default volume factor per shape family, for callers that supply only a
/// shape name (manual entry, API requests).
pub fn default_volume_factor(kind: ShapeKind) -> f64 {
    match kind {
        ShapeKind::Rectangular => 1.0,
        ShapeKind::Hexagonal => 0.866,
        ShapeKind::Triangular => 0.5,
        ShapeKind::Cylindrical => 0.785,
        ShapeKind::Spherical => 0.524,
        ShapeKind::Conical => 0.262,
        ShapeKind::Octagonal => 0.828,
        ShapeKind::Pentagonal => 0.688,
        ShapeKind::Elliptical => 0.785,
        ShapeKind::Circular => 0.785,
        ShapeKind::ComplexCurved => 0.65,
        ShapeKind::Polygonal => 0.75,
        ShapeKind::Unknown => 0.8,
    }
}

/// Builds a profile from a shape family and volume factor, attaching the
/// packing efficiency from the fixed table.
pub fn profile_for(kind: ShapeKind, volume_factor: f64) -> ShapeProfile {
    ShapeProfile {
        shape_type: kind,
        volume_factor,
        packing_efficiency: packing_efficiency_for(kind),
    }
}

/// Conservative profile for geometry without usable boundary information.
pub fn unknown_profile() -> ShapeProfile {
    profile_for(ShapeKind::Unknown, 0.8)
}
