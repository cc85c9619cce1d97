//! Data models for the packing estimation engine.
//!
//! This module defines the fundamental data structures of the pipeline:
//! - `Dimensions`: validated bounding-box extents in millimeters
//! - `ShapeProfile`: shape family plus its volume/packing correction factors
//! - `ShapedItem`: dimensions + profile, used for container and item alike
//! - `PlacedItem` / `PackingReport`: the terminal, immutable result values
//!
//! All structures implement the traits from the `types` module where they
//! have spatial extent.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::types::{BoundingBox, Dimensional, Positioned, Vec3, validation};

/// Validation error for request and model data.
#[derive(Debug, Clone)]
pub enum ValidationError {
    InvalidDimension(String),
    InvalidFactor(String),
    InvalidConfiguration(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            ValidationError::InvalidFactor(msg) => write!(f, "Invalid factor: {}", msg),
            ValidationError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Bounding-box extents of a solid in millimeters.
///
/// Immutable once constructed; construction guarantees all three axes are
/// strictly positive and finite.
///
/// # Examples
/// ```
/// use pack_it_in::model::Dimensions;
///
/// let dims = Dimensions::new(1000.0, 800.0, 600.0);
/// assert!(dims.is_ok());
///
/// let degenerate = Dimensions::new(0.0, 800.0, 600.0);
/// assert!(degenerate.is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Dimensions {
    #[schema(example = 1000.0)]
    pub length: f64,
    #[schema(example = 800.0)]
    pub width: f64,
    #[schema(example = 600.0)]
    pub height: f64,
}

impl Dimensions {
    /// Creates validated dimensions.
    ///
    /// # Parameters
    /// * `length` - Extent along X in mm
    /// * `width` - Extent along Y in mm
    /// * `height` - Extent along Z in mm
    ///
    /// # Returns
    /// `Ok(Dimensions)` for strictly positive finite values, otherwise
    /// `Err(ValidationError)`
    pub fn new(length: f64, width: f64, height: f64) -> Result<Self, ValidationError> {
        validation::validate_dimensions_3d((length, width, height))
            .map_err(ValidationError::InvalidDimension)?;
        Ok(Self {
            length,
            width,
            height,
        })
    }

    /// Creates dimensions with each axis floored at 1.0 mm.
    ///
    /// Used by extraction paths where an axis may resolve to zero (flat
    /// point clouds, missing extents). Non-finite inputs also floor to 1.0,
    /// so the result always satisfies the positivity invariant.
    pub fn floored(length: f64, width: f64, height: f64) -> Self {
        let floor_axis = |v: f64| if v.is_finite() { v.max(1.0) } else { 1.0 };
        Self {
            length: floor_axis(length),
            width: floor_axis(width),
            height: floor_axis(height),
        }
    }

    /// Converts the extents to a Vec3.
    #[inline]
    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.length, self.width, self.height)
    }

    /// Converts to tuple format `(length, width, height)`.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.length, self.width, self.height)
    }

    /// Calculates the bounding volume in mm³.
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }
}

impl Dimensional for Dimensions {
    fn dimensions(&self) -> Vec3 {
        self.as_vec3()
    }
}

/// Closed set of shape families the classifier can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rectangular,
    Hexagonal,
    Triangular,
    Cylindrical,
    Spherical,
    Conical,
    Octagonal,
    Pentagonal,
    Elliptical,
    Circular,
    ComplexCurved,
    Polygonal,
    Unknown,
}

impl ShapeKind {
    /// Stable lowercase name, matching the wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Rectangular => "rectangular",
            ShapeKind::Hexagonal => "hexagonal",
            ShapeKind::Triangular => "triangular",
            ShapeKind::Cylindrical => "cylindrical",
            ShapeKind::Spherical => "spherical",
            ShapeKind::Conical => "conical",
            ShapeKind::Octagonal => "octagonal",
            ShapeKind::Pentagonal => "pentagonal",
            ShapeKind::Elliptical => "elliptical",
            ShapeKind::Circular => "circular",
            ShapeKind::ComplexCurved => "complex_curved",
            ShapeKind::Polygonal => "polygonal",
            ShapeKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape family of a solid plus the two correction scalars derived from it.
///
/// `volume_factor` is the ratio of true solid volume to bounding-box volume.
/// `packing_efficiency` is a different scalar: the fraction of a perfect
/// grid of bounding boxes that survives when the real solids are packed
/// against each other. Both lie in (0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShapeProfile {
    pub shape_type: ShapeKind,
    #[schema(example = 0.785)]
    pub volume_factor: f64,
    #[schema(example = 0.7)]
    pub packing_efficiency: f64,
}

impl ShapeProfile {
    /// Creates a validated profile.
    ///
    /// # Returns
    /// `Ok(ShapeProfile)` when both factors lie in (0, 1], otherwise
    /// `Err(ValidationError)`
    pub fn new(
        shape_type: ShapeKind,
        volume_factor: f64,
        packing_efficiency: f64,
    ) -> Result<Self, ValidationError> {
        validation::validate_unit_factor(volume_factor, "Volume factor")
            .map_err(ValidationError::InvalidFactor)?;
        validation::validate_unit_factor(packing_efficiency, "Packing efficiency")
            .map_err(ValidationError::InvalidFactor)?;
        Ok(Self {
            shape_type,
            volume_factor,
            packing_efficiency,
        })
    }

    /// The trivial profile of an exactly rectangular solid.
    pub const fn rectangular() -> Self {
        Self {
            shape_type: ShapeKind::Rectangular,
            volume_factor: 1.0,
            packing_efficiency: 1.0,
        }
    }
}

impl Default for ShapeProfile {
    fn default() -> Self {
        Self::rectangular()
    }
}

/// A solid described by its bounding box and shape profile.
///
/// Used for both the container and the repeated item; a non-rectangular
/// container is permitted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShapedItem {
    pub dimensions: Dimensions,
    pub profile: ShapeProfile,
}

impl ShapedItem {
    /// Creates a shaped solid from validated parts.
    pub const fn new(dimensions: Dimensions, profile: ShapeProfile) -> Self {
        Self {
            dimensions,
            profile,
        }
    }

    /// Bounding-box volume in mm³.
    #[inline]
    pub fn bounding_volume(&self) -> f64 {
        self.dimensions.volume()
    }

    /// Estimated true solid volume in mm³ (bounding volume scaled by the
    /// volume factor).
    #[inline]
    pub fn real_volume(&self) -> f64 {
        self.bounding_volume() * self.profile.volume_factor
    }
}

impl Dimensional for ShapedItem {
    fn dimensions(&self) -> Vec3 {
        self.dimensions.as_vec3()
    }
}

/// One placed copy of the item inside the container.
///
/// Output-only: produced by the placement solver or synthesized from the
/// winning grid orientation.
///
/// # Fields
/// * `position` - Lower left front corner (x, y, z) in mm
/// * `dimensions` - Oriented extents (w, h, d) in mm
/// * `rotation_index` - Index into the solver's rotation table (0 for grid
///   placements)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlacedItem {
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.0, 0.0]))]
    pub position: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([200.0, 150.0, 100.0]))]
    pub dimensions: (f64, f64, f64),
    pub rotation_index: usize,
}

impl PlacedItem {
    /// Returns the top Z coordinate of the placed copy.
    #[inline]
    pub fn top_z(&self) -> f64 {
        self.position.2 + self.dimensions.2
    }

    /// Converts the position to a Vec3.
    #[inline]
    pub fn position_vec3(&self) -> Vec3 {
        Vec3::from_tuple(self.position)
    }

    /// Axis-aligned bounding box of the placed copy.
    #[inline]
    #[allow(dead_code)]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(self.position_vec3(), Vec3::from_tuple(self.dimensions))
    }
}

impl Positioned for PlacedItem {
    fn position(&self) -> Vec3 {
        self.position_vec3()
    }
}

impl Dimensional for PlacedItem {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dimensions)
    }
}

/// Where the placements of a report came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlacementSource {
    Grid,
    Solver,
}

/// Diagnostic block describing how the winning estimate was found.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OptimizationInfo {
    /// Name of the strategy preset the winning trial used, or "grid".
    #[schema(example = "high_stability")]
    pub strategy: String,
    #[schema(value_type = [f64; 3], example = json!([1000.0, 800.0, 600.0]))]
    pub container_orientation: (f64, f64, f64),
    #[schema(value_type = [f64; 3], example = json!([200.0, 150.0, 100.0]))]
    pub item_orientation: (f64, f64, f64),
    /// Number of solver trials evaluated before the result was selected.
    pub trials_evaluated: usize,
    pub placement_source: PlacementSource,
    /// Wall-clock time of the search phase in milliseconds.
    pub elapsed_ms: u64,
}

/// Terminal result of one packing estimation.
///
/// Pure value, immutable once assembled. `efficiency_percent` is
/// `used_volume / box_volume * 100`; `used_volume` is
/// `max_objects * item bounding volume * item volume factor`; `box_volume`
/// is the container's unscaled bounding volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackingReport {
    /// Final estimated count: the better of grid estimate and solver search.
    #[schema(example = 160)]
    pub max_objects: usize,
    /// Volumetric upper bound from the real (factor-scaled) volumes.
    #[schema(example = 174)]
    pub theoretical_max: usize,
    /// Volume utilization in percent, in [0, 100].
    #[schema(example = 66.67)]
    pub efficiency_percent: f64,
    /// Container bounding volume in mm³.
    pub box_volume: f64,
    /// Volume claimed by the placed items in mm³.
    pub used_volume: f64,
    /// One entry per placed copy, ordered as produced.
    pub placements: Vec<PlacedItem>,
    /// Human-readable failure description (item never fits), otherwise None.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationInfo>,
}

impl PackingReport {
    /// True when the estimation ended in the item-never-fits error path.
    pub fn is_rejected(&self) -> bool {
        self.error.is_some()
    }
}
