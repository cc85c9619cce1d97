//! Dimension extraction with explicit source tagging.
//!
//! Produces canonical bounding-box dimensions plus a shape profile from
//! whichever geometry information a source offers, in a fixed priority
//! order. Every extraction path is tagged with the [`GeometrySource`]
//! variant that produced it, so the guarantees of each path stay visible
//! to callers. Only a missing or unreadable source is an error; unparsable
//! content always reaches the size fallback.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{Dimensions, ShapeKind, ShapeProfile};
use crate::scan::{self, Complexity, ModelSummary};
use crate::shape;
use crate::types::Vec3;

/// Which extraction path produced the dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeometrySource {
    /// Dimensions stated verbatim: caller metadata, an `LxWxH` name token
    /// or a header dimension comment.
    Explicit,
    /// Bounding box over the scanned boundary sample points.
    PointCloud,
    /// Canned sizes keyed by shape/category name fragments.
    NamePattern,
    /// Deterministic pseudo-dimensions derived from the byte size.
    SizeFallback,
}

/// Extraction failure: the geometry source itself is missing or unreadable.
#[derive(Debug)]
pub enum ExtractError {
    SourceNotFound { path: String, source: io::Error },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::SourceNotFound { path, source } => {
                write!(f, "Geometry source not found: {}: {}", path, source)
            }
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::SourceNotFound { source, .. } => Some(source),
        }
    }
}

/// Result of one extraction: dimensions, profile and provenance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExtractedDimensions {
    pub dimensions: Dimensions,
    pub profile: ShapeProfile,
    pub source: GeometrySource,
    pub byte_size: u64,
    pub complexity: Complexity,
}

/// Name fragments with canned dimensions for sources that carry neither
/// points nor explicit values.
const NAME_SIZE_PATTERNS: [(&str, (f64, f64, f64), ShapeKind, f64); 10] = [
    ("hexagon", (200.0, 173.2, 100.0), ShapeKind::Hexagonal, 0.866),
    ("triangle", (200.0, 173.2, 100.0), ShapeKind::Triangular, 0.5),
    ("cylinder", (200.0, 200.0, 150.0), ShapeKind::Cylindrical, 0.785),
    ("sphere", (150.0, 150.0, 150.0), ShapeKind::Spherical, 0.524),
    ("cone", (100.0, 100.0, 150.0), ShapeKind::Conical, 0.262),
    ("octagon", (200.0, 183.0, 100.0), ShapeKind::Octagonal, 0.828),
    ("pentagon", (200.0, 190.2, 100.0), ShapeKind::Pentagonal, 0.688),
    ("box_small", (200.0, 150.0, 100.0), ShapeKind::Rectangular, 1.0),
    ("box_medium", (400.0, 300.0, 200.0), ShapeKind::Rectangular, 1.0),
    ("box_large", (800.0, 600.0, 400.0), ShapeKind::Rectangular, 1.0),
];

/// Reads, scans and extracts from a file on disk.
///
/// # Parameters
/// * `path` - Geometry source file
/// * `metadata_dims` - Caller-supplied explicit dimensions, if any
///
/// # Returns
/// `Err(ExtractError::SourceNotFound)` only when the file cannot be read.
pub fn extract_from_path(
    path: &Path,
    metadata_dims: Option<(f64, f64, f64)>,
) -> Result<ExtractedDimensions, ExtractError> {
    let summary =
        ModelSummary::from_path(path).map_err(|source| ExtractError::SourceNotFound {
            path: path.display().to_string(),
            source,
        })?;
    Ok(extract(&summary, metadata_dims))
}

/// Extracts dimensions from an already scanned source.
///
/// Priority order, first success wins:
/// 1. Explicit values (caller metadata, `LxWxH` name token, header
///    comment); shape still classified from the name and markers.
/// 2. Bounding box over the sample points, each axis floored at 1.0 mm.
/// 3. Canned sizes by name fragment.
/// 4. Byte-size fallback, always tagged `unknown`.
pub fn extract(
    summary: &ModelSummary,
    metadata_dims: Option<(f64, f64, f64)>,
) -> ExtractedDimensions {
    let explicit = metadata_dims
        .or_else(|| scan::parse_name_dims(&summary.name))
        .or(summary.header_dims);
    if let Some((l, w, h)) = explicit {
        return result_for(
            summary,
            Dimensions::floored(l, w, h),
            explicit_profile(summary),
            GeometrySource::Explicit,
        );
    }

    if !summary.points.is_empty() {
        let dimensions = bounding_dims(&summary.points);
        let profile = shape::classify(&summary.name, &summary.markers, &summary.points);
        return result_for(summary, dimensions, profile, GeometrySource::PointCloud);
    }

    let lower = summary.name.to_ascii_lowercase();
    for (pattern, (l, w, h), kind, factor) in NAME_SIZE_PATTERNS {
        if lower.contains(pattern) {
            return result_for(
                summary,
                Dimensions::floored(l, w, h),
                shape::profile_for(kind, factor),
                GeometrySource::NamePattern,
            );
        }
    }

    let base = 50.0 + (summary.byte_size % 500) as f64;
    result_for(
        summary,
        Dimensions::floored(base * 2.0, base * 1.5, base),
        shape::unknown_profile(),
        GeometrySource::SizeFallback,
    )
}

fn result_for(
    summary: &ModelSummary,
    dimensions: Dimensions,
    profile: ShapeProfile,
    source: GeometrySource,
) -> ExtractedDimensions {
    ExtractedDimensions {
        dimensions,
        profile,
        source,
        byte_size: summary.byte_size,
        complexity: summary.complexity,
    }
}

/// Shape profile for explicitly dimensioned sources: name fragments and
/// content markers still classify, everything else stays rectangular.
fn explicit_profile(summary: &ModelSummary) -> ShapeProfile {
    shape::classify_name(&summary.name)
        .or_else(|| shape::classify_markers(&summary.markers))
        .map(|(kind, factor)| shape::profile_for(kind, factor))
        .unwrap_or(ShapeProfile::rectangular())
}

/// Axis-aligned bounding box over the sample points, floored per axis.
fn bounding_dims(points: &[Vec3]) -> Dimensions {
    let mut min = Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
    let mut max = Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
        max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
    }
    Dimensions::floored(max.x - min.x, max.y - min.y, max.z - min.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS_CONTENT: &str = "\
#10=CARTESIAN_POINT('',(0.,0.,0.));
#11=CARTESIAN_POINT('',(100.,0.,0.));
#12=CARTESIAN_POINT('',(100.,80.5,60.));
";

    #[test]
    fn test_metadata_dims_win() {
        let summary = ModelSummary::from_content("box_100x80x60.stp", POINTS_CONTENT);
        let extracted = extract(&summary, Some((500.0, 400.0, 300.0)));
        assert_eq!(extracted.source, GeometrySource::Explicit);
        assert_eq!(extracted.dimensions.length, 500.0);
        assert_eq!(extracted.dimensions.width, 400.0);
        assert_eq!(extracted.dimensions.height, 300.0);
    }

    #[test]
    fn test_name_token_dims() {
        let summary = ModelSummary::from_content("box_100x80x60.stp", "");
        let extracted = extract(&summary, None);
        assert_eq!(extracted.source, GeometrySource::Explicit);
        assert_eq!(extracted.dimensions.length, 100.0);
        assert_eq!(extracted.profile.shape_type, ShapeKind::Rectangular);
    }

    #[test]
    fn test_explicit_dims_keep_shape_from_name() {
        let summary = ModelSummary::from_content("cylinder_50x50x80.stp", "");
        let extracted = extract(&summary, None);
        assert_eq!(extracted.source, GeometrySource::Explicit);
        assert_eq!(extracted.dimensions.height, 80.0);
        assert_eq!(extracted.profile.shape_type, ShapeKind::Cylindrical);
        assert!((extracted.profile.volume_factor - 0.785).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_dims_keep_shape_from_markers() {
        let content = "/* Object dimensions: 40 x 40 x 90 mm */\n#1=SPHERICAL_SURFACE('',#2,20.);";
        let summary = ModelSummary::from_content("part.stp", content);
        let extracted = extract(&summary, None);
        assert_eq!(extracted.source, GeometrySource::Explicit);
        assert_eq!(extracted.dimensions.length, 40.0);
        assert_eq!(extracted.profile.shape_type, ShapeKind::Spherical);
    }

    #[test]
    fn test_point_cloud_bounding_box() {
        let summary = ModelSummary::from_content("part.stp", POINTS_CONTENT);
        let extracted = extract(&summary, None);
        assert_eq!(extracted.source, GeometrySource::PointCloud);
        assert_eq!(extracted.dimensions.length, 100.0);
        assert_eq!(extracted.dimensions.width, 80.5);
        assert_eq!(extracted.dimensions.height, 60.0);
    }

    #[test]
    fn test_flat_point_cloud_floors_height() {
        let content = "\
#10=CARTESIAN_POINT('',(0.,0.,5.));
#11=CARTESIAN_POINT('',(30.,0.,5.));
#12=CARTESIAN_POINT('',(30.,20.,5.));
";
        let summary = ModelSummary::from_content("part.stp", content);
        let extracted = extract(&summary, None);
        assert_eq!(extracted.source, GeometrySource::PointCloud);
        assert_eq!(extracted.dimensions.height, 1.0);
        assert_eq!(extracted.dimensions.length, 30.0);
    }

    #[test]
    fn test_name_pattern_sizes() {
        let summary = ModelSummary::from_content("sphere_bearing.stp", "");
        let extracted = extract(&summary, None);
        assert_eq!(extracted.source, GeometrySource::NamePattern);
        assert_eq!(extracted.dimensions.length, 150.0);
        assert_eq!(extracted.profile.shape_type, ShapeKind::Spherical);

        let summary = ModelSummary::from_content("box_medium_carton.stp", "");
        let extracted = extract(&summary, None);
        assert_eq!(extracted.source, GeometrySource::NamePattern);
        assert_eq!(extracted.dimensions.as_tuple(), (400.0, 300.0, 200.0));
        assert_eq!(extracted.profile.shape_type, ShapeKind::Rectangular);
    }

    #[test]
    fn test_size_fallback() {
        // 4 content bytes: base = 50 + 4 = 54
        let summary = ModelSummary::from_content("blob.stp", "????");
        let extracted = extract(&summary, None);
        assert_eq!(extracted.source, GeometrySource::SizeFallback);
        assert_eq!(extracted.dimensions.length, 108.0);
        assert_eq!(extracted.dimensions.width, 81.0);
        assert_eq!(extracted.dimensions.height, 54.0);
        assert_eq!(extracted.profile.shape_type, ShapeKind::Unknown);
        assert!((extracted.profile.volume_factor - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_size_fallback_modulo() {
        let content = "?".repeat(512);
        let summary = ModelSummary::from_content("blob.stp", &content);
        let extracted = extract(&summary, None);
        // base = 50 + (512 % 500) = 62
        assert_eq!(extracted.dimensions.as_tuple(), (124.0, 93.0, 62.0));
    }

    #[test]
    fn test_extractor_never_negative() {
        let summary = ModelSummary::from_content("anything.stp", "");
        let extracted = extract(&summary, None);
        assert!(extracted.dimensions.length > 0.0);
        assert!(extracted.dimensions.width > 0.0);
        assert!(extracted.dimensions.height > 0.0);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = extract_from_path(Path::new("/no/such/dir/part.stp"), None);
        assert!(err.is_err());
        let message = err.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("Geometry source not found"));
    }

    #[test]
    fn test_extract_from_real_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("hexagon_kit.stp");
        std::fs::write(&path, POINTS_CONTENT).expect("write model");

        let extracted = extract_from_path(&path, None).expect("extract");
        // Name fragment wins the shape, points provide the box
        assert_eq!(extracted.source, GeometrySource::PointCloud);
        assert_eq!(extracted.profile.shape_type, ShapeKind::Hexagonal);
        assert_eq!(extracted.dimensions.length, 100.0);
        assert_eq!(extracted.byte_size, POINTS_CONTENT.len() as u64);
    }
}
