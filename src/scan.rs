//! Boundary-representation content scanning.
//!
//! Extracts boundary sample points, geometric marker counts, header
//! dimension comments and entity statistics from STEP-style text without
//! full parsing. The scanner is deliberately tolerant: anything it cannot
//! parse is skipped, never an error.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shape::MarkerCounts;
use crate::types::Vec3;

/// Coarse complexity grade derived from the entity counts of a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    /// Grades a source by its total entity count.
    pub fn grade(entity_total: usize) -> Self {
        if entity_total < 20 {
            Complexity::Simple
        } else if entity_total < 100 {
            Complexity::Moderate
        } else {
            Complexity::Complex
        }
    }
}

/// Everything the scanner could recover from one geometry source.
///
/// This is the in-memory form of the geometry-source collaborator: the
/// extractor works exclusively on it and never touches the file system
/// itself.
#[derive(Clone, Debug)]
pub struct ModelSummary {
    /// Source name (file name or caller-supplied label).
    pub name: String,
    /// Size of the raw source in bytes.
    pub byte_size: u64,
    /// Boundary sample points from `CARTESIAN_POINT` entities.
    pub points: Vec<Vec3>,
    /// Marker token counts for the shape classifier.
    pub markers: MarkerCounts,
    /// Dimensions from a `dimensions: L x W x H mm` header comment.
    pub header_dims: Option<(f64, f64, f64)>,
    pub complexity: Complexity,
}

impl ModelSummary {
    /// Scans in-memory content under a caller-supplied name.
    pub fn from_content(name: &str, content: &str) -> Self {
        let upper = content.to_ascii_uppercase();
        let markers = count_markers(&upper);
        Self {
            name: name.to_string(),
            byte_size: content.len() as u64,
            points: scan_points(&upper),
            header_dims: scan_header_dims(&upper),
            complexity: Complexity::grade(markers.entity_total()),
            markers,
        }
    }

    /// Reads and scans a file. Only I/O failures propagate; undecodable
    /// bytes are replaced and scanned as-is.
    pub fn from_path(path: &Path) -> Result<Self, io::Error> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = String::from_utf8_lossy(&bytes);
        let mut summary = Self::from_content(&name, &content);
        summary.byte_size = bytes.len() as u64;
        Ok(summary)
    }
}

/// Counts non-overlapping occurrences of a token.
fn count_token(upper: &str, token: &str) -> usize {
    upper.matches(token).count()
}

fn count_markers(upper: &str) -> MarkerCounts {
    MarkerCounts {
        spherical_surfaces: count_token(upper, "SPHERICAL_SURFACE"),
        cylindrical_surfaces: count_token(upper, "CYLINDRICAL_SURFACE"),
        conical_surfaces: count_token(upper, "CONICAL_SURFACE"),
        bspline_surfaces: count_token(upper, "B_SPLINE_SURFACE"),
        bspline_curves: count_token(upper, "B_SPLINE_CURVE"),
        nurbs: count_token(upper, "NURBS"),
        trimmed_curves: count_token(upper, "TRIMMED_CURVE"),
        ellipses: count_token(upper, "ELLIPSE"),
        circles: count_token(upper, "CIRCLE"),
        planes: count_token(upper, "PLANE"),
        edge_curves: count_token(upper, "EDGE_CURVE"),
        advanced_faces: count_token(upper, "ADVANCED_FACE"),
        vertex_points: count_token(upper, "VERTEX_POINT"),
    }
}

/// Collects the coordinate triplets of all `CARTESIAN_POINT` entities.
///
/// Entities with fewer than three coordinates (2D curve points) are
/// skipped, as is anything that does not parse.
fn scan_points(upper: &str) -> Vec<Vec3> {
    const TOKEN: &str = "CARTESIAN_POINT";
    let bytes = upper.as_bytes();
    let mut points = Vec::new();
    let mut pos = 0;
    while let Some(found) = upper[pos..].find(TOKEN) {
        let cursor = pos + found + TOKEN.len();
        pos = cursor;
        if let Some(point) = parse_point_args(bytes, cursor) {
            points.push(point);
        }
    }
    points
}

/// Parses `('label',(x,y,z))` following a `CARTESIAN_POINT` token.
fn parse_point_args(bytes: &[u8], mut pos: usize) -> Option<Vec3> {
    pos = skip_ws(bytes, pos);
    if bytes.get(pos) != Some(&b'(') {
        return None;
    }
    pos = skip_ws(bytes, pos + 1);
    if bytes.get(pos) == Some(&b'\'') {
        pos += 1;
        while pos < bytes.len() && bytes[pos] != b'\'' {
            pos += 1;
        }
        if pos >= bytes.len() {
            return None;
        }
        pos += 1;
    }
    pos = skip_ws(bytes, pos);
    if bytes.get(pos) != Some(&b',') {
        return None;
    }
    pos = skip_ws(bytes, pos + 1);
    if bytes.get(pos) != Some(&b'(') {
        return None;
    }
    let (x, pos) = parse_number(bytes, pos + 1)?;
    let pos = expect(bytes, pos, b',')?;
    let (y, pos) = parse_number(bytes, pos)?;
    let pos = expect(bytes, pos, b',')?;
    let (z, pos) = parse_number(bytes, pos)?;
    let pos = skip_ws(bytes, pos);
    if bytes.get(pos) != Some(&b')') {
        return None;
    }
    Some(Vec3::new(x, y, z))
}

/// Finds a `dimensions: L x W x H` header comment.
fn scan_header_dims(upper: &str) -> Option<(f64, f64, f64)> {
    const TOKEN: &str = "DIMENSIONS:";
    let bytes = upper.as_bytes();
    let mut pos = 0;
    while let Some(found) = upper[pos..].find(TOKEN) {
        let cursor = pos + found + TOKEN.len();
        pos = cursor;
        if let Some(dims) = parse_dim_triplet(bytes, cursor) {
            return Some(dims);
        }
    }
    None
}

fn parse_dim_triplet(bytes: &[u8], pos: usize) -> Option<(f64, f64, f64)> {
    let (l, pos) = parse_number(bytes, pos)?;
    let pos = expect(bytes, pos, b'X')?;
    let (w, pos) = parse_number(bytes, pos)?;
    let pos = expect(bytes, pos, b'X')?;
    let (h, _) = parse_number(bytes, pos)?;
    Some((l, w, h))
}

/// Finds an `LxWxH` token anywhere in a source name, e.g.
/// `box_100x80x60.stp`.
pub fn parse_name_dims(name: &str) -> Option<(f64, f64, f64)> {
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            if let Some(dims) = parse_name_dims_at(bytes, i) {
                return Some(dims);
            }
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    None
}

fn parse_name_dims_at(bytes: &[u8], start: usize) -> Option<(f64, f64, f64)> {
    let (l, pos) = parse_plain_number(bytes, start)?;
    let pos = expect_axis_x(bytes, pos)?;
    let (w, pos) = parse_plain_number(bytes, pos)?;
    let pos = expect_axis_x(bytes, pos)?;
    let (h, _) = parse_plain_number(bytes, pos)?;
    Some((l, w, h))
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Skips whitespace, then requires `expected` (case already folded).
fn expect(bytes: &[u8], pos: usize, expected: u8) -> Option<usize> {
    let pos = skip_ws(bytes, pos);
    if bytes.get(pos) == Some(&expected) {
        Some(skip_ws(bytes, pos + 1))
    } else {
        None
    }
}

/// Requires a literal `x`/`X` axis separator with no surrounding space.
fn expect_axis_x(bytes: &[u8], pos: usize) -> Option<usize> {
    match bytes.get(pos) {
        Some(&b'x') | Some(&b'X') => Some(pos + 1),
        _ => None,
    }
}

/// Parses a float (sign, decimals, exponent) starting at `pos`, after
/// optional whitespace. Returns the value and the byte after it.
fn parse_number(bytes: &[u8], pos: usize) -> Option<(f64, usize)> {
    let start = skip_ws(bytes, pos);
    let mut end = start;
    while end < bytes.len()
        && (bytes[end].is_ascii_digit()
            || bytes[end] == b'+'
            || bytes[end] == b'-'
            || bytes[end] == b'.'
            || bytes[end] == b'E'
            || bytes[end] == b'e')
    {
        end += 1;
    }
    if end == start {
        return None;
    }
    let text = std::str::from_utf8(&bytes[start..end]).ok()?;
    text.parse::<f64>().ok().map(|value| (value, end))
}

/// Parses an unsigned decimal number (`120` or `120.5`), no exponent.
fn parse_plain_number(bytes: &[u8], start: usize) -> Option<(f64, usize)> {
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == start {
        return None;
    }
    if bytes.get(end) == Some(&b'.') {
        let mut frac = end + 1;
        while frac < bytes.len() && bytes[frac].is_ascii_digit() {
            frac += 1;
        }
        if frac > end + 1 {
            end = frac;
        }
    }
    let text = std::str::from_utf8(&bytes[start..end]).ok()?;
    text.parse::<f64>().ok().map(|value| (value, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP_SNIPPET: &str = r#"ISO-10303-21;
HEADER;
/* Box dimensions: 100 x 80.5 x 60 mm */
FILE_SCHEMA(('AUTOMOTIVE_DESIGN'));
ENDSEC;
DATA;
#10=CARTESIAN_POINT('',(0.,0.,0.));
#11=CARTESIAN_POINT('',(100.,0.,0.));
#12=CARTESIAN_POINT('corner',(100.,80.5,60.));
#13=CARTESIAN_POINT('2d',(5.,5.));
#20=PLANE('',#30);
#21=PLANE('',#31);
#22=CYLINDRICAL_SURFACE('',#32,25.0);
#23=CIRCLE('',#33,25.0);
#24=EDGE_CURVE('',#40,#41,#42,.T.);
#25=ADVANCED_FACE('',(#50),#22,.T.);
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_scan_points() {
        let summary = ModelSummary::from_content("part.stp", STEP_SNIPPET);
        // The 2D point is skipped
        assert_eq!(summary.points.len(), 3);
        assert_eq!(summary.points[0], Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(summary.points[2], Vec3::new(100.0, 80.5, 60.0));
    }

    #[test]
    fn test_marker_counts() {
        let summary = ModelSummary::from_content("part.stp", STEP_SNIPPET);
        assert_eq!(summary.markers.cylindrical_surfaces, 1);
        assert_eq!(summary.markers.circles, 1);
        assert_eq!(summary.markers.planes, 2);
        assert_eq!(summary.markers.edge_curves, 1);
        assert_eq!(summary.markers.advanced_faces, 1);
        assert_eq!(summary.markers.spherical_surfaces, 0);
    }

    #[test]
    fn test_header_dims() {
        let summary = ModelSummary::from_content("part.stp", STEP_SNIPPET);
        assert_eq!(summary.header_dims, Some((100.0, 80.5, 60.0)));
    }

    #[test]
    fn test_header_dims_absent() {
        let summary = ModelSummary::from_content("part.stp", "DATA;\n#1=PLANE('',#2);\n");
        assert_eq!(summary.header_dims, None);
    }

    #[test]
    fn test_scientific_notation_points() {
        let content = "#1=CARTESIAN_POINT('',(1.5E2,-2.0e1,3.));";
        let summary = ModelSummary::from_content("part.stp", content);
        assert_eq!(summary.points.len(), 1);
        assert_eq!(summary.points[0], Vec3::new(150.0, -20.0, 3.0));
    }

    #[test]
    fn test_name_dims() {
        assert_eq!(parse_name_dims("box_100x80x60.stp"), Some((100.0, 80.0, 60.0)));
        assert_eq!(
            parse_name_dims("crate_120.5x80x45.5"),
            Some((120.5, 80.0, 45.5))
        );
        assert_eq!(parse_name_dims("part_v2.stp"), None);
        assert_eq!(parse_name_dims("rev2_shell.stp"), None);
    }

    #[test]
    fn test_byte_size_tracks_content() {
        let summary = ModelSummary::from_content("part.stp", "PLANE");
        assert_eq!(summary.byte_size, 5);
    }

    #[test]
    fn test_complexity_grades() {
        assert_eq!(Complexity::grade(0), Complexity::Simple);
        assert_eq!(Complexity::grade(19), Complexity::Simple);
        assert_eq!(Complexity::grade(20), Complexity::Moderate);
        assert_eq!(Complexity::grade(99), Complexity::Moderate);
        assert_eq!(Complexity::grade(100), Complexity::Complex);
    }
}
