//! Minimal reader/writer for the ASCII VTK polydata point files the
//! navigation pipeline persists fiducials and targets in.
//!
//! The format is deliberately narrow: a short text header, a
//! `POINTS <n> float` declaration, `n` coordinate triples, then a
//! one-point-per-cell `VERTICES` topology section. Only the coordinate
//! payload is interpreted; everything after the last coordinate line is
//! treated as an opaque footer. This matches the subset of VTK written by
//! the collaborating capture and deformation tools.

use std::path::Path;

use crate::error::{RegistrationError, Result};
use crate::{Point3, Transform};

/// Default header emitted when the caller does not supply one.
pub const DEFAULT_HEADER: &str = "# vtk DataFile Version 3.0\nvtk output\nASCII\nDATASET POLYDATA";

/// Parse the coordinate payload of an ASCII VTK polydata file.
///
/// Reads the count from the `POINTS <n> float` declaration, then consumes
/// whitespace-separated floats from the following lines until the first
/// blank line or line beginning with a letter (the start of a topology
/// section such as `VERTICES` or `POLYGONS`).
///
/// Fails unless exactly `3 * n` coordinates are parsed — a count mismatch
/// means the file is truncated or corrupt, never something to repair.
pub fn parse_vtk_points(path: impl AsRef<Path>) -> Result<Vec<Point3>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    parse_points_inner(&text).map_err(|message| RegistrationError::format(path, message))
}

/// Parse point coordinates from in-memory file contents.
pub fn parse_vtk_points_str(text: &str) -> Result<Vec<Point3>> {
    parse_points_inner(text).map_err(|message| RegistrationError::format("<memory>", message))
}

/// Stop rule shared with the collaborating tools' writers: the coordinate
/// region ends at the first blank line, line starting with a letter, or
/// line starting with a space.
fn coordinate_region_ends(line: &str) -> bool {
    line.is_empty()
        || line.starts_with(|c: char| c.is_ascii_alphabetic() || c == ' ')
        || line.trim().is_empty()
}

fn parse_points_inner(text: &str) -> std::result::Result<Vec<Point3>, String> {
    let mut declared: Option<usize> = None;
    let mut coords: Vec<f64> = Vec::new();

    for line in text.lines() {
        if declared.is_none() {
            if line.to_ascii_uppercase().starts_with("POINTS") {
                let count = line
                    .split_whitespace()
                    .nth(1)
                    .and_then(|tok| tok.parse::<usize>().ok())
                    .ok_or_else(|| format!("malformed POINTS declaration: {line:?}"))?;
                declared = Some(count);
            }
            continue;
        }

        // Coordinate region ends at the first blank, indented, or
        // letter-leading line (e.g. "VERTICES", "POLYGONS").
        if coordinate_region_ends(line) {
            break;
        }

        for tok in line.split_whitespace() {
            let value: f64 = tok
                .parse()
                .map_err(|_| format!("invalid coordinate value: {tok:?}"))?;
            coords.push(value);
        }
    }

    let declared = declared.ok_or("no POINTS declaration found")?;
    if coords.len() != 3 * declared {
        return Err(format!(
            "POINTS declares {declared} point(s) but {} coordinate(s) were parsed",
            coords.len()
        ));
    }

    Ok(coords
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}

/// Write a point set as an ASCII VTK polydata file.
///
/// Emits the 4-line default header (or `header` if supplied), the
/// `POINTS <n> float` declaration with coordinates at 12 decimal digits,
/// and a `VERTICES` section listing each point as its own single-point
/// cell. The result round-trips through [`parse_vtk_points`].
pub fn write_vtk_points(
    path: impl AsRef<Path>,
    points: &[Point3],
    header: Option<&str>,
) -> Result<()> {
    let n = points.len();
    let mut out = String::new();
    for line in header.unwrap_or(DEFAULT_HEADER).lines() {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&format!("POINTS {n} float\n"));
    for p in points {
        out.push_str(&format!("{:.12} {:.12} {:.12}\n", p.x, p.y, p.z));
    }
    out.push('\n');
    out.push('\n');
    out.push_str(&format!("VERTICES {n} {}\n", n * 2));
    for i in 0..n {
        out.push_str(&format!("1 {i}\n"));
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// Uniformly scale every point; used for the pipeline's m ↔ mm conversions.
pub fn scale_points(points: &[Point3], factor: f64) -> Vec<Point3> {
    points.iter().map(|p| p * factor).collect()
}

/// Rewrite the coordinate payload of a mesh file in place of a full mesh
/// representation: each vertex is scaled by `pre_scale`, then mapped
/// through `transform`, while the header and all topology sections
/// (`POLYGONS`, cell data, ...) are carried over verbatim.
///
/// This is how the rigid-substitute deformer produces the "deformed" mesh
/// the downstream tooling expects, without this crate ever interpreting
/// mesh connectivity.
pub fn transform_mesh_file(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    pre_scale: f64,
    transform: &Transform,
) -> Result<()> {
    let src = src.as_ref();
    let text = std::fs::read_to_string(src)?;
    let lines: Vec<&str> = text.lines().collect();

    let points_line = lines
        .iter()
        .position(|l| l.to_ascii_uppercase().starts_with("POINTS"))
        .ok_or_else(|| RegistrationError::format(src, "no POINTS declaration found"))?;

    // Find the end of the coordinate region (same stop rule as the parser).
    let mut coord_end = lines.len();
    for (i, line) in lines.iter().enumerate().skip(points_line + 1) {
        if coordinate_region_ends(line) {
            coord_end = i;
            break;
        }
    }

    let coord_text = lines[points_line + 1..coord_end].join("\n");
    let declared: usize = lines[points_line]
        .split_whitespace()
        .nth(1)
        .and_then(|tok| tok.parse().ok())
        .ok_or_else(|| {
            RegistrationError::format(src, format!("malformed POINTS declaration: {:?}", lines[points_line]))
        })?;

    let mut coords: Vec<f64> = Vec::with_capacity(declared * 3);
    for tok in coord_text.split_whitespace() {
        let value: f64 = tok.parse().map_err(|_| {
            RegistrationError::format(src, format!("invalid coordinate value: {tok:?}"))
        })?;
        coords.push(value);
    }
    if coords.len() != 3 * declared {
        return Err(RegistrationError::format(
            src,
            format!(
                "POINTS declares {declared} point(s) but {} coordinate(s) were parsed",
                coords.len()
            ),
        ));
    }

    let mut out = String::new();
    for line in &lines[..=points_line] {
        out.push_str(line);
        out.push('\n');
    }
    for c in coords.chunks_exact(3) {
        let p = Point3::new(c[0], c[1], c[2]) * pre_scale;
        let q = crate::transform::apply_transform(&p, transform);
        out.push_str(&format!("{:.12} {:.12} {:.12}\n", q.x, q.y, q.z));
    }
    for line in &lines[coord_end..] {
        out.push_str(line);
        out.push('\n');
    }
    std::fs::write(dst, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_point_file() {
        let text = "\
# vtk DataFile Version 3.0
vtk output
ASCII
DATASET POLYDATA
POINTS 2 float
1.0 2.0 3.0
-4.5 0.0 6.25

VERTICES 2 4
1 0
1 1
";
        let pts = parse_vtk_points_str(text).unwrap();
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0], Point3::new(1.0, 2.0, 3.0));
        assert_eq!(pts[1], Point3::new(-4.5, 0.0, 6.25));
    }

    #[test]
    fn parse_stops_at_footer_without_blank_line() {
        let text = "POINTS 1 float\n0.5 0.5 0.5\nVERTICES 1 2\n1 0\n";
        let pts = parse_vtk_points_str(text).unwrap();
        assert_eq!(pts.len(), 1);
    }

    #[test]
    fn parse_stops_at_indented_footer() {
        // Some collaborating tools indent their topology sections; a line
        // starting with a space ends the coordinate region just like a
        // letter-leading one.
        let text = "POINTS 1 float\n0.5 0.5 0.5\n VERTICES 1 2\n1 0\n";
        let pts = parse_vtk_points_str(text).unwrap();
        assert_eq!(pts.len(), 1);
        assert_eq!(pts[0], Point3::new(0.5, 0.5, 0.5));

        // An indented line cutting the coordinates short is a count
        // mismatch, not something to parse past.
        let truncated = "POINTS 2 float\n0.5 0.5 0.5\n 1.0 1.0 1.0\n";
        let err = parse_vtk_points_str(truncated).unwrap_err();
        assert!(matches!(err, RegistrationError::Format { .. }));
    }

    #[test]
    fn parse_rejects_count_mismatch() {
        let text = "POINTS 3 float\n1.0 2.0 3.0\n4.0 5.0 6.0\n";
        let err = parse_vtk_points_str(text).unwrap_err();
        assert!(matches!(err, RegistrationError::Format { .. }), "{err}");
    }

    #[test]
    fn parse_rejects_missing_declaration() {
        let err = parse_vtk_points_str("1.0 2.0 3.0\n").unwrap_err();
        assert!(matches!(err, RegistrationError::Format { .. }));
    }

    #[test]
    fn write_then_parse_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pts.vtk");
        let points = vec![
            Point3::new(0.123456789012, -98.7, 0.0),
            Point3::new(1e-6, 2.5, -3.25),
            Point3::new(1000.0, 0.000000000001, 7.0),
        ];
        write_vtk_points(&path, &points, None).unwrap();
        let parsed = parse_vtk_points(&path).unwrap();
        assert_eq!(parsed.len(), points.len());
        for (a, b) in parsed.iter().zip(&points) {
            assert!((a - b).norm() < 1e-12, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn write_single_point_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tgt.vtk");
        let points = vec![Point3::new(12.34, -56.78, 90.12)];
        write_vtk_points(&path, &points, None).unwrap();
        let parsed = parse_vtk_points(&path).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!((parsed[0] - points[0]).norm() < 1e-12);
    }

    #[test]
    fn write_respects_custom_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hdr.vtk");
        let points = vec![Point3::new(1.0, 2.0, 3.0)];
        write_vtk_points(&path, &points, Some("# custom\nASCII\nDATASET POLYDATA")).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# custom\n"));
        assert_eq!(parse_vtk_points(&path).unwrap().len(), 1);
    }

    #[test]
    fn transform_mesh_preserves_topology() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("mesh.vtk");
        let dst = dir.path().join("mesh_out.vtk");
        let text = "\
# vtk DataFile Version 3.0
vtk output
ASCII
DATASET POLYDATA
POINTS 3 float
1000.0 0.0 0.0
0.0 1000.0 0.0
0.0 0.0 1000.0
POLYGONS 1 4
3 0 1 2
";
        std::fs::write(&src, text).unwrap();

        // Pure translation after scaling mm -> m.
        let mut t = Transform::identity();
        t[(0, 3)] = 0.5;
        transform_mesh_file(&src, &dst, 0.001, &t).unwrap();

        let out = std::fs::read_to_string(&dst).unwrap();
        assert!(out.contains("POLYGONS 1 4"), "topology section dropped");
        assert!(out.contains("3 0 1 2"));
        let pts = parse_vtk_points(&dst).unwrap();
        assert!((pts[0] - Point3::new(1.5, 0.0, 0.0)).norm() < 1e-9);
        assert!((pts[1] - Point3::new(0.5, 1.0, 0.0)).norm() < 1e-9);
    }
}
