//! Shared fixture helpers: synthetic case directories with known geometry.
#![allow(dead_code)]

use std::path::Path;

use nalgebra::{Rotation3, Vector3};
use treval::{apply_transform_batch, write_vtk_points, CaseFiles, Point3, Transform};

/// Assemble a 4×4 similarity transform from scale, rotation, translation.
pub fn similarity(scale: f64, rot: &Rotation3<f64>, t: &Vector3<f64>) -> Transform {
    let mut m = Transform::identity();
    m.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&(rot.matrix() * scale));
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(t);
    m
}

/// Five non-coplanar fiducials, meters, roughly head-sized spread.
pub fn fiducials5() -> Vec<Point3> {
    vec![
        Point3::new(0.010, 0.020, 0.030),
        Point3::new(0.080, 0.015, 0.025),
        Point3::new(0.030, 0.090, 0.020),
        Point3::new(0.025, 0.030, 0.095),
        Point3::new(0.070, 0.075, 0.080),
    ]
}

pub struct CaseFixture {
    pub case: CaseFiles,
    pub preop_m: Vec<Point3>,
    pub intraop_m: Vec<Point3>,
}

/// Create an on-disk case directory: pre-op fiducials in meters and mm,
/// intra-op fiducials produced by `transform` (meters), plus optionally a
/// tiny pre-op mesh.
pub fn build_case(
    root: &Path,
    case_id: u32,
    preop_m: &[Point3],
    transform: &Transform,
    with_mesh: bool,
) -> CaseFixture {
    build_case_with_intraop(
        root,
        case_id,
        preop_m,
        &apply_transform_batch(preop_m, transform),
        with_mesh,
    )
}

/// Same as [`build_case`] but with explicitly supplied intra-op fiducials
/// (e.g. with injected noise).
pub fn build_case_with_intraop(
    root: &Path,
    case_id: u32,
    preop_m: &[Point3],
    intraop_m: &[Point3],
    with_mesh: bool,
) -> CaseFixture {
    let case_dir = root.join(format!("Pt_{case_id:07}"));
    let case = CaseFiles::new(&case_dir, case_id);
    std::fs::create_dir_all(case_dir.join("PreOperative")).unwrap();
    std::fs::create_dir_all(case_dir.join("IntraOperative")).unwrap();

    let preop_mm: Vec<Point3> = preop_m.iter().map(|p| p * 1000.0).collect();
    write_vtk_points(case.preop_fids(), preop_m, None).unwrap();
    write_vtk_points(case.preop_fids_mm(), &preop_mm, None).unwrap();
    write_vtk_points(case.intraop_fids(), intraop_m, None).unwrap();

    if with_mesh {
        let mesh = "\
# vtk DataFile Version 3.0
vtk output
ASCII
DATASET POLYDATA
POINTS 3 float
10.0 20.0 30.0
80.0 15.0 25.0
30.0 90.0 20.0
POLYGONS 1 4
3 0 1 2
";
        std::fs::write(case.preop_mesh(), mesh).unwrap();
    }

    CaseFixture {
        case,
        preop_m: preop_m.to_vec(),
        intraop_m: intraop_m.to_vec(),
    }
}
