//! Applying 4×4 homogeneous transforms to points.

use nalgebra::Vector4;

use crate::{Point3, Transform};

/// Apply a homogeneous transform to a single point.
///
/// Lifts the point to homogeneous form, left-multiplies, and drops the
/// homogeneous coordinate.
pub fn apply_transform(point: &Point3, transform: &Transform) -> Point3 {
    let h = transform * Vector4::new(point.x, point.y, point.z, 1.0);
    Point3::new(h.x, h.y, h.z)
}

/// Apply a homogeneous transform to every point in a set, preserving order.
pub fn apply_transform_batch(points: &[Point3], transform: &Transform) -> Vec<Point3> {
    points.iter().map(|p| apply_transform(p, transform)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_a_no_op() {
        let p = Point3::new(1.5, -2.0, 3.25);
        assert_eq!(apply_transform(&p, &Transform::identity()), p);
    }

    #[test]
    fn translation_only() {
        let mut t = Transform::identity();
        t[(0, 3)] = 1.0;
        t[(1, 3)] = -2.0;
        t[(2, 3)] = 0.5;
        let p = apply_transform(&Point3::new(0.0, 0.0, 0.0), &t);
        assert_eq!(p, Point3::new(1.0, -2.0, 0.5));
    }

    #[test]
    fn batch_preserves_order() {
        let mut t = Transform::identity();
        t[(0, 3)] = 10.0;
        let pts = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ];
        let out = apply_transform_batch(&pts, &t);
        assert_eq!(out.len(), 3);
        for (i, p) in out.iter().enumerate() {
            assert_eq!(p.x, 11.0 + i as f64);
        }
    }
}
