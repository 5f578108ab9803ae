//! Closed-form rigid / scaled alignment of correspondence-matched point sets.
//!
//! Given two ordered point sets where index `i` denotes the same physical
//! landmark in both, computes the least-squares similarity transform
//! (rotation, translation, optional uniform scale) via SVD of the
//! cross-covariance matrix — the Kabsch/Umeyama method. The SVD is done in
//! f64; single precision has proven insufficiently accurate for this step.

use nalgebra::Matrix3;
use tracing::debug;

use crate::error::{RegistrationError, Result};
use crate::{Point3, Transform};

/// Compute the least-squares similarity transform mapping `source` onto
/// `target`.
///
/// Both sets must be correspondence-matched and of equal length ≥ 3 (the
/// cross-covariance is rank-deficient below that, so no unique rotation
/// exists). The returned 4×4 homogeneous matrix has a proper rotation in
/// its linear block: if the unconstrained SVD fit lands on a reflection,
/// the last row of Vᵀ is negated and the rotation recomputed, so the
/// determinant of the embedded rotation is always +1.
///
/// With `allow_scale`, a positive uniform scale is estimated as
/// `Σσᵢ / Σ‖source − μ_source‖²` (the Umeyama estimator — note the
/// *source*-side variance in the denominator) and pre-multiplied into the
/// linear block. Coincident or near-coincident source points make that
/// denominator vanish and are rejected as degenerate either way.
pub fn fit_similarity(
    source: &[Point3],
    target: &[Point3],
    allow_scale: bool,
) -> Result<Transform> {
    if source.len() != target.len() {
        return Err(RegistrationError::DegenerateInput(format!(
            "point sets differ in length ({} vs {})",
            source.len(),
            target.len()
        )));
    }
    let n = source.len();
    if n < 3 {
        return Err(RegistrationError::DegenerateInput(format!(
            "{n} correspondence(s) given, at least 3 required"
        )));
    }

    let inv_n = 1.0 / n as f64;
    let mu_source: Point3 = source.iter().sum::<Point3>() * inv_n;
    let mu_target: Point3 = target.iter().sum::<Point3>() * inv_n;

    // Cross-covariance H = Σ (src - μ_src)(tgt - μ_tgt)ᵀ, plus the
    // source-side variance for the scale estimate.
    let mut h = Matrix3::<f64>::zeros();
    let mut source_variance = 0.0_f64;
    for (s, t) in source.iter().zip(target.iter()) {
        let cs = s - mu_source;
        let ct = t - mu_target;
        h += cs * ct.transpose();
        source_variance += cs.norm_squared();
    }

    if source_variance <= f64::EPSILON {
        return Err(RegistrationError::DegenerateInput(
            "source points are coincident (zero variance)".into(),
        ));
    }

    let svd = h.svd(true, true);
    let u = svd.u.unwrap();
    let mut v_t = svd.v_t.unwrap();

    let mut rotation = v_t.transpose() * u.transpose();
    if rotation.determinant() < 0.0 {
        // Reflection case: flip the singular direction and recompute.
        for j in 0..3 {
            v_t[(2, j)] = -v_t[(2, j)];
        }
        rotation = v_t.transpose() * u.transpose();
    }

    let linear = if allow_scale {
        let scale = svd.singular_values.sum() / source_variance;
        debug!("Estimated uniform scale: {scale:.6}");
        rotation * scale
    } else {
        rotation
    };

    let translation = mu_target - linear * mu_source;

    let mut transform = Transform::identity();
    transform.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
    transform.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
    Ok(transform)
}

/// Extract the 3×3 linear block of a homogeneous transform.
pub fn linear_block(transform: &Transform) -> Matrix3<f64> {
    transform.fixed_view::<3, 3>(0, 0).into_owned()
}
