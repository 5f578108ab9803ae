//! # treval
//!
//! Fiducial-based rigid/scaled point-set registration and leave-one-out
//! **target registration error (TRE)** evaluation for a surgical-navigation
//! research pipeline.
//!
//! Given a pre-operative model and an intra-operative capture of the same
//! surgical site, each sharing an ordered set of fiducial landmarks, this
//! crate:
//!
//! 1. computes the closed-form least-squares similarity transform between
//!    the fiducial sets (Kabsch/Umeyama, SVD of the cross-covariance, with
//!    reflection correction and optional uniform scale),
//! 2. drives a leave-one-fiducial-out cross-validation: fit on N−1
//!    fiducials, hand off to a deformation step (external pipeline or the
//!    in-process rigid substitute), predict the held-out target, and
//! 3. aggregates per-fold Euclidean errors into per-case and cross-case
//!    summary statistics written as CSV for the downstream analysis
//!    scripts.
//!
//! Point sets are persisted in a narrow ASCII VTK polydata subset shared
//! with the capture and visualization tools; see [`vtk_points`].
//!
//! ## Example
//!
//! ```no_run
//! use treval::{fit_similarity, apply_transform_batch, Point3};
//!
//! let preop = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//! ];
//! let intraop = vec![
//!     Point3::new(2.0, 1.0, 0.0),
//!     Point3::new(2.0, 2.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(2.0, 1.0, 1.0),
//! ];
//!
//! let t = fit_similarity(&preop, &intraop, false)?;
//! let registered = apply_transform_batch(&preop, &t);
//! # Ok::<(), treval::RegistrationError>(())
//! ```
//!
//! Interactive fiducial picking, camera/point-cloud capture, mesh
//! rendering, and the deformable-registration algorithm itself live in
//! collaborating tools; this crate only consumes and produces their
//! file-based interfaces.

pub mod align;
pub mod case;
pub mod deform;
pub mod error;
pub mod evaluate;
pub mod stats;
pub mod transform;
pub mod vtk_points;

pub use align::{fit_similarity, linear_block};
pub use case::{discover_cases, CaseFiles, RunLabel};
pub use deform::{Deformer, ExternalDeformer, RigidDeformer};
pub use error::{RegistrationError, Result};
pub use evaluate::{evaluate_all, evaluate_case, CaseResult, EvalConfig, WorkingFiles};
pub use stats::{distance, sample_std, summarize, CaseSummary, FoldRecord};
pub use transform::{apply_transform, apply_transform_batch};
pub use vtk_points::{parse_vtk_points, parse_vtk_points_str, scale_points, write_vtk_points};

// Commonly used types.
// All math is 64-bit: the solver SVD needs the precision and the point
// files round-trip at 12 decimal digits.
pub type Point3 = nalgebra::Vector3<f64>;
pub type Transform = nalgebra::Matrix4<f64>;
