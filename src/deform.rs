//! The deformation step, modeled as a capability with two variants.
//!
//! Each fold hands the current working fiducial/target files to a
//! `Deformer`, which must leave a predicted target (and, where it can, a
//! deformed mesh) at the case's fixed output paths:
//!
//! - [`ExternalDeformer`] spawns the collaborating deformable-registration
//!   pipeline as a blocking subprocess per stage and validates that the
//!   expected output file appeared. Its internals are opaque to this crate.
//! - [`RigidDeformer`] is the in-process substitute used for rigid-only
//!   evaluation: it fits a (scaled) rigid transform on the working
//!   fiducials and applies it directly to the held-out target and the
//!   pre-operative mesh, skipping true deformation.

use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, info};

use crate::align::fit_similarity;
use crate::case::CaseFiles;
use crate::error::{RegistrationError, Result};
use crate::transform::apply_transform_batch;
use crate::vtk_points::{parse_vtk_points, scale_points, transform_mesh_file, write_vtk_points};

/// A deformation step: consumes the case's current working fiducial and
/// target files, produces a predicted target at
/// [`CaseFiles::deformed_target`].
pub trait Deformer {
    fn deform(&self, case: &CaseFiles) -> Result<()>;
}

// ── External collaborator ───────────────────────────────────────────────────

/// Runs the external deformable-registration pipeline.
///
/// Invocation shape: `<program> <script> <case_dir> <args...> <stage>`,
/// once per stage. The default stages and arguments mirror the pipeline's
/// registration and target-deformation passes.
#[derive(Debug, Clone)]
pub struct ExternalDeformer {
    /// Interpreter for the pipeline script, normally `bash`.
    pub program: String,
    /// Path to the pipeline script.
    pub script: PathBuf,
    /// Fixed positional arguments passed between case dir and stage name.
    pub args: Vec<String>,
    /// Pipeline stages to run, in order.
    pub stages: Vec<String>,
}

impl ExternalDeformer {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            program: "bash".into(),
            script: script.into(),
            args: vec!["45".into(), "11".into(), "0.01".into()],
            stages: vec![
                "nonrigidRegisterTumorCavity".into(),
                "deformTargetsTumorCavity".into(),
            ],
        }
    }
}

impl Deformer for ExternalDeformer {
    fn deform(&self, case: &CaseFiles) -> Result<()> {
        // A leftover target from an earlier fold must not pass for this
        // fold's output.
        let target = case.deformed_target();
        if target.exists() {
            std::fs::remove_file(&target)?;
        }

        for stage in &self.stages {
            let mut cmd = Command::new(&self.program);
            cmd.arg(&self.script)
                .arg(&case.case_dir)
                .args(&self.args)
                .arg(stage);
            info!("Case {:04}: running deformation stage {stage}", case.case_id);
            debug!("Command: {cmd:?}");

            let output = cmd.output().map_err(|e| RegistrationError::ExternalProcess {
                status: "spawn failed".into(),
                message: e.to_string(),
            })?;
            if !output.status.success() {
                return Err(RegistrationError::ExternalProcess {
                    status: output.status.to_string(),
                    message: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }
        }

        if !target.exists() {
            return Err(RegistrationError::ExternalProcess {
                status: "exit ok".into(),
                message: format!("no deformed target produced at {}", target.display()),
            });
        }
        Ok(())
    }
}

// ── In-process rigid substitute ─────────────────────────────────────────────

/// "Pretend deformed": fit a scaled rigid transform from the working
/// pre-operative to intra-operative fiducials and apply it to the held-out
/// target, the pre-operative fiducials, and the mesh surface.
///
/// All fitting happens in meters; the mm-unit target and fiducial files
/// are converted before and after, so the outputs stay in mm as the
/// downstream TRE computation expects.
#[derive(Debug, Clone)]
pub struct RigidDeformer {
    pub allow_scale: bool,
}

impl Default for RigidDeformer {
    fn default() -> Self {
        Self { allow_scale: true }
    }
}

impl Deformer for RigidDeformer {
    fn deform(&self, case: &CaseFiles) -> Result<()> {
        let preop_fids = parse_vtk_points(case.preop_fids())?;
        let intraop_fids = parse_vtk_points(case.intraop_fids())?;
        let transform = fit_similarity(&preop_fids, &intraop_fids, self.allow_scale)?;
        debug!("Case {:04}: rigid substitute transform fitted", case.case_id);

        std::fs::create_dir_all(case.deformed_output_dir())?;

        // Held-out target: mm -> m, transform, m -> mm.
        let target_mm = parse_vtk_points(case.preop_tgt_mm())?;
        let predicted = scale_points(
            &apply_transform_batch(&scale_points(&target_mm, 0.001), &transform),
            1000.0,
        );
        write_vtk_points(case.deformed_target(), &predicted, None)?;

        // Working fiducials through the same transform.
        let fids_mm = parse_vtk_points(case.preop_fids_mm())?;
        let deformed_fids = scale_points(
            &apply_transform_batch(&scale_points(&fids_mm, 0.001), &transform),
            1000.0,
        );
        write_vtk_points(case.deformed_fids(), &deformed_fids, None)?;

        // Mesh surface, when the case ships one.
        let mesh = case.preop_mesh();
        if mesh.exists() {
            transform_mesh_file(&mesh, case.deformed_mesh(), 0.001, &transform)?;
        } else {
            debug!("Case {:04}: no pre-operative mesh, skipping", case.case_id);
        }
        Ok(())
    }
}
