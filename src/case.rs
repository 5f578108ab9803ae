//! Case directory layout, case discovery, and run labeling.
//!
//! A case lives in a `Pt_<number>` directory with the fixed file naming
//! the whole toolchain shares: pre-operative files carry a 4-digit
//! zero-padded case id, intra-operative files the same id behind a
//! leading `1` (e.g. case 22 → `0022_fids.vtk` / `1022_fids.vtk`).

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use crate::error::Result;

/// User-supplied run name plus capture timestamp, e.g.
/// `Default_20250830_153012`. Used as the results-directory and summary
/// file suffix so repeated runs never collide.
#[derive(Debug, Clone)]
pub struct RunLabel(String);

impl RunLabel {
    /// Label for a run starting now.
    pub fn new(name: &str) -> Self {
        Self(format!("{}_{}", name, Local::now().format("%Y%m%d_%H%M%S")))
    }

    /// Rebuild a label from its full string form (e.g. when re-aggregating
    /// an earlier run's results).
    pub fn from_full(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved file paths for one case.
#[derive(Debug, Clone)]
pub struct CaseFiles {
    pub case_dir: PathBuf,
    pub case_id: u32,
}

impl CaseFiles {
    pub fn new(case_dir: impl Into<PathBuf>, case_id: u32) -> Self {
        Self {
            case_dir: case_dir.into(),
            case_id,
        }
    }

    fn preop(&self) -> PathBuf {
        self.case_dir.join("PreOperative")
    }

    fn intraop(&self) -> PathBuf {
        self.case_dir.join("IntraOperative")
    }

    /// Pre-operative fiducials, meters.
    pub fn preop_fids(&self) -> PathBuf {
        self.preop().join(format!("{:04}_fids.vtk", self.case_id))
    }

    /// Pre-operative fiducials, millimeters.
    pub fn preop_fids_mm(&self) -> PathBuf {
        self.preop().join(format!("{:04}_fids_mm.vtk", self.case_id))
    }

    /// Pre-operative target (the point being predicted), millimeters.
    pub fn preop_tgt_mm(&self) -> PathBuf {
        self.preop().join(format!("{:04}_tgt_mm.vtk", self.case_id))
    }

    /// Pre-operative mesh surface, millimeters.
    pub fn preop_mesh(&self) -> PathBuf {
        self.preop().join(format!("{:04}_bel.vtk", self.case_id))
    }

    /// Intra-operative fiducials, meters.
    pub fn intraop_fids(&self) -> PathBuf {
        self.intraop().join(format!("1{:03}_fids.vtk", self.case_id))
    }

    /// Intra-operative fiducials after the collaborator's pre-alignment.
    pub fn intraop_fids_transformed(&self) -> PathBuf {
        self.intraop()
            .join(format!("1{:03}_fids_transformed.vtk", self.case_id))
    }

    /// Intra-operative ground-truth target, meters.
    pub fn intraop_tgt(&self) -> PathBuf {
        self.intraop().join(format!("1{:03}_tgt.vtk", self.case_id))
    }

    /// Directory the deformation step writes its outputs into.
    pub fn deformed_output_dir(&self) -> PathBuf {
        self.intraop().join("PreOperative")
    }

    /// Deformed (predicted) target produced by the deformation step, mm.
    pub fn deformed_target(&self) -> PathBuf {
        self.deformed_output_dir()
            .join(format!("{:04}_tgt_mm_Deformed.vtk", self.case_id))
    }

    /// Deformed pre-operative fiducials produced by the deformation step, mm.
    pub fn deformed_fids(&self) -> PathBuf {
        self.deformed_output_dir()
            .join(format!("{:04}_fids_mm_Deformed.vtk", self.case_id))
    }

    /// Deformed mesh surface produced by the deformation step.
    pub fn deformed_mesh(&self) -> PathBuf {
        self.intraop()
            .join(format!("{:04}_bel_deformed_initial.vtk", self.case_id))
    }

    /// Per-run results directory for this case.
    pub fn results_dir(&self, run: &RunLabel) -> PathBuf {
        self.case_dir.join(format!("Results_{run}"))
    }

    /// Archive directory for one fold's inputs and outputs.
    pub fn fold_results_dir(&self, run: &RunLabel, held_out_index: usize) -> PathBuf {
        self.results_dir(run)
            .join(format!("PreOperative_{held_out_index}"))
    }
}

/// Extract the case id from a `Pt_<number>` directory name.
fn case_id_from_name(name: &str) -> Option<u32> {
    name.split('_').nth(1)?.parse().ok()
}

/// Discover case directories (`Pt_*`) under a data directory, sorted by name.
pub fn discover_cases(data_dir: impl AsRef<Path>) -> Result<Vec<CaseFiles>> {
    let data_dir = data_dir.as_ref();
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("Pt_"))
        })
        .collect();
    dirs.sort();

    let mut cases = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        match case_id_from_name(name) {
            Some(id) => cases.push(CaseFiles::new(&dir, id)),
            None => debug!("Skipping directory with unparseable case id: {name}"),
        }
    }
    Ok(cases)
}
