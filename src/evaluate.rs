//! Leave-one-out cross-validation driver.
//!
//! Per case: validate the fiducial sets, then for each fiducial index k
//! write reduced working fiducial files omitting k, hand off to the
//! deformation step, score the predicted target against the held-out
//! ground truth, and record a fold. The working files are shared with the
//! external collaborator, so the originals are checked out into backups
//! before the first fold and restored afterwards — on every exit path.
//!
//! Folds run strictly sequentially; each one overwrites the same working
//! files, so no fold may start before the previous one's writes are done.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{error, info, warn};

use crate::case::{discover_cases, CaseFiles, RunLabel};
use crate::deform::Deformer;
use crate::error::{RegistrationError, Result};
use crate::stats::{append_case_summary, append_fold_record, summarize, CaseSummary, FoldRecord};
use crate::vtk_points::{parse_vtk_points, write_vtk_points};
use crate::Point3;

/// Driver configuration, resolved once before the case loop.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Below this many fiducials the hold-out is skipped and all fiducials
    /// are used for fitting (the evaluated fiducial included). This voids
    /// the leave-one-out guarantee and is loudly warned about; it exists
    /// because 3-fiducial cases are common in the archived datasets.
    pub min_fids_for_holdout: usize,
    /// Archive each fold's inputs and outputs under the case results dir.
    pub archive_folds: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            min_fids_for_holdout: 4,
            archive_folds: true,
        }
    }
}

/// All fold records plus the derived summary for one case.
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub folds: Vec<FoldRecord>,
    pub summary: CaseSummary,
}

// ── Working-file checkout/restore guard ─────────────────────────────────────

/// Scoped ownership of a case's working files.
///
/// `checkout` copies each existing file to an `_og` sibling backup;
/// `restore` copies the backups over the working files. Dropping the guard
/// without an explicit restore performs a best-effort restore, so a fold
/// loop that errors out part-way still leaves the case directory as it
/// found it.
pub struct WorkingFiles {
    entries: Vec<(PathBuf, PathBuf)>,
    restored: bool,
}

/// `0022_fids.vtk` → `0022_fids_og.vtk`
fn backup_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("vtk");
    path.with_file_name(format!("{stem}_og.{ext}"))
}

impl WorkingFiles {
    /// Back up every existing file in `paths`. Missing files are skipped,
    /// matching the collaborator's optional outputs.
    pub fn checkout(paths: &[PathBuf]) -> Result<Self> {
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            if !path.exists() {
                continue;
            }
            let backup = backup_path(path);
            fs::copy(path, &backup)?;
            entries.push((path.clone(), backup));
        }
        Ok(Self {
            entries,
            restored: false,
        })
    }

    /// Copy the backups over the working files.
    pub fn restore(&mut self) -> Result<()> {
        for (working, backup) in &self.entries {
            fs::copy(backup, working)?;
        }
        self.restored = true;
        Ok(())
    }
}

impl Drop for WorkingFiles {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        for (working, backup) in &self.entries {
            if let Err(e) = fs::copy(backup, working) {
                warn!("Failed to restore {}: {e}", working.display());
            }
        }
    }
}

// ── Per-case evaluation ─────────────────────────────────────────────────────

/// Run the full leave-one-out protocol for one case.
///
/// Individual fold failures (degenerate fit, external process failure,
/// malformed output file) are logged and the loop continues; the summary
/// reflects however many folds actually succeeded. I/O errors on the
/// case's own files abort the case. The working fiducial/target files are
/// restored to their pre-loop contents in all outcomes.
pub fn evaluate_case(
    case: &CaseFiles,
    deformer: &dyn Deformer,
    run: &RunLabel,
    config: &EvalConfig,
) -> Result<CaseResult> {
    info!(
        "Case {:04}: evaluating files from {}",
        case.case_id,
        case.case_dir.display()
    );

    let preop = parse_vtk_points(case.preop_fids())?;
    let preop_mm = parse_vtk_points(case.preop_fids_mm())?;
    let intraop = parse_vtk_points(case.intraop_fids())?;

    let n = preop.len();
    if preop_mm.len() != n || intraop.len() != n {
        return Err(RegistrationError::DegenerateInput(format!(
            "fiducial sets differ in length: preop {n}, preop_mm {}, intraop {}",
            preop_mm.len(),
            intraop.len()
        )));
    }
    if n < 3 {
        return Err(RegistrationError::InsufficientFiducials {
            case_id: case.case_id,
            count: n,
        });
    }

    let holdout = n >= config.min_fids_for_holdout;
    if !holdout {
        warn!(
            "Case {:04}: only {n} fiducials, **all** are used for fitting; \
             the leave-one-out guarantee does not hold for this case",
            case.case_id
        );
    }
    info!("Case {:04}: {n} fiducials, running {n}-fold cross validation", case.case_id);

    let results_dir = case.results_dir(run);
    fs::create_dir_all(&results_dir)?;

    let mut working = WorkingFiles::checkout(&[
        case.preop_fids(),
        case.preop_fids_mm(),
        case.intraop_fids(),
        case.intraop_fids_transformed(),
        case.preop_tgt_mm(),
        case.intraop_tgt(),
    ])?;

    let mut folds: Vec<FoldRecord> = Vec::new();
    for k in 0..n {
        info!("Case {:04}: preparing fold {k}/{}", case.case_id, n - 1);
        match run_fold(case, deformer, k, holdout, &preop, &preop_mm, &intraop) {
            Ok(record) => {
                info!(
                    "Case {:04}: fold {k} TRE = {:.4} mm",
                    case.case_id, record.distance_mm
                );
                append_fold_record(results_dir.join("TRE.csv"), &record)?;
                if config.archive_folds {
                    archive_fold(case, run, k)?;
                }
                folds.push(record);
            }
            Err(
                e @ (RegistrationError::DegenerateInput(_)
                | RegistrationError::ExternalProcess { .. }
                | RegistrationError::Format { .. }),
            ) => {
                warn!("Case {:04}: fold {k} failed: {e}", case.case_id);
            }
            Err(e) => return Err(e),
        }
    }

    info!("Case {:04}: reverting working files", case.case_id);
    working.restore()?;

    let summary = if folds.is_empty() {
        error!(
            "Case {:04}: no fold succeeded, summary statistics are undefined",
            case.case_id
        );
        CaseSummary::undefined()
    } else {
        let distances: Vec<f64> = folds.iter().map(|f| f.distance_mm).collect();
        summarize(&distances)?
    };
    info!(
        "Case {:04}: TRE mean {:.4} mm, std {:.4} mm over {} fold(s)",
        case.case_id, summary.mean, summary.std, summary.n_folds
    );

    Ok(CaseResult { folds, summary })
}

/// One fold: write the reduced working sets and the held-out target files,
/// run the deformer, score the prediction.
fn run_fold(
    case: &CaseFiles,
    deformer: &dyn Deformer,
    k: usize,
    holdout: bool,
    preop: &[Point3],
    preop_mm: &[Point3],
    intraop: &[Point3],
) -> Result<FoldRecord> {
    let reduce = |set: &[Point3]| -> Vec<Point3> {
        if holdout {
            set.iter()
                .enumerate()
                .filter(|(i, _)| *i != k)
                .map(|(_, p)| *p)
                .collect()
        } else {
            set.to_vec()
        }
    };

    write_vtk_points(case.preop_fids(), &reduce(preop), None)?;
    write_vtk_points(case.preop_fids_mm(), &reduce(preop_mm), None)?;
    write_vtk_points(case.intraop_fids(), &reduce(intraop), None)?;

    // Held-out evaluation pair: the preop target (mm) fed to the deformer
    // and the intraop ground truth (m).
    write_vtk_points(case.preop_tgt_mm(), &[preop_mm[k]], None)?;
    write_vtk_points(case.intraop_tgt(), &[intraop[k]], None)?;

    deformer.deform(case)?;

    let predicted = parse_vtk_points(case.deformed_target())?;
    let predicted = predicted.first().ok_or_else(|| {
        RegistrationError::format(case.deformed_target(), "deformed target file is empty")
    })?;

    let ground_truth_mm = intraop[k] * 1000.0;
    Ok(FoldRecord::new(k, &ground_truth_mm, predicted))
}

/// Preserve one fold's evidence under `Results_<run>/PreOperative_<k>/`.
fn archive_fold(case: &CaseFiles, run: &RunLabel, k: usize) -> Result<()> {
    let dst = case.fold_results_dir(run, k);
    fs::create_dir_all(&dst)?;

    let mut sources: Vec<PathBuf> = vec![
        case.preop_fids(),
        case.preop_fids_mm(),
        case.preop_tgt_mm(),
        case.intraop_tgt(),
        case.deformed_mesh(),
    ];
    let deformed_dir = case.deformed_output_dir();
    if deformed_dir.is_dir() {
        for entry in fs::read_dir(&deformed_dir)? {
            let path = entry?.path();
            if path.is_file() {
                sources.push(path);
            }
        }
    }

    for src in sources {
        if !src.is_file() {
            continue;
        }
        if let Some(name) = src.file_name() {
            fs::copy(&src, dst.join(name))?;
        }
    }
    Ok(())
}

// ── Run-level loop ──────────────────────────────────────────────────────────

/// Evaluate every case found under `data_dir`, appending one summary row
/// per case to `TRE_all_<run>.csv` in `tre_dir`.
///
/// A case that fails (too few fiducials, unreadable files) is logged and
/// skipped; the remaining cases still run. Returns the per-case summaries
/// in evaluation order.
pub fn evaluate_all(
    data_dir: &Path,
    tre_dir: &Path,
    run: &RunLabel,
    deformer: &dyn Deformer,
    config: &EvalConfig,
) -> anyhow::Result<Vec<(u32, CaseSummary)>> {
    fs::create_dir_all(tre_dir)
        .with_context(|| format!("creating TRE output dir {}", tre_dir.display()))?;

    let cases = discover_cases(data_dir)?;
    info!(
        "{} case(s) found: {:?}",
        cases.len(),
        cases
            .iter()
            .map(|c| c.case_dir.file_name().unwrap_or_default().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
    );

    let summary_csv = tre_dir.join(format!("TRE_all_{run}.csv"));
    let mut summaries = Vec::with_capacity(cases.len());
    for case in &cases {
        match evaluate_case(case, deformer, run, config) {
            Ok(result) => {
                append_case_summary(&summary_csv, &result.summary, run.as_str(), case.case_id)?;
                summaries.push((case.case_id, result.summary));
            }
            Err(e) => warn!("Case {:04} skipped: {e}", case.case_id),
        }
    }
    info!("Cross-case TRE summary saved at {}", summary_csv.display());
    Ok(summaries)
}
