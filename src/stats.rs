//! Per-fold error records, per-case summary statistics, and the CSV
//! records downstream tooling consumes.
//!
//! Field order and units (millimeters) in both CSV formats are fixed by
//! the existing analysis scripts; do not reorder.

use std::fs::OpenOptions;
use std::path::Path;

use serde::Serialize;

use crate::error::{RegistrationError, Result};
use crate::Point3;

/// Euclidean distance between two points.
pub fn distance(a: &Point3, b: &Point3) -> f64 {
    (a - b).norm()
}

/// One leave-one-out evaluation: held-out index, predicted and ground-truth
/// target positions (mm), and the resulting target registration error.
#[derive(Debug, Clone, Serialize)]
pub struct FoldRecord {
    /// Index of the fiducial held out as the evaluation target.
    pub held_out_index: usize,
    /// Ground-truth intra-operative target position, mm.
    pub ground_truth: [f64; 3],
    /// Predicted (registered, deformed) target position, mm.
    pub predicted: [f64; 3],
    /// Euclidean distance between predicted and ground truth, mm.
    pub distance_mm: f64,
}

impl FoldRecord {
    pub fn new(held_out_index: usize, ground_truth: &Point3, predicted: &Point3) -> Self {
        Self {
            held_out_index,
            ground_truth: [ground_truth.x, ground_truth.y, ground_truth.z],
            predicted: [predicted.x, predicted.y, predicted.z],
            distance_mm: distance(ground_truth, predicted),
        }
    }
}

/// Summary statistics over one case's fold distances, mm.
///
/// Derived from the fold records and recomputed whenever they change;
/// `n_folds` says how many folds actually succeeded. With zero folds the
/// statistics are NaN — written out explicitly, never fabricated.
#[derive(Debug, Clone, Serialize)]
pub struct CaseSummary {
    pub mean: f64,
    /// Sample standard deviation (N−1 divisor); 0.0 by convention when
    /// only a single fold succeeded.
    pub std: f64,
    pub max: f64,
    pub min: f64,
    /// Number of successful folds the statistics were computed from.
    pub n_folds: usize,
}

impl CaseSummary {
    /// Summary for a case where no fold produced a distance.
    pub fn undefined() -> Self {
        Self {
            mean: f64::NAN,
            std: f64::NAN,
            max: f64::NAN,
            min: f64::NAN,
            n_folds: 0,
        }
    }
}

/// Arithmetic mean. Empty input yields `InsufficientData`.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(RegistrationError::InsufficientData(
            "mean of an empty sample".into(),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (N−1 divisor). Needs at least 2 samples.
pub fn sample_std(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(RegistrationError::InsufficientData(format!(
            "standard deviation requires at least 2 samples, got {}",
            values.len()
        )));
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    Ok(variance.sqrt())
}

/// Summarize fold distances into a [`CaseSummary`].
///
/// Mean/max/min are defined from a single sample; std falls back to 0.0
/// for a single sample (the convention the cross-case CSV has always
/// used). An empty slice is `InsufficientData` — callers that tolerate
/// zero-fold cases should use [`CaseSummary::undefined`] instead.
pub fn summarize(distances: &[f64]) -> Result<CaseSummary> {
    let mean = mean(distances)?;
    let std = match sample_std(distances) {
        Ok(s) => s,
        Err(RegistrationError::InsufficientData(_)) => 0.0,
        Err(e) => return Err(e),
    };
    let max = distances.iter().cloned().fold(f64::MIN, f64::max);
    let min = distances.iter().cloned().fold(f64::MAX, f64::min);
    Ok(CaseSummary {
        mean,
        std,
        max,
        min,
        n_folds: distances.len(),
    })
}

fn append_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file))
}

/// Append one fold row to a per-case `TRE.csv`:
/// `gt_x, gt_y, gt_z, pred_x, pred_y, pred_z, distance_mm`.
pub fn append_fold_record(path: impl AsRef<Path>, record: &FoldRecord) -> Result<()> {
    let mut writer = append_writer(path.as_ref())?;
    writer
        .write_record([
            record.ground_truth[0].to_string(),
            record.ground_truth[1].to_string(),
            record.ground_truth[2].to_string(),
            record.predicted[0].to_string(),
            record.predicted[1].to_string(),
            record.predicted[2].to_string(),
            record.distance_mm.to_string(),
        ])
        .map_err(|e| RegistrationError::format(path.as_ref(), e.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// Append one case row to the cross-case summary CSV:
/// `mean, std, max, min, run_name, case_id`.
pub fn append_case_summary(
    path: impl AsRef<Path>,
    summary: &CaseSummary,
    run_name: &str,
    case_id: u32,
) -> Result<()> {
    let mut writer = append_writer(path.as_ref())?;
    writer
        .write_record([
            summary.mean.to_string(),
            summary.std.to_string(),
            summary.max.to_string(),
            summary.min.to_string(),
            run_name.to_string(),
            case_id.to_string(),
        ])
        .map_err(|e| RegistrationError::format(path.as_ref(), e.to_string()))?;
    writer.flush()?;
    Ok(())
}
