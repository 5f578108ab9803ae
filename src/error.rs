//! Error types for registration and TRE evaluation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during point-file I/O, alignment, or a CV run.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed point file (declared count mismatches parsed coordinates,
    /// missing POINTS declaration, unparseable coordinate, ...)
    #[error("Format error in {path}: {message}")]
    Format {
        /// File the error occurred in
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Solver input cannot determine a unique rotation: fewer than 3
    /// correspondences, mismatched set lengths, or zero-variance source points.
    #[error("Degenerate solver input: {0}")]
    DegenerateInput(String),

    /// A case has too few fiducials to evaluate at all; the case is skipped.
    #[error("Case {case_id:04}: {count} fiducial(s) found, at least 3 required")]
    InsufficientFiducials {
        /// Four-digit case identifier
        case_id: u32,
        /// Number of fiducials actually present
        count: usize,
    },

    /// Sample standard deviation requested on fewer than 2 samples.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The external deformation collaborator failed or produced no output.
    #[error("External deformation step failed ({status}): {message}")]
    ExternalProcess {
        /// Exit status description of the collaborator process
        status: String,
        /// Captured stderr or a description of the missing output
        message: String,
    },
}

impl RegistrationError {
    /// Create a format error for a specific file.
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        RegistrationError::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for registration and evaluation operations
pub type Result<T> = std::result::Result<T, RegistrationError>;
