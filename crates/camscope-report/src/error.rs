//! Error types for report output.

use thiserror::Error;

/// Errors that can occur while writing a report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Underlying writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
