//! Error types for the analysis engine.

use thiserror::Error;

/// Errors that can occur before or during an analysis run.
///
/// Per-line anomalies are never errors: they are recovered locally and
/// reported in the skipped-line log. Cancellation is not an error either,
/// see [`AnalysisOutcome`](crate::AnalysisOutcome).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Invalid analysis settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
