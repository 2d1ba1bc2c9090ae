#![warn(missing_docs)]

//! Report output for camscope analyses.
//!
//! Two views over an [`AnalysisResult`](camscope_engine::AnalysisResult):
//! the per-segment CSV table and the headline [`Summary`], which renders
//! as text and serializes to JSON.

pub mod error;
pub mod export;
pub mod summary;

pub use error::{ReportError, Result};
pub use export::{write_csv, CsvOptions};
pub use summary::{format_duration, HeadlineBin, Summary, DEFAULT_LOG_LIMIT};
