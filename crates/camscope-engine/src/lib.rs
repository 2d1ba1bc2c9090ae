#![warn(missing_docs)]

//! G-code toolpath diagnostics engine.
//!
//! This crate turns a CNC program into per-line machine positions, segment
//! distances and tool-axis rotations, classifies every line, and summarizes
//! cutting moves into a segment-length histogram with a best-processing-time
//! estimate. Five-axis programs that carry `I J K` tool vectors on linear
//! moves are measured with a compound XYZ plus rotation distance.
//!
//! # Example
//!
//! ```
//! use camscope_engine::{analyze, AnalysisSettings, NoProgress};
//!
//! let program = "G00 X10 Y0 Z0\nG01 X10 Y10 F500\n";
//! let outcome = analyze(program, &AnalysisSettings::default(), &mut NoProgress)?;
//! let result = outcome.completed().expect("not cancelled");
//!
//! assert_eq!(result.rapid_distance, 10.0);
//! assert_eq!(result.cutting_distance, 10.0);
//! println!("cutting time: {:.3} min", result.cutting_time_min);
//! # Ok::<(), camscope_engine::EngineError>(())
//! ```

pub mod analysis;
pub mod axis;
pub mod classify;
pub mod error;
pub mod kinematics;
pub mod lexer;
pub mod modal;
pub mod progress;
pub mod settings;
pub mod stats;
pub mod table;

pub use analysis::{analyze, AnalysisOutcome, AnalysisResult, CalcMode, MoveCounts};
pub use axis::{Axis, AxisVector, AXIS_COUNT};
pub use classify::{LineTag, MoveClass, Segment};
pub use error::{EngineError, Result};
pub use kinematics::{measure, ArcFallback, Formula, Kinematics};
pub use lexer::{normalize, tokenize, LineTokens};
pub use modal::{LineRecord, ModalState, MotionMode};
pub use progress::{CancelToken, Cancelled, Guarded, NoProgress, ProgressSink, Stage};
pub use settings::{default_intervals, AnalysisSettings, BinInterval, DEFAULT_FEED, NEAR_ZERO};
pub use stats::{format_length, interval_label, Bin, BptEstimate, RankedBin, Statistics};
pub use table::{PositionTable, SparseAccumulator};
