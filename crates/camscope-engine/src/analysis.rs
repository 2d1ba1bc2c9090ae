//! The analysis pipeline.
//!
//! Stages run strictly downstream: normalize, tokenize + modal fold into
//! sparse writes, dense reconstruction, kinematics, classification, and
//! statistics. The progress sink is consulted between stages and every
//! `progress_interval` lines inside the long ones; an abort discards all
//! work and yields [`AnalysisOutcome::Cancelled`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::classify::{MoveClass, Segment};
use crate::error::Result;
use crate::kinematics::measure;
use crate::lexer::{normalize, tokenize};
use crate::modal::{LineRecord, ModalState, MotionMode};
use crate::progress::{Cancelled, Checkpoint, ProgressSink, Stage};
use crate::settings::AnalysisSettings;
use crate::stats::Statistics;
use crate::table::{PositionTable, SparseAccumulator};

/// Which distance model the program was analyzed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalcMode {
    /// Plain Euclidean distances.
    #[default]
    Euclidean,
    /// TCP vector compound distances for linear moves.
    TcpVector,
}

impl CalcMode {
    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            CalcMode::Euclidean => "Euclidean distance",
            CalcMode::TcpVector => "TCP vector compound distance (IJK)",
        }
    }
}

/// How many lines fell into each class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoveCounts {
    /// Counted rapid moves.
    pub rapid: usize,
    /// Counted cutting moves.
    pub cutting: usize,
    /// Motion lines that did not move.
    pub stationary: usize,
    /// Lines without position words.
    pub non_motion: usize,
    /// Cutting moves that used the default feed.
    pub missing_feed: usize,
    /// Arcs measured by their chord.
    pub arc_approximations: usize,
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Forward-filled positions, row 0 = home.
    pub positions: PositionTable,
    /// Per-line modal records.
    pub lines: Vec<LineRecord>,
    /// One segment per line.
    pub segments: Vec<Segment>,
    /// Human-readable log of skipped and anomalous lines.
    pub skipped: Vec<String>,
    /// Axes that moved, in priority order.
    pub axes: Vec<Axis>,
    /// Sum of rapid distances (mm).
    pub rapid_distance: f64,
    /// Sum of cutting distances (mm).
    pub cutting_distance: f64,
    /// Estimated cutting time (minutes).
    pub cutting_time_min: f64,
    /// Distance model used.
    pub calc_mode: CalcMode,
    /// Line that switched TCP mode on.
    pub tcp_line: Option<usize>,
    /// Class counts.
    pub counts: MoveCounts,
    /// Histogram, rankings and BPT.
    pub stats: Statistics,
}

impl AnalysisResult {
    /// Was TCP mode detected?
    pub fn is_tcp(&self) -> bool {
        self.tcp_line.is_some()
    }

    /// Number of program lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Rapid plus cutting distance.
    pub fn total_distance(&self) -> f64 {
        self.rapid_distance + self.cutting_distance
    }

    /// Row index array, 0 (home) through N.
    ///
    /// The per-row arrays (`line_numbers`, `feeds`, `modes`) have N + 1
    /// entries and line up with `positions`; the per-segment arrays
    /// (`distances`, `xyz_distances`, `rotations_deg`) have N, entry `i`
    /// being the move into row `i + 1`.
    pub fn line_numbers(&self) -> Vec<usize> {
        (0..=self.lines.len()).collect()
    }

    /// Per-segment mode-dependent distance.
    pub fn distances(&self) -> Vec<f64> {
        self.segments.iter().map(Segment::distance).collect()
    }

    /// Per-segment XYZ distance.
    pub fn xyz_distances(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.kinematics.xyz).collect()
    }

    /// Per-segment tool-axis rotation in degrees.
    pub fn rotations_deg(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.kinematics.angle_deg).collect()
    }

    /// Per-row feed in effect, row 0 = home (0 where none was declared yet).
    pub fn feeds(&self) -> Vec<f64> {
        std::iter::once(0.0)
            .chain(self.lines.iter().map(|l| l.feed))
            .collect()
    }

    /// Per-row motion mode, row 0 = home (rapid).
    pub fn modes(&self) -> Vec<MotionMode> {
        std::iter::once(MotionMode::default())
            .chain(self.lines.iter().map(|l| l.mode))
            .collect()
    }

    /// Per-interval cutting segment counts, empty bins included.
    pub fn histogram(&self) -> Vec<usize> {
        self.stats.histogram()
    }

    /// Counted cutting segments.
    pub fn cutting_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.is_cutting())
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The run finished.
    Completed(Box<AnalysisResult>),
    /// The host aborted the run; nothing was kept.
    Cancelled(Cancelled),
}

impl AnalysisOutcome {
    /// The result, if the run finished.
    pub fn completed(self) -> Option<AnalysisResult> {
        match self {
            AnalysisOutcome::Completed(result) => Some(*result),
            AnalysisOutcome::Cancelled(_) => None,
        }
    }

    /// Was the run cancelled?
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisOutcome::Cancelled(_))
    }
}

/// Analyze one G-code program.
///
/// Fails only on invalid settings. Each call owns all of its buffers, so
/// identical input always yields an identical result.
pub fn analyze<P: ProgressSink>(
    source: &str,
    settings: &AnalysisSettings,
    progress: &mut P,
) -> Result<AnalysisOutcome> {
    settings.validate()?;
    let mut checkpoint = Checkpoint::new(progress);
    let outcome = match run(source, settings, &mut checkpoint) {
        Ok(result) => AnalysisOutcome::Completed(Box::new(result)),
        Err(cancelled) => AnalysisOutcome::Cancelled(cancelled),
    };
    tracing::debug!(callbacks = checkpoint.calls(), "progress callbacks issued");
    Ok(outcome)
}

fn run(
    source: &str,
    settings: &AnalysisSettings,
    checkpoint: &mut Checkpoint<'_>,
) -> std::result::Result<AnalysisResult, Cancelled> {
    let texts = normalize(source);
    let total = texts.len();

    let parsed = parse(&texts, settings, checkpoint)?;
    tracing::debug!(
        lines = total,
        sparse_entries = parsed.sparse.len(),
        "parsed program"
    );

    checkpoint.stage(Stage::Reconstruction, 60.0)?;
    let positions = PositionTable::reconstruct(&parsed.sparse, total);

    checkpoint.stage(Stage::Kinematics, 80.0)?;
    let segments = measure_segments(&positions, &parsed.records, settings, checkpoint)?;

    let mut skipped = Vec::new();
    let mut counts = MoveCounts::default();
    for (segment, record) in segments.iter().zip(&parsed.records) {
        match segment.class {
            MoveClass::Rapid => counts.rapid += 1,
            MoveClass::Cutting => counts.cutting += 1,
            MoveClass::Stationary => counts.stationary += 1,
            MoveClass::NonMotion(_) => counts.non_motion += 1,
        }
        if segment.missing_feed() {
            counts.missing_feed += 1;
        }
        if segment.arc_fallback().is_some() {
            counts.arc_approximations += 1;
        }
        if let Some(entry) = segment.log_entry(&record.text, settings.default_feed) {
            skipped.push(entry);
        }
    }
    if counts.missing_feed > 0 || counts.arc_approximations > 0 {
        tracing::warn!(
            missing_feed = counts.missing_feed,
            arc_approximations = counts.arc_approximations,
            "recovered anomalies"
        );
    }

    let rapid_distance: f64 = segments
        .iter()
        .filter(|s| s.is_rapid())
        .map(Segment::distance)
        .sum();
    let cutting_distance: f64 = segments
        .iter()
        .filter(|s| s.is_cutting())
        .map(Segment::distance)
        .sum();
    let cutting_time_min: f64 = segments
        .iter()
        .filter(|s| s.is_cutting())
        .map(|s| s.distance() / s.feed)
        .sum();

    checkpoint.stage(Stage::Statistics, 90.0)?;
    let stats = Statistics::aggregate(
        segments
            .iter()
            .filter(|s| s.is_cutting())
            .map(|s| (s.distance(), s.feed)),
        settings,
    );
    let axes = positions.axes_used();

    checkpoint.stage(Stage::Finished, 100.0)?;

    let calc_mode = if parsed.tcp_line.is_some() {
        CalcMode::TcpVector
    } else {
        CalcMode::Euclidean
    };
    tracing::info!(
        lines = total,
        rapid_mm = rapid_distance,
        cutting_mm = cutting_distance,
        minutes = cutting_time_min,
        mode = calc_mode.label(),
        "analysis complete"
    );

    Ok(AnalysisResult {
        positions,
        lines: parsed.records,
        segments,
        skipped,
        axes,
        rapid_distance,
        cutting_distance,
        cutting_time_min,
        calc_mode,
        tcp_line: parsed.tcp_line,
        counts,
        stats,
    })
}

struct Parsed {
    records: Vec<LineRecord>,
    sparse: SparseAccumulator,
    tcp_line: Option<usize>,
}

fn parse(
    texts: &[String],
    settings: &AnalysisSettings,
    checkpoint: &mut Checkpoint<'_>,
) -> std::result::Result<Parsed, Cancelled> {
    let total = texts.len();
    let mut state = ModalState::default();
    let mut sparse = SparseAccumulator::with_line_capacity(total);
    let mut records = Vec::with_capacity(total);
    let mut tcp_line = None;

    for (i, text) in texts.iter().enumerate() {
        if i % settings.progress_interval == 0 {
            checkpoint.stage(Stage::Parsing, i as f64 / total as f64 * 50.0)?;
        }
        let index = i + 1;
        let tokens = tokenize(text);
        let (next, activated) = state.advance(&tokens);
        if activated {
            tracing::info!(line = index, "TCP vector mode activated");
            tcp_line = Some(index);
        }
        state = next;
        for (axis, value) in tokens.axis_words() {
            sparse.push(index, axis, value);
        }
        records.push(state.record(index, text, &tokens));
    }

    Ok(Parsed {
        records,
        sparse,
        tcp_line,
    })
}

fn measure_segments(
    positions: &PositionTable,
    records: &[LineRecord],
    settings: &AnalysisSettings,
    checkpoint: &mut Checkpoint<'_>,
) -> std::result::Result<Vec<Segment>, Cancelled> {
    let rows = positions.rows();
    let total = records.len();
    let mut segments = Vec::with_capacity(total);

    for chunk in records.chunks(settings.progress_interval) {
        let measured: Vec<Segment> = chunk
            .par_iter()
            .map(|record| {
                let start = rows[record.index - 1];
                let end = rows[record.index];
                let kinematics = measure(&start, &end, record.mode, record.tcp, record.radius);
                Segment::classify(
                    record,
                    start,
                    end,
                    kinematics,
                    settings.default_feed,
                    settings.near_zero,
                )
            })
            .collect();
        segments.extend(measured);
        let percent = 80.0 + 10.0 * segments.len() as f64 / total as f64;
        checkpoint.stage(Stage::Kinematics, percent)?;
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisVector;
    use crate::kinematics::Formula;
    use crate::progress::NoProgress;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn run_ok(source: &str) -> AnalysisResult {
        run_with(source, &AnalysisSettings::default())
    }

    fn run_with(source: &str, settings: &AnalysisSettings) -> AnalysisResult {
        analyze(source, settings, &mut NoProgress)
            .unwrap()
            .completed()
            .unwrap()
    }

    #[test]
    fn test_rapid_then_cut() {
        let r = run_ok("G00 X10 Y0 Z0\nG01 X10 Y10 F500");
        assert_relative_eq!(r.rapid_distance, 10.0);
        assert_relative_eq!(r.cutting_distance, 10.0);
        assert_relative_eq!(r.cutting_time_min, 0.02);
        assert!(!r.is_tcp());
        assert_eq!(r.calc_mode, CalcMode::Euclidean);
        assert_eq!(r.stats.binned, 1);
        assert_eq!(r.stats.bins[20].count, 1);
        assert!(r.stats.bins[20].interval.is_open());
        assert_eq!(r.stats.bins[20].interval.start, 1.0);
    }

    #[test]
    fn test_tcp_identical_vectors() {
        let r = run_ok("G01 X0 Y0 Z0 I0 J0 K1 F1000\nG01 X10 Y0 Z0 I0 J0 K1");
        assert_eq!(r.tcp_line, Some(1));
        assert_eq!(r.calc_mode, CalcMode::TcpVector);
        let seg = &r.segments[1];
        assert_eq!(seg.kinematics.formula, Formula::TcpCompound);
        assert_relative_eq!(seg.kinematics.angle_deg, 0.0);
        assert_relative_eq!(seg.distance(), 10.0);
        assert_relative_eq!(seg.kinematics.xyz, 10.0);
    }

    #[test]
    fn test_half_circle_arc() {
        let r = run_ok("G02 X10 Y0 R5");
        let seg = &r.segments[0];
        assert_eq!(seg.kinematics.formula, Formula::ArcLength);
        assert_relative_eq!(seg.distance(), 5.0 * PI, epsilon = 1e-9);
        assert_relative_eq!(seg.distance(), 15.708, epsilon = 1e-3);
        assert_eq!(r.counts.arc_approximations, 0);
        assert!(r.skipped.iter().all(|l| !l.contains("radius")));
    }

    #[test]
    fn test_rounded_half_circle_is_not_invalid() {
        let r = run_ok("G00 X0.013 Y0.007\nG02 X0.913 Y1.207 R0.75 F100");
        let seg = &r.segments[1];
        assert_eq!(seg.kinematics.formula, Formula::ArcLength);
        assert_relative_eq!(seg.distance(), 0.75 * PI, epsilon = 1e-9);
        assert_eq!(r.counts.arc_approximations, 0);
        assert!(r.skipped.is_empty());
    }

    #[test]
    fn test_row_arrays_line_up() {
        let r = run_ok("G00 X1\nG01 X2 F300\nX3");
        assert_eq!(r.line_numbers(), vec![0, 1, 2, 3]);
        assert_eq!(r.feeds(), vec![0.0, 0.0, 300.0, 300.0]);
        assert_eq!(
            r.modes(),
            vec![MotionMode::Rapid, MotionMode::Rapid, MotionMode::Linear, MotionMode::Linear]
        );
        assert_eq!(r.positions.len(), r.feeds().len());
        assert_eq!(r.distances().len(), r.line_count());
    }

    #[test]
    fn test_invalid_radius_arc() {
        let r = run_ok("G02 X10 Y0 R4");
        let seg = &r.segments[0];
        assert_relative_eq!(seg.distance(), 10.0);
        assert_eq!(r.counts.arc_approximations, 1);
        assert!(r.skipped[0].contains("invalid radius"));
    }

    #[test]
    fn test_planar_program_axes() {
        let r = run_ok("G00 X1 Y1\nG01 X5 Y2 F100\nX0 Y0");
        assert_eq!(r.axes, vec![Axis::X, Axis::Y, Axis::K]);
        for row in r.positions.rows() {
            assert_eq!(row[Axis::Z], 0.0);
            assert_eq!(row.abc(), [0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_feedless_cut_after_rapids() {
        let r = run_ok("G00 X1\nG01 X5");
        assert_eq!(r.counts.missing_feed, 1);
        assert!(r.skipped.iter().any(|l| l.contains("No feed declared")));
        assert_relative_eq!(r.cutting_time_min, 4.0 / 1000.0);
    }

    #[test]
    fn test_forward_fill_invariant() {
        let source = "G00 X1 Y2\nZ5\nG01 A30 F200\nM03\nX4 K0.5\nY-1\n(comment)\nB10";
        let r = run_ok(source);
        let lines = normalize(source);
        let mut expected = AxisVector::HOME;
        assert_eq!(r.positions.row(0), Some(&AxisVector::HOME));
        for (i, text) in lines.iter().enumerate() {
            for (axis, value) in tokenize(text).axis_words() {
                expected.0[axis.index()] = value;
            }
            assert_eq!(r.positions.row(i + 1), Some(&expected), "line {}", i + 1);
        }
    }

    #[test]
    fn test_conservation() {
        let r = run_ok("G00 X10\nG01 Y10 F300\nG02 X20 Y0 R10\nG00 Z5\nG01 Z0\nX0 F900");
        let rapid: f64 = r.segments.iter().filter(|s| s.is_rapid()).map(|s| s.distance()).sum();
        let cut: f64 = r.cutting_segments().map(|s| s.distance()).sum();
        assert_eq!(rapid, r.rapid_distance);
        assert_eq!(cut, r.cutting_distance);
        assert_eq!(rapid + cut, r.total_distance());
    }

    #[test]
    fn test_bin_coverage() {
        let r = run_ok("G01 X0.0005 F100\nX0.002\nX0.5\nX0.5\nX7\nG00 X0");
        let cutting = r
            .segments
            .iter()
            .filter(|s| s.mode.is_cutting() && s.distance() > 1e-6)
            .count();
        assert_eq!(cutting, 4);
        assert_eq!(r.histogram().iter().sum::<usize>(), cutting);
        assert_eq!(r.histogram().len(), 21);
        assert_eq!(r.stats.unbinned, 0);
    }

    #[test]
    fn test_tcp_stickiness() {
        let r = run_ok("G01 X1 A5 F100\nX2 I0 J0 K1\nX3\nG00 X4\nG01 X5\nG02 X6 R1");
        assert_eq!(r.tcp_line, Some(2));
        assert_eq!(r.segments[0].kinematics.formula, Formula::Euclidean);
        assert_relative_eq!(r.segments[0].distance(), (1.0f64 + 25.0).sqrt());
        assert_eq!(r.segments[1].kinematics.formula, Formula::TcpCompound);
        assert_eq!(r.segments[2].kinematics.formula, Formula::TcpCompound);
        assert_eq!(r.segments[3].kinematics.formula, Formula::Rapid);
        assert_eq!(r.segments[4].kinematics.formula, Formula::TcpCompound);
        assert_eq!(r.segments[5].kinematics.formula, Formula::ArcLength);
        assert!(r.lines[2..].iter().all(|l| l.tcp));
    }

    #[test]
    fn test_idempotent() {
        let source = concat!(
            "%\nO1000\nG90 G17\nT1 M6\nS8000 M3\n",
            "G00 X0 Y0 Z5\nG01 Z-1 F200\nX10 I0 J0.2 K1\nG03 X0 Y10 R-10\nM30\n%",
        );
        let settings = AnalysisSettings::default();
        let first = run_with(source, &settings);
        let second = run_with(source, &settings);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_cancellation_at_every_callback() {
        let source: String = (0..20).map(|i| format!("G01 X{i} F100\n")).collect();
        let settings = AnalysisSettings {
            progress_interval: 3,
            ..Default::default()
        };

        let mut total_calls = 0;
        let mut counter = |_p: f64, _m: &str| {
            total_calls += 1;
            false
        };
        assert!(!analyze(&source, &settings, &mut counter).unwrap().is_cancelled());
        assert!(total_calls > 10);

        for k in 1..=total_calls {
            let mut calls = 0;
            let mut sink = |_p: f64, _m: &str| {
                calls += 1;
                calls == k
            };
            let outcome = analyze(&source, &settings, &mut sink).unwrap();
            assert!(outcome.is_cancelled(), "cancel at call {k}");
            assert_eq!(calls, k, "no callbacks after cancellation at {k}");
            assert_eq!(outcome.completed(), None);
        }
    }

    #[test]
    fn test_progress_milestones() {
        let mut seen = Vec::new();
        let mut sink = |p: f64, m: &str| {
            seen.push((p, m.to_owned()));
            false
        };
        analyze("G00 X1\nG01 X2 F100", &AnalysisSettings::default(), &mut sink).unwrap();
        let messages: Vec<&str> = seen.iter().map(|(_, m)| m.as_str()).collect();
        assert_eq!(messages.first(), Some(&"Parsing G-code (Sparse)"));
        assert!(messages.contains(&"Building Matrix"));
        assert!(messages.contains(&"Calculating Vectors"));
        assert_eq!(seen.last().map(|(p, _)| *p), Some(100.0));
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = AnalysisSettings {
            progress_interval: 0,
            ..Default::default()
        };
        assert!(analyze("G00 X1", &settings, &mut NoProgress).is_err());
    }

    #[test]
    fn test_empty_program() {
        let r = run_ok("");
        assert_eq!(r.line_count(), 0);
        assert_eq!(r.total_distance(), 0.0);
        assert!(r.stats.top.is_empty());
        assert!(r.stats.bpt.is_none());
        assert_eq!(r.line_numbers(), vec![0]);
    }

    #[test]
    fn test_skipped_log_tags() {
        let r = run_ok("%\nO1000\nG90 G21\nT2 M6\nS12000\nG00 X1\nX1\nM30");
        assert_eq!(
            r.skipped,
            vec![
                "Line 1: % [Header]",
                "Line 2: O1000 [Header]",
                "Line 3: G90 G21 [G Code Setup]",
                "Line 4: T2 M6 [M Code]",
                "Line 5: S12000 [Tool/Speed]",
                "Line 7: X1 [Stationary]",
                "Line 8: M30 [M Code]",
            ]
        );
        assert_eq!(r.counts.non_motion, 6);
        assert_eq!(r.counts.stationary, 1);
        assert_eq!(r.counts.rapid, 1);
    }
}
