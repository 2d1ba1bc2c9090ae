//! Segment classification and the anomaly log.
//!
//! Cutting moves with a declared feed are not logged; the log stays
//! proportional to the anomalies in a program.

use serde::{Deserialize, Serialize};

use crate::axis::AxisVector;
use crate::kinematics::{ArcFallback, Formula, Kinematics};
use crate::modal::{LineRecord, MotionMode};

/// Sub-tag for lines that do not move any axis. Only used for the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineTag {
    /// `M` code.
    Auxiliary,
    /// Spindle speed or tool selection.
    ToolSpeed,
    /// `G` setup line without coordinates.
    Preparatory,
    /// Program start `%` or program number `O`.
    Header,
    /// Anything else, including blank lines.
    Uncategorized,
}

impl LineTag {
    /// Tag a non-motion line by its text.
    pub fn of(text: &str) -> LineTag {
        let upper = text.trim_start().to_ascii_uppercase();
        if upper.contains('M') {
            LineTag::Auxiliary
        } else if upper.contains('S') || upper.contains('T') {
            LineTag::ToolSpeed
        } else if upper.starts_with('G') {
            LineTag::Preparatory
        } else if upper.starts_with('%') || upper.starts_with('O') {
            LineTag::Header
        } else {
            LineTag::Uncategorized
        }
    }

    /// Log suffix, `None` for lines that are not logged.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            LineTag::Auxiliary => Some("[M Code]"),
            LineTag::ToolSpeed => Some("[Tool/Speed]"),
            LineTag::Preparatory => Some("[G Code Setup]"),
            LineTag::Header => Some("[Header]"),
            LineTag::Uncategorized => None,
        }
    }
}

/// Exactly one class per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveClass {
    /// `G00` move.
    Rapid,
    /// `G01`/`G02`/`G03` move.
    Cutting,
    /// Motion line whose distance is within the near-zero threshold.
    Stationary,
    /// Line without position words.
    NonMotion(LineTag),
}

impl MoveClass {
    /// Short label for reports.
    pub fn label(self) -> &'static str {
        match self {
            MoveClass::Rapid => "Rapid",
            MoveClass::Cutting => "Cutting",
            MoveClass::Stationary => "Stationary",
            MoveClass::NonMotion(_) => "Non-motion",
        }
    }
}

/// One segment: the move from row `line - 1` to row `line`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based line index of the segment's end.
    pub line: usize,
    /// Motion mode in effect.
    pub mode: MotionMode,
    /// Start position.
    pub start: AxisVector,
    /// End position.
    pub end: AxisVector,
    /// Distances and formula.
    pub kinematics: Kinematics,
    /// Feed used for time and statistics; the default when none was declared.
    pub feed: f64,
    /// Was a positive feed declared by this point?
    pub feed_declared: bool,
    /// Classification.
    pub class: MoveClass,
}

impl Segment {
    /// Classify a measured segment.
    pub fn classify(
        record: &LineRecord,
        start: AxisVector,
        end: AxisVector,
        kinematics: Kinematics,
        default_feed: f64,
        near_zero: f64,
    ) -> Segment {
        let class = if !record.has_axis_words {
            MoveClass::NonMotion(LineTag::of(&record.text))
        } else if kinematics.distance <= near_zero {
            MoveClass::Stationary
        } else if record.mode.is_cutting() {
            MoveClass::Cutting
        } else {
            MoveClass::Rapid
        };
        let feed_declared = record.feed > 0.0;
        Segment {
            line: record.index,
            mode: record.mode,
            start,
            end,
            kinematics,
            feed: if feed_declared { record.feed } else { default_feed },
            feed_declared,
            class,
        }
    }

    /// Mode-dependent distance.
    pub fn distance(&self) -> f64 {
        self.kinematics.distance
    }

    /// Is this a counted cutting move?
    pub fn is_cutting(&self) -> bool {
        self.class == MoveClass::Cutting
    }

    /// Is this a counted rapid move?
    pub fn is_rapid(&self) -> bool {
        self.class == MoveClass::Rapid
    }

    /// Did the TCP compound formula apply?
    pub fn is_tcp(&self) -> bool {
        self.kinematics.formula == Formula::TcpCompound
    }

    /// Cutting move without a declared feed.
    pub fn missing_feed(&self) -> bool {
        self.is_cutting() && !self.feed_declared
    }

    /// Arc fallback reason, for arcs that moved.
    pub fn arc_fallback(&self) -> Option<ArcFallback> {
        match (self.class, self.kinematics.formula) {
            (MoveClass::Cutting, Formula::Chord(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Anomaly tags, in log order.
    pub fn notes(&self, default_feed: f64) -> Vec<String> {
        let mut notes = Vec::new();
        match self.arc_fallback() {
            Some(ArcFallback::MissingRadius) => {
                notes.push("[Arc: no radius, chord approximation]".to_owned());
            }
            Some(ArcFallback::InvalidRadius(r)) => {
                notes.push(format!("[Arc: invalid radius R{r}, chord approximation]"));
            }
            None => {}
        }
        if self.missing_feed() {
            notes.push(format!("[No feed declared, using F{default_feed}]"));
        }
        notes
    }

    /// Human-readable log line, `None` when the segment is not logged.
    pub fn log_entry(&self, text: &str, default_feed: f64) -> Option<String> {
        let suffix = match self.class {
            MoveClass::NonMotion(tag) => {
                if text.trim().is_empty() {
                    return None;
                }
                tag.suffix()?.to_owned()
            }
            MoveClass::Stationary => "[Stationary]".to_owned(),
            MoveClass::Rapid => return None,
            MoveClass::Cutting => {
                let notes = self.notes(default_feed);
                if notes.is_empty() {
                    return None;
                }
                notes.join(" ")
            }
        };
        Some(format!("Line {}: {} {}", self.line, text, suffix))
    }
}
