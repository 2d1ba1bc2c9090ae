//! Modal state tracking.
//!
//! Motion mode and feed are modal: a line without a motion word moves in the
//! last declared mode, and a line without `F` cuts at the last declared feed.
//! TCP mode is sticky for the rest of the program once a linear move carries
//! a tool vector.

use serde::{Deserialize, Serialize};

use crate::lexer::LineTokens;

/// Motion mode selected by `G0`..`G3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MotionMode {
    /// `G00` positioning.
    #[default]
    Rapid,
    /// `G01` linear interpolation.
    Linear,
    /// `G02` clockwise arc.
    ArcCw,
    /// `G03` counter-clockwise arc.
    ArcCcw,
}

impl MotionMode {
    /// Mode for a numeric G code, if it is a motion code.
    pub fn from_code(code: u32) -> Option<MotionMode> {
        match code {
            0 => Some(MotionMode::Rapid),
            1 => Some(MotionMode::Linear),
            2 => Some(MotionMode::ArcCw),
            3 => Some(MotionMode::ArcCcw),
            _ => None,
        }
    }

    /// Zero-padded G word.
    pub fn word(self) -> &'static str {
        match self {
            MotionMode::Rapid => "G00",
            MotionMode::Linear => "G01",
            MotionMode::ArcCw => "G02",
            MotionMode::ArcCcw => "G03",
        }
    }

    /// Does this mode remove material?
    pub fn is_cutting(self) -> bool {
        !matches!(self, MotionMode::Rapid)
    }

    /// Is this a circular mode?
    pub fn is_arc(self) -> bool {
        matches!(self, MotionMode::ArcCw | MotionMode::ArcCcw)
    }
}

impl std::fmt::Display for MotionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.word())
    }
}

/// Running modal state threaded through the line fold.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModalState {
    /// Current motion mode.
    pub mode: MotionMode,
    /// Last declared feed; `0.0` until one is declared.
    pub feed: f64,
    /// Sticky TCP flag.
    pub tcp: bool,
}

/// Per-line record produced by the modal fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    /// 1-based line index.
    pub index: usize,
    /// Comment-stripped source text.
    pub text: String,
    /// Motion mode in effect on this line.
    pub mode: MotionMode,
    /// Feed in effect on this line (sticky).
    pub feed: f64,
    /// Arc radius declared on this line only.
    pub radius: Option<f64>,
    /// Does the line carry any position word?
    pub has_axis_words: bool,
    /// Was TCP mode in effect on this line?
    pub tcp: bool,
}

impl ModalState {
    /// Apply one line's tokens.
    ///
    /// Returns the new state and whether TCP mode was switched on by this line.
    pub fn advance(self, tokens: &LineTokens) -> (ModalState, bool) {
        let mode = tokens.motion.unwrap_or(self.mode);
        let feed = tokens.feed().unwrap_or(self.feed);
        let activates = !self.tcp && mode == MotionMode::Linear && tokens.has_vector_words();
        let next = ModalState {
            mode,
            feed,
            tcp: self.tcp || activates,
        };
        (next, activates)
    }

    /// Build the line record for a line processed in this state.
    pub fn record(&self, index: usize, text: &str, tokens: &LineTokens) -> LineRecord {
        LineRecord {
            index,
            text: text.to_owned(),
            mode: self.mode,
            feed: self.feed,
            radius: tokens.radius(),
            has_axis_words: tokens.has_axis_words(),
            tcp: self.tcp,
        }
    }
}
