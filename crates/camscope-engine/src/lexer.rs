//! Line normalization and word tokenization.
//!
//! Handles the subset of G-code words the kinematics pipeline needs:
//! - Position, rotary and vector words (`X Y Z A B C I J K`)
//! - Feed (`F`) and arc radius (`R`)
//! - Motion words `G0`..`G3`, with or without zero padding
//!
//! Anything else (`N`, `M`, `S`, `T`, other `G` codes, stray text) is ignored.
//! A word whose number does not parse simply does not contribute a value.

use std::sync::LazyLock;

use regex::Regex;

use crate::axis::Axis;
use crate::modal::MotionMode;

static COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("comment pattern is valid"));

static WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([XYZABCIJKFR])([-+]?(?:\d+\.?\d*|\.\d+))").expect("word pattern is valid")
});

static G_WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)G(\d+)").expect("G-word pattern is valid"));

/// Address of a word the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    /// One of the nine position components.
    Axis(Axis),
    /// Feed rate `F`.
    Feed,
    /// Arc radius `R`.
    Radius,
}

/// A single `(address, value)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Word {
    /// Word address.
    pub address: Address,
    /// Numeric value.
    pub value: f64,
}

/// The tracked content of one line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineTokens {
    /// Words in source order.
    pub words: Vec<Word>,
    /// Last motion word on the line, if any.
    pub motion: Option<MotionMode>,
}

impl LineTokens {
    /// Axis words in source order.
    pub fn axis_words(&self) -> impl Iterator<Item = (Axis, f64)> + '_ {
        self.words.iter().filter_map(|w| match w.address {
            Address::Axis(axis) => Some((axis, w.value)),
            _ => None,
        })
    }

    /// Does the line carry any position word?
    pub fn has_axis_words(&self) -> bool {
        self.axis_words().next().is_some()
    }

    /// Does the line carry an `I`, `J` or `K` word?
    pub fn has_vector_words(&self) -> bool {
        self.axis_words().any(|(axis, _)| axis.is_vector())
    }

    /// Last feed word on the line.
    pub fn feed(&self) -> Option<f64> {
        self.last_of(Address::Feed)
    }

    /// Last radius word on the line.
    pub fn radius(&self) -> Option<f64> {
        self.last_of(Address::Radius)
    }

    fn last_of(&self, address: Address) -> Option<f64> {
        self.words
            .iter()
            .rev()
            .find(|w| w.address == address)
            .map(|w| w.value)
    }
}

/// Remove parenthesised comments and split into lines.
pub fn normalize(source: &str) -> Vec<String> {
    COMMENT_REGEX
        .replace_all(source, "")
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Tokenize one (comment-free) line.
pub fn tokenize(line: &str) -> LineTokens {
    let mut words = Vec::new();
    for caps in WORD_REGEX.captures_iter(line) {
        let Some(letter) = caps[1].chars().next() else {
            continue;
        };
        let Ok(value) = caps[2].parse::<f64>() else {
            continue;
        };
        let address = match letter.to_ascii_uppercase() {
            'F' => Address::Feed,
            'R' => Address::Radius,
            other => match Axis::from_letter(other) {
                Some(axis) => Address::Axis(axis),
                None => continue,
            },
        };
        words.push(Word { address, value });
    }

    LineTokens {
        words,
        motion: motion_word(line),
    }
}

/// Last motion word (`G0`..`G3`) on a line.
pub fn motion_word(line: &str) -> Option<MotionMode> {
    G_WORD_REGEX
        .captures_iter(line)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .filter_map(MotionMode::from_code)
        .last()
}
