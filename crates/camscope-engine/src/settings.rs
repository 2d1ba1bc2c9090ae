//! Analysis settings.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Feed substituted for cutting moves when no `F` word has been declared (mm/min).
pub const DEFAULT_FEED: f64 = 1000.0;

/// Distances at or below this are stationary (mm).
pub const NEAR_ZERO: f64 = 1e-6;

/// A half-open length interval `[start, end)`; `end` may be `+inf`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinInterval {
    /// Inclusive lower bound (mm).
    pub start: f64,
    /// Exclusive upper bound (mm), `+inf` for the open last interval.
    #[serde(with = "open_bound")]
    pub end: f64,
}

impl BinInterval {
    /// Create an interval.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Is the upper bound infinite?
    pub fn is_open(&self) -> bool {
        self.end.is_infinite()
    }

    /// Does `value` fall inside the interval?
    pub fn contains(&self, value: f64) -> bool {
        value >= self.start && (self.is_open() || value < self.end)
    }
}

/// Parameters for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Ascending, contiguous partition of segment length; last interval open.
    pub intervals: Vec<BinInterval>,
    /// Feed used when none was declared (mm/min).
    pub default_feed: f64,
    /// Stationary threshold (mm).
    pub near_zero: f64,
    /// Lines between progress callbacks.
    pub progress_interval: usize,
    /// Ranked bins kept for detailed statistics.
    pub top_n: usize,
    /// Ranked bins kept for headline figures, between 1 and `top_n`.
    pub headline_n: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            intervals: default_intervals(),
            default_feed: DEFAULT_FEED,
            near_zero: NEAR_ZERO,
            progress_interval: 20_000,
            top_n: 10,
            headline_n: 3,
        }
    }
}

impl AnalysisSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        let Some(last) = self.intervals.last() else {
            return Err(EngineError::InvalidSettings(
                "at least one bin interval is required".into(),
            ));
        };
        if !last.is_open() {
            return Err(EngineError::InvalidSettings(
                "last bin interval must be open-ended".into(),
            ));
        }
        for (i, interval) in self.intervals.iter().enumerate() {
            if !interval.start.is_finite() || interval.start < 0.0 {
                return Err(EngineError::InvalidSettings(format!(
                    "bin {i} start must be a finite non-negative length"
                )));
            }
            if interval.end <= interval.start {
                return Err(EngineError::InvalidSettings(format!(
                    "bin {i} end must be greater than its start"
                )));
            }
            if interval.is_open() && i + 1 != self.intervals.len() {
                return Err(EngineError::InvalidSettings(format!(
                    "only the last bin may be open-ended (bin {i})"
                )));
            }
        }
        for (i, pair) in self.intervals.windows(2).enumerate() {
            if pair[0].end != pair[1].start {
                return Err(EngineError::InvalidSettings(format!(
                    "bins {i} and {} are not contiguous",
                    i + 1
                )));
            }
        }
        if !(self.default_feed.is_finite() && self.default_feed > 0.0) {
            return Err(EngineError::InvalidSettings(
                "default_feed must be positive".into(),
            ));
        }
        if self.near_zero.is_nan() || self.near_zero < 0.0 {
            return Err(EngineError::InvalidSettings(
                "near_zero must be non-negative".into(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(EngineError::InvalidSettings(
                "progress_interval must be at least 1".into(),
            ));
        }
        if self.top_n == 0 {
            return Err(EngineError::InvalidSettings("top_n must be at least 1".into()));
        }
        if self.headline_n == 0 || self.headline_n > self.top_n {
            return Err(EngineError::InvalidSettings(format!(
                "headline_n must be between 1 and top_n ({})",
                self.top_n
            )));
        }
        Ok(())
    }

    /// Index of the interval containing `value`, if any.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        let idx = self
            .intervals
            .partition_point(|interval| interval.start <= value)
            .checked_sub(1)?;
        self.intervals[idx].contains(value).then_some(idx)
    }
}

/// The stock partition: 0-1um, 1-10um, 10um steps to 0.1mm, 0.1mm steps to
/// 1mm, then open-ended.
pub fn default_intervals() -> Vec<BinInterval> {
    let mut edges = vec![0.0, 0.001];
    edges.extend((1..=10).map(|i| f64::from(i) / 100.0));
    edges.extend((2..=10).map(|i| f64::from(i) / 10.0));
    edges.push(f64::INFINITY);
    edges
        .windows(2)
        .map(|w| BinInterval::new(w[0], w[1]))
        .collect()
}

/// Serde helper: an infinite bound is written as `"inf"`.
mod open_bound {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(t) => match t.trim().to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
                other => other
                    .parse::<f64>()
                    .map_err(|_| D::Error::custom(format!("invalid bin bound: {t}"))),
            },
        }
    }
}
