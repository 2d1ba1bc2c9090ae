//! Sparse accumulation and dense position reconstruction.
//!
//! Most lines touch one to three of the nine axes, so the parser records
//! `(line, axis, value)` triples. [`PositionTable::reconstruct`] scatters
//! them into a `(lines + 1) x 9` table and forward-fills every column so
//! each row is a complete position. Row 0 is machine home.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::axis::{Axis, AxisVector, AXIS_COUNT};

/// One explicit axis value on one line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseEntry {
    /// 1-based line index.
    pub line: usize,
    /// Axis written.
    pub axis: Axis,
    /// Value written.
    pub value: f64,
}

/// Growable buffer of sparse axis writes, in line order.
#[derive(Debug, Clone, Default)]
pub struct SparseAccumulator {
    entries: Vec<SparseEntry>,
}

impl SparseAccumulator {
    /// Create a buffer sized for `lines` lines at roughly three words each.
    pub fn with_line_capacity(lines: usize) -> Self {
        Self {
            entries: Vec::with_capacity(lines.saturating_mul(3)),
        }
    }

    /// Record an explicit axis value.
    pub fn push(&mut self, line: usize, axis: Axis, value: f64) {
        self.entries.push(SparseEntry { line, axis, value });
    }

    /// Number of recorded values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded values.
    pub fn entries(&self) -> &[SparseEntry] {
        &self.entries
    }
}

/// Dense per-line positions, row 0 = home, row `i` = position after line `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTable {
    rows: Vec<AxisVector>,
}

impl PositionTable {
    /// Build the forward-filled table for `line_count` lines.
    ///
    /// Later writes to the same axis on the same line win. Entries past
    /// `line_count` are ignored.
    pub fn reconstruct(sparse: &SparseAccumulator, line_count: usize) -> Self {
        let row_count = line_count + 1;
        let home = AxisVector::HOME.0;

        let mut explicit: Vec<[Option<f64>; AXIS_COUNT]> = vec![[None; AXIS_COUNT]; row_count];
        explicit[0] = home.map(Some);
        for entry in sparse.entries() {
            if entry.line == 0 || entry.line > line_count {
                continue;
            }
            explicit[entry.line][entry.axis.index()] = Some(entry.value);
        }

        // Last-known-value source row per column: a running maximum of the
        // rows that carry an explicit value. Sequential by nature.
        let mut source: Vec<[usize; AXIS_COUNT]> = vec![[0; AXIS_COUNT]; row_count];
        let mut last = [0usize; AXIS_COUNT];
        for (row, values) in explicit.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                if value.is_some() {
                    last[col] = row;
                }
            }
            source[row] = last;
        }

        let rows = source
            .par_iter()
            .map(|src| {
                AxisVector(std::array::from_fn(|col| {
                    explicit[src[col]][col].unwrap_or(home[col])
                }))
            })
            .collect();

        Self { rows }
    }

    /// Number of rows (lines + 1).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of program lines covered.
    pub fn line_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Position after line `index` (0 = home).
    pub fn row(&self, index: usize) -> Option<&AxisVector> {
        self.rows.get(index)
    }

    /// All rows.
    pub fn rows(&self) -> &[AxisVector] {
        &self.rows
    }

    /// Axes whose column is non-zero somewhere, in priority order.
    ///
    /// K starts at 1 in the home row, so it is always reported.
    pub fn axes_used(&self) -> Vec<Axis> {
        Axis::ALL
            .into_iter()
            .filter(|&axis| self.rows.iter().any(|row| row[axis] != 0.0))
            .collect()
    }
}
