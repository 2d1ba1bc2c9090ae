//! Machine axes and the 9-component position vector.

use serde::{Deserialize, Serialize};

/// Number of tracked position components.
pub const AXIS_COUNT: usize = 9;

/// A tracked axis word, in fixed priority order.
///
/// `I`, `J`, `K` carry either the tool-axis direction (TCP programs) or the
/// arc-center offset (plain 3-axis arcs); the engine stores them the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    /// Linear X.
    X,
    /// Linear Y.
    Y,
    /// Linear Z.
    Z,
    /// Rotary / secondary A.
    A,
    /// Rotary / secondary B.
    B,
    /// Rotary / secondary C.
    C,
    /// Vector or arc-center I.
    I,
    /// Vector or arc-center J.
    J,
    /// Vector or arc-center K.
    K,
}

impl Axis {
    /// All axes in priority order.
    pub const ALL: [Axis; AXIS_COUNT] = [
        Axis::X,
        Axis::Y,
        Axis::Z,
        Axis::A,
        Axis::B,
        Axis::C,
        Axis::I,
        Axis::J,
        Axis::K,
    ];

    /// Column index of this axis in a position row.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Axis for a column index.
    pub fn from_index(index: usize) -> Option<Axis> {
        Self::ALL.get(index).copied()
    }

    /// Axis for a word letter (case-insensitive).
    pub fn from_letter(letter: char) -> Option<Axis> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            'A' => Some(Axis::A),
            'B' => Some(Axis::B),
            'C' => Some(Axis::C),
            'I' => Some(Axis::I),
            'J' => Some(Axis::J),
            'K' => Some(Axis::K),
            _ => None,
        }
    }

    /// Upper-case word letter.
    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::A => 'A',
            Axis::B => 'B',
            Axis::C => 'C',
            Axis::I => 'I',
            Axis::J => 'J',
            Axis::K => 'K',
        }
    }

    /// Is this one of the tool-vector components?
    pub fn is_vector(self) -> bool {
        matches!(self, Axis::I | Axis::J | Axis::K)
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A fully resolved 9-component position: X,Y,Z, A,B,C, I,J,K.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisVector(pub [f64; AXIS_COUNT]);

impl AxisVector {
    /// Machine-home state: all zero, tool axis along +Z.
    pub const HOME: AxisVector = AxisVector([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);

    /// Component for an axis.
    pub fn get(&self, axis: Axis) -> f64 {
        self.0[axis.index()]
    }

    /// Linear position.
    pub fn xyz(&self) -> [f64; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Secondary linear / rotary position.
    pub fn abc(&self) -> [f64; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    /// Tool-axis (or arc-center) components.
    pub fn ijk(&self) -> [f64; 3] {
        [self.0[6], self.0[7], self.0[8]]
    }
}

impl Default for AxisVector {
    fn default() -> Self {
        Self::HOME
    }
}

impl std::ops::Index<Axis> for AxisVector {
    type Output = f64;

    fn index(&self, axis: Axis) -> &f64 {
        &self.0[axis.index()]
    }
}

/// Euclidean norm of a 3-vector.
pub fn norm3(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Component-wise difference `b - a`.
pub fn sub3(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [b[0] - a[0], b[1] - a[1], b[2] - a[2]]
}
