//! Per-segment distance and tool-axis angle.
//!
//! Distance depends on the motion mode:
//! - `G00`: XYZ Euclidean norm; rotary and vector axes are ignored.
//! - `G01`: six-axis (XYZABC) norm, or in TCP mode the compound
//!   `sqrt(d_xyz^2 + angle_deg^2)`, where degrees are counted one-for-one
//!   with millimetres as a single motion-cost figure.
//! - `G02`/`G03`: arc length from the chord and the declared radius, or the
//!   chord itself when the radius is missing or shorter than half the chord.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::axis::{norm3, sub3, AxisVector};
use crate::modal::MotionMode;

/// Why an arc fell back to its chord length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArcFallback {
    /// No `R` word on the line.
    MissingRadius,
    /// Chord longer than the diameter `2|R|`.
    InvalidRadius(f64),
}

/// Which formula produced a segment's distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Formula {
    /// XYZ norm for rapids.
    Rapid,
    /// Six-axis XYZABC norm.
    Euclidean,
    /// XYZ fused with tool-axis rotation.
    TcpCompound,
    /// Arc length from a valid radius.
    ArcLength,
    /// Chord length standing in for an arc.
    Chord(ArcFallback),
}

/// Geometry of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    /// XYZ displacement.
    pub xyz: f64,
    /// Tool-axis angular deviation in degrees.
    pub angle_deg: f64,
    /// Mode-dependent distance.
    pub distance: f64,
    /// Formula used for `distance`.
    pub formula: Formula,
}

/// Measure the move from `start` to `end`.
///
/// `tcp` selects the compound formula for linear moves; `radius` is the `R`
/// word declared on the line, if any.
pub fn measure(
    start: &AxisVector,
    end: &AxisVector,
    mode: MotionMode,
    tcp: bool,
    radius: Option<f64>,
) -> Kinematics {
    let xyz = norm3(sub3(start.xyz(), end.xyz()));
    let angle_deg = tool_axis_angle(start.ijk(), end.ijk());

    let (distance, formula) = match mode {
        MotionMode::Rapid => (xyz, Formula::Rapid),
        MotionMode::Linear if tcp => (
            (xyz * xyz + angle_deg * angle_deg).sqrt(),
            Formula::TcpCompound,
        ),
        MotionMode::Linear => {
            let abc = norm3(sub3(start.abc(), end.abc()));
            ((xyz * xyz + abc * abc).sqrt(), Formula::Euclidean)
        }
        MotionMode::ArcCw | MotionMode::ArcCcw => match radius {
            None => (xyz, Formula::Chord(ArcFallback::MissingRadius)),
            Some(r) => match arc_length(xyz, r) {
                Some(len) => (len, Formula::ArcLength),
                None => (xyz, Formula::Chord(ArcFallback::InvalidRadius(r))),
            },
        },
    };

    Kinematics {
        xyz,
        angle_deg,
        distance,
        formula,
    }
}

/// Relative slack on the diameter check. Coordinates rounded to a few
/// decimals put an exact half circle's chord a few ULPs past `2R`.
const DIAMETER_TOLERANCE: f64 = 1e-9;

/// Arc length for a chord and signed radius, `None` if the chord exceeds
/// the diameter.
///
/// A negative radius selects the reflex arc (`2*pi - theta`).
pub fn arc_length(chord: f64, radius: f64) -> Option<f64> {
    let r = radius.abs();
    if r == 0.0 || chord > 2.0 * r * (1.0 + DIAMETER_TOLERANCE) {
        return None;
    }
    let ratio = (chord / (2.0 * r)).min(1.0);
    let theta = 2.0 * ratio.asin();
    let sweep = if radius < 0.0 { 2.0 * PI - theta } else { theta };
    Some(r * sweep)
}

/// Angle in degrees between two tool-axis vectors.
///
/// A zero-length vector is used as-is rather than normalized.
pub fn tool_axis_angle(v1: [f64; 3], v2: [f64; 3]) -> f64 {
    let a = unit_or_self(v1);
    let b = unit_or_self(v2);
    let dot = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]).clamp(-1.0, 1.0);
    dot.acos().to_degrees()
}

fn unit_or_self(v: [f64; 3]) -> [f64; 3] {
    let n = norm3(v);
    if n == 0.0 {
        v
    } else {
        [v[0] / n, v[1] / n, v[2] / n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pos(values: [f64; 9]) -> AxisVector {
        AxisVector(values)
    }

    #[test]
    fn test_rapid_ignores_rotary() {
        let a = AxisVector::HOME;
        let b = pos([3.0, 4.0, 0.0, 90.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let k = measure(&a, &b, MotionMode::Rapid, false, None);
        assert_relative_eq!(k.distance, 5.0);
        assert_eq!(k.formula, Formula::Rapid);
    }

    #[test]
    fn test_linear_six_axis_norm() {
        let a = AxisVector::HOME;
        let b = pos([3.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let k = measure(&a, &b, MotionMode::Linear, false, None);
        assert_relative_eq!(k.xyz, 3.0);
        assert_relative_eq!(k.distance, 5.0);
        assert_eq!(k.formula, Formula::Euclidean);
    }

    #[test]
    fn test_tcp_compound_distance() {
        let a = AxisVector::HOME;
        let b = pos([10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let k = measure(&a, &b, MotionMode::Linear, true, None);
        assert_relative_eq!(k.angle_deg, 90.0, epsilon = 1e-9);
        assert_relative_eq!(k.distance, (100.0f64 + 8100.0).sqrt(), epsilon = 1e-9);
        assert_eq!(k.formula, Formula::TcpCompound);
    }

    #[test]
    fn test_tcp_identical_vectors() {
        let a = pos([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let b = pos([10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let k = measure(&a, &b, MotionMode::Linear, true, None);
        assert_relative_eq!(k.angle_deg, 0.0);
        assert_relative_eq!(k.distance, 10.0);
    }

    #[test]
    fn test_angle_ignores_vector_length() {
        assert_relative_eq!(tool_axis_angle([0.0, 0.0, 5.0], [0.0, 0.0, 0.2]), 0.0);
        assert_relative_eq!(tool_axis_angle([0.0, 0.0, 1.0], [0.0, 0.0, -3.0]), 180.0);
    }

    #[test]
    fn test_zero_vector_does_not_divide_by_zero() {
        let angle = tool_axis_angle([0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        assert!(angle.is_finite());
        assert_relative_eq!(angle, 90.0);
    }

    #[test]
    fn test_arc_half_circle_boundary() {
        let len = arc_length(10.0, 5.0).unwrap();
        assert_relative_eq!(len, 5.0 * PI, epsilon = 1e-9);
    }

    #[test]
    fn test_arc_rounding_past_diameter_is_half_circle() {
        let chord = norm3(sub3([0.013, 0.007, 0.0], [0.913, 1.207, 0.0]));
        assert!(chord >= 1.5);
        let len = arc_length(chord, 0.75).unwrap();
        assert_relative_eq!(len, 0.75 * PI, epsilon = 1e-12);
        assert_eq!(arc_length(1.5 * (1.0 + 1e-6), 0.75), None);
    }

    #[test]
    fn test_arc_negative_radius_takes_reflex() {
        let short = arc_length(5.0, 5.0).unwrap();
        let long = arc_length(5.0, -5.0).unwrap();
        assert_relative_eq!(short + long, 2.0 * PI * 5.0, epsilon = 1e-9);
        assert!(long > short);
    }

    #[test]
    fn test_arc_invalid_radius_falls_back() {
        let a = AxisVector::HOME;
        let b = pos([10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let k = measure(&a, &b, MotionMode::ArcCw, false, Some(4.0));
        assert_relative_eq!(k.distance, 10.0);
        assert_eq!(k.formula, Formula::Chord(ArcFallback::InvalidRadius(4.0)));
    }

    #[test]
    fn test_arc_missing_radius_falls_back() {
        let a = AxisVector::HOME;
        let b = pos([6.0, 8.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let k = measure(&a, &b, MotionMode::ArcCcw, false, None);
        assert_relative_eq!(k.distance, 10.0);
        assert_eq!(k.formula, Formula::Chord(ArcFallback::MissingRadius));
    }

    #[test]
    fn test_zero_radius_is_invalid() {
        assert_eq!(arc_length(0.0, 0.0), None);
    }
}
