//! Data models for axes, positions, planes and messages
//!
//! This module provides:
//! - The fixed axis sequence (X, Y, Z, A, B, C)
//! - Per-axis position arrays and axis bitsets
//! - Plane selection with in-plane and through axes
//! - Message levels for display output

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::Mm1000;

/// Largest axis count a build can configure
pub const MAX_AXIS: usize = 6;

/// Number of axes that take part in rotation (X, Y, Z)
pub const NUM_AXIS_XYZ: usize = 3;

/// One absolute coordinate per axis
pub type Positions = [Mm1000; MAX_AXIS];

/// Machine axis, in command-surface order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    /// X-axis
    X = 0,
    /// Y-axis
    Y = 1,
    /// Z-axis
    Z = 2,
    /// A-axis (4th axis)
    A = 3,
    /// B-axis (5th axis)
    B = 4,
    /// C-axis (6th axis)
    C = 5,
}

impl Axis {
    /// All axes in index order
    pub const ALL: [Axis; MAX_AXIS] = [Axis::X, Axis::Y, Axis::Z, Axis::A, Axis::B, Axis::C];

    /// Zero-based array index of the axis
    pub fn index(self) -> usize {
        self as usize
    }

    /// Axis for a command letter (case-insensitive)
    pub fn from_letter(letter: char) -> Option<Axis> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            'A' => Some(Axis::A),
            'B' => Some(Axis::B),
            'C' => Some(Axis::C),
            _ => None,
        }
    }

    /// Axis for an I/J/K offset letter (X, Y, Z only)
    pub fn from_offset_letter(letter: char) -> Option<Axis> {
        match letter.to_ascii_uppercase() {
            'I' => Some(Axis::X),
            'J' => Some(Axis::Y),
            'K' => Some(Axis::Z),
            _ => None,
        }
    }

    /// Command letter of the axis
    pub fn letter(self) -> char {
        ['X', 'Y', 'Z', 'A', 'B', 'C'][self.index()]
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Set of axes stored as a bitfield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisSet(u8);

impl AxisSet {
    /// Empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Add an axis
    pub fn insert(&mut self, axis: Axis) {
        self.0 |= 1 << axis.index();
    }

    /// Check membership
    pub fn contains(self, axis: Axis) -> bool {
        self.0 & (1 << axis.index()) != 0
    }

    /// True when no axis is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in ascending axis order
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |axis| self.contains(*axis))
    }

    /// Raw bits
    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Plane selection (G17, G18, G19)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Plane {
    /// G17: X/Y plane, Z through
    #[default]
    XY,
    /// G18: Z/X plane, Y through
    ZX,
    /// G19: Y/Z plane, X through
    YZ,
}

impl Plane {
    /// First in-plane axis
    pub fn axis0(self) -> Axis {
        match self {
            Plane::XY => Axis::X,
            Plane::ZX => Axis::Z,
            Plane::YZ => Axis::Y,
        }
    }

    /// Second in-plane axis
    pub fn axis1(self) -> Axis {
        match self {
            Plane::XY => Axis::Y,
            Plane::ZX => Axis::X,
            Plane::YZ => Axis::Z,
        }
    }

    /// Axis perpendicular to the plane
    pub fn through_axis(self) -> Axis {
        match self {
            Plane::XY => Axis::Z,
            Plane::ZX => Axis::Y,
            Plane::YZ => Axis::X,
        }
    }

    /// G-code that selects the plane
    pub fn gcode(self) -> u8 {
        match self {
            Plane::XY => 17,
            Plane::ZX => 18,
            Plane::YZ => 19,
        }
    }
}

/// Severity of a message sent to the display collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageLevel {
    /// Plain output (parameter dumps, position reports, MSG comments)
    Output,
    /// Advisory; the statement continues
    Info,
    /// The statement was aborted
    Error,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageLevel::Output => write!(f, "output"),
            MessageLevel::Info => write!(f, "info"),
            MessageLevel::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_letters() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_letter(axis.letter()), Some(axis));
            assert_eq!(Axis::from_letter(axis.letter().to_ascii_lowercase()), Some(axis));
        }
        assert_eq!(Axis::from_letter('Q'), None);
        assert_eq!(Axis::from_offset_letter('k'), Some(Axis::Z));
    }

    #[test]
    fn test_axis_set_iterates_ascending() {
        let mut set = AxisSet::empty();
        set.insert(Axis::Z);
        set.insert(Axis::X);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Axis::X, Axis::Z]);
        assert!(!set.contains(Axis::Y));
    }

    #[test]
    fn test_plane_axes() {
        assert_eq!(Plane::XY.through_axis(), Axis::Z);
        assert_eq!(Plane::ZX.through_axis(), Axis::Y);
        assert_eq!(Plane::YZ.through_axis(), Axis::X);
        assert_eq!(Plane::ZX.axis0(), Axis::Z);
        assert_eq!(Plane::YZ.gcode(), 19);
    }
}
