//! Unit conversion utilities
//!
//! All linear quantities inside the interpreter are fixed-point thousandths of
//! a millimetre ([`Mm1000`]). Values typed by the user are converted once, on
//! parse, from the active measurement system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed-point length in 1/1000 mm
pub type Mm1000 = i32;

/// Fixed-point feed rate in 1/1000 mm per minute
pub type Feedrate = i32;

/// Millimetres per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Measurement system (G21 / G20)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MeasurementSystem {
    /// Metric system (mm)
    #[default]
    #[serde(rename = "mm")]
    Metric,
    /// Imperial system (inches)
    #[serde(rename = "inch")]
    Imperial,
}

impl fmt::Display for MeasurementSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "Metric"),
            Self::Imperial => write!(f, "Imperial"),
        }
    }
}

impl FromStr for MeasurementSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "metric" | "mm" => Ok(Self::Metric),
            "imperial" | "inch" | "in" => Ok(Self::Imperial),
            _ => Err(format!("Unknown measurement system: {}", s)),
        }
    }
}

/// Convert a value typed in `system` units into [`Mm1000`]
pub fn to_mm1000(value: f64, system: MeasurementSystem) -> Mm1000 {
    let mm = match system {
        MeasurementSystem::Metric => value,
        MeasurementSystem::Imperial => value * MM_PER_INCH,
    };
    saturate(mm * 1000.0)
}

/// Convert a value in mm (no unit system applied) into [`Mm1000`]
pub fn mm_to_mm1000(mm: f64) -> Mm1000 {
    saturate(mm * 1000.0)
}

/// Convert [`Mm1000`] back to a floating point value in `system` units
pub fn from_mm1000(value: Mm1000, system: MeasurementSystem) -> f64 {
    let mm = f64::from(value) / 1000.0;
    match system {
        MeasurementSystem::Metric => mm,
        MeasurementSystem::Imperial => mm / MM_PER_INCH,
    }
}

/// Express a metric [`Mm1000`] in thousandths of the active system
///
/// Used for values shown to the user: in imperial mode the result is in
/// 1/1000 inch.
pub fn mm1000_in_system(value: Mm1000, system: MeasurementSystem) -> Mm1000 {
    match system {
        MeasurementSystem::Metric => value,
        MeasurementSystem::Imperial => saturate(f64::from(value) / MM_PER_INCH),
    }
}

/// Format a fixed-point value with `decimals` fractional digits
///
/// * `value` - Value in 1/1000 units
/// * `decimals` - Number of fractional digits (0..=3)
pub fn format_mm1000(value: Mm1000, decimals: usize) -> String {
    format!("{:.*}", decimals.min(3), f64::from(value) / 1000.0)
}

fn saturate(value: f64) -> Mm1000 {
    let rounded = value.round();
    if rounded >= f64::from(Mm1000::MAX) {
        Mm1000::MAX
    } else if rounded <= f64::from(Mm1000::MIN) {
        Mm1000::MIN
    } else {
        rounded as Mm1000
    }
}
