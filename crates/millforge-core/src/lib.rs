//! # Millforge Core
//!
//! Core value types shared by the Millforge crates.
//! Provides the fixed-point length model, the axis and plane model,
//! message levels and the error types for every layer.

pub mod data;
pub mod error;
pub mod units;

pub use data::{Axis, AxisSet, MessageLevel, Plane, Positions, MAX_AXIS, NUM_AXIS_XYZ};

pub use error::{Error, GcodeError, MachineError, Result};

pub use units::{Feedrate, MeasurementSystem, Mm1000};
