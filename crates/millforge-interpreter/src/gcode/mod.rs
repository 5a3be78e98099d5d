//! G-code interpreter
//!
//! This module provides:
//! - The statement reader
//! - Modal and modeless state
//! - Letter and code dispatch
//! - Coordinate pipeline and rotation
//! - Drilling cycles and probing

pub mod canned;
pub mod command;
pub mod motion;
pub mod parser;
pub mod probe;
pub mod processors;
pub mod rotation;
pub mod state;
pub mod stream;

pub use command::{AxisMove, CoordinateMode};
pub use motion::{MotionControl, VectorRotation};
pub use parser::{Dispatch, Interpreter};
pub use state::{
    DrillCycle, DrillParams, ModalState, ModelessState, ProbeRecord, RepeatableCommand,
};
pub use stream::{StreamReader, NO_SUB_CODE};
