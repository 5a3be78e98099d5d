//! # Millforge Interpreter
//!
//! G-code interpreter and modal-state engine for small CNC controllers.
//! Parses one statement at a time and drives a [`machine::Machine`] through
//! its collaborator traits. Includes the parameter table, the expression
//! evaluator, coordinate rotation, drilling cycles, probing and a simulated
//! machine for host-side runs and tests.

pub mod gcode;
pub mod machine;
pub mod params;
pub mod utils;

pub use gcode::{
    CoordinateMode, Dispatch, DrillCycle, Interpreter, ModalState, MotionControl,
    RepeatableCommand, StreamReader,
};

pub use machine::{
    Display, Feed, IoChannel, IoControl, KillSwitch, Machine, MachineConfig, MotionCall,
    MotionSink, ProbeInput, ProbeSurface, SimulatedMachine, ToolTable,
};

pub use params::{
    lookup_key, lookup_name, ParamAccess, ParamInfo, ParamKind, TableScope, PARAM_TABLE,
};

pub use utils::{read_statements, Flow, ProgramReader, ProgramStats};
