//! Host-side helpers

pub mod file_io;

pub use file_io::{read_statements, Flow, ProgramReader, ProgramStats};
