//! Millforge Settings Crate
//!
//! Handles interpreter configuration and the machine profile used by the
//! simulated machine, stored as TOML or JSON.

pub mod config;
pub mod error;

pub use config::{
    AxisProfile, Config, InterpreterConfig, MachineProfile, MeasurementSystem, ProbeContact,
    ToolEntry,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
