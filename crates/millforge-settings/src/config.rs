//! Configuration management for Millforge
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats, selected by file extension.
//!
//! Configuration is organized into two sections:
//! - Interpreter settings (axis count, offsets, registers, feeds, polarity)
//! - Machine profile (limits, dynamics, tools, probe contacts) used by the
//!   simulated machine

pub use millforge_core::units::MeasurementSystem;
use millforge_core::{Axis, MAX_AXIS};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

/// Interpreter settings fixed for the lifetime of an interpreter instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Number of configured axes (3..=6, letters X Y Z A B C)
    pub axis_count: usize,
    /// Number of work offsets (G54 .. G54+n-1)
    pub work_offset_count: u8,
    /// Number of general-purpose parameter registers (#1 .. #n)
    pub parameter_count: u16,
    /// Retraction between pecks of the high-speed peck cycle (mm)
    pub peck_retraction: f64,
    /// Rapid feed rate (mm/min)
    pub rapid_feed: f64,
    /// Working feed rate until the first F word (mm/min)
    pub work_feed: f64,
    /// Probe input level that means "triggered"
    pub probe_on_value: bool,
    /// Start in G98 (return to initial level) instead of G99
    #[serde(default)]
    pub return_to_initial_level: bool,
    /// Units in effect at startup
    #[serde(default)]
    pub default_units: MeasurementSystem,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            axis_count: 3,
            work_offset_count: 6,
            parameter_count: 50,
            peck_retraction: 0.2,
            rapid_feed: 5000.0,
            work_feed: 100.0,
            probe_on_value: true,
            return_to_initial_level: false,
            default_units: MeasurementSystem::Metric,
        }
    }
}

impl InterpreterConfig {
    /// Config with the given axis count and defaults otherwise
    pub fn with_axes(axis_count: usize) -> Self {
        Self {
            axis_count,
            ..Self::default()
        }
    }

    /// Validate interpreter settings
    pub fn validate(&self) -> ConfigResult<()> {
        if !(3..=MAX_AXIS).contains(&self.axis_count) {
            return Err(out_of_range("interpreter.axis_count", self.axis_count));
        }
        if !(1..=6).contains(&self.work_offset_count) {
            return Err(out_of_range(
                "interpreter.work_offset_count",
                self.work_offset_count,
            ));
        }
        if !(1..=255).contains(&self.parameter_count) {
            return Err(out_of_range(
                "interpreter.parameter_count",
                self.parameter_count,
            ));
        }
        if self.peck_retraction < 0.0 {
            return Err(out_of_range(
                "interpreter.peck_retraction",
                self.peck_retraction,
            ));
        }
        if self.rapid_feed <= 0.0 {
            return Err(out_of_range("interpreter.rapid_feed", self.rapid_feed));
        }
        if self.work_feed <= 0.0 {
            return Err(out_of_range("interpreter.work_feed", self.work_feed));
        }
        Ok(())
    }
}

/// Limits and dynamics of one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisProfile {
    /// Lower travel limit (mm)
    pub min: f64,
    /// Upper travel limit (mm)
    pub max: f64,
    /// Backlash compensation (mm)
    #[serde(default)]
    pub backlash: f64,
    /// Acceleration (steps/s²)
    pub acc: u32,
    /// Deceleration (steps/s²)
    pub dec: u32,
    /// Jerk speed (steps/s)
    pub jerk: u32,
    /// Reference switch sits at the upper limit
    #[serde(default)]
    pub reference_at_max: bool,
}

impl Default for AxisProfile {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 200.0,
            backlash: 0.0,
            acc: 350,
            dec: 400,
            jerk: 1000,
            reference_at_max: false,
        }
    }
}

/// Tool table entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Tool id used by T and G43 H
    pub id: u16,
    /// Tool height compensation (mm)
    pub height: f64,
}

/// Surface that triggers the simulated probe
///
/// The probe reads "on" while the axis position is at or below `below`, or
/// at or above `above`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeContact {
    /// Axis the surface is perpendicular to
    pub axis: Axis,
    /// Contact when position <= below (mm)
    #[serde(default)]
    pub below: Option<f64>,
    /// Contact when position >= above (mm)
    #[serde(default)]
    pub above: Option<f64>,
}

/// Machine profile used by the simulated machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineProfile {
    /// Per-axis profile, index order X Y Z A B C
    pub axes: Vec<AxisProfile>,
    /// Backlash feed rate (mm/min)
    pub backlash_feed: f64,
    /// Tool table
    #[serde(default)]
    pub tools: Vec<ToolEntry>,
    /// Probe contact surfaces
    #[serde(default)]
    pub probe_contacts: Vec<ProbeContact>,
}

impl Default for MachineProfile {
    fn default() -> Self {
        let mut z = AxisProfile {
            min: -100.0,
            max: 0.0,
            reference_at_max: true,
            ..AxisProfile::default()
        };
        z.jerk = 800;

        Self {
            axes: vec![AxisProfile::default(), AxisProfile::default(), z],
            backlash_feed: 500.0,
            tools: vec![
                ToolEntry {
                    id: 1,
                    height: 10.0,
                },
                ToolEntry {
                    id: 2,
                    height: 25.5,
                },
            ],
            probe_contacts: Vec::new(),
        }
    }
}

impl MachineProfile {
    /// Validate the profile against the interpreter's axis count
    pub fn validate(&self, axis_count: usize) -> ConfigResult<()> {
        if self.axes.len() < axis_count {
            return Err(ConfigError::Inconsistent(format!(
                "machine profile lists {} axes, interpreter needs {}",
                self.axes.len(),
                axis_count
            )));
        }
        for (index, axis) in self.axes.iter().enumerate() {
            if axis.min > axis.max {
                return Err(ConfigError::Inconsistent(format!(
                    "axis {} min {} > max {}",
                    index, axis.min, axis.max
                )));
            }
        }
        if self.backlash_feed < 0.0 {
            return Err(out_of_range("machine.backlash_feed", self.backlash_feed));
        }
        Ok(())
    }
}

/// Complete configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Interpreter settings
    pub interpreter: InterpreterConfig,
    /// Machine profile
    #[serde(default)]
    pub machine: MachineProfile,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            return Err(unsupported_format(path).into());
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)?
        } else {
            return Err(unsupported_format(path).into());
        };

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.interpreter.validate()?;
        self.machine.validate(self.interpreter.axis_count)
    }
}

fn out_of_range(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn unsupported_format(path: &Path) -> ConfigError {
    ConfigError::UnsupportedFormat(
        path.extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<none>".to_string()),
    )
}
