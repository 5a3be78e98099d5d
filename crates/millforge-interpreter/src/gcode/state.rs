//! Modal and modeless interpreter state
//!
//! [`ModalState`] persists from one statement to the next until a command
//! changes it. [`ModelessState`] is rebuilt at the start of every statement
//! and never leaks into the next one.

use millforge_core::units::{mm_to_mm1000, MeasurementSystem};
use millforge_core::{Feedrate, Mm1000, Plane, Positions, MAX_AXIS};
use millforge_settings::InterpreterConfig;
use serde::{Deserialize, Serialize};

/// Drilling cycle variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrillCycle {
    /// G73 high-speed peck: short retract between pecks
    G73,
    /// G81 plain drill
    G81,
    /// G82 drill with dwell at the bottom
    G82,
    /// G83 peck drill, full retract between pecks
    G83,
}

impl DrillCycle {
    /// Dwell word P is read
    pub fn uses_p(self) -> bool {
        matches!(self, DrillCycle::G82)
    }

    /// Peck word Q is read
    pub fn uses_q(self) -> bool {
        matches!(self, DrillCycle::G73 | DrillCycle::G83)
    }

    /// Retract by the short peck retraction instead of to R between pecks
    pub fn uses_min_retract(self) -> bool {
        matches!(self, DrillCycle::G73)
    }

    pub fn gcode(self) -> u8 {
        match self {
            DrillCycle::G73 => 73,
            DrillCycle::G81 => 81,
            DrillCycle::G82 => 82,
            DrillCycle::G83 => 83,
        }
    }
}

/// Command re-invoked by a statement that holds only axis words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatableCommand {
    #[default]
    None,
    Rapid,
    Linear,
    Drill(DrillCycle),
}

/// Drilling parameters remembered between cycle statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrillParams {
    /// Retract plane (machine through-axis coordinate)
    pub r: Option<Mm1000>,
    /// Hole bottom (machine through-axis coordinate)
    pub bottom: Option<Mm1000>,
    /// Dwell in milliseconds
    pub p: u32,
    /// Peck increment
    pub q: Mm1000,
}

/// Result of the last probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub ok: bool,
    /// Valid only when `ok` is set
    pub positions: Positions,
}

/// Long-lived machine mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalState {
    /// Active coordinate system, 1 = G54; 0 = none
    pub coord_index: u8,
    pub plane: Plane,
    /// G90 when set, G91 otherwise
    pub absolute: bool,
    pub units: MeasurementSystem,
    pub probe_on_value: bool,
    /// Tool length compensation on the through-axis
    pub tool_height: Mm1000,
    pub rapid_feed: Feedrate,
    pub work_feed: Feedrate,
    /// General-purpose registers, `#1` is index 0
    pub registers: Vec<f64>,
    /// Work offsets, index 0 is G54
    pub work_offsets: Vec<Positions>,
    /// G92 preset per axis
    pub g92_preset: Positions,
    pub repeatable: RepeatableCommand,
    pub drill: DrillParams,
    /// G98 when set, G99 otherwise
    pub return_to_initial_level: bool,
    /// Retraction between G73 pecks
    pub peck_retraction: Mm1000,
    pub line_number: u32,
    pub debug_level: u8,
    /// Selected tool (T word)
    pub tool: u16,
    /// Spindle speed (S word)
    pub spindle_speed: u16,
    pub last_probe: ProbeRecord,
}

impl ModalState {
    pub fn new(config: &InterpreterConfig) -> Self {
        Self {
            coord_index: 1,
            plane: Plane::XY,
            absolute: true,
            units: config.default_units,
            probe_on_value: config.probe_on_value,
            tool_height: 0,
            rapid_feed: mm_to_mm1000(config.rapid_feed),
            work_feed: mm_to_mm1000(config.work_feed),
            registers: vec![0.0; usize::from(config.parameter_count)],
            work_offsets: vec![[0; MAX_AXIS]; usize::from(config.work_offset_count)],
            g92_preset: [0; MAX_AXIS],
            repeatable: RepeatableCommand::None,
            drill: DrillParams::default(),
            return_to_initial_level: config.return_to_initial_level,
            peck_retraction: mm_to_mm1000(config.peck_retraction),
            line_number: 0,
            debug_level: 0,
            tool: 0,
            spindle_speed: 0,
            last_probe: ProbeRecord::default(),
        }
    }

    /// Work offset of a 1-based coordinate system index, zero for index 0
    pub fn work_offset(&self, index: u8, axis: usize) -> Mm1000 {
        match index {
            0 => 0,
            n => self
                .work_offsets
                .get(usize::from(n) - 1)
                .map_or(0, |offset| offset[axis]),
        }
    }
}

/// Canned-cycle words read in the current statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrillWords {
    pub r: Option<Mm1000>,
    pub p: Option<u32>,
    pub q: Option<Mm1000>,
    pub l: Option<u8>,
}

/// Per-statement scratch state
#[derive(Debug, Clone, PartialEq)]
pub struct ModelessState {
    /// Coordinate system for this statement; G53 sets 0
    pub zero_preset_index: u8,
    pub drill: DrillWords,
    /// A probe ran in this statement
    pub probe_attempted: bool,
    pub probe: ProbeRecord,
}

impl ModelessState {
    /// Fresh scratch state for a statement run under `modal`
    pub fn begin(modal: &ModalState) -> Self {
        Self {
            zero_preset_index: modal.coord_index,
            drill: DrillWords::default(),
            probe_attempted: false,
            probe: ProbeRecord {
                ok: false,
                positions: modal.last_probe.positions,
            },
        }
    }
}
