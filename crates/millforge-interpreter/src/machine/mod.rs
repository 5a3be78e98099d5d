//! Collaborator contracts the interpreter drives
//!
//! The interpreter never talks to hardware directly. Every side effect goes
//! through one of the traits below; [`Machine`] bundles them so a single
//! value can be handed to the interpreter.

pub mod simulated;

use millforge_core::{Axis, Feedrate, MachineError, MessageLevel, Mm1000, Positions};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use simulated::{MotionCall, ProbeSurface, SimulatedMachine};

/// Feed of one absolute move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feed {
    /// Rapid positioning at the given rate
    Rapid(Feedrate),
    /// Working feed at the given rate
    Work(Feedrate),
}

impl Feed {
    /// Rate in mm1000 per minute
    pub fn rate(self) -> Feedrate {
        match self {
            Feed::Rapid(rate) | Feed::Work(rate) => rate,
        }
    }

    /// True for rapid moves
    pub fn is_rapid(self) -> bool {
        matches!(self, Feed::Rapid(_))
    }
}

/// Motion layer that executes absolute moves
pub trait MotionSink {
    /// Issue one linear move to absolute machine coordinates
    fn move_abs(&mut self, target: &Positions, feed: Feed) -> Result<(), MachineError>;

    /// Move toward `target` until the probe input reads `expected_level`
    ///
    /// Returns `true` when the transition was seen; the machine stops at the
    /// contact point. Returns `false` when the move completed without it.
    fn probe_move(
        &mut self,
        target: &Positions,
        feed: Feedrate,
        expected_level: bool,
    ) -> Result<bool, MachineError>;

    /// Dwell for the given number of milliseconds
    fn wait(&mut self, millis: u32) -> Result<(), MachineError>;

    /// Current absolute position of one axis
    fn position(&self, axis: Axis) -> Mm1000;

    /// Current absolute position of every axis
    fn positions(&self) -> Positions;
}

/// Per-axis machine configuration
pub trait MachineConfig {
    fn limit_min(&self, axis: Axis) -> Mm1000;
    fn set_limit_min(&mut self, axis: Axis, value: Mm1000);
    fn limit_max(&self, axis: Axis) -> Mm1000;
    fn set_limit_max(&mut self, axis: Axis, value: Mm1000);
    fn backlash(&self, axis: Axis) -> Mm1000;
    fn set_backlash(&mut self, axis: Axis, value: Mm1000);
    fn backlash_feed(&self) -> Feedrate;
    fn set_backlash_feed(&mut self, value: Feedrate);
    fn acc(&self, axis: Axis) -> u32;
    fn set_acc(&mut self, axis: Axis, value: u32);
    fn dec(&self, axis: Axis) -> u32;
    fn set_dec(&mut self, axis: Axis, value: u32);
    fn jerk(&self, axis: Axis) -> u32;
    fn set_jerk(&mut self, axis: Axis, value: u32);

    /// Reference switch of the axis sits at its upper limit
    fn is_reference_at_max(&self, axis: Axis) -> bool;

    /// Speed override in percent
    fn speed_override(&self) -> u8;
    fn set_speed_override(&mut self, percent: u8);
}

/// Live probe input
pub trait ProbeInput {
    /// Raw level of the probe pin
    fn probe_level(&self) -> bool;
}

/// Tool table
pub trait ToolTable {
    fn is_valid_tool(&self, tool: u16) -> bool;

    /// Height compensation of the tool, 0 when unknown
    fn tool_height(&self, tool: u16) -> Mm1000;
}

/// Generic IO channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoChannel {
    /// Spindle speed, 0 = off
    Spindle,
    /// Spindle direction, 0 = clockwise, 1 = counter-clockwise
    SpindleDir,
    /// Coolant, see [`COOLANT_OFF`], [`COOLANT_FLOOD`], [`COOLANT_MIST`]
    Coolant,
    /// Vacuum, 0 = off
    Vacuum,
    /// Controller fan level 0..255
    ControllerFan,
}

impl IoChannel {
    pub const ALL: [IoChannel; 5] = [
        IoChannel::Spindle,
        IoChannel::SpindleDir,
        IoChannel::Coolant,
        IoChannel::Vacuum,
        IoChannel::ControllerFan,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for IoChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IoChannel::Spindle => "spindle",
            IoChannel::SpindleDir => "spindle-dir",
            IoChannel::Coolant => "coolant",
            IoChannel::Vacuum => "vacuum",
            IoChannel::ControllerFan => "controller-fan",
        };
        write!(f, "{}", name)
    }
}

pub const COOLANT_OFF: u16 = 0;
pub const COOLANT_FLOOD: u16 = 1;
pub const COOLANT_MIST: u16 = 2;

/// IO control
pub trait IoControl {
    fn io_level(&self, channel: IoChannel) -> u16;
    fn set_io_level(&mut self, channel: IoChannel, level: u16) -> Result<(), MachineError>;
}

/// Output and diagnostics
pub trait Display {
    /// Show a message
    fn print(&mut self, level: MessageLevel, message: &str);

    /// Machine state changed, refresh any status view
    fn invalidate(&mut self);

    /// Play a tone
    fn beep(&mut self, frequency: u32, duration_ms: u32);

    /// Dump the motion engine state
    fn dump_motion_state(&mut self);
}

/// External kill input
pub trait KillSwitch {
    fn is_kill_requested(&self) -> bool;

    /// Force the machine into its safe state
    fn kill(&mut self);
}

/// Everything the interpreter needs from the machine
pub trait Machine:
    MotionSink + MachineConfig + ProbeInput + ToolTable + IoControl + Display + KillSwitch
{
}

impl<T> Machine for T where
    T: MotionSink + MachineConfig + ProbeInput + ToolTable + IoControl + Display + KillSwitch
{
}
