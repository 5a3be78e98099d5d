//! Host-side machine that records every collaborator call
//!
//! Moves complete instantly. Probe moves walk the segment one mm1000 step
//! at a time and stop at the first point that touches a configured surface.

use std::collections::BTreeMap;

use millforge_core::units::mm_to_mm1000;
use millforge_core::{Axis, Feedrate, MachineError, MessageLevel, Mm1000, Positions, MAX_AXIS};
use millforge_settings::{MachineProfile, ProbeContact};
use serde::{Deserialize, Serialize};

use super::{
    Display, Feed, IoChannel, IoControl, KillSwitch, MachineConfig, MotionSink, ProbeInput,
    ToolTable,
};

/// One recorded motion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionCall {
    /// Absolute move
    Move { target: Positions, feed: Feed },
    /// Probe move and where it stopped
    Probe {
        target: Positions,
        feed: Feedrate,
        expected_level: bool,
        stopped_at: Positions,
        triggered: bool,
    },
    /// Dwell
    Wait { millis: u32 },
}

/// Surface that closes the probe contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSurface {
    pub axis: Axis,
    /// Contact while position <= below
    pub below: Option<Mm1000>,
    /// Contact while position >= above
    pub above: Option<Mm1000>,
}

impl ProbeSurface {
    fn touches(&self, positions: &Positions) -> bool {
        let value = positions[self.axis.index()];
        self.below.is_some_and(|below| value <= below)
            || self.above.is_some_and(|above| value >= above)
    }
}

impl From<&ProbeContact> for ProbeSurface {
    fn from(contact: &ProbeContact) -> Self {
        Self {
            axis: contact.axis,
            below: contact.below.map(mm_to_mm1000),
            above: contact.above.map(mm_to_mm1000),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct AxisState {
    min: Mm1000,
    max: Mm1000,
    backlash: Mm1000,
    acc: u32,
    dec: u32,
    jerk: u32,
    reference_at_max: bool,
}

/// Simulated machine implementing every collaborator trait
#[derive(Debug, Clone)]
pub struct SimulatedMachine {
    positions: Positions,
    axes: [AxisState; MAX_AXIS],
    backlash_feed: Feedrate,
    speed_override: u8,
    tools: BTreeMap<u16, Mm1000>,
    surfaces: Vec<ProbeSurface>,
    io: [u16; IoChannel::ALL.len()],
    motion_log: Vec<MotionCall>,
    output: Vec<(MessageLevel, String)>,
    beeps: Vec<(u32, u32)>,
    invalidations: usize,
    motion_dumps: usize,
    kill_requested: bool,
    killed: bool,
}

impl SimulatedMachine {
    /// Build a machine from a configuration profile
    pub fn new(profile: &MachineProfile) -> Self {
        let mut axes = [AxisState::default(); MAX_AXIS];
        for (state, axis) in axes.iter_mut().zip(&profile.axes) {
            *state = AxisState {
                min: mm_to_mm1000(axis.min),
                max: mm_to_mm1000(axis.max),
                backlash: mm_to_mm1000(axis.backlash),
                acc: axis.acc,
                dec: axis.dec,
                jerk: axis.jerk,
                reference_at_max: axis.reference_at_max,
            };
        }

        Self {
            positions: [0; MAX_AXIS],
            axes,
            backlash_feed: mm_to_mm1000(profile.backlash_feed),
            speed_override: 100,
            tools: profile
                .tools
                .iter()
                .map(|tool| (tool.id, mm_to_mm1000(tool.height)))
                .collect(),
            surfaces: profile.probe_contacts.iter().map(ProbeSurface::from).collect(),
            io: [0; IoChannel::ALL.len()],
            motion_log: Vec::new(),
            output: Vec::new(),
            beeps: Vec::new(),
            invalidations: 0,
            motion_dumps: 0,
            kill_requested: false,
            killed: false,
        }
    }

    /// Place the machine at `positions` without recording a move
    pub fn with_positions(mut self, positions: Positions) -> Self {
        self.positions = positions;
        self
    }

    pub fn set_positions(&mut self, positions: Positions) {
        self.positions = positions;
    }

    pub fn add_probe_surface(&mut self, surface: ProbeSurface) {
        self.surfaces.push(surface);
    }

    pub fn clear_probe_surfaces(&mut self) {
        self.surfaces.clear();
    }

    pub fn motion_log(&self) -> &[MotionCall] {
        &self.motion_log
    }

    pub fn take_motion_log(&mut self) -> Vec<MotionCall> {
        std::mem::take(&mut self.motion_log)
    }

    /// Targets of the recorded absolute moves, in order
    pub fn move_targets(&self) -> Vec<(Positions, Feed)> {
        self.motion_log
            .iter()
            .filter_map(|call| match call {
                MotionCall::Move { target, feed } => Some((*target, *feed)),
                _ => None,
            })
            .collect()
    }

    pub fn output(&self) -> &[(MessageLevel, String)] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<(MessageLevel, String)> {
        std::mem::take(&mut self.output)
    }

    pub fn beeps(&self) -> &[(u32, u32)] {
        &self.beeps
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations
    }

    pub fn motion_dumps(&self) -> usize {
        self.motion_dumps
    }

    /// Raise the external kill input
    pub fn request_kill(&mut self) {
        self.kill_requested = true;
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }
}

impl MotionSink for SimulatedMachine {
    fn move_abs(&mut self, target: &Positions, feed: Feed) -> Result<(), MachineError> {
        if self.killed {
            return Err(MachineError::Killed);
        }
        tracing::trace!(?target, ?feed, "simulated move");
        self.positions = *target;
        self.motion_log.push(MotionCall::Move {
            target: *target,
            feed,
        });
        Ok(())
    }

    fn probe_move(
        &mut self,
        target: &Positions,
        feed: Feedrate,
        expected_level: bool,
    ) -> Result<bool, MachineError> {
        if self.killed {
            return Err(MachineError::Killed);
        }

        let start = self.positions;
        let steps = start
            .iter()
            .zip(target)
            .map(|(from, to)| (i64::from(*to) - i64::from(*from)).abs())
            .max()
            .unwrap_or(0);

        let mut triggered = false;
        for step in 1..=steps {
            let mut pos = start;
            for (axis, value) in pos.iter_mut().enumerate() {
                let delta = i64::from(target[axis]) - i64::from(start[axis]);
                *value = (i64::from(start[axis]) + delta * step / steps) as Mm1000;
            }
            self.positions = pos;
            if self.probe_level() == expected_level {
                triggered = true;
                break;
            }
        }

        self.motion_log.push(MotionCall::Probe {
            target: *target,
            feed,
            expected_level,
            stopped_at: self.positions,
            triggered,
        });
        Ok(triggered)
    }

    fn wait(&mut self, millis: u32) -> Result<(), MachineError> {
        self.motion_log.push(MotionCall::Wait { millis });
        Ok(())
    }

    fn position(&self, axis: Axis) -> Mm1000 {
        self.positions[axis.index()]
    }

    fn positions(&self) -> Positions {
        self.positions
    }
}

impl MachineConfig for SimulatedMachine {
    fn limit_min(&self, axis: Axis) -> Mm1000 {
        self.axes[axis.index()].min
    }

    fn set_limit_min(&mut self, axis: Axis, value: Mm1000) {
        self.axes[axis.index()].min = value;
    }

    fn limit_max(&self, axis: Axis) -> Mm1000 {
        self.axes[axis.index()].max
    }

    fn set_limit_max(&mut self, axis: Axis, value: Mm1000) {
        self.axes[axis.index()].max = value;
    }

    fn backlash(&self, axis: Axis) -> Mm1000 {
        self.axes[axis.index()].backlash
    }

    fn set_backlash(&mut self, axis: Axis, value: Mm1000) {
        self.axes[axis.index()].backlash = value;
    }

    fn backlash_feed(&self) -> Feedrate {
        self.backlash_feed
    }

    fn set_backlash_feed(&mut self, value: Feedrate) {
        self.backlash_feed = value;
    }

    fn acc(&self, axis: Axis) -> u32 {
        self.axes[axis.index()].acc
    }

    fn set_acc(&mut self, axis: Axis, value: u32) {
        self.axes[axis.index()].acc = value;
    }

    fn dec(&self, axis: Axis) -> u32 {
        self.axes[axis.index()].dec
    }

    fn set_dec(&mut self, axis: Axis, value: u32) {
        self.axes[axis.index()].dec = value;
    }

    fn jerk(&self, axis: Axis) -> u32 {
        self.axes[axis.index()].jerk
    }

    fn set_jerk(&mut self, axis: Axis, value: u32) {
        self.axes[axis.index()].jerk = value;
    }

    fn is_reference_at_max(&self, axis: Axis) -> bool {
        self.axes[axis.index()].reference_at_max
    }

    fn speed_override(&self) -> u8 {
        self.speed_override
    }

    fn set_speed_override(&mut self, percent: u8) {
        self.speed_override = percent;
    }
}

impl ProbeInput for SimulatedMachine {
    fn probe_level(&self) -> bool {
        self.surfaces
            .iter()
            .any(|surface| surface.touches(&self.positions))
    }
}

impl ToolTable for SimulatedMachine {
    fn is_valid_tool(&self, tool: u16) -> bool {
        self.tools.contains_key(&tool)
    }

    fn tool_height(&self, tool: u16) -> Mm1000 {
        self.tools.get(&tool).copied().unwrap_or(0)
    }
}

impl IoControl for SimulatedMachine {
    fn io_level(&self, channel: IoChannel) -> u16 {
        self.io[channel.index()]
    }

    fn set_io_level(&mut self, channel: IoChannel, level: u16) -> Result<(), MachineError> {
        if self.killed && level != 0 {
            return Err(MachineError::Killed);
        }
        self.io[channel.index()] = level;
        Ok(())
    }
}

impl Display for SimulatedMachine {
    fn print(&mut self, level: MessageLevel, message: &str) {
        self.output.push((level, message.to_string()));
    }

    fn invalidate(&mut self) {
        self.invalidations += 1;
    }

    fn beep(&mut self, frequency: u32, duration_ms: u32) {
        self.beeps.push((frequency, duration_ms));
    }

    fn dump_motion_state(&mut self) {
        self.motion_dumps += 1;
        let text = format!("positions={:?}", self.positions);
        self.output.push((MessageLevel::Output, text));
    }
}

impl KillSwitch for SimulatedMachine {
    fn is_kill_requested(&self) -> bool {
        self.kill_requested
    }

    fn kill(&mut self) {
        tracing::error!("simulated machine killed");
        self.killed = true;
        self.kill_requested = false;
        self.io = [0; IoChannel::ALL.len()];
    }
}
