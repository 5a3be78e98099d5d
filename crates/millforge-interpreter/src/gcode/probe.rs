//! Probing: G31, G38.2 / G38.4 and the center-finding G38.12 / G38.14

use millforge_core::{GcodeError, Mm1000, Positions, Result};

use super::command::CoordinateMode;
use super::parser::Interpreter;
use super::state::ProbeRecord;
use super::stream::{StreamReader, NO_SUB_CODE};
use crate::machine::Machine;

impl<M: Machine> Interpreter<M> {
    /// G38.x dispatch on the sub-code
    pub(crate) fn probe_family(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        match rd.read_sub_code() {
            2 => self.probe(rd, true),
            4 => self.probe(rd, false),
            12 => self.center_probe(rd, true),
            14 => self.center_probe(rd, false),
            NO_SUB_CODE => Err(GcodeError::not_implemented('G', "38").into()),
            sub => Err(GcodeError::not_implemented('G', format!("38.{}", sub)).into()),
        }
    }

    /// Probe toward the target; `toward_contact` waits for contact,
    /// otherwise for the probe to release
    pub(crate) fn probe(&mut self, rd: &mut StreamReader<'_>, toward_contact: bool) -> Result<()> {
        let mv = self.parse_axis_words(rd, self.coordinate_mode())?;
        if mv.axes.is_empty() {
            return Err(probe_failed("no axis given"));
        }
        if let Some(feed) = mv.feed {
            self.modal.work_feed = feed;
        }

        self.modeless.probe_attempted = true;
        self.modeless.probe.ok = false;
        self.probe_to(&mv.newpos, toward_contact)?;
        self.modeless.probe = ProbeRecord {
            ok: true,
            positions: self.motion.positions(),
        };
        Ok(())
    }

    /// Probe both sides of each given axis and stop in the middle
    ///
    /// Axis words are approach distances from the current position.
    fn center_probe(&mut self, rd: &mut StreamReader<'_>, toward_contact: bool) -> Result<()> {
        let mv = self.parse_axis_words(rd, CoordinateMode::Absolute)?;
        if mv.axes.is_empty() {
            return Err(probe_failed("no axis given"));
        }
        if let Some(feed) = mv.feed {
            self.modal.work_feed = feed;
        }

        self.modeless.probe_attempted = true;
        self.modeless.probe.ok = false;
        let mut center = self.motion.positions();

        for axis in mv.axes.iter() {
            let index = axis.index();
            let delta = mv.get(axis);
            let start = self.motion.positions();

            let mut target = start;
            target[index] = start[index].saturating_add(delta);
            self.probe_to(&target, toward_contact)?;
            let first_hit = self.motion.position(axis);

            self.rapid_to(&start)?;

            target[index] = start[index].saturating_sub(delta);
            self.probe_to(&target, toward_contact)?;
            let second_hit = self.motion.position(axis);

            center[index] = midpoint(second_hit, first_hit);
            tracing::info!(%axis, first_hit, second_hit, center = center[index], "center probe");
            self.rapid_to(&center)?;
        }

        self.modeless.probe = ProbeRecord {
            ok: true,
            positions: center,
        };
        Ok(())
    }

    /// One probe move at working feed
    fn probe_to(&mut self, target: &Positions, toward_contact: bool) -> Result<()> {
        let expected = if toward_contact {
            self.modal.probe_on_value
        } else {
            !self.modal.probe_on_value
        };
        if self.machine.probe_level() == expected {
            return Err(probe_failed(if toward_contact {
                "probe already in contact"
            } else {
                "probe not in contact"
            }));
        }

        let feed = self.modal.work_feed;
        let triggered = self
            .motion
            .probe_move(&mut self.machine, target, feed, expected)?;
        if !triggered {
            return Err(probe_failed("no contact"));
        }
        Ok(())
    }
}

/// `from + (to - from) / 2`, truncating toward `from`
fn midpoint(from: Mm1000, to: Mm1000) -> Mm1000 {
    let middle = i64::from(from) + (i64::from(to) - i64::from(from)) / 2;
    // between two i32 values
    middle as Mm1000
}

fn probe_failed(reason: &str) -> millforge_core::Error {
    GcodeError::ProbeFailed {
        reason: reason.to_string(),
    }
    .into()
}
