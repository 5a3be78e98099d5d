//! Drilling cycles G73, G81, G82 and G83
//!
//! One driver serves all four variants; they differ only in which of the
//! dwell (P), peck (Q) and short-retract options are enabled. The cycle
//! words R, P and Q are remembered modally so a later statement with only
//! axis words drills the next hole with the same parameters.

use millforge_core::{Axis, GcodeError, Mm1000, Positions, Result, NUM_AXIS_XYZ};

use super::command::{read_uint_value, AxisMove};
use super::parser::Interpreter;
use super::state::{DrillCycle, DrillParams, RepeatableCommand};
use super::stream::StreamReader;
use crate::machine::Machine;

impl<M: Machine> Interpreter<M> {
    pub(crate) fn drill(&mut self, rd: &mut StreamReader<'_>, cycle: DrillCycle) -> Result<()> {
        let through = self.modal.plane.through_axis();
        let mode = self.coordinate_mode();
        let mv = self.parse_axis_move(rd, mode, |this, rd, letter| {
            let words = this.modeless.drill;
            let already = match letter {
                'R' => words.r.is_some(),
                'L' => words.l.is_some(),
                'P' if cycle.uses_p() => words.p.is_some(),
                'Q' if cycle.uses_q() => words.q.is_some(),
                _ => return Ok(false),
            };
            if already {
                return Err(GcodeError::already_specified(letter).into());
            }
            match letter {
                'R' => this.modeless.drill.r = Some(this.parse_coordinate(rd, through, mode)?),
                'L' => {
                    let repeats = u8::try_from(read_uint_value(rd, 'L')?)
                        .ok()
                        .filter(|repeats| *repeats > 0)
                        .ok_or(GcodeError::LMustBe1To255)?;
                    this.modeless.drill.l = Some(repeats);
                }
                'P' => this.modeless.drill.p = Some(read_uint_value(rd, 'P')?),
                _ => {
                    let q = this.read_length(rd, 'Q')?;
                    if q <= 0 {
                        return Err(GcodeError::QMustBePositive.into());
                    }
                    this.modeless.drill.q = Some(q);
                }
            }
            Ok(true)
        })?;
        // cycles move X, Y and Z only
        if let Some(axis) = mv.axes.iter().find(|axis| axis.index() >= NUM_AXIS_XYZ) {
            return Err(GcodeError::UnexpectedToken {
                found: axis.letter(),
            }
            .into());
        }

        let words = self.modeless.drill;
        let mut params = self.modal.drill;
        if let Some(r) = words.r {
            params.r = Some(r);
        }
        if let Some(p) = words.p {
            params.p = p;
        }
        if let Some(q) = words.q {
            params.q = q;
        }
        if mv.has(through) {
            params.bottom = Some(mv.get(through));
        }

        if mv.axes.is_empty() {
            self.commit_drill(cycle, params, &mv);
            return Ok(());
        }

        if cycle.uses_q() && params.q == 0 {
            return Err(GcodeError::QMustNotBe0.into());
        }
        let r = params.r.ok_or(GcodeError::LetterExpected { letter: 'R' })?;
        let bottom = params.bottom.ok_or(GcodeError::LetterExpected {
            letter: through.letter(),
        })?;

        let initial = self.motion.position(through);
        let drill_down = initial > bottom;
        if (drill_down && (initial < r || bottom > r)) || (!drill_down && (initial > r || bottom < r))
        {
            return Err(GcodeError::RMustBeBetweenCurrentAndBottom.into());
        }

        self.commit_drill(cycle, params, &mv);
        let repeats = words.l.unwrap_or(1);
        tracing::debug!(
            cycle = cycle.gcode(),
            r,
            bottom,
            repeats,
            "drilling cycle"
        );

        let plane = [self.modal.plane.axis0(), self.modal.plane.axis1()];
        let mut target = [mv.get(plane[0]), mv.get(plane[1])];
        let mut pos = self.motion.positions();
        let hole = Hole {
            cycle,
            params,
            r,
            bottom,
            initial,
            drill_down,
            through,
        };

        for repeat in 0..repeats {
            self.check_kill()?;
            if self.modal.absolute || repeat == 0 {
                for (axis, value) in plane.iter().zip(target.iter_mut()) {
                    pos[axis.index()] = *value;
                    if !self.modal.absolute {
                        // later repeats step by the relative distance
                        *value = value.saturating_sub(self.motion.position(*axis));
                    }
                }
            } else {
                for (axis, value) in plane.iter().zip(target.iter()) {
                    pos[axis.index()] = pos[axis.index()].saturating_add(*value);
                }
            }
            self.rapid_to(&pos)?;

            pos[through.index()] = r;
            self.rapid_to(&pos)?;

            self.drill_hole(&hole, &mut pos)?;
        }
        Ok(())
    }

    fn commit_drill(&mut self, cycle: DrillCycle, params: DrillParams, mv: &AxisMove) {
        self.modal.drill = params;
        self.modal.repeatable = RepeatableCommand::Drill(cycle);
        if let Some(feed) = mv.feed {
            self.modal.work_feed = feed;
        }
    }

    /// Plunge from R to the bottom, pecking if Q is set, and retract
    fn drill_hole(&mut self, hole: &Hole, pos: &mut Positions) -> Result<()> {
        let through = hole.through.index();
        let mut depth = hole.r;
        loop {
            let final_peck = if hole.cycle.uses_q() {
                if hole.drill_down {
                    depth = depth.saturating_sub(hole.params.q);
                    hole.bottom >= depth
                } else {
                    depth = depth.saturating_add(hole.params.q);
                    hole.bottom <= depth
                }
            } else {
                true
            };
            if final_peck {
                depth = hole.bottom;
            }

            pos[through] = depth;
            self.feed_to(pos)?;

            if hole.cycle.uses_p() && hole.params.p != 0 {
                self.machine.wait(hole.params.p)?;
            }

            pos[through] = if final_peck {
                if self.modal.return_to_initial_level {
                    hole.initial
                } else {
                    hole.r
                }
            } else if hole.cycle.uses_min_retract() {
                let retraction = self.modal.peck_retraction;
                if hole.drill_down {
                    depth.saturating_add(retraction)
                } else {
                    depth.saturating_sub(retraction)
                }
            } else {
                hole.r
            };
            self.rapid_to(pos)?;

            if final_peck {
                return Ok(());
            }
        }
    }
}

/// Geometry of one hole, fixed for all repeats of a statement
struct Hole {
    cycle: DrillCycle,
    params: DrillParams,
    r: Mm1000,
    bottom: Mm1000,
    /// Through-axis position when the statement started
    initial: Mm1000,
    drill_down: bool,
    through: Axis,
}
