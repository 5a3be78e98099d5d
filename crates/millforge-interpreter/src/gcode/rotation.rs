//! G68 / G69 coordinate rotation commands
//!
//! | code    | effect |
//! |---------|--------|
//! | G68     | rotate by R degrees about the IJK vector (default: through-axis) at the given point |
//! | G68.10  | clear every angle and the offset |
//! | G68.11  | set the rotation offset only |
//! | G68.12  | set the offset (if given) and per-axis angles from I, J, K in degrees |
//! | G68.13  | derive angles from a point measured along X |
//! | G68.14  | derive angles from a point measured along Y |
//! | G68.15  | derive angles from a point measured along Z |
//! | G69     | clear the rotation |

use millforge_core::units::to_mm1000;
use millforge_core::{Axis, GcodeError, Result, NUM_AXIS_XYZ};

use super::command::AxisMove;
use super::parser::Interpreter;
use super::stream::{StreamReader, NO_SUB_CODE};
use crate::machine::Machine;

type IjkWords = [Option<f64>; NUM_AXIS_XYZ];

impl<M: Machine> Interpreter<M> {
    pub(crate) fn rotation(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        match rd.read_sub_code() {
            NO_SUB_CODE => self.rotation_about_vector(rd),
            10 => {
                self.clear_rotation();
                Ok(())
            }
            11 => {
                let mv = self.parse_axis_words(rd, self.coordinate_mode())?;
                self.motion.set_offset(xyz(&mv));
                self.sync_rotation();
                Ok(())
            }
            12 => self.rotation_angles(rd),
            13 => self.rotation_from_point(rd, Axis::X),
            14 => self.rotation_from_point(rd, Axis::Y),
            15 => self.rotation_from_point(rd, Axis::Z),
            sub => Err(GcodeError::not_implemented('G', format!("68.{}", sub)).into()),
        }
    }

    /// G69
    pub(crate) fn clear_rotation(&mut self) {
        self.motion.clear_rotation();
        self.sync_rotation();
    }

    /// Re-read the logical position after the rotation changed
    fn sync_rotation(&mut self) {
        let machine = self.machine.positions();
        self.motion.sync(&machine);
        tracing::info!(
            offset = ?self.motion.offset(),
            angles = ?[
                self.motion.angle(Axis::X),
                self.motion.angle(Axis::Y),
                self.motion.angle(Axis::Z)
            ],
            vector = ?self.motion.vector_rotation(),
            "rotation"
        );
    }

    /// Axis words plus I, J, K and optionally R
    fn parse_rotation_words(
        &mut self,
        rd: &mut StreamReader<'_>,
        accept_r: bool,
    ) -> Result<(AxisMove, IjkWords, Option<f64>)> {
        let mut ijk: IjkWords = [None; NUM_AXIS_XYZ];
        let mut r_word = None;
        let mode = self.coordinate_mode();
        let mv = self.parse_axis_move(rd, mode, |this, rd, letter| {
            let slot = match Axis::from_offset_letter(letter) {
                Some(axis) => &mut ijk[axis.index()],
                None if letter == 'R' && accept_r => &mut r_word,
                None => return Ok(false),
            };
            if slot.is_some() {
                return Err(GcodeError::already_specified(letter).into());
            }
            *slot = Some(this.read_number(rd, letter)?);
            Ok(true)
        })?;
        Ok((mv, ijk, r_word))
    }

    /// G68: rotate about an explicit vector through the given point
    fn rotation_about_vector(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        if self.motion.is_rotated() {
            self.clear_rotation();
        }
        let (mv, ijk, r_word) = self.parse_rotation_words(rd, true)?;
        let degrees = r_word.ok_or(GcodeError::LetterExpected { letter: 'R' })?;

        let vector = if ijk.iter().all(Option::is_none) {
            let mut through = [0.0; NUM_AXIS_XYZ];
            through[self.modal.plane.through_axis().index()] = 1.0;
            through
        } else {
            ijk.map(|value| value.unwrap_or(0.0))
        };
        if vector.iter().all(|v| *v == 0.0) {
            return Err(GcodeError::IjkVectorIsZero.into());
        }

        self.motion.set_offset(xyz(&mv));
        self.motion.set_vector_rotation(vector, degrees.to_radians())?;
        self.sync_rotation();
        Ok(())
    }

    /// G68.12: offset from axis words, angle per axis from I, J, K
    fn rotation_angles(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        let (mv, ijk, _) = self.parse_rotation_words(rd, false)?;
        if !mv.axes.is_empty() {
            self.motion.set_offset(xyz(&mv));
        }
        for (axis, degrees) in Axis::ALL.iter().zip(ijk) {
            if let Some(degrees) = degrees {
                self.motion.set_angle(*axis, degrees.to_radians());
            }
        }
        self.sync_rotation();
        Ok(())
    }

    /// G68.13 .. G68.15: derive angles from a point measured along `rot_axis`
    ///
    /// The point's offset from the rotation offset, less the optional I/J/K
    /// correction, gives `atan2(secondary, primary)` for each requested
    /// axis. When both are requested the second derivation uses the
    /// in-plane distance of the first as its primary distance.
    fn rotation_from_point(&mut self, rd: &mut StreamReader<'_>, rot_axis: Axis) -> Result<()> {
        let (mv, ijk, _) = self.parse_rotation_words(rd, false)?;
        if ijk[rot_axis.index()].is_some() {
            let letter = ['I', 'J', 'K'][rot_axis.index()];
            return Err(GcodeError::UnexpectedToken { found: letter }.into());
        }

        let (axis2, axis3) = match rot_axis {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::Z, Axis::X),
            _ => (Axis::X, Axis::Y),
        };
        let offset = self.motion.offset();
        let units = self.modal.units;
        let distance = |axis: Axis, correction: f64| {
            f64::from(mv.get(axis)) - f64::from(offset[axis.index()])
                - f64::from(to_mm1000(correction, units))
        };

        let mut primary = distance(rot_axis, 0.0);
        if let Some(correction) = ijk[axis3.index()] {
            let secondary = distance(axis2, correction);
            self.motion.set_angle(axis3, secondary.atan2(primary));
            primary = primary.hypot(secondary);
        }
        if let Some(correction) = ijk[axis2.index()] {
            let secondary = distance(axis3, correction);
            self.motion.set_angle(axis2, secondary.atan2(primary));
        }
        self.sync_rotation();
        Ok(())
    }
}

fn xyz(mv: &AxisMove) -> [millforge_core::Mm1000; NUM_AXIS_XYZ] {
    [mv.get(Axis::X), mv.get(Axis::Y), mv.get(Axis::Z)]
}
