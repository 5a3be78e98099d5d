//! Axis words and the coordinate pipeline
//!
//! A parsed literal passes through, in order: absolute/relative
//! interpretation, the active work offset, the G92 preset together with the
//! tool height on the through-axis, and finally the rotation applied by
//! [`MotionControl`](super::motion::MotionControl) when the move is issued.

use millforge_core::units::to_mm1000;
use millforge_core::{Axis, AxisSet, Feedrate, GcodeError, Mm1000, Positions, Result};

use super::parser::Interpreter;
use super::stream::StreamReader;
use crate::machine::{Feed, Machine};
use crate::params::expression;

/// How an axis word value is turned into a machine coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateMode {
    /// Raw value, no offsets (G10, G92, probe deltas)
    Absolute,
    /// Value plus every active offset (G90)
    AbsoluteWithZeroShift,
    /// Value added to the current position (G91)
    Relative,
}

/// Axis words of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMove {
    /// Axes given in the command
    pub axes: AxisSet,
    /// Target per axis; unspecified axes hold the current position
    pub newpos: Positions,
    /// F word, if given
    pub feed: Option<Feedrate>,
}

impl AxisMove {
    pub fn new(current: Positions) -> Self {
        Self {
            axes: AxisSet::empty(),
            newpos: current,
            feed: None,
        }
    }

    pub fn has(&self, axis: Axis) -> bool {
        self.axes.contains(axis)
    }

    pub fn get(&self, axis: Axis) -> Mm1000 {
        self.newpos[axis.index()]
    }
}

/// Read an unsigned integer after `letter`
pub(crate) fn read_uint_value(
    rd: &mut StreamReader<'_>,
    letter: char,
) -> std::result::Result<u32, GcodeError> {
    rd.skip_spaces();
    rd.read_uint().ok_or(GcodeError::NumberExpected { letter })
}

/// Read a `u8` after `letter`
pub(crate) fn read_u8_value(
    rd: &mut StreamReader<'_>,
    letter: char,
) -> std::result::Result<u8, GcodeError> {
    let value = read_uint_value(rd, letter)?;
    u8::try_from(value).map_err(|_| GcodeError::ValueOutOfRange { letter })
}

/// Read a `u16` after `letter`
pub(crate) fn read_u16_value(
    rd: &mut StreamReader<'_>,
    letter: char,
) -> std::result::Result<u16, GcodeError> {
    let value = read_uint_value(rd, letter)?;
    u16::try_from(value).map_err(|_| GcodeError::ValueOutOfRange { letter })
}

/// Read optional unsigned integer words, in any order
///
/// Stops at the first letter not in `letters`, leaving it unread.
pub(crate) fn read_uint_words<const N: usize>(
    rd: &mut StreamReader<'_>,
    letters: [char; N],
) -> std::result::Result<[Option<u32>; N], GcodeError> {
    let mut values = [None; N];
    loop {
        let save = rd.position();
        let Some(ch) = rd.skip_spaces_to_upper() else {
            break;
        };
        let Some(slot) = letters.iter().position(|letter| *letter == ch) else {
            rd.reset_to(save);
            break;
        };
        if values[slot].is_some() {
            return Err(GcodeError::already_specified(ch));
        }
        rd.next_char();
        values[slot] = Some(read_uint_value(rd, ch)?);
    }
    Ok(values)
}

impl<M: Machine> Interpreter<M> {
    /// Axis for a letter, if the letter names a configured axis
    pub(crate) fn configured_axis(&self, letter: char) -> Option<Axis> {
        Axis::from_letter(letter).filter(|axis| axis.index() < self.config.axis_count)
    }

    /// Mode for move targets under G90 / G91
    pub(crate) fn coordinate_mode(&self) -> CoordinateMode {
        if self.modal.absolute {
            CoordinateMode::AbsoluteWithZeroShift
        } else {
            CoordinateMode::Relative
        }
    }

    /// Sum of every offset active on `axis` in this statement
    pub(crate) fn all_preset(&self, axis: Axis) -> Mm1000 {
        let index = self.modeless.zero_preset_index;
        let mut preset = self.modal.work_offset(index, axis.index());
        if index != 0 {
            preset = preset.saturating_add(self.modal.g92_preset[axis.index()]);
            if axis == self.modal.plane.through_axis() {
                preset = preset.saturating_add(self.modal.tool_height);
            }
        }
        preset
    }

    /// Read a word value: a number, a `#` reference or a `[ ]` expression
    pub(crate) fn read_number(&self, rd: &mut StreamReader<'_>, letter: char) -> Result<f64> {
        rd.skip_spaces();
        match rd.peek() {
            Some('#') | Some('[') => {
                let mut resolve =
                    |rd: &mut StreamReader<'_>| self.resolve_reference(rd);
                Ok(expression::evaluate_operand(rd, &mut resolve)?)
            }
            _ => Ok(rd
                .read_decimal()
                .ok_or(GcodeError::NumberExpected { letter })?),
        }
    }

    /// Read a length word in the active units
    pub(crate) fn read_length(&self, rd: &mut StreamReader<'_>, letter: char) -> Result<Mm1000> {
        Ok(to_mm1000(self.read_number(rd, letter)?, self.modal.units))
    }

    /// Read an F word; feed rates must be positive
    pub(crate) fn read_feed(&self, rd: &mut StreamReader<'_>) -> Result<Feedrate> {
        let feed = self.read_length(rd, 'F')?;
        if feed <= 0 {
            return Err(GcodeError::ValueOutOfRange { letter: 'F' }.into());
        }
        Ok(feed)
    }

    /// Resolve one coordinate through the pipeline up to, not including,
    /// rotation
    pub(crate) fn parse_coordinate(
        &self,
        rd: &mut StreamReader<'_>,
        axis: Axis,
        mode: CoordinateMode,
    ) -> Result<Mm1000> {
        let value = self.read_length(rd, axis.letter())?;
        Ok(match mode {
            CoordinateMode::Absolute => value,
            CoordinateMode::AbsoluteWithZeroShift => value.saturating_add(self.all_preset(axis)),
            CoordinateMode::Relative => self.motion.position(axis).saturating_add(value),
        })
    }

    /// Read axis words and F, offering every other letter to `extra`
    ///
    /// `extra` is called with the letter already consumed and returns
    /// `false` to end the command; the letter is then left for the next
    /// command on the line.
    pub(crate) fn parse_axis_move<'a, F>(
        &mut self,
        rd: &mut StreamReader<'a>,
        mode: CoordinateMode,
        mut extra: F,
    ) -> Result<AxisMove>
    where
        F: FnMut(&mut Self, &mut StreamReader<'a>, char) -> Result<bool>,
    {
        let mut mv = AxisMove::new(self.motion.positions());
        loop {
            self.check_kill()?;
            rd.skip_spaces_or_comment();
            let save = rd.position();
            let Some(letter) = rd.next_char().map(|ch| ch.to_ascii_uppercase()) else {
                break;
            };

            if let Some(axis) = self.configured_axis(letter) {
                if mv.has(axis) {
                    return Err(GcodeError::already_specified(letter).into());
                }
                mv.newpos[axis.index()] = self.parse_coordinate(rd, axis, mode)?;
                mv.axes.insert(axis);
            } else if letter == 'F' {
                if mv.feed.is_some() {
                    return Err(GcodeError::already_specified('F').into());
                }
                mv.feed = Some(self.read_feed(rd)?);
            } else if !extra(self, rd, letter)? {
                rd.reset_to(save);
                break;
            }
        }
        Ok(mv)
    }

    /// Read axis words and F only
    pub(crate) fn parse_axis_words(
        &mut self,
        rd: &mut StreamReader<'_>,
        mode: CoordinateMode,
    ) -> Result<AxisMove> {
        self.parse_axis_move(rd, mode, |_, _, _| Ok(false))
    }

    /// Issue one move through the rotation engine
    pub(crate) fn move_to(&mut self, target: &Positions, feed: Feed) -> Result<()> {
        self.motion.move_abs(&mut self.machine, target, feed)?;
        Ok(())
    }

    pub(crate) fn rapid_to(&mut self, target: &Positions) -> Result<()> {
        self.move_to(target, Feed::Rapid(self.modal.rapid_feed))
    }

    pub(crate) fn feed_to(&mut self, target: &Positions) -> Result<()> {
        self.move_to(target, Feed::Work(self.modal.work_feed))
    }

    /// G0 / G1 and their modal repeats
    pub(crate) fn linear_move(&mut self, rd: &mut StreamReader<'_>, rapid: bool) -> Result<()> {
        let mv = self.parse_axis_words(rd, self.coordinate_mode())?;
        self.modal.repeatable = if rapid {
            super::state::RepeatableCommand::Rapid
        } else {
            super::state::RepeatableCommand::Linear
        };
        if let Some(feed) = mv.feed {
            self.modal.work_feed = feed;
        }
        if mv.axes.is_empty() {
            return Ok(());
        }
        if rapid {
            self.rapid_to(&mv.newpos)
        } else {
            self.feed_to(&mv.newpos)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_words_any_order() {
        let mut rd = StreamReader::new(" P100 S2 X");
        let [s, p] = read_uint_words(&mut rd, ['S', 'P']).unwrap();
        assert_eq!((s, p), (Some(2), Some(100)));
        assert_eq!(rd.skip_spaces_to_upper(), Some('X'));
    }

    #[test]
    fn test_uint_words_duplicate() {
        let mut rd = StreamReader::new("S1 s2");
        assert_eq!(
            read_uint_words(&mut rd, ['S']),
            Err(GcodeError::AlreadySpecified { letter: 'S' })
        );
    }

    #[test]
    fn test_u8_range() {
        let mut rd = StreamReader::new("300");
        assert_eq!(
            read_u8_value(&mut rd, 'L'),
            Err(GcodeError::ValueOutOfRange { letter: 'L' })
        );
        let mut rd = StreamReader::new("Q");
        assert_eq!(
            read_u16_value(&mut rd, 'T'),
            Err(GcodeError::NumberExpected { letter: 'T' })
        );
    }
}
