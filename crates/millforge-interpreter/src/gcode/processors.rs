//! G and M code handler layers
//!
//! Each code family has a base layer with the common codes and an extension
//! layer with the controller-specific ones. Layers return
//! [`Dispatch::Unhandled`] for codes they do not know so further layers can
//! be stacked without touching the base set.

use millforge_core::units::{format_mm1000, mm1000_in_system, MeasurementSystem};
use millforge_core::{Axis, GcodeError, MessageLevel, Plane, Result, MAX_AXIS};

use super::command::{read_u8_value, read_uint_words, CoordinateMode};
use super::parser::{CodeHandler, Dispatch, Interpreter};
use super::state::{DrillCycle, RepeatableCommand};
use super::stream::StreamReader;
use crate::machine::{IoChannel, Machine, COOLANT_FLOOD, COOLANT_MIST, COOLANT_OFF};

/// Default tone length for M300
const DEFAULT_TONE_MS: u32 = 500;

/// Frequencies selected by `M300 S1` .. `S3`
///
/// Single-tone stand-ins for the ok, error and info signals. A preset
/// always plays for [`DEFAULT_TONE_MS`] and ignores P.
const TONE_PRESETS: [u32; 3] = [440, 880, 1760];

impl<M: Machine> Interpreter<M> {
    pub(crate) fn gcode_layers() -> [CodeHandler<M>; 2] {
        [Self::base_gcode, Self::extension_gcode]
    }

    pub(crate) fn mcode_layers() -> [CodeHandler<M>; 2] {
        [Self::base_mcode, Self::extension_mcode]
    }

    fn base_gcode(&mut self, rd: &mut StreamReader<'_>, code: u16) -> Result<Dispatch> {
        match code {
            0 => self.linear_move(rd, true)?,
            1 => self.linear_move(rd, false)?,
            2 | 3 => return Err(GcodeError::not_implemented('G', code.to_string()).into()),
            4 => self.dwell(rd)?,
            17 => self.set_plane(Plane::XY),
            18 => self.set_plane(Plane::ZX),
            19 => self.set_plane(Plane::YZ),
            20 => self.modal.units = MeasurementSystem::Imperial,
            21 => self.modal.units = MeasurementSystem::Metric,
            31 => self.probe(rd, true)?,
            80 => self.modal.repeatable = RepeatableCommand::None,
            90 => self.modal.absolute = true,
            91 => self.modal.absolute = false,
            92 => self.set_g92_preset(rd)?,
            _ => return Ok(Dispatch::Unhandled),
        }
        Ok(Dispatch::Handled)
    }

    fn extension_gcode(&mut self, rd: &mut StreamReader<'_>, code: u16) -> Result<Dispatch> {
        match code {
            10 => self.set_work_offset(rd)?,
            38 => self.probe_family(rd)?,
            40 => {}
            41 | 42 => return Err(GcodeError::not_implemented('G', code.to_string()).into()),
            43 => self.tool_length_compensation(rd)?,
            49 => self.modal.tool_height = 0,
            52 => {
                self.parse_axis_words(rd, CoordinateMode::Absolute)?;
                self.info("G52 is not implemented");
            }
            53 => self.modeless.zero_preset_index = 0,
            54..=59 => self.select_coordinate_system(code)?,
            68 => self.rotation(rd)?,
            69 => self.clear_rotation(),
            73 => self.drill(rd, DrillCycle::G73)?,
            81 => self.drill(rd, DrillCycle::G81)?,
            82 => self.drill(rd, DrillCycle::G82)?,
            83 => self.drill(rd, DrillCycle::G83)?,
            98 => self.modal.return_to_initial_level = true,
            99 => self.modal.return_to_initial_level = false,
            _ => return Ok(Dispatch::Unhandled),
        }
        Ok(Dispatch::Handled)
    }

    fn base_mcode(&mut self, _rd: &mut StreamReader<'_>, code: u16) -> Result<Dispatch> {
        match code {
            3 => self.spindle_on(false)?,
            4 => self.spindle_on(true)?,
            5 => self.machine.set_io_level(IoChannel::Spindle, 0)?,
            7 => self.machine.set_io_level(IoChannel::Coolant, COOLANT_MIST)?,
            9 => self.machine.set_io_level(IoChannel::Coolant, COOLANT_OFF)?,
            _ => return Ok(Dispatch::Unhandled),
        }
        self.machine.invalidate();
        Ok(Dispatch::Handled)
    }

    fn extension_mcode(&mut self, rd: &mut StreamReader<'_>, code: u16) -> Result<Dispatch> {
        match code {
            0 => self.program_message("Program stopped"),
            1 => self.program_message("Optional stop"),
            2 | 30 => {
                self.machine.set_io_level(IoChannel::Spindle, 0)?;
                self.machine.set_io_level(IoChannel::Coolant, COOLANT_OFF)?;
                self.program_message("Program end");
            }
            6 => {}
            8 => self.machine.set_io_level(IoChannel::Coolant, COOLANT_FLOOD)?,
            10 => self.machine.set_io_level(IoChannel::Vacuum, 1)?,
            11 => self.machine.set_io_level(IoChannel::Vacuum, 0)?,
            110 => {
                let [line] = read_uint_words(rd, ['N'])?;
                rd.expect_end_of_command()?;
                self.modal.line_number = line.unwrap_or(0);
            }
            111 => {
                let [level] = read_uint_words(rd, ['S'])?;
                rd.expect_end_of_command()?;
                self.modal.debug_level = u8::try_from(level.unwrap_or(0))
                    .map_err(|_| GcodeError::ValueOutOfRange { letter: 'S' })?;
                tracing::info!(level = self.modal.debug_level, "debug level");
            }
            114 => {
                let [relative] = read_uint_words(rd, ['S'])?;
                rd.expect_end_of_command()?;
                self.report_position(relative == Some(1));
            }
            220 => self.speed_override(rd)?,
            300 => {
                let [tone, duration] = read_uint_words(rd, ['S', 'P'])?;
                rd.expect_end_of_command()?;
                let (frequency, duration) = match tone {
                    Some(preset @ 1..=3) => (TONE_PRESETS[preset as usize - 1], None),
                    Some(frequency) => (frequency, duration),
                    None => (TONE_PRESETS[0], duration),
                };
                self.machine
                    .beep(frequency, duration.unwrap_or(DEFAULT_TONE_MS));
            }
            _ => return Ok(Dispatch::Unhandled),
        }
        self.machine.invalidate();
        Ok(Dispatch::Handled)
    }

    fn set_plane(&mut self, plane: Plane) {
        tracing::debug!(?plane, code = plane.gcode(), "plane");
        self.modal.plane = plane;
    }

    fn dwell(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        let [millis] = read_uint_words(rd, ['P'])?;
        let millis = millis.ok_or(GcodeError::LetterExpected { letter: 'P' })?;
        self.machine.wait(millis)?;
        Ok(())
    }

    /// G92: make the current position read as the given values
    fn set_g92_preset(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        let mv = self.parse_axis_words(rd, CoordinateMode::Absolute)?;
        if mv.axes.is_empty() {
            self.modal.g92_preset = [0; MAX_AXIS];
            return Ok(());
        }
        let through = self.modal.plane.through_axis();
        for axis in mv.axes.iter() {
            let mut preset = self
                .motion
                .position(axis)
                .saturating_sub(mv.get(axis))
                .saturating_sub(
                    self.modal
                        .work_offset(self.modeless.zero_preset_index, axis.index()),
                );
            if axis == through {
                preset = preset.saturating_sub(self.modal.tool_height);
            }
            self.modal.g92_preset[axis.index()] = preset;
        }
        Ok(())
    }

    /// G10 L2 P<n>: set work offset values
    fn set_work_offset(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        let mut l_word = None;
        let mut p_word = None;
        let mv = self.parse_axis_move(rd, CoordinateMode::Absolute, |_, rd, letter| {
            let slot = match letter {
                'L' => &mut l_word,
                'P' => &mut p_word,
                _ => return Ok(false),
            };
            if slot.is_some() {
                return Err(GcodeError::already_specified(letter).into());
            }
            *slot = Some(read_u8_value(rd, letter)?);
            Ok(true)
        })?;

        let l_word = l_word.ok_or(GcodeError::LetterExpected { letter: 'L' })?;
        if l_word != 2 {
            return Err(GcodeError::UnsupportedLValue.into());
        }
        let p_word = p_word.ok_or(GcodeError::LetterExpected { letter: 'P' })?;
        let index = if p_word == 0 {
            self.modal.coord_index
        } else {
            p_word
        };
        if index == 0 || index > self.config.work_offset_count {
            return Err(self.unsupported_coordinate_system().into());
        }

        let offset = &mut self.modal.work_offsets[usize::from(index - 1)];
        for axis in mv.axes.iter() {
            offset[axis.index()] = mv.get(axis);
        }
        tracing::info!(index, axes = mv.axes.bits(), "work offset set");
        Ok(())
    }

    fn select_coordinate_system(&mut self, code: u16) -> Result<()> {
        let index = (code - 53) as u8;
        if index > self.config.work_offset_count {
            return Err(self.unsupported_coordinate_system().into());
        }
        tracing::info!(code, "coordinate system");
        self.modal.coord_index = index;
        self.modeless.zero_preset_index = index;
        Ok(())
    }

    fn unsupported_coordinate_system(&self) -> GcodeError {
        GcodeError::UnsupportedCoordinateSystem {
            max_code: 53 + self.config.work_offset_count,
        }
    }

    /// G43 [H<tool>]: tool length compensation; without H it is cleared
    fn tool_length_compensation(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        let [h_word] = read_uint_words(rd, ['H'])?;
        let Some(tool) = h_word else {
            self.modal.tool_height = 0;
            return Ok(());
        };
        let tool = u16::try_from(tool).map_err(|_| GcodeError::ValueOutOfRange { letter: 'H' })?;
        if !self.machine.is_valid_tool(tool) {
            return Err(GcodeError::NoValidTool { tool }.into());
        }
        self.modal.tool_height = self.machine.tool_height(tool);
        tracing::info!(tool, height = self.modal.tool_height, "tool length compensation");
        Ok(())
    }

    fn spindle_on(&mut self, counter_clockwise: bool) -> Result<()> {
        self.machine
            .set_io_level(IoChannel::SpindleDir, u16::from(counter_clockwise))?;
        self.machine
            .set_io_level(IoChannel::Spindle, self.modal.spindle_speed)?;
        Ok(())
    }

    fn program_message(&mut self, message: &str) {
        tracing::info!(event = message, "program");
        self.machine.print(MessageLevel::Output, message);
    }

    /// M220 S<percent>
    fn speed_override(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        let [percent] = read_uint_words(rd, ['S'])?;
        let percent = percent.ok_or(GcodeError::LetterExpected { letter: 'S' })?;
        rd.expect_end_of_command()?;
        let percent = u8::try_from(percent)
            .ok()
            .filter(|percent| *percent > 0)
            .ok_or(GcodeError::ValueOutOfRange { letter: 'S' })?;
        self.machine.set_speed_override(percent);
        Ok(())
    }

    /// M114: absolute machine position, or with S1 the program position
    fn report_position(&mut self, relative: bool) {
        let units = self.modal.units;
        let text = Axis::ALL[..self.config.axis_count]
            .iter()
            .map(|axis| {
                let value = if relative {
                    self.relative_position(*axis)
                } else {
                    self.machine.position(*axis)
                };
                format!("{}:{}", axis, format_mm1000(mm1000_in_system(value, units), 3))
            })
            .collect::<Vec<_>>()
            .join(" ");
        self.machine.print(MessageLevel::Output, &text);
    }
}
