//! Reading and writing parameters against the live interpreter state

use millforge_core::units::{from_mm1000, to_mm1000, MeasurementSystem, MM_PER_INCH};
use millforge_core::{Axis, GcodeError, MessageLevel, Mm1000, Result};

use super::{
    expression, lookup_key, parse_param_no, ParamAccess, ParamKind, ParamRef, ParamSource,
    PARAM_TABLE,
};
use crate::gcode::parser::Interpreter;
use crate::gcode::stream::StreamReader;
use crate::machine::{IoChannel, Machine};

type ParamResult<T> = std::result::Result<T, GcodeError>;

/// A validated write, ready to apply
enum ParamWrite {
    Register(usize, f64),
    Length(ParamRef, Mm1000),
    Int(ParamRef, u32),
}

impl<M: Machine> Interpreter<M> {
    /// Resolve a `#` reference; the reader is just past the `#`
    pub(crate) fn resolve_reference(&self, rd: &mut StreamReader<'_>) -> ParamResult<f64> {
        let key = parse_param_no(rd, self.table_scope())?;
        self.param_value(key, true)
    }

    fn is_register(&self, key: u16) -> bool {
        key >= 1 && key <= self.config.parameter_count
    }

    /// Value of a parameter
    ///
    /// Registers and length rows are returned in the active units when
    /// `convert_units` is set, in mm otherwise. Registers hold numbers as
    /// the program wrote them, so they are taken to be in the active units.
    pub fn param_value(&self, key: u16, convert_units: bool) -> ParamResult<f64> {
        if self.is_register(key) {
            let value = self.modal.registers[usize::from(key - 1)];
            return Ok(match self.modal.units {
                MeasurementSystem::Imperial if !convert_units => value * MM_PER_INCH,
                _ => value,
            });
        }
        let param = lookup_key(key, self.table_scope()).ok_or(GcodeError::ParameterNotFound)?;
        let axis = param.axis;
        let value = match param.info.source {
            ParamSource::ProbePosition => self.modal.last_probe.positions[axis.index()]
                .saturating_sub(self.all_preset(axis)),
            ParamSource::ProbeOk => Mm1000::from(self.modal.last_probe.ok),
            ParamSource::ReferencePosition => {
                if self.machine.is_reference_at_max(axis) {
                    self.machine.limit_max(axis)
                } else {
                    self.machine.limit_min(axis)
                }
            }
            ParamSource::G92Preset => self.modal.g92_preset[axis.index()],
            ParamSource::WorkOffset(index) => self.modal.work_offset(index + 1, axis.index()),
            ParamSource::Current | ParamSource::CurrentAxis(_) => self.relative_position(axis),
            ParamSource::CurrentAbsolute => self.motion.position(axis),
            ParamSource::Backlash => self.machine.backlash(axis),
            ParamSource::BacklashFeed => self.machine.backlash_feed(),
            ParamSource::MaxPosition => self.machine.limit_max(axis),
            ParamSource::MinPosition => self.machine.limit_min(axis),
            ParamSource::Acceleration => return Ok(f64::from(self.machine.acc(axis))),
            ParamSource::Deceleration => return Ok(f64::from(self.machine.dec(axis))),
            ParamSource::Jerk => return Ok(f64::from(self.machine.jerk(axis))),
            ParamSource::ControllerFan => {
                return Ok(f64::from(self.machine.io_level(IoChannel::ControllerFan)))
            }
            ParamSource::RapidFeed => self.modal.rapid_feed,
            ParamSource::WorkFeed => self.modal.work_feed,
        };
        Ok(match param.info.kind {
            ParamKind::Int => f64::from(value),
            ParamKind::Length if convert_units => from_mm1000(value, self.modal.units),
            ParamKind::Length => from_mm1000(value, MeasurementSystem::Metric),
        })
    }

    /// Everything after `#`: `?`, `n`, or `n=expr`
    pub(crate) fn parameter_command(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        if rd.peek() == Some('?') {
            rd.next_char();
            rd.expect_end_of_command()?;
            self.print_all_params();
            return Ok(());
        }

        let key = parse_param_no(rd, self.table_scope())?;
        rd.skip_spaces();
        if rd.peek() == Some('=') {
            rd.next_char();
            return self.set_param(rd, key);
        }
        if !rd.is_end() && !rd.is_comment_start() {
            return Err(GcodeError::EqExpected.into());
        }
        rd.expect_end_of_command()?;
        let value = self.param_value(key, true)?;
        self.machine
            .print(MessageLevel::Output, &format!("#{}={:.3}", key, value));
        Ok(())
    }

    /// `#key=expr`; nothing changes unless the whole statement is valid
    fn set_param(&mut self, rd: &mut StreamReader<'_>, key: u16) -> Result<()> {
        let value = {
            let mut resolve = |rd: &mut StreamReader<'_>| self.resolve_reference(rd);
            expression::evaluate(rd, &mut resolve)?
        };
        let write = self.validate_write(key, value)?;
        rd.expect_end_of_command()?;
        tracing::debug!(key, value, "set parameter");
        self.apply_write(write)
    }

    fn validate_write(&self, key: u16, value: f64) -> ParamResult<ParamWrite> {
        if self.is_register(key) {
            return Ok(ParamWrite::Register(usize::from(key - 1), value));
        }
        let param = lookup_key(key, self.table_scope())
            .ok_or(GcodeError::UnsupportedParameterNumber { key })?;
        if param.info.access == ParamAccess::Read {
            return Err(GcodeError::ParameterReadOnly);
        }
        let out_of_range = GcodeError::ValueOutOfRange { letter: '#' };
        match param.info.kind {
            ParamKind::Length => {
                let length = to_mm1000(value, self.modal.units);
                let positive_only = matches!(
                    param.info.source,
                    ParamSource::RapidFeed | ParamSource::BacklashFeed
                );
                if (positive_only && length <= 0)
                    || (param.info.source == ParamSource::Backlash && length < 0)
                {
                    return Err(out_of_range);
                }
                Ok(ParamWrite::Length(param, length))
            }
            ParamKind::Int => {
                let rounded = value.round();
                let max = if param.info.source == ParamSource::ControllerFan {
                    f64::from(u16::MAX)
                } else {
                    f64::from(u32::MAX)
                };
                if !(0.0..=max).contains(&rounded) {
                    return Err(out_of_range);
                }
                // range checked above
                Ok(ParamWrite::Int(param, rounded as u32))
            }
        }
    }

    fn apply_write(&mut self, write: ParamWrite) -> Result<()> {
        match write {
            ParamWrite::Register(index, value) => self.modal.registers[index] = value,
            ParamWrite::Length(param, value) => {
                let axis = param.axis;
                match param.info.source {
                    ParamSource::WorkOffset(index) => {
                        self.modal.work_offsets[usize::from(index)][axis.index()] = value
                    }
                    ParamSource::Backlash => self.machine.set_backlash(axis, value),
                    ParamSource::BacklashFeed => self.machine.set_backlash_feed(value),
                    ParamSource::MaxPosition => self.machine.set_limit_max(axis, value),
                    ParamSource::MinPosition => self.machine.set_limit_min(axis, value),
                    ParamSource::RapidFeed => self.modal.rapid_feed = value,
                    source => {
                        return Err(GcodeError::Other {
                            message: format!("{:?} is not writable", source),
                        }
                        .into())
                    }
                }
            }
            ParamWrite::Int(param, value) => {
                let axis = param.axis;
                match param.info.source {
                    ParamSource::Acceleration => self.machine.set_acc(axis, value),
                    ParamSource::Deceleration => self.machine.set_dec(axis, value),
                    ParamSource::Jerk => self.machine.set_jerk(axis, value),
                    ParamSource::ControllerFan => {
                        let level = u16::try_from(value)
                            .map_err(|_| GcodeError::ValueOutOfRange { letter: '#' })?;
                        self.machine.set_io_level(IoChannel::ControllerFan, level)?;
                    }
                    source => {
                        return Err(GcodeError::Other {
                            message: format!("{:?} is not writable", source),
                        }
                        .into())
                    }
                }
            }
        }
        self.machine.invalidate();
        Ok(())
    }

    /// `#?`: one line per table entry, axis rows expanded per axis
    fn print_all_params(&mut self) {
        let scope = self.table_scope();
        let mut lines = Vec::new();
        for info in PARAM_TABLE.iter().filter(|info| scope.has_row(info)) {
            let axes: &[Axis] = if info.axis_indexable {
                &Axis::ALL[..scope.axis_count]
            } else {
                &[]
            };
            let keys: Vec<(u16, String)> = if axes.is_empty() {
                vec![(info.key, info.name.to_string())]
            } else {
                axes.iter()
                    .map(|axis| {
                        (
                            info.key + axis.index() as u16,
                            format!("{}:{}", info.name, axis),
                        )
                    })
                    .collect()
            };
            for (key, name) in keys {
                let text = match self.param_value(key, true) {
                    Ok(value) if info.kind == ParamKind::Int => format!("{}", value as i64),
                    Ok(value) => format!("{:.3}", value),
                    Err(err) => err.to_string(),
                };
                lines.push(format!("#<{}>={}\t\t;{}", name, text, key));
            }
        }
        for line in lines {
            self.machine.print(MessageLevel::Output, &line);
        }
    }
}
