//! Statement driver and letter dispatch
//!
//! One call to [`Interpreter::parse_command`] consumes one statement. Each
//! token is offered to the letter layers in order, base set first, then the
//! extension set; G and M codes go through their own two-layer chains in
//! [`processors`](super::processors). A layer that does not know a letter or
//! code answers [`Dispatch::Unhandled`] and the next layer is tried.
//!
//! The first error aborts the rest of the statement. It is reported to the
//! display and returned; modeless state is rebuilt before the next statement.

use millforge_core::{
    Axis, Error, GcodeError, MachineError, MessageLevel, Mm1000, Positions, Result, MAX_AXIS,
    NUM_AXIS_XYZ,
};
use millforge_settings::InterpreterConfig;

use super::command::{read_u16_value, read_uint_value};
use super::motion::MotionControl;
use super::state::{ModalState, ModelessState, RepeatableCommand};
use super::stream::StreamReader;
use crate::machine::{IoChannel, Machine};
use crate::params::{parse_param_no, TableScope};

/// Answer of one dispatch layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Unhandled,
}

/// Letter layer; the reader is positioned on the letter
pub(crate) type LetterHandler<M> =
    fn(&mut Interpreter<M>, &mut StreamReader<'_>, char) -> Result<Dispatch>;

/// Code layer; the reader is positioned after the code number
pub(crate) type CodeHandler<M> =
    fn(&mut Interpreter<M>, &mut StreamReader<'_>, u16) -> Result<Dispatch>;

/// G-code interpreter driving a [`Machine`]
pub struct Interpreter<M: Machine> {
    pub(crate) machine: M,
    pub(crate) config: InterpreterConfig,
    pub(crate) modal: ModalState,
    pub(crate) modeless: ModelessState,
    pub(crate) motion: MotionControl,
}

impl<M: Machine> Interpreter<M> {
    /// Create an interpreter; the axis count is clamped to 3..=6
    pub fn new(mut config: InterpreterConfig, machine: M) -> Self {
        config.axis_count = config.axis_count.clamp(NUM_AXIS_XYZ, MAX_AXIS);
        let modal = ModalState::new(&config);
        let modeless = ModelessState::begin(&modal);
        let motion = MotionControl::new(machine.positions());
        Self {
            machine,
            config,
            modal,
            modeless,
            motion,
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn modal(&self) -> &ModalState {
        &self.modal
    }

    pub fn motion(&self) -> &MotionControl {
        &self.motion
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    pub fn into_machine(self) -> M {
        self.machine
    }

    /// Logical positions as seen by the program (before rotation)
    pub fn positions(&self) -> Positions {
        self.motion.positions()
    }

    /// Interpret one statement
    pub fn parse_command(&mut self, line: &str) -> Result<()> {
        let span = tracing::debug_span!(
            "statement",
            line = self.modal.line_number,
            debug_level = self.modal.debug_level
        );
        let _enter = span.enter();
        tracing::debug!(text = line, "parse");

        self.modeless = ModelessState::begin(&self.modal);
        let mut rd = StreamReader::new(line);
        let result = self.parse_statement(&mut rd);
        self.end_statement();

        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn parse_statement(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        loop {
            self.check_kill()?;
            rd.skip_spaces();
            let Some(ch) = rd.peek() else {
                return Ok(());
            };
            self.dispatch_letter(rd, ch.to_ascii_uppercase())?;
        }
    }

    fn end_statement(&mut self) {
        if self.modeless.probe_attempted {
            self.modal.last_probe = self.modeless.probe;
        }
        self.modeless = ModelessState::begin(&self.modal);
    }

    fn report(&mut self, err: &Error) {
        if err.is_kill() {
            tracing::error!("machine killed");
        } else {
            tracing::warn!(error = %err, "statement aborted");
        }
        self.machine.print(MessageLevel::Error, &err.to_string());
    }

    /// Honour the external kill input
    pub(crate) fn check_kill(&mut self) -> Result<()> {
        if self.machine.is_kill_requested() {
            return self.kill();
        }
        Ok(())
    }

    pub(crate) fn kill(&mut self) -> Result<()> {
        self.machine.kill();
        Err(MachineError::Killed.into())
    }

    /// Advisory message; the statement continues
    pub(crate) fn info(&mut self, message: &str) {
        tracing::warn!(advisory = message, "info message");
        self.machine.print(MessageLevel::Info, message);
    }

    pub(crate) fn table_scope(&self) -> TableScope {
        TableScope {
            axis_count: self.config.axis_count,
            work_offset_count: self.config.work_offset_count,
        }
    }

    fn letter_layers() -> [LetterHandler<M>; 2] {
        [Self::base_letter, Self::extension_letter]
    }

    fn dispatch_letter(&mut self, rd: &mut StreamReader<'_>, letter: char) -> Result<()> {
        let save = rd.position();
        for layer in Self::letter_layers() {
            rd.reset_to(save);
            if layer(self, rd, letter)? == Dispatch::Handled {
                return Ok(());
            }
        }
        Err(GcodeError::UnknownCommand { letter }.into())
    }

    /// Read a code number and offer it to `layers`
    pub(crate) fn dispatch_code(
        &mut self,
        rd: &mut StreamReader<'_>,
        letter: char,
        layers: [CodeHandler<M>; 2],
    ) -> Result<Dispatch> {
        rd.next_char();
        let code = read_u16_value(rd, letter)?;
        let save = rd.position();
        for layer in layers {
            rd.reset_to(save);
            if layer(self, rd, code)? == Dispatch::Handled {
                return Ok(Dispatch::Handled);
            }
        }
        Err(GcodeError::UnsupportedCode { letter, code }.into())
    }

    /// Base letters: G, M, axis words, F, N and comments
    fn base_letter(&mut self, rd: &mut StreamReader<'_>, letter: char) -> Result<Dispatch> {
        match letter {
            '(' | ';' => self.comment(rd)?,
            'G' => return self.dispatch_code(rd, 'G', Self::gcode_layers()),
            'M' => return self.dispatch_code(rd, 'M', Self::mcode_layers()),
            'F' => {
                rd.next_char();
                self.modal.work_feed = self.read_feed(rd)?;
            }
            'N' => {
                rd.next_char();
                self.modal.line_number = read_uint_value(rd, 'N')?;
            }
            _ if self.configured_axis(letter).is_some() => self.repeat_modal_command(rd)?,
            _ => return Ok(Dispatch::Unhandled),
        }
        Ok(Dispatch::Handled)
    }

    /// Extension letters: S, T, #, ! and &
    fn extension_letter(&mut self, rd: &mut StreamReader<'_>, letter: char) -> Result<Dispatch> {
        match letter {
            'S' => {
                rd.next_char();
                let speed = read_u16_value(rd, 'S')?;
                self.modal.spindle_speed = speed;
                if self.machine.io_level(IoChannel::Spindle) != 0 {
                    self.machine.set_io_level(IoChannel::Spindle, speed)?;
                }
            }
            'T' => {
                rd.next_char();
                let tool = read_u16_value(rd, 'T')?;
                self.modal.tool = tool;
                if !self.machine.is_valid_tool(tool) {
                    self.info(&format!("Tool {} is not in the tool table", tool));
                }
            }
            '#' => {
                rd.next_char();
                self.parameter_command(rd)?;
            }
            '!' => {
                rd.next_char();
                rd.expect_end_of_command()?;
                return self.kill().map(|_| Dispatch::Handled);
            }
            '&' => {
                rd.next_char();
                rd.expect_end_of_command()?;
                tracing::debug!(motion = ?self.motion, "motion state dump");
                self.machine.dump_motion_state();
            }
            _ => return Ok(Dispatch::Unhandled),
        }
        Ok(Dispatch::Handled)
    }

    /// Axis words without a command repeat the last modal command
    fn repeat_modal_command(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        match self.modal.repeatable {
            RepeatableCommand::None => Err(GcodeError::NoModalCommand.into()),
            RepeatableCommand::Rapid => self.linear_move(rd, true),
            RepeatableCommand::Linear => self.linear_move(rd, false),
            RepeatableCommand::Drill(cycle) => self.drill(rd, cycle),
        }
    }

    /// Comments; `(MSG,...)` and `(PRINT,...)` go to the display
    fn comment(&mut self, rd: &mut StreamReader<'_>) -> Result<()> {
        let Some(text) = rd.skip_comment() else {
            return Ok(());
        };
        let text = text.trim_start();
        if let Some(message) = strip_prefix_ignore_case(text, "MSG,") {
            self.machine.print(MessageLevel::Output, message.trim());
        } else if let Some(body) = strip_prefix_ignore_case(text, "PRINT,") {
            let message = self.expand_parameters(body)?;
            self.machine.print(MessageLevel::Output, message.trim());
        }
        Ok(())
    }

    /// Replace every `#` reference in `text` with its value
    fn expand_parameters(&self, text: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(hash) = rest.find('#') {
            out.push_str(&rest[..hash]);
            let mut rd = StreamReader::new(&rest[hash + 1..]);
            let key = parse_param_no(&mut rd, self.table_scope())?;
            let value = self.param_value(key, true)?;
            out.push_str(&format!("{:.3}", value));
            rest = rd.remaining();
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Logical position of `axis` relative to the active offsets
    pub(crate) fn relative_position(&self, axis: Axis) -> Mm1000 {
        self.motion
            .position(axis)
            .saturating_sub(self.all_preset(axis))
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix_ignore_case() {
        assert_eq!(strip_prefix_ignore_case("msg,hi", "MSG,"), Some("hi"));
        assert_eq!(strip_prefix_ignore_case("MS", "MSG,"), None);
        assert_eq!(strip_prefix_ignore_case("PRINTX", "PRINT,"), None);
    }
}
