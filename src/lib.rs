//! # Millforge
//!
//! G-code interpreter and modal-state engine for small CNC mills, routers
//! and laser cutters.
//!
//! ## Architecture
//!
//! Millforge is organized as a workspace with multiple crates:
//!
//! 1. **millforge-core** - Fixed-point lengths, axis model, error types
//! 2. **millforge-settings** - Interpreter and machine configuration
//! 3. **millforge-interpreter** - Statement parser, parameters, rotation,
//!    canned cycles, probing and the simulated machine
//! 4. **millforge** - Logging setup and the command-line runner

use std::io::Write;

use millforge_core::MessageLevel;
use millforge_interpreter::{Flow, Interpreter, SimulatedMachine};
use millforge_settings::Config;

pub use millforge_core::{Axis, Error, GcodeError, MachineError, Mm1000, Positions, Result};
pub use millforge_interpreter as interpreter;
pub use millforge_settings as settings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Honours `RUST_LOG`, defaults to `info`. Logs go to stderr so program
/// output on stdout stays clean.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Interpreter driving a simulated machine built from `config`
pub fn build_interpreter(config: &Config) -> Interpreter<SimulatedMachine> {
    Interpreter::new(
        config.interpreter.clone(),
        SimulatedMachine::new(&config.machine),
    )
}

/// Counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub statements: u64,
    pub errors: u64,
    /// The machine was killed and the run stopped
    pub killed: bool,
}

/// Feeds statements into an interpreter and writes the controller replies
///
/// Every statement answers with its display output followed by `ok`, or by
/// the `error:` line of the failure. A kill stops the session.
pub struct Session<W: Write> {
    interp: Interpreter<SimulatedMachine>,
    out: W,
    summary: RunSummary,
}

impl<W: Write> Session<W> {
    pub fn new(interp: Interpreter<SimulatedMachine>, out: W) -> Self {
        Self {
            interp,
            out,
            summary: RunSummary::default(),
        }
    }

    /// Run one statement
    pub fn statement(&mut self, line_no: u64, text: &str) -> anyhow::Result<Flow> {
        self.summary.statements += 1;
        let result = self.interp.parse_command(text);

        for (level, message) in self.interp.machine_mut().take_output() {
            match level {
                MessageLevel::Output => writeln!(self.out, "{}", message)?,
                level => writeln!(self.out, "{}: {}", level, message)?,
            }
        }

        match result {
            Ok(()) => {
                writeln!(self.out, "ok")?;
                Ok(Flow::Continue)
            }
            Err(err) => {
                self.summary.errors += 1;
                tracing::debug!(line_no, error = %err, "statement failed");
                if err.is_kill() {
                    self.summary.killed = true;
                    Ok(Flow::Stop)
                } else {
                    Ok(Flow::Continue)
                }
            }
        }
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn interpreter(&self) -> &Interpreter<SimulatedMachine> {
        &self.interp
    }

    pub fn into_parts(self) -> (Interpreter<SimulatedMachine>, W) {
        (self.interp, self.out)
    }
}

/// Run every statement of `source` through `session`
pub fn run_source<R, W>(session: &mut Session<W>, source: R) -> anyhow::Result<RunSummary>
where
    R: std::io::BufRead,
    W: Write,
{
    let stats = millforge_interpreter::read_statements(source, |line_no, text| {
        session.statement(line_no, text)
    })?;
    tracing::info!(
        lines = stats.lines_read,
        statements = stats.statements,
        stopped = stats.stopped,
        "program finished"
    );
    Ok(session.summary())
}
