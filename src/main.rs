use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use millforge::interpreter::ProgramReader;
use millforge::settings::{Config, MeasurementSystem};
use millforge::{build_interpreter, init_logging, run_source, Session};

#[derive(Parser)]
#[command(name = "millforge")]
#[command(about = "Run a G-code program against the simulated machine")]
#[command(version)]
struct Args {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of axes, overrides the configuration
    #[arg(short, long, value_name = "N")]
    axes: Option<usize>,

    /// Units in effect at startup: mm or inch
    #[arg(short, long, value_name = "UNITS")]
    units: Option<MeasurementSystem>,

    /// Program to run; reads stdin when omitted
    program: Option<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging()?;

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(axes) = args.axes {
        config.interpreter.axis_count = axes;
        if config.machine.axes.len() < axes {
            config.machine.axes.resize(axes, Default::default());
        }
    }
    if let Some(units) = args.units {
        config.interpreter.default_units = units;
    }
    config.validate()?;
    tracing::info!(axes = config.interpreter.axis_count, "starting");

    let stdout = io::stdout();
    let mut session = Session::new(build_interpreter(&config), BufWriter::new(stdout.lock()));

    let summary = match &args.program {
        Some(path) => {
            let reader = ProgramReader::new(path)?;
            reader.read_statements(|line_no, text| session.statement(line_no, text))?;
            session.summary()
        }
        None => run_source(&mut session, io::stdin().lock())?,
    };

    tracing::info!(
        statements = summary.statements,
        errors = summary.errors,
        "done"
    );
    if summary.killed {
        tracing::error!("machine killed");
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
