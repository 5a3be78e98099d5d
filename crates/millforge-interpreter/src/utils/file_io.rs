//! Reading G-code programs
//!
//! Programs are streamed line by line; each non-empty line is one statement.
//! A UTF-8 byte order mark is dropped and `%` tape markers are skipped.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

/// Buffer size for reading large programs (256 KB)
const READ_BUFFER_SIZE: usize = 256 * 1024;

const BOM: char = '\u{feff}';

/// Whether to keep reading after a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Counters of one read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramStats {
    /// Lines read, including blank lines and tape markers
    pub lines_read: u64,
    /// Lines handed to the callback
    pub statements: u64,
    pub bytes_read: u64,
    /// Reading ended because the callback returned [`Flow::Stop`]
    pub stopped: bool,
}

/// A G-code program on disk
pub struct ProgramReader {
    path: PathBuf,
    file_size: u64,
}

impl ProgramReader {
    /// Open a program file
    ///
    /// # Errors
    /// Returns error if the path does not exist or is not a file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {}", path.display()));
        }
        if !path.is_file() {
            return Err(anyhow!("Path is not a file: {}", path.display()));
        }

        let file_size = fs::metadata(&path)?.len();
        Ok(Self { path, file_size })
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream the statements of the program into `callback`
    ///
    /// `callback` gets the 1-based line number and the statement text.
    pub fn read_statements<F>(&self, callback: F) -> Result<ProgramStats>
    where
        F: FnMut(u64, &str) -> Result<Flow>,
    {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), size = self.file_size, "reading program");
        read_statements(BufReader::with_capacity(READ_BUFFER_SIZE, file), callback)
    }
}

/// Stream statements from any buffered source, e.g. stdin
pub fn read_statements<R, F>(reader: R, mut callback: F) -> Result<ProgramStats>
where
    R: BufRead,
    F: FnMut(u64, &str) -> Result<Flow>,
{
    let mut stats = ProgramStats::default();

    for line in reader.lines() {
        let line = line?;
        stats.lines_read += 1;
        stats.bytes_read += line.len() as u64 + 1;

        let text = if stats.lines_read == 1 {
            line.trim_start_matches(BOM)
        } else {
            line.as_str()
        };
        let text = text.trim();
        if text.is_empty() || text == "%" {
            continue;
        }

        stats.statements += 1;
        if callback(stats.lines_read, text)? == Flow::Stop {
            stats.stopped = true;
            break;
        }
    }

    Ok(stats)
}
