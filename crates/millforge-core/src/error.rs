//! Error handling for Millforge
//!
//! Provides the error types for every layer of the interpreter:
//! - G-Code errors (statement parsing, validation, parameters, cycles, probing)
//! - Machine errors (collaborator failures and kill requests)
//!
//! All error types use `thiserror` for ergonomic error handling. Every
//! variant of [`GcodeError`] is a message key: it aborts the rest of the
//! statement it was raised in and is reported to the display collaborator.

use thiserror::Error;

/// G-Code error type
///
/// Represents errors raised while interpreting a single statement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeError {
    /// Letter at the start of a token is not a known command
    #[error("Unknown command '{letter}'")]
    UnknownCommand {
        /// The offending letter.
        letter: char,
    },

    /// G or M code that no dispatch layer handles
    #[error("Unsupported {letter}-code: {code}")]
    UnsupportedCode {
        /// Either 'G' or 'M'.
        letter: char,
        /// The numeric code.
        code: u16,
    },

    /// Code is recognized but not implemented by this controller
    #[error("{letter}{code} is not implemented")]
    NotImplemented {
        /// Either 'G' or 'M'.
        letter: char,
        /// The numeric code including the sub-code, e.g. "68.16".
        code: String,
    },

    /// Bare axis words without a modal motion or cycle command to repeat
    #[error("No modal command to repeat")]
    NoModalCommand,

    /// Something other than blank or comment follows a complete command
    #[error("Unexpected token '{found}' at end of command")]
    UnexpectedToken {
        /// The first unexpected character.
        found: char,
    },

    /// A number was expected
    #[error("Number expected after '{letter}'")]
    NumberExpected {
        /// Letter the number belongs to.
        letter: char,
    },

    /// Value does not fit the expected integer range
    #[error("Value out of range for '{letter}'")]
    ValueOutOfRange {
        /// Letter the value belongs to.
        letter: char,
    },

    /// Letter given twice in one statement
    #[error("{letter} already specified")]
    AlreadySpecified {
        /// The duplicated letter.
        letter: char,
    },

    /// Required letter missing from statement
    #[error("{letter} expected")]
    LetterExpected {
        /// The missing letter.
        letter: char,
    },

    /// Named parameter must start with a letter
    #[error("Variable name must start with a letter")]
    VariableMustStartWithAlpha,

    /// Malformed parameter reference
    #[error("No valid variable name")]
    NoValidVariableName,

    /// Named parameter is not in the parameter table
    #[error("Parameter does not exist")]
    ParameterDoesntExist,

    /// Parameter key resolves to nothing readable
    #[error("Parameter not found")]
    ParameterNotFound,

    /// Write to a read-only parameter
    #[error("Parameter is read-only")]
    ParameterReadOnly,

    /// Write to a key outside every table range
    #[error("Unsupported parameter number {key}")]
    UnsupportedParameterNumber {
        /// The parameter key.
        key: u16,
    },

    /// '=' missing in a parameter assignment
    #[error("'=' expected")]
    EqExpected,

    /// Delegated expression evaluator failed
    #[error("Expression error: {reason}")]
    Expression {
        /// Evaluator message.
        reason: String,
    },

    /// G10 L value other than 2
    #[error("Unsupported L value")]
    UnsupportedLValue,

    /// Work offset index beyond the configured table
    #[error("Unsupported coordinate system, use G54..G{max_code}")]
    UnsupportedCoordinateSystem {
        /// Highest supported G-code of the G54 family.
        max_code: u8,
    },

    /// Canned-cycle repeat count out of range
    #[error("L must be 1..255")]
    LMustBe1To255,

    /// Peck increment must be positive
    #[error("Q must be a positive number")]
    QMustBePositive,

    /// Peck cycle without any peck increment
    #[error("Q must not be 0")]
    QMustNotBe0,

    /// Retract plane outside the current/bottom interval
    #[error("R must be between current position and bottom")]
    RMustBeBetweenCurrentAndBottom,

    /// Rotation vector of zero length
    #[error("IJK vector is 0")]
    IjkVectorIsZero,

    /// Tool id not in the tool table
    #[error("No valid tool {tool}")]
    NoValidTool {
        /// The tool id.
        tool: u16,
    },

    /// Probe move ended without the expected transition
    #[error("Probe failed: {reason}")]
    ProbeFailed {
        /// Why the probe failed.
        reason: String,
    },

    /// Generic G-Code error
    #[error("G-Code error: {message}")]
    Other {
        /// The error message.
        message: String,
    },
}

impl GcodeError {
    /// Convenience constructor for not-implemented codes
    pub fn not_implemented(letter: char, code: impl Into<String>) -> Self {
        GcodeError::NotImplemented {
            letter,
            code: code.into(),
        }
    }

    /// Convenience constructor for duplicated letters
    pub fn already_specified(letter: char) -> Self {
        GcodeError::AlreadySpecified {
            letter: letter.to_ascii_uppercase(),
        }
    }
}

/// Machine error type
///
/// Represents failures of the collaborators the interpreter drives.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MachineError {
    /// Kill requested; machine forced into a safe state
    #[error("Machine killed")]
    Killed,

    /// Motion layer refused a request
    #[error("Motion rejected: {reason}")]
    MotionRejected {
        /// The reason the request was rejected.
        reason: String,
    },

    /// IO channel not wired on this machine
    #[error("IO channel {channel} not available")]
    IoUnavailable {
        /// The channel name.
        channel: String,
    },
}

/// Main error type for Millforge
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// G-Code error
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Machine error
    #[error(transparent)]
    Machine(#[from] MachineError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this error was caused by a kill request
    pub fn is_kill(&self) -> bool {
        matches!(self, Error::Machine(MachineError::Killed))
    }

    /// Check if this is a G-Code error
    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
