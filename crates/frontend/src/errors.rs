//! Error types for loading inputs and running the CLI.
//!
//! Load problems are per-line and recoverable: the loader records a
//! [`Diagnostic`] and skips the line. I/O failures and simulation faults end
//! the invocation as a [`CliError`].

use std::fmt;
use std::io;
use std::path::PathBuf;

use sim_core::SimError;
use thiserror::Error;

/// Why a single program or configuration line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The line ended before every required field was read.
    #[error("missing {0}")]
    MissingField(&'static str),
    /// The mnemonic is not in the opcode table.
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    /// A register operand is not `x0`..`x31`.
    #[error("invalid register `{0}`")]
    BadRegister(String),
    /// An immediate is not a hexadecimal number.
    #[error("invalid hexadecimal immediate `{0}`")]
    BadImmediate(String),
    /// The instruction address is not a decimal or `0x` hex number.
    #[error("invalid address `{0}`")]
    BadAddress(String),
    /// The instruction word would not fit inside memory.
    #[error("address {0:#x} is outside memory")]
    AddressOutOfRange(u32),
    /// Instruction addresses must be multiples of four.
    #[error("address {0:#x} is not word aligned")]
    MisalignedAddress(u32),
    /// More operands than the instruction takes.
    #[error("unexpected operand `{0}`")]
    TrailingOperand(String),
    /// A configuration key other than the frequency or a class name.
    #[error("unknown configuration key `{0}`")]
    UnknownConfigKey(String),
    /// A configuration value that is not a non-negative decimal integer.
    #[error("invalid configuration value `{0}`")]
    BadConfigValue(String),
}

/// A rejected input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-indexed line number.
    pub line: usize,
    /// The line as written.
    pub text: String,
    /// What was wrong with it.
    pub error: LoadError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} in `{}`", self.line, self.error, self.text.trim())
    }
}

/// Fatal errors for one CLI invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// An input file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// An output file could not be written.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The simulation faulted or could not be compared.
    #[error("simulation failed: {0}")]
    Sim(#[from] SimError),
    /// Writing to the console failed.
    #[error("cannot write output: {0}")]
    Output(#[source] io::Error),
}
