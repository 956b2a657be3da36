//! Front end for the perfsim simulator: program and configuration loaders,
//! result reporting, and the command-line driver.

#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;

/// Argument parsing and command execution.
pub mod cli;
/// Processor configuration loader.
pub mod config;
/// Load diagnostics and fatal CLI errors.
pub mod errors;
/// Program listing loader.
pub mod program;
/// Register dump and console summaries.
pub mod report;
