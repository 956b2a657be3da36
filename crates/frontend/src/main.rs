//! CLI entry point for the perfsim binary.

use std::env;
use std::io;
use std::path::Path;

use env_logger as _;
use frontend::cli::{init_logging, parse_args, run_command, USAGE_TEXT};
use log as _;
#[cfg(test)]
use rstest as _;
use sim_core as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;

fn main() {
    init_logging();

    let Some(command) = parse_args(env::args_os().skip(1)) else {
        eprintln!("{USAGE_TEXT}");
        std::process::exit(1);
    };

    let stdout = io::stdout();
    let stderr = io::stderr();
    let result = run_command(
        &command,
        Path::new("."),
        &mut stdout.lock(),
        &mut stderr.lock(),
    );

    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
