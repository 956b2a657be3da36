//! Command-line surface: argument parsing and command execution.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use sim_core::{SimConfig, Simulator};

use crate::config::load_config;
use crate::errors::{CliError, Diagnostic};
use crate::program::load_program;
use crate::report::{
    format_comparison, format_run_summary, write_register_dump, REGISTER_DUMP_FILE,
};

/// Usage text printed for any unsupported argument list.
pub const USAGE_TEXT: &str = "\
Usage: perfsim <program> <config> [<config-b>]

  perfsim <program> <config>
      Run the program once, print cycles, instructions and execution time,
      and write final register values to registers.txt.

  perfsim <program> <config-a> <config-b>
      Run the program under both configurations and report which is faster.

Logging is controlled by RUST_LOG (for example RUST_LOG=trace).
";

/// A parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// One program under one configuration.
    Single {
        /// Program listing.
        program: PathBuf,
        /// Processor configuration.
        config: PathBuf,
    },
    /// One program under two configurations.
    Compare {
        /// Program listing.
        program: PathBuf,
        /// Configurations A and B.
        configs: [PathBuf; 2],
    },
}

/// Parses positional arguments (program name already removed).
///
/// Returns `None` for any count other than two or three.
#[must_use]
pub fn parse_args(args: impl IntoIterator<Item = OsString>) -> Option<Command> {
    let mut paths: Vec<PathBuf> = args.into_iter().map(PathBuf::from).collect();
    match paths.len() {
        2 => {
            let config = paths.pop()?;
            let program = paths.pop()?;
            Some(Command::Single { program, config })
        }
        3 => {
            let config_b = paths.pop()?;
            let config_a = paths.pop()?;
            let program = paths.pop()?;
            Some(Command::Compare {
                program,
                configs: [config_a, config_b],
            })
        }
        _ => None,
    }
}

/// Installs the `env_logger` backend. `RUST_LOG` selects the level; logging
/// is off when it is unset.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off"))
        .try_init();
}

/// Runs `command`, writing results to `out` and load diagnostics to `err`.
///
/// A single run writes its register dump into `dump_dir`.
///
/// # Errors
///
/// Returns the first fatal I/O or simulation error.
pub fn run_command(
    command: &Command,
    dump_dir: &Path,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Single { program, config } => {
            let loaded = load_config(config)?;
            report_diagnostics(err, config, &loaded.diagnostics)?;
            let listing = load_program(program)?;
            report_diagnostics(err, program, &listing.diagnostics)?;

            info!("running {} with {}", program.display(), config.display());
            let report = Simulator::new(SimConfig::with_perf(loaded.config))
                .run_program(&listing.image)?;

            write_register_dump(&dump_dir.join(REGISTER_DUMP_FILE), &report.registers)?;
            out.write_all(format_run_summary(&report).as_bytes())
                .map_err(CliError::Output)
        }
        Command::Compare { program, configs } => {
            let [path_a, path_b] = configs;
            let config_a = load_config(path_a)?;
            report_diagnostics(err, path_a, &config_a.diagnostics)?;
            let config_b = load_config(path_b)?;
            report_diagnostics(err, path_b, &config_b.diagnostics)?;
            let listing = load_program(program)?;
            report_diagnostics(err, program, &listing.diagnostics)?;

            info!(
                "comparing {} under {} and {}",
                program.display(),
                path_a.display(),
                path_b.display()
            );
            let comparison =
                Simulator::default().compare(&listing.image, config_a.config, config_b.config)?;

            let names = [path_a.display().to_string(), path_b.display().to_string()];
            let text = format_comparison(&comparison, [&names[0], &names[1]]);
            out.write_all(text.as_bytes()).map_err(CliError::Output)
        }
    }
}

fn report_diagnostics(
    err: &mut dyn Write,
    path: &Path,
    diagnostics: &[Diagnostic],
) -> Result<(), CliError> {
    for diagnostic in diagnostics {
        writeln!(err, "warning: {}: {diagnostic}", path.display()).map_err(CliError::Output)?;
    }
    Ok(())
}
