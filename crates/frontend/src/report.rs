//! Result reporting: the register dump file and console summaries.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use sim_core::{Comparison, ConfigLabel, RunOutcome, RunReport};

use crate::errors::CliError;

/// File name of the register dump written after a single run.
pub const REGISTER_DUMP_FILE: &str = "registers.txt";

/// Renders registers as `Register[<i>]: <value>`, one per line.
#[must_use]
pub fn format_register_dump(registers: &[i32]) -> String {
    registers
        .iter()
        .enumerate()
        .fold(String::new(), |mut out, (index, value)| {
            let _ = writeln!(out, "Register[{index}]: {value}");
            out
        })
}

/// Writes the register dump to `path`.
///
/// # Errors
///
/// Returns [`CliError::Write`] when the file cannot be written.
pub fn write_register_dump(path: &Path, registers: &[i32]) -> Result<(), CliError> {
    fs::write(path, format_register_dump(registers)).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Renders the single-run summary printed to stdout.
#[must_use]
pub fn format_run_summary(report: &RunReport) -> String {
    let counters = &report.counters;
    let mut out = String::new();

    if let RunOutcome::StepBudgetExhausted { steps } = report.outcome {
        let _ = writeln!(out, "Stopped: step budget of {steps} exhausted before halt");
    }
    let _ = writeln!(out, "Total cycles: {}", counters.cycles);
    let _ = writeln!(out, "Total instructions: {}", counters.instructions);
    match report.execution_time_secs {
        Some(secs) => {
            let _ = writeln!(out, "Total execution time: {secs} seconds");
        }
        None => {
            let _ = writeln!(out, "Total execution time: undefined (frequency is 0 MHz)");
        }
    }

    let mut per_class = counters
        .by_class()
        .map(|(class, count)| format!("{}={count}", class.label()))
        .collect::<Vec<_>>()
        .join(" ");
    let unclassified = counters.unclassified();
    if unclassified > 0 {
        let _ = write!(per_class, " unclassified={unclassified}");
    }
    let _ = writeln!(out, "Instructions by class: {per_class}");
    out
}

/// Renders the comparison sentence, naming each configuration by `names`.
#[must_use]
pub fn format_comparison(comparison: &Comparison, names: [&str; 2]) -> String {
    let (winner, loser) = match comparison.winner() {
        ConfigLabel::A => (names[0], names[1]),
        ConfigLabel::B => (names[1], names[0]),
    };
    format!(
        "Configuration {winner} performs {} times better than configuration {loser}.\n\
         Execution time: {} seconds ({}), {} seconds ({})\n",
        comparison.speedup(),
        comparison.time(ConfigLabel::A),
        names[0],
        comparison.time(ConfigLabel::B),
        names[1],
    )
}

#[cfg(test)]
mod tests {
    use sim_core::{
        Comparison, CycleCostTable, InstructionClass, PerfConfig, PerfCounters, RunOutcome,
        RunReport,
    };

    use super::{format_comparison, format_register_dump, format_run_summary};

    fn report(frequency_mhz: u32) -> RunReport {
        let mut counters = PerfCounters::default();
        counters.record(Some(InstructionClass::R), 1);
        counters.record(Some(InstructionClass::I), 2);
        counters.record(Some(InstructionClass::I), 2);
        let perf = PerfConfig::new(frequency_mhz, CycleCostTable::default());

        let mut registers = [0; 32];
        registers[3] = 8;
        registers[31] = -1;
        RunReport {
            outcome: RunOutcome::Halted,
            counters,
            execution_time_secs: perf.execution_time_secs(counters.cycles),
            registers,
        }
    }

    #[test]
    fn register_dump_lists_every_register() {
        let dump = format_register_dump(&report(1).registers);
        let lines: Vec<_> = dump.lines().collect();

        assert_eq!(lines.len(), 32);
        assert_eq!(lines[0], "Register[0]: 0");
        assert_eq!(lines[3], "Register[3]: 8");
        assert_eq!(lines[31], "Register[31]: -1");
    }

    #[test]
    fn summary_lists_totals_and_classes() {
        let report = report(1);
        let summary = format_run_summary(&report);
        let secs = report.execution_time_secs.expect("1 MHz");

        assert!(summary.contains("Total cycles: 5\n"));
        assert!(summary.contains("Total instructions: 3\n"));
        assert!(summary.contains(&format!("Total execution time: {secs} seconds\n")));
        assert!(summary.contains("Instructions by class: R=1 I=2 S=0 B=0 J=0\n"));
        assert!(!summary.contains("Stopped"));
    }

    #[test]
    fn summary_lists_bucketless_instructions() {
        let mut report = report(1);
        report.counters.record(None, 0);

        let summary = format_run_summary(&report);

        assert!(summary.contains("Total instructions: 4\n"));
        assert!(summary.contains("Instructions by class: R=1 I=2 S=0 B=0 J=0 unclassified=1\n"));
    }

    #[test]
    fn summary_marks_undefined_time_and_budget_stop() {
        let mut report = report(0);
        report.outcome = RunOutcome::StepBudgetExhausted { steps: 10 };

        let summary = format_run_summary(&report);

        assert!(summary.starts_with("Stopped: step budget of 10 exhausted before halt\n"));
        assert!(summary.contains("Total execution time: undefined (frequency is 0 MHz)\n"));
    }

    #[test]
    fn comparison_names_the_faster_configuration() {
        let slow = report(1);
        let fast = RunReport {
            execution_time_secs: slow.execution_time_secs.map(|secs| secs / 2.0),
            ..slow.clone()
        };
        let comparison = Comparison::new(slow, fast).expect("both defined");

        let text = format_comparison(&comparison, ["a.txt", "b.txt"]);

        assert!(text.starts_with("Configuration b.txt performs 2 times better than configuration a.txt.\n"));
    }
}
