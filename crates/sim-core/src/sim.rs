//! Simulation driver: single runs and two-configuration comparisons.

use std::fmt;

use log::{debug, info};
use thiserror::Error;

use crate::execute::run;
use crate::state::GENERAL_REGISTER_COUNT;
use crate::timing::{PerfConfig, PerfCounters};
use crate::{CoreState, Fault, ProgramImage, RunOutcome, SimConfig};

/// Errors a simulation run can end with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimError {
    /// The program faulted.
    #[error(transparent)]
    Fault(#[from] Fault),
    /// A comparison needs execution times, but a configuration runs at 0 MHz.
    #[error("execution time is undefined for configuration {label} (frequency 0 MHz)")]
    UndefinedExecutionTime {
        /// Which configuration, `A` or `B`.
        label: ConfigLabel,
    },
}

/// Names one side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ConfigLabel {
    /// The first configuration.
    A,
    /// The second configuration.
    B,
}

impl fmt::Display for ConfigLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::B => "B",
        })
    }
}

/// Summary of one finished run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Cycles, instructions and per-class counts.
    pub counters: PerfCounters,
    /// Wall time at the configured frequency; `None` at 0 MHz.
    pub execution_time_secs: Option<f64>,
    /// Final register values in index order.
    pub registers: [i32; GENERAL_REGISTER_COUNT],
}

/// Owns one core and runs programs on it.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    state: CoreState,
    config: SimConfig,
}

impl Simulator {
    /// Creates a simulator with zeroed state.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            state: CoreState::default(),
            config,
        }
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replaces the performance model used by subsequent runs.
    pub fn set_perf(&mut self, perf: PerfConfig) {
        self.config.perf = perf;
    }

    /// Read access to the core.
    #[must_use]
    pub const fn state(&self) -> &CoreState {
        &self.state
    }

    /// Mutable access to the core, for presetting registers or memory.
    pub fn state_mut(&mut self) -> &mut CoreState {
        &mut self.state
    }

    /// Zeroes registers, PC, memory and counters.
    pub fn reset(&mut self) {
        debug!("reset core state");
        self.state.reset();
    }

    /// Writes `image` into memory on top of the current state.
    ///
    /// # Errors
    ///
    /// Returns a fault when a word lies outside memory.
    pub fn load_image(&mut self, image: &ProgramImage) -> Result<(), Fault> {
        debug!("loading {} program words", image.len());
        self.state.load_image(image)
    }

    /// Runs from the current PC until halt or the step budget.
    ///
    /// # Errors
    ///
    /// Returns the fault that stopped the run.
    pub fn run(&mut self) -> Result<RunReport, SimError> {
        let outcome = run(&mut self.state, &self.config)?;
        let counters = self.state.counters;
        info!(
            "run finished: {outcome:?}, {} instructions, {} cycles",
            counters.instructions, counters.cycles
        );

        Ok(RunReport {
            outcome,
            counters,
            execution_time_secs: self.config.perf.execution_time_secs(counters.cycles),
            registers: *self.state.arch.registers(),
        })
    }

    /// Resets the core, loads `image`, and runs it.
    ///
    /// # Errors
    ///
    /// Returns a fault raised while loading or running.
    pub fn run_program(&mut self, image: &ProgramImage) -> Result<RunReport, SimError> {
        self.reset();
        self.load_image(image)?;
        self.run()
    }

    /// Runs `image` under `a`, resets, then runs it again under `b`.
    ///
    /// Both runs share this simulator's policies and step budget.
    ///
    /// # Errors
    ///
    /// Returns the first fault, or [`SimError::UndefinedExecutionTime`] when
    /// either configuration runs at 0 MHz.
    pub fn compare(
        &mut self,
        image: &ProgramImage,
        a: PerfConfig,
        b: PerfConfig,
    ) -> Result<Comparison, SimError> {
        self.set_perf(a);
        let first = self.run_program(image)?;
        self.set_perf(b);
        let second = self.run_program(image)?;

        Comparison::new(first, second)
    }
}

/// Single run of `image` on a fresh simulator.
///
/// # Errors
///
/// Returns the fault that stopped the run.
pub fn run_program(image: &ProgramImage, config: SimConfig) -> Result<RunReport, SimError> {
    Simulator::new(config).run_program(image)
}

/// Compares two performance configurations on `image` with default policies.
///
/// # Errors
///
/// See [`Simulator::compare`].
pub fn compare(image: &ProgramImage, a: PerfConfig, b: PerfConfig) -> Result<Comparison, SimError> {
    Simulator::default().compare(image, a, b)
}

/// Outcome of running one program under two configurations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Comparison {
    /// Report for configuration A.
    pub a: RunReport,
    /// Report for configuration B.
    pub b: RunReport,
    time_a: f64,
    time_b: f64,
}

impl Comparison {
    /// Builds a comparison from two reports.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UndefinedExecutionTime`] when a report has no
    /// execution time.
    pub fn new(a: RunReport, b: RunReport) -> Result<Self, SimError> {
        let time_a = a.execution_time_secs.ok_or(SimError::UndefinedExecutionTime {
            label: ConfigLabel::A,
        })?;
        let time_b = b.execution_time_secs.ok_or(SimError::UndefinedExecutionTime {
            label: ConfigLabel::B,
        })?;

        Ok(Self {
            a,
            b,
            time_a,
            time_b,
        })
    }

    /// The faster configuration. Ties go to `B`.
    #[must_use]
    pub fn winner(&self) -> ConfigLabel {
        if self.time_a < self.time_b {
            ConfigLabel::A
        } else {
            ConfigLabel::B
        }
    }

    /// Slower time divided by faster time; 1.0 on a tie.
    #[must_use]
    pub fn speedup(&self) -> f64 {
        let (slower, faster) = match self.winner() {
            ConfigLabel::A => (self.time_b, self.time_a),
            ConfigLabel::B => (self.time_a, self.time_b),
        };
        if slower <= faster {
            1.0
        } else {
            slower / faster
        }
    }

    /// Execution time of configuration `label`.
    #[must_use]
    pub const fn time(&self, label: ConfigLabel) -> f64 {
        match label {
            ConfigLabel::A => self.time_a,
            ConfigLabel::B => self.time_b,
        }
    }
}
