//! Host-facing types for driving the core: configuration, state, outcomes,
//! and the loadable program image.

use crate::encoding::InstructionClass;
use crate::memory::{new_address_space, write_u32_be};
use crate::timing::{PerfConfig, PerfCounters};
use crate::{ArchitecturalState, Fault, FaultCode, RunState};

/// What the engine does when it fetches an opcode outside the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InvalidOpcodePolicy {
    /// Latch an `IllegalInstruction` fault and stop the run.
    #[default]
    Fault,
    /// Leave all state untouched and keep re-fetching the same word.
    ///
    /// Only terminates when a step budget is configured.
    Stall,
}

/// Top-level configuration for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SimConfig {
    /// Frequency and per-class cycle costs.
    pub perf: PerfConfig,
    /// Handling of unrecognized opcodes.
    pub invalid_opcode: InvalidOpcodePolicy,
    /// Maximum number of steps a run may take, counting stalls.
    pub step_budget: Option<u64>,
}

impl SimConfig {
    /// Creates a configuration with default policies around `perf`.
    #[must_use]
    pub const fn with_perf(perf: PerfConfig) -> Self {
        Self {
            perf,
            invalid_opcode: InvalidOpcodePolicy::Fault,
            step_budget: None,
        }
    }
}

/// Complete simulation state: registers, PC, memory, run state, counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreState {
    /// Register file and program counter.
    pub arch: ArchitecturalState,
    /// Flat 1 MiB memory image.
    pub memory: Box<[u8]>,
    /// Current execution state.
    pub run_state: RunState,
    /// Cycle and instruction accounting.
    pub counters: PerfCounters,
}

impl Default for CoreState {
    fn default() -> Self {
        Self {
            arch: ArchitecturalState::default(),
            memory: new_address_space(),
            run_state: RunState::Running,
            counters: PerfCounters::default(),
        }
    }
}

impl CoreState {
    /// Zeroes registers, PC, memory and counters, and resumes running.
    pub fn reset(&mut self) {
        self.arch = ArchitecturalState::default();
        self.memory.fill(0);
        self.run_state = RunState::Running;
        self.counters = PerfCounters::default();
    }

    /// Writes every word of `image` into memory.
    ///
    /// # Errors
    ///
    /// Returns a `StoreOutOfBounds` fault naming the first word that does not
    /// fit. Words before it are already written.
    pub fn load_image(&mut self, image: &ProgramImage) -> Result<(), Fault> {
        for &(address, word) in image.words() {
            write_u32_be(&mut self.memory, address, word)
                .map_err(|code| Fault::new(code, self.arch.pc()).with_address(address))?;
        }
        Ok(())
    }

    /// Returns the latched fault code, if any.
    #[must_use]
    pub const fn latched_fault(&self) -> Option<FaultCode> {
        self.run_state.latched_fault()
    }
}

/// Result of a single engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StepOutcome {
    /// An instruction retired.
    Retired {
        /// Bucket the instruction was charged under, `None` for `srai`.
        cost_class: Option<InstructionClass>,
        /// Cycles charged.
        cycles: u32,
    },
    /// The halt sentinel was reached.
    Halted,
    /// An invalid opcode was counted at zero cycles without any other state
    /// change.
    Stalled {
        /// The unrecognized opcode field.
        opcode: u8,
    },
}

/// How a run loop ended without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunOutcome {
    /// The halt sentinel was reached.
    Halted,
    /// The configured step budget ran out first.
    StepBudgetExhausted {
        /// Steps taken, equal to the budget.
        steps: u64,
    },
}

/// A program as `(address, word)` pairs in load order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ProgramImage {
    words: Vec<(u32, u32)>,
}

impl ProgramImage {
    /// Creates an empty image.
    #[must_use]
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Appends one word. A later word at the same address overwrites an
    /// earlier one when loaded.
    pub fn push(&mut self, address: u32, word: u32) {
        self.words.push((address, word));
    }

    /// Words in load order.
    #[must_use]
    pub fn words(&self) -> &[(u32, u32)] {
        &self.words
    }

    /// Number of words in the image.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` when the image holds no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl FromIterator<(u32, u32)> for ProgramImage {
    fn from_iter<T: IntoIterator<Item = (u32, u32)>>(iter: T) -> Self {
        Self {
            words: iter.into_iter().collect(),
        }
    }
}

impl Extend<(u32, u32)> for ProgramImage {
    fn extend<T: IntoIterator<Item = (u32, u32)>>(&mut self, iter: T) {
        self.words.extend(iter);
    }
}
