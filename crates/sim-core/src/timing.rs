use crate::encoding::InstructionClass;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Configured cycle cost per instruction class.
///
/// Halt and invalid encodings always cost zero cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CycleCostTable {
    /// Register-register cost.
    pub r: u32,
    /// Register-immediate, load and `jalr` cost.
    pub i: u32,
    /// Store cost.
    pub s: u32,
    /// Conditional branch cost.
    pub b: u32,
    /// `jal` cost.
    pub j: u32,
}

impl CycleCostTable {
    /// Builds a table from costs listed in `R, I, S, B, J` order.
    #[must_use]
    pub const fn new(r: u32, i: u32, s: u32, b: u32, j: u32) -> Self {
        Self { r, i, s, b, j }
    }

    /// Looks up the cycle cost for an instruction class.
    #[must_use]
    pub const fn cost(&self, class: InstructionClass) -> u32 {
        match class {
            InstructionClass::R => self.r,
            InstructionClass::I => self.i,
            InstructionClass::S => self.s,
            InstructionClass::B => self.b,
            InstructionClass::J => self.j,
            InstructionClass::Halt | InstructionClass::Invalid => 0,
        }
    }

    /// Mutable access to the cost slot of a costed class.
    pub fn cost_mut(&mut self, class: InstructionClass) -> Option<&mut u32> {
        match class {
            InstructionClass::R => Some(&mut self.r),
            InstructionClass::I => Some(&mut self.i),
            InstructionClass::S => Some(&mut self.s),
            InstructionClass::B => Some(&mut self.b),
            InstructionClass::J => Some(&mut self.j),
            InstructionClass::Halt | InstructionClass::Invalid => None,
        }
    }
}

/// Processor performance configuration: clock frequency plus class costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PerfConfig {
    /// Clock frequency in MHz.
    pub frequency_mhz: u32,
    /// Cycle cost per class.
    pub costs: CycleCostTable,
}

impl PerfConfig {
    /// Creates a configuration from a frequency and a cost table.
    #[must_use]
    pub const fn new(frequency_mhz: u32, costs: CycleCostTable) -> Self {
        Self {
            frequency_mhz,
            costs,
        }
    }

    /// Seconds taken by `cycles` at this frequency, or `None` at 0 MHz.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn execution_time_secs(&self, cycles: u64) -> Option<f64> {
        if self.frequency_mhz == 0 {
            return None;
        }
        let cycle_time = 1.0 / (f64::from(self.frequency_mhz) * MICROS_PER_SECOND);
        Some(cycles as f64 * cycle_time)
    }
}

/// Retired-instruction and cycle accounting for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PerfCounters {
    /// Total cycles charged.
    pub cycles: u64,
    /// Instructions retired, halt excluded.
    pub instructions: u64,
    /// Per-bucket retirement counts in `R, I, S, B, J` order.
    per_class: [u64; 5],
}

impl PerfCounters {
    /// Charges one retired instruction at `cycles`.
    ///
    /// `cost_class` is the bucket the instruction counts under; `None` (or
    /// an uncosted class) still counts the instruction but no bucket.
    pub fn record(&mut self, cost_class: Option<InstructionClass>, cycles: u32) {
        self.cycles = self.cycles.saturating_add(u64::from(cycles));
        self.instructions = self.instructions.saturating_add(1);
        if let Some(slot) = cost_class.and_then(class_slot) {
            self.per_class[slot] = self.per_class[slot].saturating_add(1);
        }
    }

    /// Number of retired instructions of `class`.
    #[must_use]
    pub fn class_count(&self, class: InstructionClass) -> u64 {
        class_slot(class).map_or(0, |slot| self.per_class[slot])
    }

    /// Retired instructions outside every bucket: `srai` and stalled
    /// invalid opcodes.
    #[must_use]
    pub fn unclassified(&self) -> u64 {
        let bucketed: u64 = self.per_class.iter().sum();
        self.instructions.saturating_sub(bucketed)
    }

    /// Per-class counts in `R, I, S, B, J` order.
    pub fn by_class(&self) -> impl Iterator<Item = (InstructionClass, u64)> + '_ {
        InstructionClass::COSTED
            .into_iter()
            .map(|class| (class, self.class_count(class)))
    }
}

const fn class_slot(class: InstructionClass) -> Option<usize> {
    match class {
        InstructionClass::R => Some(0),
        InstructionClass::I => Some(1),
        InstructionClass::S => Some(2),
        InstructionClass::B => Some(3),
        InstructionClass::J => Some(4),
        InstructionClass::Halt | InstructionClass::Invalid => None,
    }
}
