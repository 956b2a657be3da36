use crate::FaultCode;

/// Execution-state machine for the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next instruction.
    #[default]
    Running,
    /// Halt sentinel reached. Terminal until reset.
    Halted,
    /// A fatal fault stopped the run. Terminal until reset.
    FaultLatched(FaultCode),
}

impl RunState {
    /// Returns the currently latched fault, if this state is fault-latched.
    #[must_use]
    pub const fn latched_fault(self) -> Option<FaultCode> {
        match self {
            Self::FaultLatched(cause) => Some(cause),
            Self::Running | Self::Halted => None,
        }
    }
}
