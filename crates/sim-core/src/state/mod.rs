//! Architectural CPU state model primitives.

/// Architectural register file types and storage model.
pub mod registers;
/// Run-loop state machine.
pub mod run_state;

pub use registers::{ArchitecturalState, GeneralRegister, GENERAL_REGISTER_COUNT};
pub use run_state::RunState;
