//! Core crate for perfsim: instruction codec, execution engine, and CPI
//! performance model for a small 32-bit load/store ISA.

/// Opcode table, instruction classes and field layouts.
pub mod encoding;
pub use encoding::{
    classify_opcode, opcode_for_mnemonic, InstructionClass, InstructionFormat, Opcode,
    HALT_MNEMONIC, HALT_WORD, OPCODE_TABLE,
};

/// Instruction word codec and the tagged instruction type.
pub mod decoder;
pub use decoder::{
    encode_word, AccessWidth, BranchCondition, DecodedInstruction, Decoder, ImmediateOp,
    Instruction, OperandFields, RegisterOp,
};

/// Listing-syntax disassembly.
pub mod disasm;
pub use disasm::{disassemble_one, disassemble_range, DisassemblyRow};

/// Fault taxonomy.
pub mod fault;
pub use fault::{Fault, FaultClass, FaultCode};

/// Flat memory model and bounds-checked accessors.
pub mod memory;
pub use memory::{
    new_address_space, read_u32_be, read_u8, validate_access, validate_fetch, write_u32_be,
    write_u8, MEMORY_BYTES, WORD_ACCESS_BYTES,
};

/// Architectural state: register file, PC and run state.
pub mod state;
pub use state::{ArchitecturalState, GeneralRegister, RunState, GENERAL_REGISTER_COUNT};

/// Cycle cost table, performance configuration and counters.
pub mod timing;
pub use timing::{CycleCostTable, PerfConfig, PerfCounters};

/// Host-facing configuration, core state and outcome types.
pub mod api;
pub use api::{CoreState, InvalidOpcodePolicy, ProgramImage, RunOutcome, SimConfig, StepOutcome};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{commit_execution, execute_instruction, run, step_one, ExecuteState};

/// Simulation driver.
pub mod sim;
pub use sim::{compare, run_program, Comparison, ConfigLabel, RunReport, SimError, Simulator};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
