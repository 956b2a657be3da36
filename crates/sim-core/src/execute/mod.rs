//! Instruction execution pipeline.
//!
//! A step fetches the word at PC, decodes it, and hands the tagged
//! instruction to [`execute_instruction`], which reads operands and computes
//! every effect into an [`ExecuteState`] without touching the core.
//! [`commit_execution`] applies those effects only after the whole
//! instruction succeeded, so a faulting load or store leaves registers,
//! memory, and PC exactly as they were.

mod helpers;

pub use helpers::{
    branch_taken, effective_address, immediate_op, link_value, pc_relative_target, register_op,
    INSTRUCTION_BYTES,
};

use log::{debug, trace, warn};

use crate::decoder::{AccessWidth, Decoder, Instruction};
use crate::encoding::InstructionClass;
use crate::memory::{read_u32_be, read_u8, validate_access, validate_fetch, write_u32_be, write_u8};
use crate::{
    CoreState, Fault, FaultCode, GeneralRegister, InvalidOpcodePolicy, RunOutcome, RunState,
    SimConfig, StepOutcome,
};

/// A memory write waiting for commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStore {
    /// Validated byte address.
    pub address: u32,
    /// Bytes written.
    pub width: AccessWidth,
    /// Value to write; a byte store keeps the low eight bits.
    pub value: u32,
}

/// Side effects of one instruction, computed before anything is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteState {
    /// Destination register write.
    pub dest: Option<(GeneralRegister, i32)>,
    /// Memory write.
    pub store: Option<PendingStore>,
    /// PC after commit.
    pub next_pc: u32,
}

impl ExecuteState {
    /// An effect set that only advances PC to `next_pc`.
    #[must_use]
    pub const fn advance(next_pc: u32) -> Self {
        Self {
            dest: None,
            store: None,
            next_pc,
        }
    }

    const fn write(mut self, rd: GeneralRegister, value: i32) -> Self {
        self.dest = Some((rd, value));
        self
    }
}

/// Computes the effects of `instruction` at the current PC.
///
/// Reads `state` only. Halt produces no effects and leaves PC in place.
///
/// # Errors
///
/// Returns a fault for out-of-bounds loads and stores, and an
/// `IllegalInstruction` fault for invalid encodings.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn execute_instruction(
    instruction: &Instruction,
    state: &CoreState,
) -> Result<ExecuteState, Fault> {
    let pc = state.arch.pc();
    let next_pc = pc.wrapping_add(INSTRUCTION_BYTES);
    let reg = |r: GeneralRegister| state.arch.gpr(r);
    let fault = |code: FaultCode, address: u32| {
        Fault::new(code, pc)
            .with_address(address)
            .with_instruction(*instruction)
    };

    let exec = match *instruction {
        Instruction::Register { op, rd, rs1, rs2 } => {
            ExecuteState::advance(next_pc).write(rd, register_op(op, reg(rs1), reg(rs2)))
        }
        Instruction::Immediate { op, rd, rs1, imm } => {
            ExecuteState::advance(next_pc).write(rd, immediate_op(op, rs1, reg(rs1), imm))
        }
        Instruction::Jalr { rd, rs1, imm } => {
            // The link is written first, so `rd == rs1` jumps from the link.
            let link = link_value(pc);
            let base = if rd == rs1 { link } else { reg(rs1) };
            ExecuteState::advance(effective_address(base, imm)).write(rd, link)
        }
        Instruction::Branch {
            cond,
            rs1,
            rs2,
            imm,
        } => {
            if branch_taken(cond, reg(rs1), reg(rs2)) {
                ExecuteState::advance(pc_relative_target(pc, imm))
            } else {
                ExecuteState::advance(next_pc)
            }
        }
        Instruction::Jal { rd, imm } => {
            ExecuteState::advance(pc_relative_target(pc, imm)).write(rd, link_value(pc))
        }
        Instruction::Load {
            width,
            rd,
            rs1,
            imm,
        } => {
            let address = effective_address(reg(rs1), imm);
            let value = match width {
                AccessWidth::Byte => read_u8(&state.memory, address).map(|byte| i32::from(byte as i8)),
                AccessWidth::Word => read_u32_be(&state.memory, address).map(|word| word as i32),
            }
            .map_err(|code| fault(code, address))?;
            ExecuteState::advance(next_pc).write(rd, value)
        }
        Instruction::Store {
            width,
            rs1,
            rs2,
            imm,
        } => {
            let address = effective_address(reg(rs1), imm);
            validate_access(
                &state.memory,
                address,
                width.bytes(),
                FaultCode::StoreOutOfBounds,
            )
            .map_err(|code| fault(code, address))?;
            ExecuteState {
                store: Some(PendingStore {
                    address,
                    width,
                    value: reg(rs2) as u32,
                }),
                ..ExecuteState::advance(next_pc)
            }
        }
        Instruction::Halt => ExecuteState::advance(pc),
        Instruction::Invalid { .. } => {
            return Err(Fault::new(FaultCode::IllegalInstruction, pc).with_instruction(*instruction))
        }
    };

    Ok(exec)
}

/// Applies the effects computed by [`execute_instruction`].
///
/// The memory write happens first, then the register write, then PC.
///
/// # Errors
///
/// Returns a `StoreOutOfBounds` fault if the pending store no longer fits,
/// which only happens when `exec` was computed against different memory.
#[allow(clippy::cast_possible_truncation)]
pub fn commit_execution(state: &mut CoreState, exec: &ExecuteState) -> Result<(), Fault> {
    if let Some(store) = exec.store {
        let written = match store.width {
            AccessWidth::Byte => write_u8(&mut state.memory, store.address, store.value as u8),
            AccessWidth::Word => write_u32_be(&mut state.memory, store.address, store.value),
        };
        written.map_err(|code| Fault::new(code, state.arch.pc()).with_address(store.address))?;
    }

    if let Some((rd, value)) = exec.dest {
        state.arch.set_gpr(rd, value);
    }
    state.arch.set_pc(exec.next_pc);
    Ok(())
}

fn fetch(state: &CoreState, pc: u32) -> Result<u32, Fault> {
    validate_fetch(&state.memory, pc)
        .and_then(|_| read_u32_be(&state.memory, pc).map_err(|_| FaultCode::FetchOutOfBounds))
        .map_err(|code| Fault::new(code, pc).with_address(pc))
}

fn latch(state: &mut CoreState, fault: Fault) -> Fault {
    state.run_state = RunState::FaultLatched(fault.code);
    fault
}

/// Executes one instruction: fetch, decode, execute, commit, account.
///
/// A fault latches the core; later calls return the latched fault without
/// fetching. Once halted, further calls keep returning `Halted`.
///
/// # Errors
///
/// Returns the fault raised by fetch, execution, or an earlier step.
pub fn step_one(state: &mut CoreState, config: &SimConfig) -> Result<StepOutcome, Fault> {
    let pc = state.arch.pc();

    match state.run_state {
        RunState::Running => {}
        RunState::Halted => return Ok(StepOutcome::Halted),
        RunState::FaultLatched(code) => return Err(Fault::new(code, pc)),
    }

    let word = match fetch(state, pc) {
        Ok(word) => word,
        Err(fault) => return Err(latch(state, fault)),
    };
    let decoded = Decoder::decode(word);
    let instruction = decoded.instruction();

    match instruction {
        Instruction::Halt => {
            state.run_state = RunState::Halted;
            debug!(
                "halted at pc {pc:#07x} after {} instructions, {} cycles",
                state.counters.instructions, state.counters.cycles
            );
            return Ok(StepOutcome::Halted);
        }
        Instruction::Invalid { opcode, .. } if config.invalid_opcode == InvalidOpcodePolicy::Stall => {
            warn!("stalled on illegal opcode {opcode:#04x} at pc {pc:#07x}");
            state.counters.record(None, 0);
            return Ok(StepOutcome::Stalled { opcode });
        }
        _ => {}
    }

    let exec = match execute_instruction(&instruction, state) {
        Ok(exec) => exec,
        Err(fault) => return Err(latch(state, fault)),
    };
    if let Err(fault) = commit_execution(state, &exec) {
        return Err(latch(state, fault));
    }

    let cost_class = instruction.cost_class();
    let cycles = cost_class.map_or(0, |class| config.perf.costs.cost(class));
    state.counters.record(cost_class, cycles);
    trace!(
        "{pc:#07x}: {instruction} [{} +{cycles}]",
        cost_class.map_or("-", InstructionClass::label)
    );

    Ok(StepOutcome::Retired { cost_class, cycles })
}

/// Steps until halt, a fault, or the configured step budget.
///
/// Every step counts against the budget, including stalls and the step
/// that reaches halt.
///
/// # Errors
///
/// Returns the first fault raised.
pub fn run(state: &mut CoreState, config: &SimConfig) -> Result<RunOutcome, Fault> {
    let mut steps: u64 = 0;
    loop {
        if config.step_budget.is_some_and(|budget| steps >= budget) {
            warn!("step budget of {steps} exhausted at pc {:#07x}", state.arch.pc());
            return Ok(RunOutcome::StepBudgetExhausted { steps });
        }
        if step_one(state, config)? == StepOutcome::Halted {
            return Ok(RunOutcome::Halted);
        }
        steps += 1;
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::decoder::{encode_word, OperandFields};
    use crate::encoding::{InstructionClass, Opcode, HALT_WORD};
    use crate::memory::MEMORY_BYTES;
    use crate::timing::{CycleCostTable, PerfConfig};
    use crate::ProgramImage;

    fn x(index: u32) -> GeneralRegister {
        GeneralRegister::from_u5(index)
    }

    fn asm(opcode: Opcode, rd: u32, rs1: u32, rs2: u32, imm: u32) -> u32 {
        let format = opcode.class().format().expect("table opcode");
        let fields = OperandFields {
            rd: Some(x(rd)),
            rs1: Some(x(rs1)),
            rs2: Some(x(rs2)),
            imm: Some(imm),
        }
        .restricted_to(format);
        encode_word(format, opcode.as_u8(), fields)
    }

    fn config() -> SimConfig {
        SimConfig::with_perf(PerfConfig::new(1, CycleCostTable::new(1, 2, 3, 4, 5)))
    }

    fn core_with(words: &[u32]) -> CoreState {
        let mut state = CoreState::default();
        let image: ProgramImage = (0u32..)
            .map(|slot| slot * 4)
            .zip(words.iter().copied())
            .collect();
        state.load_image(&image).expect("program fits");
        state
    }

    #[test]
    fn register_op_writes_destination_and_advances() {
        let mut state = core_with(&[asm(Opcode::Add, 3, 1, 2, 0)]);
        state.arch.set_gpr(x(1), 5);
        state.arch.set_gpr(x(2), 3);

        let outcome = step_one(&mut state, &config()).expect("retires");

        assert_eq!(
            outcome,
            StepOutcome::Retired {
                cost_class: Some(InstructionClass::R),
                cycles: 1
            }
        );
        assert_eq!(state.arch.gpr(x(3)), 8);
        assert_eq!(state.arch.pc(), 4);
    }

    #[test]
    fn register_zero_is_writable() {
        let mut state = core_with(&[asm(Opcode::Addi, 0, 0, 0, 0x7)]);
        step_one(&mut state, &config()).expect("retires");
        assert_eq!(state.arch.gpr(GeneralRegister::X0), 7);
    }

    #[rstest]
    #[case(Opcode::Beq, 4, 4, true)]
    #[case(Opcode::Beq, 4, 5, false)]
    #[case(Opcode::Bge, 5, 4, true)]
    #[case(Opcode::Bge, -5, 4, false)]
    #[case(Opcode::Blt, -5, 4, true)]
    #[case(Opcode::Blt, 4, 4, false)]
    fn branch_moves_pc_by_twice_the_immediate_when_taken(
        #[case] opcode: Opcode,
        #[case] lhs: i32,
        #[case] rhs: i32,
        #[case] taken: bool,
    ) {
        let mut state = core_with(&[asm(opcode, 0, 1, 2, 0x6)]);
        state.arch.set_gpr(x(1), lhs);
        state.arch.set_gpr(x(2), rhs);

        step_one(&mut state, &config()).expect("branches never fault");

        assert_eq!(state.arch.pc(), if taken { 12 } else { 4 });
        assert_eq!(state.counters.cycles, 4);
    }

    #[test]
    fn jal_links_then_redirects() {
        let mut state = core_with(&[0, 0, asm(Opcode::Jal, 1, 0, 0, 0x10)]);
        state.arch.set_pc(8);

        step_one(&mut state, &config()).expect("retires");

        assert_eq!(state.arch.gpr(x(1)), 12);
        assert_eq!(state.arch.pc(), 8 + 0x20);
    }

    #[test]
    fn jalr_jumps_from_its_base_register() {
        let mut state = core_with(&[asm(Opcode::Jalr, 1, 2, 0, 0x4)]);
        state.arch.set_gpr(x(2), 0x40);

        step_one(&mut state, &config()).expect("retires");

        assert_eq!(state.arch.pc(), 0x44);
        assert_eq!(state.arch.gpr(x(1)), 4);
    }

    #[test]
    fn jalr_with_rd_equal_to_base_jumps_from_the_link() {
        let mut state = core_with(&[asm(Opcode::Jalr, 2, 2, 0, 0x4)]);
        state.arch.set_gpr(x(2), 0x40);

        step_one(&mut state, &config()).expect("retires");

        assert_eq!(state.arch.gpr(x(2)), 4);
        assert_eq!(state.arch.pc(), 0x8);
    }

    #[test]
    fn jal_with_rd_equal_to_zero_still_links() {
        let mut state = core_with(&[0, asm(Opcode::Jal, 0, 0, 0, 0x2)]);
        state.arch.set_pc(4);

        step_one(&mut state, &config()).expect("retires");

        assert_eq!(state.arch.gpr(GeneralRegister::X0), 8);
        assert_eq!(state.arch.pc(), 8);
    }

    #[test]
    fn store_word_then_load_word_roundtrips() {
        let mut state = core_with(&[
            asm(Opcode::Sw, 0, 1, 2, 0x10),
            asm(Opcode::Lw, 3, 1, 0, 0x10),
        ]);
        state.arch.set_gpr(x(1), 0x200);
        state.arch.set_gpr(x(2), -123_456);

        step_one(&mut state, &config()).expect("store");
        step_one(&mut state, &config()).expect("load");

        assert_eq!(state.arch.gpr(x(3)), -123_456);
        assert_eq!(&state.memory[0x210..0x214], &(-123_456_i32).to_be_bytes());
    }

    #[test]
    fn byte_store_keeps_low_bits_and_byte_load_sign_extends() {
        let mut state = core_with(&[
            asm(Opcode::Sb, 0, 1, 2, 0x3),
            asm(Opcode::Lb, 3, 1, 0, 0x3),
        ]);
        state.arch.set_gpr(x(1), 0x100);
        state.arch.set_gpr(x(2), 0x1234_5680);

        step_one(&mut state, &config()).expect("store");
        step_one(&mut state, &config()).expect("load");

        assert_eq!(state.memory[0x103], 0x80);
        assert_eq!(state.memory[0x102], 0);
        assert_eq!(state.arch.gpr(x(3)), -128);
    }

    #[test]
    fn faulting_load_leaves_state_untouched() {
        let mut state = core_with(&[asm(Opcode::Lw, 3, 1, 0, 0x0)]);
        let limit = i32::try_from(MEMORY_BYTES).expect("fits");
        state.arch.set_gpr(x(1), limit - 2);
        state.arch.set_gpr(x(3), 77);

        let fault = step_one(&mut state, &config()).expect_err("straddles the end");

        assert_eq!(fault.code, FaultCode::LoadOutOfBounds);
        assert_eq!(fault.pc, 0);
        assert_eq!(fault.address, Some(u32::try_from(limit - 2).expect("fits")));
        assert!(fault.instruction.is_some());
        assert_eq!(state.arch.gpr(x(3)), 77);
        assert_eq!(state.arch.pc(), 0);
        assert_eq!(state.counters.instructions, 0);
        assert_eq!(state.run_state, RunState::FaultLatched(FaultCode::LoadOutOfBounds));
    }

    #[test]
    fn faulting_store_writes_nothing() {
        let mut state = core_with(&[asm(Opcode::Sw, 0, 1, 2, 0x0)]);
        state.arch.set_gpr(x(1), -1);
        state.arch.set_gpr(x(2), 0x5555);
        let before = state.memory.clone();

        let fault = step_one(&mut state, &config()).expect_err("negative address");

        assert_eq!(fault.code, FaultCode::StoreOutOfBounds);
        assert_eq!(fault.address, Some(u32::MAX));
        assert_eq!(state.memory, before);
    }

    #[test]
    fn latched_fault_is_sticky() {
        let mut state = core_with(&[0x0000_0015]);

        let first = step_one(&mut state, &config()).expect_err("illegal");
        let second = step_one(&mut state, &config()).expect_err("still latched");

        assert_eq!(first.code, FaultCode::IllegalInstruction);
        assert_eq!(second.code, FaultCode::IllegalInstruction);
    }

    #[test]
    fn stall_policy_counts_the_step_at_zero_cycles() {
        let mut state = core_with(&[0x0000_0015]);
        let config = SimConfig {
            invalid_opcode: InvalidOpcodePolicy::Stall,
            ..config()
        };

        let outcome = step_one(&mut state, &config).expect("stalls");
        step_one(&mut state, &config).expect("stalls again");

        assert_eq!(outcome, StepOutcome::Stalled { opcode: 0x15 });
        assert_eq!(state.arch.pc(), 0);
        assert_eq!(state.counters.instructions, 2);
        assert_eq!(state.counters.cycles, 0);
        assert_eq!(state.counters.unclassified(), 2);
        assert_eq!(state.run_state, RunState::Running);
    }

    #[test]
    fn halt_is_neither_counted_nor_charged() {
        let mut state = core_with(&[HALT_WORD]);

        assert_eq!(step_one(&mut state, &config()), Ok(StepOutcome::Halted));
        assert_eq!(step_one(&mut state, &config()), Ok(StepOutcome::Halted));
        assert_eq!(state.counters.instructions, 0);
        assert_eq!(state.counters.cycles, 0);
        assert_eq!(state.arch.pc(), 0);
    }

    #[rstest]
    #[case(0x2, FaultCode::MisalignedFetch)]
    #[case(0x0010_0000, FaultCode::FetchOutOfBounds)]
    #[case(0xFFFF_FFFC, FaultCode::FetchOutOfBounds)]
    fn redirect_to_bad_target_faults_on_next_fetch(#[case] target: u32, #[case] code: FaultCode) {
        let mut state = core_with(&[asm(Opcode::Jalr, 0, 1, 0, 0)]);
        state.arch.set_gpr(x(1), target as i32);

        step_one(&mut state, &config()).expect("redirect itself succeeds");
        let fault = step_one(&mut state, &config()).expect_err("bad fetch");

        assert_eq!(fault.code, code);
        assert_eq!(fault.pc, target);
        assert_eq!(fault.address, Some(target));
    }

    #[test]
    fn run_stops_at_halt() {
        let mut state = core_with(&[
            asm(Opcode::Addi, 1, 0, 0, 0x5),
            asm(Opcode::Addi, 2, 0, 0, 0x3),
            asm(Opcode::Add, 3, 1, 2, 0),
            HALT_WORD,
        ]);

        assert_eq!(run(&mut state, &config()), Ok(RunOutcome::Halted));
        assert_eq!(state.arch.gpr(x(3)), 8);
        assert_eq!(state.counters.instructions, 3);
        assert_eq!(state.counters.cycles, 5);
    }

    #[test]
    fn stalled_run_ends_on_step_budget() {
        let mut state = core_with(&[0x0000_0015]);
        let config = SimConfig {
            invalid_opcode: InvalidOpcodePolicy::Stall,
            step_budget: Some(16),
            ..config()
        };

        assert_eq!(
            run(&mut state, &config),
            Ok(RunOutcome::StepBudgetExhausted { steps: 16 })
        );
    }
}
