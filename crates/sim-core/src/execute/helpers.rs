//! Pure value functions used by instruction dispatch.

use crate::decoder::{BranchCondition, ImmediateOp, RegisterOp};
use crate::state::GeneralRegister;

/// Byte distance from one instruction to the next.
pub const INSTRUCTION_BYTES: u32 = 4;

/// Computes `rs1 op rs2` with 32-bit wrapping semantics.
///
/// Shift amounts use the low five bits of `rhs`.
#[must_use]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
pub const fn register_op(op: RegisterOp, lhs: i32, rhs: i32) -> i32 {
    match op {
        RegisterOp::Add => lhs.wrapping_add(rhs),
        RegisterOp::Sub => lhs.wrapping_sub(rhs),
        RegisterOp::Xor => lhs ^ rhs,
        RegisterOp::And => lhs & rhs,
        RegisterOp::Srl => (lhs as u32).wrapping_shr(rhs as u32) as i32,
        RegisterOp::Sra => lhs.wrapping_shr(rhs as u32),
    }
}

/// Computes `rs1 op imm` for the register-immediate group.
///
/// `slti` compares the index of `rs1`, not its value.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_lossless)]
pub const fn immediate_op(op: ImmediateOp, rs1: GeneralRegister, value: i32, imm: u32) -> i32 {
    match op {
        ImmediateOp::Addi => value.wrapping_add(imm as i32),
        ImmediateOp::Subi => value.wrapping_sub(imm as i32),
        ImmediateOp::Xori => value ^ imm as i32,
        ImmediateOp::Slti => (rs1.as_u32() < imm) as i32,
        ImmediateOp::Srai => value.wrapping_shr(imm),
    }
}

/// Evaluates a branch relation on signed register values.
#[must_use]
pub const fn branch_taken(cond: BranchCondition, lhs: i32, rhs: i32) -> bool {
    match cond {
        BranchCondition::Eq => lhs == rhs,
        BranchCondition::Ge => lhs >= rhs,
        BranchCondition::Lt => lhs < rhs,
    }
}

/// `base + imm` as a byte address. Negative results wrap to large
/// addresses that fail the bounds check.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn effective_address(base: i32, imm: u32) -> u32 {
    (base as u32).wrapping_add(imm)
}

/// Target of a PC-relative redirect: `pc + imm * 2`.
#[must_use]
pub const fn pc_relative_target(pc: u32, imm: u32) -> u32 {
    pc.wrapping_add(imm.wrapping_mul(2))
}

/// Return address written by `jal` and `jalr`.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn link_value(pc: u32) -> i32 {
    pc.wrapping_add(INSTRUCTION_BYTES) as i32
}
