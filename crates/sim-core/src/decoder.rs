//! Instruction codec for the 32-bit perfsim encoding.
//!
//! Field extraction follows the layout implied by the opcode's class.
//! Immediates are extracted as unsigned values; no sign extension is applied
//! to I, S/B, or J immediates.

use crate::encoding::{
    classify_opcode, opcode_field, InstructionClass, InstructionFormat, Opcode, OPCODE_MASK,
};
use crate::state::GeneralRegister;

const RD_SHIFT: u32 = 7;
const RS1_SHIFT: u32 = 15;
const RS2_SHIFT: u32 = 20;
const I_IMM_SHIFT: u32 = 20;
const J_IMM_SHIFT: u32 = 12;
const SB_IMM_HI_SHIFT: u32 = 25;

/// Width mask for 12-bit I and S/B immediates.
pub const IMM12_MASK: u32 = 0xFFF;
/// Width mask for 20-bit J immediates.
pub const IMM20_MASK: u32 = 0xF_FFFF;

const SB_IMM_LO_MASK: u32 = 0x1F;
const SB_IMM_HI_MASK: u32 = 0x7F;

/// Operand fields carried by an instruction word.
///
/// Fields a layout does not encode are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperandFields {
    /// Destination register.
    pub rd: Option<GeneralRegister>,
    /// First source register.
    pub rs1: Option<GeneralRegister>,
    /// Second source register.
    pub rs2: Option<GeneralRegister>,
    /// Unsigned immediate, already reassembled.
    pub imm: Option<u32>,
}

impl OperandFields {
    /// Keeps only the fields that `format` encodes.
    #[must_use]
    pub const fn restricted_to(self, format: InstructionFormat) -> Self {
        match format {
            InstructionFormat::R => Self {
                imm: None,
                ..self
            },
            InstructionFormat::I => Self { rs2: None, ..self },
            InstructionFormat::SB => Self { rd: None, ..self },
            InstructionFormat::J => Self {
                rs1: None,
                rs2: None,
                ..self
            },
        }
    }
}

/// Packs an opcode and operand fields into a word using `format`'s layout.
///
/// Every field is masked to its width. Fields the layout does not carry are
/// ignored.
#[must_use]
pub fn encode_word(format: InstructionFormat, opcode: u8, fields: OperandFields) -> u32 {
    let reg = |field: Option<GeneralRegister>| field.map_or(0, GeneralRegister::as_u32);
    let imm = fields.imm.unwrap_or(0);
    let mut word = u32::from(opcode) & OPCODE_MASK;

    match format {
        InstructionFormat::R => {
            word |= reg(fields.rd) << RD_SHIFT;
            word |= reg(fields.rs1) << RS1_SHIFT;
            word |= reg(fields.rs2) << RS2_SHIFT;
        }
        InstructionFormat::I => {
            word |= reg(fields.rd) << RD_SHIFT;
            word |= reg(fields.rs1) << RS1_SHIFT;
            word |= (imm & IMM12_MASK) << I_IMM_SHIFT;
        }
        InstructionFormat::SB => {
            let imm = imm & IMM12_MASK;
            word |= (imm & SB_IMM_LO_MASK) << RD_SHIFT;
            word |= reg(fields.rs1) << RS1_SHIFT;
            word |= reg(fields.rs2) << RS2_SHIFT;
            word |= ((imm >> 5) & SB_IMM_HI_MASK) << SB_IMM_HI_SHIFT;
        }
        InstructionFormat::J => {
            word |= reg(fields.rd) << RD_SHIFT;
            word |= (imm & IMM20_MASK) << J_IMM_SHIFT;
        }
    }

    word
}

const fn rd_field(word: u32) -> GeneralRegister {
    GeneralRegister::from_u5(word >> RD_SHIFT)
}

const fn rs1_field(word: u32) -> GeneralRegister {
    GeneralRegister::from_u5(word >> RS1_SHIFT)
}

const fn rs2_field(word: u32) -> GeneralRegister {
    GeneralRegister::from_u5(word >> RS2_SHIFT)
}

const fn i_immediate(word: u32) -> u32 {
    (word >> I_IMM_SHIFT) & IMM12_MASK
}

const fn sb_immediate(word: u32) -> u32 {
    let lo = (word >> RD_SHIFT) & SB_IMM_LO_MASK;
    let hi = (word >> SB_IMM_HI_SHIFT) & SB_IMM_HI_MASK;
    (hi << 5) | lo
}

const fn j_immediate(word: u32) -> u32 {
    (word >> J_IMM_SHIFT) & IMM20_MASK
}

/// Extracts the operand fields `format` carries from `word`.
#[must_use]
pub const fn decode_fields(word: u32, format: InstructionFormat) -> OperandFields {
    match format {
        InstructionFormat::R => OperandFields {
            rd: Some(rd_field(word)),
            rs1: Some(rs1_field(word)),
            rs2: Some(rs2_field(word)),
            imm: None,
        },
        InstructionFormat::I => OperandFields {
            rd: Some(rd_field(word)),
            rs1: Some(rs1_field(word)),
            rs2: None,
            imm: Some(i_immediate(word)),
        },
        InstructionFormat::SB => OperandFields {
            rd: None,
            rs1: Some(rs1_field(word)),
            rs2: Some(rs2_field(word)),
            imm: Some(sb_immediate(word)),
        },
        InstructionFormat::J => OperandFields {
            rd: Some(rd_field(word)),
            rs1: None,
            rs2: None,
            imm: Some(j_immediate(word)),
        },
    }
}

/// Register-register operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum RegisterOp {
    Add,
    Sub,
    Xor,
    And,
    /// Logical right shift by the value of `rs2`.
    Srl,
    /// Arithmetic right shift by the value of `rs2`.
    Sra,
}

/// Register-immediate operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum ImmediateOp {
    Addi,
    Subi,
    Xori,
    /// Compares the source register's index, not its value, to `imm`.
    Slti,
    Srai,
}

/// Conditional branch relations, evaluated on signed register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum BranchCondition {
    Eq,
    Ge,
    Lt,
}

/// Data access width for loads and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessWidth {
    /// One byte.
    Byte,
    /// Four bytes, big-endian.
    Word,
}

impl AccessWidth {
    /// Returns the access size in bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 4,
        }
    }
}

/// A decoded instruction: one variant per behavior, carrying its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Instruction {
    /// `rd <- rs1 op rs2`.
    Register {
        op: RegisterOp,
        rd: GeneralRegister,
        rs1: GeneralRegister,
        rs2: GeneralRegister,
    },
    /// `rd <- rs1 op imm`.
    Immediate {
        op: ImmediateOp,
        rd: GeneralRegister,
        rs1: GeneralRegister,
        imm: u32,
    },
    /// `rd <- pc + 4; pc <- rs1 + imm`.
    Jalr {
        rd: GeneralRegister,
        rs1: GeneralRegister,
        imm: u32,
    },
    /// `rd <- mem[rs1 + imm]`.
    Load {
        width: AccessWidth,
        rd: GeneralRegister,
        rs1: GeneralRegister,
        imm: u32,
    },
    /// `mem[rs1 + imm] <- rs2`.
    Store {
        width: AccessWidth,
        rs1: GeneralRegister,
        rs2: GeneralRegister,
        imm: u32,
    },
    /// `if rs1 cond rs2 { pc += imm * 2 } else { pc += 4 }`.
    Branch {
        cond: BranchCondition,
        rs1: GeneralRegister,
        rs2: GeneralRegister,
        imm: u32,
    },
    /// `rd <- pc + 4; pc += imm * 2`.
    Jal { rd: GeneralRegister, imm: u32 },
    /// Halt sentinel.
    Halt,
    /// Opcode not in the table.
    Invalid { opcode: u8, word: u32 },
}

impl Instruction {
    /// Returns the table opcode, or `None` for halt and invalid encodings.
    #[must_use]
    pub const fn opcode(self) -> Option<Opcode> {
        let opcode = match self {
            Self::Register { op, .. } => match op {
                RegisterOp::Add => Opcode::Add,
                RegisterOp::Sub => Opcode::Sub,
                RegisterOp::Xor => Opcode::Xor,
                RegisterOp::And => Opcode::And,
                RegisterOp::Srl => Opcode::Srl,
                RegisterOp::Sra => Opcode::Sra,
            },
            Self::Immediate { op, .. } => match op {
                ImmediateOp::Addi => Opcode::Addi,
                ImmediateOp::Subi => Opcode::Subi,
                ImmediateOp::Xori => Opcode::Xori,
                ImmediateOp::Slti => Opcode::Slti,
                ImmediateOp::Srai => Opcode::Srai,
            },
            Self::Jalr { .. } => Opcode::Jalr,
            Self::Load { width, .. } => match width {
                AccessWidth::Byte => Opcode::Lb,
                AccessWidth::Word => Opcode::Lw,
            },
            Self::Store { width, .. } => match width {
                AccessWidth::Byte => Opcode::Sb,
                AccessWidth::Word => Opcode::Sw,
            },
            Self::Branch { cond, .. } => match cond {
                BranchCondition::Eq => Opcode::Beq,
                BranchCondition::Ge => Opcode::Bge,
                BranchCondition::Lt => Opcode::Blt,
            },
            Self::Jal { .. } => Opcode::Jal,
            Self::Halt | Self::Invalid { .. } => return None,
        };
        Some(opcode)
    }

    /// Returns the class that selected this instruction's layout.
    #[must_use]
    pub const fn class(self) -> InstructionClass {
        match self {
            Self::Halt => InstructionClass::Halt,
            Self::Invalid { .. } => InstructionClass::Invalid,
            _ => match self.opcode() {
                Some(opcode) => opcode.class(),
                None => InstructionClass::Invalid,
            },
        }
    }

    /// Returns the cost bucket charged on retirement, if any.
    #[must_use]
    pub const fn cost_class(self) -> Option<InstructionClass> {
        match self.opcode() {
            Some(opcode) => opcode.cost_class(),
            None => None,
        }
    }
}

/// A fetched word with its opcode, class, and class-layout fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Raw instruction word.
    pub word: u32,
    /// 7-bit opcode field.
    pub opcode: u8,
    /// Class determined by the opcode alone.
    pub class: InstructionClass,
    /// Operand fields per the class layout; empty for halt and invalid.
    pub fields: OperandFields,
}

impl DecodedInstruction {
    /// Re-encodes the opcode and fields back to a word.
    ///
    /// Halt re-encodes to the canonical sentinel; invalid encodings return
    /// the raw word.
    #[must_use]
    pub fn encode(self) -> u32 {
        match self.class.format() {
            Some(format) => encode_word(format, self.opcode, self.fields),
            None if self.class == InstructionClass::Halt => crate::encoding::HALT_WORD,
            None => self.word,
        }
    }

    /// Builds the tagged instruction for dispatch.
    #[must_use]
    pub const fn instruction(self) -> Instruction {
        let word = self.word;
        let Some(opcode) = Opcode::from_u7(self.opcode) else {
            return if matches!(self.class, InstructionClass::Halt) {
                Instruction::Halt
            } else {
                Instruction::Invalid {
                    opcode: self.opcode,
                    word,
                }
            };
        };

        let rd = rd_field(word);
        let rs1 = rs1_field(word);
        let rs2 = rs2_field(word);

        match opcode {
            Opcode::Add => register(RegisterOp::Add, word),
            Opcode::Sub => register(RegisterOp::Sub, word),
            Opcode::Xor => register(RegisterOp::Xor, word),
            Opcode::And => register(RegisterOp::And, word),
            Opcode::Srl => register(RegisterOp::Srl, word),
            Opcode::Sra => register(RegisterOp::Sra, word),
            Opcode::Addi => immediate(ImmediateOp::Addi, word),
            Opcode::Subi => immediate(ImmediateOp::Subi, word),
            Opcode::Xori => immediate(ImmediateOp::Xori, word),
            Opcode::Slti => immediate(ImmediateOp::Slti, word),
            Opcode::Srai => immediate(ImmediateOp::Srai, word),
            Opcode::Jalr => Instruction::Jalr {
                rd,
                rs1,
                imm: i_immediate(word),
            },
            Opcode::Lw | Opcode::Lb => Instruction::Load {
                width: if matches!(opcode, Opcode::Lw) {
                    AccessWidth::Word
                } else {
                    AccessWidth::Byte
                },
                rd,
                rs1,
                imm: i_immediate(word),
            },
            Opcode::Sw | Opcode::Sb => Instruction::Store {
                width: if matches!(opcode, Opcode::Sw) {
                    AccessWidth::Word
                } else {
                    AccessWidth::Byte
                },
                rs1,
                rs2,
                imm: sb_immediate(word),
            },
            Opcode::Beq => branch(BranchCondition::Eq, word),
            Opcode::Bge => branch(BranchCondition::Ge, word),
            Opcode::Blt => branch(BranchCondition::Lt, word),
            Opcode::Jal => Instruction::Jal {
                rd,
                imm: j_immediate(word),
            },
        }
    }
}

const fn register(op: RegisterOp, word: u32) -> Instruction {
    Instruction::Register {
        op,
        rd: rd_field(word),
        rs1: rs1_field(word),
        rs2: rs2_field(word),
    }
}

const fn immediate(op: ImmediateOp, word: u32) -> Instruction {
    Instruction::Immediate {
        op,
        rd: rd_field(word),
        rs1: rs1_field(word),
        imm: i_immediate(word),
    }
}

const fn branch(cond: BranchCondition, word: u32) -> Instruction {
    Instruction::Branch {
        cond,
        rs1: rs1_field(word),
        rs2: rs2_field(word),
        imm: sb_immediate(word),
    }
}

/// Instruction decoder for the perfsim encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    /// Decodes a 32-bit word. Never fails: unknown opcodes decode to the
    /// `Invalid` class and are handled by the execution policy.
    #[must_use]
    pub const fn decode(word: u32) -> DecodedInstruction {
        let opcode = opcode_field(word);
        let class = classify_opcode(opcode);
        let fields = match class.format() {
            Some(format) => decode_fields(word, format),
            None => OperandFields {
                rd: None,
                rs1: None,
                rs2: None,
                imm: None,
            },
        };

        DecodedInstruction {
            word,
            opcode,
            class,
            fields,
        }
    }
}
