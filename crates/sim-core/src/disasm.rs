//! Instruction disassembly into the listing syntax the program loader reads.
//!
//! Operand order matches the listing: R `rd, rs1, rs2`; I `rd, rs1, imm`;
//! S/B `rs1, rs2, imm`; J `rd, imm`. Immediates print as hexadecimal.

use std::fmt;

use crate::decoder::{Decoder, Instruction};
use crate::encoding::HALT_MNEMONIC;
use crate::memory::read_u32_be;

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.opcode().map_or("", |opcode| opcode.mnemonic());

        match *self {
            Self::Register { rd, rs1, rs2, .. } => write!(f, "{mnemonic} {rd}, {rs1}, {rs2}"),
            Self::Immediate { rd, rs1, imm, .. }
            | Self::Jalr { rd, rs1, imm }
            | Self::Load { rd, rs1, imm, .. } => write!(f, "{mnemonic} {rd}, {rs1}, {imm:#x}"),
            Self::Store { rs1, rs2, imm, .. } | Self::Branch { rs1, rs2, imm, .. } => {
                write!(f, "{mnemonic} {rs1}, {rs2}, {imm:#x}")
            }
            Self::Jal { rd, imm } => write!(f, "{mnemonic} {rd}, {imm:#x}"),
            Self::Halt => f.write_str(HALT_MNEMONIC),
            Self::Invalid { word, .. } => write!(f, ".word {word:#010x}"),
        }
    }
}

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DisassemblyRow {
    /// Address of the instruction word.
    pub address: u32,
    /// Raw instruction word.
    pub word: u32,
    /// Listing text.
    pub text: String,
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05X}: {:08X}  {}", self.address, self.word, self.text)
    }
}

/// Disassembles one word at `address`, or `None` when it lies outside memory.
#[must_use]
pub fn disassemble_one(address: u32, memory: &[u8]) -> Option<DisassemblyRow> {
    let word = read_u32_be(memory, address).ok()?;
    Some(DisassemblyRow {
        address,
        word,
        text: Decoder::decode(word).instruction().to_string(),
    })
}

/// Disassembles `count` consecutive words starting at `start`, stopping early
/// at the end of memory.
#[must_use]
pub fn disassemble_range(start: u32, count: usize, memory: &[u8]) -> Vec<DisassemblyRow> {
    (0..count)
        .map_while(|step| {
            let offset = u32::try_from(step).ok()?.checked_mul(4)?;
            disassemble_one(start.checked_add(offset)?, memory)
        })
        .collect()
}
