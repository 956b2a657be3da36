use std::fmt;

use thiserror::Error;

use crate::decoder::Instruction;

/// Fault classes used for diagnostics aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Decoder rejected an instruction encoding.
    Decode,
    /// Instruction fetch violated PC policy.
    Fetch,
    /// Data access left the memory region.
    Memory,
}

/// Stable fault taxonomy. Every fault is fatal to the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Opcode field matches neither the opcode table nor the halt sentinel.
    #[error("illegal instruction encoding")]
    IllegalInstruction = 0x01,
    /// Fetch attempted at a PC that is not 4-byte aligned.
    #[error("instruction fetch from unaligned pc")]
    MisalignedFetch = 0x02,
    /// Fetch attempted outside the memory region.
    #[error("instruction fetch outside memory")]
    FetchOutOfBounds = 0x03,
    /// Load touched bytes outside the memory region.
    #[error("load outside memory")]
    LoadOutOfBounds = 0x04,
    /// Store touched bytes outside the memory region.
    #[error("store outside memory")]
    StoreOutOfBounds = 0x05,
}

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::IllegalInstruction),
            0x02 => Some(Self::MisalignedFetch),
            0x03 => Some(Self::FetchOutOfBounds),
            0x04 => Some(Self::LoadOutOfBounds),
            0x05 => Some(Self::StoreOutOfBounds),
            _ => None,
        }
    }

    /// Returns the diagnostics fault class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::IllegalInstruction => FaultClass::Decode,
            Self::MisalignedFetch | Self::FetchOutOfBounds => FaultClass::Fetch,
            Self::LoadOutOfBounds | Self::StoreOutOfBounds => FaultClass::Memory,
        }
    }
}

/// A raised fault with the context needed to diagnose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Fault {
    /// Canonical fault code.
    #[source]
    pub code: FaultCode,
    /// PC of the faulting instruction (or the attempted fetch PC).
    pub pc: u32,
    /// Offending address for memory and fetch faults.
    pub address: Option<u32>,
    /// Decoded instruction, when the fault happened after decode.
    pub instruction: Option<Instruction>,
}

impl Fault {
    /// Creates a fault at `pc` with no further context.
    #[must_use]
    pub const fn new(code: FaultCode, pc: u32) -> Self {
        Self {
            code,
            pc,
            address: None,
            instruction: None,
        }
    }

    /// Attaches the offending address.
    #[must_use]
    pub const fn with_address(mut self, address: u32) -> Self {
        self.address = Some(address);
        self
    }

    /// Attaches the decoded instruction.
    #[must_use]
    pub const fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instruction = Some(instruction);
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at pc {:#07x}", self.code, self.pc)?;
        if let Some(address) = self.address {
            write!(f, ", address {address:#x}")?;
        }
        if let Some(instruction) = self.instruction {
            write!(f, " ({instruction})")?;
        }
        Ok(())
    }
}
