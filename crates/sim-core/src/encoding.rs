use std::collections::HashMap;
use std::sync::OnceLock;

/// Mask for the opcode field (bits 6..0).
pub const OPCODE_MASK: u32 = 0x7F;

/// Opcode field value of the halt sentinel.
pub const HALT_OPCODE: u8 = 0x7F;

/// The halt sentinel word. Only its opcode field is significant on decode.
pub const HALT_WORD: u32 = 0xFFFF_FFFF;

/// Listing mnemonic for the halt sentinel.
pub const HALT_MNEMONIC: &str = "SON";

/// Assigned opcodes, numbered by their 7-bit `OP` field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    Add = 0,
    Sub = 1,
    Addi = 2,
    Subi = 3,
    Xor = 4,
    Xori = 5,
    And = 6,
    Jalr = 7,
    Beq = 8,
    Bge = 9,
    Blt = 10,
    Jal = 11,
    Lw = 12,
    Sw = 13,
    Lb = 14,
    Sb = 15,
    Srl = 16,
    Sra = 17,
    Slti = 18,
    Srai = 19,
}

impl Opcode {
    /// Converts a 7-bit opcode field into an assigned opcode.
    #[must_use]
    pub const fn from_u7(op: u8) -> Option<Self> {
        match op {
            0 => Some(Self::Add),
            1 => Some(Self::Sub),
            2 => Some(Self::Addi),
            3 => Some(Self::Subi),
            4 => Some(Self::Xor),
            5 => Some(Self::Xori),
            6 => Some(Self::And),
            7 => Some(Self::Jalr),
            8 => Some(Self::Beq),
            9 => Some(Self::Bge),
            10 => Some(Self::Blt),
            11 => Some(Self::Jal),
            12 => Some(Self::Lw),
            13 => Some(Self::Sw),
            14 => Some(Self::Lb),
            15 => Some(Self::Sb),
            16 => Some(Self::Srl),
            17 => Some(Self::Sra),
            18 => Some(Self::Slti),
            19 => Some(Self::Srai),
            _ => None,
        }
    }

    /// Returns the 7-bit opcode field value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the instruction class that selects the operand layout.
    #[must_use]
    pub const fn class(self) -> InstructionClass {
        match self {
            Self::Add | Self::Sub | Self::Xor | Self::And | Self::Srl | Self::Sra => {
                InstructionClass::R
            }
            Self::Addi
            | Self::Subi
            | Self::Xori
            | Self::Jalr
            | Self::Lw
            | Self::Lb
            | Self::Slti
            | Self::Srai => InstructionClass::I,
            Self::Sw | Self::Sb => InstructionClass::S,
            Self::Beq | Self::Bge | Self::Blt => InstructionClass::B,
            Self::Jal => InstructionClass::J,
        }
    }

    /// Returns the cost bucket charged when this opcode retires.
    ///
    /// `srai` decodes with the I layout but belongs to no bucket, so it
    /// retires at zero cycles.
    #[must_use]
    pub const fn cost_class(self) -> Option<InstructionClass> {
        match self {
            Self::Srai => None,
            _ => Some(self.class()),
        }
    }

    /// Returns the canonical lower-case listing mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Addi => "addi",
            Self::Subi => "subi",
            Self::Xor => "xor",
            Self::Xori => "xori",
            Self::And => "and",
            Self::Jalr => "jalr",
            Self::Beq => "beq",
            Self::Bge => "bge",
            Self::Blt => "blt",
            Self::Jal => "jal",
            Self::Lw => "lw",
            Self::Sw => "sw",
            Self::Lb => "lb",
            Self::Sb => "sb",
            Self::Srl => "srl",
            Self::Sra => "sra",
            Self::Slti => "slti",
            Self::Srai => "srai",
        }
    }
}

/// Instruction classes. `S` and `B` share one decode layout but are
/// separate cost buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InstructionClass {
    /// Register-register.
    R,
    /// Register-immediate, loads, `jalr`.
    I,
    /// Stores.
    S,
    /// Conditional branches.
    B,
    /// `jal`.
    J,
    /// Halt sentinel.
    Halt,
    /// Opcode not present in the table.
    Invalid,
}

impl InstructionClass {
    /// Every class that carries a configurable cycle cost, in report order.
    pub const COSTED: [Self; 5] = [Self::R, Self::I, Self::S, Self::B, Self::J];

    /// Returns the operand field layout for this class, if it has one.
    #[must_use]
    pub const fn format(self) -> Option<InstructionFormat> {
        match self {
            Self::R => Some(InstructionFormat::R),
            Self::I => Some(InstructionFormat::I),
            Self::S | Self::B => Some(InstructionFormat::SB),
            Self::J => Some(InstructionFormat::J),
            Self::Halt | Self::Invalid => None,
        }
    }

    /// Short label used by reports and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::R => "R",
            Self::I => "I",
            Self::S => "S",
            Self::B => "B",
            Self::J => "J",
            Self::Halt => "HALT",
            Self::Invalid => "INVALID",
        }
    }
}

/// Physical operand layouts of a 32-bit instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionFormat {
    /// `rd[11:7] rs1[19:15] rs2[24:20]`.
    R,
    /// `rd[11:7] rs1[19:15] imm[31:20]`.
    I,
    /// `imm[4:0]@[11:7] rs1[19:15] rs2[24:20] imm[11:5]@[31:25]`.
    SB,
    /// `rd[11:7] imm[31:12]`.
    J,
}

/// Single source-of-truth mnemonic/opcode table.
pub const OPCODE_TABLE: &[(&str, Opcode)] = &[
    ("add", Opcode::Add),
    ("sub", Opcode::Sub),
    ("addi", Opcode::Addi),
    ("subi", Opcode::Subi),
    ("xor", Opcode::Xor),
    ("xori", Opcode::Xori),
    ("and", Opcode::And),
    ("jalr", Opcode::Jalr),
    ("beq", Opcode::Beq),
    ("bge", Opcode::Bge),
    ("blt", Opcode::Blt),
    ("jal", Opcode::Jal),
    ("lw", Opcode::Lw),
    ("sw", Opcode::Sw),
    ("lb", Opcode::Lb),
    ("sb", Opcode::Sb),
    ("srl", Opcode::Srl),
    ("sra", Opcode::Sra),
    ("slti", Opcode::Slti),
    ("srai", Opcode::Srai),
];

/// Extracts the 7-bit opcode field from an instruction word.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn opcode_field(word: u32) -> u8 {
    (word & OPCODE_MASK) as u8
}

/// Maps a 7-bit opcode field to its instruction class.
#[must_use]
pub const fn classify_opcode(op: u8) -> InstructionClass {
    if op == HALT_OPCODE {
        return InstructionClass::Halt;
    }
    match Opcode::from_u7(op) {
        Some(opcode) => opcode.class(),
        None => InstructionClass::Invalid,
    }
}

/// Resolves a mnemonic (case-insensitive) against the opcode table.
#[must_use]
pub fn opcode_for_mnemonic(name: &str) -> Option<Opcode> {
    static BY_NAME: OnceLock<HashMap<&'static str, Opcode>> = OnceLock::new();
    let table = BY_NAME.get_or_init(|| OPCODE_TABLE.iter().copied().collect());

    table.get(name.to_ascii_lowercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::{
        classify_opcode, opcode_field, opcode_for_mnemonic, InstructionClass, InstructionFormat,
        Opcode, HALT_OPCODE, HALT_WORD, OPCODE_TABLE,
    };

    #[test]
    fn table_has_twenty_unique_entries() {
        assert_eq!(OPCODE_TABLE.len(), 20);
        let names: HashSet<_> = OPCODE_TABLE.iter().map(|(name, _)| *name).collect();
        let opcodes: HashSet<_> = OPCODE_TABLE.iter().map(|(_, op)| *op).collect();
        assert_eq!(names.len(), OPCODE_TABLE.len());
        assert_eq!(opcodes.len(), OPCODE_TABLE.len());
    }

    #[test]
    fn every_table_entry_roundtrips_through_lookups() {
        for (name, opcode) in OPCODE_TABLE {
            assert_eq!(opcode_for_mnemonic(name), Some(*opcode));
            assert_eq!(opcode.mnemonic(), *name);
            assert_eq!(Opcode::from_u7(opcode.as_u8()), Some(*opcode));
        }
    }

    #[test]
    fn mnemonic_lookup_ignores_case_and_rejects_unknowns() {
        assert_eq!(opcode_for_mnemonic("ADDI"), Some(Opcode::Addi));
        assert_eq!(opcode_for_mnemonic("mul"), None);
        assert_eq!(opcode_for_mnemonic(""), None);
    }

    #[rstest]
    #[case(0, InstructionClass::R)]
    #[case(2, InstructionClass::I)]
    #[case(7, InstructionClass::I)]
    #[case(8, InstructionClass::B)]
    #[case(11, InstructionClass::J)]
    #[case(13, InstructionClass::S)]
    #[case(15, InstructionClass::S)]
    #[case(17, InstructionClass::R)]
    #[case(19, InstructionClass::I)]
    #[case(20, InstructionClass::Invalid)]
    #[case(0x40, InstructionClass::Invalid)]
    #[case(HALT_OPCODE, InstructionClass::Halt)]
    fn classify_matches_opcode_table(#[case] op: u8, #[case] expected: InstructionClass) {
        assert_eq!(classify_opcode(op), expected);
    }

    #[test]
    fn srai_has_the_i_layout_but_no_cost_bucket() {
        assert_eq!(Opcode::Srai.class(), InstructionClass::I);
        assert_eq!(Opcode::Srai.cost_class(), None);
        for (_, opcode) in OPCODE_TABLE.iter().filter(|(_, op)| *op != Opcode::Srai) {
            assert_eq!(opcode.cost_class(), Some(opcode.class()));
        }
    }

    #[test]
    fn store_and_branch_share_one_layout() {
        assert_eq!(InstructionClass::S.format(), Some(InstructionFormat::SB));
        assert_eq!(InstructionClass::B.format(), Some(InstructionFormat::SB));
        assert_eq!(InstructionClass::Halt.format(), None);
        assert_eq!(InstructionClass::Invalid.format(), None);
    }

    #[test]
    fn halt_word_opcode_field_is_halt() {
        assert_eq!(opcode_field(HALT_WORD), HALT_OPCODE);
        assert_eq!(opcode_field(0x1234_5680), 0x00);
    }
}
