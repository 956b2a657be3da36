/// Number of architecturally visible general-purpose registers (`x0..x31`).
pub const GENERAL_REGISTER_COUNT: usize = 32;

/// Mask for a 5-bit register field.
const REGISTER_FIELD_MASK: u32 = 0x1F;

/// Architecturally visible general-purpose register identifier.
///
/// Always in `0..32`; construction masks or rejects anything wider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct GeneralRegister(u8);

impl GeneralRegister {
    /// `x0`. An ordinary writable register, not hardwired to zero.
    pub const X0: Self = Self(0);

    /// Returns the register for `index`, or `None` when `index >= 32`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(index: usize) -> Option<Self> {
        if index < GENERAL_REGISTER_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Decodes the low five bits of `bits` into a register.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_u5(bits: u32) -> Self {
        Self((bits & REGISTER_FIELD_MASK) as u8)
    }

    /// Returns the array index for this register (`0..=31`).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw 5-bit field value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }

    /// Iterates every register in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..GENERAL_REGISTER_COUNT).filter_map(Self::new)
    }
}

impl std::fmt::Display for GeneralRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Register file and program counter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ArchitecturalState {
    gpr: [i32; GENERAL_REGISTER_COUNT],
    pc: u32,
}

impl ArchitecturalState {
    /// Reads a general-purpose register.
    #[must_use]
    pub const fn gpr(&self, reg: GeneralRegister) -> i32 {
        self.gpr[reg.index()]
    }

    /// Writes a general-purpose register.
    pub const fn set_gpr(&mut self, reg: GeneralRegister, value: i32) {
        self.gpr[reg.index()] = value;
    }

    /// Returns all register values in index order.
    #[must_use]
    pub const fn registers(&self) -> &[i32; GENERAL_REGISTER_COUNT] {
        &self.gpr
    }

    /// Reads the `PC` register.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Writes the `PC` register.
    pub const fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }
}
