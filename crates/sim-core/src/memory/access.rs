//! Bounds-checked memory access helpers.
//!
//! Every helper validates the full byte range before indexing. Out-of-range
//! accesses return a [`FaultCode`]; nothing wraps or truncates.

use crate::FaultCode;

/// Byte width of a word access and of an instruction fetch.
pub const WORD_ACCESS_BYTES: u32 = 4;

/// Validates that `width` bytes starting at `addr` lie inside `memory` and
/// returns the starting index.
///
/// # Errors
///
/// Returns `fault` when any byte of the access is outside `memory`.
pub fn validate_access(
    memory: &[u8],
    addr: u32,
    width: u32,
    fault: FaultCode,
) -> Result<usize, FaultCode> {
    let start = usize::try_from(addr).map_err(|_| fault)?;
    let end = start
        .checked_add(usize::try_from(width).map_err(|_| fault)?)
        .ok_or(fault)?;

    if end <= memory.len() {
        Ok(start)
    } else {
        Err(fault)
    }
}

/// Validates an instruction fetch at `pc`.
///
/// # Errors
///
/// Returns [`FaultCode::MisalignedFetch`] when `pc` is not a multiple of four
/// and [`FaultCode::FetchOutOfBounds`] when the word leaves memory.
pub fn validate_fetch(memory: &[u8], pc: u32) -> Result<usize, FaultCode> {
    if pc % WORD_ACCESS_BYTES != 0 {
        return Err(FaultCode::MisalignedFetch);
    }
    validate_access(memory, pc, WORD_ACCESS_BYTES, FaultCode::FetchOutOfBounds)
}

/// Reads one byte.
///
/// # Errors
///
/// Returns [`FaultCode::LoadOutOfBounds`] when `addr` is outside memory.
pub fn read_u8(memory: &[u8], addr: u32) -> Result<u8, FaultCode> {
    let index = validate_access(memory, addr, 1, FaultCode::LoadOutOfBounds)?;
    Ok(memory[index])
}

/// Writes one byte.
///
/// # Errors
///
/// Returns [`FaultCode::StoreOutOfBounds`] when `addr` is outside memory.
pub fn write_u8(memory: &mut [u8], addr: u32, value: u8) -> Result<(), FaultCode> {
    let index = validate_access(memory, addr, 1, FaultCode::StoreOutOfBounds)?;
    memory[index] = value;
    Ok(())
}

/// Reads a big-endian 32-bit word (most significant byte at `addr`).
///
/// # Errors
///
/// Returns [`FaultCode::LoadOutOfBounds`] when any of the four bytes is
/// outside memory.
pub fn read_u32_be(memory: &[u8], addr: u32) -> Result<u32, FaultCode> {
    let index = validate_access(memory, addr, WORD_ACCESS_BYTES, FaultCode::LoadOutOfBounds)?;
    let mut bytes = [0_u8; 4];
    bytes.copy_from_slice(&memory[index..index + 4]);
    Ok(u32::from_be_bytes(bytes))
}

/// Writes a big-endian 32-bit word (most significant byte at `addr`).
///
/// # Errors
///
/// Returns [`FaultCode::StoreOutOfBounds`] when any of the four bytes is
/// outside memory.
pub fn write_u32_be(memory: &mut [u8], addr: u32, value: u32) -> Result<(), FaultCode> {
    let index = validate_access(memory, addr, WORD_ACCESS_BYTES, FaultCode::StoreOutOfBounds)?;
    memory[index..index + 4].copy_from_slice(&value.to_be_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{read_u32_be, read_u8, validate_fetch, write_u32_be, write_u8};
    use crate::memory::{new_address_space, MEMORY_BYTES};
    use crate::FaultCode;

    fn last_byte() -> u32 {
        u32::try_from(MEMORY_BYTES - 1).expect("memory size fits u32")
    }

    #[test]
    fn word_access_is_big_endian() {
        let mut memory = new_address_space();
        write_u32_be(&mut memory, 0x100, 0x1122_3344).expect("in bounds");

        assert_eq!(&memory[0x100..0x104], &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(read_u32_be(&memory, 0x100), Ok(0x1122_3344));
        assert_eq!(read_u8(&memory, 0x100), Ok(0x11));
        assert_eq!(read_u8(&memory, 0x103), Ok(0x44));
    }

    #[test]
    fn byte_access_touches_exactly_one_byte() {
        let mut memory = new_address_space();
        write_u8(&mut memory, 0x201, 0xAB).expect("in bounds");

        assert_eq!(read_u32_be(&memory, 0x200), Ok(0x00AB_0000));
    }

    #[test]
    fn last_byte_and_last_word_are_accessible() {
        let mut memory = new_address_space();
        let last = last_byte();

        write_u8(&mut memory, last, 0x5A).expect("last byte in bounds");
        assert_eq!(read_u8(&memory, last), Ok(0x5A));
        write_u32_be(&mut memory, last - 3, 0xDEAD_BEEF).expect("last word in bounds");
        assert_eq!(read_u32_be(&memory, last - 3), Ok(0xDEAD_BEEF));
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    fn word_straddling_the_end_faults(#[case] overhang: u32) {
        let mut memory = new_address_space();
        let addr = last_byte() - 3 + overhang;

        assert_eq!(read_u32_be(&memory, addr), Err(FaultCode::LoadOutOfBounds));
        assert_eq!(
            write_u32_be(&mut memory, addr, 1),
            Err(FaultCode::StoreOutOfBounds)
        );
    }

    #[test]
    fn huge_addresses_fault_instead_of_wrapping() {
        let mut memory = new_address_space();

        assert_eq!(read_u8(&memory, u32::MAX), Err(FaultCode::LoadOutOfBounds));
        assert_eq!(read_u32_be(&memory, u32::MAX - 1), Err(FaultCode::LoadOutOfBounds));
        assert_eq!(
            write_u8(&mut memory, 0x8000_0000, 1),
            Err(FaultCode::StoreOutOfBounds)
        );
        assert!(memory.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn fetch_requires_alignment_and_bounds() {
        let memory = new_address_space();

        assert_eq!(validate_fetch(&memory, 0), Ok(0));
        assert_eq!(validate_fetch(&memory, 0x10), Ok(0x10));
        assert_eq!(validate_fetch(&memory, 2), Err(FaultCode::MisalignedFetch));
        assert_eq!(
            validate_fetch(&memory, last_byte() + 1),
            Err(FaultCode::FetchOutOfBounds)
        );
    }
}
