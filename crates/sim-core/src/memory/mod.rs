//! Memory model primitives: one flat, zero-initialized, byte-addressable
//! region with bounds-checked accessors.

/// Bounds-checked byte and big-endian word accessors.
pub mod access;

pub use access::{
    read_u32_be, read_u8, validate_access, validate_fetch, write_u32_be, write_u8,
    WORD_ACCESS_BYTES,
};

/// Size in bytes of the flat memory region (1 MiB).
pub const MEMORY_BYTES: usize = 1 << 20;

/// Allocates a canonical zeroed 1 MiB memory backing store.
#[must_use]
pub fn new_address_space() -> Box<[u8]> {
    vec![0; MEMORY_BYTES].into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::{new_address_space, MEMORY_BYTES};

    #[test]
    fn canonical_backing_store_size_is_one_mebibyte() {
        let memory = new_address_space();
        assert_eq!(memory.len(), MEMORY_BYTES);
        assert_eq!(MEMORY_BYTES, 1_048_576);
        assert!(memory.iter().all(|byte| *byte == 0));
    }
}
