//! The archive alphabet: raw bytes plus three structural sentinels.

/// A coded symbol. `0..=255` are raw bytes, `256..=258` are sentinels.
pub type Symbol = u16;

/// Terminates the stored filename of a record.
pub const FILENAME_END: Symbol = 256;
/// Terminates a record that is followed by another one.
pub const ONE_MORE_FILE: Symbol = 257;
/// Terminates the last record of the archive.
pub const ARCHIVE_END: Symbol = 258;

pub const SENTINELS: [Symbol; 3] = [FILENAME_END, ONE_MORE_FILE, ARCHIVE_END];

/// Number of distinct symbols.
pub const ALPHABET_SIZE: usize = 259;

/// Width of every codebook header field.
pub const SYMBOL_BITS: u32 = 9;

/// Codewords are packed into a `u64`.
pub const MAX_CODE_LENGTH: usize = 64;

pub fn is_sentinel(symbol: Symbol) -> bool {
    symbol >= FILENAME_END
}
