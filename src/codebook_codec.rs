//! Wire format of a codebook.
//!
//! Every field is [`SYMBOL_BITS`] wide:
//!
//! ```text
//! [N] [symbol_1 .. symbol_N in codeword order] [count of length 1] .. [count of max length]
//! ```
//!
//! The histogram is contiguous: lengths without codewords are written as 0.

use std::io::{Read, Write};

use crate::bit_stream::{BitInput, BitOutput};
use crate::codebook::Codebook;
use crate::error::{ArchiveError, Result};
use crate::symbol::{Symbol, ALPHABET_SIZE, MAX_CODE_LENGTH, SYMBOL_BITS};

pub fn write_codebook<W: Write>(codebook: &Codebook, out: &mut BitOutput<W>) -> Result<()> {
    if codebook.is_empty() {
        return Err(ArchiveError::InvalidArguments(
            "refusing to write an empty codebook".into(),
        ));
    }

    out.put(codebook.len() as u64, SYMBOL_BITS)?;
    for (symbol, _) in codebook.in_code_order() {
        out.put(u64::from(symbol), SYMBOL_BITS)?;
    }
    for count in codebook.length_histogram() {
        out.put(count as u64, SYMBOL_BITS)?;
    }
    Ok(())
}

pub fn read_codebook<R: Read>(input: &mut BitInput<R>) -> Result<Codebook> {
    let size = input.get(SYMBOL_BITS)? as usize;
    if size == 0 || size > ALPHABET_SIZE {
        return Err(ArchiveError::malformed(format!(
            "codebook size {size} out of range"
        )));
    }

    let mut symbols = Vec::with_capacity(size);
    for _ in 0..size {
        let symbol = input.get(SYMBOL_BITS)? as usize;
        if symbol >= ALPHABET_SIZE {
            return Err(ArchiveError::malformed(format!(
                "symbol {symbol} out of range"
            )));
        }
        symbols.push(symbol as Symbol);
    }

    let mut entries = Vec::with_capacity(size);
    let mut remaining = symbols.into_iter();
    let mut length = 0;
    while entries.len() < size {
        length += 1;
        if length > MAX_CODE_LENGTH {
            return Err(ArchiveError::malformed(
                "length histogram runs past the longest allowed code",
            ));
        }
        let count = input.get(SYMBOL_BITS)? as usize;
        if count > size - entries.len() {
            return Err(ArchiveError::malformed(
                "length histogram lists more codes than symbols",
            ));
        }
        entries.extend(remaining.by_ref().take(count).map(|symbol| (symbol, length)));
    }

    Codebook::from_canonical_order(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::FrequencyTable;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn serialize(book: &Codebook) -> Vec<u8> {
        let mut out = BitOutput::new(Vec::new());
        write_codebook(book, &mut out).unwrap();
        out.finish().unwrap()
    }

    fn abab_book() -> Codebook {
        let mut table = FrequencyTable::with_sentinels();
        table.count_bytes(b"ABAB");
        Codebook::build(&table).unwrap()
    }

    #[test]
    fn test_layout() {
        let bytes = serialize(&abab_book());
        assert_eq!(bytes.len(), 11); // 81 bits

        let mut input = BitInput::new(&bytes[..]);
        let fields: Vec<u64> = (0..9).map(|_| input.get(SYMBOL_BITS).unwrap()).collect();
        assert_eq!(fields, vec![5, 65, 66, 258, 256, 257, 0, 3, 2]);
    }

    #[test]
    fn test_roundtrip_abab() {
        let book = abab_book();
        let bytes = serialize(&book);
        let decoded = read_codebook(&mut BitInput::new(&bytes[..])).unwrap();
        assert_eq!(decoded, book);
    }

    #[test]
    fn test_roundtrip_random_tables() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..30 {
            let mut table = FrequencyTable::with_sentinels();
            let spread = rng.gen_range(1..=255u8);
            let data: Vec<u8> = (0..rng.gen_range(0..2000))
                .map(|_| rng.gen_range(0..spread))
                .collect();
            table.count_bytes(&data);
            let book = Codebook::build(&table).unwrap();
            let bytes = serialize(&book);
            let decoded = read_codebook(&mut BitInput::new(&bytes[..])).unwrap();
            assert_eq!(decoded, book);
        }
    }

    #[test]
    fn test_roundtrip_single_symbol() {
        let mut table = FrequencyTable::new();
        table.add(3, 1);
        let book = Codebook::build(&table).unwrap();
        let bytes = serialize(&book);
        let decoded = read_codebook(&mut BitInput::new(&bytes[..])).unwrap();
        assert_eq!(decoded, book);
    }

    #[test]
    fn test_truncated_codebook() {
        let bytes = serialize(&abab_book());
        let result = read_codebook(&mut BitInput::new(&bytes[..5]));
        assert!(matches!(result, Err(ArchiveError::UnexpectedEndOfInput)));
    }

    #[test]
    fn test_zero_size_rejected() {
        let bytes = [0u8; 4];
        let result = read_codebook(&mut BitInput::new(&bytes[..]));
        assert!(matches!(result, Err(ArchiveError::MalformedArchive(_))));
    }

    #[test]
    fn test_histogram_overrun_rejected() {
        let mut out = BitOutput::new(Vec::new());
        for field in [2u64, 10, 11, 3] {
            out.put(field, SYMBOL_BITS).unwrap();
        }
        let bytes = out.finish().unwrap();
        let result = read_codebook(&mut BitInput::new(&bytes[..]));
        assert!(matches!(result, Err(ArchiveError::MalformedArchive(_))));
    }

    #[test]
    fn test_out_of_range_symbol_rejected() {
        let mut out = BitOutput::new(Vec::new());
        for field in [1u64, 300, 1] {
            out.put(field, SYMBOL_BITS).unwrap();
        }
        let bytes = out.finish().unwrap();
        let result = read_codebook(&mut BitInput::new(&bytes[..]));
        assert!(matches!(result, Err(ArchiveError::MalformedArchive(_))));
    }

    #[test]
    fn test_empty_codebook_not_written() {
        let mut out = BitOutput::new(Vec::new());
        let result = write_codebook(&Codebook::default(), &mut out);
        assert!(matches!(result, Err(ArchiveError::InvalidArguments(_))));
        assert_eq!(out.bits_written(), 0);
    }
}
