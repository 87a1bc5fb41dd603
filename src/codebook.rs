//! Canonical Huffman codebooks.
//!
//! A codebook is built in three steps: count symbol frequencies, merge
//! singleton tries through a [`PriorityQueue`] until one Huffman trie is
//! left, then throw away the trie's raw codewords and keep only each
//! symbol's code length. Codewords are reassigned canonically in
//! `(length, symbol)` order, so the whole table can be rebuilt from the
//! symbol order plus per-length counts.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{ArchiveError, Result};
use crate::priority_queue::PriorityQueue;
use crate::symbol::{Symbol, ALPHABET_SIZE, MAX_CODE_LENGTH, SENTINELS};
use crate::trie::{Trie, TrieCursor};

/// A codeword: the low `length` bits of `bits`, read MSB-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolCodeInfo {
    pub bits: u64,
    pub length: usize,
}

/// Occurrence counts over the whole alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; ALPHABET_SIZE],
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self {
            counts: [0; ALPHABET_SIZE],
        }
    }

    /// A table where every sentinel already occurs once, so each of them
    /// is guaranteed a code whatever the data looks like.
    pub fn with_sentinels() -> Self {
        let mut table = Self::new();
        for sentinel in SENTINELS {
            table.add(sentinel, 1);
        }
        table
    }

    /// Add `count` occurrences of `symbol`. Symbols outside the alphabet are ignored.
    pub fn add(&mut self, symbol: Symbol, count: u64) {
        if let Some(slot) = self.counts.get_mut(symbol as usize) {
            *slot = slot.saturating_add(count);
        }
    }

    pub fn count_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.counts[b as usize] += 1;
        }
    }

    /// Symbols with a non-zero count, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(symbol, &count)| (symbol as Symbol, count))
    }

    pub fn distinct_symbols(&self) -> usize {
        self.iter().count()
    }
}

struct MergeCandidate {
    frequency: u64,
    least_symbol: Symbol,
    trie: Trie,
}

fn merge_order(a: &MergeCandidate, b: &MergeCandidate) -> Ordering {
    a.frequency
        .cmp(&b.frequency)
        .then(a.least_symbol.cmp(&b.least_symbol))
}

fn leaf_candidates(frequencies: &FrequencyTable) -> Vec<MergeCandidate> {
    frequencies
        .iter()
        .map(|(symbol, frequency)| MergeCandidate {
            frequency,
            least_symbol: symbol,
            trie: Trie::leaf(symbol),
        })
        .collect()
}

/// Merge the two smallest candidates until one trie is left. Every
/// candidate owns a distinct `least_symbol`, so the merge sequence does
/// not depend on the order of `candidates`.
fn merge_candidates(candidates: Vec<MergeCandidate>) -> Option<Trie> {
    let mut queue = PriorityQueue::from_vec_with_comparator(candidates, merge_order);
    while queue.len() > 1 {
        let (Some(left), Some(right)) = (queue.pop(), queue.pop()) else {
            break;
        };
        queue.push(MergeCandidate {
            frequency: left.frequency.saturating_add(right.frequency),
            least_symbol: left.least_symbol.min(right.least_symbol),
            trie: Trie::join(left.trie, right.trie),
        });
    }

    queue.pop().map(|candidate| candidate.trie)
}

fn collect_codes(
    cursor: &mut TrieCursor<'_>,
    code: SymbolCodeInfo,
    out: &mut Vec<(Symbol, SymbolCodeInfo)>,
) {
    if let Some(symbol) = cursor.symbol() {
        out.push((symbol, code));
    }
    for bit in [false, true] {
        if cursor.go_to_child(bit) {
            let child_code = SymbolCodeInfo {
                bits: (code.bits << 1) | u64::from(bit),
                length: code.length + 1,
            };
            collect_codes(cursor, child_code, out);
            cursor.go_to_parent();
        }
    }
}

/// Symbol to codeword mapping with canonical code assignment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Codebook {
    codes: BTreeMap<Symbol, SymbolCodeInfo>,
}

impl Codebook {
    /// Build the canonical Huffman codebook for the non-zero entries of `frequencies`.
    ///
    /// A table with a single symbol gets the 1-bit code `0`.
    pub fn build(frequencies: &FrequencyTable) -> Result<Self> {
        let trie = merge_candidates(leaf_candidates(frequencies)).ok_or_else(|| {
            ArchiveError::InvalidArguments("cannot build a codebook without symbols".into())
        })?;
        Self::from_huffman_trie(&trie)
    }

    /// Keep only the code lengths of `trie` and assign canonical codewords.
    fn from_huffman_trie(trie: &Trie) -> Result<Self> {
        let mut raw = Vec::new();
        collect_codes(&mut trie.cursor(), SymbolCodeInfo::default(), &mut raw);

        let mut lengths: Vec<(Symbol, usize)> = raw
            .into_iter()
            .map(|(symbol, code)| (symbol, code.length.max(1)))
            .collect();
        if let Some(&(symbol, length)) = lengths.iter().find(|(_, l)| *l > MAX_CODE_LENGTH) {
            return Err(ArchiveError::CodeTooLong { symbol, length });
        }
        lengths.sort_by_key(|&(symbol, length)| (length, symbol));

        Self::from_canonical_order(lengths)
    }

    /// Assign canonical codewords to `(symbol, length)` pairs taken in code
    /// order: the first gets all zeros, every next one is the previous
    /// codeword plus one, shifted left by the growth in length.
    pub fn from_canonical_order<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Symbol, usize)>,
    {
        let mut codes = BTreeMap::new();
        let mut previous: Option<SymbolCodeInfo> = None;

        for (symbol, length) in entries {
            if symbol as usize >= ALPHABET_SIZE {
                return Err(ArchiveError::malformed(format!("symbol {symbol} out of range")));
            }
            if length == 0 || length > MAX_CODE_LENGTH {
                return Err(ArchiveError::malformed(format!(
                    "code length {length} for symbol {symbol} out of range"
                )));
            }

            let bits: u128 = match previous {
                None => 0,
                Some(prev) => {
                    if length < prev.length {
                        return Err(ArchiveError::malformed("code lengths are not ascending"));
                    }
                    (u128::from(prev.bits) + 1) << (length - prev.length)
                }
            };
            if bits >= 1u128 << length {
                return Err(ArchiveError::malformed(
                    "code lengths oversubscribe the code space",
                ));
            }

            let code = SymbolCodeInfo {
                bits: bits as u64,
                length,
            };
            if codes.insert(symbol, code).is_some() {
                return Err(ArchiveError::malformed(format!(
                    "symbol {symbol} listed twice"
                )));
            }
            previous = Some(code);
        }

        Ok(Self { codes })
    }

    pub fn get(&self, symbol: Symbol) -> Option<SymbolCodeInfo> {
        self.codes.get(&symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Entries in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, SymbolCodeInfo)> + '_ {
        self.codes.iter().map(|(&symbol, &code)| (symbol, code))
    }

    /// Entries in ascending codeword order, i.e. by `(length, symbol)`.
    pub fn in_code_order(&self) -> Vec<(Symbol, SymbolCodeInfo)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_key(|&(_, code)| (code.length, code.bits));
        entries
    }

    pub fn max_length(&self) -> usize {
        self.codes.values().map(|c| c.length).max().unwrap_or(0)
    }

    /// How many codewords have each length, starting at length 1.
    pub fn length_histogram(&self) -> Vec<usize> {
        let mut counts = vec![0; self.max_length()];
        for code in self.codes.values() {
            counts[code.length - 1] += 1;
        }
        counts
    }

    /// Decode automaton for this codebook.
    pub fn to_trie(&self) -> Result<Trie> {
        let mut trie = Trie::new();
        for (symbol, code) in self.iter() {
            trie.add_branch(code.bits, code.length, symbol)?;
        }
        Ok(trie)
    }

    pub fn is_prefix_free(&self) -> bool {
        let codes: Vec<_> = self.codes.values().collect();
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                let (short, long) = if a.length <= b.length { (a, b) } else { (b, a) };
                let shift = (long.length - short.length) as u32;
                if long.bits.checked_shr(shift).unwrap_or(0) == short.bits {
                    return false;
                }
            }
        }
        true
    }
}
