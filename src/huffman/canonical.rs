// src/huffman/canonical.rs

//! Canonical code assignment and the matching decode index.
//!
//! A canonical code is fully determined by the per-symbol code lengths:
//! symbols are ordered by `(length, symbol)` and numbered consecutively, with
//! the first code of each length given by
//! `first_code[len] = (first_code[len - 1] + count[len - 1]) << 1`.
//! Encoder and decoder both run [`canonical_codes`] on the same 256 lengths,
//! so only the lengths travel in a frame.

use crate::huffman::tree::SYMBOLS;
use crate::utils::error::{HuffError, Result};

/// Longest supported code, bounded by the 64-bit decode accumulator.
pub const MAX_CODE_LENGTH: u8 = 64;

/// A symbol's code: the low `length` bits of `bits`. Length 0 means the
/// symbol does not occur.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Code {
    pub bits: u64,
    pub length: u8,
}

pub type CodeTable = [Code; SYMBOLS];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalEntry {
    pub symbol: u8,
    pub code: u64,
    pub length: u8,
}

/// Range of codes of one length inside the sorted entry list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalRow {
    pub base_code: u64,
    pub start_index: usize,
    pub count: usize,
}

/// Present symbols ordered by `(length asc, symbol asc)`.
pub fn sorted_symbols(lengths: &[u8; SYMBOLS]) -> Vec<u8> {
    let mut symbols: Vec<u8> = (0..=255u8)
        .filter(|&s| lengths[s as usize] > 0)
        .collect();
    symbols.sort_by_key(|&s| (lengths[s as usize], s));
    symbols
}

/// Checks that `lengths` describe a decodable prefix code: no length above
/// [`MAX_CODE_LENGTH`] and the Kraft sum does not exceed one.
pub fn validate_lengths(lengths: &[u8; SYMBOLS]) -> Result<()> {
    let mut kraft: u128 = 0;
    for (symbol, &len) in lengths.iter().enumerate() {
        if len == 0 {
            continue;
        }
        if len > MAX_CODE_LENGTH {
            return Err(HuffError::Format(format!(
                "code length {} for symbol {} exceeds maximum of {}",
                len, symbol, MAX_CODE_LENGTH
            )));
        }
        kraft += 1u128 << (MAX_CODE_LENGTH - len);
    }
    if kraft > 1u128 << MAX_CODE_LENGTH {
        return Err(HuffError::Format("code lengths are over-subscribed".to_string()));
    }
    Ok(())
}

/// Derives the canonical code of every symbol from its length alone.
pub fn canonical_codes(lengths: &[u8; SYMBOLS]) -> Result<CodeTable> {
    validate_lengths(lengths)?;

    let mut codes = [Code::default(); SYMBOLS];
    let symbols = sorted_symbols(lengths);
    let Some(max_len) = symbols.last().map(|&s| lengths[s as usize]) else {
        return Ok(codes);
    };
    let max_len = max_len as usize;

    let mut bl_count = [0u128; MAX_CODE_LENGTH as usize + 1];
    for &s in &symbols {
        bl_count[lengths[s as usize] as usize] += 1;
    }

    // u128 so that unused lengths near 64 bits cannot overflow
    let mut next_code = [0u128; MAX_CODE_LENGTH as usize + 1];
    let mut code: u128 = 0;
    for len in 1..=max_len {
        code = (code + bl_count[len - 1]) << 1;
        next_code[len] = code;
    }

    for &s in &symbols {
        let len = lengths[s as usize];
        let assigned = next_code[len as usize];
        next_code[len as usize] += 1;
        codes[s as usize] = Code {
            bits: assigned as u64,
            length: len,
        };
    }

    if cfg!(feature = "debug-logging") {
        for &s in &symbols {
            let c = codes[s as usize];
            log::trace!("symbol {:3}: length {:2} code {:b}", s, c.length, c.bits);
        }
    }

    Ok(codes)
}

/// Decode index rebuilt from stored code lengths.
#[derive(Debug, Clone)]
pub struct DecodeTable {
    entries: Vec<CanonicalEntry>,
    rows: Vec<CanonicalRow>, // indexed by code length, 0..=max_len
    max_len: u8,
}

impl DecodeTable {
    pub fn from_lengths(lengths: &[u8; SYMBOLS]) -> Result<Self> {
        let codes = canonical_codes(lengths)?;

        let entries: Vec<CanonicalEntry> = sorted_symbols(lengths)
            .into_iter()
            .map(|s| {
                let c = codes[s as usize];
                CanonicalEntry {
                    symbol: s,
                    code: c.bits,
                    length: c.length,
                }
            })
            .collect();

        let max_len = entries.last().map_or(0, |e| e.length);
        let mut rows = vec![CanonicalRow::default(); max_len as usize + 1];

        let mut idx = 0;
        while idx < entries.len() {
            let len = entries[idx].length;
            let start = idx;
            while idx < entries.len() && entries[idx].length == len {
                idx += 1;
            }
            rows[len as usize] = CanonicalRow {
                base_code: entries[start].code,
                start_index: start,
                count: idx - start,
            };
        }

        Ok(DecodeTable {
            entries,
            rows,
            max_len,
        })
    }

    /// Returns the symbol whose code is the low `length` bits of `value`, if
    /// there is one.
    #[inline]
    pub fn lookup(&self, length: u8, value: u64) -> Option<u8> {
        let row = self.rows.get(length as usize)?;
        if row.count == 0 || value < row.base_code {
            return None;
        }
        let offset = value - row.base_code;
        if offset < row.count as u64 {
            Some(self.entries[row.start_index + offset as usize].symbol)
        } else {
            None
        }
    }

    #[inline]
    pub fn max_len(&self) -> u8 {
        self.max_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &[CanonicalEntry] {
        &self.entries
    }

    #[inline]
    pub fn row(&self, length: u8) -> Option<&CanonicalRow> {
        self.rows.get(length as usize)
    }
}
