// src/huffman/tree.rs

//! Huffman tree construction.
//!
//! Nodes live in a flat arena and refer to their children by index. The arena
//! index doubles as the insertion order used to break weight ties: leaves get
//! `0..k` in ascending symbol order, merged nodes continue from `k`.

use crate::huffman::canonical::{Code, CodeTable, MAX_CODE_LENGTH};
use crate::utils::error::{HuffError, Result};
use log::debug;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Size of the byte alphabet.
pub const SYMBOLS: usize = 256;

/// Occurrence counts of every byte value in an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; SYMBOLS],
}

impl FrequencyTable {
    #[inline]
    pub fn new() -> Self {
        FrequencyTable {
            counts: [0; SYMBOLS],
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        let mut table = Self::new();
        for &b in data {
            table.counts[b as usize] += 1;
        }
        table
    }

    #[inline]
    pub fn from_counts(counts: [u64; SYMBOLS]) -> Self {
        FrequencyTable { counts }
    }

    #[inline]
    pub fn count(&self, symbol: u8) -> u64 {
        self.counts[symbol as usize]
    }

    #[inline]
    pub fn counts(&self) -> &[u64; SYMBOLS] {
        &self.counts
    }

    /// Sum of all counts, i.e. the length of the counted input.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of symbols with a non-zero count.
    pub fn active_symbols(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of a node inside the tree arena.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf(u8),
    Internal { left: NodeId, right: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanNode {
    pub weight: u64,
    pub kind: NodeKind,
}

/// A Huffman tree stored as an arena of nodes.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    nodes: Vec<HuffmanNode>,
    root: NodeId,
}

impl HuffmanTree {
    /// Builds the tree for `freq`.
    ///
    /// The two lightest nodes are merged until one remains; among equal
    /// weights the node inserted first wins. The first node taken becomes the
    /// left child.
    pub fn build(freq: &FrequencyTable) -> Result<Self> {
        let active = freq.active_symbols();
        if active == 0 {
            return Err(HuffError::EmptyInput);
        }

        let mut nodes = Vec::with_capacity(2 * active - 1);
        let mut heap = BinaryHeap::with_capacity(active);

        for (symbol, &count) in freq.counts().iter().enumerate() {
            if count > 0 {
                let id = nodes.len();
                nodes.push(HuffmanNode {
                    weight: count,
                    kind: NodeKind::Leaf(symbol as u8),
                });
                heap.push(Reverse((count, id)));
            }
        }

        let root = loop {
            let Some(Reverse((wa, left))) = heap.pop() else {
                return Err(HuffError::EmptyInput);
            };
            let Some(Reverse((wb, right))) = heap.pop() else {
                break left;
            };
            let id = nodes.len();
            let weight = wa + wb;
            nodes.push(HuffmanNode {
                weight,
                kind: NodeKind::Internal { left, right },
            });
            heap.push(Reverse((weight, id)));
        };

        debug!(
            "built Huffman tree: {} symbols, {} nodes, root weight {}",
            active,
            nodes.len(),
            nodes[root].weight
        );

        Ok(HuffmanTree { nodes, root })
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &HuffmanNode {
        &self.nodes[id]
    }

    /// Number of nodes in the arena (`2k - 1` for `k` symbols).
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks the tree and returns the code of every leaf: a left edge appends
    /// a 0 bit, a right edge a 1 bit.
    ///
    /// A tree made of a single leaf gives that symbol the 1-bit code `0`.
    /// Fails when a leaf sits deeper than [`MAX_CODE_LENGTH`].
    pub fn assign_codes(&self) -> Result<CodeTable> {
        let mut codes = [Code::default(); SYMBOLS];

        if let NodeKind::Leaf(symbol) = self.nodes[self.root].kind {
            codes[symbol as usize] = Code { bits: 0, length: 1 };
            return Ok(codes);
        }

        let mut stack: Vec<(NodeId, u64, u32)> = vec![(self.root, 0, 0)];
        while let Some((id, bits, depth)) = stack.pop() {
            if depth > MAX_CODE_LENGTH as u32 {
                return Err(HuffError::Format(format!(
                    "code length {} exceeds maximum of {}",
                    depth, MAX_CODE_LENGTH
                )));
            }
            match self.nodes[id].kind {
                NodeKind::Leaf(symbol) => {
                    codes[symbol as usize] = Code {
                        bits,
                        length: depth as u8,
                    };
                }
                NodeKind::Internal { left, right } => {
                    let next = bits << 1;
                    stack.push((right, next | 1, depth + 1));
                    stack.push((left, next, depth + 1));
                }
            }
        }
        Ok(codes)
    }

    /// Code length of every symbol, 0 for symbols absent from the tree.
    pub fn code_lengths(&self) -> Result<[u8; SYMBOLS]> {
        let codes = self.assign_codes()?;
        let mut lengths = [0u8; SYMBOLS];
        for (len, code) in lengths.iter_mut().zip(codes.iter()) {
            *len = code.length;
        }
        Ok(lengths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(u8, u64)]) -> FrequencyTable {
        let mut counts = [0u64; SYMBOLS];
        for &(s, c) in pairs {
            counts[s as usize] = c;
        }
        FrequencyTable::from_counts(counts)
    }

    #[test]
    fn frequency_table_counts_bytes() {
        let freq = FrequencyTable::from_bytes(b"abracadabra");
        assert_eq!(freq.count(b'a'), 5);
        assert_eq!(freq.count(b'b'), 2);
        assert_eq!(freq.count(b'z'), 0);
        assert_eq!(freq.total(), 11);
        assert_eq!(freq.active_symbols(), 5);
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(
            HuffmanTree::build(&FrequencyTable::new()),
            Err(HuffError::EmptyInput)
        ));
    }

    #[test]
    fn single_symbol_gets_one_bit() {
        let tree = HuffmanTree::build(&table(&[(b'x', 42)])).unwrap();
        assert_eq!(tree.len(), 1);
        let codes = tree.assign_codes().unwrap();
        assert_eq!(codes[b'x' as usize], Code { bits: 0, length: 1 });
        assert_eq!(codes.iter().filter(|c| c.length > 0).count(), 1);
    }

    #[test]
    fn worked_example_lengths() {
        let freq = table(&[(b'A', 8), (b'B', 4), (b'C', 2), (b'D', 1)]);
        let tree = HuffmanTree::build(&freq).unwrap();
        assert_eq!(tree.len(), 7);
        assert_eq!(tree.node(tree.root()).weight, 15);

        let lengths = tree.code_lengths().unwrap();
        assert_eq!(lengths[b'A' as usize], 1);
        assert_eq!(lengths[b'B' as usize], 2);
        assert_eq!(lengths[b'C' as usize], 3);
        assert_eq!(lengths[b'D' as usize], 3);
    }

    #[test]
    fn ties_break_on_insertion_order() {
        // All equal weights: leaves 0 and 1 merge first, then 2 and 3.
        let freq = table(&[(0, 1), (1, 1), (2, 1), (3, 1)]);
        let tree = HuffmanTree::build(&freq).unwrap();
        assert_eq!(tree.node(4).kind, NodeKind::Internal { left: 0, right: 1 });
        assert_eq!(tree.node(5).kind, NodeKind::Internal { left: 2, right: 3 });
        assert_eq!(tree.root(), 6);
    }

    #[test]
    fn build_is_deterministic() {
        let freq = FrequencyTable::from_bytes(b"the quick brown fox jumps over the lazy dog");
        let a = HuffmanTree::build(&freq).unwrap().assign_codes().unwrap();
        let b = HuffmanTree::build(&freq).unwrap().assign_codes().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn skewed_weights_stay_within_limit() {
        // Fibonacci weights give the deepest possible tree for their count.
        let mut pairs = Vec::new();
        let (mut a, mut b) = (1u64, 1u64);
        for s in 0..40u8 {
            pairs.push((s, a));
            let next = a + b;
            a = b;
            b = next;
        }
        let tree = HuffmanTree::build(&table(&pairs)).unwrap();
        let lengths = tree.code_lengths().unwrap();
        assert_eq!(lengths.iter().copied().max(), Some(39));
    }
}
