//! Ordinary cells.
//!
//! A cell is sealed at construction: its representation hash and depth are
//! computed once, from its own data and the already-sealed children. This is
//! why a cell can only reference cells that exist before it.

use std::sync::Arc;

use crate::{sha256, CellSlice, MAX_CELL_BITS, MAX_CELL_REFS};

/// Hash size in bytes (SHA-256).
pub const HASH_BYTES: usize = 32;

/// An immutable ordinary cell.
///
/// Equality and `Hash` follow the representation hash, so two cells with the
/// same bits and the same subtree compare equal regardless of sharing.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Data bytes; bits past `bit_len` in the last byte are always zero.
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<Arc<Cell>>,
    hash: [u8; HASH_BYTES],
    depth: u16,
}

impl Cell {
    /// Seal a cell. Limits are enforced by `CellBuilder`.
    pub(crate) fn new(mut data: Vec<u8>, bit_len: usize, references: Vec<Arc<Cell>>) -> Self {
        debug_assert!(bit_len <= MAX_CELL_BITS);
        debug_assert!(references.len() <= MAX_CELL_REFS);

        data.truncate(bit_len.div_ceil(8));
        data.resize(bit_len.div_ceil(8), 0);
        if bit_len % 8 != 0
            && let Some(last) = data.last_mut()
        {
            *last &= 0xFFu8 << (8 - bit_len % 8);
        }

        let depth = references
            .iter()
            .map(|r| r.depth.saturating_add(1))
            .max()
            .unwrap_or(0);

        let mut cell = Cell {
            data,
            bit_len,
            references,
            hash: [0u8; HASH_BYTES],
            depth,
        };
        cell.hash = sha256(&cell.representation());
        cell
    }

    /// The empty cell (no bits, no references).
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, Vec::new())
    }

    /// Representation hash.
    pub fn hash(&self) -> [u8; HASH_BYTES] {
        self.hash
    }

    /// Length of the longest reference path below this cell.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Descriptor bytes `(d1, d2)`.
    ///
    /// For ordinary level-0 cells `d1` is just the reference count and
    /// `d2 = ceil(bits / 8) + floor(bits / 8)`.
    pub fn descriptors(&self) -> (u8, u8) {
        let d1 = self.references.len() as u8;
        let d2 = (self.bit_len.div_ceil(8) + self.bit_len / 8) as u8;
        (d1, d2)
    }

    /// Data bytes with the completion tag appended when the bit length is not
    /// byte-aligned (a single `1` followed by zero padding).
    pub fn data_with_completion_tag(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        let rem = self.bit_len % 8;
        if rem != 0
            && let Some(last) = out.last_mut()
        {
            *last |= 1 << (7 - rem);
        }
        out
    }

    /// Bytes fed to SHA-256 to obtain the representation hash.
    pub fn representation(&self) -> Vec<u8> {
        let mut repr =
            Vec::with_capacity(2 + self.data.len() + self.references.len() * (2 + HASH_BYTES));
        let (d1, d2) = self.descriptors();
        repr.push(d1);
        repr.push(d2);
        repr.extend_from_slice(&self.data_with_completion_tag());
        for r in &self.references {
            repr.extend_from_slice(&r.depth.to_be_bytes());
        }
        for r in &self.references {
            repr.extend_from_slice(&r.hash);
        }
        repr
    }

    /// Raw data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Bit at `index`, or `None` past the end.
    pub fn get_bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }
        Some((self.data[index / 8] >> (7 - index % 8)) & 1 == 1)
    }

    /// True when the cell holds neither bits nor references.
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.references.is_empty()
    }

    /// Start reading this cell.
    pub fn as_slice(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_hash() {
        // Well-known hash of the empty ordinary cell.
        let cell = Cell::empty();
        assert_eq!(
            hex::encode(cell.hash()),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
        assert_eq!(cell.depth(), 0);
        assert!(cell.is_empty());
    }

    #[test]
    fn test_descriptors() {
        let cell = Cell::new(vec![0xFF], 8, vec![]);
        assert_eq!(cell.descriptors(), (0, 2));

        let cell = Cell::new(vec![0b1111_1000], 5, vec![]);
        assert_eq!(cell.descriptors(), (0, 1));
    }

    #[test]
    fn test_completion_tag() {
        let cell = Cell::new(vec![0xFF], 8, vec![]);
        assert_eq!(cell.data_with_completion_tag(), vec![0xFF]);

        let cell = Cell::new(vec![0b1111_1000], 5, vec![]);
        assert_eq!(cell.data_with_completion_tag(), vec![0b1111_1100]);
    }

    #[test]
    fn test_padding_bits_are_cleared() {
        let a = Cell::new(vec![0b1011_1111], 3, vec![]);
        let b = Cell::new(vec![0b1010_0000], 3, vec![]);
        assert_eq!(a.data(), &[0b1010_0000]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_depth() {
        let leaf = Arc::new(Cell::empty());
        let mid = Arc::new(Cell::new(vec![], 0, vec![leaf.clone()]));
        let top = Cell::new(vec![], 0, vec![leaf, mid]);
        assert_eq!(top.depth(), 2);
    }

    #[test]
    fn test_get_bit() {
        let cell = Cell::new(vec![0b1010_0000], 3, vec![]);
        assert_eq!(cell.get_bit(0), Some(true));
        assert_eq!(cell.get_bit(1), Some(false));
        assert_eq!(cell.get_bit(2), Some(true));
        assert_eq!(cell.get_bit(3), None);
    }
}
