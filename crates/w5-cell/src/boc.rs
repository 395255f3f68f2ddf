//! Bag of Cells serialization.
//!
//! Requests leave the codec as a BoC: a flat list of cells, parents before
//! children, each child addressed by its index. Identical subtrees are stored
//! once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{
    crc32c, Cell, CellError, CellResult, BOC_GENERIC_MAGIC, BOC_INDEXED_CRC32_MAGIC,
    BOC_INDEXED_MAGIC, HASH_BYTES, MAX_CELL_REFS,
};

/// A serialized collection of root cells.
#[derive(Debug, Clone)]
pub struct BagOfCells {
    roots: Vec<Arc<Cell>>,
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

impl BagOfCells {
    pub fn new(roots: Vec<Arc<Cell>>) -> Self {
        BagOfCells { roots }
    }

    pub fn from_root(root: Cell) -> Self {
        BagOfCells {
            roots: vec![Arc::new(root)],
        }
    }

    pub fn roots(&self) -> &[Arc<Cell>] {
        &self.roots
    }

    /// The only root, or `NotSingleRoot`.
    pub fn single_root(&self) -> CellResult<&Arc<Cell>> {
        match self.roots.as_slice() {
            [root] => Ok(root),
            roots => Err(CellError::NotSingleRoot(roots.len())),
        }
    }

    /// Generic format with a CRC32-C trailer and no index.
    pub fn serialize(&self) -> CellResult<Vec<u8>> {
        self.serialize_with_options(true, false)
    }

    pub fn serialize_with_options(&self, with_crc: bool, with_index: bool) -> CellResult<Vec<u8>> {
        if self.roots.is_empty() {
            return Err(CellError::InvalidBoc("No root cells".to_string()));
        }

        let cells = self.ordered_cells();
        let index: HashMap<[u8; HASH_BYTES], usize> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash(), i))
            .collect();

        let size_bytes = bytes_needed(cells.len());
        let mut blobs = Vec::with_capacity(cells.len());
        for cell in &cells {
            let (d1, d2) = cell.descriptors();
            let mut blob = vec![d1, d2];
            blob.extend_from_slice(&cell.data_with_completion_tag());
            for r in cell.references() {
                let idx = index
                    .get(&r.hash())
                    .ok_or_else(|| CellError::InvalidBoc("Reference not indexed".to_string()))?;
                write_uint(&mut blob, *idx as u64, size_bytes);
            }
            blobs.push(blob);
        }
        let total_size: usize = blobs.iter().map(Vec::len).sum();
        let off_bytes = bytes_needed(total_size);

        let mut out = Vec::with_capacity(total_size + 32);
        out.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());
        let mut flags = size_bytes as u8;
        if with_index {
            flags |= 0x80;
        }
        if with_crc {
            flags |= 0x40;
        }
        out.push(flags);
        out.push(off_bytes as u8);
        write_uint(&mut out, cells.len() as u64, size_bytes);
        write_uint(&mut out, self.roots.len() as u64, size_bytes);
        write_uint(&mut out, 0, size_bytes);
        write_uint(&mut out, total_size as u64, off_bytes);
        for root in &self.roots {
            let idx = index
                .get(&root.hash())
                .ok_or_else(|| CellError::InvalidBoc("Root not indexed".to_string()))?;
            write_uint(&mut out, *idx as u64, size_bytes);
        }
        if with_index {
            let mut offset = 0usize;
            for blob in &blobs {
                offset += blob.len();
                write_uint(&mut out, offset as u64, off_bytes);
            }
        }
        for blob in &blobs {
            out.extend_from_slice(blob);
        }
        if with_crc {
            let crc = crc32c(&out);
            out.extend_from_slice(&crc.to_le_bytes());
        }
        Ok(out)
    }

    pub fn serialize_to_base64(&self) -> CellResult<String> {
        Ok(STANDARD.encode(self.serialize()?))
    }

    /// Parse any of the three BoC magics. Exotic cells are rejected.
    pub fn deserialize(data: &[u8]) -> CellResult<Self> {
        let mut reader = Reader { data, pos: 0 };

        let magic = u32::from_be_bytes(reader.take_array::<4>()?);
        let (has_idx, has_crc, size_bytes) = match magic {
            BOC_GENERIC_MAGIC => {
                let flags = reader.take(1)?[0];
                (flags & 0x80 != 0, flags & 0x40 != 0, (flags & 0x07) as usize)
            }
            BOC_INDEXED_MAGIC => (true, false, reader.take(1)?[0] as usize),
            BOC_INDEXED_CRC32_MAGIC => (true, true, reader.take(1)?[0] as usize),
            other => {
                return Err(CellError::InvalidBoc(format!("Invalid magic: {:08x}", other)));
            }
        };
        if size_bytes == 0 || size_bytes > 4 {
            return Err(CellError::InvalidBoc(format!("Invalid size field: {}", size_bytes)));
        }

        let off_bytes = reader.take(1)?[0] as usize;
        if off_bytes == 0 || off_bytes > 8 {
            return Err(CellError::InvalidBoc(format!("Invalid offset field: {}", off_bytes)));
        }

        let cell_count = reader.uint(size_bytes)? as usize;
        let root_count = reader.uint(size_bytes)? as usize;
        let _absent = reader.uint(size_bytes)?;
        let total_size = reader.uint(off_bytes)? as usize;

        // Every cell takes at least its two descriptor bytes.
        if cell_count == 0 || cell_count > total_size / 2 {
            return Err(CellError::InvalidBoc(format!(
                "{} cells cannot fit in {} bytes",
                cell_count, total_size
            )));
        }
        if root_count == 0 || root_count > cell_count {
            return Err(CellError::InvalidBoc(format!(
                "Invalid root count {} for {} cells",
                root_count, cell_count
            )));
        }

        let root_indices = (0..root_count)
            .map(|_| reader.uint(size_bytes).map(|v| v as usize))
            .collect::<CellResult<Vec<_>>>()?;
        if has_idx {
            let index_len = cell_count
                .checked_mul(off_bytes)
                .ok_or(CellError::UnexpectedEof)?;
            reader.take(index_len)?;
        }

        let cells_start = reader.pos;
        let cells_data = reader.take(total_size)?;

        if has_crc {
            let trailer = reader.take_array::<4>()?;
            let expected = u32::from_le_bytes(trailer);
            let actual = crc32c(&data[..cells_start + total_size]);
            if expected != actual {
                return Err(CellError::CrcMismatch { expected, actual });
            }
        }

        let raw = parse_raw_cells(cells_data, cell_count, size_bytes)?;
        let cells = link_cells(raw)?;

        let roots = root_indices
            .into_iter()
            .map(|i| cells.get(i).cloned().ok_or(CellError::CellNotFound(i)))
            .collect::<CellResult<Vec<_>>>()?;
        Ok(BagOfCells { roots })
    }

    pub fn deserialize_from_base64(s: &str) -> CellResult<Self> {
        let bytes = STANDARD
            .decode(s.trim())
            .map_err(|e| CellError::InvalidBase64(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    pub fn deserialize_from_hex(s: &str) -> CellResult<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| CellError::InvalidBoc(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Cells in BoC order: every parent precedes its children.
    fn ordered_cells(&self) -> Vec<Arc<Cell>> {
        // Post-order DFS yields children first; reversing puts parents first.
        let mut seen: HashSet<[u8; HASH_BYTES]> = HashSet::new();
        let mut post_order: Vec<Arc<Cell>> = Vec::new();
        let mut stack: Vec<(Arc<Cell>, bool)> = self
            .roots
            .iter()
            .rev()
            .map(|r| (r.clone(), false))
            .collect();

        while let Some((cell, expanded)) = stack.pop() {
            if expanded {
                post_order.push(cell);
                continue;
            }
            if !seen.insert(cell.hash()) {
                continue;
            }
            stack.push((cell.clone(), true));
            for r in cell.references().iter().rev() {
                if !seen.contains(&r.hash()) {
                    stack.push((r.clone(), false));
                }
            }
        }

        post_order.reverse();
        post_order
    }
}

fn parse_raw_cells(data: &[u8], count: usize, size_bytes: usize) -> CellResult<Vec<RawCell>> {
    let mut reader = Reader { data, pos: 0 };
    let mut cells = Vec::with_capacity(count.min(data.len() / 2));

    for _ in 0..count {
        let [d1, d2] = reader.take_array::<2>()?;
        if d1 & 0x08 != 0 || d1 >> 5 != 0 {
            return Err(CellError::ExoticCell(d1));
        }
        let ref_count = (d1 & 0x07) as usize;
        if ref_count > MAX_CELL_REFS {
            return Err(CellError::TooManyRefs(ref_count));
        }

        let byte_len = (d2 as usize).div_ceil(2);
        let bytes = reader.take(byte_len)?;
        let (data, bit_len) = if d2 % 2 == 0 {
            (bytes.to_vec(), byte_len * 8)
        } else {
            strip_completion_tag(bytes)?
        };

        let refs = (0..ref_count)
            .map(|_| reader.uint(size_bytes).map(|v| v as usize))
            .collect::<CellResult<Vec<_>>>()?;
        cells.push(RawCell { data, bit_len, refs });
    }

    Ok(cells)
}

/// Build cells from the last index backwards so every child exists before
/// its parent.
fn link_cells(raw: Vec<RawCell>) -> CellResult<Vec<Arc<Cell>>> {
    let count = raw.len();
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; count];

    for (i, cell) in raw.into_iter().enumerate().rev() {
        let references = cell
            .refs
            .iter()
            .map(|&r| {
                if r <= i {
                    return Err(CellError::InvalidBoc(format!(
                        "Cell {} references non-child index {}",
                        i, r
                    )));
                }
                built
                    .get(r)
                    .and_then(Option::clone)
                    .ok_or(CellError::CellNotFound(r))
            })
            .collect::<CellResult<Vec<_>>>()?;
        built[i] = Some(Arc::new(Cell::new(cell.data, cell.bit_len, references)));
    }

    built
        .into_iter()
        .enumerate()
        .map(|(i, c)| c.ok_or(CellError::CellNotFound(i)))
        .collect()
}

fn strip_completion_tag(bytes: &[u8]) -> CellResult<(Vec<u8>, usize)> {
    let last = *bytes
        .last()
        .ok_or_else(|| CellError::InvalidBoc("Empty unaligned cell".to_string()))?;
    if last == 0 {
        return Err(CellError::InvalidBoc("Missing completion tag".to_string()));
    }
    let bit_len = bytes.len() * 8 - last.trailing_zeros() as usize - 1;
    let mut data = bytes.to_vec();
    if let Some(tail) = data.last_mut() {
        *tail &= !(1u8 << last.trailing_zeros());
    }
    Ok((data, bit_len))
}

fn bytes_needed(n: usize) -> usize {
    let bits = usize::BITS - n.leading_zeros();
    (bits as usize).div_ceil(8).max(1)
}

fn write_uint(buf: &mut Vec<u8>, value: u64, bytes: usize) {
    buf.extend_from_slice(&value.to_be_bytes()[8 - bytes..]);
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> CellResult<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(CellError::UnexpectedEof)?;
        let out = self.data.get(self.pos..end).ok_or(CellError::UnexpectedEof)?;
        self.pos = end;
        Ok(out)
    }

    fn take_array<const N: usize>(&mut self) -> CellResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn uint(&mut self, bytes: usize) -> CellResult<u64> {
        Ok(self
            .take(bytes)?
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellBuilder;

    fn leaf(value: u32) -> Arc<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_u32(value).unwrap();
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn test_empty_cell_bytes() {
        let bytes = BagOfCells::from_root(Cell::empty())
            .serialize_with_options(false, false)
            .unwrap();
        assert_eq!(hex::encode(bytes), "b5ee9c72010101010002000000");
    }

    #[test]
    fn test_roundtrip_with_refs() {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b101, 3).unwrap();
        builder.store_ref(leaf(1)).unwrap();
        builder.store_ref(leaf(2)).unwrap();
        let root = builder.build().unwrap();

        for (crc, idx) in [(true, false), (false, false), (true, true)] {
            let bytes = BagOfCells::from_root(root.clone())
                .serialize_with_options(crc, idx)
                .unwrap();
            let boc = BagOfCells::deserialize(&bytes).unwrap();
            let decoded = boc.single_root().unwrap();
            assert_eq!(decoded.hash(), root.hash());
            assert_eq!(decoded.bit_len(), 3);
            assert_eq!(decoded.reference_count(), 2);
        }
    }

    #[test]
    fn test_shared_subtree_stored_once() {
        let shared = leaf(7);
        let mut builder = CellBuilder::new();
        builder.store_ref(shared.clone()).unwrap();
        builder.store_ref(shared).unwrap();
        let bytes = BagOfCells::from_root(builder.build().unwrap())
            .serialize_with_options(false, false)
            .unwrap();
        // cells count field
        assert_eq!(bytes[6], 2);
    }

    #[test]
    fn test_rejects_impossible_header_counts() {
        // 0xFFFFFFFF cells declared with a zero-byte cell section.
        let huge = hex::decode("b5ee9c720401ffffffff00000001000000000000000000").unwrap();
        assert!(matches!(
            BagOfCells::deserialize(&huge),
            Err(CellError::InvalidBoc(_))
        ));

        // One cell, two roots.
        let roots = hex::decode("b5ee9c7201010102000200000000").unwrap();
        assert!(matches!(
            BagOfCells::deserialize(&roots),
            Err(CellError::InvalidBoc(_))
        ));

        // Indexed layout claiming more cells than bytes.
        let indexed = hex::decode("68ff65f304087fffffff00000001000000000000000000000004").unwrap();
        assert!(matches!(
            BagOfCells::deserialize(&indexed),
            Err(CellError::InvalidBoc(_))
        ));
    }

    #[test]
    fn test_crc_mismatch() {
        let mut bytes = BagOfCells::from_root(leaf(9).as_ref().clone())
            .serialize()
            .unwrap();
        let n = bytes.len();
        bytes[n - 5] ^= 0x01;
        assert!(matches!(
            BagOfCells::deserialize(&bytes),
            Err(CellError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_input() {
        let bytes = BagOfCells::from_root(leaf(3).as_ref().clone())
            .serialize()
            .unwrap();
        assert!(BagOfCells::deserialize(&bytes[..bytes.len() - 6]).is_err());
        assert!(BagOfCells::deserialize(&[0xb5]).is_err());
    }

    #[test]
    fn test_base64_roundtrip() {
        let cell = leaf(0xDEADBEEF);
        let s = BagOfCells::new(vec![cell.clone()]).serialize_to_base64().unwrap();
        let boc = BagOfCells::deserialize_from_base64(&s).unwrap();
        assert_eq!(boc.single_root().unwrap().hash(), cell.hash());
    }

    #[test]
    fn test_bytes_needed() {
        assert_eq!(bytes_needed(0), 1);
        assert_eq!(bytes_needed(255), 1);
        assert_eq!(bytes_needed(256), 2);
        assert_eq!(bytes_needed(65536), 3);
    }
}
