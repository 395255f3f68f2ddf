//! CellSlice for reading sealed cells.

use std::sync::Arc;

use crate::{Cell, CellError, CellResult, MsgAddress};

/// Sequential reader over a cell's bits and references.
///
/// # Example
///
/// ```
/// use w5_cell::{CellBuilder, CellSlice};
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// let cell = builder.build().unwrap();
///
/// let mut slice = CellSlice::new(&cell);
/// assert_eq!(slice.load_u32().unwrap(), 0x12345678);
/// assert!(slice.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_offset: usize,
    ref_offset: usize,
}

impl<'a> CellSlice<'a> {
    /// Create a new slice from a cell.
    pub fn new(cell: &'a Cell) -> Self {
        CellSlice {
            cell,
            bit_offset: 0,
            ref_offset: 0,
        }
    }

    fn ensure_bits(&self, need: usize) -> CellResult<()> {
        let have = self.bits_left();
        if need > have {
            return Err(CellError::NotEnoughBits { need, have });
        }
        Ok(())
    }

    /// Load a single bit.
    pub fn load_bit(&mut self) -> CellResult<bool> {
        self.ensure_bits(1)?;
        let bit = self.cell.get_bit(self.bit_offset).unwrap_or(false);
        self.bit_offset += 1;
        Ok(bit)
    }

    /// Load an unsigned 8-bit integer.
    pub fn load_u8(&mut self) -> CellResult<u8> {
        self.load_uint(8).map(|v| v as u8)
    }

    /// Load an unsigned 16-bit integer (big-endian).
    pub fn load_u16(&mut self) -> CellResult<u16> {
        self.load_uint(16).map(|v| v as u16)
    }

    /// Load an unsigned 32-bit integer (big-endian).
    pub fn load_u32(&mut self) -> CellResult<u32> {
        self.load_uint(32).map(|v| v as u32)
    }

    /// Load an unsigned 64-bit integer (big-endian).
    pub fn load_u64(&mut self) -> CellResult<u64> {
        self.load_uint(64)
    }

    /// Load a signed 8-bit integer.
    pub fn load_i8(&mut self) -> CellResult<i8> {
        self.load_int(8).map(|v| v as i8)
    }

    /// Load a signed 32-bit integer (big-endian).
    pub fn load_i32(&mut self) -> CellResult<i32> {
        self.load_int(32).map(|v| v as i32)
    }

    /// Load a `bits`-wide unsigned big-endian integer.
    pub fn load_uint(&mut self, bits: usize) -> CellResult<u64> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.ensure_bits(bits)?;
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | self.load_bit()? as u64;
        }
        Ok(value)
    }

    /// Load a `bits`-wide two's complement integer, sign-extended to i64.
    pub fn load_int(&mut self, bits: usize) -> CellResult<i64> {
        let raw = self.load_uint(bits)?;
        if bits == 0 || bits == 64 {
            return Ok(raw as i64);
        }
        let shift = 64 - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Load a byte array.
    pub fn load_bytes(&mut self, count: usize) -> CellResult<Vec<u8>> {
        self.ensure_bits(count.saturating_mul(8))?;
        (0..count).map(|_| self.load_u8()).collect()
    }

    /// Load exactly `N` bytes into an array.
    pub fn load_array<const N: usize>(&mut self) -> CellResult<[u8; N]> {
        self.ensure_bits(N * 8)?;
        let mut out = [0u8; N];
        for byte in out.iter_mut() {
            *byte = self.load_u8()?;
        }
        Ok(out)
    }

    /// Load the next reference.
    pub fn load_ref(&mut self) -> CellResult<&'a Arc<Cell>> {
        let reference = self
            .cell
            .reference(self.ref_offset)
            .ok_or(CellError::NotEnoughRefs { need: 1, have: 0 })?;
        self.ref_offset += 1;
        Ok(reference)
    }

    /// `Maybe ^Cell`.
    pub fn load_maybe_ref(&mut self) -> CellResult<Option<&'a Arc<Cell>>> {
        if self.load_bit()? {
            self.load_ref().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load `VarUInteger 16` coins.
    pub fn load_coins(&mut self) -> CellResult<u128> {
        let byte_len = self.load_uint(4)? as usize;
        let mut value = 0u128;
        for _ in 0..byte_len {
            value = (value << 8) | self.load_u8()? as u128;
        }
        Ok(value)
    }

    /// Load a message address.
    ///
    /// `addr_var` is accepted only when it carries exactly 256 address bits.
    pub fn load_address(&mut self) -> CellResult<MsgAddress> {
        match self.load_uint(2)? {
            0b00 => Ok(MsgAddress::Null),
            0b01 => {
                let len = self.load_uint(9)? as u16;
                let mut data = vec![0u8; (len as usize).div_ceil(8)];
                for i in 0..len as usize {
                    if self.load_bit()? {
                        data[i / 8] |= 1 << (7 - i % 8);
                    }
                }
                Ok(MsgAddress::External { len, data })
            }
            0b10 => {
                self.skip_anycast()?;
                let workchain = self.load_int(8)? as i32;
                let address = self.load_array::<32>()?;
                Ok(MsgAddress::Internal { workchain, address })
            }
            _ => {
                self.skip_anycast()?;
                let addr_len = self.load_uint(9)? as usize;
                let workchain = self.load_int(32)? as i32;
                if addr_len != 256 {
                    return Err(CellError::InvalidAddress(format!(
                        "addr_var with {} address bits is not supported",
                        addr_len
                    )));
                }
                let address = self.load_array::<32>()?;
                Ok(MsgAddress::Internal { workchain, address })
            }
        }
    }

    fn skip_anycast(&mut self) -> CellResult<()> {
        if self.load_bit()? {
            let depth = self.load_uint(5)? as usize;
            self.skip_bits(depth)?;
        }
        Ok(())
    }

    /// Skip bits without reading them.
    pub fn skip_bits(&mut self, count: usize) -> CellResult<()> {
        self.ensure_bits(count)?;
        self.bit_offset += count;
        Ok(())
    }

    /// Get remaining bits.
    pub fn bits_left(&self) -> usize {
        self.cell.bit_len() - self.bit_offset
    }

    /// Get remaining references.
    pub fn refs_left(&self) -> usize {
        self.cell.reference_count() - self.ref_offset
    }

    /// No bits and no references left.
    pub fn is_empty(&self) -> bool {
        self.bits_left() == 0 && self.refs_left() == 0
    }

    /// Seal the unread remainder as a new cell.
    pub fn to_cell(&self) -> CellResult<Cell> {
        let mut builder = crate::CellBuilder::new();
        builder.store_slice(self)?;
        builder.build()
    }

    pub fn cell(&self) -> &'a Cell {
        self.cell
    }

    /// Bits consumed so far.
    pub fn bit_offset(&self) -> usize {
        self.bit_offset
    }

    pub fn ref_offset(&self) -> usize {
        self.ref_offset
    }
}
