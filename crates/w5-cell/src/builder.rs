//! CellBuilder for assembling cells bit by bit.

use std::sync::Arc;

use crate::{Cell, CellError, CellResult, CellSlice, MsgAddress, MAX_CELL_BITS, MAX_CELL_REFS};

/// Append-only builder for a single cell.
///
/// Bits are written MSB-first. Every `store_*` call checks the 1023-bit and
/// 4-reference limits before touching the buffer, so a failed call leaves the
/// builder unchanged.
///
/// # Example
///
/// ```
/// use w5_cell::CellBuilder;
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// builder.store_bytes(&[1, 2, 3, 4]).unwrap();
/// let cell = builder.build().unwrap();
/// assert_eq!(cell.bit_len(), 64);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Create a new empty CellBuilder.
    pub fn new() -> Self {
        CellBuilder {
            data: Vec::with_capacity(128),
            bit_len: 0,
            references: Vec::new(),
        }
    }

    fn ensure_bits(&self, extra: usize) -> CellResult<()> {
        if self.bit_len + extra > MAX_CELL_BITS {
            return Err(CellError::DataTooLong(self.bit_len + extra));
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        let byte_index = self.bit_len / 8;
        if byte_index == self.data.len() {
            self.data.push(0);
        }
        if bit {
            self.data[byte_index] |= 1 << (7 - self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    /// Store a single bit.
    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.ensure_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store multiple bits.
    pub fn store_bits(&mut self, bits: &[bool]) -> CellResult<&mut Self> {
        self.ensure_bits(bits.len())?;
        for &bit in bits {
            self.push_bit(bit);
        }
        Ok(self)
    }

    /// Store an unsigned 8-bit integer.
    pub fn store_u8(&mut self, value: u8) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 8)
    }

    /// Store an unsigned 16-bit integer (big-endian).
    pub fn store_u16(&mut self, value: u16) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 16)
    }

    /// Store an unsigned 32-bit integer (big-endian).
    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 32)
    }

    /// Store an unsigned 64-bit integer (big-endian).
    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.store_uint(value, 64)
    }

    /// Store a signed 8-bit integer.
    pub fn store_i8(&mut self, value: i8) -> CellResult<&mut Self> {
        self.store_int(value as i64, 8)
    }

    /// Store a signed 32-bit integer (big-endian).
    pub fn store_i32(&mut self, value: i32) -> CellResult<&mut Self> {
        self.store_int(value as i64, 32)
    }

    /// Store the low `bits` bits of `value`, big-endian.
    ///
    /// Higher bits of `value` are ignored; callers that need range checking
    /// validate before storing.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.ensure_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    /// Store `value` as a `bits`-wide two's complement integer.
    pub fn store_int(&mut self, value: i64, bits: usize) -> CellResult<&mut Self> {
        self.store_uint(value as u64, bits)
    }

    /// Store a byte array.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.ensure_bits(bytes.len() * 8)?;
        for &byte in bytes {
            for i in (0..8).rev() {
                self.push_bit((byte >> i) & 1 == 1);
            }
        }
        Ok(self)
    }

    /// Store a reference to an already sealed cell.
    pub fn store_ref(&mut self, cell: Arc<Cell>) -> CellResult<&mut Self> {
        if self.references.len() >= MAX_CELL_REFS {
            return Err(CellError::TooManyRefs(self.references.len() + 1));
        }
        self.references.push(cell);
        Ok(self)
    }

    /// `Maybe ^Cell`: a presence bit, then the reference when present.
    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> CellResult<&mut Self> {
        match cell {
            Some(cell) => {
                if self.references.len() >= MAX_CELL_REFS {
                    return Err(CellError::TooManyRefs(self.references.len() + 1));
                }
                self.store_bit(true)?;
                self.store_ref(cell)
            }
            None => self.store_bit(false),
        }
    }

    /// Copy the unread bits and references of `slice`.
    pub fn store_slice(&mut self, slice: &CellSlice) -> CellResult<&mut Self> {
        let bits = slice.bits_left();
        let refs = slice.refs_left();
        self.ensure_bits(bits)?;
        if self.references.len() + refs > MAX_CELL_REFS {
            return Err(CellError::TooManyRefs(self.references.len() + refs));
        }

        let cell = slice.cell();
        for i in 0..bits {
            self.push_bit(cell.get_bit(slice.bit_offset() + i).unwrap_or(false));
        }
        for i in slice.ref_offset()..cell.reference_count() {
            if let Some(r) = cell.reference(i) {
                self.references.push(r.clone());
            }
        }
        Ok(self)
    }

    /// Copy the full contents of `cell` inline.
    pub fn store_cell_contents(&mut self, cell: &Cell) -> CellResult<&mut Self> {
        self.store_slice(&CellSlice::new(cell))
    }

    /// Store coins as `VarUInteger 16`: a 4-bit byte length, then the value.
    pub fn store_coins(&mut self, nanotons: u128) -> CellResult<&mut Self> {
        let byte_len = (128 - nanotons.leading_zeros() as usize).div_ceil(8);
        if byte_len > 15 {
            return Err(CellError::DataTooLong(self.bit_len + 4 + byte_len * 8));
        }
        self.ensure_bits(4 + byte_len * 8)?;
        self.store_uint(byte_len as u64, 4)?;
        let bytes = nanotons.to_be_bytes();
        self.store_bytes(&bytes[16 - byte_len..])
    }

    /// Store a message address.
    ///
    /// Internal addresses use `addr_std$10` without anycast: 267 bits.
    pub fn store_address(&mut self, addr: &MsgAddress) -> CellResult<&mut Self> {
        match addr {
            MsgAddress::Null => self.store_uint(0b00, 2),
            MsgAddress::External { len, data } => {
                let len = *len as usize;
                self.ensure_bits(2 + 9 + len)?;
                self.store_uint(0b01, 2)?;
                self.store_uint(len as u64, 9)?;
                for i in 0..len {
                    let bit = data.get(i / 8).is_some_and(|b| (b >> (7 - i % 8)) & 1 == 1);
                    self.push_bit(bit);
                }
                Ok(self)
            }
            MsgAddress::Internal { workchain, address } => {
                let workchain = i8::try_from(*workchain).map_err(|_| {
                    CellError::InvalidAddress(format!(
                        "Workchain {} does not fit in addr_std",
                        workchain
                    ))
                })?;
                self.ensure_bits(MsgAddress::STD_BITS)?;
                self.store_uint(0b10, 2)?;
                self.store_bit(false)?;
                self.store_i8(workchain)?;
                self.store_bytes(address)
            }
        }
    }

    /// Data bits still available.
    pub fn bits_left(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    /// Reference slots still available.
    pub fn refs_left(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    /// Bits stored so far.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Seal the cell.
    pub fn build(self) -> CellResult<Cell> {
        Ok(Cell::new(self.data, self.bit_len, self.references))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_bits_msb_first() {
        let mut builder = CellBuilder::new();
        builder.store_bit(true).unwrap();
        builder.store_bit(false).unwrap();
        builder.store_bit(true).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.data(), &[0b1010_0000]);
        assert_eq!(cell.bit_len(), 3);
    }

    #[test]
    fn test_store_u32_big_endian() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0x12345678).unwrap();
        assert_eq!(builder.build().unwrap().data(), &[0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_negative_int_is_twos_complement() {
        let mut builder = CellBuilder::new();
        builder.store_int(-1, 8).unwrap();
        builder.store_int(-2, 8).unwrap();
        assert_eq!(builder.build().unwrap().data(), &[0xFF, 0xFE]);
    }

    #[test]
    fn test_bit_overflow_leaves_builder_untouched() {
        let mut builder = CellBuilder::new();
        builder.store_uint(0, 64).unwrap();
        for _ in 0..14 {
            builder.store_u64(0).unwrap();
        }
        assert_eq!(builder.bits_left(), 63);
        assert!(matches!(
            builder.store_u64(0),
            Err(CellError::DataTooLong(1024))
        ));
        assert_eq!(builder.bit_len(), 960);
    }

    #[test]
    fn test_ref_overflow() {
        let mut builder = CellBuilder::new();
        for _ in 0..4 {
            builder.store_ref(Arc::new(Cell::empty())).unwrap();
        }
        assert!(matches!(
            builder.store_ref(Arc::new(Cell::empty())),
            Err(CellError::TooManyRefs(5))
        ));
        let before = builder.bit_len();
        assert!(builder.store_maybe_ref(Some(Arc::new(Cell::empty()))).is_err());
        assert_eq!(builder.bit_len(), before);
    }

    #[test]
    fn test_address_workchain_must_fit_int8() {
        let mut builder = CellBuilder::new();
        for workchain in [128, -129, 300] {
            let addr = MsgAddress::Internal {
                workchain,
                address: [0x11; 32],
            };
            assert!(matches!(
                builder.store_address(&addr),
                Err(CellError::InvalidAddress(_))
            ));
        }
        assert_eq!(builder.bit_len(), 0);

        builder
            .store_address(&MsgAddress::Internal {
                workchain: 127,
                address: [0x11; 32],
            })
            .unwrap();
        assert_eq!(builder.bit_len(), MsgAddress::STD_BITS);
    }

    #[test]
    fn test_maybe_ref() {
        let mut builder = CellBuilder::new();
        builder.store_maybe_ref(None).unwrap();
        builder.store_maybe_ref(Some(Arc::new(Cell::empty()))).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 2);
        assert_eq!(cell.data(), &[0b0100_0000]);
        assert_eq!(cell.reference_count(), 1);
    }

    #[test]
    fn test_store_slice_copies_remaining_only() {
        let mut inner = CellBuilder::new();
        inner.store_u8(0xAA).unwrap();
        inner.store_u8(0x55).unwrap();
        inner.store_ref(Arc::new(Cell::empty())).unwrap();
        let inner = inner.build().unwrap();

        let mut slice = CellSlice::new(&inner);
        slice.skip_bits(8).unwrap();

        let mut outer = CellBuilder::new();
        outer.store_bit(true).unwrap();
        outer.store_slice(&slice).unwrap();
        let outer = outer.build().unwrap();

        assert_eq!(outer.bit_len(), 9);
        assert_eq!(outer.data(), &[0b1010_1010, 0b1000_0000]);
        assert_eq!(outer.reference_count(), 1);
    }

    #[test]
    fn test_coins_layout() {
        let mut builder = CellBuilder::new();
        builder.store_coins(0).unwrap();
        assert_eq!(builder.bit_len(), 4);

        let mut builder = CellBuilder::new();
        builder.store_coins(0x0100).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 20);
        assert_eq!(cell.data(), &[0x20, 0x10, 0x00]);
    }

    #[test]
    fn test_std_address_width() {
        let mut builder = CellBuilder::new();
        builder
            .store_address(&MsgAddress::Internal {
                workchain: -1,
                address: [0x11; 32],
            })
            .unwrap();
        assert_eq!(builder.bit_len(), 267);
    }
}
