//! Cell primitives for W5 wallet messages
//!
//! Everything a W5 request touches on the wire is a tree of cells:
//!
//! - **Cell**: immutable container of up to 1023 bits and 4 child references
//! - **CellBuilder**: appends bits, integers, addresses and references, then seals a cell
//! - **CellSlice**: sequential reader over a sealed cell
//! - **MsgAddress**: `addr_none`, `addr_extern` and `addr_std` message addresses
//! - **BagOfCells**: the byte serialization submitted to the network
//!
//! Only ordinary cells are supported. Pruned branches, libraries and Merkle
//! cells never appear in wallet requests and are rejected when decoding a BoC.
//!
//! # Example
//!
//! ```
//! use w5_cell::{BagOfCells, CellBuilder, CellSlice};
//!
//! let mut builder = CellBuilder::new();
//! builder.store_u32(0x7369676e).unwrap();
//! builder.store_bit(true).unwrap();
//! let cell = builder.build().unwrap();
//!
//! let bytes = BagOfCells::from_root(cell.clone()).serialize().unwrap();
//! let decoded = BagOfCells::deserialize(&bytes).unwrap();
//! assert_eq!(decoded.single_root().unwrap().hash(), cell.hash());
//!
//! let mut slice = CellSlice::new(&cell);
//! assert_eq!(slice.load_u32().unwrap(), 0x7369676e);
//! assert!(slice.load_bit().unwrap());
//! ```

use sha2::{Digest, Sha256};
use thiserror::Error;

mod address;
mod boc;
mod builder;
mod cell;
mod slice;

pub use address::MsgAddress;
pub use boc::BagOfCells;
pub use builder::CellBuilder;
pub use cell::{Cell, HASH_BYTES};
pub use slice::CellSlice;

/// Errors raised by cell construction, reading and BoC parsing.
#[derive(Debug, Error)]
pub enum CellError {
    /// Appending would exceed the 1023-bit data limit.
    #[error("Cell data too long: {0} bits (max 1023)")]
    DataTooLong(usize),

    /// Appending would exceed the 4-reference limit.
    #[error("Too many cell references: {0} (max 4)")]
    TooManyRefs(usize),

    #[error("Not enough bits: need {need}, have {have}")]
    NotEnoughBits { need: usize, have: usize },

    #[error("Not enough refs: need {need}, have {have}")]
    NotEnoughRefs { need: usize, have: usize },

    /// Integer width outside 0..=64.
    #[error("Invalid bit length: {0}")]
    InvalidBitLength(usize),

    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    #[error("Invalid BoC format: {0}")]
    InvalidBoc(String),

    #[error("CRC32 mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("Cell not found: index {0}")]
    CellNotFound(usize),

    #[error("Expected single root, found {0}")]
    NotSingleRoot(usize),

    #[error("Unexpected end of data")]
    UnexpectedEof,

    /// BoC contained an exotic cell.
    #[error("Exotic cells are not supported (descriptor 0x{0:02x})")]
    ExoticCell(u8),
}

/// Result type for cell operations.
pub type CellResult<T> = Result<T, CellError>;

/// Maximum number of data bits in a cell.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can hold.
pub const MAX_CELL_REFS: usize = 4;

/// Magic prefix of the generic `serialized_boc` format.
pub const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

/// Magic prefix of `serialized_boc_idx`.
pub const BOC_INDEXED_MAGIC: u32 = 0x68ff65f3;

/// Magic prefix of `serialized_boc_idx_crc32c`.
pub const BOC_INDEXED_CRC32_MAGIC: u32 = 0xacc3a728;

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// CRC32-C (Castagnoli), as used by the BoC trailer.
fn crc32c(data: &[u8]) -> u32 {
    const CRC32C: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);
    CRC32C.checksum(data)
}

/// CRC16-XMODEM, as used by user-friendly addresses.
fn crc16_xmodem(data: &[u8]) -> u16 {
    const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);
    CRC16.checksum(data)
}
