//! Error types for w5-wallet

use thiserror::Error;

/// Wallet codec error type
#[derive(Error, Debug)]
pub enum WalletError {
    /// Bit/reference overflow or underflow from the cell layer, unchanged.
    #[error("Cell error: {0}")]
    Cell(#[from] w5_cell::CellError),

    #[error("Unknown wallet version tag: {0}")]
    UnknownWalletVersion(u8),

    /// Decoding a custom (non-client) wallet id context is not supported.
    #[error("Custom wallet id context cannot be decoded")]
    UnsupportedContext,

    #[error("Subwallet number {0} does not fit in 15 bits")]
    InvalidSubwalletNumber(u32),

    #[error("Workchain {0} does not fit in 8 bits")]
    InvalidWorkchain(i32),

    #[error("Custom context {0} does not fit in 31 bits")]
    InvalidCustomContext(u32),

    #[error("Unknown request opcode: 0x{0:08x}")]
    UnknownOpcode(u32),

    #[error("Unknown extended action tag: {0}")]
    UnknownExtendedAction(u8),

    #[error("Unknown out action tag: 0x{0:08x}")]
    UnknownOutAction(u32),

    #[error("Extension address must be an internal address")]
    InvalidExtensionAddress,

    #[error("Too many actions: max {max}, got {got}")]
    TooManyActions { max: usize, got: usize },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Extension requests are not signed")]
    UnsignableRequest,

    #[error("Unexpected trailing data: {bits} bits, {refs} refs")]
    TrailingData { bits: usize, refs: usize },
}

/// Result type alias
pub type WalletResult<T> = Result<T, WalletError>;
