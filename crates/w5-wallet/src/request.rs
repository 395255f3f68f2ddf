//! Request bodies accepted by the W5 contract.
//!
//! ```text
//! signed_request$_ signed:SignedRequest signature:bits512;
//! SignedRequest: op:uint32 wallet_id:int32 valid_until:uint32 seqno:uint32
//!                actions:InnerRequest
//!
//! extension_request#6578746e query_id:uint64 actions:InnerRequest
//! ```
//!
//! The signature covers the representation hash of the body without it and
//! is appended after the body's last bit. Extension requests are authorized
//! by the sender address and carry no signature.

use std::sync::Arc;

use tracing::{debug, trace};
use w5_cell::{BagOfCells, Cell, CellBuilder, CellSlice};
use w5_crypto::{verify_signature, MessageSigner, SIGNATURE_BYTES};

use crate::actions::{load_wallet_actions, store_wallet_actions, DecodedWalletActions, WalletActions};
use crate::error::{WalletError, WalletResult};
use crate::out_action::ensure_consumed;

/// `"sign"`
pub const OP_AUTH_SIGNED_EXTERNAL: u32 = 0x7369676e;
/// `"sint"`
pub const OP_AUTH_SIGNED_INTERNAL: u32 = 0x73696e74;
/// `"extn"`
pub const OP_AUTH_EXTENSION: u32 = 0x6578746e;

const SIGNATURE_BITS: usize = SIGNATURE_BYTES * 8;

/// How a signed request reaches the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Inbound external message.
    SignedExternal,
    /// Body of an internal message from any sender.
    SignedInternal,
}

impl RequestKind {
    pub const fn opcode(self) -> u32 {
        match self {
            RequestKind::SignedExternal => OP_AUTH_SIGNED_EXTERNAL,
            RequestKind::SignedInternal => OP_AUTH_SIGNED_INTERNAL,
        }
    }
}

/// Fields written before the action batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestHeader {
    Signed {
        kind: RequestKind,
        /// Raw (obfuscated) wallet id.
        wallet_id: i32,
        /// Unix seconds after which the contract rejects the request.
        valid_until: u32,
        seqno: u32,
    },
    Extension {
        query_id: u64,
    },
}

impl RequestHeader {
    pub const fn opcode(&self) -> u32 {
        match self {
            RequestHeader::Signed { kind, .. } => kind.opcode(),
            RequestHeader::Extension { .. } => OP_AUTH_EXTENSION,
        }
    }

    pub fn store(&self, builder: &mut CellBuilder) -> WalletResult<()> {
        builder.store_u32(self.opcode())?;
        match *self {
            RequestHeader::Signed {
                wallet_id,
                valid_until,
                seqno,
                ..
            } => {
                builder.store_i32(wallet_id)?;
                builder.store_u32(valid_until)?;
                builder.store_u32(seqno)?;
            }
            RequestHeader::Extension { query_id } => {
                builder.store_u64(query_id)?;
            }
        }
        Ok(())
    }

    pub fn load(slice: &mut CellSlice) -> WalletResult<Self> {
        let opcode = slice.load_u32()?;
        let kind = match opcode {
            OP_AUTH_SIGNED_EXTERNAL => RequestKind::SignedExternal,
            OP_AUTH_SIGNED_INTERNAL => RequestKind::SignedInternal,
            OP_AUTH_EXTENSION => {
                return Ok(RequestHeader::Extension {
                    query_id: slice.load_u64()?,
                });
            }
            other => return Err(WalletError::UnknownOpcode(other)),
        };
        Ok(RequestHeader::Signed {
            kind,
            wallet_id: slice.load_i32()?,
            valid_until: slice.load_u32()?,
            seqno: slice.load_u32()?,
        })
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, RequestHeader::Signed { .. })
    }
}

/// A request ready to be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    pub header: RequestHeader,
    pub actions: WalletActions,
    pub signature: Option<[u8; SIGNATURE_BYTES]>,
}

impl RequestMessage {
    pub fn signed(
        kind: RequestKind,
        wallet_id: i32,
        valid_until: u32,
        seqno: u32,
        actions: WalletActions,
    ) -> Self {
        Self {
            header: RequestHeader::Signed {
                kind,
                wallet_id,
                valid_until,
                seqno,
            },
            actions,
            signature: None,
        }
    }

    pub fn extension(query_id: u64, actions: WalletActions) -> Self {
        Self {
            header: RequestHeader::Extension { query_id },
            actions,
            signature: None,
        }
    }

    /// Body without the signature.
    pub fn body(&self) -> WalletResult<Cell> {
        let mut builder = CellBuilder::new();
        self.header.store(&mut builder)?;
        store_wallet_actions(&mut builder, &self.actions)?;
        Ok(builder.build()?)
    }

    /// Hash the signature is computed over.
    pub fn signing_hash(&self) -> WalletResult<[u8; 32]> {
        Ok(self.body()?.hash())
    }

    /// Sign the body with `signer`, replacing any previous signature.
    pub fn sign(mut self, signer: &dyn MessageSigner) -> WalletResult<Self> {
        if !self.header.is_signed() {
            return Err(WalletError::UnsignableRequest);
        }
        let hash = self.signing_hash()?;
        self.signature = Some(signer.sign_hash(&hash));
        trace!(hash = %hex::encode(hash), signer = %hex::encode(signer.public_key()), "signed request");
        Ok(self)
    }

    /// The full body, with the signature appended when present.
    pub fn to_cell(&self) -> WalletResult<Cell> {
        let body = self.body()?;
        let cell = match &self.signature {
            Some(signature) => append_signature(&body, signature)?,
            None => body,
        };
        debug!(
            opcode = format_args!("{:#010x}", self.header.opcode()),
            signed = self.signature.is_some(),
            bits = cell.bit_len(),
            "assembled request"
        );
        Ok(cell)
    }

    /// Serialized bag of cells holding the request.
    pub fn to_boc(&self) -> WalletResult<Vec<u8>> {
        Ok(BagOfCells::from_root(self.to_cell()?).serialize()?)
    }

    /// Read a request body, separating the trailing signature if present.
    pub fn parse(cell: &Cell) -> WalletResult<ParsedRequest> {
        let mut slice = CellSlice::new(cell);
        let header = RequestHeader::load(&mut slice)?;
        let actions = load_wallet_actions(&mut slice)?;

        let signature = match (header.is_signed(), slice.bits_left()) {
            (true, SIGNATURE_BITS) => Some(slice.load_array::<SIGNATURE_BYTES>()?),
            _ => None,
        };
        ensure_consumed(&slice)?;

        let body = match signature {
            Some(_) => Arc::new(strip_signature(cell)?),
            None => Arc::new(cell.clone()),
        };
        trace!(
            opcode = format_args!("{:#010x}", header.opcode()),
            signed = signature.is_some(),
            "parsed request"
        );

        Ok(ParsedRequest {
            header,
            actions,
            signature,
            body,
        })
    }
}

/// A request read back from a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub header: RequestHeader,
    pub actions: DecodedWalletActions,
    pub signature: Option<[u8; SIGNATURE_BYTES]>,
    /// The body as it was signed, without the signature bits.
    pub body: Arc<Cell>,
}

impl ParsedRequest {
    pub fn signing_hash(&self) -> [u8; 32] {
        self.body.hash()
    }

    /// Check the signature against `public_key`.
    pub fn verify(&self, public_key: &[u8; 32]) -> WalletResult<()> {
        let signature = self.signature.as_ref().ok_or(WalletError::InvalidSignature)?;
        verify_signature(public_key, &self.signing_hash(), signature)
            .map_err(|_| WalletError::InvalidSignature)
    }
}

/// Build a signed request for an external message.
///
/// Without a signer the unsigned body is returned, e.g. for fee estimation.
pub fn build_external_request(
    wallet_id: i32,
    valid_until: u32,
    seqno: u32,
    actions: WalletActions,
    signer: Option<&dyn MessageSigner>,
) -> WalletResult<Cell> {
    build_signed_request(RequestKind::SignedExternal, wallet_id, valid_until, seqno, actions, signer)
}

/// Build a signed request to be carried in an internal message.
pub fn build_internal_request(
    wallet_id: i32,
    valid_until: u32,
    seqno: u32,
    actions: WalletActions,
    signer: Option<&dyn MessageSigner>,
) -> WalletResult<Cell> {
    build_signed_request(RequestKind::SignedInternal, wallet_id, valid_until, seqno, actions, signer)
}

pub fn build_signed_request(
    kind: RequestKind,
    wallet_id: i32,
    valid_until: u32,
    seqno: u32,
    actions: WalletActions,
    signer: Option<&dyn MessageSigner>,
) -> WalletResult<Cell> {
    debug!(?kind, wallet_id, seqno, valid_until, "building signed request");
    let request = RequestMessage::signed(kind, wallet_id, valid_until, seqno, actions);
    match signer {
        Some(signer) => request.sign(signer)?.to_cell(),
        None => request.to_cell(),
    }
}

/// Build a request sent by an installed extension.
pub fn build_extension_request(query_id: u64, actions: WalletActions) -> WalletResult<Cell> {
    debug!(query_id, "building extension request");
    RequestMessage::extension(query_id, actions).to_cell()
}

/// Copy `body` and append `signature` after its last bit.
pub fn append_signature(body: &Cell, signature: &[u8; SIGNATURE_BYTES]) -> WalletResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_cell_contents(body)?;
    builder.store_bytes(signature)?;
    Ok(builder.build()?)
}

fn strip_signature(cell: &Cell) -> WalletResult<Cell> {
    let mut slice = CellSlice::new(cell);
    let mut builder = CellBuilder::new();
    for _ in 0..cell.bit_len() - SIGNATURE_BITS {
        builder.store_bit(slice.load_bit()?)?;
    }
    for reference in cell.references() {
        builder.store_ref(reference.clone())?;
    }
    Ok(builder.build()?)
}
