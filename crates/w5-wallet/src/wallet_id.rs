//! W5 wallet id.
//!
//! The 32-bit wallet id stored in contract data and repeated in every signed
//! request is a context word XORed with the network global id:
//!
//! ```text
//! client context:  [1:1][workchain:int8][version:uint8][subwallet:uint15]
//! custom context:  [0:1][value:uint31]
//! wallet_id      = network_global_id XOR context      (as int32)
//! ```
//!
//! The XOR binds an id to one network: decoding with another network's
//! global id yields a different context, usually with the client flag or
//! version tag scrambled. It is a deterministic bit transform, not a
//! security boundary.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use w5_cell::{CellBuilder, CellSlice};

use crate::config::Network;
use crate::error::{WalletError, WalletResult};

const CLIENT_FLAG: u32 = 1 << 31;
const MAX_SUBWALLET: u32 = (1 << 15) - 1;
const MAX_CUSTOM: u32 = (1 << 31) - 1;

/// Wallet code revision carried in a client context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WalletVersion {
    #[default]
    #[serde(rename = "v5r1")]
    V5R1,
}

impl WalletVersion {
    /// Serialized 8-bit tag.
    pub const fn tag(self) -> u8 {
        match self {
            WalletVersion::V5R1 => 0,
        }
    }

    /// Reverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> WalletResult<Self> {
        match tag {
            0 => Ok(WalletVersion::V5R1),
            other => Err(WalletError::UnknownWalletVersion(other)),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            WalletVersion::V5R1 => "v5r1",
        }
    }
}

/// Context of a wallet derived by a regular client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientContext {
    pub wallet_version: WalletVersion,
    pub workchain: i8,
    /// Only the low 15 bits are representable.
    pub subwallet_number: u16,
}

/// Either a client context or an opaque 31-bit custom value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletIdContext {
    Client(ClientContext),
    Custom(u32),
}

impl WalletIdContext {
    /// The context word before XOR with the network id.
    pub fn to_bits(&self) -> WalletResult<u32> {
        match *self {
            WalletIdContext::Client(ctx) => {
                let subwallet = ctx.subwallet_number as u32;
                if subwallet > MAX_SUBWALLET {
                    return Err(WalletError::InvalidSubwalletNumber(subwallet));
                }
                let workchain = ctx.workchain as u8 as u32;
                Ok(CLIENT_FLAG
                    | workchain << 23
                    | (ctx.wallet_version.tag() as u32) << 15
                    | subwallet)
            }
            WalletIdContext::Custom(value) => {
                if value > MAX_CUSTOM {
                    return Err(WalletError::InvalidCustomContext(value));
                }
                Ok(value)
            }
        }
    }

    /// Parse a context word. Only client contexts are supported.
    pub fn from_bits(bits: u32) -> WalletResult<Self> {
        if bits & CLIENT_FLAG == 0 {
            return Err(WalletError::UnsupportedContext);
        }
        let workchain = (bits >> 23) as u8 as i8;
        let wallet_version = WalletVersion::from_tag((bits >> 15) as u8)?;
        let subwallet_number = (bits & MAX_SUBWALLET) as u16;
        Ok(WalletIdContext::Client(ClientContext {
            wallet_version,
            workchain,
            subwallet_number,
        }))
    }
}

/// A wallet id before obfuscation.
///
/// ```
/// use w5_wallet::WalletId;
///
/// let id = WalletId::client(-239, 0, 0).unwrap();
/// assert_eq!(id.encode().unwrap(), 2147483409);
/// assert_eq!(WalletId::decode(2147483409, -239).unwrap(), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletId {
    pub network_global_id: i32,
    pub context: WalletIdContext,
}

impl WalletId {
    /// Client context for the current wallet version, with range checks on
    /// workchain (int8) and subwallet number (uint15).
    pub fn client(network_global_id: i32, workchain: i32, subwallet_number: u32) -> WalletResult<Self> {
        let workchain =
            i8::try_from(workchain).map_err(|_| WalletError::InvalidWorkchain(workchain))?;
        if subwallet_number > MAX_SUBWALLET {
            return Err(WalletError::InvalidSubwalletNumber(subwallet_number));
        }
        Ok(Self {
            network_global_id,
            context: WalletIdContext::Client(ClientContext {
                wallet_version: WalletVersion::V5R1,
                workchain,
                subwallet_number: subwallet_number as u16,
            }),
        })
    }

    /// Client context on the given network.
    pub fn for_network(network: Network, workchain: i32, subwallet_number: u32) -> WalletResult<Self> {
        Self::client(network.global_id(), workchain, subwallet_number)
    }

    /// Custom 31-bit context.
    pub fn custom(network_global_id: i32, value: u32) -> WalletResult<Self> {
        if value > MAX_CUSTOM {
            return Err(WalletError::InvalidCustomContext(value));
        }
        Ok(Self {
            network_global_id,
            context: WalletIdContext::Custom(value),
        })
    }

    /// Obfuscated 32-bit id.
    pub fn encode(&self) -> WalletResult<i32> {
        let context = self.context.to_bits()? as i32;
        let raw = self.network_global_id ^ context;
        trace!(
            network = self.network_global_id,
            context = format_args!("{:#010x}", context as u32),
            raw,
            "encoded wallet id"
        );
        Ok(raw)
    }

    /// Recover the wallet id from its raw form.
    ///
    /// The network id is not recoverable from the bits and must be supplied.
    pub fn decode(raw: i32, network_global_id: i32) -> WalletResult<Self> {
        let bits = (raw ^ network_global_id) as u32;
        let context = WalletIdContext::from_bits(bits).inspect_err(|e| {
            debug!(raw, network = network_global_id, error = %e, "wallet id decode failed");
        })?;
        Ok(Self {
            network_global_id,
            context,
        })
    }

    /// Append the raw id as int32.
    pub fn store(&self, builder: &mut CellBuilder) -> WalletResult<()> {
        builder.store_i32(self.encode()?)?;
        Ok(())
    }

    /// Read an int32 id and decode it against `network_global_id`.
    pub fn load(slice: &mut CellSlice, network_global_id: i32) -> WalletResult<Self> {
        let raw = slice.load_i32()?;
        Self::decode(raw, network_global_id)
    }

    /// The client context, when this is one.
    pub fn client_context(&self) -> Option<&ClientContext> {
        match &self.context {
            WalletIdContext::Client(ctx) => Some(ctx),
            WalletIdContext::Custom(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NETWORK_MAINNET, NETWORK_TESTNET};

    #[test]
    fn test_reference_vectors() {
        // Basechain subwallet 0 on mainnet and testnet.
        let mainnet = WalletId::client(NETWORK_MAINNET, 0, 0).unwrap();
        assert_eq!(mainnet.encode().unwrap(), 2147483409);
        assert_eq!(mainnet.encode().unwrap() as u32, 0x7FFF_FF11);

        let testnet = WalletId::client(NETWORK_TESTNET, 0, 0).unwrap();
        assert_eq!(testnet.encode().unwrap(), 2147483645);

        // Masterchain keeps the sign bits of the workchain byte.
        let master = WalletId::client(NETWORK_MAINNET, -1, 0).unwrap();
        assert_eq!(master.encode().unwrap(), 8388369);
    }

    #[test]
    fn test_context_layout() {
        let ctx = WalletIdContext::Client(ClientContext {
            wallet_version: WalletVersion::V5R1,
            workchain: -1,
            subwallet_number: 0x7FFF,
        });
        let bits = ctx.to_bits().unwrap();
        assert_eq!(bits >> 31, 1);
        assert_eq!((bits >> 23) & 0xFF, 0xFF);
        assert_eq!((bits >> 15) & 0xFF, 0);
        assert_eq!(bits & 0x7FFF, 0x7FFF);
    }

    #[test]
    fn test_roundtrip_edges() {
        for (wc, sub) in [(0, 0), (-1, 0), (127, 1), (-128, 32767), (0, 698)] {
            for net in [NETWORK_MAINNET, NETWORK_TESTNET, 0, i32::MIN, i32::MAX] {
                let id = WalletId::client(net, wc, sub).unwrap();
                let raw = id.encode().unwrap();
                assert_eq!(WalletId::decode(raw, net).unwrap(), id);
            }
        }
    }

    #[test]
    fn test_network_isolation() {
        let a = WalletId::client(NETWORK_MAINNET, 0, 5).unwrap();
        let b = WalletId::client(NETWORK_TESTNET, 0, 5).unwrap();
        assert_ne!(a.encode().unwrap(), b.encode().unwrap());
    }

    #[test]
    fn test_custom_context() {
        let id = WalletId::custom(NETWORK_MAINNET, 12345).unwrap();
        let raw = id.encode().unwrap();
        assert_eq!(raw, NETWORK_MAINNET ^ 12345);
        assert!(matches!(
            WalletId::decode(raw, NETWORK_MAINNET),
            Err(WalletError::UnsupportedContext)
        ));
        assert!(matches!(
            WalletId::custom(0, 1 << 31),
            Err(WalletError::InvalidCustomContext(_))
        ));
    }

    #[test]
    fn test_unknown_version_tag() {
        let bits = CLIENT_FLAG | 7 << 15;
        let raw = (bits as i32) ^ NETWORK_MAINNET;
        assert!(matches!(
            WalletId::decode(raw, NETWORK_MAINNET),
            Err(WalletError::UnknownWalletVersion(7))
        ));
    }

    #[test]
    fn test_wrong_network_does_not_roundtrip() {
        let id = WalletId::client(NETWORK_MAINNET, 0, 0).unwrap();
        let raw = id.encode().unwrap();
        if let Ok(other) = WalletId::decode(raw, NETWORK_TESTNET) {
            assert_ne!(other, id);
        }
    }

    #[test]
    fn test_range_checks() {
        assert!(matches!(
            WalletId::client(NETWORK_MAINNET, 128, 0),
            Err(WalletError::InvalidWorkchain(128))
        ));
        assert!(matches!(
            WalletId::client(NETWORK_MAINNET, 0, 1 << 15),
            Err(WalletError::InvalidSubwalletNumber(32768))
        ));

        let raw_struct = WalletId {
            network_global_id: NETWORK_MAINNET,
            context: WalletIdContext::Client(ClientContext {
                wallet_version: WalletVersion::V5R1,
                workchain: 0,
                subwallet_number: 0x8000,
            }),
        };
        assert!(raw_struct.encode().is_err());
    }

    #[test]
    fn test_store_and_load() {
        let id = WalletId::client(NETWORK_TESTNET, -1, 42).unwrap();
        let mut builder = CellBuilder::new();
        id.store(&mut builder).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 32);

        let mut slice = CellSlice::new(&cell);
        assert_eq!(WalletId::load(&mut slice, NETWORK_TESTNET).unwrap(), id);
    }

    #[test]
    fn test_serde_shape() {
        let id = WalletId::client(NETWORK_MAINNET, 0, 1).unwrap();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json["network_global_id"], -239);
        assert_eq!(json["context"]["client"]["wallet_version"], "v5r1");
        let back: WalletId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
