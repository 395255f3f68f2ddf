//! Network selection and persistent wallet data.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use w5_cell::{Cell, CellBuilder, CellSlice, MsgAddress};

use crate::error::WalletResult;
use crate::out_action::ensure_consumed;
use crate::wallet_id::WalletId;

/// Network global IDs
pub const NETWORK_MAINNET: i32 = -239;
pub const NETWORK_TESTNET: i32 = -3;

/// Network a wallet id is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Custom(i32),
}

impl Network {
    pub const fn global_id(self) -> i32 {
        match self {
            Network::Mainnet => NETWORK_MAINNET,
            Network::Testnet => NETWORK_TESTNET,
            Network::Custom(id) => id,
        }
    }

    pub const fn from_global_id(id: i32) -> Self {
        match id {
            NETWORK_MAINNET => Network::Mainnet,
            NETWORK_TESTNET => Network::Testnet,
            other => Network::Custom(other),
        }
    }

    pub const fn is_testnet(self) -> bool {
        matches!(self, Network::Testnet)
    }
}

/// Contract data of a W5 wallet.
///
/// ```text
/// contract_state$_ is_signature_allowed:Bool seqno:uint32 wallet_id:int32
///                  public_key:bits256 extensions_dict:(HashmapE 256 int1)
/// ```
///
/// The extensions dictionary is kept as an opaque root cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletV5Config {
    pub signature_allowed: bool,
    pub seqno: u32,
    /// Raw (obfuscated) wallet id.
    pub wallet_id: i32,
    #[serde(with = "hex_key")]
    pub public_key: [u8; 32],
    #[serde(skip)]
    pub extensions: Option<Arc<Cell>>,
}

mod hex_key {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut key = [0u8; 32];
        hex::decode_to_slice(s, &mut key).map_err(serde::de::Error::custom)?;
        Ok(key)
    }
}

impl WalletV5Config {
    /// Data of a freshly deployed wallet: signatures allowed, seqno 0, no
    /// extensions.
    pub fn new(wallet_id: &WalletId, public_key: [u8; 32]) -> WalletResult<Self> {
        Ok(Self {
            signature_allowed: true,
            seqno: 0,
            wallet_id: wallet_id.encode()?,
            public_key,
            extensions: None,
        })
    }

    pub fn to_cell(&self) -> WalletResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_bit(self.signature_allowed)?;
        builder.store_u32(self.seqno)?;
        builder.store_i32(self.wallet_id)?;
        builder.store_bytes(&self.public_key)?;
        builder.store_maybe_ref(self.extensions.clone())?;
        Ok(builder.build()?)
    }

    pub fn from_cell(cell: &Cell) -> WalletResult<Self> {
        let mut slice = CellSlice::new(cell);
        let config = Self {
            signature_allowed: slice.load_bit()?,
            seqno: slice.load_u32()?,
            wallet_id: slice.load_i32()?,
            public_key: slice.load_array::<32>()?,
            extensions: slice.load_maybe_ref()?.cloned(),
        };
        ensure_consumed(&slice)?;
        Ok(config)
    }

    /// Decode the stored wallet id against `network`.
    pub fn wallet_id(&self, network: Network) -> WalletResult<WalletId> {
        WalletId::decode(self.wallet_id, network.global_id())
    }

    /// `StateInit` for deploying `code` with this data.
    pub fn state_init(&self, code: Arc<Cell>) -> WalletResult<Cell> {
        let data = self.to_cell()?;

        let mut builder = CellBuilder::new();
        builder.store_bit(false)?; // split_depth
        builder.store_bit(false)?; // special
        builder.store_bit(true)?;
        builder.store_ref(code)?;
        builder.store_bit(true)?;
        builder.store_ref(Arc::new(data))?;
        builder.store_bit(false)?; // library
        Ok(builder.build()?)
    }

    /// Contract address: the state init hash on `workchain`.
    pub fn address(&self, workchain: i32, code: Arc<Cell>) -> WalletResult<MsgAddress> {
        let state_init = self.state_init(code)?;
        let address = MsgAddress::Internal {
            workchain,
            address: state_init.hash(),
        };
        debug!(address = %address, wallet_id = self.wallet_id, "derived wallet address");
        Ok(address)
    }
}
