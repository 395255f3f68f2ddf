//! Wallet V5R1 (W5)
//!
//! Wraps the request codec with a key, a wallet id and the contract code,
//! and implements the common [`Wallet`] interface on top of it.

use std::sync::Arc;

use tracing::debug;
use w5_cell::{BagOfCells, Cell, MsgAddress};
use w5_crypto::Ed25519Keypair;

use crate::actions::WalletActions;
use crate::config::{Network, WalletV5Config};
use crate::error::{WalletError, WalletResult};
use crate::out_action::MAX_OUT_ACTIONS;
use crate::request::{
    append_signature, build_extension_request, RequestKind, RequestMessage,
};
use crate::transfer::Transfer;
use crate::wallet::Wallet;
use crate::wallet_id::WalletId;

/// Wallet V5 revision 1 (W5)
pub struct WalletV5R1 {
    keypair: Ed25519Keypair,
    wallet_id: WalletId,
    workchain: i32,
    code: Arc<Cell>,
    address: MsgAddress,
}

impl WalletV5R1 {
    /// Create wallet on `network` with the default subwallet.
    pub fn new(keypair: Ed25519Keypair, code: Arc<Cell>, network: Network, workchain: i32) -> WalletResult<Self> {
        Self::with_subwallet(keypair, code, network, workchain, 0)
    }

    /// Create wallet with a specific subwallet number
    pub fn with_subwallet(
        keypair: Ed25519Keypair,
        code: Arc<Cell>,
        network: Network,
        workchain: i32,
        subwallet_number: u32,
    ) -> WalletResult<Self> {
        let wallet_id = WalletId::for_network(network, workchain, subwallet_number)?;
        Self::with_wallet_id(keypair, code, wallet_id, workchain)
    }

    /// Create wallet from an explicit wallet id.
    ///
    /// A client context must name the same workchain the wallet is deployed on.
    pub fn with_wallet_id(
        keypair: Ed25519Keypair,
        code: Arc<Cell>,
        wallet_id: WalletId,
        workchain: i32,
    ) -> WalletResult<Self> {
        if let Some(ctx) = wallet_id.client_context() {
            if i32::from(ctx.workchain) != workchain {
                return Err(WalletError::InvalidWorkchain(workchain));
            }
        }
        let config = WalletV5Config::new(&wallet_id, keypair.public_key)?;
        let address = config.address(workchain, code.clone())?;
        debug!(%address, ?wallet_id, "created v5r1 wallet");

        Ok(Self {
            keypair,
            wallet_id,
            workchain,
            code,
            address,
        })
    }

    /// Create wallet with code loaded from a serialized bag of cells.
    pub fn from_code_boc(
        keypair: Ed25519Keypair,
        code_boc: &[u8],
        network: Network,
        workchain: i32,
    ) -> WalletResult<Self> {
        let boc = BagOfCells::deserialize(code_boc)?;
        let code = boc.single_root()?.clone();
        Self::new(keypair, code, network, workchain)
    }

    pub fn wallet_id(&self) -> &WalletId {
        &self.wallet_id
    }

    /// Wallet id as stored on chain.
    pub fn raw_wallet_id(&self) -> WalletResult<i32> {
        self.wallet_id.encode()
    }

    pub fn code(&self) -> &Arc<Cell> {
        &self.code
    }

    /// Base64url address, flagged for testnet when the wallet id says so.
    pub fn friendly_address(&self, bounceable: bool) -> Option<String> {
        let testnet = Network::from_global_id(self.wallet_id.network_global_id).is_testnet();
        self.address.to_user_friendly(bounceable, testnet)
    }

    /// Contract data at deployment.
    pub fn initial_data(&self) -> WalletResult<WalletV5Config> {
        WalletV5Config::new(&self.wallet_id, self.keypair.public_key)
    }

    /// Signed request for an external message.
    pub fn create_external_request(
        &self,
        seqno: u32,
        valid_until: u32,
        actions: WalletActions,
    ) -> WalletResult<Cell> {
        self.signed_request(RequestKind::SignedExternal, seqno, valid_until, actions)
    }

    /// Signed request for the body of an internal message.
    pub fn create_internal_request(
        &self,
        seqno: u32,
        valid_until: u32,
        actions: WalletActions,
    ) -> WalletResult<Cell> {
        self.signed_request(RequestKind::SignedInternal, seqno, valid_until, actions)
    }

    /// Request an installed extension sends to this wallet.
    pub fn create_extension_request(&self, query_id: u64, actions: WalletActions) -> WalletResult<Cell> {
        build_extension_request(query_id, actions)
    }

    fn signed_request(
        &self,
        kind: RequestKind,
        seqno: u32,
        valid_until: u32,
        actions: WalletActions,
    ) -> WalletResult<Cell> {
        RequestMessage::signed(kind, self.raw_wallet_id()?, valid_until, seqno, actions)
            .sign(&self.keypair)?
            .to_cell()
    }

    fn transfer_actions(transfers: &[Transfer]) -> WalletResult<WalletActions> {
        if transfers.len() > MAX_OUT_ACTIONS {
            return Err(WalletError::TooManyActions {
                max: MAX_OUT_ACTIONS,
                got: transfers.len(),
            });
        }
        let messages = transfers
            .iter()
            .map(Transfer::to_message_out)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WalletActions::new().with_messages(messages))
    }
}

impl Wallet for WalletV5R1 {
    fn version(&self) -> &'static str {
        self.wallet_id
            .client_context()
            .map_or("v5r1", |ctx| ctx.wallet_version.as_str())
    }

    fn address(&self) -> &MsgAddress {
        &self.address
    }

    fn public_key(&self) -> &[u8; 32] {
        &self.keypair.public_key
    }

    fn workchain(&self) -> i32 {
        self.workchain
    }

    fn state_init(&self) -> WalletResult<Cell> {
        self.initial_data()?.state_init(self.code.clone())
    }

    fn create_transfer_body(
        &self,
        seqno: u32,
        transfers: &[Transfer],
        valid_until: u32,
    ) -> WalletResult<Cell> {
        let actions = Self::transfer_actions(transfers)?;
        RequestMessage::signed(
            RequestKind::SignedExternal,
            self.raw_wallet_id()?,
            valid_until,
            seqno,
            actions,
        )
        .body()
    }

    fn sign(&self, body: &Cell) -> WalletResult<Cell> {
        let signature = self.keypair.sign(&body.hash());
        append_signature(body, &signature)
    }
}
