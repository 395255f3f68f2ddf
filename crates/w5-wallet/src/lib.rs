//! W5 (wallet v5r1) request codec
//!
//! This crate serializes the messages a W5 wallet contract accepts:
//! - Wallet ids: a client context XORed with the network global id
//! - Extended actions: add/remove extension, toggle signature auth
//! - Action batches: an `OutList` reference plus an inline extended chain
//! - Requests: signed external, signed internal and extension requests
//!
//! ```
//! use std::sync::Arc;
//! use w5_cell::{CellBuilder, MsgAddress};
//! use w5_crypto::Ed25519Keypair;
//! use w5_wallet::{Network, RequestMessage, Transfer, WalletActions, WalletV5R1};
//!
//! let mut code = CellBuilder::new();
//! code.store_u32(0xC0DE).unwrap();
//! let code = Arc::new(code.build().unwrap());
//!
//! let wallet = WalletV5R1::new(Ed25519Keypair::generate(), code, Network::Testnet, 0).unwrap();
//! let to = MsgAddress::Internal { workchain: 0, address: [1; 32] };
//! let msg = Transfer::new(to, 50_000_000).to_message_out().unwrap();
//!
//! let body = wallet
//!     .create_external_request(0, u32::MAX, WalletActions::new().with_messages(vec![msg]))
//!     .unwrap();
//! let parsed = RequestMessage::parse(&body).unwrap();
//! assert_eq!(parsed.actions.out_actions.len(), 1);
//! ```

pub mod actions;
pub mod config;
pub mod error;
pub mod extended;
pub mod out_action;
pub mod request;
pub mod transfer;
pub mod v5r1;
pub mod wallet;
pub mod wallet_id;

// Re-exports
pub use actions::{
    build_extended_chain, build_wallet_actions, load_wallet_actions, parse_wallet_actions,
    store_wallet_actions, ActionSource, DecodedWalletActions, WalletActions,
};
pub use config::{Network, WalletV5Config, NETWORK_MAINNET, NETWORK_TESTNET};
pub use error::{WalletError, WalletResult};
pub use extended::ExtendedAction;
pub use out_action::{build_out_list, parse_out_list, MessageOut, OutAction, MAX_OUT_ACTIONS};
pub use request::{
    build_extension_request, build_external_request, build_internal_request,
    build_signed_request, ParsedRequest, RequestHeader, RequestKind, RequestMessage,
};
pub use transfer::{build_comment, send_mode, Transfer};
pub use v5r1::WalletV5R1;
pub use wallet::Wallet;
pub use wallet_id::{ClientContext, WalletId, WalletIdContext, WalletVersion};
