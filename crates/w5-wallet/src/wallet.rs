//! Wallet trait definition

use std::sync::Arc;

use w5_cell::{Cell, CellBuilder, MsgAddress};

use crate::error::WalletResult;
use crate::transfer::Transfer;

/// Common wallet interface
pub trait Wallet: Send + Sync {
    /// Get wallet version name
    fn version(&self) -> &'static str;

    /// Get wallet address
    fn address(&self) -> &MsgAddress;

    /// Get public key
    fn public_key(&self) -> &[u8; 32];

    /// Get workchain
    fn workchain(&self) -> i32;

    /// Get state init cell for deployment
    fn state_init(&self) -> WalletResult<Cell>;

    /// Create unsigned transfer message body
    fn create_transfer_body(
        &self,
        seqno: u32,
        transfers: &[Transfer],
        valid_until: u32,
    ) -> WalletResult<Cell>;

    /// Sign a message body
    fn sign(&self, body: &Cell) -> WalletResult<Cell>;

    /// Wrap a signed body in an inbound external message to this wallet.
    ///
    /// `deploy` attaches the state init, needed while the contract is
    /// uninitialized (seqno 0).
    fn create_external_message(&self, signed_body: &Cell, deploy: bool) -> WalletResult<Cell> {
        let mut builder = CellBuilder::new();

        // ext_in_msg_info$10 src:addr_none
        builder.store_bits(&[true, false])?;
        builder.store_address(&MsgAddress::Null)?;
        builder.store_address(self.address())?;
        builder.store_coins(0)?; // import_fee

        if deploy {
            builder.store_bit(true)?;
            builder.store_bit(true)?; // as ref
            builder.store_ref(Arc::new(self.state_init()?))?;
        } else {
            builder.store_bit(false)?;
        }

        // body as ref
        builder.store_bit(true)?;
        builder.store_ref(Arc::new(signed_body.clone()))?;

        Ok(builder.build()?)
    }
}
