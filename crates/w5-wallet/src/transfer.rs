//! Plain value transfers turned into outgoing messages.

use std::sync::Arc;

use w5_cell::{Cell, CellBuilder, CellResult, MsgAddress};

use crate::out_action::{MessageOut, OutAction};

/// Send mode flags for `action_send_msg`.
pub mod send_mode {
    pub const PAY_FEES_SEPARATELY: u8 = 1;
    pub const IGNORE_ERRORS: u8 = 2;
    pub const DESTROY_IF_ZERO: u8 = 32;
    pub const CARRY_REMAINING_VALUE: u8 = 64;
    pub const CARRY_ALL_BALANCE: u8 = 128;
}

/// A transfer to be sent from the wallet
#[derive(Debug, Clone)]
pub struct Transfer {
    pub to: MsgAddress,
    /// Amount in nanotons
    pub amount: u128,
    pub payload: Option<Arc<Cell>>,
    pub bounce: bool,
    /// Send mode (default: pay fees separately + ignore errors)
    pub mode: u8,
}

impl Transfer {
    pub fn new(to: MsgAddress, amount: u128) -> Self {
        Self {
            to,
            amount,
            payload: None,
            bounce: true,
            mode: send_mode::PAY_FEES_SEPARATELY | send_mode::IGNORE_ERRORS,
        }
    }

    pub fn with_payload(mut self, payload: Cell) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    pub fn with_bounce(mut self, bounce: bool) -> Self {
        self.bounce = bounce;
        self
    }

    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = mode;
        self
    }

    /// Build the `MessageRelaxed` for this transfer.
    ///
    /// ```text
    /// int_msg_info$0 ihr_disabled:Bool bounce:Bool bounced:Bool
    ///   src:MsgAddress dest:MsgAddressInt value:CurrencyCollection
    ///   ihr_fee:Grams fwd_fee:Grams created_lt:uint64 created_at:uint32
    /// init:(Maybe ...) body:(Either X ^X)
    /// ```
    pub fn to_message(&self) -> CellResult<Cell> {
        let mut builder = CellBuilder::new();

        builder.store_bit(false)?; // int_msg_info$0
        builder.store_bit(true)?; // ihr_disabled
        builder.store_bit(self.bounce)?;
        builder.store_bit(false)?; // bounced
        builder.store_address(&MsgAddress::Null)?; // src, filled in by the contract
        builder.store_address(&self.to)?;

        builder.store_coins(self.amount)?;
        builder.store_bit(false)?; // no extra currencies

        builder.store_coins(0)?; // ihr_fee
        builder.store_coins(0)?; // fwd_fee
        builder.store_u64(0)?; // created_lt
        builder.store_u32(0)?; // created_at

        builder.store_bit(false)?; // no state init

        match &self.payload {
            Some(payload) => {
                builder.store_bit(true)?;
                builder.store_ref(payload.clone())?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }

        builder.build()
    }

    pub fn to_message_out(&self) -> CellResult<MessageOut> {
        Ok(MessageOut::new(Arc::new(self.to_message()?), self.mode))
    }

    pub fn to_out_action(&self) -> CellResult<OutAction> {
        self.to_message_out().map(OutAction::from)
    }
}

/// Build a text comment body (`op = 0` followed by UTF-8 bytes).
///
/// Comments longer than one cell are rejected with `DataTooLong`.
pub fn build_comment(text: &str) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(0)?;
    builder.store_bytes(text.as_bytes())?;
    builder.build()
}
