//! Out actions and the `OutList` codec.
//!
//! ```text
//! action_send_msg#0ec3c86d mode:(## 8) out_msg:^(MessageRelaxed Any) = OutAction;
//! action_set_code#ad4de08e new_code:^Cell = OutAction;
//!
//! out_list_empty$_ = OutList 0;
//! out_list$_ {n:#} prev:^(OutList n) action:OutAction = OutList (n + 1);
//! ```
//!
//! The list is built first-to-last, each node pointing back at the list so
//! far, so the head holds the *last* action. The contract executes actions
//! after reversing, i.e. in the order they were given.

use std::sync::Arc;

use tracing::trace;
use w5_cell::{Cell, CellBuilder, CellSlice};

use crate::error::{WalletError, WalletResult};

pub const TAG_SEND_MSG: u32 = 0x0ec3c86d;
pub const TAG_SET_CODE: u32 = 0xad4de08e;

/// Upper bound on actions in one `OutList`, set by the TVM action limit.
pub const MAX_OUT_ACTIONS: usize = 255;

/// An action executed by the wallet contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutAction {
    /// Send `message` (a `MessageRelaxed`) with the given send mode.
    SendMsg { mode: u8, message: Arc<Cell> },
    /// Replace the contract code.
    SetCode { new_code: Arc<Cell> },
}

/// An outgoing message paired with its send mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOut {
    pub message: Arc<Cell>,
    pub mode: u8,
}

impl MessageOut {
    pub fn new(message: Arc<Cell>, mode: u8) -> Self {
        Self { message, mode }
    }
}

impl From<MessageOut> for OutAction {
    fn from(msg: MessageOut) -> Self {
        OutAction::SendMsg {
            mode: msg.mode,
            message: msg.message,
        }
    }
}

impl OutAction {
    pub fn store(&self, builder: &mut CellBuilder) -> WalletResult<()> {
        match self {
            OutAction::SendMsg { mode, message } => {
                builder.store_u32(TAG_SEND_MSG)?;
                builder.store_u8(*mode)?;
                builder.store_ref(message.clone())?;
            }
            OutAction::SetCode { new_code } => {
                builder.store_u32(TAG_SET_CODE)?;
                builder.store_ref(new_code.clone())?;
            }
        }
        Ok(())
    }

    pub fn load(slice: &mut CellSlice) -> WalletResult<Self> {
        match slice.load_u32()? {
            TAG_SEND_MSG => {
                let mode = slice.load_u8()?;
                let message = slice.load_ref()?.clone();
                Ok(OutAction::SendMsg { mode, message })
            }
            TAG_SET_CODE => Ok(OutAction::SetCode {
                new_code: slice.load_ref()?.clone(),
            }),
            other => Err(WalletError::UnknownOutAction(other)),
        }
    }
}

/// Serialize `actions` as an `OutList` cell.
///
/// An empty slice yields `out_list_empty`, the empty cell.
pub fn build_out_list(actions: &[OutAction]) -> WalletResult<Cell> {
    if actions.len() > MAX_OUT_ACTIONS {
        return Err(WalletError::TooManyActions {
            max: MAX_OUT_ACTIONS,
            got: actions.len(),
        });
    }

    let mut list = Cell::empty();
    for action in actions {
        let mut node = CellBuilder::new();
        node.store_ref(Arc::new(list))?;
        action.store(&mut node)?;
        list = node.build()?;
    }
    trace!(actions = actions.len(), depth = list.depth(), "built out list");
    Ok(list)
}

/// Parse an `OutList` cell back into actions in execution order.
pub fn parse_out_list(cell: &Cell) -> WalletResult<Vec<OutAction>> {
    let mut actions = Vec::new();
    let mut node = cell;

    while !node.is_empty() {
        if actions.len() == MAX_OUT_ACTIONS {
            return Err(WalletError::TooManyActions {
                max: MAX_OUT_ACTIONS,
                got: actions.len() + 1,
            });
        }
        let mut slice = CellSlice::new(node);
        let prev = slice.load_ref()?;
        actions.push(OutAction::load(&mut slice)?);
        ensure_consumed(&slice)?;
        node = prev.as_ref();
    }

    actions.reverse();
    Ok(actions)
}

pub(crate) fn ensure_consumed(slice: &CellSlice) -> WalletResult<()> {
    if !slice.is_empty() {
        return Err(WalletError::TrailingData {
            bits: slice.bits_left(),
            refs: slice.refs_left(),
        });
    }
    Ok(())
}
