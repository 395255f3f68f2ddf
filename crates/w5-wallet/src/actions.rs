//! Action batches carried by a request.
//!
//! ```text
//! actions$_ out_actions:(Maybe ^OutList) has_other_actions:Bool
//!           {m:#} {n:#} other_actions:(ActionList n m) = InnerRequest;
//!
//! action_list_basic$_ = ActionList 0 0;
//! action_list_extended$_ action:ExtendedAction prev:^(ActionList n m)
//!     = ActionList n (m+1);
//! ```
//!
//! The extended side is a singly linked chain whose head is written inline
//! after the presence flag. Each node holds one record and, unless it is the
//! last, a reference to the next node, so walking head to tail yields the
//! actions in the order they were given.

use std::sync::Arc;

use tracing::{debug, trace};
use w5_cell::{Cell, CellBuilder, CellSlice};

use crate::error::WalletResult;
use crate::extended::ExtendedAction;
use crate::out_action::{build_out_list, ensure_consumed, parse_out_list, MessageOut, OutAction};

/// Where one side of a batch comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSource<T> {
    /// A cell the caller already serialized. Written as is.
    Prebuilt(Arc<Cell>),
    /// Actions to serialize. An empty list counts as absent.
    List(Vec<T>),
}

impl<T> ActionSource<T> {
    fn is_present(&self) -> bool {
        match self {
            ActionSource::Prebuilt(_) => true,
            ActionSource::List(items) => !items.is_empty(),
        }
    }
}

/// The batch a request asks the wallet to execute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletActions {
    pub wallet: Option<ActionSource<OutAction>>,
    pub extended: Option<ActionSource<ExtendedAction>>,
}

impl WalletActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_out_actions(mut self, actions: Vec<OutAction>) -> Self {
        self.wallet = Some(ActionSource::List(actions));
        self
    }

    /// Send actions paired 1:1 with `messages`.
    pub fn with_messages(self, messages: Vec<MessageOut>) -> Self {
        self.with_out_actions(messages.into_iter().map(OutAction::from).collect())
    }

    /// A ready `OutList` cell.
    pub fn with_out_list(mut self, cell: Arc<Cell>) -> Self {
        self.wallet = Some(ActionSource::Prebuilt(cell));
        self
    }

    pub fn with_extended(mut self, actions: Vec<ExtendedAction>) -> Self {
        self.extended = Some(ActionSource::List(actions));
        self
    }

    /// A ready extended chain. Its contents are copied after the flag.
    pub fn with_extended_cell(mut self, cell: Arc<Cell>) -> Self {
        self.extended = Some(ActionSource::Prebuilt(cell));
        self
    }

    /// Neither side carries anything.
    pub fn is_empty(&self) -> bool {
        !self.wallet.as_ref().is_some_and(ActionSource::is_present)
            && !self.extended.as_ref().is_some_and(ActionSource::is_present)
    }
}

/// Actions read back from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedWalletActions {
    pub out_actions: Vec<OutAction>,
    pub extended: Vec<ExtendedAction>,
}

/// Append the batch to `builder`.
pub fn store_wallet_actions(builder: &mut CellBuilder, actions: &WalletActions) -> WalletResult<()> {
    match &actions.wallet {
        Some(ActionSource::Prebuilt(cell)) => {
            debug!(hash = %hex::encode(cell.hash()), "storing prebuilt out list");
            builder.store_maybe_ref(Some(cell.clone()))?;
        }
        Some(ActionSource::List(list)) if !list.is_empty() => {
            let out_list = build_out_list(list)?;
            debug!(actions = list.len(), "storing out list");
            builder.store_maybe_ref(Some(Arc::new(out_list)))?;
        }
        _ => {
            builder.store_maybe_ref(None)?;
        }
    }

    match &actions.extended {
        Some(ActionSource::Prebuilt(cell)) => {
            debug!(bits = cell.bit_len(), "inlining prebuilt extended actions");
            builder.store_bit(true)?;
            builder.store_cell_contents(cell)?;
        }
        Some(ActionSource::List(list)) if !list.is_empty() => {
            let head = build_extended_chain(list)?;
            debug!(actions = list.len(), "inlining extended action chain");
            builder.store_bit(true)?;
            builder.store_cell_contents(&head)?;
        }
        _ => {
            builder.store_bit(false)?;
        }
    }

    Ok(())
}

/// Serialize the batch as a standalone cell.
pub fn build_wallet_actions(actions: &WalletActions) -> WalletResult<Cell> {
    let mut builder = CellBuilder::new();
    store_wallet_actions(&mut builder, actions)?;
    Ok(builder.build()?)
}

/// Link `actions` into a chain and return its head.
///
/// Cells can only reference finished cells, so the chain is built from the
/// tail: each node is sealed before the node pointing at it. An empty slice
/// yields the empty cell.
pub fn build_extended_chain(actions: &[ExtendedAction]) -> WalletResult<Cell> {
    let mut next: Option<Cell> = None;
    for action in actions.iter().rev() {
        let mut node = CellBuilder::new();
        action.store(&mut node)?;
        if let Some(tail) = next.take() {
            node.store_ref(Arc::new(tail))?;
        }
        next = Some(node.build()?);
    }
    let head = next.unwrap_or_else(Cell::empty);
    trace!(actions = actions.len(), depth = head.depth(), "built extended chain");
    Ok(head)
}

/// Read a batch written by [`store_wallet_actions`].
///
/// Stops right after the last extended record, so any trailing fields of the
/// enclosing request stay unread.
pub fn load_wallet_actions(slice: &mut CellSlice) -> WalletResult<DecodedWalletActions> {
    let out_actions = match slice.load_maybe_ref()? {
        Some(list) => parse_out_list(list)?,
        None => Vec::new(),
    };

    let mut extended = Vec::new();
    if slice.load_bit()? {
        extended.push(ExtendedAction::load(slice)?);
        let mut next = if slice.refs_left() > 0 {
            Some(slice.load_ref()?)
        } else {
            None
        };
        while let Some(cell) = next {
            let mut node = CellSlice::new(cell);
            extended.push(ExtendedAction::load(&mut node)?);
            next = if node.refs_left() > 0 {
                Some(node.load_ref()?)
            } else {
                None
            };
            ensure_consumed(&node)?;
        }
    }

    trace!(
        out_actions = out_actions.len(),
        extended = extended.len(),
        "loaded wallet actions"
    );
    Ok(DecodedWalletActions {
        out_actions,
        extended,
    })
}

/// Parse a standalone batch cell, rejecting leftovers.
pub fn parse_wallet_actions(cell: &Cell) -> WalletResult<DecodedWalletActions> {
    let mut slice = CellSlice::new(cell);
    let decoded = load_wallet_actions(&mut slice)?;
    ensure_consumed(&slice)?;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletError;
    use w5_cell::MsgAddress;

    fn ext(n: u8) -> MsgAddress {
        MsgAddress::Internal {
            workchain: 0,
            address: [n; 32],
        }
    }

    fn message(n: u8) -> Arc<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_u8(n).unwrap();
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn test_absent_and_empty_are_two_zero_bits() {
        let absent = build_wallet_actions(&WalletActions::new()).unwrap();
        let empty = build_wallet_actions(
            &WalletActions::new()
                .with_out_actions(vec![])
                .with_extended(vec![]),
        )
        .unwrap();

        assert_eq!(absent.bit_len(), 2);
        assert_eq!(absent.data(), &[0x00]);
        assert_eq!(absent.reference_count(), 0);
        assert_eq!(absent, empty);
        assert!(WalletActions::new().with_extended(vec![]).is_empty());
    }

    #[test]
    fn test_chain_order() {
        let actions = vec![
            ExtendedAction::add_extension(ext(1)),
            ExtendedAction::set_signature_auth(false),
            ExtendedAction::remove_extension(ext(2)),
        ];
        let head = build_extended_chain(&actions).unwrap();

        let mut walked = Vec::new();
        let mut node = Some(&head);
        while let Some(cell) = node {
            let mut slice = CellSlice::new(cell);
            walked.push(ExtendedAction::load(&mut slice).unwrap());
            node = cell.reference(0).map(|next| &**next);
        }
        assert_eq!(walked, actions);
        assert_eq!(head.depth(), 2);
    }

    #[test]
    fn test_last_node_has_no_ref() {
        let head = build_extended_chain(&[ExtendedAction::set_signature_auth(true)]).unwrap();
        assert_eq!(head.reference_count(), 0);
        assert_eq!(head.data(), &[0x04, 0x80]);
        assert!(build_extended_chain(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_extended_head_inlined() {
        let cell = build_wallet_actions(
            &WalletActions::new().with_extended(vec![ExtendedAction::set_signature_auth(true)]),
        )
        .unwrap();
        // 0 (no out list), 1 (has extended), 0x04, 1
        assert_eq!(cell.bit_len(), 11);
        assert_eq!(cell.data(), &[0x41, 0x20]);
    }

    #[test]
    fn test_roundtrip_both_sides() {
        let actions = WalletActions::new()
            .with_messages(vec![
                MessageOut::new(message(1), 3),
                MessageOut::new(message(2), 128),
            ])
            .with_extended(vec![
                ExtendedAction::add_extension(ext(9)),
                ExtendedAction::remove_extension(ext(8)),
            ]);
        let cell = build_wallet_actions(&actions).unwrap();
        let decoded = parse_wallet_actions(&cell).unwrap();

        assert_eq!(decoded.out_actions.len(), 2);
        assert_eq!(
            decoded.out_actions[1],
            OutAction::SendMsg {
                mode: 128,
                message: message(2)
            }
        );
        assert_eq!(
            decoded.extended,
            vec![
                ExtendedAction::add_extension(ext(9)),
                ExtendedAction::remove_extension(ext(8)),
            ]
        );
    }

    #[test]
    fn test_prebuilt_cells() {
        let out_list = Arc::new(build_out_list(&[MessageOut::new(message(5), 1).into()]).unwrap());
        let chain = Arc::new(
            build_extended_chain(&[
                ExtendedAction::set_signature_auth(true),
                ExtendedAction::add_extension(ext(3)),
            ])
            .unwrap(),
        );

        let prebuilt = build_wallet_actions(
            &WalletActions::new()
                .with_out_list(out_list.clone())
                .with_extended_cell(chain),
        )
        .unwrap();
        let listed = build_wallet_actions(
            &WalletActions::new()
                .with_out_actions(vec![MessageOut::new(message(5), 1).into()])
                .with_extended(vec![
                    ExtendedAction::set_signature_auth(true),
                    ExtendedAction::add_extension(ext(3)),
                ]),
        )
        .unwrap();

        assert_eq!(prebuilt, listed);
        assert_eq!(prebuilt.reference(0).unwrap(), &out_list);
    }

    #[test]
    fn test_out_of_range_extension_workchain_is_an_error() {
        let address: MsgAddress =
            "300:1111111111111111111111111111111111111111111111111111111111111111"
                .parse()
                .unwrap();
        let actions = WalletActions::new().with_extended(vec![ExtendedAction::add_extension(address)]);
        assert!(matches!(
            build_wallet_actions(&actions),
            Err(WalletError::InvalidExtensionAddress)
        ));
    }

    #[test]
    fn test_unknown_extended_tag_rejected() {
        let mut builder = CellBuilder::new();
        builder.store_bit(false).unwrap();
        builder.store_bit(true).unwrap();
        builder.store_u8(0x07).unwrap();
        let cell = builder.build().unwrap();
        assert!(matches!(
            parse_wallet_actions(&cell),
            Err(WalletError::UnknownExtendedAction(7))
        ));
    }
}
