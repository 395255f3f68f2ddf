//! Extended actions.
//!
//! Extended actions manage the wallet itself rather than sending messages:
//!
//! ```text
//! action_add_ext#02        addr:MsgAddressInt = ExtendedAction;
//! action_delete_ext#03     addr:MsgAddressInt = ExtendedAction;
//! action_set_signature_auth_allowed#04 allowed:Bool = ExtendedAction;
//! ```
//!
//! The 8-bit tags live in their own space, disjoint from the 32-bit out
//! action tags (`0x0ec3c86d`, `0xad4de08e`), which never start with a
//! byte in `2..=4`.

use w5_cell::{CellBuilder, CellSlice, MsgAddress};

use crate::error::{WalletError, WalletResult};

pub const TAG_ADD_EXTENSION: u8 = 0x02;
pub const TAG_REMOVE_EXTENSION: u8 = 0x03;
pub const TAG_SET_SIGNATURE_AUTH: u8 = 0x04;

/// One extension-management action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedAction {
    AddExtension { address: MsgAddress },
    RemoveExtension { address: MsgAddress },
    SetSignatureAuth { allowed: bool },
}

impl ExtendedAction {
    pub fn add_extension(address: MsgAddress) -> Self {
        ExtendedAction::AddExtension { address }
    }

    pub fn remove_extension(address: MsgAddress) -> Self {
        ExtendedAction::RemoveExtension { address }
    }

    pub fn set_signature_auth(allowed: bool) -> Self {
        ExtendedAction::SetSignatureAuth { allowed }
    }

    pub fn tag(&self) -> u8 {
        match self {
            ExtendedAction::AddExtension { .. } => TAG_ADD_EXTENSION,
            ExtendedAction::RemoveExtension { .. } => TAG_REMOVE_EXTENSION,
            ExtendedAction::SetSignatureAuth { .. } => TAG_SET_SIGNATURE_AUTH,
        }
    }

    /// Width of the serialized record in bits.
    pub fn bit_len(&self) -> usize {
        match self {
            ExtendedAction::SetSignatureAuth { .. } => 8 + 1,
            _ => 8 + MsgAddress::STD_BITS,
        }
    }

    /// Append the tagged record. Extension addresses must be internal with
    /// an int8 workchain.
    pub fn store(&self, builder: &mut CellBuilder) -> WalletResult<()> {
        match self {
            ExtendedAction::AddExtension { address }
            | ExtendedAction::RemoveExtension { address } => {
                if !is_extension_address(address) {
                    return Err(WalletError::InvalidExtensionAddress);
                }
                builder.store_u8(self.tag())?;
                builder.store_address(address)?;
            }
            ExtendedAction::SetSignatureAuth { allowed } => {
                builder.store_u8(self.tag())?;
                builder.store_bit(*allowed)?;
            }
        }
        Ok(())
    }

    pub fn load(slice: &mut CellSlice) -> WalletResult<Self> {
        let tag = slice.load_u8()?;
        match tag {
            TAG_ADD_EXTENSION => Ok(ExtendedAction::AddExtension {
                address: load_extension_address(slice)?,
            }),
            TAG_REMOVE_EXTENSION => Ok(ExtendedAction::RemoveExtension {
                address: load_extension_address(slice)?,
            }),
            TAG_SET_SIGNATURE_AUTH => Ok(ExtendedAction::SetSignatureAuth {
                allowed: slice.load_bit()?,
            }),
            other => Err(WalletError::UnknownExtendedAction(other)),
        }
    }
}

fn is_extension_address(address: &MsgAddress) -> bool {
    address
        .workchain()
        .is_some_and(|wc| i8::try_from(wc).is_ok())
}

fn load_extension_address(slice: &mut CellSlice) -> WalletResult<MsgAddress> {
    let address = slice.load_address()?;
    if !is_extension_address(&address) {
        return Err(WalletError::InvalidExtensionAddress);
    }
    Ok(address)
}
