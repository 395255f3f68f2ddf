//! Message addresses.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};

use crate::{crc16_xmodem, CellError, CellResult};

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET: u8 = 0x80;

/// A message address.
///
/// Wallet extensions are always `Internal`; the other forms exist so that
/// message headers can be read back faithfully.
///
/// ```
/// use w5_cell::MsgAddress;
///
/// let addr: MsgAddress = "0:0000000000000000000000000000000000000000000000000000000000000000"
///     .parse()
///     .unwrap();
/// assert!(addr.is_basechain());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MsgAddress {
    /// `addr_none$00`.
    #[default]
    Null,

    /// `addr_extern$01`.
    External { len: u16, data: Vec<u8> },

    /// `addr_std$10`: workchain plus 256-bit account id.
    Internal { workchain: i32, address: [u8; 32] },
}

impl MsgAddress {
    /// Serialized width of an `addr_std` without anycast.
    pub const STD_BITS: usize = 2 + 1 + 8 + 256;

    /// Parse either the raw `workchain:hex` form or the 48-character
    /// user-friendly base64 form (standard or URL-safe alphabet).
    pub fn from_string(s: &str) -> CellResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(MsgAddress::Null);
        }

        if let Some((wc, hash)) = s.split_once(':') {
            let workchain: i32 = wc
                .parse()
                .map_err(|_| CellError::InvalidAddress(format!("Invalid workchain: {}", wc)))?;
            let mut address = [0u8; 32];
            hex::decode_to_slice(hash, &mut address).map_err(|e| {
                CellError::InvalidAddress(format!("Invalid account id '{}': {}", hash, e))
            })?;
            return Ok(MsgAddress::Internal { workchain, address });
        }

        if s.len() == 48 {
            return Self::from_user_friendly(s);
        }

        Err(CellError::InvalidAddress(format!(
            "Unrecognized address format: {}",
            s
        )))
    }

    fn from_user_friendly(s: &str) -> CellResult<Self> {
        let bytes = if s.contains(['-', '_']) {
            URL_SAFE.decode(s)
        } else {
            STANDARD.decode(s)
        }
        .map_err(|e| CellError::InvalidBase64(e.to_string()))?;

        if bytes.len() != 36 {
            return Err(CellError::InvalidAddress(format!(
                "User-friendly address must be 36 bytes, got {}",
                bytes.len()
            )));
        }

        let expected = u16::from_be_bytes([bytes[34], bytes[35]]);
        let actual = crc16_xmodem(&bytes[..34]);
        if expected != actual {
            return Err(CellError::InvalidAddress(format!(
                "CRC16 mismatch: expected {:04x}, got {:04x}",
                expected, actual
            )));
        }

        let tag = bytes[0] & !TAG_TESTNET;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(CellError::InvalidAddress(format!(
                "Unknown address tag 0x{:02x}",
                bytes[0]
            )));
        }

        let mut address = [0u8; 32];
        address.copy_from_slice(&bytes[2..34]);
        Ok(MsgAddress::Internal {
            workchain: bytes[1] as i8 as i32,
            address,
        })
    }

    /// `workchain:hex` for internal addresses.
    pub fn to_raw_string(&self) -> String {
        match self {
            MsgAddress::Null => String::new(),
            MsgAddress::External { len, data } => format!("extern:{}:{}", len, hex::encode(data)),
            MsgAddress::Internal { workchain, address } => {
                format!("{}:{}", workchain, hex::encode(address))
            }
        }
    }

    /// URL-safe base64 user-friendly form, internal addresses only.
    pub fn to_user_friendly(&self, bounceable: bool, testnet: bool) -> Option<String> {
        let MsgAddress::Internal { workchain, address } = self else {
            return None;
        };

        let mut data = Vec::with_capacity(36);
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if testnet {
            tag |= TAG_TESTNET;
        }
        data.push(tag);
        data.push(*workchain as i8 as u8);
        data.extend_from_slice(address);
        data.extend_from_slice(&crc16_xmodem(&data).to_be_bytes());

        Some(URL_SAFE_NO_PAD.encode(&data))
    }

    pub fn workchain(&self) -> Option<i32> {
        match self {
            MsgAddress::Internal { workchain, .. } => Some(*workchain),
            _ => None,
        }
    }

    /// The 256-bit account id, internal addresses only.
    pub fn hash_part(&self) -> Option<&[u8; 32]> {
        match self {
            MsgAddress::Internal { address, .. } => Some(address),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MsgAddress::Null)
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, MsgAddress::Internal { .. })
    }

    pub fn is_masterchain(&self) -> bool {
        matches!(self, MsgAddress::Internal { workchain: -1, .. })
    }

    pub fn is_basechain(&self) -> bool {
        matches!(self, MsgAddress::Internal { workchain: 0, .. })
    }
}

impl FromStr for MsgAddress {
    type Err = CellError;

    fn from_str(s: &str) -> CellResult<Self> {
        Self::from_string(s)
    }
}

impl fmt::Display for MsgAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw_string())
    }
}
