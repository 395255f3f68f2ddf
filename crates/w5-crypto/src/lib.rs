//! Signing for W5 wallet requests
//!
//! W5 requests are authorized by an Ed25519 signature over the 32-byte
//! representation hash of the request body. The codec never touches key
//! material directly; it calls a [`MessageSigner`], which this crate
//! implements for [`Ed25519Keypair`].
//!
//! ```
//! use w5_crypto::{verify_signature, Ed25519Keypair, MessageSigner};
//!
//! let keypair = Ed25519Keypair::generate();
//! let hash = [7u8; 32];
//! let signature = keypair.sign_hash(&hash);
//! assert!(verify_signature(&keypair.public_key, &hash, &signature).is_ok());
//! ```

pub mod ed25519;

pub use ed25519::{verify_signature, Ed25519Error, Ed25519Keypair};

/// Width of a detached signature in bytes (512 bits).
pub const SIGNATURE_BYTES: usize = 64;

/// Produces the signature appended to a signed request.
///
/// Implementors receive the representation hash of the unsigned body and
/// return a raw 64-byte signature. Hardware wallets and remote signers plug
/// in here.
pub trait MessageSigner {
    fn sign_hash(&self, hash: &[u8; 32]) -> [u8; SIGNATURE_BYTES];

    /// Public key the contract will check the signature against.
    fn public_key(&self) -> [u8; 32];
}

impl<T: MessageSigner + ?Sized> MessageSigner for &T {
    fn sign_hash(&self, hash: &[u8; 32]) -> [u8; SIGNATURE_BYTES] {
        (**self).sign_hash(hash)
    }

    fn public_key(&self) -> [u8; 32] {
        (**self).public_key()
    }
}

impl MessageSigner for Ed25519Keypair {
    fn sign_hash(&self, hash: &[u8; 32]) -> [u8; SIGNATURE_BYTES] {
        self.sign(hash)
    }

    fn public_key(&self) -> [u8; 32] {
        self.public_key
    }
}
