//! Ed25519 keys for request signing.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Error)]
pub enum Ed25519Error {
    #[error("Invalid key bytes: {0}")]
    InvalidKey(String),

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Invalid signature bytes")]
    InvalidSignature,
}

/// An Ed25519 keypair.
///
/// The 32-byte seed is wiped on drop.
///
/// ```
/// use w5_crypto::Ed25519Keypair;
///
/// let keypair = Ed25519Keypair::generate();
/// let signature = keypair.sign(b"body hash");
/// assert!(keypair.verify(b"body hash", &signature).is_ok());
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Ed25519Keypair {
    private_key: [u8; 32],
    #[zeroize(skip)]
    pub public_key: [u8; 32],
    // SigningKey zeroizes itself on drop.
    #[zeroize(skip)]
    signing_key: SigningKey,
}

impl Ed25519Keypair {
    /// Fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Keypair from a 32-byte seed.
    pub fn from_private_key(private_key: [u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(&private_key))
    }

    /// Keypair from a seed slice; fails unless it is exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Ed25519Error> {
        let seed: [u8; 32] = bytes.try_into().map_err(|_| {
            Ed25519Error::InvalidKey(format!("Expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_private_key(seed))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        Self {
            private_key: signing_key.to_bytes(),
            public_key: signing_key.verifying_key().to_bytes(),
            signing_key,
        }
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<(), Ed25519Error> {
        verify_signature(&self.public_key, message, signature)
    }

    pub fn private_key_bytes(&self) -> &[u8; 32] {
        &self.private_key
    }
}

impl std::fmt::Debug for Ed25519Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Keypair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Verify `signature` over `message` against a bare public key.
pub fn verify_signature(
    public_key: &[u8; 32],
    message: &[u8],
    signature: &[u8; 64],
) -> Result<(), Ed25519Error> {
    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| Ed25519Error::InvalidKey(e.to_string()))?;
    verifying_key
        .verify(message, &Signature::from_bytes(signature))
        .map_err(|_| Ed25519Error::VerificationFailed)
}
