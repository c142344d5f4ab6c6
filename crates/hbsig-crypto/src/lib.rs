//! hbsig Crypto - hash-based signature backend
//!
//! This crate provides:
//! - Winternitz one-time signatures and Merkle hypertrees (XMSS, XMSS^MT, HSS shapes)
//! - Private/public key formats with zeroize-on-drop secrets
//! - Sealed private keys (ChaCha20-Poly1305, wrapping key in the OS keychain)
//! - Stateless post-quantum wrappers (ML-DSA, SLH-DSA, ML-KEM)
//! - RFC 5869 HKDF
//!
//! Nothing here tracks which leaves have been used. That is `hbsig-core`'s job.

pub mod cipher;
pub mod context;
pub mod hash;
pub mod hypertree;
pub mod kdf;
pub mod keychain;
pub mod keys;
pub mod merkle;
pub mod params;
pub mod pq;
pub mod wots;

pub use context::CryptoContext;
pub use hash::{message_digest, MESSAGE_DIGEST_SIZE};
pub use hypertree::{signature_size, verify, Signature};
/// Raw leaf signer for hbsig-core's state machine; sign through `hbsig_core::Signer`.
#[doc(hidden)]
pub use hypertree::OtsSigner;
pub use keychain::KeychainProvider;
pub use keys::{hex, Fingerprint, PrivateKey, PublicKey, FINGERPRINT_SIZE};
pub use params::{HssHeight, ParamSet, TreeStrategy, Winternitz, XmssHeight, XmssMtVariant};

/// Errors that can occur in cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Corrupt key: {0}")]
    CorruptKey(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid digest length: expected {expected}, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sealing failed: {0}")]
    Sealing(String),

    #[error("Keychain access denied: {0}")]
    Keychain(String),

    #[error("Key derivation failed: {0}")]
    Kdf(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Why a signature did not verify
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Malformed signature: {0}")]
    Malformed(String),

    #[error("Signature is for {signature}, key is {key}")]
    ParamMismatch { signature: String, key: String },

    #[error("Signature verification failed")]
    Invalid,
}
