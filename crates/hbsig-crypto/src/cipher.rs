//! Sealed private keys
//!
//! A private key export can be sealed with ChaCha20-Poly1305 under a
//! random 32-byte wrapping key. The wrapping key lives in the OS keychain,
//! so a stolen key file alone is useless.
//!
//! Envelope: magic "HBSE" | version | fingerprint (16) | nonce (12) | ciphertext || tag
//! The header is bound as associated data.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use zeroize::Zeroizing;

use crate::context::CryptoContext;
use crate::keys::{Fingerprint, FINGERPRINT_SIZE};
use crate::{CryptoError, Result};

/// 256-bit key (32 bytes)
pub const KEY_SIZE: usize = 32;
/// 96-bit nonce (12 bytes)
pub const NONCE_SIZE: usize = 12;

const SEALED_MAGIC: &[u8; 4] = b"HBSE";
const SEALED_VERSION: u8 = 1;
const HEADER_SIZE: usize = 4 + 1 + FINGERPRINT_SIZE;

/// Generate a random wrapping key
pub fn generate_key(ctx: &CryptoContext) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    ctx.fill(key.as_mut())?;
    Ok(key)
}

/// Whether `bytes` look like a sealed envelope
pub fn is_sealed(bytes: &[u8]) -> bool {
    bytes.len() > HEADER_SIZE + NONCE_SIZE && &bytes[..4] == SEALED_MAGIC
}

/// Fingerprint of the key sealed inside an envelope
pub fn sealed_fingerprint(bytes: &[u8]) -> Option<Fingerprint> {
    if !is_sealed(bytes) {
        return None;
    }
    let mut fp = [0u8; FINGERPRINT_SIZE];
    fp.copy_from_slice(&bytes[5..HEADER_SIZE]);
    Some(fp)
}

/// Seal `plaintext` for the key identified by `fingerprint`
pub fn seal(ctx: &CryptoContext, key: &[u8], fingerprint: &Fingerprint, plaintext: &[u8]) -> Result<Vec<u8>> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::Sealing(format!("wrapping key must be {KEY_SIZE} bytes")));
    }
    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| CryptoError::Sealing("invalid wrapping key".into()))?;

    let mut header = Vec::with_capacity(HEADER_SIZE);
    header.extend_from_slice(SEALED_MAGIC);
    header.push(SEALED_VERSION);
    header.extend_from_slice(fingerprint);

    let nonce_bytes: [u8; NONCE_SIZE] = ctx.random()?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), Payload { msg: plaintext, aad: &header })
        .map_err(|_| CryptoError::Sealing("encryption failed".into()))?;

    let mut result = header;
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Open an envelope produced by [`seal`]
pub fn unseal(key: &[u8], sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::Sealing(format!("wrapping key must be {KEY_SIZE} bytes")));
    }
    if !is_sealed(sealed) {
        return Err(CryptoError::Sealing("not a sealed key".into()));
    }
    if sealed[4] != SEALED_VERSION {
        return Err(CryptoError::Sealing(format!("unsupported envelope version {}", sealed[4])));
    }

    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| CryptoError::Sealing("invalid wrapping key".into()))?;
    let (header, rest) = sealed.split_at(HEADER_SIZE);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), Payload { msg: ciphertext, aad: header })
        .map_err(|_| CryptoError::Sealing("decryption failed - data may be corrupted or tampered".into()))?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FP: Fingerprint = [3u8; FINGERPRINT_SIZE];

    #[test]
    fn test_seal_unseal_roundtrip() {
        let ctx = CryptoContext::new();
        let key = generate_key(&ctx).unwrap();
        let plaintext = b"HBSK private key bytes";

        let sealed = seal(&ctx, key.as_ref(), &FP, plaintext).unwrap();
        assert!(is_sealed(&sealed));
        assert_eq!(sealed_fingerprint(&sealed), Some(FP));

        let opened = unseal(key.as_ref(), &sealed).unwrap();
        assert_eq!(opened.as_slice(), plaintext);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let ctx = CryptoContext::new();
        let key = generate_key(&ctx).unwrap();
        let mut sealed = seal(&ctx, key.as_ref(), &FP, b"secret").unwrap();

        if let Some(byte) = sealed.last_mut() {
            *byte ^= 0xFF;
        }

        assert!(unseal(key.as_ref(), &sealed).is_err());
    }

    #[test]
    fn test_tampered_header_fails() {
        let ctx = CryptoContext::new();
        let key = generate_key(&ctx).unwrap();
        let mut sealed = seal(&ctx, key.as_ref(), &FP, b"secret").unwrap();
        sealed[6] ^= 0x01;
        assert!(unseal(key.as_ref(), &sealed).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let ctx = CryptoContext::new();
        let key1 = generate_key(&ctx).unwrap();
        let key2 = generate_key(&ctx).unwrap();
        let sealed = seal(&ctx, key1.as_ref(), &FP, b"secret").unwrap();
        assert!(unseal(key2.as_ref(), &sealed).is_err());
    }

    #[test]
    fn test_plain_key_is_not_sealed() {
        assert!(!is_sealed(b"HBSK\x01 plain private key export"));
    }
}
