//! Stateless post-quantum primitives
//!
//! Using NIST-standardized algorithms:
//! - ML-KEM (Kyber) - Key Encapsulation
//! - ML-DSA (Dilithium) - Digital Signatures
//! - SLH-DSA (SPHINCS+) - Stateless Hash-Based Signatures
//!
//! None of these carry signing state; they are here for the non-stateful
//! subcommands of the CLI.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{CryptoError, Result, VerifyError};

fn bad_bytes(what: &str, e: impl std::fmt::Debug) -> CryptoError {
    CryptoError::InvalidInput(format!("{what}: {e:?}"))
}

pub mod kem {
    //! Key Encapsulation Mechanism (ML-KEM/Kyber)

    use pqcrypto_kyber::{kyber1024, kyber512, kyber768};
    use pqcrypto_traits::kem::{Ciphertext as _, PublicKey as _, SecretKey as _, SharedSecret as _};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum KemLevel {
        Kyber512,
        Kyber768,
        Kyber1024,
    }

    impl TryFrom<u32> for KemLevel {
        type Error = CryptoError;

        fn try_from(value: u32) -> Result<Self> {
            match value {
                512 => Ok(Self::Kyber512),
                768 => Ok(Self::Kyber768),
                1024 => Ok(Self::Kyber1024),
                other => Err(CryptoError::Unsupported(format!("Kyber level {other} (expected 512|768|1024)"))),
            }
        }
    }

    pub struct KemKeypair {
        pub public_key: Vec<u8>,
        pub secret_key: Zeroizing<Vec<u8>>,
    }

    pub struct EncapsulatedKey {
        pub ciphertext: Vec<u8>,
        pub shared_secret: Zeroizing<Vec<u8>>,
    }

    macro_rules! dispatch_kem {
        ($level:expr, $m:ident => $body:expr) => {
            match $level {
                KemLevel::Kyber512 => {
                    use kyber512 as $m;
                    $body
                }
                KemLevel::Kyber768 => {
                    use kyber768 as $m;
                    $body
                }
                KemLevel::Kyber1024 => {
                    use kyber1024 as $m;
                    $body
                }
            }
        };
    }

    /// Generate a new ML-KEM keypair
    pub fn generate_keypair(level: KemLevel) -> KemKeypair {
        dispatch_kem!(level, m => {
            let (pk, sk) = m::keypair();
            KemKeypair {
                public_key: pk.as_bytes().to_vec(),
                secret_key: Zeroizing::new(sk.as_bytes().to_vec()),
            }
        })
    }

    /// Encapsulate a shared secret using a public key
    pub fn encapsulate(level: KemLevel, public_key: &[u8]) -> Result<EncapsulatedKey> {
        dispatch_kem!(level, m => {
            let pk = m::PublicKey::from_bytes(public_key).map_err(|e| bad_bytes("public key", e))?;
            let (ss, ct) = m::encapsulate(&pk);
            Ok(EncapsulatedKey {
                ciphertext: ct.as_bytes().to_vec(),
                shared_secret: Zeroizing::new(ss.as_bytes().to_vec()),
            })
        })
    }

    /// Decapsulate using a secret key
    pub fn decapsulate(level: KemLevel, secret_key: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        dispatch_kem!(level, m => {
            let sk = m::SecretKey::from_bytes(secret_key).map_err(|e| bad_bytes("secret key", e))?;
            let ct = m::Ciphertext::from_bytes(ciphertext).map_err(|e| bad_bytes("ciphertext", e))?;
            let ss = m::decapsulate(&ct, &sk);
            Ok(Zeroizing::new(ss.as_bytes().to_vec()))
        })
    }
}

pub mod sign {
    //! Digital Signatures (ML-DSA/Dilithium and SLH-DSA/SPHINCS+)

    use pqcrypto_dilithium::{dilithium2, dilithium3, dilithium5};
    use pqcrypto_sphincsplus::sphincssha2128fsimple;
    use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum SignatureScheme {
        Dilithium2,
        Dilithium3,
        Dilithium5,
        SphincsSha2_128f,
    }

    impl SignatureScheme {
        /// Dilithium by NIST security category
        pub fn dilithium(security: u32) -> Result<Self> {
            match security {
                2 => Ok(Self::Dilithium2),
                3 => Ok(Self::Dilithium3),
                5 => Ok(Self::Dilithium5),
                other => Err(CryptoError::Unsupported(format!("Dilithium security {other} (expected 2|3|5)"))),
            }
        }
    }

    pub struct SigningKeypair {
        pub public_key: Vec<u8>,
        pub secret_key: Zeroizing<Vec<u8>>,
    }

    macro_rules! dispatch_sign {
        ($scheme:expr, $m:ident => $body:expr) => {
            match $scheme {
                SignatureScheme::Dilithium2 => {
                    use dilithium2 as $m;
                    $body
                }
                SignatureScheme::Dilithium3 => {
                    use dilithium3 as $m;
                    $body
                }
                SignatureScheme::Dilithium5 => {
                    use dilithium5 as $m;
                    $body
                }
                SignatureScheme::SphincsSha2_128f => {
                    use sphincssha2128fsimple as $m;
                    $body
                }
            }
        };
    }

    /// Generate a new keypair
    pub fn generate_keypair(scheme: SignatureScheme) -> SigningKeypair {
        dispatch_sign!(scheme, m => {
            let (pk, sk) = m::keypair();
            SigningKeypair {
                public_key: pk.as_bytes().to_vec(),
                secret_key: Zeroizing::new(sk.as_bytes().to_vec()),
            }
        })
    }

    /// Sign a message (detached signature)
    pub fn sign(scheme: SignatureScheme, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        dispatch_sign!(scheme, m => {
            let sk = m::SecretKey::from_bytes(secret_key).map_err(|e| bad_bytes("secret key", e))?;
            Ok(m::detached_sign(message, &sk).as_bytes().to_vec())
        })
    }

    /// Verify a detached signature
    pub fn verify(
        scheme: SignatureScheme,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> std::result::Result<(), VerifyError> {
        dispatch_sign!(scheme, m => {
            let pk = m::PublicKey::from_bytes(public_key)
                .map_err(|e| VerifyError::Malformed(format!("public key: {e:?}")))?;
            let sig = m::DetachedSignature::from_bytes(signature)
                .map_err(|e| VerifyError::Malformed(format!("signature: {e:?}")))?;
            m::verify_detached_signature(&sig, message, &pk).map_err(|_| VerifyError::Invalid)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::kem::{self, KemLevel};
    use super::sign::{self, SignatureScheme};

    #[test]
    fn test_kem_shared_secret_agrees() {
        let kp = kem::generate_keypair(KemLevel::Kyber768);
        let enc = kem::encapsulate(KemLevel::Kyber768, &kp.public_key).unwrap();
        let ss = kem::decapsulate(KemLevel::Kyber768, &kp.secret_key, &enc.ciphertext).unwrap();
        assert_eq!(ss.as_slice(), enc.shared_secret.as_slice());
    }

    #[test]
    fn test_kem_rejects_wrong_level_key() {
        let kp = kem::generate_keypair(KemLevel::Kyber512);
        assert!(kem::encapsulate(KemLevel::Kyber1024, &kp.public_key).is_err());
    }

    #[test]
    fn test_dilithium_sign_verify() {
        let scheme = SignatureScheme::dilithium(3).unwrap();
        let kp = sign::generate_keypair(scheme);
        let sig = sign::sign(scheme, &kp.secret_key, b"message").unwrap();
        assert!(sign::verify(scheme, &kp.public_key, b"message", &sig).is_ok());
        assert!(sign::verify(scheme, &kp.public_key, b"tampered", &sig).is_err());
    }

    #[test]
    fn test_sphincs_sign_verify() {
        let scheme = SignatureScheme::SphincsSha2_128f;
        let kp = sign::generate_keypair(scheme);
        let sig = sign::sign(scheme, &kp.secret_key, b"message").unwrap();
        assert!(sign::verify(scheme, &kp.public_key, b"message", &sig).is_ok());
    }

    #[test]
    fn test_unknown_levels() {
        assert!(SignatureScheme::dilithium(4).is_err());
        assert!(KemLevel::try_from(256).is_err());
    }
}
