//! RFC 5869 HKDF

use ring::hkdf;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfHash {
    Sha256,
    Sha384,
    Sha512,
}

impl KdfHash {
    fn algorithm(self) -> hkdf::Algorithm {
        match self {
            Self::Sha256 => hkdf::HKDF_SHA256,
            Self::Sha384 => hkdf::HKDF_SHA384,
            Self::Sha512 => hkdf::HKDF_SHA512,
        }
    }

    fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// RFC 5869 caps output at 255 hash blocks
    pub fn max_key_size(self) -> usize {
        255 * self.output_len()
    }
}

impl std::str::FromStr for KdfHash {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha2-256" | "sha256" => Ok(Self::Sha256),
            "sha2-384" | "sha384" => Ok(Self::Sha384),
            "sha2-512" | "sha512" => Ok(Self::Sha512),
            other => Err(CryptoError::Unsupported(format!("HKDF hash {other}"))),
        }
    }
}

struct OkmLen(usize);

impl hkdf::KeyType for OkmLen {
    fn len(&self) -> usize {
        self.0
    }
}

/// Extract-then-expand `key_size` bytes
pub fn derive_key(hash: KdfHash, salt: &[u8], ikm: &[u8], info: &[u8], key_size: usize) -> Result<Zeroizing<Vec<u8>>> {
    if key_size == 0 || key_size > hash.max_key_size() {
        return Err(CryptoError::Kdf(format!(
            "key size {key_size} outside 1..={}",
            hash.max_key_size()
        )));
    }

    let prk = hkdf::Salt::new(hash.algorithm(), salt).extract(ikm);
    let info = [info];
    let okm = prk
        .expand(&info, OkmLen(key_size))
        .map_err(|_| CryptoError::Kdf("expand failed".into()))?;

    let mut key = Zeroizing::new(vec![0u8; key_size]);
    okm.fill(key.as_mut_slice())
        .map_err(|_| CryptoError::Kdf("fill failed".into()))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap()).collect()
    }

    #[test]
    fn test_rfc5869_case_1() {
        let ikm = [0x0bu8; 22];
        let salt = unhex("000102030405060708090a0b0c");
        let info = unhex("f0f1f2f3f4f5f6f7f8f9");
        let okm = derive_key(KdfHash::Sha256, &salt, &ikm, &info, 42).unwrap();
        let expected = unhex(
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865",
        );
        assert_eq!(okm.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_key_size_limits() {
        assert!(derive_key(KdfHash::Sha256, b"", b"ikm", b"", 0).is_err());
        assert!(derive_key(KdfHash::Sha256, b"", b"ikm", b"", 255 * 32 + 1).is_err());
        assert_eq!(derive_key(KdfHash::Sha512, b"", b"ikm", b"", 255 * 64).unwrap().len(), 255 * 64);
    }

    #[test]
    fn test_hash_names() {
        assert_eq!("sha2-384".parse::<KdfHash>().unwrap(), KdfHash::Sha384);
        assert!("md5".parse::<KdfHash>().is_err());
    }
}
