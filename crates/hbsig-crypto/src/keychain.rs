//! Hardware keychain integration
//!
//! Holds the wrapping keys of sealed private keys, one entry per key
//! fingerprint.

use secrecy::SecretVec;
use thiserror::Error;

use crate::keys::{hex, Fingerprint};

#[derive(Error, Debug)]
pub enum KeychainError {
    #[error("Keychain not available")]
    NotAvailable,
    #[error("Item not found")]
    NotFound,
    #[error("Platform error: {0}")]
    Platform(String),
}

pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    pub fn new(service_name: &str) -> Self {
        Self { service_name: service_name.to_string() }
    }

    fn entry(&self, fingerprint: &Fingerprint) -> Result<keyring::Entry, KeychainError> {
        keyring::Entry::new(&self.service_name, &hex(fingerprint)).map_err(|e| match e {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => KeychainError::NotAvailable,
            _ => KeychainError::Platform(e.to_string()),
        })
    }

    pub fn store_wrapping_key(&self, fingerprint: &Fingerprint, key: &[u8]) -> Result<(), KeychainError> {
        let entry = self.entry(fingerprint)?;
        let encoded = hex(key);
        entry.set_password(&encoded).map_err(|e| KeychainError::Platform(e.to_string()))
    }

    pub fn retrieve_wrapping_key(&self, fingerprint: &Fingerprint) -> Result<SecretVec<u8>, KeychainError> {
        let entry = self.entry(fingerprint)?;
        let encoded = entry.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => KeychainError::NotFound,
            _ => KeychainError::Platform(e.to_string()),
        })?;
        let bytes = (0..encoded.len())
            .step_by(2)
            .map(|i| {
                encoded
                    .get(i..i + 2)
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| KeychainError::Platform("malformed keychain entry".into()))
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Ok(SecretVec::new(bytes))
    }
}
