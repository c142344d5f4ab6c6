//! Explicit crypto context
//!
//! Constructed once and passed by reference to whatever needs entropy or
//! hashing. There is no global toolkit state.

use ring::rand::{SecureRandom, SystemRandom};

use crate::hash::{self, MESSAGE_DIGEST_SIZE};
use crate::{CryptoError, Result};

pub struct CryptoContext {
    rng: SystemRandom,
}

impl CryptoContext {
    pub fn new() -> Self {
        Self { rng: SystemRandom::new() }
    }

    /// Fill `buf` from the OS RNG
    pub fn fill(&self, buf: &mut [u8]) -> Result<()> {
        self.rng
            .fill(buf)
            .map_err(|_| CryptoError::KeyGeneration("system RNG unavailable".into()))
    }

    pub fn random<const L: usize>(&self) -> Result<[u8; L]> {
        let mut out = [0u8; L];
        self.fill(&mut out)?;
        Ok(out)
    }

    /// SHA2-512 digest, the input every stateful `sign` expects
    pub fn digest(&self, message: &[u8]) -> [u8; MESSAGE_DIGEST_SIZE] {
        hash::message_digest(message)
    }
}

impl Default for CryptoContext {
    fn default() -> Self {
        Self::new()
    }
}
