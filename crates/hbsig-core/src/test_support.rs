//! Shared fixtures for the in-crate tests

use hbsig_crypto::{CryptoContext, HssHeight, ParamSet, PrivateKey, TreeStrategy, Winternitz};

/// Smallest supported key: HSS w=4, height 5 (32 leaves)
pub(crate) fn test_key() -> PrivateKey {
    let params = ParamSet::Hss { winternitz: Winternitz::W4, height: HssHeight::H5 };
    PrivateKey::generate(&CryptoContext::new(), params, TreeStrategy::Full).unwrap()
}
