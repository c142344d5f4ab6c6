//! Key generation
//!
//! The only place a full-range signing state is created: together with a
//! brand-new key, persisted before the key is handed back.

use hbsig_crypto::{hex, CryptoContext, ParamSet, PrivateKey, TreeStrategy};
use tracing::info;

use crate::error::Result;
use crate::serializer;
use crate::state::SigningState;
use crate::store::StateStore;

/// Generate a key and persist its initial state under `state_id`
pub fn generate_key<S: StateStore + ?Sized>(
    ctx: &CryptoContext,
    params: ParamSet,
    strategy: TreeStrategy,
    store: &S,
    state_id: &str,
) -> Result<(PrivateKey, SigningState)> {
    let key = PrivateKey::generate(ctx, params, strategy)?;
    let state = SigningState::new(&key.public_key());

    store.write(state_id, &serializer::export(&state))?;
    info!(
        fingerprint = %hex(&key.fingerprint()),
        %params,
        signatures = state.remaining(),
        "key generated, initial state persisted"
    );
    Ok((key, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;
    use crate::signer::Signer;
    use crate::store::MemoryStore;
    use hbsig_crypto::{message_digest, HssHeight, Winternitz};

    fn params() -> ParamSet {
        ParamSet::Hss { winternitz: Winternitz::W4, height: HssHeight::H5 }
    }

    #[test]
    fn test_initial_state_is_persisted() {
        let store = MemoryStore::new();
        let (key, state) = generate_key(&CryptoContext::new(), params(), TreeStrategy::Bds, &store, "priv.state").unwrap();
        assert_eq!(state.next_leaf_index(), 0);
        assert_eq!(state.remaining(), 32);

        let mut signer = Signer::new(&key, &store, "priv.state");
        assert_eq!(signer.load_state().unwrap(), state);
        let (sig, _) = signer.sign(&state, &message_digest(b"first")).unwrap();
        assert_eq!(sig.leaf_index(), 0);
    }

    #[test]
    fn test_storage_failure_surfaces() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let err = generate_key(&CryptoContext::new(), params(), TreeStrategy::Bds, &store, "priv.state").unwrap_err();
        assert!(matches!(err, StateError::StorageFailure(_)));
    }
}
