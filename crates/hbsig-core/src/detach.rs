//! State detachment
//!
//! Carves `n` unused leaves off the front of a state into an independent
//! state, e.g. for a second signing device. The parent jumps past the
//! detached range and is persisted before the detached state is handed
//! out, so the two ranges can never overlap.

use hbsig_crypto::PrivateKey;
use tracing::info;

use crate::allocator;
use crate::error::{Result, StateError};
use crate::serializer;
use crate::signer::{check_binding, check_current};
use crate::state::SigningState;
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detachment {
    pub detached: SigningState,
    pub parent: SigningState,
}

impl Detachment {
    /// Serialized detached state, produced from the detached state itself
    pub fn export_detached(&self) -> Vec<u8> {
        serializer::export(&self.detached)
    }

    /// Write the detached state to its own slot. Refuses the slot that
    /// holds the parent.
    pub fn persist_detached<S: StateStore + ?Sized>(&self, store: &S, id: &str) -> Result<()> {
        if let Ok(bytes) = store.read(id) {
            if serializer::decode(&bytes).map(|s| s == self.parent).unwrap_or(false) {
                return Err(StateError::InvalidRequest(format!("{id} holds the parent state")));
            }
        }
        store.write(id, &self.export_detached())?;
        Ok(())
    }
}

/// Split `n` leaves off `state` and persist the shrunken parent under
/// `parent_id`. `state` must be what is persisted there. On error nothing
/// was written.
pub fn detach<S: StateStore + ?Sized>(
    key: &PrivateKey,
    state: &SigningState,
    n: u64,
    store: &S,
    parent_id: &str,
) -> Result<Detachment> {
    allocator::validate_detach(state, n)?;
    check_binding(key, state)?;
    check_current(store, parent_id, key, state)?;

    let split = state.next_leaf_index() + n;
    let (detached, parent) = state.split_at(split);

    store.write(parent_id, &serializer::export(&parent))?;
    info!(
        start = detached.next_leaf_index(),
        end = detached.max_leaf_index(),
        parent_remaining = parent.remaining(),
        "leaves detached"
    );

    Ok(Detachment { detached, parent })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::Signer;
    use crate::store::MemoryStore;
    use crate::test_support::test_key;
    use hbsig_crypto::message_digest;

    fn persist(store: &MemoryStore, id: &str, state: &SigningState) {
        store.write(id, &serializer::export(state)).unwrap();
    }

    #[test]
    fn test_detach_splits_range() {
        let key = test_key();
        let store = MemoryStore::new();
        let state = SigningState::for_range(&key.public_key(), 2, 10).unwrap();
        persist(&store, "priv.state", &state);

        let split = detach(&key, &state, 3, &store, "priv.state").unwrap();
        assert_eq!(split.detached.next_leaf_index(), 2);
        assert_eq!(split.detached.max_leaf_index(), 5);
        assert_eq!(split.parent.next_leaf_index(), 5);
        assert_eq!(split.parent.remaining(), 5);

        let persisted = serializer::import(&key.params(), &store.read("priv.state").unwrap()).unwrap();
        assert_eq!(persisted, split.parent);
    }

    #[test]
    fn test_detached_export_is_its_own() {
        let key = test_key();
        let store = MemoryStore::new();
        let state = SigningState::new(&key.public_key());
        persist(&store, "priv.state", &state);

        let split = detach(&key, &state, 4, &store, "priv.state").unwrap();
        let bytes = split.export_detached();
        assert_eq!(serializer::import(&key.params(), &bytes).unwrap(), split.detached);
        assert_ne!(bytes, store.read("priv.state").unwrap());
    }

    #[test]
    fn test_invalid_counts_leave_state_alone() {
        let key = test_key();
        let store = MemoryStore::new();
        let state = SigningState::for_range(&key.public_key(), 2, 10).unwrap();

        assert!(matches!(detach(&key, &state, 0, &store, "p"), Err(StateError::InvalidRequest(_))));
        assert!(matches!(detach(&key, &state, 9, &store, "p"), Err(StateError::InvalidRequest(_))));
        assert!(!store.contains("p"));
        assert_eq!(state.next_leaf_index(), 2);
        assert_eq!(state.max_leaf_index(), 10);
    }

    #[test]
    fn test_detach_exhausted() {
        let key = test_key();
        let store = MemoryStore::new();
        let state = SigningState::for_range(&key.public_key(), 4, 4).unwrap();
        assert!(matches!(detach(&key, &state, 1, &store, "p"), Err(StateError::StateExhausted { .. })));
    }

    #[test]
    fn test_storage_failure_detaches_nothing() {
        let key = test_key();
        let store = MemoryStore::new();
        let state = SigningState::new(&key.public_key());
        persist(&store, "p", &state);
        store.set_fail_writes(true);
        let err = detach(&key, &state, 2, &store, "p").unwrap_err();
        assert!(matches!(err, StateError::StorageFailure(_)));
        assert_eq!(serializer::import(&key.params(), &store.read("p").unwrap()).unwrap(), state);
    }

    #[test]
    fn test_detached_and_parent_indices_disjoint() {
        let key = test_key();
        let store = MemoryStore::new();
        let digest = message_digest(b"disjoint");
        let state = SigningState::for_range(&key.public_key(), 0, 8).unwrap();
        persist(&store, "parent", &state);

        let split = detach(&key, &state, 3, &store, "parent").unwrap();
        split.persist_detached(&store, "child").unwrap();

        let mut used = Vec::new();
        for id in ["parent", "child"] {
            let mut signer = Signer::new(&key, &store, id);
            loop {
                match signer.sign_next(&digest) {
                    Ok((sig, _)) => used.push(sig.leaf_index()),
                    Err(StateError::StateExhausted { .. }) => break,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }

        used.sort_unstable();
        assert_eq!(used, (0..8).collect::<Vec<u64>>());
    }

    #[test]
    fn test_stale_state_cannot_detach_again() {
        let key = test_key();
        let store = MemoryStore::new();
        let stale = SigningState::for_range(&key.public_key(), 0, 8).unwrap();
        persist(&store, "parent", &stale);

        let first = detach(&key, &stale, 2, &store, "parent").unwrap();
        let err = detach(&key, &stale, 2, &store, "parent").unwrap_err();
        assert!(matches!(err, StateError::InvalidRequest(_)));

        let persisted = serializer::import(&key.params(), &store.read("parent").unwrap()).unwrap();
        assert_eq!(persisted, first.parent);
    }

    #[test]
    fn test_detached_state_cannot_replace_parent() {
        let key = test_key();
        let store = MemoryStore::new();
        let state = SigningState::new(&key.public_key());
        persist(&store, "priv.state", &state);

        let split = detach(&key, &state, 4, &store, "priv.state").unwrap();
        let err = split.persist_detached(&store, "priv.state").unwrap_err();
        assert!(matches!(err, StateError::InvalidRequest(_)));
        let persisted = serializer::import(&key.params(), &store.read("priv.state").unwrap()).unwrap();
        assert_eq!(persisted, split.parent);
    }
}
