//! Signing key state machine
//!
//! A signature is only handed back once the advanced state has been
//! durably written. If the process dies after the write, the leaf is lost,
//! never reused.

use hbsig_crypto::{OtsSigner, PrivateKey, Signature, MESSAGE_DIGEST_SIZE};
use tracing::{debug, info, warn};

use crate::allocator;
use crate::error::{Result, StateError, StorageError};
use crate::serializer;
use crate::state::SigningState;
use crate::store::StateStore;

/// Binds a private key to the store slot that holds its signing state
pub struct Signer<'a, S: StateStore + ?Sized> {
    ots: OtsSigner<'a>,
    store: &'a S,
    state_id: String,
}

impl<'a, S: StateStore + ?Sized> Signer<'a, S> {
    pub fn new(key: &'a PrivateKey, store: &'a S, state_id: impl Into<String>) -> Self {
        Self {
            ots: OtsSigner::new(key),
            store,
            state_id: state_id.into(),
        }
    }

    pub fn key(&self) -> &PrivateKey {
        self.ots.key()
    }

    pub fn state_id(&self) -> &str {
        &self.state_id
    }

    /// Read and validate the persisted state for this key
    pub fn load_state(&self) -> Result<SigningState> {
        let bytes = self.store.read(&self.state_id)?;
        let state = serializer::import(&self.key().params(), &bytes)?;
        check_binding(self.key(), &state)?;
        Ok(state)
    }

    /// Sign `digest` with the next leaf of `state`.
    ///
    /// `state` must be exactly what is persisted under this signer's slot;
    /// a stale or hand-built state is `InvalidRequest`. On any error the
    /// persisted state is untouched and no signature exists.
    pub fn sign(&mut self, state: &SigningState, digest: &[u8]) -> Result<(Signature, SigningState)> {
        let leaf_index = self.check_signable(state, digest)?;
        check_current(self.store, &self.state_id, self.key(), state)?;
        self.sign_leaf(state, leaf_index, digest)
    }

    /// Load, sign, persist in one go
    pub fn sign_next(&mut self, digest: &[u8]) -> Result<(Signature, SigningState)> {
        let state = self.load_state()?;
        let leaf_index = self.check_signable(&state, digest)?;
        self.sign_leaf(&state, leaf_index, digest)
    }

    fn check_signable(&self, state: &SigningState, digest: &[u8]) -> Result<u64> {
        if state.is_exhausted() {
            warn!(max_leaf_index = state.max_leaf_index(), "refusing to sign with exhausted state");
        }
        let leaf_index = allocator::reserve_next(state)?;
        check_binding(self.key(), state)?;
        if digest.len() != MESSAGE_DIGEST_SIZE {
            return Err(StateError::InvalidDigestLength {
                expected: MESSAGE_DIGEST_SIZE,
                actual: digest.len(),
            });
        }
        Ok(leaf_index)
    }

    /// Sign, persist the advanced state, then release. `state` is current.
    fn sign_leaf(&mut self, state: &SigningState, leaf_index: u64, digest: &[u8]) -> Result<(Signature, SigningState)> {
        let signature = self.ots.sign_leaf(leaf_index, digest)?;
        let next = state.advanced();

        self.store.write(&self.state_id, &serializer::export(&next))?;
        debug!(state_id = %self.state_id, next_leaf_index = next.next_leaf_index(), "state persisted");

        info!(leaf_index, remaining = next.remaining(), "one-time signature released");
        if next.is_exhausted() {
            warn!(state_id = %self.state_id, "state exhausted, the key cannot sign any more messages");
        }
        Ok((signature, next))
    }
}

/// One-shot form of [`Signer::sign`]
pub fn sign<S: StateStore + ?Sized>(
    key: &PrivateKey,
    state: &SigningState,
    digest: &[u8],
    store: &S,
    state_id: &str,
) -> Result<(Signature, SigningState)> {
    Signer::new(key, store, state_id).sign(state, digest)
}

pub(crate) fn check_binding(key: &PrivateKey, state: &SigningState) -> Result<()> {
    if state.params() != key.params() {
        return Err(StateError::InvalidRequest(format!(
            "state is for {}, key is {}",
            state.params(),
            key.params()
        )));
    }
    if !state.is_bound_to(&key.fingerprint()) {
        return Err(StateError::InvalidRequest("state belongs to a different key".into()));
    }
    Ok(())
}

/// `state` must match what is persisted under `id`, or it is stale and
/// acting on it could reuse a leaf or move the slot backwards.
pub(crate) fn check_current<S: StateStore + ?Sized>(
    store: &S,
    id: &str,
    key: &PrivateKey,
    state: &SigningState,
) -> Result<()> {
    let bytes = store.read(id).map_err(|e| match e {
        StorageError::NotFound(what) => StateError::InvalidRequest(format!("no persisted state at {what}")),
        other => StateError::StorageFailure(other),
    })?;
    let persisted = serializer::import(&key.params(), &bytes)?;
    if &persisted != state {
        return Err(StateError::InvalidRequest(format!(
            "state is not current: persisted range [{}, {}), given [{}, {})",
            persisted.next_leaf_index(),
            persisted.max_leaf_index(),
            state.next_leaf_index(),
            state.max_leaf_index()
        )));
    }
    Ok(())
}
