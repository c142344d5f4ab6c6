//! Signing state
//!
//! Tracks which one-time leaves of a key are still unused. A state owns
//! the half-open range `[next_leaf_index, max_leaf_index)`; a freshly
//! generated key owns every leaf, a detached state owns a slice.
//!
//! Outside this crate a state only comes from key generation, from the
//! store, or from a transition; there is no way to mint one for an
//! arbitrary range.

use hbsig_crypto::{Fingerprint, ParamSet, PublicKey};

#[cfg(test)]
use crate::error::{Result, StateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Active { remaining: u64 },
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningState {
    params: ParamSet,
    key_fingerprint: Fingerprint,
    next_leaf_index: u64,
    max_leaf_index: u64,
}

impl SigningState {
    /// Initial state for a newly generated key: every leaf unused. Only key
    /// generation creates one.
    pub(crate) fn new(public: &PublicKey) -> Self {
        let params = public.params();
        Self {
            params,
            key_fingerprint: public.fingerprint(),
            next_leaf_index: 0,
            max_leaf_index: params.max_leaf_index(),
        }
    }

    /// State owning `[start, end)` of the key's leaves
    #[cfg(test)]
    pub(crate) fn for_range(public: &PublicKey, start: u64, end: u64) -> Result<Self> {
        let params = public.params();
        if start > end || end > params.max_leaf_index() {
            return Err(StateError::InvalidRequest(format!(
                "range [{start}, {end}) outside [0, {})",
                params.max_leaf_index()
            )));
        }
        Ok(Self {
            params,
            key_fingerprint: public.fingerprint(),
            next_leaf_index: start,
            max_leaf_index: end,
        })
    }

    /// Rebuild a decoded state; bounds are checked by the serializer
    pub(crate) fn from_parts(params: ParamSet, key_fingerprint: Fingerprint, next: u64, max: u64) -> Self {
        Self {
            params,
            key_fingerprint,
            next_leaf_index: next,
            max_leaf_index: max,
        }
    }

    pub fn params(&self) -> ParamSet {
        self.params
    }

    pub fn key_fingerprint(&self) -> &Fingerprint {
        &self.key_fingerprint
    }

    pub fn next_leaf_index(&self) -> u64 {
        self.next_leaf_index
    }

    pub fn max_leaf_index(&self) -> u64 {
        self.max_leaf_index
    }

    pub fn remaining(&self) -> u64 {
        self.max_leaf_index - self.next_leaf_index
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn status(&self) -> KeyStatus {
        match self.remaining() {
            0 => KeyStatus::Exhausted,
            remaining => KeyStatus::Active { remaining },
        }
    }

    /// Whether this state belongs to the key with `fingerprint`
    pub fn is_bound_to(&self, fingerprint: &Fingerprint) -> bool {
        &self.key_fingerprint == fingerprint
    }

    /// One leaf further along. Only the state machine calls this.
    pub(crate) fn advanced(&self) -> Self {
        Self {
            next_leaf_index: self.next_leaf_index + 1,
            ..*self
        }
    }

    /// Split at `at`: (leaves before, leaves from `at` on)
    pub(crate) fn split_at(&self, at: u64) -> (Self, Self) {
        let head = Self { max_leaf_index: at, ..*self };
        let tail = Self { next_leaf_index: at, ..*self };
        (head, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_key;

    fn test_public() -> PublicKey {
        test_key().public_key()
    }

    #[test]
    fn test_fresh_state_owns_every_leaf() {
        let public = test_public();
        let state = SigningState::new(&public);
        assert_eq!(state.next_leaf_index(), 0);
        assert_eq!(state.remaining(), 32);
        assert_eq!(state.status(), KeyStatus::Active { remaining: 32 });
        assert!(state.is_bound_to(&public.fingerprint()));
    }

    #[test]
    fn test_range_bounds() {
        let public = test_public();
        assert!(SigningState::for_range(&public, 0, 4).is_ok());
        assert!(SigningState::for_range(&public, 5, 4).is_err());
        assert!(SigningState::for_range(&public, 0, 33).is_err());
        let empty = SigningState::for_range(&public, 4, 4).unwrap();
        assert_eq!(empty.status(), KeyStatus::Exhausted);
    }

    #[test]
    fn test_split_is_disjoint() {
        let public = test_public();
        let state = SigningState::for_range(&public, 2, 10).unwrap();
        let (head, tail) = state.split_at(5);
        assert_eq!((head.next_leaf_index(), head.max_leaf_index()), (2, 5));
        assert_eq!((tail.next_leaf_index(), tail.max_leaf_index()), (5, 10));
    }
}
