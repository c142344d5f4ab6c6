//! OTS leaf index allocation
//!
//! Decides which leaf the next signature uses and whether a detachment
//! request fits. Neither function mutates anything; advancing happens in
//! the state machine, after the new state has been persisted.

use crate::error::{Result, StateError};
use crate::state::SigningState;

/// The next unused leaf, without advancing
pub fn reserve_next(state: &SigningState) -> Result<u64> {
    if state.is_exhausted() {
        return Err(StateError::StateExhausted { max_leaf_index: state.max_leaf_index() });
    }
    Ok(state.next_leaf_index())
}

/// Check that `n` leaves can be carved out of `state`
pub fn validate_detach(state: &SigningState, n: u64) -> Result<()> {
    if state.is_exhausted() {
        return Err(StateError::StateExhausted { max_leaf_index: state.max_leaf_index() });
    }
    if n == 0 {
        return Err(StateError::InvalidRequest("cannot detach zero signatures".into()));
    }
    if n > state.remaining() {
        return Err(StateError::InvalidRequest(format!(
            "cannot detach {n} signatures, only {} remain",
            state.remaining()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_key;

    #[test]
    fn test_reserve_does_not_advance() {
        let public = test_key().public_key();
        let state = SigningState::for_range(&public, 3, 6).unwrap();
        assert_eq!(reserve_next(&state).unwrap(), 3);
        assert_eq!(reserve_next(&state).unwrap(), 3);
        assert_eq!(state.next_leaf_index(), 3);
    }

    #[test]
    fn test_reserve_exhausted() {
        let public = test_key().public_key();
        let state = SigningState::for_range(&public, 6, 6).unwrap();
        assert!(matches!(
            reserve_next(&state),
            Err(StateError::StateExhausted { max_leaf_index: 6 })
        ));
    }

    #[test]
    fn test_validate_detach_bounds() {
        let public = test_key().public_key();
        let state = SigningState::for_range(&public, 2, 10).unwrap();
        assert!(validate_detach(&state, 1).is_ok());
        assert!(validate_detach(&state, 8).is_ok());
        assert!(matches!(validate_detach(&state, 0), Err(StateError::InvalidRequest(_))));
        assert!(matches!(validate_detach(&state, 9), Err(StateError::InvalidRequest(_))));

        let empty = SigningState::for_range(&public, 10, 10).unwrap();
        assert!(matches!(validate_detach(&empty, 1), Err(StateError::StateExhausted { .. })));
    }
}
