//! State serialization
//!
//! Layout v1, big-endian, 56 bytes:
//!
//! ```text
//! "HBST" | version | params (3) | key fingerprint (16) |
//! next_leaf_index (8) | max_leaf_index (8) | checksum (16)
//! ```
//!
//! The checksum is the first 16 bytes of SHA-256 over everything before it.
//! Any deviation on import is `CorruptState`; there is no repair path.

use hbsig_crypto::hash::sha256;
use hbsig_crypto::params::PARAM_CODE_SIZE;
use hbsig_crypto::{Fingerprint, ParamSet, FINGERPRINT_SIZE};

use crate::error::{Result, StateError};
use crate::state::SigningState;

const MAGIC: &[u8; 4] = b"HBST";
const VERSION: u8 = 1;
const CHECKSUM_SIZE: usize = 16;
const BODY_SIZE: usize = 4 + 1 + PARAM_CODE_SIZE + FINGERPRINT_SIZE + 8 + 8;

pub const STATE_SIZE: usize = BODY_SIZE + CHECKSUM_SIZE;

/// Serialized size of a state for `params`. Constant in format v1.
pub fn state_size(_params: &ParamSet) -> usize {
    STATE_SIZE
}

pub fn export(state: &SigningState) -> Vec<u8> {
    let mut out = Vec::with_capacity(STATE_SIZE);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&state.params().to_code());
    out.extend_from_slice(state.key_fingerprint());
    out.extend_from_slice(&state.next_leaf_index().to_be_bytes());
    out.extend_from_slice(&state.max_leaf_index().to_be_bytes());
    let checksum = sha256(&out);
    out.extend_from_slice(&checksum[..CHECKSUM_SIZE]);
    out
}

/// Decode a state that must belong to `params`
pub fn import(params: &ParamSet, bytes: &[u8]) -> Result<SigningState> {
    let state = decode(bytes)?;
    if &state.params() != params {
        return Err(StateError::CorruptState(format!(
            "state is for {}, expected {params}",
            state.params()
        )));
    }
    Ok(state)
}

/// Decode a state without knowing its parameter set up front
pub fn decode(bytes: &[u8]) -> Result<SigningState> {
    if bytes.len() != STATE_SIZE {
        return Err(corrupt(format!("expected {STATE_SIZE} bytes, got {}", bytes.len())));
    }

    let (body, checksum) = bytes.split_at(BODY_SIZE);
    if &sha256(body)[..CHECKSUM_SIZE] != checksum {
        return Err(corrupt("checksum mismatch"));
    }
    if &body[..4] != MAGIC {
        return Err(corrupt("bad magic"));
    }
    if body[4] != VERSION {
        return Err(corrupt(format!("unsupported version {}", body[4])));
    }

    let mut code = [0u8; PARAM_CODE_SIZE];
    code.copy_from_slice(&body[5..5 + PARAM_CODE_SIZE]);
    let params = ParamSet::from_code(code).ok_or_else(|| corrupt(format!("unknown parameter set {code:02x?}")))?;

    let mut offset = 5 + PARAM_CODE_SIZE;
    let mut fingerprint: Fingerprint = [0u8; FINGERPRINT_SIZE];
    fingerprint.copy_from_slice(&body[offset..offset + FINGERPRINT_SIZE]);
    offset += FINGERPRINT_SIZE;

    let next = read_u64(&body[offset..offset + 8]);
    let max = read_u64(&body[offset + 8..offset + 16]);

    if next > max {
        return Err(corrupt(format!("next leaf {next} beyond end {max}")));
    }
    if max > params.max_leaf_index() {
        return Err(corrupt(format!(
            "end {max} beyond capacity {} of {params}",
            params.max_leaf_index()
        )));
    }

    Ok(SigningState::from_parts(params, fingerprint, next, max))
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_be_bytes(buf)
}

fn corrupt(msg: impl Into<String>) -> StateError {
    StateError::CorruptState(msg.into())
}
