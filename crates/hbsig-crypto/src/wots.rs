//! Winternitz one-time signatures
//!
//! One key pair per tree leaf. The message is split into base-2^w digits
//! plus a checksum; each digit selects how far along its hash chain the
//! signature reveals. Signing is deterministic given the seed and address.
//!
//! Reusing a leaf for two different messages reveals enough chain values
//! to forge, which is why the state machine in `hbsig-core` exists.

use crate::hash::{hash_parts, Node, D_CHAIN, D_OTS_PUB, D_SECRET, N};

/// Position of a one-time key inside the hypertree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OtsAddress {
    pub layer: u32,
    pub tree: u64,
    pub leaf: u32,
}

impl OtsAddress {
    pub(crate) fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..4].copy_from_slice(&self.layer.to_be_bytes());
        out[4..12].copy_from_slice(&self.tree.to_be_bytes());
        out[12..].copy_from_slice(&self.leaf.to_be_bytes());
        out
    }
}

/// Chain layout derived from the Winternitz width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WotsParams {
    w: u32,
    len1: usize,
    len2: usize,
}

impl WotsParams {
    /// `w` must divide 8 (1, 2, 4 or 8)
    pub fn new(w: u32) -> Self {
        let len1 = (8 * N) / w as usize;
        let max_sum = len1 as u32 * ((1u32 << w) - 1);
        let checksum_bits = 32 - max_sum.leading_zeros();
        let len2 = checksum_bits.div_ceil(w) as usize;
        Self { w, len1, len2 }
    }

    /// Number of hash chains
    pub fn len(&self) -> usize {
        self.len1 + self.len2
    }

    pub fn max_digit(&self) -> u32 {
        (1u32 << self.w) - 1
    }

    pub fn signature_size(&self) -> usize {
        self.len() * N
    }

    /// Message digits followed by checksum digits
    fn digits(&self, msg: &Node) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.len());
        out.extend((0..self.len1).map(|i| coef(msg, i, self.w)));

        let checksum: u32 = out.iter().map(|d| self.max_digit() - d).sum();
        let shift = 16 - (self.len2 as u32 * self.w);
        let encoded = ((checksum << shift) as u16).to_be_bytes();
        out.extend((0..self.len2).map(|i| coef(&encoded, i, self.w)));
        out
    }
}

/// i-th base-2^w digit of `bytes`, most significant bits first
fn coef(bytes: &[u8], i: usize, w: u32) -> u32 {
    let per_byte = (8 / w) as usize;
    let byte = bytes[(i * w as usize) / 8] as u32;
    let shift = 8 - w * (i % per_byte) as u32 - w;
    (byte >> shift) & ((1u32 << w) - 1)
}

fn secret(seed: &[u8; 32], key_id: &[u8; 16], addr: &[u8; 16], chain: usize) -> Node {
    hash_parts(&[&[D_SECRET], seed, key_id, addr, &(chain as u16).to_be_bytes()])
}

fn chain(key_id: &[u8; 16], addr: &[u8; 16], index: usize, mut x: Node, start: u32, steps: u32) -> Node {
    let index = (index as u16).to_be_bytes();
    for step in start..start + steps {
        x = hash_parts(&[&[D_CHAIN], key_id, addr, &index, &[step as u8], &x]);
    }
    x
}

fn compress(key_id: &[u8; 16], addr: &[u8; 16], ends: &[Node]) -> Node {
    let mut parts: Vec<&[u8]> = Vec::with_capacity(ends.len() + 3);
    parts.push(&[D_OTS_PUB]);
    parts.push(key_id);
    parts.push(addr);
    parts.extend(ends.iter().map(|e| e.as_slice()));
    hash_parts(&parts)
}

/// Compressed one-time public key for `address`
pub fn public_key(params: &WotsParams, seed: &[u8; 32], key_id: &[u8; 16], address: OtsAddress) -> Node {
    let addr = address.to_bytes();
    let ends: Vec<Node> = (0..params.len())
        .map(|i| chain(key_id, &addr, i, secret(seed, key_id, &addr, i), 0, params.max_digit()))
        .collect();
    compress(key_id, &addr, &ends)
}

/// Sign a 32-byte message node with the one-time key at `address`
pub fn sign(params: &WotsParams, seed: &[u8; 32], key_id: &[u8; 16], address: OtsAddress, msg: &Node) -> Vec<Node> {
    let addr = address.to_bytes();
    params
        .digits(msg)
        .into_iter()
        .enumerate()
        .map(|(i, d)| chain(key_id, &addr, i, secret(seed, key_id, &addr, i), 0, d))
        .collect()
}

/// Recompute the compressed public key implied by a signature
pub fn public_key_from_signature(
    params: &WotsParams,
    key_id: &[u8; 16],
    address: OtsAddress,
    msg: &Node,
    signature: &[Node],
) -> Option<Node> {
    if signature.len() != params.len() {
        return None;
    }
    let addr = address.to_bytes();
    let ends: Vec<Node> = params
        .digits(msg)
        .into_iter()
        .zip(signature)
        .enumerate()
        .map(|(i, (d, s))| chain(key_id, &addr, i, *s, d, params.max_digit() - d))
        .collect();
    Some(compress(key_id, &addr, &ends))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;

    const SEED: [u8; 32] = [7u8; 32];
    const KEY_ID: [u8; 16] = [9u8; 16];
    const ADDR: OtsAddress = OtsAddress { layer: 0, tree: 0, leaf: 3 };

    #[test]
    fn test_chain_counts() {
        assert_eq!(WotsParams::new(1).len(), 265);
        assert_eq!(WotsParams::new(2).len(), 133);
        assert_eq!(WotsParams::new(4).len(), 67);
        assert_eq!(WotsParams::new(8).len(), 34);
    }

    #[test]
    fn test_sign_recovers_public_key() {
        for w in [1, 2, 4, 8] {
            let params = WotsParams::new(w);
            let msg = sha256(b"leaf message");
            let pk = public_key(&params, &SEED, &KEY_ID, ADDR);
            let sig = sign(&params, &SEED, &KEY_ID, ADDR, &msg);
            assert_eq!(public_key_from_signature(&params, &KEY_ID, ADDR, &msg, &sig), Some(pk));
        }
    }

    #[test]
    fn test_wrong_message_yields_other_key() {
        let params = WotsParams::new(4);
        let pk = public_key(&params, &SEED, &KEY_ID, ADDR);
        let sig = sign(&params, &SEED, &KEY_ID, ADDR, &sha256(b"one"));
        let recovered = public_key_from_signature(&params, &KEY_ID, ADDR, &sha256(b"two"), &sig);
        assert_ne!(recovered, Some(pk));
    }

    #[test]
    fn test_address_separates_keys() {
        let params = WotsParams::new(4);
        let other = OtsAddress { leaf: 4, ..ADDR };
        assert_ne!(
            public_key(&params, &SEED, &KEY_ID, ADDR),
            public_key(&params, &SEED, &KEY_ID, other)
        );
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let params = WotsParams::new(4);
        let msg = sha256(b"m");
        let mut sig = sign(&params, &SEED, &KEY_ID, ADDR, &msg);
        sig.pop();
        assert_eq!(public_key_from_signature(&params, &KEY_ID, ADDR, &msg, &sig), None);
    }
}
