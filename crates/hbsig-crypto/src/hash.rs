//! Hashing primitives
//!
//! SHA-512 produces the 64-byte message digest that callers sign.
//! SHA-256 is the internal tree and chain hash (n = 32).

use ring::digest::{self, Context, SHA256, SHA512};

/// Internal hash output size in bytes
pub const N: usize = 32;
/// Required message digest size (SHA2-512)
pub const MESSAGE_DIGEST_SIZE: usize = 64;

/// A node in a Winternitz chain or Merkle tree
pub type Node = [u8; N];

// Domain separators
pub(crate) const D_SECRET: u8 = 0x01;
pub(crate) const D_CHAIN: u8 = 0x02;
pub(crate) const D_OTS_PUB: u8 = 0x03;
pub(crate) const D_MESSAGE: u8 = 0x04;
pub(crate) const D_LEAF: u8 = 0x05;
pub(crate) const D_NODE: u8 = 0x06;

/// Digest an arbitrary-length message for signing
pub fn message_digest(message: &[u8]) -> [u8; MESSAGE_DIGEST_SIZE] {
    let d = digest::digest(&SHA512, message);
    let mut out = [0u8; MESSAGE_DIGEST_SIZE];
    out.copy_from_slice(d.as_ref());
    out
}

/// Plain SHA-256
pub fn sha256(data: &[u8]) -> Node {
    hash_parts(&[data])
}

/// SHA-256 over the concatenation of `parts`
pub(crate) fn hash_parts(parts: &[&[u8]]) -> Node {
    let mut ctx = Context::new(&SHA256);
    for part in parts {
        ctx.update(part);
    }
    let mut out = [0u8; N];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}
