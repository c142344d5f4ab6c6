//! Hypertree signing and verification
//!
//! ```text
//!   layer d-1        [ root = public key ]
//!                      /    ...     \
//!   layer 1      [tree]  ...  [tree]      each leaf signs a child root
//!                 /  \
//!   layer 0   [tree] ...                  leaves sign the message
//! ```
//!
//! A global leaf index picks one leaf per layer. XMSS and HSS are the
//! single-layer case.
//!
//! Producing a signature here does NOT advance anything. Callers that
//! hold signing state must persist it before releasing the signature.

use std::collections::HashMap;

use tracing::debug;

use crate::hash::{hash_parts, Node, D_MESSAGE, MESSAGE_DIGEST_SIZE, N};
use crate::keys::{leaf_fn, PrivateKey, PublicKey, FORMAT_VERSION, KEY_ID_SIZE};
use crate::merkle::{treehash, LayerTree, TreeContext};
use crate::params::{ParamSet, PARAM_CODE_SIZE};
use crate::wots::{self, WotsParams};
use crate::{CryptoError, Result, VerifyError};

/// Per-layer piece of a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSignature {
    pub ots: Vec<Node>,
    pub auth_path: Vec<Node>,
}

/// A hypertree signature bound to exactly one leaf index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: ParamSet,
    leaf_index: u64,
    layers: Vec<LayerSignature>,
}

/// version | params | leaf index | per layer: ots chains + auth path
pub fn signature_size(params: &ParamSet) -> usize {
    let wots = WotsParams::new(params.winternitz_bits());
    let per_layer = wots.signature_size() + params.layer_height() as usize * N;
    1 + PARAM_CODE_SIZE + 8 + params.layers() as usize * per_layer
}

impl Signature {
    pub fn params(&self) -> ParamSet {
        self.params
    }

    /// The one-time leaf this signature consumed
    pub fn leaf_index(&self) -> u64 {
        self.leaf_index
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(signature_size(&self.params));
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&self.params.to_code());
        out.extend_from_slice(&self.leaf_index.to_be_bytes());
        for layer in &self.layers {
            layer.ots.iter().for_each(|n| out.extend_from_slice(n));
            layer.auth_path.iter().for_each(|n| out.extend_from_slice(n));
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, VerifyError> {
        if bytes.len() < 1 + PARAM_CODE_SIZE + 8 {
            return Err(VerifyError::Malformed("signature too short".into()));
        }
        if bytes[0] != FORMAT_VERSION {
            return Err(VerifyError::Malformed(format!("unsupported signature version {}", bytes[0])));
        }
        let params = ParamSet::decode_prefix(&bytes[1..])
            .ok_or_else(|| VerifyError::Malformed("unknown parameter set".into()))?;
        if bytes.len() != signature_size(&params) {
            return Err(VerifyError::Malformed(format!(
                "signature is {} bytes, expected {}",
                bytes.len(),
                signature_size(&params)
            )));
        }

        let mut offset = 1 + PARAM_CODE_SIZE;
        let mut leaf = [0u8; 8];
        leaf.copy_from_slice(&bytes[offset..offset + 8]);
        let leaf_index = u64::from_be_bytes(leaf);
        offset += 8;

        let wots = WotsParams::new(params.winternitz_bits());
        let mut read_nodes = |count: usize| -> Vec<Node> {
            let nodes = bytes[offset..offset + count * N]
                .chunks_exact(N)
                .map(|c| {
                    let mut n = [0u8; N];
                    n.copy_from_slice(c);
                    n
                })
                .collect();
            offset += count * N;
            nodes
        };

        let layers = (0..params.layers())
            .map(|_| LayerSignature {
                ots: read_nodes(wots.len()),
                auth_path: read_nodes(params.layer_height() as usize),
            })
            .collect();

        Ok(Self { params, leaf_index, layers })
    }
}

/// Where a global leaf index lands in layer `layer`: (tree, leaf)
fn locate(params: &ParamSet, leaf_index: u64, layer: u32) -> (u64, u32) {
    let h = params.layer_height();
    let tree = leaf_index >> (h * (layer + 1));
    let leaf = ((leaf_index >> (h * layer)) & ((1u64 << h) - 1)) as u32;
    (tree, leaf)
}

fn message_node(key_id: &[u8; KEY_ID_SIZE], leaf_index: u64, digest: &[u8]) -> Node {
    hash_parts(&[&[D_MESSAGE], key_id, &leaf_index.to_be_bytes(), digest])
}

/// Signs individual leaves, caching layer trees if the key's strategy asks
/// for it.
///
/// This is the raw primitive: it keeps no record of used leaves, and
/// signing the same leaf index twice breaks the key. Only hbsig-core's
/// signing state machine drives it, and that machine persists the advanced
/// state before any signature is released.
pub struct OtsSigner<'a> {
    key: &'a PrivateKey,
    wots: WotsParams,
    cache: HashMap<(u32, u64), LayerTree>,
}

impl<'a> OtsSigner<'a> {
    pub fn new(key: &'a PrivateKey) -> Self {
        Self {
            key,
            wots: WotsParams::new(key.params().winternitz_bits()),
            cache: HashMap::new(),
        }
    }

    pub fn key(&self) -> &PrivateKey {
        self.key
    }

    /// Produce the signature for `leaf_index`. Deterministic; pure with
    /// respect to any signing state.
    pub fn sign_leaf(&mut self, leaf_index: u64, digest: &[u8]) -> Result<Signature> {
        let params = self.key.params();
        if digest.len() != MESSAGE_DIGEST_SIZE {
            return Err(CryptoError::InvalidDigestLength {
                expected: MESSAGE_DIGEST_SIZE,
                actual: digest.len(),
            });
        }
        if leaf_index >= params.max_leaf_index() {
            return Err(CryptoError::InvalidInput(format!(
                "leaf {leaf_index} outside {params} capacity"
            )));
        }

        let key_id = self.key.key_id();
        let mut msg = message_node(key_id, leaf_index, digest);
        let mut layers = Vec::with_capacity(params.layers() as usize);

        for layer in 0..params.layers() {
            let (tree, leaf) = locate(&params, leaf_index, layer);
            let (root, auth_path) = self.root_and_path(layer, tree, leaf);
            let ctx = TreeContext { key_id, layer, tree };
            let ots = wots::sign(&self.wots, self.key.seed(), key_id, ctx.ots_address(leaf), &msg);
            layers.push(LayerSignature { ots, auth_path });
            msg = root;
        }

        debug!(leaf_index, "leaf signature computed");
        Ok(Signature { params, leaf_index, layers })
    }

    fn root_and_path(&mut self, layer: u32, tree: u64, leaf: u32) -> (Node, Vec<Node>) {
        let key = self.key;
        let height = key.params().layer_height();
        let ctx = TreeContext { key_id: key.key_id(), layer, tree };
        let leaves = leaf_fn(&self.wots, key.seed(), &ctx);

        if !key.strategy().caches_trees() {
            return treehash(&ctx, height, leaf, leaves);
        }

        let layer_tree = self
            .cache
            .entry((layer, tree))
            .or_insert_with(|| LayerTree::build(&ctx, height, leaves));
        (layer_tree.root(), layer_tree.auth_path(leaf))
    }
}

/// Stateless verification of a hypertree signature over a message digest
pub fn verify(public: &PublicKey, digest: &[u8], signature: &[u8]) -> std::result::Result<(), VerifyError> {
    if digest.len() != MESSAGE_DIGEST_SIZE {
        return Err(VerifyError::Malformed(format!(
            "digest is {} bytes, expected {MESSAGE_DIGEST_SIZE}",
            digest.len()
        )));
    }
    let sig = Signature::from_bytes(signature)?;
    let params = public.params();
    if sig.params != params {
        return Err(VerifyError::ParamMismatch {
            signature: sig.params.to_string(),
            key: params.to_string(),
        });
    }
    if sig.leaf_index >= params.max_leaf_index() {
        return Err(VerifyError::Malformed("leaf index out of range".into()));
    }

    let wots = WotsParams::new(params.winternitz_bits());
    let key_id = public.key_id();
    let mut msg = message_node(key_id, sig.leaf_index, digest);

    for (layer, piece) in (0..params.layers()).zip(&sig.layers) {
        let (tree, leaf) = locate(&params, sig.leaf_index, layer);
        let ctx = TreeContext { key_id, layer, tree };
        let ots_public = wots::public_key_from_signature(&wots, key_id, ctx.ots_address(leaf), &msg, &piece.ots)
            .ok_or(VerifyError::Invalid)?;
        msg = ctx.root_from_path(leaf, ctx.leaf(leaf, &ots_public), &piece.auth_path);
    }

    if &msg == public.root() {
        Ok(())
    } else {
        Err(VerifyError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CryptoContext;
    use crate::hash::message_digest;
    use crate::params::{HssHeight, TreeStrategy, Winternitz, XmssMtVariant};

    fn hss_key(strategy: TreeStrategy) -> PrivateKey {
        let params = ParamSet::Hss { winternitz: Winternitz::W4, height: HssHeight::H5 };
        PrivateKey::generate(&CryptoContext::new(), params, strategy).unwrap()
    }

    #[test]
    fn test_sign_verify_single_layer() {
        let key = hss_key(TreeStrategy::Full);
        let mut signer = OtsSigner::new(&key);
        let digest = message_digest(b"hello");

        for leaf in [0, 1, 31] {
            let sig = signer.sign_leaf(leaf, &digest).unwrap();
            assert_eq!(sig.leaf_index(), leaf);
            let bytes = sig.to_bytes();
            assert_eq!(bytes.len(), signature_size(&key.params()));
            assert!(verify(&key.public_key(), &digest, &bytes).is_ok());
        }
    }

    #[test]
    fn test_sign_verify_multi_layer() {
        let params = ParamSet::XmssMt(XmssMtVariant::V20_4);
        let key = PrivateKey::generate(&CryptoContext::new(), params, TreeStrategy::MemoryConstrained).unwrap();
        let mut signer = OtsSigner::new(&key);
        let digest = message_digest(b"multi tree");

        // crosses tree boundaries on every layer
        for leaf in [0, 33, (1 << 20) - 1] {
            let sig = signer.sign_leaf(leaf, &digest).unwrap().to_bytes();
            assert!(verify(&key.public_key(), &digest, &sig).is_ok());
        }
    }

    #[test]
    fn test_strategies_produce_identical_signatures() {
        let full = hss_key(TreeStrategy::Full);
        let bds = full.clone().with_strategy(TreeStrategy::Bds).unwrap();
        let digest = message_digest(b"same");
        let a = OtsSigner::new(&full).sign_leaf(7, &digest).unwrap();
        let b = OtsSigner::new(&bds).sign_leaf(7, &digest).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_digest_rejected() {
        let key = hss_key(TreeStrategy::Bds);
        let sig = OtsSigner::new(&key).sign_leaf(2, &message_digest(b"right")).unwrap();
        let result = verify(&key.public_key(), &message_digest(b"wrong"), &sig.to_bytes());
        assert!(matches!(result, Err(VerifyError::Invalid)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let key = hss_key(TreeStrategy::Bds);
        let other = hss_key(TreeStrategy::Bds);
        let digest = message_digest(b"msg");
        let sig = OtsSigner::new(&key).sign_leaf(0, &digest).unwrap();
        assert!(verify(&other.public_key(), &digest, &sig.to_bytes()).is_err());
    }

    #[test]
    fn test_tampered_leaf_index_rejected() {
        let key = hss_key(TreeStrategy::Bds);
        let digest = message_digest(b"msg");
        let mut bytes = OtsSigner::new(&key).sign_leaf(4, &digest).unwrap().to_bytes();
        // last byte of the big-endian leaf index
        bytes[1 + PARAM_CODE_SIZE + 7] ^= 1;
        assert!(verify(&key.public_key(), &digest, &bytes).is_err());
    }

    #[test]
    fn test_bad_digest_length() {
        let key = hss_key(TreeStrategy::Bds);
        let err = OtsSigner::new(&key).sign_leaf(0, &[0u8; 32]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidDigestLength { expected: 64, actual: 32 }));
    }

    #[test]
    fn test_leaf_beyond_capacity() {
        let key = hss_key(TreeStrategy::Bds);
        assert!(OtsSigner::new(&key).sign_leaf(32, &message_digest(b"x")).is_err());
    }

    #[test]
    fn test_truncated_signature() {
        assert!(Signature::from_bytes(&[FORMAT_VERSION, 3, 4, 5, 0]).is_err());
    }
}
