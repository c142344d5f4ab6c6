//! Key material for the stateful schemes
//!
//! The private key is immutable after generation. It carries no signing
//! position at all; which leaves are still unused lives in the separate
//! signing state managed by `hbsig-core`.

use std::fmt;

use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::context::CryptoContext;
use crate::hash::{sha256, Node, N};
use crate::merkle::{treehash, TreeContext};
use crate::params::{ParamSet, TreeStrategy, PARAM_CODE_SIZE};
use crate::wots::{self, WotsParams};
use crate::{CryptoError, Result};

pub const KEY_ID_SIZE: usize = 16;
pub const SEED_SIZE: usize = 32;
pub const FINGERPRINT_SIZE: usize = 16;

pub(crate) const FORMAT_VERSION: u8 = 1;
const PRIVATE_MAGIC: &[u8; 4] = b"HBSK";
const PUBLIC_MAGIC: &[u8; 4] = b"HBSP";

/// magic | version | params | strategy | key id | seed | root
pub const PRIVATE_KEY_SIZE: usize = 4 + 1 + PARAM_CODE_SIZE + 1 + KEY_ID_SIZE + SEED_SIZE + N;
/// magic | version | params | key id | root
pub const PUBLIC_KEY_SIZE: usize = 4 + 1 + PARAM_CODE_SIZE + KEY_ID_SIZE + N;

/// Binds signing states to the key they belong to
pub type Fingerprint = [u8; FINGERPRINT_SIZE];

/// Secret seed, scrubbed on drop.
///
/// Erasure is best-effort: copies the allocator or the OS made before the
/// drop (swap, core dumps) are out of reach.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct SecretSeed([u8; SEED_SIZE]);

#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    params: ParamSet,
    key_id: [u8; KEY_ID_SIZE],
    root: Node,
}

impl PublicKey {
    pub fn params(&self) -> ParamSet {
        self.params
    }

    pub(crate) fn key_id(&self) -> &[u8; KEY_ID_SIZE] {
        &self.key_id
    }

    pub(crate) fn root(&self) -> &Node {
        &self.root
    }

    pub fn fingerprint(&self) -> Fingerprint {
        let mut fp = [0u8; FINGERPRINT_SIZE];
        fp.copy_from_slice(&sha256(&self.export())[..FINGERPRINT_SIZE]);
        fp
    }

    pub fn export(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PUBLIC_KEY_SIZE);
        out.extend_from_slice(PUBLIC_MAGIC);
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&self.params.to_code());
        out.extend_from_slice(&self.key_id);
        out.extend_from_slice(&self.root);
        out
    }

    pub fn import(bytes: &[u8]) -> Result<Self> {
        let body = check_header(bytes, PUBLIC_MAGIC, PUBLIC_KEY_SIZE, "public key")?;
        let params = ParamSet::decode_prefix(body)
            .ok_or_else(|| CryptoError::CorruptKey("unknown parameter set".into()))?;
        let body = &body[PARAM_CODE_SIZE..];

        let mut key_id = [0u8; KEY_ID_SIZE];
        key_id.copy_from_slice(&body[..KEY_ID_SIZE]);
        let mut root = [0u8; N];
        root.copy_from_slice(&body[KEY_ID_SIZE..]);

        Ok(Self { params, key_id, root })
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("params", &self.params)
            .field("fingerprint", &hex(&self.fingerprint()))
            .finish()
    }
}

#[derive(Clone)]
pub struct PrivateKey {
    params: ParamSet,
    strategy: TreeStrategy,
    key_id: [u8; KEY_ID_SIZE],
    seed: SecretSeed,
    root: Node,
}

impl PrivateKey {
    /// Generate a fresh key. Entropy is drawn here and nowhere else.
    pub fn generate(ctx: &CryptoContext, params: ParamSet, strategy: TreeStrategy) -> Result<Self> {
        if !strategy.supports(&params) {
            return Err(CryptoError::Unsupported(format!("strategy {strategy} with {params}")));
        }

        let key_id: [u8; KEY_ID_SIZE] = ctx.random()?;
        let mut seed = SecretSeed([0u8; SEED_SIZE]);
        ctx.fill(&mut seed.0)?;

        debug!(%params, "computing top-layer root");
        let root = top_root(&params, &seed.0, &key_id);

        Ok(Self { params, strategy, key_id, seed, root })
    }

    pub fn params(&self) -> ParamSet {
        self.params
    }

    pub fn strategy(&self) -> TreeStrategy {
        self.strategy
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            params: self.params,
            key_id: self.key_id,
            root: self.root,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.public_key().fingerprint()
    }

    pub(crate) fn key_id(&self) -> &[u8; KEY_ID_SIZE] {
        &self.key_id
    }

    pub(crate) fn seed(&self) -> &[u8; SEED_SIZE] {
        &self.seed.0
    }

    pub fn export(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(PRIVATE_KEY_SIZE));
        out.extend_from_slice(PRIVATE_MAGIC);
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&self.params.to_code());
        out.push(self.strategy.to_code());
        out.extend_from_slice(&self.key_id);
        out.extend_from_slice(&self.seed.0);
        out.extend_from_slice(&self.root);
        out
    }

    pub fn import(bytes: &[u8]) -> Result<Self> {
        let body = check_header(bytes, PRIVATE_MAGIC, PRIVATE_KEY_SIZE, "private key")?;
        let params = ParamSet::decode_prefix(body)
            .ok_or_else(|| CryptoError::CorruptKey("unknown parameter set".into()))?;
        let body = &body[PARAM_CODE_SIZE..];

        let strategy = TreeStrategy::from_code(body[0])
            .filter(|s| s.supports(&params))
            .ok_or_else(|| CryptoError::CorruptKey("invalid tree strategy".into()))?;
        let body = &body[1..];

        let mut key_id = [0u8; KEY_ID_SIZE];
        key_id.copy_from_slice(&body[..KEY_ID_SIZE]);
        let mut seed = SecretSeed([0u8; SEED_SIZE]);
        seed.0.copy_from_slice(&body[KEY_ID_SIZE..KEY_ID_SIZE + SEED_SIZE]);
        let mut root = [0u8; N];
        root.copy_from_slice(&body[KEY_ID_SIZE + SEED_SIZE..]);

        Ok(Self { params, strategy, key_id, seed, root })
    }

    /// Same key, different traversal strategy
    pub fn with_strategy(mut self, strategy: TreeStrategy) -> Result<Self> {
        if !strategy.supports(&self.params) {
            return Err(CryptoError::Unsupported(format!("strategy {strategy} with {}", self.params)));
        }
        self.strategy = strategy;
        Ok(self)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("params", &self.params)
            .field("strategy", &self.strategy)
            .field("fingerprint", &hex(&self.fingerprint()))
            .finish_non_exhaustive()
    }
}

/// Validate magic, version and length; returns the bytes after the version
fn check_header<'a>(bytes: &'a [u8], magic: &[u8; 4], size: usize, what: &str) -> Result<&'a [u8]> {
    if bytes.len() != size {
        return Err(CryptoError::CorruptKey(format!(
            "{what} is {} bytes, expected {size}",
            bytes.len()
        )));
    }
    if &bytes[..4] != magic {
        return Err(CryptoError::CorruptKey(format!("not a {what}")));
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(CryptoError::CorruptKey(format!("unsupported {what} version {}", bytes[4])));
    }
    Ok(&bytes[5..])
}

pub(crate) fn leaf_fn<'a>(
    wots: &'a WotsParams,
    seed: &'a [u8; SEED_SIZE],
    ctx: &'a TreeContext<'a>,
) -> impl Fn(u32) -> Node + 'a {
    move |leaf| ctx.leaf(leaf, &wots::public_key(wots, seed, ctx.key_id, ctx.ots_address(leaf)))
}

fn top_root(params: &ParamSet, seed: &[u8; SEED_SIZE], key_id: &[u8; KEY_ID_SIZE]) -> Node {
    let wots = WotsParams::new(params.winternitz_bits());
    let ctx = TreeContext {
        key_id,
        layer: params.layers() - 1,
        tree: 0,
    };
    let (root, _) = treehash(&ctx, params.layer_height(), 0, leaf_fn(&wots, seed, &ctx));
    root
}

/// Lowercase hex, used for fingerprints and keychain accounts
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{HssHeight, Winternitz};

    fn small_params() -> ParamSet {
        ParamSet::Hss { winternitz: Winternitz::W8, height: HssHeight::H5 }
    }

    #[test]
    fn test_private_key_roundtrip() {
        let ctx = CryptoContext::new();
        let key = PrivateKey::generate(&ctx, small_params(), TreeStrategy::Bds).unwrap();
        let exported = key.export();
        assert_eq!(exported.len(), PRIVATE_KEY_SIZE);

        let imported = PrivateKey::import(&exported).unwrap();
        assert_eq!(imported.public_key(), key.public_key());
        assert_eq!(imported.strategy(), TreeStrategy::Bds);
        assert_eq!(imported.seed(), key.seed());
    }

    #[test]
    fn test_public_key_roundtrip_and_fingerprint() {
        let ctx = CryptoContext::new();
        let key = PrivateKey::generate(&ctx, small_params(), TreeStrategy::Full).unwrap();
        let public = key.public_key();
        let imported = PublicKey::import(&public.export()).unwrap();
        assert_eq!(imported, public);
        assert_eq!(imported.fingerprint(), key.fingerprint());
    }

    #[test]
    fn test_distinct_keys_have_distinct_fingerprints() {
        let ctx = CryptoContext::new();
        let a = PrivateKey::generate(&ctx, small_params(), TreeStrategy::Full).unwrap();
        let b = PrivateKey::generate(&ctx, small_params(), TreeStrategy::Full).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(PrivateKey::import(&[0u8; PRIVATE_KEY_SIZE]).is_err());
        assert!(PrivateKey::import(b"HBSK").is_err());
        assert!(PublicKey::import(&[0u8; 3]).is_err());
    }

    #[test]
    fn test_unsupported_strategy_rejected() {
        let ctx = CryptoContext::new();
        assert!(PrivateKey::generate(&ctx, small_params(), TreeStrategy::CpuConstrained).is_err());
    }

    #[test]
    fn test_debug_hides_seed() {
        let ctx = CryptoContext::new();
        let key = PrivateKey::generate(&ctx, small_params(), TreeStrategy::Full).unwrap();
        let printed = format!("{:?}", key);
        assert!(!printed.contains(&hex(key.seed())));
    }
}
