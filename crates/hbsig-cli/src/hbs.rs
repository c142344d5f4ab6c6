//! Stateful hash-based signature commands

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::Args;
use hbsig_core::{detach, generate_key, serializer, KeyStatus, Signer, STATE_SIZE};
use hbsig_crypto::{
    cipher, hex, message_digest, CryptoContext, HssHeight, KeychainProvider, ParamSet, PrivateKey, PublicKey,
    TreeStrategy, Winternitz, XmssHeight, XmssMtVariant,
};
use hbsig_store::FileStore;
use secrecy::ExposeSecret;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::{HbsigConfig, Scheme};
use crate::files::{self, store_id};

#[derive(Args)]
pub struct GenerateKeysArgs {
    #[arg(long, value_enum)]
    scheme: Option<Scheme>,

    /// Tree height (XMSS: 10|16|20, HSS: 5|10|15|20|25)
    #[arg(long)]
    height: Option<u32>,

    /// XMSS^MT variant (20_2|20_4|40_2|40_4|40_8|60_3|60_6|60_12)
    #[arg(long)]
    variant: Option<String>,

    /// HSS Winternitz value (1|2|4|8)
    #[arg(long)]
    winternitz: Option<u32>,

    /// Tree strategy (full|memory|cpu for XMSS, full|bds for HSS)
    #[arg(long)]
    strategy: Option<String>,

    #[arg(long = "pub")]
    public: Option<PathBuf>,

    #[arg(long = "priv")]
    private: Option<PathBuf>,

    #[arg(long)]
    state: Option<PathBuf>,

    /// Seal the private key; the wrapping key goes to the OS keychain
    #[arg(long)]
    seal: bool,
}

#[derive(Args)]
pub struct SignArgs {
    #[arg(long = "priv")]
    private: Option<PathBuf>,

    #[arg(long)]
    state: Option<PathBuf>,

    #[arg(long)]
    message: Option<PathBuf>,

    #[arg(long)]
    sig: Option<PathBuf>,

    /// Override the key's tree strategy for this run
    #[arg(long)]
    strategy: Option<String>,
}

#[derive(Args)]
pub struct VerifyArgs {
    #[arg(long = "pub")]
    public: Option<PathBuf>,

    #[arg(long)]
    message: Option<PathBuf>,

    #[arg(long)]
    sig: Option<PathBuf>,
}

#[derive(Args)]
pub struct DetachArgs {
    #[arg(long = "priv")]
    private: Option<PathBuf>,

    #[arg(long)]
    state: Option<PathBuf>,

    #[arg(long)]
    detached_state: Option<PathBuf>,

    /// Number of signatures to move into the detached state
    #[arg(long, default_value_t = 1)]
    num_sigs: u64,
}

#[derive(Args)]
pub struct InfoArgs {
    #[arg(long)]
    state: Option<PathBuf>,
}

pub fn generate_keys(args: GenerateKeysArgs, config: &HbsigConfig) -> Result<()> {
    let params = param_set(&args, config)?;
    let strategy = match args.strategy.as_ref().or(config.strategy.as_ref()) {
        Some(name) => name.parse::<TreeStrategy>()?,
        None => TreeStrategy::default_for(&params),
    };
    let public_path = args.public.unwrap_or_else(|| config.public_key.clone());
    let private_path = args.private.unwrap_or_else(|| config.private_key.clone());
    let state_path = args.state.unwrap_or_else(|| config.state.clone());
    let seal = args.seal || config.seal;

    println!("Running generate-keys with the following parameters...");
    println!("    parameter set: {params}");
    println!("    strategy: {strategy}");
    println!("    public key file: {}", public_path.display());
    println!("    private key file: {}", private_path.display());
    println!("    private key state file: {}", state_path.display());
    println!();

    let ctx = CryptoContext::new();
    let store = FileStore::current_dir();
    let (key, _) = generate_key(&ctx, params, strategy, &store, store_id(&state_path)?)?;
    let public = key.public_key();
    println!("Keys have been generated.");
    println!("Successfully saved {} ({} bytes)", state_path.display(), STATE_SIZE);

    files::save(&public_path, &public.export())?;

    let exported = key.export();
    if seal {
        let sealed = seal_private_key(&ctx, &key, &exported, &config.keychain_service)?;
        files::save(&private_path, &sealed)?;
        println!("Private key is sealed; the wrapping key is in the system keychain.");
    } else {
        files::save(&private_path, &exported)?;
    }

    println!("Public key, private key and state have been saved to disk.");
    println!("Number of signatures for this state: {}", params.max_leaf_index());
    Ok(())
}

pub fn sign(args: SignArgs, config: &HbsigConfig) -> Result<()> {
    let private_path = args.private.unwrap_or_else(|| config.private_key.clone());
    let state_path = args.state.unwrap_or_else(|| config.state.clone());
    let message_path = args.message.unwrap_or_else(|| config.message.clone());
    let sig_path = args.sig.unwrap_or_else(|| config.signature.clone());

    println!("Running sign with the following parameters...");
    println!("    signature file: {}", sig_path.display());
    println!("    private key file: {}", private_path.display());
    println!("    private key state file: {}", state_path.display());
    println!("    message data file: {}", message_path.display());
    println!();

    let mut key = load_private_key(&private_path, config)?;
    if let Some(name) = args.strategy {
        key = key.with_strategy(name.parse()?)?;
    }
    println!("Private key has been imported.");

    let store = FileStore::current_dir();
    let mut signer = Signer::new(&key, &store, store_id(&state_path)?);
    let state = signer.load_state()?;
    println!("Private key state has been imported.");

    let message = files::load(&message_path)?;
    let digest = message_digest(&message);

    let (signature, state) = signer.sign(&state, &digest)?;
    println!("Signature has been created.");

    files::save(&sig_path, &signature.to_bytes())?;
    println!("Signature and updated state have been saved to disk.");
    println!(
        "Number of signatures for this state: {}.\nRemaining signatures: {}",
        state.max_leaf_index(),
        state.remaining()
    );
    if state.is_exhausted() {
        println!("The private key cannot sign any more messages.");
    }
    Ok(())
}

pub fn verify(args: VerifyArgs, config: &HbsigConfig) -> Result<()> {
    let public_path = args.public.unwrap_or_else(|| config.public_key.clone());
    let message_path = args.message.unwrap_or_else(|| config.message.clone());
    let sig_path = args.sig.unwrap_or_else(|| config.signature.clone());

    let public = PublicKey::import(&files::load(&public_path)?)?;
    println!("Public key has been imported.");
    let message = files::load(&message_path)?;
    let signature = files::load(&sig_path)?;

    hbsig_crypto::verify(&public, &message_digest(&message), &signature)?;
    println!("Signature is valid.");
    Ok(())
}

pub fn detach_state(args: DetachArgs, config: &HbsigConfig) -> Result<()> {
    let private_path = args.private.unwrap_or_else(|| config.private_key.clone());
    let state_path = args.state.unwrap_or_else(|| config.state.clone());
    let detached_path = args.detached_state.unwrap_or_else(|| config.detached_state.clone());

    println!("Running detach with the following parameters...");
    println!("    private key file: {}", private_path.display());
    println!("    private key state file: {}", state_path.display());
    println!("    private key detached state file: {}", detached_path.display());
    println!("    detaching {} signatures", args.num_sigs);
    println!();

    ensure!(
        !same_file(&state_path, &detached_path),
        "Detached state file must differ from the private key state file: {}",
        detached_path.display()
    );

    let key = load_private_key(&private_path, config)?;
    println!("Private key has been imported.");

    let store = FileStore::current_dir();
    let state_id = store_id(&state_path)?;
    let state = Signer::new(&key, &store, state_id).load_state()?;
    println!("Private key state has been imported.");

    let split = detach(&key, &state, args.num_sigs, &store, state_id)?;
    println!("Successfully saved {} ({} bytes)", state_path.display(), STATE_SIZE);

    split.persist_detached(&store, store_id(&detached_path)?)?;
    println!("Successfully saved {} ({} bytes)", detached_path.display(), STATE_SIZE);

    println!("Original state has {} signatures remaining.", split.parent.remaining());
    println!("Detached state has {} signatures remaining.", split.detached.remaining());
    Ok(())
}

pub fn info(args: InfoArgs, config: &HbsigConfig) -> Result<()> {
    let state_path = args.state.unwrap_or_else(|| config.state.clone());
    let state = serializer::decode(&files::load(&state_path)?)?;

    println!("Parameter set: {}", state.params());
    println!("Key fingerprint: {}", hex(state.key_fingerprint()));
    println!("Next leaf index: {}", state.next_leaf_index());
    println!("Number of signatures for this state: {}", state.max_leaf_index());
    match state.status() {
        KeyStatus::Active { remaining } => println!("Remaining signatures: {remaining}"),
        KeyStatus::Exhausted => {
            println!("Remaining signatures: 0");
            println!("The private key cannot sign any more messages.");
        }
    }
    Ok(())
}

fn param_set(args: &GenerateKeysArgs, config: &HbsigConfig) -> Result<ParamSet> {
    let params = match args.scheme.unwrap_or(config.scheme) {
        Scheme::Xmss => ParamSet::Xmss(XmssHeight::try_from(args.height.unwrap_or(config.xmss_height))?),
        Scheme::Xmssmt => {
            let variant = args.variant.as_deref().unwrap_or(&config.xmssmt_variant);
            ParamSet::XmssMt(variant.parse::<XmssMtVariant>()?)
        }
        Scheme::Hss => ParamSet::Hss {
            winternitz: Winternitz::try_from(args.winternitz.unwrap_or(config.hss_winternitz))?,
            height: HssHeight::try_from(args.height.unwrap_or(config.hss_height))?,
        },
    };
    Ok(params)
}

fn seal_private_key(ctx: &CryptoContext, key: &PrivateKey, exported: &[u8], service: &str) -> Result<Vec<u8>> {
    let fingerprint = key.fingerprint();
    let wrapping_key = cipher::generate_key(ctx)?;
    KeychainProvider::new(service)
        .store_wrapping_key(&fingerprint, &wrapping_key[..])
        .context("Failed to store the wrapping key in the system keychain")?;
    Ok(cipher::seal(ctx, &wrapping_key[..], &fingerprint, exported)?)
}

/// Same path, or both resolve to the same existing file
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Read a private key file, unsealing it through the keychain if needed
fn load_private_key(path: &Path, config: &HbsigConfig) -> Result<PrivateKey> {
    let bytes = Zeroizing::new(files::load(path)?);
    if !cipher::is_sealed(&bytes) {
        return Ok(PrivateKey::import(&bytes)?);
    }

    let fingerprint = cipher::sealed_fingerprint(&bytes).context("Malformed sealed private key")?;
    debug!(fingerprint = %hex(&fingerprint), "unsealing private key");
    let wrapping_key = KeychainProvider::new(&config.keychain_service)
        .retrieve_wrapping_key(&fingerprint)
        .context("Failed to retrieve the wrapping key from the system keychain")?;
    let plain = cipher::unseal(wrapping_key.expose_secret(), &bytes)?;
    let key = PrivateKey::import(&plain)?;
    ensure!(key.fingerprint() == fingerprint, "Sealed private key does not match its envelope");
    Ok(key)
}
