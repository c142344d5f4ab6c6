//! Stateless post-quantum sample commands: signatures, KEM, HKDF

use std::path::{Path, PathBuf};

use anyhow::{ensure, Result};
use clap::{Args, Subcommand};
use hbsig_crypto::kdf::{derive_key, KdfHash};
use hbsig_crypto::pq::kem::{self, KemLevel};
use hbsig_crypto::pq::sign::{self, SignatureScheme};
use zeroize::Zeroizing;

use crate::config::HbsigConfig;
use crate::files;

#[derive(Subcommand)]
pub enum SignatureAction {
    /// Generate a key pair
    GenerateKeys {
        #[arg(long = "pub")]
        public: Option<PathBuf>,
        #[arg(long = "priv")]
        private: Option<PathBuf>,
    },
    /// Sign a message (detached signature)
    Sign {
        #[arg(long = "priv")]
        private: Option<PathBuf>,
        #[arg(long)]
        message: Option<PathBuf>,
        #[arg(long)]
        sig: Option<PathBuf>,
    },
    /// Verify a detached signature
    Verify {
        #[arg(long = "pub")]
        public: Option<PathBuf>,
        #[arg(long)]
        message: Option<PathBuf>,
        #[arg(long)]
        sig: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum KemAction {
    /// Generate a key pair
    GenerateKeys {
        #[arg(long = "pub")]
        public: Option<PathBuf>,
        #[arg(long = "priv")]
        private: Option<PathBuf>,
    },
    /// Create a ciphertext and the shared secret it carries
    Encapsulate {
        #[arg(long = "pub")]
        public: Option<PathBuf>,
        #[arg(long, default_value = "ciphertext.dat")]
        ciphertext: PathBuf,
        #[arg(long, default_value = "shared.key")]
        secret: PathBuf,
    },
    /// Recover the shared secret from a ciphertext
    Decapsulate {
        #[arg(long = "priv")]
        private: Option<PathBuf>,
        #[arg(long, default_value = "ciphertext.dat")]
        ciphertext: PathBuf,
        #[arg(long, default_value = "recovered.key")]
        secret: PathBuf,
    },
}

#[derive(Args)]
pub struct KdfArgs {
    /// sha2-256|sha2-384|sha2-512
    #[arg(long, default_value = "sha2-256")]
    hash: String,

    #[arg(long, default_value = "DEADBEEF", conflicts_with = "salt_file")]
    salt: String,
    #[arg(long)]
    salt_file: Option<PathBuf>,

    #[arg(long, default_value = "000102030405060708090a0b0c0d0e0f", conflicts_with = "ikm_file")]
    ikm: String,
    #[arg(long)]
    ikm_file: Option<PathBuf>,

    #[arg(long, default_value = "hbsig-kdf", conflicts_with = "info_file")]
    info: String,
    #[arg(long)]
    info_file: Option<PathBuf>,

    #[arg(long, default_value_t = 32)]
    keysize: usize,

    #[arg(long, default_value = "derived.key")]
    keyfile: PathBuf,
}

pub fn signature(scheme: SignatureScheme, action: SignatureAction, config: &HbsigConfig) -> Result<()> {
    println!("Running {scheme:?}");
    match action {
        SignatureAction::GenerateKeys { public, private } => {
            let keypair = sign::generate_keypair(scheme);
            println!("Keys have been generated.");
            files::save(&public.unwrap_or_else(|| config.public_key.clone()), &keypair.public_key)?;
            files::save(&private.unwrap_or_else(|| config.private_key.clone()), &keypair.secret_key)?;
            println!("Public and private keys have been saved to disk.");
        }
        SignatureAction::Sign { private, message, sig } => {
            let secret_key = Zeroizing::new(files::load(&private.unwrap_or_else(|| config.private_key.clone()))?);
            let message = files::load(&message.unwrap_or_else(|| config.message.clone()))?;
            let signature = sign::sign(scheme, &secret_key, &message)?;
            println!("Signature has been created.");
            files::save(&sig.unwrap_or_else(|| config.signature.clone()), &signature)?;
        }
        SignatureAction::Verify { public, message, sig } => {
            let public_key = files::load(&public.unwrap_or_else(|| config.public_key.clone()))?;
            let message = files::load(&message.unwrap_or_else(|| config.message.clone()))?;
            let signature = files::load(&sig.unwrap_or_else(|| config.signature.clone()))?;
            sign::verify(scheme, &public_key, &message, &signature)?;
            println!("Signature is valid.");
        }
    }
    Ok(())
}

pub fn kyber(level: KemLevel, action: KemAction, config: &HbsigConfig) -> Result<()> {
    println!("Running {level:?}");
    match action {
        KemAction::GenerateKeys { public, private } => {
            let keypair = kem::generate_keypair(level);
            println!("Keys have been generated.");
            files::save(&public.unwrap_or_else(|| config.public_key.clone()), &keypair.public_key)?;
            files::save(&private.unwrap_or_else(|| config.private_key.clone()), &keypair.secret_key)?;
        }
        KemAction::Encapsulate { public, ciphertext, secret } => {
            let public_key = files::load(&public.unwrap_or_else(|| config.public_key.clone()))?;
            let encapsulated = kem::encapsulate(level, &public_key)?;
            println!("Shared secret has been encapsulated.");
            files::save(&ciphertext, &encapsulated.ciphertext)?;
            files::save(&secret, &encapsulated.shared_secret)?;
        }
        KemAction::Decapsulate { private, ciphertext, secret } => {
            let secret_key = Zeroizing::new(files::load(&private.unwrap_or_else(|| config.private_key.clone()))?);
            let ciphertext = files::load(&ciphertext)?;
            let shared = kem::decapsulate(level, &secret_key, &ciphertext)?;
            println!("Shared secret has been decapsulated.");
            files::save(&secret, &shared)?;
        }
    }
    Ok(())
}

pub fn kdf(args: KdfArgs) -> Result<()> {
    let hash: KdfHash = args.hash.parse()?;
    ensure!(
        (1..=hash.max_key_size()).contains(&args.keysize),
        "Key size must be between 1 and {} for {}",
        hash.max_key_size(),
        args.hash
    );

    println!("Running kdf with the following parameters...");
    println!("    hash algorithm: {}", args.hash);
    describe_input("salt", &args.salt, args.salt_file.as_deref());
    describe_input("IKM", &args.ikm, args.ikm_file.as_deref());
    describe_input("info", &args.info, args.info_file.as_deref());
    println!("    key size: {}", args.keysize);
    println!("    output key file: {}", args.keyfile.display());
    println!();

    let salt = input_bytes(&args.salt, args.salt_file.as_deref())?;
    let ikm = Zeroizing::new(input_bytes(&args.ikm, args.ikm_file.as_deref())?);
    let info = input_bytes(&args.info, args.info_file.as_deref())?;

    let key = derive_key(hash, &salt, &ikm, &info, args.keysize)?;
    println!("Key has been derived.");
    files::save(&args.keyfile, &key)?;
    println!("Derived key has been saved to disk.");
    Ok(())
}

fn describe_input(name: &str, value: &str, file: Option<&Path>) {
    match file {
        Some(path) => println!("    {name} file: {}", path.display()),
        None if value.is_empty() => println!("    no {name}"),
        None => println!("    {name}: {value}"),
    }
}

/// A file's contents when given, otherwise the string's bytes
fn input_bytes(value: &str, file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => files::load(path),
        None => Ok(value.as_bytes().to_vec()),
    }
}
