//! hbsig CLI - stateful hash-based signature key manager
//!
//! Usage:
//!   hbsig generate-keys   Create a key pair and its initial signing state
//!   hbsig sign            Sign a message, advancing the persisted state
//!   hbsig verify          Verify a signature
//!   hbsig detach          Move unused signatures into a separate state
//!   hbsig info            Show what a state file has left
//!   hbsig dilithium|sphincs|kyber|kdf   Stateless post-quantum samples

mod config;
mod files;
mod hbs;
mod pq;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use hbsig_crypto::pq::kem::KemLevel;
use hbsig_crypto::pq::sign::SignatureScheme;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::HbsigConfig;

#[derive(Parser)]
#[command(name = "hbsig")]
#[command(author, version, about = "Stateful hash-based signature key manager")]
#[command(
    long_about = "hbsig - generate, sign with and detach stateful hash-based signature keys.\n\n\
    The signing state is always saved before a signature is written out."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to $HBSIG_CONFIG, then ~/.hbsig/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an XMSS, XMSS^MT or HSS key pair and its signing state
    GenerateKeys(hbs::GenerateKeysArgs),

    /// Sign a message with the next one-time signature
    Sign(hbs::SignArgs),

    /// Verify a stateful signature
    Verify(hbs::VerifyArgs),

    /// Detach signatures from a state into a new state file
    Detach(hbs::DetachArgs),

    /// Show maximum and remaining signatures of a state
    Info(hbs::InfoArgs),

    /// Dilithium signatures
    Dilithium {
        /// Security category (2|3|5)
        #[arg(long, default_value_t = 3)]
        security: u32,

        #[command(subcommand)]
        action: pq::SignatureAction,
    },

    /// SPHINCS+ (SHA2-128f simple) signatures
    Sphincs {
        #[command(subcommand)]
        action: pq::SignatureAction,
    },

    /// Kyber key encapsulation
    Kyber {
        /// Parameter set (512|768|1024)
        #[arg(long, default_value_t = 768)]
        level: u32,

        #[command(subcommand)]
        action: pq::KemAction,
    },

    /// RFC 5869 HKDF key derivation
    Kdf(pq::KdfArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = HbsigConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::GenerateKeys(args) => hbs::generate_keys(args, &config),
        Commands::Sign(args) => hbs::sign(args, &config),
        Commands::Verify(args) => hbs::verify(args, &config),
        Commands::Detach(args) => hbs::detach_state(args, &config),
        Commands::Info(args) => hbs::info(args, &config),
        Commands::Dilithium { security, action } => {
            pq::signature(SignatureScheme::dilithium(security)?, action, &config)
        }
        Commands::Sphincs { action } => pq::signature(SignatureScheme::SphincsSha2_128f, action, &config),
        Commands::Kyber { level, action } => pq::kyber(KemLevel::try_from(level)?, action, &config),
        Commands::Kdf(args) => pq::kdf(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sign_defaults() {
        let cli = Cli::try_parse_from(["hbsig", "sign"]).unwrap();
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Sign(_)));
    }

    #[test]
    fn test_parse_detach_num_sigs() {
        let cli = Cli::try_parse_from(["hbsig", "-v", "detach", "--num-sigs", "3"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Detach(_)));
    }

    #[test]
    fn test_kdf_salt_conflicts_with_salt_file() {
        assert!(Cli::try_parse_from(["hbsig", "kdf", "--salt", "a", "--salt-file", "b"]).is_err());
    }
}
