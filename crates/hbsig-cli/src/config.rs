//! CLI configuration
//!
//! Looked up in order: `--config`, `$HBSIG_CONFIG`, `~/.hbsig/config.json`,
//! built-in defaults. Command-line flags override whatever is loaded here.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "HBSIG_CONFIG";

/// Which stateful scheme `generate-keys` produces by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Xmss,
    Xmssmt,
    Hss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HbsigConfig {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
    pub state: PathBuf,
    pub detached_state: PathBuf,
    pub message: PathBuf,
    pub signature: PathBuf,

    pub scheme: Scheme,
    pub xmss_height: u32,
    /// XMSS^MT variant as `height_layers`, e.g. `20_4`
    pub xmssmt_variant: String,
    pub hss_winternitz: u32,
    pub hss_height: u32,
    /// Unset means the family default (bds for HSS, full otherwise)
    pub strategy: Option<String>,

    /// Seal new private keys under a keychain-held wrapping key
    pub seal: bool,
    pub keychain_service: String,
}

impl Default for HbsigConfig {
    fn default() -> Self {
        Self {
            private_key: PathBuf::from("priv.key"),
            public_key: PathBuf::from("pub.key"),
            state: PathBuf::from("priv.state"),
            detached_state: PathBuf::from("detached.state"),
            message: PathBuf::from("message.dat"),
            signature: PathBuf::from("sig.dat"),
            scheme: Scheme::Hss,
            xmss_height: 10,
            xmssmt_variant: "20_4".to_string(),
            hss_winternitz: 4,
            hss_height: 5,
            strategy: None,
            seal: false,
            keychain_service: "hbsig".to_string(),
        }
    }
}

impl HbsigConfig {
    /// Resolve and load the configuration for this invocation
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let home = dirs::home_dir().map(|h| h.join(".hbsig").join("config.json"));

        match resolve(explicit, env, home) {
            Some(Source::Required(path)) => Self::from_file(&path),
            Some(Source::Optional(path)) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[derive(Debug, PartialEq)]
enum Source {
    /// Named explicitly; missing is an error
    Required(PathBuf),
    /// Default location; missing means defaults
    Optional(PathBuf),
}

fn resolve(explicit: Option<&Path>, env: Option<PathBuf>, home: Option<PathBuf>) -> Option<Source> {
    if let Some(path) = explicit {
        return Some(Source::Required(path.to_path_buf()));
    }
    if let Some(path) = env.filter(|p| !p.as_os_str().is_empty()) {
        return Some(Source::Required(path));
    }
    home.map(Source::Optional)
}
