mod env;
mod types;


pub use types::*;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

use crate::vault::{Secret, VaultProvider};

/// Secret keys, each followed by the variable accepted in its place.
pub const EMBEDDING_API_KEY: (&str, &str) = ("CODEQA_EMBEDDING_API_KEY", "AZURE_OPENAI_KEY");
pub const CHAT_API_KEY: (&str, &str) = ("CODEQA_CHAT_API_KEY", "AZURE_CHAT_KEY");

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve API keys through the vault. The primary key wins over its alias.
    ///
    /// Missing keys are left unset; the gateway rejects the first call instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        let (primary, alias) = EMBEDDING_API_KEY;
        self.secrets.embedding_api_key =
            vault.first_secret(&[primary, alias]).await?.map(Secret::new);
        let (primary, alias) = CHAT_API_KEY;
        self.secrets.chat_api_key = vault.first_secret(&[primary, alias]).await?.map(Secret::new);
        Ok(())
    }

    /// Reject settings that cannot produce a working run.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.index.chunk_size == 0 {
            bail!("index.chunk_size must be greater than 0");
        }
        if self.index.scan_batch_size == 0 {
            bail!("index.scan_batch_size must be greater than 0");
        }
        if self.query.top_k == 0 {
            bail!("query.top_k must be greater than 0");
        }
        if self.index.extensions.iter().all(|e| e.trim().is_empty()) {
            bail!("index.extensions must list at least one extension");
        }
        if self.store.collection.trim().is_empty() {
            bail!("store.collection must not be empty");
        }
        Ok(())
    }
}

/// `--config PATH` from the command line, then `CODEQA_CONFIG`, then
/// `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("CODEQA_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}
