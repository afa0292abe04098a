use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

pub type SecretFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>>;

/// API key that never shows up in logs or `Debug` output.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Source of API keys.
pub trait VaultProvider: Send + Sync {
    fn get_secret(&self, key: &str) -> SecretFuture<'_>;

    /// Look `keys` up in order and return the first one that is set.
    fn first_secret<'a>(&'a self, keys: &'a [&'a str]) -> SecretFuture<'a> {
        Box::pin(async move {
            for key in keys {
                if let Some(value) = self.get_secret(key).await? {
                    tracing::debug!(key, "secret resolved");
                    return Ok(Some(value));
                }
            }
            Ok(None)
        })
    }
}

/// Reads keys from the process environment. Empty values count as unset.
pub struct EnvVaultProvider;

impl VaultProvider for EnvVaultProvider {
    fn get_secret(&self, key: &str) -> SecretFuture<'_> {
        let value = std::env::var(key).ok().filter(|v| !v.is_empty());
        Box::pin(async move { Ok(value) })
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MockVaultProvider(std::collections::HashMap<String, String>);

#[cfg(test)]
impl<'a> FromIterator<(&'a str, &'a str)> for MockVaultProvider {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        )
    }
}

#[cfg(test)]
impl VaultProvider for MockVaultProvider {
    fn get_secret(&self, key: &str) -> SecretFuture<'_> {
        let value = self.0.get(key).cloned();
        Box::pin(async move { Ok(value) })
    }
}
