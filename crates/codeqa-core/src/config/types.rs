use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use codeqa_index::query::{DEFAULT_SYSTEM_PROMPT, DEFAULT_TOP_K};
use codeqa_index::reconcile::DEFAULT_SCAN_BATCH_SIZE;
use codeqa_index::walk::DEFAULT_EXTENSIONS;
use codeqa_index::{DecodePolicy, IdScheme, IndexerConfig, QueryConfig};
use codeqa_llm::http::HttpTimeouts;

use crate::vault::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

/// LLM gateway backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Azure,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "azure" => Ok(Self::Azure),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_api_version() -> String {
    "2024-02-01".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}

/// Embedding gateway. For Azure, `model` is the deployment name and
/// `base_url` the resource endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_embedding_model(),
            api_version: default_api_version(),
        }
    }
}

/// Generation gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_chat_model(),
            api_version: default_api_version(),
            max_tokens: None,
        }
    }
}

/// Vector store backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Qdrant,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

fn default_store_path() -> String {
    "./codeqa_storage/store.db".into()
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

fn default_collection() -> String {
    codeqa_index::indexer::DEFAULT_COLLECTION.into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub path: String,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            qdrant_url: default_qdrant_url(),
            collection: default_collection(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_owned()).collect()
}

fn default_chunk_size() -> usize {
    codeqa_index::chunker::DEFAULT_CHUNK_SIZE
}

fn default_scan_batch_size() -> u64 {
    DEFAULT_SCAN_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: u64,
    #[serde(default)]
    pub id_scheme: IdScheme,
    #[serde(default)]
    pub decode: DecodePolicy,
    /// Remove records of deleted files after every index run.
    #[serde(default)]
    pub prune: bool,
    /// Send a test embedding before indexing.
    #[serde(default = "default_true")]
    pub probe: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            extensions: default_extensions(),
            chunk_size: default_chunk_size(),
            scan_batch_size: default_scan_batch_size(),
            id_scheme: IdScheme::default(),
            decode: DecodePolicy::default(),
            prune: false,
            probe: true,
        }
    }
}

fn default_top_k() -> u64 {
    DEFAULT_TOP_K
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuerySettings {
    #[serde(default = "default_top_k")]
    pub top_k: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_seconds: default_connect_timeout(),
            request_seconds: default_request_timeout(),
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn http_timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(self.connect_seconds),
            request: Duration::from_secs(self.request_seconds),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub embedding_api_key: Option<Secret>,
    pub chat_api_key: Option<Secret>,
}

impl Config {
    /// Indexer settings for the configured collection.
    #[must_use]
    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            collection: self.store.collection.clone(),
            extensions: self.index.extensions.clone(),
            chunk_size: self.index.chunk_size,
            scan_batch_size: self.index.scan_batch_size,
            id_scheme: self.index.id_scheme,
            decode: self.index.decode,
            probe: self.index.probe,
        }
    }

    #[must_use]
    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            collection: self.store.collection.clone(),
            top_k: self.query.top_k,
            system_prompt: self.query.system_prompt.clone(),
        }
    }
}
