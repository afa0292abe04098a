use codeqa_index::{DecodePolicy, IdScheme};

use super::{Config, ProviderKind, StoreBackend};

fn parse_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_azure_aliases();
        self.apply_env_overrides_gateways();
        self.apply_env_overrides_store_index();
    }

    /// Variables understood by the earlier Azure-only tool. Setting an
    /// endpoint switches that gateway to Azure.
    fn apply_azure_aliases(&mut self) {
        if let Ok(v) = std::env::var("AZURE_OPENAI_ENDPOINT") {
            self.embedding.provider = ProviderKind::Azure;
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("AZURE_OPENAI_API_VERSION") {
            self.embedding.api_version = v;
        }
        if let Ok(v) = std::env::var("AZURE_EMBEDDING_DEPLOYMENT") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("AZURE_CHAT_ENDPOINT") {
            self.chat.provider = ProviderKind::Azure;
            self.chat.base_url = v;
        }
        if let Ok(v) = std::env::var("AZURE_CHAT_API_VERSION") {
            self.chat.api_version = v;
        }
        if let Ok(v) = std::env::var("AZURE_CHAT_DEPLOYMENT") {
            self.chat.model = v;
        }
    }

    fn apply_env_overrides_gateways(&mut self) {
        if let Ok(v) = std::env::var("CODEQA_EMBEDDING_PROVIDER") {
            match v.parse::<ProviderKind>() {
                Ok(kind) => self.embedding.provider = kind,
                Err(e) => tracing::warn!("ignoring invalid CODEQA_EMBEDDING_PROVIDER: {e}"),
            }
        }
        if let Ok(v) = std::env::var("CODEQA_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("CODEQA_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("CODEQA_EMBEDDING_API_VERSION") {
            self.embedding.api_version = v;
        }
        if let Ok(v) = std::env::var("CODEQA_CHAT_PROVIDER") {
            match v.parse::<ProviderKind>() {
                Ok(kind) => self.chat.provider = kind,
                Err(e) => tracing::warn!("ignoring invalid CODEQA_CHAT_PROVIDER: {e}"),
            }
        }
        if let Ok(v) = std::env::var("CODEQA_CHAT_BASE_URL") {
            self.chat.base_url = v;
        }
        if let Ok(v) = std::env::var("CODEQA_CHAT_MODEL") {
            self.chat.model = v;
        }
        if let Ok(v) = std::env::var("CODEQA_CHAT_API_VERSION") {
            self.chat.api_version = v;
        }
        if let Ok(v) = std::env::var("CODEQA_TIMEOUT_CONNECT")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.connect_seconds = secs;
        }
        if let Ok(v) = std::env::var("CODEQA_TIMEOUT_REQUEST")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.request_seconds = secs;
        }
    }

    fn apply_env_overrides_store_index(&mut self) {
        if let Ok(v) = std::env::var("CODEQA_STORE_BACKEND") {
            match v.parse::<StoreBackend>() {
                Ok(backend) => self.store.backend = backend,
                Err(e) => tracing::warn!("ignoring invalid CODEQA_STORE_BACKEND: {e}"),
            }
        }
        if let Ok(v) = std::env::var("CODEQA_STORE_PATH") {
            self.store.path = v;
        }
        if let Ok(v) = std::env::var("CODEQA_QDRANT_URL") {
            self.store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("CODEQA_COLLECTION") {
            self.store.collection = v;
        }
        if let Ok(v) = std::env::var("CODEQA_INDEX_ROOT") {
            self.index.root = v.into();
        }
        if let Ok(v) = std::env::var("CODEQA_INDEX_EXTENSIONS") {
            self.index.extensions = parse_list(&v);
        }
        if let Ok(v) = std::env::var("CODEQA_CHUNK_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.index.chunk_size = size;
        }
        if let Ok(v) = std::env::var("CODEQA_INDEX_ID_SCHEME") {
            match v.parse::<IdScheme>() {
                Ok(scheme) => self.index.id_scheme = scheme,
                Err(e) => tracing::warn!("ignoring invalid CODEQA_INDEX_ID_SCHEME: {e}"),
            }
        }
        if let Ok(v) = std::env::var("CODEQA_INDEX_DECODE") {
            match v.parse::<DecodePolicy>() {
                Ok(policy) => self.index.decode = policy,
                Err(e) => tracing::warn!("ignoring invalid CODEQA_INDEX_DECODE: {e}"),
            }
        }
        if let Ok(v) = std::env::var("CODEQA_INDEX_PRUNE")
            && let Ok(prune) = v.parse::<bool>()
        {
            self.index.prune = prune;
        }
        if let Ok(v) = std::env::var("CODEQA_QUERY_TOP_K")
            && let Ok(k) = v.parse::<u64>()
        {
            self.query.top_k = k;
        }
    }
}
