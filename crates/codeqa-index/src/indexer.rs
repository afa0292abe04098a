//! Incremental ingestion orchestrator: walk → chunk → skip known ids → embed → store.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use codeqa_llm::{LlmError, LlmProvider};
use codeqa_store::{ChunkMetadata, EmbeddingRecord, VectorStore};

use crate::chunker::{DEFAULT_CHUNK_SIZE, chunk_text};
use crate::error::Result;
use crate::ids::IdScheme;
use crate::reconcile::{DEFAULT_SCAN_BATCH_SIZE, ExistingIdSet, load_existing_ids};
use crate::walk::{DEFAULT_EXTENSIONS, DecodePolicy, SourceFile, collect_source_files, read_source};

/// Text embedded once at startup to check the embedding gateway and learn
/// the vector dimension.
pub const PROBE_TEXT: &str = "Hello world!";

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "codebase";

/// Indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub collection: String,
    pub extensions: Vec<String>,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Page size used when enumerating existing ids.
    pub scan_batch_size: u64,
    pub id_scheme: IdScheme,
    pub decode: DecodePolicy,
    /// Embed [`PROBE_TEXT`] before the run.
    pub probe: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_owned()).collect(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            scan_batch_size: DEFAULT_SCAN_BATCH_SIZE,
            id_scheme: IdScheme::default(),
            decode: DecodePolicy::default(),
            probe: true,
        }
    }
}

/// Summary of an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub files_scanned: usize,
    /// Files that needed at least one new chunk embedded.
    pub files_embedded: usize,
    /// Files whose chunks were all present already (or that were empty).
    pub files_skipped: usize,
    pub chunks_created: usize,
    pub chunks_skipped: usize,
    /// Stored chunks of walked files that the current text no longer produces.
    pub chunks_removed: usize,
    pub embedding_calls: usize,
    pub duration_ms: u64,
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {} files: {} embedded, {} unchanged; {} new chunks, {} already stored, \
             {} stale removed; {} embedding requests in {} ms",
            self.files_scanned,
            self.files_embedded,
            self.files_skipped,
            self.chunks_created,
            self.chunks_skipped,
            self.chunks_removed,
            self.embedding_calls,
            self.duration_ms,
        )
    }
}

struct FileOutcome {
    source: String,
    /// Every id the file's current text produces.
    ids: Vec<String>,
    created: usize,
    skipped: usize,
}

/// Fail fast when `provider` cannot embed, before any store or gateway work.
pub(crate) fn require_embeddings<P: LlmProvider>(provider: &P) -> Result<()> {
    if provider.supports_embeddings() {
        Ok(())
    } else {
        Err(LlmError::EmbedUnsupported {
            provider: provider.name(),
        }
        .into())
    }
}

/// Orchestrates incremental embedding of a source tree.
pub struct Indexer<P: LlmProvider> {
    store: Arc<dyn VectorStore>,
    provider: Arc<P>,
    config: IndexerConfig,
}

impl<P: LlmProvider> Indexer<P> {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, provider: Arc<P>, config: IndexerConfig) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Embed [`PROBE_TEXT`] and return the vector dimension.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot embed or the embedding
    /// gateway fails.
    pub async fn probe(&self) -> Result<usize> {
        require_embeddings(self.provider.as_ref())?;
        let vector = self.provider.embed(PROBE_TEXT).await?;
        tracing::info!(
            provider = self.provider.name(),
            dimension = vector.len(),
            "embedding gateway reachable"
        );
        Ok(vector.len())
    }

    /// Embed every chunk under `root` that the store does not hold yet.
    ///
    /// Each file with new chunks costs exactly one embedding request and one
    /// store write. Files whose chunks are all known cost nothing. Once every
    /// file is written, stored chunks of walked files that their current text
    /// no longer produces are deleted in one call.
    ///
    /// # Errors
    ///
    /// Returns the first walk, read, decode, gateway or store error. Nothing
    /// is retried.
    pub async fn index_directory(&self, root: &Path) -> Result<IndexReport> {
        require_embeddings(self.provider.as_ref())?;
        let start = Instant::now();
        let mut report = IndexReport::default();
        let collection = &self.config.collection;

        let mut collection_ready = false;
        if self.config.probe {
            let dimension = self.probe().await?;
            self.store
                .ensure_collection(collection, u64::try_from(dimension)?)
                .await?;
            collection_ready = true;
        }

        let mut existing =
            load_existing_ids(self.store.as_ref(), collection, self.config.scan_batch_size)
                .await?;

        let files = collect_source_files(root, &self.config.extensions)?;
        let total = files.len();
        tracing::info!(total, root = %root.display(), "indexing started");

        let mut current: HashMap<String, HashSet<String>> = HashMap::new();
        for (i, file) in files.iter().enumerate() {
            report.files_scanned += 1;
            let outcome = self
                .index_file(file, &mut existing, &mut collection_ready)
                .await?;

            if outcome.created > 0 {
                report.files_embedded += 1;
                report.embedding_calls += 1;
            } else {
                report.files_skipped += 1;
            }
            report.chunks_created += outcome.created;
            report.chunks_skipped += outcome.skipped;

            tracing::info!(
                file = %file.rel_path.display(),
                progress = format_args!("{}/{total}", i + 1),
                created = outcome.created,
                skipped = outcome.skipped,
            );
            current
                .entry(outcome.source)
                .or_default()
                .extend(outcome.ids);
        }

        report.chunks_removed = self.remove_stale(&current, &mut existing).await?;

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(%report, "indexing finished");
        Ok(report)
    }

    async fn index_file(
        &self,
        file: &SourceFile,
        existing: &mut ExistingIdSet,
        collection_ready: &mut bool,
    ) -> Result<FileOutcome> {
        let text = read_source(&file.path, self.config.decode).await?;
        let chunks = chunk_text(&text, self.config.chunk_size);
        let scheme = self.config.id_scheme;
        let source = scheme.source_for(&file.rel_path);

        let ids: Vec<String> = chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| scheme.chunk_id(&source, index, chunk))
            .collect();
        let pending: Vec<(String, &str)> = ids
            .iter()
            .zip(&chunks)
            .filter(|(id, _)| !existing.contains(id))
            .map(|(id, chunk)| (id.clone(), *chunk))
            .collect();
        let skipped = chunks.len() - pending.len();

        if pending.is_empty() {
            tracing::debug!(file = %source, chunks = chunks.len(), "nothing new to embed");
            return Ok(FileOutcome {
                source,
                ids,
                created: 0,
                skipped,
            });
        }

        let texts: Vec<&str> = pending.iter().map(|(_, text)| *text).collect();
        tracing::debug!(file = %source, count = texts.len(), "embedding new chunks");
        let vectors = self.provider.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(LlmError::EmbeddingCountMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            }
            .into());
        }

        if !*collection_ready {
            let dimension = vectors.first().map_or(0, Vec::len);
            self.store
                .ensure_collection(&self.config.collection, u64::try_from(dimension)?)
                .await?;
            *collection_ready = true;
        }

        let records: Vec<EmbeddingRecord> = pending
            .iter()
            .zip(vectors)
            .map(|((id, text), vector)| EmbeddingRecord {
                id: id.clone(),
                vector,
                document: (*text).to_owned(),
                metadata: ChunkMetadata::new(source.clone()),
            })
            .collect();
        let created = records.len();
        self.store.add(&self.config.collection, records).await?;

        for (id, _) in pending {
            existing.insert(id, source.clone());
        }

        Ok(FileOutcome {
            source,
            ids,
            created,
            skipped,
        })
    }

    /// Delete stored ids of each walked source that are not in its current
    /// id set. Sources that were not walked are left to the pruner.
    async fn remove_stale(
        &self,
        current: &HashMap<String, HashSet<String>>,
        existing: &mut ExistingIdSet,
    ) -> Result<usize> {
        let known: &ExistingIdSet = existing;
        let mut stale: Vec<String> = current
            .iter()
            .flat_map(move |(source, ids)| {
                known
                    .ids_for_source(source)
                    .filter(move |id| !ids.contains(*id))
                    .map(str::to_owned)
            })
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        stale.sort_unstable();
        tracing::info!(count = stale.len(), "removing chunks replaced by edits");
        self.store
            .delete(&self.config.collection, stale.clone())
            .await?;
        for id in &stale {
            existing.remove(id);
        }
        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests {
    use codeqa_llm::mock::MockProvider;
    use codeqa_store::InMemoryVectorStore;

    use super::*;
    use crate::error::IndexError;

    fn indexer(
        store: Arc<InMemoryVectorStore>,
        provider: MockProvider,
        config: IndexerConfig,
    ) -> Indexer<MockProvider> {
        Indexer::new(store, Arc::new(provider), config)
    }

    #[test]
    fn default_config() {
        let config = IndexerConfig::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.scan_batch_size, 100);
        assert_eq!(config.extensions, ["cs", "md", "txt"]);
        assert_eq!(config.collection, "codebase");
        assert!(config.probe);
    }

    #[test]
    fn index_report_defaults() {
        let report = IndexReport::default();
        assert_eq!(report.files_scanned, 0);
        assert_eq!(report.embedding_calls, 0);
    }

    #[test]
    fn index_report_display() {
        let report = IndexReport {
            files_scanned: 3,
            files_embedded: 1,
            files_skipped: 2,
            chunks_created: 4,
            chunks_skipped: 5,
            chunks_removed: 2,
            embedding_calls: 1,
            duration_ms: 12,
        };
        let text = report.to_string();
        assert!(text.starts_with("scanned 3 files: 1 embedded, 2 unchanged"));
        assert!(text.contains("4 new chunks"));
        assert!(text.contains("2 stale removed"));
    }

    #[tokio::test]
    async fn provider_without_embeddings_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();

        let provider = MockProvider::default().without_embeddings();
        let store = Arc::new(InMemoryVectorStore::new());
        let config = IndexerConfig {
            probe: false,
            ..IndexerConfig::default()
        };
        let idx = indexer(store.clone(), provider.clone(), config);

        let err = idx.index_directory(dir.path()).await.unwrap_err();
        assert!(matches!(
            err,
            IndexError::Llm(LlmError::EmbedUnsupported { provider: "mock" })
        ));
        assert!(matches!(
            idx.probe().await.unwrap_err(),
            IndexError::Llm(LlmError::EmbedUnsupported { .. })
        ));
        assert!(provider.embed_calls().is_empty());
        assert_eq!(store.count("codebase").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn probe_embeds_hello_world() {
        let provider = MockProvider::default();
        let idx = indexer(
            Arc::new(InMemoryVectorStore::new()),
            provider.clone(),
            IndexerConfig::default(),
        );
        let dim = idx.probe().await.unwrap();
        assert_eq!(dim, codeqa_llm::mock::MOCK_EMBEDDING_DIM);
        assert_eq!(provider.embed_calls(), vec![vec![PROBE_TEXT.to_owned()]]);
    }

    #[tokio::test]
    async fn one_batch_per_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x".repeat(1200)).unwrap();
        std::fs::write(dir.path().join("b.md"), "short").unwrap();

        let provider = MockProvider::default();
        let store = Arc::new(InMemoryVectorStore::new());
        let config = IndexerConfig {
            probe: false,
            ..IndexerConfig::default()
        };
        let report = indexer(store.clone(), provider.clone(), config)
            .index_directory(dir.path())
            .await
            .unwrap();

        let sizes: Vec<_> = provider.embed_calls().iter().map(Vec::len).collect();
        assert_eq!(sizes, [3, 1]);
        assert_eq!(report.files_embedded, 2);
        assert_eq!(report.chunks_created, 4);
        assert_eq!(report.embedding_calls, 2);
        assert_eq!(store.count("codebase").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn duplicate_ids_within_a_run_are_embedded_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("one")).unwrap();
        std::fs::create_dir_all(dir.path().join("two")).unwrap();
        std::fs::write(dir.path().join("one/notes.txt"), "first").unwrap();
        std::fs::write(dir.path().join("two/notes.txt"), "second").unwrap();

        let provider = MockProvider::default();
        let config = IndexerConfig {
            probe: false,
            id_scheme: IdScheme::Legacy,
            ..IndexerConfig::default()
        };
        let report = indexer(Arc::new(InMemoryVectorStore::new()), provider.clone(), config)
            .index_directory(dir.path())
            .await
            .unwrap();

        assert_eq!(provider.embedded_text_count(), 1);
        assert_eq!(report.files_embedded, 1);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.chunks_skipped, 1);
    }

    #[tokio::test]
    async fn embedding_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "text").unwrap();

        let provider = MockProvider::default().failing_embed();
        let config = IndexerConfig {
            probe: false,
            ..IndexerConfig::default()
        };
        let result = indexer(Arc::new(InMemoryVectorStore::new()), provider, config)
            .index_directory(dir.path())
            .await;
        assert!(matches!(result, Err(crate::IndexError::Llm(_))));
    }
}
