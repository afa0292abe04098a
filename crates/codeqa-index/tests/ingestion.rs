use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use codeqa_index::reconcile::load_existing_ids;
use codeqa_index::{DecodePolicy, IdScheme, IndexError, Indexer, IndexerConfig};
use codeqa_llm::mock::MockProvider;
use codeqa_store::{
    BoxFuture, ChunkMetadata, EmbeddingRecord, GetResult, InMemoryVectorStore, QueryHit,
    SqliteVectorStore, VectorStore, VectorStoreError,
};

/// Store wrapper counting paginated reads and writes.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryVectorStore,
    gets: AtomicUsize,
    adds: AtomicUsize,
}

impl VectorStore for CountingStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        self.inner.ensure_collection(collection, vector_size)
    }

    fn get(
        &self,
        collection: &str,
        limit: u64,
        offset: u64,
    ) -> BoxFuture<'_, Result<GetResult, VectorStoreError>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(collection, limit, offset)
    }

    fn add(
        &self,
        collection: &str,
        records: Vec<EmbeddingRecord>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.inner.add(collection, records)
    }

    fn query(
        &self,
        collection: &str,
        vector: Vec<f32>,
        n: u64,
    ) -> BoxFuture<'_, Result<Vec<QueryHit>, VectorStoreError>> {
        self.inner.query(collection, vector, n)
    }

    fn delete(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        self.inner.delete(collection, ids)
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        self.inner.count(collection)
    }
}

fn legacy_config() -> IndexerConfig {
    IndexerConfig {
        id_scheme: IdScheme::Legacy,
        probe: false,
        ..IndexerConfig::default()
    }
}

async fn seed(store: &dyn VectorStore, ids: impl IntoIterator<Item = String>) {
    store
        .ensure_collection("codebase", codeqa_llm::mock::MOCK_EMBEDDING_DIM as u64)
        .await
        .unwrap();
    let records = ids
        .into_iter()
        .map(|id| EmbeddingRecord {
            id,
            vector: codeqa_llm::mock::mock_embedding("seed"),
            document: "seed".into(),
            metadata: ChunkMetadata::new("seed.txt"),
        })
        .collect();
    store.add("codebase", records).await.unwrap();
}

#[tokio::test]
async fn second_run_over_unchanged_tree_embeds_nothing() {
    let src = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(src.path().join("Models")).unwrap();
    std::fs::write(src.path().join("Program.cs"), "class Program {}\n".repeat(80)).unwrap();
    std::fs::write(src.path().join("Models/User.cs"), "class User {}").unwrap();
    std::fs::write(src.path().join("README.md"), "# Demo").unwrap();

    let db_dir = tempfile::tempdir().unwrap();
    let db_path = db_dir.path().join("store.db");
    let db_path = db_path.to_str().unwrap();

    let first_provider = MockProvider::default();
    {
        let store = Arc::new(SqliteVectorStore::open(db_path).await.unwrap());
        let report = Indexer::new(store, Arc::new(first_provider.clone()), IndexerConfig::default())
            .index_directory(src.path())
            .await
            .unwrap();
        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.files_embedded, 3);
        assert!(report.chunks_created >= 4);
    }

    let second_provider = MockProvider::default();
    let store = Arc::new(SqliteVectorStore::open(db_path).await.unwrap());
    let report = Indexer::new(store, Arc::new(second_provider.clone()), IndexerConfig::default())
        .index_directory(src.path())
        .await
        .unwrap();

    // Only the startup probe reaches the gateway.
    assert_eq!(
        second_provider.embed_calls(),
        vec![vec![codeqa_index::indexer::PROBE_TEXT.to_owned()]]
    );
    assert_eq!(report.chunks_created, 0);
    assert_eq!(report.embedding_calls, 0);
    assert_eq!(report.files_skipped, 3);
}

#[tokio::test]
async fn only_unseen_chunk_of_partially_stored_file_is_embedded() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("a.txt"), "x".repeat(1200)).unwrap();

    let store = Arc::new(CountingStore::default());
    seed(store.as_ref(), ["a.txt_0".to_owned(), "a.txt_1".to_owned()]).await;
    let adds_before = store.adds.load(Ordering::SeqCst);

    let provider = MockProvider::default();
    let report = Indexer::new(store.clone(), Arc::new(provider.clone()), legacy_config())
        .index_directory(src.path())
        .await
        .unwrap();

    assert_eq!(provider.embed_calls(), vec![vec!["x".repeat(200)]]);
    assert_eq!(store.adds.load(Ordering::SeqCst) - adds_before, 1);
    assert_eq!(report.chunks_created, 1);
    assert_eq!(report.chunks_skipped, 2);

    let page = store.get("codebase", 10, 0).await.unwrap();
    assert_eq!(page.ids, ["a.txt_0", "a.txt_1", "a.txt_2"]);
    assert_eq!(page.metadatas[2].source, "a.txt");
}

#[tokio::test]
async fn empty_file_makes_no_embedding_call() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("empty.md"), "").unwrap();

    let store = Arc::new(CountingStore::default());
    let provider = MockProvider::default();
    let report = Indexer::new(store.clone(), Arc::new(provider.clone()), legacy_config())
        .index_directory(src.path())
        .await
        .unwrap();

    assert!(provider.embed_calls().is_empty());
    assert_eq!(store.adds.load(Ordering::SeqCst), 0);
    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.chunks_created, 0);
}

#[tokio::test]
async fn enumerating_250_ids_takes_three_reads() {
    let store = CountingStore::default();
    seed(&store, (0..250).map(|i| format!("f_{i}"))).await;

    let ids = load_existing_ids(&store, "codebase", 100).await.unwrap();
    assert_eq!(ids.len(), 250);
    assert_eq!(store.gets.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn enumerating_full_pages_ends_on_empty_page() {
    let store = CountingStore::default();
    seed(&store, (0..200).map(|i| format!("f_{i}"))).await;

    let ids = load_existing_ids(&store, "codebase", 100).await.unwrap();
    assert_eq!(ids.len(), 200);
    assert_eq!(store.gets.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn enumerating_missing_collection_takes_one_read() {
    let store = CountingStore::default();
    let ids = load_existing_ids(&store, "codebase", 100).await.unwrap();
    assert!(ids.is_empty());
    assert_eq!(store.gets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn edited_chunk_replaces_its_stored_record() {
    let src = tempfile::tempdir().unwrap();
    let file = src.path().join("notes.txt");
    std::fs::write(&file, format!("{}{}", "a".repeat(500), "b".repeat(10))).unwrap();

    let store = Arc::new(InMemoryVectorStore::new());
    let config = IndexerConfig {
        probe: false,
        ..IndexerConfig::default()
    };
    Indexer::new(store.clone(), Arc::new(MockProvider::default()), config.clone())
        .index_directory(src.path())
        .await
        .unwrap();

    std::fs::write(&file, format!("{}{}", "a".repeat(500), "c".repeat(10))).unwrap();
    let provider = MockProvider::default();
    let report = Indexer::new(store.clone(), Arc::new(provider.clone()), config)
        .index_directory(src.path())
        .await
        .unwrap();

    assert_eq!(provider.embed_calls(), vec![vec!["c".repeat(10)]]);
    assert_eq!(report.chunks_skipped, 1);
    assert_eq!(report.chunks_removed, 1);
    assert_eq!(store.count("codebase").await.unwrap(), 2);

    let documents: Vec<_> = store
        .query("codebase", codeqa_llm::mock::mock_embedding("c"), 10)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.document)
        .collect();
    assert!(documents.contains(&"c".repeat(10)));
    assert!(!documents.contains(&"b".repeat(10)));
}

#[tokio::test]
async fn shrinking_file_drops_trailing_chunks() {
    let src = tempfile::tempdir().unwrap();
    let file = src.path().join("a.txt");
    std::fs::write(&file, "x".repeat(1200)).unwrap();

    let store = Arc::new(CountingStore::default());
    Indexer::new(store.clone(), Arc::new(MockProvider::default()), legacy_config())
        .index_directory(src.path())
        .await
        .unwrap();
    assert_eq!(store.count("codebase").await.unwrap(), 3);

    std::fs::write(&file, "x".repeat(500)).unwrap();
    let provider = MockProvider::default();
    let report = Indexer::new(store.clone(), Arc::new(provider.clone()), legacy_config())
        .index_directory(src.path())
        .await
        .unwrap();

    assert!(provider.embed_calls().is_empty());
    assert_eq!(report.chunks_removed, 2);
    assert_eq!(store.get("codebase", 10, 0).await.unwrap().ids, ["a.txt_0"]);
}

#[tokio::test]
async fn emptied_file_loses_all_records_but_other_sources_stay() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("a.txt"), "alpha").unwrap();

    let store = Arc::new(CountingStore::default());
    seed(store.as_ref(), ["seed.txt_0".to_owned()]).await;
    Indexer::new(store.clone(), Arc::new(MockProvider::default()), legacy_config())
        .index_directory(src.path())
        .await
        .unwrap();

    std::fs::write(src.path().join("a.txt"), "").unwrap();
    let report = Indexer::new(store.clone(), Arc::new(MockProvider::default()), legacy_config())
        .index_directory(src.path())
        .await
        .unwrap();

    assert_eq!(report.chunks_removed, 1);
    assert_eq!(store.get("codebase", 10, 0).await.unwrap().ids, ["seed.txt_0"]);
}

#[tokio::test]
async fn strict_decode_aborts_on_invalid_utf8() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("bad.txt"), b"ok \xff\xfe bytes").unwrap();

    let config = IndexerConfig {
        decode: DecodePolicy::Strict,
        probe: false,
        ..IndexerConfig::default()
    };
    let result = Indexer::new(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(MockProvider::default()),
        config,
    )
    .index_directory(src.path())
    .await;

    assert!(matches!(result, Err(IndexError::Decode { .. })));
}

#[tokio::test]
async fn lossy_decode_embeds_remaining_text() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("bad.txt"), b"ok \xff\xfe bytes").unwrap();

    let provider = MockProvider::default();
    Indexer::new(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(provider.clone()),
        legacy_config(),
    )
    .index_directory(src.path())
    .await
    .unwrap();

    assert_eq!(provider.embed_calls(), vec![vec!["ok  bytes".to_owned()]]);
}

#[tokio::test]
async fn files_outside_allow_list_are_ignored() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("main.rs"), "fn main() {}").unwrap();
    std::fs::write(src.path().join("notes.txt"), "notes").unwrap();

    let provider = MockProvider::default();
    let report = Indexer::new(
        Arc::new(InMemoryVectorStore::new()),
        Arc::new(provider.clone()),
        legacy_config(),
    )
    .index_directory(src.path())
    .await
    .unwrap();

    assert_eq!(report.files_scanned, 1);
    assert_eq!(provider.embed_calls(), vec![vec!["notes".to_owned()]]);
}
