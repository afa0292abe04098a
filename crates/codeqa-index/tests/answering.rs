use std::sync::Arc;

use codeqa_index::query::{CONTEXT_SEPARATOR, DEFAULT_SYSTEM_PROMPT};
use codeqa_index::{IdScheme, Indexer, IndexerConfig, Pruner, QueryConfig, QueryEngine};
use codeqa_llm::mock::MockProvider;
use codeqa_store::{SqliteVectorStore, VectorStore};

#[tokio::test]
async fn context_holds_top_three_hits_in_store_order() {
    let src = tempfile::tempdir().unwrap();
    for name in ["alpha.txt", "beta.txt", "gamma.txt", "delta.txt"] {
        std::fs::write(src.path().join(name), format!("contents of {name}")).unwrap();
    }

    let store = Arc::new(SqliteVectorStore::open(":memory:").await.unwrap());
    let embedder = Arc::new(MockProvider::default());
    Indexer::new(store.clone(), embedder.clone(), IndexerConfig::default())
        .index_directory(src.path())
        .await
        .unwrap();

    let question = "contents of beta.txt";
    let expected_hits = store
        .query(
            "codebase",
            codeqa_llm::mock::mock_embedding(question),
            3,
        )
        .await
        .unwrap();
    assert_eq!(expected_hits.len(), 3);
    assert_eq!(expected_hits[0].document, "contents of beta.txt");

    let chat = Arc::new(MockProvider::with_responses(vec!["Beta holds contents.".into()]));
    let engine = QueryEngine::new(store, embedder, chat.clone(), QueryConfig::default());
    let answer = engine.ask(question).await.unwrap();
    assert_eq!(answer, "Beta holds contents.");

    let expected_context = expected_hits
        .iter()
        .map(|h| h.document.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);
    let calls = chat.chat_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0].content, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(
        calls[0][1].content,
        format!("Context:\n{expected_context}\n\nQuestion: {question}")
    );
}

#[tokio::test]
async fn pruned_file_no_longer_answers() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("keep.md"), "kept document").unwrap();
    std::fs::write(src.path().join("drop.md"), "dropped document").unwrap();

    let store = Arc::new(SqliteVectorStore::open(":memory:").await.unwrap());
    let embedder = Arc::new(MockProvider::default());
    let config = IndexerConfig {
        id_scheme: IdScheme::Legacy,
        ..IndexerConfig::default()
    };
    Indexer::new(store.clone(), embedder.clone(), config.clone())
        .index_directory(src.path())
        .await
        .unwrap();
    assert_eq!(store.count("codebase").await.unwrap(), 2);

    std::fs::remove_file(src.path().join("drop.md")).unwrap();
    let report = Pruner::new(store.clone(), config)
        .prune(src.path())
        .await
        .unwrap();
    assert_eq!(report.records_deleted, 1);
    assert_eq!(report.orphaned_sources, ["drop.md"]);

    let hits = store
        .query("codebase", codeqa_llm::mock::mock_embedding("dropped"), 3)
        .await
        .unwrap();
    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, ["keep.md_0"]);
}

#[tokio::test]
async fn edited_file_answers_from_current_text_only() {
    let src = tempfile::tempdir().unwrap();
    let file = src.path().join("Config.cs");
    std::fs::write(&file, "const int Port = 8080;").unwrap();

    let store = Arc::new(SqliteVectorStore::open(":memory:").await.unwrap());
    let embedder = Arc::new(MockProvider::default());
    let indexer = Indexer::new(store.clone(), embedder.clone(), IndexerConfig::default());
    indexer.index_directory(src.path()).await.unwrap();

    std::fs::write(&file, "const int Port = 9090;").unwrap();
    indexer.index_directory(src.path()).await.unwrap();
    let report = Pruner::new(store.clone(), IndexerConfig::default())
        .prune(src.path())
        .await
        .unwrap();
    assert_eq!(report.records_deleted, 0);
    assert_eq!(store.count("codebase").await.unwrap(), 1);

    let chat = Arc::new(MockProvider::default());
    QueryEngine::new(store, embedder, chat.clone(), QueryConfig::default())
        .ask("what port?")
        .await
        .unwrap();
    assert_eq!(
        chat.chat_calls()[0][1].content,
        "Context:\nconst int Port = 9090;\n\nQuestion: what port?"
    );
}

#[tokio::test]
async fn question_against_empty_store_still_reaches_chat() {
    let store = Arc::new(SqliteVectorStore::open(":memory:").await.unwrap());
    let chat = Arc::new(MockProvider::default());
    let engine = QueryEngine::new(
        store,
        Arc::new(MockProvider::default()),
        chat.clone(),
        QueryConfig {
            top_k: 5,
            ..QueryConfig::default()
        },
    );

    let answer = engine.ask("anything?").await.unwrap();
    assert_eq!(answer, "mock response");
    assert_eq!(
        chat.chat_calls()[0][1].content,
        "Context:\n\n\nQuestion: anything?"
    );
}
