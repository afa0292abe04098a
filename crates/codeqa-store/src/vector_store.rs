use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::VectorStoreError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Metadata stored alongside every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// File the chunk was cut from, as named by the id scheme in use.
    pub source: String,
}

impl ChunkMetadata {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// One embedded chunk as written to a store.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: String,
    pub metadata: ChunkMetadata,
}

/// A page of ids (and their metadata) returned by [`VectorStore::get`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetResult {
    pub ids: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
}

impl GetResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A nearest-neighbour match. Smaller `distance` means closer.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    /// `1 - cosine_similarity`.
    pub distance: f32,
}

/// Storage for embedded chunks, keyed by chunk id within a named collection.
///
/// Reads against a collection that does not exist yet behave as reads of an
/// empty collection. Writes require [`VectorStore::ensure_collection`] first.
/// Adding a record whose id already exists overwrites it.
pub trait VectorStore: Send + Sync {
    /// Create the collection if missing. Idempotent.
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Return up to `limit` ids starting at `offset` in a stable order.
    fn get(
        &self,
        collection: &str,
        limit: u64,
        offset: u64,
    ) -> BoxFuture<'_, Result<GetResult, VectorStoreError>>;

    fn add(
        &self,
        collection: &str,
        records: Vec<EmbeddingRecord>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Return the `n` records closest to `vector`, nearest first.
    fn query(
        &self,
        collection: &str,
        vector: Vec<f32>,
        n: u64,
    ) -> BoxFuture<'_, Result<Vec<QueryHit>, VectorStoreError>>;

    fn delete(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>>;
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every candidate against `query` and keep the `n` nearest.
pub(crate) fn rank_nearest<I>(query: &[f32], candidates: I, n: u64) -> Vec<QueryHit>
where
    I: IntoIterator<Item = (String, String, ChunkMetadata, Vec<f32>)>,
{
    let mut hits: Vec<QueryHit> = candidates
        .into_iter()
        .map(|(id, document, metadata, vector)| QueryHit {
            distance: 1.0 - cosine_similarity(query, &vector),
            id,
            document,
            metadata,
        })
        .collect();
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(usize::try_from(n).unwrap_or(usize::MAX));
    hits
}
