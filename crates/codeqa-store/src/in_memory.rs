use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::VectorStoreError;
use crate::vector_store::{
    BoxFuture, ChunkMetadata, EmbeddingRecord, GetResult, QueryHit, VectorStore, rank_nearest,
};

struct StoredRecord {
    vector: Vec<f32>,
    document: String,
    metadata: ChunkMetadata,
}

struct InMemoryCollection {
    dimension: usize,
    /// Insertion order of ids; `get` pages over this.
    order: Vec<String>,
    records: HashMap<String, StoredRecord>,
}

/// Process-local store. Contents are lost when the process exits.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, InMemoryCollection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore").finish_non_exhaustive()
    }
}

fn to_index(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

impl VectorStore for InMemoryVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let dimension = usize::try_from(vector_size)
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            let col = cols
                .entry(collection)
                .or_insert_with(|| InMemoryCollection {
                    dimension,
                    order: Vec::new(),
                    records: HashMap::new(),
                });
            if col.dimension != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: col.dimension,
                    actual: dimension,
                });
            }
            Ok(())
        })
    }

    fn get(
        &self,
        collection: &str,
        limit: u64,
        offset: u64,
    ) -> BoxFuture<'_, Result<GetResult, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Scroll(e.to_string()))?;
            let Some(col) = cols.get(&collection) else {
                return Ok(GetResult::default());
            };
            let mut page = GetResult::default();
            for id in col.order.iter().skip(to_index(offset)).take(to_index(limit)) {
                if let Some(record) = col.records.get(id) {
                    page.ids.push(id.clone());
                    page.metadatas.push(record.metadata.clone());
                }
            }
            Ok(page)
        })
    }

    fn add(
        &self,
        collection: &str,
        records: Vec<EmbeddingRecord>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            let col = cols.get_mut(&collection).ok_or_else(|| {
                VectorStoreError::Upsert(format!("collection {collection} not found"))
            })?;
            if let Some(bad) = records.iter().find(|r| r.vector.len() != col.dimension) {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: col.dimension,
                    actual: bad.vector.len(),
                });
            }
            for r in records {
                if !col.records.contains_key(&r.id) {
                    col.order.push(r.id.clone());
                }
                col.records.insert(
                    r.id,
                    StoredRecord {
                        vector: r.vector,
                        document: r.document,
                        metadata: r.metadata,
                    },
                );
            }
            Ok(())
        })
    }

    fn query(
        &self,
        collection: &str,
        vector: Vec<f32>,
        n: u64,
    ) -> BoxFuture<'_, Result<Vec<QueryHit>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            let Some(col) = cols.get(&collection) else {
                return Ok(Vec::new());
            };
            let candidates = col.order.iter().filter_map(|id| {
                col.records.get(id).map(|r| {
                    (
                        id.clone(),
                        r.document.clone(),
                        r.metadata.clone(),
                        r.vector.clone(),
                    )
                })
            });
            Ok(rank_nearest(&vector, candidates, n))
        })
    }

    fn delete(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut cols = self
                .collections
                .write()
                .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
            let Some(col) = cols.get_mut(&collection) else {
                return Ok(());
            };
            for id in &ids {
                col.records.remove(id);
            }
            col.order.retain(|id| col.records.contains_key(id));
            Ok(())
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let cols = self
                .collections
                .read()
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(cols
                .get(&collection)
                .map_or(0, |c| u64::try_from(c.records.len()).unwrap_or(u64::MAX)))
        })
    }
}
