//! Remote store backed by a Qdrant collection.

use std::collections::HashMap;
use std::sync::Mutex;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId,
    PointStruct, PointsIdsList, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder, point_id::PointIdOptions, value::Kind,
};

use crate::error::VectorStoreError;
use crate::vector_store::{
    BoxFuture, ChunkMetadata, EmbeddingRecord, GetResult, QueryHit, VectorStore,
};

const FIELD_CHUNK_ID: &str = "chunk_id";
const FIELD_DOCUMENT: &str = "document";
const FIELD_SOURCE: &str = "source";

/// Scroll cursor left behind by the previous page: the numeric offset the
/// next page starts at and the point id to resume from (`None` once exhausted).
type Cursor = (u64, Option<PointId>);

pub struct QdrantVectorStore {
    client: Qdrant,
    cursors: Mutex<HashMap<String, Cursor>>,
}

impl std::fmt::Debug for QdrantVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantVectorStore").finish_non_exhaustive()
    }
}

/// Qdrant only accepts integers and UUIDs as point ids, so chunk ids are
/// mapped through a name-based UUID and kept verbatim in the payload.
#[must_use]
pub fn point_id_for(chunk_id: &str) -> String {
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, chunk_id.as_bytes()).to_string()
}

fn string_field(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<String> {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Textual form of a point id, used in place of a missing `chunk_id`.
fn point_label(id: Option<&PointId>) -> String {
    match id.and_then(|p| p.point_id_options.as_ref()) {
        Some(PointIdOptions::Num(n)) => n.to_string(),
        Some(PointIdOptions::Uuid(u)) => u.clone(),
        None => String::new(),
    }
}

fn record_payload(
    record: &EmbeddingRecord,
) -> Result<HashMap<String, QdrantValue>, VectorStoreError> {
    serde_json::from_value(serde_json::json!({
        FIELD_CHUNK_ID: record.id,
        FIELD_DOCUMENT: record.document,
        FIELD_SOURCE: record.metadata.source,
    }))
    .map_err(|e| VectorStoreError::Serialization(e.to_string()))
}

fn to_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

impl QdrantVectorStore {
    /// Create a store for the Qdrant instance at `url`. No request is made
    /// until the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the Qdrant client cannot be created.
    pub fn new(url: &str) -> Result<Self, VectorStoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            cursors: Mutex::new(HashMap::new()),
        })
    }

    async fn exists(&self, collection: &str) -> Result<bool, VectorStoreError> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(|e| VectorStoreError::Connection(e.to_string()))
    }

    fn cached_cursor(&self, collection: &str, offset: u64) -> Option<Option<PointId>> {
        let cursors = self.cursors.lock().ok()?;
        match cursors.get(collection) {
            Some((at, point)) if *at == offset => Some(point.clone()),
            _ => None,
        }
    }

    fn remember_cursor(&self, collection: &str, cursor: Cursor) {
        if let Ok(mut cursors) = self.cursors.lock() {
            cursors.insert(collection.to_owned(), cursor);
        }
    }

    /// Resolve the point id at which page `offset` starts by scrolling past
    /// the first `offset` points. `None` means the collection is shorter.
    async fn skip_to(
        &self,
        collection: &str,
        offset: u64,
    ) -> Result<Option<PointId>, VectorStoreError> {
        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(collection)
                    .with_payload(false)
                    .with_vectors(false)
                    .limit(to_u32(offset)),
            )
            .await
            .map_err(|e| VectorStoreError::Scroll(e.to_string()))?;
        Ok(response.next_page_offset)
    }
}

impl VectorStore for QdrantVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if self.exists(&collection).await? {
                return Ok(());
            }
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&collection)
                        .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
                )
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            tracing::info!(collection = %collection, vector_size, "created qdrant collection");
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
            let start = if offset == 0 {
                if !self.exists(&collection).await? {
                    return Ok(GetResult::default());
                }
                None
            } else {
                let resolved = match self.cached_cursor(&collection, offset) {
                    Some(point) => point,
                    None => self.skip_to(&collection, offset).await?,
                };
                let Some(point) = resolved else {
                    return Ok(GetResult::default());
                };
                Some(point)
            };

            let mut builder = ScrollPointsBuilder::new(&collection)
                .with_payload(true)
                .with_vectors(false)
                .limit(to_u32(limit));
            if let Some(point) = start {
                builder = builder.offset(point);
            }
            let response = self
                .client
                .scroll(builder)
                .await
                .map_err(|e| VectorStoreError::Scroll(e.to_string()))?;

            let mut page = GetResult::default();
            // Every scrolled point stays in the page so its length keeps
            // matching the offset arithmetic below.
            for point in &response.result {
                let id = string_field(&point.payload, FIELD_CHUNK_ID).unwrap_or_else(|| {
                    let label = point_label(point.id.as_ref());
                    tracing::warn!(
                        collection = %collection,
                        point = %label,
                        "point has no chunk_id payload, listing it by point id"
                    );
                    label
                });
                let source = string_field(&point.payload, FIELD_SOURCE).unwrap_or_default();
                page.ids.push(id);
                page.metadatas.push(ChunkMetadata { source });
            }

            let next = offset.saturating_add(u64::try_from(response.result.len()).unwrap_or(u64::MAX));
            self.remember_cursor(&collection, (next, response.next_page_offset));
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
            if records.is_empty() {
                return Ok(());
            }
            let mut points = Vec::with_capacity(records.len());
            for record in &records {
                let payload = record_payload(record)?;
                points.push(PointStruct::new(
                    point_id_for(&record.id),
                    record.vector.clone(),
                    payload,
                ));
            }
            self.client
                .upsert_points(UpsertPointsBuilder::new(&collection, points).wait(true))
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
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
            if !self.exists(&collection).await? {
                return Ok(Vec::new());
            }
            let results = self
                .client
                .search_points(
                    SearchPointsBuilder::new(&collection, vector, n).with_payload(true),
                )
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;

            Ok(results
                .result
                .into_iter()
                .filter_map(|point| {
                    Some(QueryHit {
                        id: string_field(&point.payload, FIELD_CHUNK_ID)?,
                        document: string_field(&point.payload, FIELD_DOCUMENT)
                            .unwrap_or_default(),
                        metadata: ChunkMetadata {
                            source: string_field(&point.payload, FIELD_SOURCE)
                                .unwrap_or_default(),
                        },
                        distance: 1.0 - point.score,
                    })
                })
                .collect())
        })
    }

    fn delete(
        &self,
        collection: &str,
        ids: Vec<String>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(());
            }
            let ids: Vec<PointId> = ids.iter().map(|id| point_id_for(id).into()).collect();
            self.client
                .delete_points(
                    DeletePointsBuilder::new(&collection)
                        .points(PointsIdsList { ids })
                        .wait(true),
                )
                .await
                .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
            if let Ok(mut cursors) = self.cursors.lock() {
                cursors.remove(&collection);
            }
            Ok(())
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if !self.exists(&collection).await? {
                return Ok(0);
            }
            let response = self
                .client
                .count(CountPointsBuilder::new(&collection).exact(true))
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(response.result.map_or(0, |r| r.count))
        })
    }
}
