use std::path::Path;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::VectorStoreError;
use crate::vector_store::{
    BoxFuture, ChunkMetadata, EmbeddingRecord, GetResult, QueryHit, VectorStore, rank_nearest,
};

/// Persistent local store backed by a single `SQLite` file.
///
/// Vectors are stored as little-endian `f32` blobs and searched by brute-force
/// cosine distance. Page order for [`VectorStore::get`] is insertion order.
#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Missing parent directories are created. `:memory:` opens a private
    /// in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn open(path: &str) -> Result<Self, VectorStoreError> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| VectorStoreError::Connection(e.to_string()))?;
            }
            format!("sqlite:{path}?mode=rwc")
        };

        let opts = SqliteConnectOptions::from_str(&url)
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        // A pooled `:memory:` database is per-connection, so keep exactly one.
        let max_connections = if path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| VectorStoreError::Connection(format!("migration failed: {e}")))?;

        tracing::debug!(path, "opened sqlite vector store");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn dimension(&self, collection: &str) -> Result<Option<usize>, sqlx::Error> {
        let dim: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM collections WHERE name = ?")
                .bind(collection)
                .fetch_optional(&self.pool)
                .await?;
        Ok(dim.and_then(|d| usize::try_from(d).ok()))
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>, VectorStoreError> {
    if bytes.len() % 4 != 0 {
        return Err(VectorStoreError::Serialization(format!(
            "vector blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(c);
            f32::from_le_bytes(buf)
        })
        .collect())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl VectorStore for SqliteVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let dimension = usize::try_from(vector_size)
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            if let Some(existing) = self
                .dimension(&collection)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?
            {
                if existing != dimension {
                    return Err(VectorStoreError::DimensionMismatch {
                        expected: existing,
                        actual: dimension,
                    });
                }
                return Ok(());
            }
            sqlx::query("INSERT INTO collections (name, dimension) VALUES (?, ?)")
                .bind(&collection)
                .bind(to_i64(vector_size))
                .execute(&self.pool)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            tracing::info!(collection = %collection, dimension, "created collection");
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
            let rows: Vec<(String, String)> = sqlx::query_as(
                "SELECT chunk_id, source FROM embeddings \
                 WHERE collection = ? ORDER BY id LIMIT ? OFFSET ?",
            )
            .bind(&collection)
            .bind(to_i64(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VectorStoreError::Scroll(e.to_string()))?;

            let mut page = GetResult::default();
            for (id, source) in rows {
                page.ids.push(id);
                page.metadatas.push(ChunkMetadata { source });
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
            let dimension = self
                .dimension(&collection)
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?
                .ok_or_else(|| {
                    VectorStoreError::Upsert(format!("collection {collection} not found"))
                })?;
            if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: dimension,
                    actual: bad.vector.len(),
                });
            }

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            for r in &records {
                sqlx::query(
                    "INSERT INTO embeddings (collection, chunk_id, document, source, vector) \
                     VALUES (?, ?, ?, ?, ?) \
                     ON CONFLICT(collection, chunk_id) DO UPDATE SET \
                     document = excluded.document, source = excluded.source, \
                     vector = excluded.vector",
                )
                .bind(&collection)
                .bind(&r.id)
                .bind(&r.document)
                .bind(&r.metadata.source)
                .bind(encode_vector(&r.vector))
                .execute(&mut *tx)
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            }
            tx.commit()
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
            let rows: Vec<(String, String, String, Vec<u8>)> = sqlx::query_as(
                "SELECT chunk_id, document, source, vector FROM embeddings \
                 WHERE collection = ? ORDER BY id",
            )
            .bind(&collection)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VectorStoreError::Search(e.to_string()))?;

            let mut candidates = Vec::with_capacity(rows.len());
            for (id, document, source, blob) in rows {
                candidates.push((id, document, ChunkMetadata { source }, decode_vector(&blob)?));
            }
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
            if ids.is_empty() {
                return Ok(());
            }
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
            for id in &ids {
                sqlx::query("DELETE FROM embeddings WHERE collection = ? AND chunk_id = ?")
                    .bind(&collection)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
            }
            tx.commit()
                .await
                .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
            Ok(())
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM embeddings WHERE collection = ?")
                    .bind(&collection)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
    }
}
