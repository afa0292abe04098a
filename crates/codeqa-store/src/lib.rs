//! Vector stores for embedded source chunks.
//!
//! [`SqliteVectorStore`] is the persistent local default, [`QdrantVectorStore`]
//! talks to a remote Qdrant instance and [`InMemoryVectorStore`] keeps
//! everything in process.

pub mod error;
pub mod in_memory;
pub mod qdrant;
pub mod sqlite;
pub mod vector_store;

pub use error::VectorStoreError;
pub use in_memory::InMemoryVectorStore;
pub use qdrant::QdrantVectorStore;
pub use sqlite::SqliteVectorStore;
pub use vector_store::{
    BoxFuture, ChunkMetadata, EmbeddingRecord, GetResult, QueryHit, VectorStore,
    cosine_similarity,
};
