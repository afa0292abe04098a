//! Incremental indexing and retrieval-augmented answering over a source tree.
//!
//! Files are cut into fixed-width chunks, only chunks whose ids are not yet
//! stored get embedded, and questions are answered from the nearest chunks.

pub mod chunker;
pub mod error;
pub mod ids;
pub mod indexer;
pub mod prune;
pub mod query;
pub mod reconcile;
pub mod walk;

pub use error::{IndexError, Result};
pub use ids::IdScheme;
pub use indexer::{IndexReport, Indexer, IndexerConfig};
pub use prune::{PruneReport, Pruner};
pub use query::{QueryConfig, QueryEngine};
pub use walk::DecodePolicy;
