//! Error types for codeqa-index.

use std::num::TryFromIntError;

/// Errors that can occur while indexing, pruning or answering.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error walking or reading source files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File content is not valid UTF-8 under the strict decode policy.
    #[error("{path} is not valid UTF-8")]
    Decode { path: String },

    /// Embedding or chat gateway error.
    #[error("LLM error: {0}")]
    Llm(#[from] codeqa_llm::LlmError),

    /// Vector store error.
    #[error("vector store error: {0}")]
    Store(#[from] codeqa_store::VectorStoreError),

    /// Integer conversion error.
    #[error("integer conversion failed: {0}")]
    IntConversion(#[from] TryFromIntError),

    /// Generic catch-all error.
    #[error("{0}")]
    Other(String),
}

impl From<ignore::Error> for IndexError {
    fn from(err: ignore::Error) -> Self {
        match err.into_io_error() {
            Some(io) => Self::Io(io),
            None => Self::Other("directory walk failed".into()),
        }
    }
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
