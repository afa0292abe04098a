//! Question answering: embed → retrieve → prompt → generate.

use std::sync::Arc;

use codeqa_llm::{LlmProvider, Message};
use codeqa_store::{QueryHit, VectorStore};

use crate::error::Result;
use crate::indexer::{DEFAULT_COLLECTION, require_embeddings};

/// Placed between retrieved chunks in the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

pub const DEFAULT_TOP_K: u64 = 3;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions about the user's codebase written in C#.";

/// Retrieval and prompting settings.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub collection: String,
    pub top_k: u64,
    pub system_prompt: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.into(),
            top_k: DEFAULT_TOP_K,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        }
    }
}

/// Join retrieved documents in store order.
#[must_use]
pub fn build_context(hits: &[QueryHit]) -> String {
    hits.iter()
        .map(|h| h.document.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[must_use]
pub fn build_messages(system_prompt: &str, context: &str, question: &str) -> Vec<Message> {
    vec![
        Message::system(system_prompt),
        Message::user(format!("Context:\n{context}\n\nQuestion: {question}")),
    ]
}

/// Answers questions using the embedding gateway `E`, the generation
/// gateway `C` and a vector store.
pub struct QueryEngine<E: LlmProvider, C: LlmProvider> {
    store: Arc<dyn VectorStore>,
    embedder: Arc<E>,
    chat: Arc<C>,
    config: QueryConfig,
}

impl<E: LlmProvider, C: LlmProvider> QueryEngine<E, C> {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<E>,
        chat: Arc<C>,
        config: QueryConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            chat,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Return the `top_k` stored chunks nearest to `question`.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedder cannot embed, or if embedding or
    /// search fails.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<QueryHit>> {
        require_embeddings(self.embedder.as_ref())?;
        let vector = self.embedder.embed(question).await?;
        let hits = self
            .store
            .query(&self.config.collection, vector, self.config.top_k)
            .await?;
        tracing::debug!(
            hits = hits.len(),
            ids = ?hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(),
            "retrieved context"
        );
        Ok(hits)
    }

    /// Answer `question` from retrieved context. The generated text is
    /// returned verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding, search or generation fails.
    pub async fn ask(&self, question: &str) -> Result<String> {
        let hits = self.retrieve(question).await?;
        if hits.is_empty() {
            tracing::warn!("no stored chunks matched; answering without context");
        }
        let context = build_context(&hits);
        let messages = build_messages(&self.config.system_prompt, &context, question);
        Ok(self.chat.chat(&messages).await?)
    }
}
