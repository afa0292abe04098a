//! Test-only mock LLM provider.
//!
//! Embeddings are deterministic: every input maps to the same normalized
//! vector on every call, so retrieval order in tests is stable.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

pub const MOCK_EMBEDDING_DIM: usize = 8;

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    embed_calls: Arc<Mutex<Vec<Vec<String>>>>,
    chat_calls: Arc<Mutex<Vec<Vec<Message>>>>,
    pub default_response: String,
    pub supports_embeddings: bool,
    pub fail_chat: bool,
    pub fail_embed: bool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            embed_calls: Arc::new(Mutex::new(Vec::new())),
            chat_calls: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            supports_embeddings: true,
            fail_chat: false,
            fail_embed: false,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            fail_embed: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn without_embeddings(mut self) -> Self {
        self.supports_embeddings = false;
        self
    }

    #[must_use]
    pub fn failing_embed(mut self) -> Self {
        self.fail_embed = true;
        self
    }

    /// Every batch passed to `embed_batch`, in call order.
    #[must_use]
    pub fn embed_calls(&self) -> Vec<Vec<String>> {
        lock(&self.embed_calls).clone()
    }

    /// Every message list passed to `chat`, in call order.
    #[must_use]
    pub fn chat_calls(&self) -> Vec<Vec<Message>> {
        lock(&self.chat_calls).clone()
    }

    /// Total number of texts embedded across all calls.
    #[must_use]
    pub fn embedded_text_count(&self) -> usize {
        lock(&self.embed_calls).iter().map(Vec::len).sum()
    }
}

/// Deterministic unit vector derived from the bytes of `text`.
#[must_use]
pub fn mock_embedding(text: &str) -> Vec<f32> {
    let mut v = [0.0f32; MOCK_EMBEDDING_DIM];
    for (i, b) in text.bytes().enumerate() {
        v[(usize::from(b) + i) % MOCK_EMBEDDING_DIM] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    } else {
        v[0] = 1.0;
    }
    v.to_vec()
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        lock(&self.chat_calls).push(messages.to_vec());
        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        let mut responses = lock(&self.responses);
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        if !self.supports_embeddings {
            return Err(LlmError::EmbedUnsupported { provider: "mock" });
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        lock(&self.embed_calls).push(inputs.iter().map(|s| (*s).to_owned()).collect());
        if self.fail_embed {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(inputs.iter().map(|s| mock_embedding(s)).collect())
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
