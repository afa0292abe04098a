use std::fmt;

use crate::error::LlmError;
use crate::openai::{ApiStyle, OpenAiProvider};
use crate::provider::{LlmProvider, Message};

/// Azure OpenAI deployment. Requests are routed by deployment name rather
/// than by model and authenticated with an `api-key` header.
#[derive(Clone)]
pub struct AzureOpenAiProvider {
    inner: OpenAiProvider,
}

impl AzureOpenAiProvider {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        endpoint: String,
        deployment: String,
        api_version: String,
    ) -> Self {
        let inner = OpenAiProvider::new(client, api_key, endpoint, deployment)
            .with_style(ApiStyle::Azure { api_version });
        Self { inner }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.inner = self.inner.with_max_tokens(max_tokens);
        self
    }

    #[must_use]
    pub fn deployment(&self) -> &str {
        self.inner.model()
    }
}

impl fmt::Debug for AzureOpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAiProvider")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl LlmProvider for AzureOpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.inner.chat(messages).await
    }

    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.inner.embed_batch(inputs).await
    }

    fn supports_embeddings(&self) -> bool {
        self.inner.supports_embeddings()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
