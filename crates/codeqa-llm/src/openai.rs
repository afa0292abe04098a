use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

/// Wire dialect spoken by an OpenAI-style endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApiStyle {
    /// `{base_url}/{operation}` with bearer auth.
    OpenAi,
    /// `{endpoint}/openai/deployments/{deployment}/{operation}?api-version=..`
    /// with an `api-key` header.
    Azure { api_version: String },
}

#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
    style: ApiStyle,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("style", &self.style)
            .finish()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        mut base_url: String,
        model: String,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client,
            api_key,
            base_url,
            model,
            max_tokens: None,
            style: ApiStyle::OpenAi,
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub(crate) fn with_style(mut self, style: ApiStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, operation: &str) -> String {
        match &self.style {
            ApiStyle::OpenAi => format!("{}/{operation}", self.base_url),
            ApiStyle::Azure { api_version } => format!(
                "{}/openai/deployments/{}/{operation}?api-version={api_version}",
                self.base_url, self.model
            ),
        }
    }

    fn provider_name(&self) -> &'static str {
        match self.style {
            ApiStyle::OpenAi => "openai",
            ApiStyle::Azure { .. } => "azure",
        }
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        body: &B,
    ) -> Result<String, LlmError> {
        let request = self.client.post(self.endpoint(operation)).json(body);
        let request = match self.style {
            ApiStyle::OpenAi => request.bearer_auth(&self.api_key),
            ApiStyle::Azure { .. } => request.header("api-key", &self.api_key),
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            tracing::error!(
                provider = self.provider_name(),
                %status,
                "{operation} request failed: {text}"
            );
            return Err(LlmError::Api {
                provider: self.provider_name(),
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: self.max_tokens,
        };

        let text = self.post_json("chat/completions", &body).await?;
        let resp: ChatResponse = serde_json::from_str(&text)?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse {
                provider: self.provider_name(),
            })
    }

    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            tracing::warn!("no texts to embed, skipping embedding request");
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            input: inputs,
            model: &self.model,
        };

        let text = self.post_json("embeddings", &body).await?;
        let resp: EmbeddingResponse = serde_json::from_str(&text)?;
        ordered_vectors(resp, inputs.len())
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        self.provider_name()
    }
}

fn ordered_vectors(mut resp: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>, LlmError> {
    if resp.data.len() != expected {
        return Err(LlmError::EmbeddingCountMismatch {
            expected,
            actual: resp.data.len(),
        });
    }
    resp.data.sort_by_key(|d| d.index);
    Ok(resp.data.into_iter().map(|d| d.embedding).collect())
}

fn convert_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .map(|msg| ApiMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        })
        .collect()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [&'a str],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
