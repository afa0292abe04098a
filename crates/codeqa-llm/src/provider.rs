use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

pub trait LlmProvider: Send + Sync {
    /// Send messages to the model and return the first completion verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(&self, messages: &[Message]) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Embed a batch of inputs. The result holds one vector per input, in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the request or returns a
    /// different number of vectors than inputs.
    fn embed_batch(
        &self,
        inputs: &[&str],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send;

    /// Embed a single input as a one-item batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying batch call fails or yields no vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send {
        async move {
            let mut vectors = self.embed_batch(&[text]).await?;
            vectors.pop().ok_or(LlmError::EmptyResponse {
                provider: self.name(),
            })
        }
    }

    fn supports_embeddings(&self) -> bool;

    fn name(&self) -> &'static str;
}
