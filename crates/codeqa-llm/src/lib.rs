//! Embedding and generation gateways for codeqa.
//!
//! Both gateways sit behind the [`LlmProvider`] trait so the indexer and the
//! query engine can be driven by the real HTTP clients or by a test double.

pub mod any;
pub mod azure;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;

pub use error::LlmError;
pub use provider::{LlmProvider, Message, Role};
