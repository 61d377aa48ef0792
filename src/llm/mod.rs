//! LLM provider abstraction layer.
//!
//! A trait-based seam over chat completion backends so the description
//! generator never depends on a concrete HTTP client.

mod openai;
mod provider;
mod types;

pub use openai::{ApiKeySource, OpenAIProvider, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use provider::{CompletionOptions, LlmError, LlmProvider};
pub use types::{CompletionResponse, FinishReason, Message, MessageRole, TokenUsage};
