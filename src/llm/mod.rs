//! LLM integration for the agent.
//!
//! A single provider seam serves the three model-backed tasks: route
//! classification, answer synthesis, and issue summarization. The shipped
//! backend speaks the OpenAI Chat Completions API, which covers OpenRouter,
//! local inference servers, and most hosted gateways.

mod openai_compatible;
mod provider;
pub mod tasks;

pub use openai_compatible::OpenAiCompatibleProvider;
pub use provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role};
pub use tasks::{IssueSummarizer, Synthesis, Synthesizer};

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Create an LLM provider based on configuration.
pub fn create_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    Ok(Arc::new(OpenAiCompatibleProvider::new(config.clone())?))
}
