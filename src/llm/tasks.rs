//! Model-backed tasks: answer synthesis and issue summarization.
//!
//! Thin prompt wrappers over the provider seam. The routing classifier lives
//! in `crate::routing` next to the rest of the route policy.

use std::sync::Arc;

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::state::Chunk;

/// Reserved reply meaning "the provided context cannot answer the question".
/// Never surfaced to the user; the orchestrator treats it as a lookup miss.
pub const INSUFFICIENT_SENTINEL: &str = "CANNOT_ANSWER_WITH_CONTEXT";

/// Fixed context for the direct-answer route: a short platform description
/// the model answers from without any retrieval.
pub const PLATFORM_CONTEXT: &str = "BeWhoop is a social platform that connects vendors with \
event organizers and event seekers. We help you discover events in your favorite genres and \
provide easy booking services.\n\nKey features:\n\
- Event discovery and booking for event seekers\n\
- Vendor registration and management\n\
- Event organization tools\n\
- Seamless connection between all parties\n\n\
For non-BeWhoop questions, politely decline and redirect to BeWhoop topics.";

const SYNTH_SYSTEM_PROMPT: &str = "You are a helpful support assistant for BeWhoop services. \
Answer the user's question using only the provided context. If the context does not contain \
enough information to answer, reply with exactly CANNOT_ANSWER_WITH_CONTEXT and nothing else.";

/// Outcome of a synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    /// Prose answer safe to show the user.
    Prose(String),
    /// The model signaled the context cannot answer the question.
    Insufficient,
}

/// Render memory chunks into a synthesis context.
///
/// Memory rows are previously validated Q/A pairs; only the stored answer of
/// the best match is fed to the model.
pub fn memory_context(chunks: &[Chunk]) -> String {
    let answer = chunks
        .first()
        .and_then(|c| c.answer.as_deref())
        .unwrap_or_default();
    format!("From Memory: {answer}")
}

/// Render knowledge chunks into a synthesis context.
pub fn knowledge_context(chunks: &[Chunk]) -> String {
    let joined = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    format!("From Knowledge Base: {joined}")
}

/// Turns a question plus retrieved context into prose, or reports that the
/// context is insufficient.
pub struct Synthesizer {
    provider: Arc<dyn LlmProvider>,
}

impl Synthesizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub async fn answer(&self, question: &str, context: &str) -> Result<Synthesis, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYNTH_SYSTEM_PROMPT),
            ChatMessage::user(format!("Question: {question}\n\nContext: {context}")),
        ]);

        let response = self.provider.complete(request).await?;
        let content = response.content.trim();

        if content.contains(INSUFFICIENT_SENTINEL) {
            tracing::debug!("synthesizer reported insufficient context");
            return Ok(Synthesis::Insufficient);
        }

        Ok(Synthesis::Prose(content.to_string()))
    }
}

/// Produces a concise issue summary for escalation tickets.
pub struct IssueSummarizer {
    provider: Arc<dyn LlmProvider>,
}

impl IssueSummarizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Summarize the conversation for a human agent. Callers fall back to a
    /// templated summary when this fails.
    pub async fn summarize(
        &self,
        original_question: &str,
        current_question: &str,
    ) -> Result<String, LlmError> {
        let prompt = format!(
            "Create a concise professional summary of this customer support issue for our \
             human agents. Original question: {original_question}. Most recent question: \
             {current_question}. Return only the summary content without headings or formatting."
        );

        let request = CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(0.2)
            .with_max_tokens(500);

        let response = self.provider.complete(request).await?;
        Ok(response.content.trim().to_string())
    }
}
