//! Per-turn route selection.
//!
//! Two layers, checked in order:
//!
//! 1. A deterministic keyword scan over the raw input catches explicit
//!    escalation requests before any model is involved.
//! 2. A model-backed classifier labels everything else. Classifier failures
//!    and unrecognized labels fail open to [`Route::NeedBoth`], the most
//!    thorough search, never to escalation or silence.

use std::sync::Arc;

use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Phrases that force escalation regardless of classifier output.
/// Matched case-insensitively as substrings of the raw user input.
const ESCALATION_PHRASES: &[&str] = &[
    "escalate",
    "human support",
    "real person",
    "speak to human",
    "speak to a human",
    "talk to a human",
    "human agent",
];

/// Resolution strategy for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answer from the fixed platform description, no retrieval.
    DirectAnswer,
    /// Memory first, knowledge base on miss.
    NeedMemory,
    /// Knowledge base only, clarification on miss.
    NeedKb,
    /// Memory and knowledge base concurrently.
    NeedBoth,
    /// Question too vague to search; ask the user to rephrase.
    NeedClarification,
    /// Hand off to a human.
    Escalate,
}

impl Route {
    /// Parse a classifier label. Unknown labels return `None`; callers map
    /// that to [`Route::NeedBoth`].
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "direct_answer" => Some(Self::DirectAnswer),
            "need_memory" => Some(Self::NeedMemory),
            "need_kb" | "need_kb_search" => Some(Self::NeedKb),
            "need_both" => Some(Self::NeedBoth),
            "need_clarification" => Some(Self::NeedClarification),
            "escalate" => Some(Self::Escalate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectAnswer => "direct_answer",
            Self::NeedMemory => "need_memory",
            Self::NeedKb => "need_kb",
            Self::NeedBoth => "need_both",
            Self::NeedClarification => "need_clarification",
            Self::Escalate => "escalate",
        }
    }
}

/// Whether the raw input is an explicit request for a human.
pub fn is_escalation_request(input: &str) -> bool {
    let lowered = input.to_lowercase();
    ESCALATION_PHRASES.iter().any(|p| lowered.contains(p))
}

const CLASSIFIER_SYSTEM_PROMPT: &str = "You route customer support questions for the BeWhoop \
platform. Reply with exactly one label and nothing else:\n\
- direct_answer: general questions about what BeWhoop is, answerable from a one-paragraph \
platform description\n\
- need_memory: the question likely repeats a previously answered question\n\
- need_kb: the question needs documentation lookup\n\
- need_both: unclear which source helps; search both\n\
- need_clarification: too vague to search\n\
- escalate: the user needs a human";

/// Model-backed turn classifier.
pub struct RouteClassifier {
    provider: Arc<dyn LlmProvider>,
}

impl RouteClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Classify one turn. The attempt count is context for the model, not a
    /// gate; the clarification budget is enforced by the clarify controller.
    pub async fn classify(
        &self,
        question: &str,
        is_clarification: bool,
        clarification_attempts: u32,
    ) -> Route {
        let user = format!(
            "Question: {question}\nClarification reply: {is_clarification}\n\
             Clarification attempts so far: {clarification_attempts}"
        );
        let request = CompletionRequest::new(vec![
            ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
            ChatMessage::user(user),
        ])
        .with_max_tokens(10);

        match self.provider.complete(request).await {
            Ok(response) => match Route::parse(&response.content) {
                Some(route) => {
                    tracing::debug!(route = route.as_str(), "classifier decision");
                    route
                }
                None => {
                    tracing::warn!(
                        label = %response.content.trim(),
                        "unrecognized classifier label, defaulting to need_both"
                    );
                    Route::NeedBoth
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "classifier call failed, defaulting to need_both");
                Route::NeedBoth
            }
        }
    }
}
