//! Per-conversation state threaded through every turn.
//!
//! One `ConversationState` exists per active conversation and is owned by the
//! orchestrator for the conversation's lifetime. It is replaced wholesale on
//! reset (post-escalation or explicit reset command), never partially torn
//! down.

use serde::Deserialize;

/// A single retrieved row from the memory or knowledge store.
///
/// Memory rows carry a prior `question`/`answer` pair; knowledge rows carry
/// document `content`. Both share this envelope so the search controller can
/// aggregate them uniformly.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Chunk {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

impl Chunk {
    /// A knowledge-store document chunk.
    pub fn document(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            question: None,
            answer: None,
        }
    }

    /// A memory-store Q/A row.
    pub fn qa(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            question: Some(question.into()),
            answer: Some(answer.into()),
        }
    }
}

/// Lookup result envelope shared by both stores. Immutable once returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Answer {
    pub found: bool,
    /// Result chunks in relevance order; empty when not found.
    pub chunks: Vec<Chunk>,
}

impl Answer {
    pub fn found(chunks: Vec<Chunk>) -> Self {
        Self {
            found: true,
            chunks,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Mutable record tracking one conversation across turns.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    /// First question of the current span; set once until reset.
    pub original_question: String,
    /// Latest question, possibly original + clarification reply concatenated.
    pub current_question: String,
    pub memory_found: bool,
    pub knowledge_found: bool,
    pub memory_payload: Vec<Chunk>,
    pub knowledge_payload: Vec<Chunk>,
    /// Contact details collected during escalation; empty otherwise.
    pub contact_email: String,
    pub contact_phone: String,
    pub issue_summary: String,
    /// Bounded by `AgentConfig::max_clarification_attempts`; only reset by
    /// replacing the whole state.
    pub clarification_attempts: u32,
    /// True from the moment a clarification prompt is issued until the next
    /// turn consumes it. Distinct from the attempt counter, which persists
    /// across a successfully clarified answer.
    pub awaiting_clarification: bool,
    /// Terminal marker: once true, the caller must reset before the next
    /// independent question.
    pub escalation_needed: bool,
}

impl ConversationState {
    /// Fresh, zeroed state. This is the `reset_conversation` factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear search results ahead of a new lookup pass. The found flags and
    /// payloads are cleared together so neither can go stale alone.
    pub fn reset_search_results(&mut self) {
        self.memory_found = false;
        self.knowledge_found = false;
        self.memory_payload.clear();
        self.knowledge_payload.clear();
    }

    /// Whether either store produced results this turn.
    pub fn has_results(&self) -> bool {
        self.memory_found || self.knowledge_found
    }
}

/// Whether the next turn should be treated as a clarification reply.
///
/// True while a clarification prompt is outstanding and the conversation has
/// not escalated. The calling layer uses this to set the `is_clarification`
/// flag on `process_turn`. Once a clarified turn resolves, the flag drops and
/// the next question starts a fresh span even though the attempt counter
/// persists.
pub fn is_awaiting_clarification(state: &ConversationState) -> bool {
    state.awaiting_clarification && !state.escalation_needed
}
