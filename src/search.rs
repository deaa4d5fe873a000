//! Search fan-out over the memory and knowledge stores.
//!
//! Two call shapes: sequential-priority (memory short-circuits, misses fall
//! through) driven node-by-node from the orchestrator, and a parallel shape
//! that joins both lookups before anything is aggregated. Adapter failures
//! never fail the turn: they are logged and coerced to not-found.

use std::sync::Arc;

use crate::lookup::{KnowledgeStore, MemoryStore};
use crate::state::{Answer, ConversationState};

/// Which store's payload the synthesizer should consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Memory,
    Knowledge,
    None,
}

/// Aggregated result of a search pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub source: ContextSource,
    /// True when a successful synthesized answer should be written back to
    /// the memory store (knowledge hit with no memory hit).
    pub needs_storage: bool,
}

/// Runs the lookups and records results on the conversation state.
pub struct SearchController {
    memory: Arc<dyn MemoryStore>,
    knowledge: Arc<dyn KnowledgeStore>,
}

impl SearchController {
    pub fn new(memory: Arc<dyn MemoryStore>, knowledge: Arc<dyn KnowledgeStore>) -> Self {
        Self { memory, knowledge }
    }

    /// Query the memory store; returns whether it found anything.
    pub async fn lookup_memory(&self, state: &mut ConversationState) -> bool {
        let result = self.safe_memory_lookup(&state.current_question).await;
        state.memory_found = result.found;
        state.memory_payload = result.chunks;
        tracing::debug!(found = state.memory_found, "memory search");
        state.memory_found
    }

    /// Query the knowledge store; returns whether it found anything.
    pub async fn lookup_knowledge(&self, state: &mut ConversationState) -> bool {
        let result = self.safe_knowledge_search(&state.current_question).await;
        state.knowledge_found = result.found;
        state.knowledge_payload = result.chunks;
        tracing::debug!(found = state.knowledge_found, "knowledge search");
        state.knowledge_found
    }

    /// Query both stores concurrently and wait for both (a join, not a
    /// race). Neither result is acted on until both have returned.
    pub async fn parallel(&self, state: &mut ConversationState) {
        let question = state.current_question.clone();
        let (memory_result, knowledge_result) = tokio::join!(
            self.safe_memory_lookup(&question),
            self.safe_knowledge_search(&question),
        );

        state.memory_found = memory_result.found;
        state.memory_payload = memory_result.chunks;
        state.knowledge_found = knowledge_result.found;
        state.knowledge_payload = knowledge_result.chunks;
    }

    /// Write a resolved answer back into the memory store. Best-effort:
    /// failure is logged and swallowed.
    pub async fn store_answer(&self, question: &str, answer: &str) {
        if let Err(e) = self.memory.upsert(question, answer).await {
            tracing::warn!(error = %e, "memory upsert failed, continuing without caching");
        }
    }

    async fn safe_memory_lookup(&self, question: &str) -> Answer {
        match self.memory.lookup(question).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "memory lookup failed, treating as not found");
                Answer::not_found()
            }
        }
    }

    async fn safe_knowledge_search(&self, question: &str) -> Answer {
        match self.knowledge.search(question).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "knowledge search failed, treating as not found");
                Answer::not_found()
            }
        }
    }
}

/// Aggregation policy: memory strictly outranks knowledge, since a memory
/// hit is a previously validated answer. A knowledge-only hit sets the
/// write-through flag so the synthesized answer lands in memory.
pub fn aggregate(state: &ConversationState) -> SearchOutcome {
    if state.memory_found {
        SearchOutcome {
            source: ContextSource::Memory,
            needs_storage: false,
        }
    } else if state.knowledge_found {
        SearchOutcome {
            source: ContextSource::Knowledge,
            needs_storage: true,
        }
    } else {
        SearchOutcome {
            source: ContextSource::None,
            needs_storage: false,
        }
    }
}
