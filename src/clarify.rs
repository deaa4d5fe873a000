//! Bounded clarification before escalation.
//!
//! A conversation may be asked to rephrase at most `max_attempts` times
//! (default 1). Once the budget is spent, a failed turn goes straight to
//! escalation; no second prompt is ever issued. Attempts survive successful
//! answers and are only cleared by a full conversation reset.

use crate::state::ConversationState;

const CLARIFICATION_PROMPT: &str = "I couldn't find an answer to that. Could you rephrase \
your question or add a bit more detail about what you're trying to do?";

/// Enforces the clarification budget.
#[derive(Debug, Clone, Copy)]
pub struct ClarificationController {
    max_attempts: u32,
}

impl ClarificationController {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Ask for clarification if the budget allows.
    ///
    /// Increments the attempt counter and returns the prompt while attempts
    /// remain; returns `None` once the budget is exhausted, signaling the
    /// orchestrator to escalate instead.
    pub fn next_prompt(&self, state: &mut ConversationState) -> Option<String> {
        if state.clarification_attempts >= self.max_attempts {
            tracing::debug!(
                attempts = state.clarification_attempts,
                max = self.max_attempts,
                "clarification budget exhausted, escalating"
            );
            return None;
        }

        state.clarification_attempts += 1;
        state.awaiting_clarification = true;
        tracing::debug!(
            attempts = state.clarification_attempts,
            "issuing clarification prompt"
        );
        Some(CLARIFICATION_PROMPT.to_string())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
