//! Escalation to human support.
//!
//! Sequential collection protocol: confirm intent (unless the user already
//! asked for a human explicitly), collect email and phone with in-place
//! re-prompting, summarize the issue, mint a ticket, then attempt delivery.
//! The ticket exists regardless of delivery outcome; delivery only changes
//! the confirmation wording.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::PromptError;
use crate::llm::IssueSummarizer;
use crate::notify::{Notifier, Ticket};
use crate::prompt::UserPrompt;
use crate::state::ConversationState;

const CONFIRM_PROMPT: &str = "I couldn't find an answer to your question after trying \
multiple approaches.\nWould you like me to escalate this to our human support team? (yes/no):";

const DECLINE_MESSAGE: &str = "I might not be able to find the solution. Could you provide \
a more detailed question?";

/// Result of running the escalation flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// A ticket was created; the message confirms it to the user.
    Ticketed { ticket_id: String, message: String },
    /// The user declined escalation. The conversation state is stale and the
    /// orchestrator performs a full reset.
    Declined { message: String },
}

/// Collects contact details and hands the conversation to a human.
pub struct EscalationController {
    summarizer: IssueSummarizer,
    notifier: Arc<dyn Notifier>,
    prompt: Arc<dyn UserPrompt>,
    support_email: String,
}

impl EscalationController {
    pub fn new(
        summarizer: IssueSummarizer,
        notifier: Arc<dyn Notifier>,
        prompt: Arc<dyn UserPrompt>,
        support_email: String,
    ) -> Self {
        Self {
            summarizer,
            notifier,
            prompt,
            support_email,
        }
    }

    /// Run the escalation flow. `explicit` is true when the user asked for a
    /// human in so many words, which skips the confirmation step.
    pub async fn run(
        &self,
        state: &mut ConversationState,
        explicit: bool,
    ) -> Result<EscalationOutcome, PromptError> {
        if !explicit && !self.confirm().await? {
            tracing::debug!("user declined escalation");
            return Ok(EscalationOutcome::Declined {
                message: DECLINE_MESSAGE.to_string(),
            });
        }

        self.collect_contact(state).await?;
        state.issue_summary = self.summarize(state).await;

        let ticket = Ticket {
            id: new_ticket_id(),
            contact_email: state.contact_email.clone(),
            contact_phone: state.contact_phone.clone(),
            original_question: state.original_question.clone(),
            current_question: state.current_question.clone(),
            issue_summary: state.issue_summary.clone(),
        };

        // The ticket exists from this point on, whatever delivery does.
        state.escalation_needed = true;
        tracing::info!(ticket_id = %ticket.id, "support ticket created");

        let message = match self.notifier.notify(&ticket).await {
            Ok(()) => format!(
                "Support ticket created successfully!\n\
                 Ticket ID: {}\n\
                 Our support team will contact you at {} or {} within 24 hours.\n\
                 Please save your ticket ID for reference.",
                ticket.id, ticket.contact_email, ticket.contact_phone
            ),
            Err(e) => {
                tracing::warn!(error = %e, ticket_id = %ticket.id, "escalation delivery failed");
                format!(
                    "Ticket created with ID: {}, but there was an issue notifying our team.\n\
                     Please contact our support directly at {} with your ticket ID.\n\
                     We'll respond to {} as soon as possible.",
                    ticket.id, self.support_email, ticket.contact_email
                )
            }
        };

        Ok(EscalationOutcome::Ticketed {
            ticket_id: ticket.id,
            message,
        })
    }

    async fn confirm(&self) -> Result<bool, PromptError> {
        let mut prompt_text = CONFIRM_PROMPT;
        loop {
            let reply = self.prompt.ask(prompt_text).await?;
            match reply.trim().to_lowercase().as_str() {
                "yes" | "y" => return Ok(true),
                "no" | "n" => return Ok(false),
                _ => prompt_text = "Please answer 'yes' or 'no'.",
            }
        }
    }

    /// Email must contain `@`; phone must be non-empty. Invalid input
    /// re-prompts in place and advances no counter.
    async fn collect_contact(&self, state: &mut ConversationState) -> Result<(), PromptError> {
        let mut prompt_text = "Please enter your email address:";
        while state.contact_email.is_empty() {
            let email = self.prompt.ask(prompt_text).await?;
            if email.contains('@') {
                state.contact_email = email;
            } else {
                prompt_text = "Please enter a valid email address.";
            }
        }

        let mut prompt_text = "Please enter your contact number:";
        while state.contact_phone.is_empty() {
            let phone = self.prompt.ask(prompt_text).await?;
            if !phone.is_empty() {
                state.contact_phone = phone;
            } else {
                prompt_text = "Please enter a valid contact number.";
            }
        }

        Ok(())
    }

    async fn summarize(&self, state: &ConversationState) -> String {
        match self
            .summarizer
            .summarize(&state.original_question, &state.current_question)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, "issue summarization failed, using template");
                format!("Customer inquiry: {}", state.current_question)
            }
        }
    }
}

/// 8-character uppercase ticket token from a v4 UUID.
fn new_ticket_id() -> String {
    Uuid::new_v4().to_string()[..8].to_uppercase()
}
