//! The per-turn state machine.
//!
//! Routing is a declarative transition table over explicit nodes, executed by
//! a small driver loop: each node handler does its work, emits a label, and
//! the table maps `(node, label)` to the next node. This keeps the control
//! flow unit-testable without any graph framework.
//!
//! Flow per turn: process input, decide a route, run the chosen lookups,
//! synthesize an answer when context was found, and fall back to
//! clarification or escalation when it wasn't.

use std::sync::Arc;

use crate::clarify::ClarificationController;
use crate::config::AgentConfig;
use crate::error::Error;
use crate::escalation::{EscalationController, EscalationOutcome};
use crate::llm::tasks::{PLATFORM_CONTEXT, knowledge_context, memory_context};
use crate::llm::{IssueSummarizer, LlmProvider, Synthesis, Synthesizer};
use crate::lookup::{KnowledgeStore, MemoryStore};
use crate::notify::Notifier;
use crate::prompt::UserPrompt;
use crate::routing::{Route, RouteClassifier, is_escalation_request};
use crate::search::{ContextSource, SearchController, aggregate};
use crate::state::ConversationState;

const APOLOGY_REPLY: &str = "I'm sorry, something went wrong on my end. Please try asking \
your question again.";

/// Nodes of the turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    ProcessInput,
    Decide,
    MemoryLookup,
    KnowledgeLookup,
    ParallelSearch,
    Synthesize,
    Clarify,
    Escalate,
    Done,
}

/// Labels emitted by node handlers; the transition table maps them onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    ToDecide,
    Routed(Route),
    Found,
    Miss,
    Answered,
    Insufficient,
    Clarified,
    Exhausted,
    Finished,
}

/// The declarative routing table. Every reachable `(node, label)` pair has
/// exactly one successor; anything else is a programming error surfaced as
/// `Done` with a logged warning rather than a panic.
fn transition(node: Node, label: Label) -> Node {
    match (node, label) {
        (Node::ProcessInput, Label::ToDecide) => Node::Decide,

        (Node::Decide, Label::Routed(Route::DirectAnswer)) => Node::Synthesize,
        (Node::Decide, Label::Routed(Route::NeedMemory)) => Node::MemoryLookup,
        (Node::Decide, Label::Routed(Route::NeedKb)) => Node::KnowledgeLookup,
        (Node::Decide, Label::Routed(Route::NeedBoth)) => Node::ParallelSearch,
        (Node::Decide, Label::Routed(Route::NeedClarification)) => Node::Clarify,
        (Node::Decide, Label::Routed(Route::Escalate)) => Node::Escalate,

        (Node::MemoryLookup, Label::Found) => Node::Synthesize,
        (Node::MemoryLookup, Label::Miss) => Node::KnowledgeLookup,

        (Node::KnowledgeLookup, Label::Found) => Node::Synthesize,
        (Node::KnowledgeLookup, Label::Miss) => Node::Clarify,

        (Node::ParallelSearch, Label::Found) => Node::Synthesize,
        (Node::ParallelSearch, Label::Miss) => Node::Clarify,

        (Node::Synthesize, Label::Answered) => Node::Done,
        (Node::Synthesize, Label::Insufficient) => Node::Clarify,

        (Node::Clarify, Label::Clarified) => Node::Done,
        (Node::Clarify, Label::Exhausted) => Node::Escalate,

        (Node::Escalate, Label::Finished) => Node::Done,

        (node, label) => {
            tracing::warn!(?node, ?label, "unmapped transition, ending turn");
            Node::Done
        }
    }
}

/// External collaborators the orchestrator is wired with.
///
/// Bundled to keep constructor signatures flat, the same way the rest of the
/// codebase passes dependency bundles around.
pub struct OrchestratorDeps {
    pub llm: Arc<dyn LlmProvider>,
    pub memory: Arc<dyn MemoryStore>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub notifier: Arc<dyn Notifier>,
    pub prompt: Arc<dyn UserPrompt>,
}

/// Scratch data for one turn; dropped when the turn ends.
struct TurnContext {
    raw_input: String,
    is_clarification: bool,
    route: Route,
    /// The user asked for a human in so many words; skip confirmation.
    explicit_escalation: bool,
    reply: String,
}

/// Owns one conversation's state and processes its turns one at a time.
///
/// The calling layer is responsible for serializing turns per conversation;
/// `&mut self` on [`TurnOrchestrator::process_turn`] makes concurrent turns
/// on one conversation unrepresentable. Separate conversations use separate
/// orchestrators and are fully independent.
pub struct TurnOrchestrator {
    state: ConversationState,
    max_attempts: u32,
    classifier: RouteClassifier,
    search: SearchController,
    synthesizer: Synthesizer,
    clarify: ClarificationController,
    escalation: EscalationController,
}

impl TurnOrchestrator {
    pub fn new(config: &AgentConfig, support_email: String, deps: OrchestratorDeps) -> Self {
        Self {
            state: ConversationState::new(),
            max_attempts: config.max_clarification_attempts,
            classifier: RouteClassifier::new(deps.llm.clone()),
            search: SearchController::new(deps.memory, deps.knowledge),
            synthesizer: Synthesizer::new(deps.llm.clone()),
            clarify: ClarificationController::new(config.max_clarification_attempts),
            escalation: EscalationController::new(
                IssueSummarizer::new(deps.llm),
                deps.notifier,
                deps.prompt,
                support_email,
            ),
        }
    }

    /// Process one user turn and return the user-visible reply.
    ///
    /// Unexpected faults are caught here and answered with a generic apology;
    /// the state accumulated so far is kept.
    pub async fn process_turn(&mut self, user_input: &str, is_clarification: bool) -> String {
        match self.run_turn(user_input, is_clarification).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "turn processing failed");
                APOLOGY_REPLY.to_string()
            }
        }
    }

    /// Whether the conversation has escalated; the caller resets before the
    /// next independent question.
    pub fn escalation_needed(&self) -> bool {
        self.state.escalation_needed
    }

    /// Read access to the conversation state.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Replace the conversation state wholesale with a fresh one.
    pub fn reset(&mut self) {
        self.state = ConversationState::new();
        tracing::debug!("conversation state reset");
    }

    async fn run_turn(&mut self, user_input: &str, is_clarification: bool) -> Result<String, Error> {
        let mut turn = TurnContext {
            raw_input: user_input.to_string(),
            is_clarification,
            route: Route::NeedBoth,
            explicit_escalation: false,
            reply: String::new(),
        };

        let mut node = Node::ProcessInput;
        while node != Node::Done {
            let label = self.run_node(node, &mut turn).await?;
            node = transition(node, label);
        }

        Ok(turn.reply)
    }

    async fn run_node(&mut self, node: Node, turn: &mut TurnContext) -> Result<Label, Error> {
        match node {
            Node::ProcessInput => Ok(self.process_input(turn)),
            Node::Decide => Ok(self.decide(turn).await),
            Node::MemoryLookup => {
                let found = self.search.lookup_memory(&mut self.state).await;
                Ok(if found { Label::Found } else { Label::Miss })
            }
            Node::KnowledgeLookup => {
                let found = self.search.lookup_knowledge(&mut self.state).await;
                Ok(if found { Label::Found } else { Label::Miss })
            }
            Node::ParallelSearch => {
                self.search.parallel(&mut self.state).await;
                tracing::debug!(
                    after_clarification = turn.is_clarification,
                    memory_found = self.state.memory_found,
                    knowledge_found = self.state.knowledge_found,
                    "parallel search complete"
                );
                Ok(if self.state.has_results() {
                    Label::Found
                } else {
                    Label::Miss
                })
            }
            Node::Synthesize => self.synthesize(turn).await,
            Node::Clarify => Ok(match self.clarify.next_prompt(&mut self.state) {
                Some(prompt) => {
                    turn.reply = prompt;
                    Label::Clarified
                }
                None => Label::Exhausted,
            }),
            Node::Escalate => {
                self.escalate(turn).await?;
                Ok(Label::Finished)
            }
            // The driver loop exits before dispatching Done; the arm exists
            // for exhaustiveness only.
            Node::Done => Ok(Label::Finished),
        }
    }

    fn process_input(&mut self, turn: &mut TurnContext) -> Label {
        // The outstanding prompt, if any, is consumed by this turn. The
        // clarify node re-sets the flag if another prompt goes out.
        let was_awaiting = self.state.awaiting_clarification;
        self.state.awaiting_clarification = false;

        if turn.is_clarification {
            // Clarification replies are folded into the original question so
            // the next search sees the combined intent.
            self.state.current_question =
                format!("{} {}", self.state.original_question, turn.raw_input.trim());
            tracing::debug!(
                attempts = self.state.clarification_attempts,
                "processing clarification reply"
            );
        } else {
            let question = turn.raw_input.trim().to_string();
            self.state.current_question = question.clone();
            // A new span starts only when no clarification is pending.
            if !was_awaiting {
                self.state.original_question = question;
            }
        }
        self.state.reset_search_results();
        Label::ToDecide
    }

    async fn decide(&mut self, turn: &mut TurnContext) -> Label {
        // Explicit requests for a human bypass classification entirely.
        if is_escalation_request(&turn.raw_input) {
            tracing::debug!("explicit escalation request detected");
            turn.route = Route::Escalate;
            turn.explicit_escalation = true;
            return Label::Routed(Route::Escalate);
        }

        let route = self
            .classifier
            .classify(
                &self.state.current_question,
                turn.is_clarification,
                self.state.clarification_attempts,
            )
            .await;
        turn.route = route;
        Label::Routed(route)
    }

    async fn synthesize(&mut self, turn: &mut TurnContext) -> Result<Label, Error> {
        let (context, needs_storage) = if turn.route == Route::DirectAnswer {
            (PLATFORM_CONTEXT.to_string(), false)
        } else {
            let outcome = aggregate(&self.state);
            match outcome.source {
                ContextSource::Memory => {
                    (memory_context(&self.state.memory_payload), false)
                }
                ContextSource::Knowledge => (
                    knowledge_context(&self.state.knowledge_payload),
                    outcome.needs_storage,
                ),
                ContextSource::None => return Ok(Label::Insufficient),
            }
        };

        match self
            .synthesizer
            .answer(&self.state.current_question, &context)
            .await
        {
            Ok(Synthesis::Prose(answer)) => {
                if needs_storage {
                    // Write-through: knowledge-derived answers are cached in
                    // memory so the next identical question resolves there.
                    self.search
                        .store_answer(&self.state.current_question, &answer)
                        .await;
                }
                turn.reply = answer;
                Ok(Label::Answered)
            }
            Ok(Synthesis::Insufficient) => {
                tracing::debug!(
                    after_clarification = turn.is_clarification,
                    "context insufficient, falling back"
                );
                Ok(Label::Insufficient)
            }
            Err(e) => {
                // A synthesis transport failure degrades like an empty
                // context rather than killing the turn.
                tracing::warn!(error = %e, "synthesis failed, treating as insufficient context");
                Ok(Label::Insufficient)
            }
        }
    }

    async fn escalate(&mut self, turn: &mut TurnContext) -> Result<(), Error> {
        if turn.explicit_escalation {
            self.state.current_question = turn.raw_input.trim().to_string();
        }

        match self
            .escalation
            .run(&mut self.state, turn.explicit_escalation)
            .await?
        {
            EscalationOutcome::Ticketed { message, .. } => {
                turn.reply = message;
            }
            EscalationOutcome::Declined { message } => {
                // Declined escalation: prior search state is stale, start a
                // fresh span.
                self.reset();
                turn.reply = message;
            }
        }
        Ok(())
    }
}
