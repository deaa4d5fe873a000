//! deskhand: a support-desk routing agent core.
//!
//! Routes each customer turn through one of six resolution strategies
//! (direct answer, memory lookup, knowledge search, parallel search of both,
//! bounded clarification, human escalation) and advances a per-conversation
//! state machine until the question is resolved or escalated.
//!
//! The orchestrator in [`agent`] is the entry point; everything it talks to
//! (LLM, lookup stores, notifier, interactive prompt) sits behind a trait so
//! front ends and tests can swap implementations.

pub mod agent;
pub mod clarify;
pub mod config;
pub mod error;
pub mod escalation;
pub mod llm;
pub mod lookup;
pub mod notify;
pub mod prompt;
pub mod routing;
pub mod search;
pub mod state;

pub use agent::{OrchestratorDeps, TurnOrchestrator};
pub use config::Config;
pub use error::Error;
pub use state::{Answer, Chunk, ConversationState, is_awaiting_clarification};
