//! Turn orchestration.

mod orchestrator;

pub use orchestrator::{Node, OrchestratorDeps, TurnOrchestrator};
