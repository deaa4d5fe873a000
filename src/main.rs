//! deskhand CLI: a REPL over the turn orchestrator.
//!
//! Reads one question per line, tracks whether the next input is a
//! clarification reply, and resets the conversation after an escalation.
//! Turns are processed strictly one at a time, which is the serialization
//! the core requires per conversation.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use deskhand::agent::{OrchestratorDeps, TurnOrchestrator};
use deskhand::config::Config;
use deskhand::llm::create_llm_provider;
use deskhand::lookup::{HttpKnowledgeStore, HttpMemoryStore};
use deskhand::notify::WebhookNotifier;
use deskhand::prompt::StdinPrompt;
use deskhand::state::is_awaiting_clarification;

#[derive(Parser, Debug)]
#[command(name = "deskhand", about = "Support-desk routing agent", version)]
struct Args {
    /// Override the maximum clarification attempts before escalation.
    #[arg(long, env = "MAX_CLARIFICATION_ATTEMPTS")]
    max_clarification_attempts: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(max) = args.max_clarification_attempts {
        config.agent.max_clarification_attempts = max;
    }

    let llm = create_llm_provider(&config.llm).context("failed to create LLM provider")?;
    let memory = Arc::new(
        HttpMemoryStore::new(config.memory.clone()).context("failed to create memory store")?,
    );
    let knowledge = Arc::new(
        HttpKnowledgeStore::new(config.knowledge.clone())
            .context("failed to create knowledge store")?,
    );
    let notifier =
        Arc::new(WebhookNotifier::new(config.notify.clone()).context("failed to create notifier")?);
    let prompt = Arc::new(StdinPrompt::new());

    let mut orchestrator = TurnOrchestrator::new(
        &config.agent,
        config.notify.support_email.clone(),
        OrchestratorDeps {
            llm,
            memory,
            knowledge,
            notifier,
            prompt: prompt.clone(),
        },
    );

    println!("deskhand support assistant. Ask a question, /reset to start over, /quit to exit.");

    loop {
        let input = match prompt_line(&prompt).await {
            Some(line) => line,
            None => break,
        };

        match input.as_str() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                orchestrator.reset();
                println!("Conversation has been reset.");
                continue;
            }
            _ => {}
        }

        let is_clarification = is_awaiting_clarification(orchestrator.state());
        let reply = orchestrator.process_turn(&input, is_clarification).await;
        println!("{reply}");

        if orchestrator.escalation_needed() {
            orchestrator.reset();
        }
    }

    Ok(())
}

async fn prompt_line(prompt: &StdinPrompt) -> Option<String> {
    use deskhand::prompt::UserPrompt;
    match prompt.ask(">").await {
        Ok(line) => Some(line),
        Err(_) => None,
    }
}
