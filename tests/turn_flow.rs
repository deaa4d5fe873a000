//! End-to-end turn scenarios over the orchestrator with mock collaborators.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use deskhand::agent::{OrchestratorDeps, TurnOrchestrator};
use deskhand::config::AgentConfig;
use deskhand::error::{LlmError, LookupError, NotifyError, PromptError};
use deskhand::llm::{CompletionRequest, CompletionResponse, LlmProvider};
use deskhand::lookup::{KnowledgeStore, MemoryStore};
use deskhand::notify::{Notifier, Ticket};
use deskhand::prompt::UserPrompt;
use deskhand::state::{Answer, Chunk, is_awaiting_clarification};

/// LLM mock that answers the three task prompts by inspecting the request.
struct MockLlm {
    route_label: String,
    synth_reply: String,
    /// Contexts the synthesizer was invoked with, in order.
    synth_contexts: Mutex<Vec<String>>,
}

impl MockLlm {
    fn new(route_label: &str, synth_reply: &str) -> Self {
        Self {
            route_label: route_label.to_string(),
            synth_reply: synth_reply.to_string(),
            synth_contexts: Mutex::new(Vec::new()),
        }
    }

    fn contexts(&self) -> Vec<String> {
        self.synth_contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let first = request.messages.first().map(|m| m.content.as_str()).unwrap_or("");

        let content = if first.contains("route customer support questions") {
            self.route_label.clone()
        } else if first.contains("support assistant for BeWhoop") {
            let user = request
                .messages
                .get(1)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.synth_contexts.lock().unwrap().push(user);
            self.synth_reply.clone()
        } else {
            // Issue summarizer.
            "Summary of the customer issue.".to_string()
        };

        Ok(CompletionResponse {
            content,
            model: "mock".to_string(),
        })
    }
}

struct MockMemory {
    /// Answers returned in order; the final one repeats for later lookups.
    answers: Mutex<VecDeque<Answer>>,
    upserts: AtomicUsize,
}

impl MockMemory {
    fn hit(answer_text: &str) -> Self {
        Self::sequence(vec![Answer::found(vec![Chunk::qa(
            "prior question",
            answer_text,
        )])])
    }

    fn miss() -> Self {
        Self::sequence(vec![Answer::not_found()])
    }

    fn sequence(answers: Vec<Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            upserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MemoryStore for MockMemory {
    async fn lookup(&self, _question: &str) -> Result<Answer, LookupError> {
        let mut answers = self.answers.lock().unwrap();
        let answer = if answers.len() > 1 {
            answers.pop_front().unwrap_or_default()
        } else {
            answers.front().cloned().unwrap_or_else(Answer::not_found)
        };
        Ok(answer)
    }

    async fn upsert(&self, _question: &str, _answer: &str) -> Result<(), LookupError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockKnowledge {
    answer: Answer,
}

impl MockKnowledge {
    fn hit(content: &str) -> Self {
        Self {
            answer: Answer::found(vec![Chunk::document(content)]),
        }
    }

    fn miss() -> Self {
        Self {
            answer: Answer::not_found(),
        }
    }
}

#[async_trait]
impl KnowledgeStore for MockKnowledge {
    async fn search(&self, _question: &str) -> Result<Answer, LookupError> {
        Ok(self.answer.clone())
    }
}

struct OkNotifier {
    calls: AtomicUsize,
}

#[async_trait]
impl Notifier for OkNotifier {
    async fn notify(&self, _ticket: &Ticket) -> Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedPrompt {
    replies: Mutex<VecDeque<&'static str>>,
}

impl ScriptedPrompt {
    fn new(replies: &[&'static str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl UserPrompt for ScriptedPrompt {
    async fn ask(&self, _prompt: &str) -> Result<String, PromptError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .map(|s| s.to_string())
            .ok_or(PromptError::Closed)
    }
}

struct Rig {
    llm: Arc<MockLlm>,
    memory: Arc<MockMemory>,
    notifier: Arc<OkNotifier>,
    orchestrator: TurnOrchestrator,
}

fn rig(
    llm: MockLlm,
    memory: MockMemory,
    knowledge: MockKnowledge,
    prompt_replies: &[&'static str],
) -> Rig {
    let llm = Arc::new(llm);
    let memory = Arc::new(memory);
    let notifier = Arc::new(OkNotifier {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = TurnOrchestrator::new(
        &AgentConfig::default(),
        "support@bewhoop.com".to_string(),
        OrchestratorDeps {
            llm: llm.clone(),
            memory: memory.clone(),
            knowledge: Arc::new(knowledge),
            notifier: notifier.clone(),
            prompt: Arc::new(ScriptedPrompt::new(prompt_replies)),
        },
    );
    Rig {
        llm,
        memory,
        notifier,
        orchestrator,
    }
}

#[tokio::test]
async fn fresh_orchestrator_starts_zeroed() {
    let r = rig(
        MockLlm::new("need_both", "answer"),
        MockMemory::miss(),
        MockKnowledge::miss(),
        &[],
    );
    let state = r.orchestrator.state();
    assert_eq!(state.clarification_attempts, 0);
    assert!(!state.escalation_needed);
    assert!(!state.memory_found);
    assert!(!state.knowledge_found);
}

#[tokio::test]
async fn double_miss_under_budget_yields_clarification_prompt() {
    let mut r = rig(
        MockLlm::new("need_both", "answer"),
        MockMemory::miss(),
        MockKnowledge::miss(),
        &[],
    );

    let reply = r.orchestrator.process_turn("how do refunds work?", false).await;

    assert!(!reply.is_empty());
    assert!(reply.contains("rephrase"));
    assert_eq!(r.orchestrator.state().clarification_attempts, 1);
    assert!(!r.orchestrator.escalation_needed());
}

#[tokio::test]
async fn double_miss_at_budget_escalates_instead_of_reprompting() {
    let mut r = rig(
        MockLlm::new("need_both", "answer"),
        MockMemory::miss(),
        MockKnowledge::miss(),
        &["yes", "user@example.com", "555-0100"],
    );

    // First failed turn burns the single clarification attempt.
    let first = r.orchestrator.process_turn("how do refunds work?", false).await;
    assert!(first.contains("rephrase"));

    // The clarification reply also finds nothing: escalation, not a prompt.
    let second = r.orchestrator.process_turn("refunds for tickets", true).await;

    assert!(second.contains("Ticket ID:"));
    assert!(r.orchestrator.escalation_needed());
    assert_eq!(r.notifier.calls.load(Ordering::SeqCst), 1);
    // The span kept its original question through the clarification turn.
    assert_eq!(r.orchestrator.state().original_question, "how do refunds work?");
}

#[tokio::test]
async fn parallel_route_prefers_memory_over_knowledge() {
    let mut r = rig(
        MockLlm::new("need_both", "Canned booking steps."),
        MockMemory::hit("Step-by-step booking instructions..."),
        MockKnowledge::hit("Some overlapping KB document."),
        &[],
    );

    let reply = r.orchestrator.process_turn("how do I book?", false).await;

    assert_eq!(reply, "Canned booking steps.");
    let contexts = r.llm.contexts();
    assert_eq!(contexts.len(), 1);
    assert!(contexts[0].contains("From Memory: Step-by-step booking instructions..."));
    assert!(!contexts[0].contains("From Knowledge Base"));
    // Memory-derived answers are never written back.
    assert_eq!(r.memory.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn knowledge_derived_answer_upserts_exactly_once() {
    let mut r = rig(
        MockLlm::new("need_both", "Synthesized from documentation."),
        MockMemory::miss(),
        MockKnowledge::hit("Vendor registration guide."),
        &[],
    );

    let reply = r.orchestrator.process_turn("how do I register as a vendor?", false).await;

    assert_eq!(reply, "Synthesized from documentation.");
    assert_eq!(r.memory.upserts.load(Ordering::SeqCst), 1);
    let contexts = r.llm.contexts();
    assert!(contexts[0].contains("From Knowledge Base: Vendor registration guide."));
}

#[tokio::test]
async fn memory_hit_with_knowledge_miss_performs_no_upsert() {
    let mut r = rig(
        MockLlm::new("need_memory", "From the cache."),
        MockMemory::hit("Step-by-step booking instructions..."),
        MockKnowledge::miss(),
        &[],
    );

    let reply = r.orchestrator.process_turn("how do I book?", false).await;

    assert_eq!(reply, "From the cache.");
    assert_eq!(r.memory.upserts.load(Ordering::SeqCst), 0);
    assert!(r.llm.contexts()[0].contains("From Memory:"));
}

#[tokio::test]
async fn explicit_escalation_keywords_bypass_classifier() {
    // Classifier would say direct_answer; the keyword wins, and the explicit
    // request skips the confirmation question (script starts at email).
    let mut r = rig(
        MockLlm::new("direct_answer", "should not be used"),
        MockMemory::miss(),
        MockKnowledge::miss(),
        &["user@example.com", "555-0100"],
    );

    let reply = r.orchestrator.process_turn("I want to escalate", false).await;

    assert!(reply.contains("Ticket ID:"));
    assert!(r.orchestrator.escalation_needed());
    assert!(r.llm.contexts().is_empty());
}

#[tokio::test]
async fn direct_answer_uses_platform_context() {
    let mut r = rig(
        MockLlm::new("direct_answer", "BeWhoop connects vendors with event seekers."),
        MockMemory::miss(),
        MockKnowledge::miss(),
        &[],
    );

    let reply = r.orchestrator.process_turn("What is BeWhoop?", false).await;

    assert_eq!(reply, "BeWhoop connects vendors with event seekers.");
    assert!(!r.orchestrator.escalation_needed());
    let contexts = r.llm.contexts();
    assert!(contexts[0].contains("BeWhoop is a social platform"));
    assert_eq!(r.memory.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn vague_question_routes_to_clarification() {
    let mut r = rig(
        MockLlm::new("need_clarification", "unused"),
        MockMemory::miss(),
        MockKnowledge::miss(),
        &[],
    );

    let reply = r.orchestrator.process_turn("I need help", false).await;

    assert!(reply.contains("rephrase"));
    assert_eq!(r.orchestrator.state().clarification_attempts, 1);
}

#[tokio::test]
async fn clarification_reply_combines_original_and_followup() {
    let mut r = rig(
        MockLlm::new("need_both", "Combined answer."),
        MockMemory::miss(),
        MockKnowledge::miss(),
        &["yes", "user@example.com", "555-0100"],
    );

    r.orchestrator.process_turn("I need help", false).await;
    r.orchestrator.process_turn("with vendor payouts", true).await;

    assert_eq!(
        r.orchestrator.state().current_question,
        "I need help with vendor payouts"
    );
}

#[tokio::test]
async fn resolved_clarification_does_not_leak_into_next_question() {
    // Memory misses the vague question, then hits once it is clarified.
    let mut r = rig(
        MockLlm::new("need_both", "Payouts settle weekly."),
        MockMemory::sequence(vec![
            Answer::not_found(),
            Answer::found(vec![Chunk::qa("payout question", "Payouts settle weekly.")]),
        ]),
        MockKnowledge::miss(),
        &[],
    );

    let first = r.orchestrator.process_turn("I need help", false).await;
    assert!(first.contains("rephrase"));
    assert!(is_awaiting_clarification(r.orchestrator.state()));

    let second = r.orchestrator.process_turn("with vendor payouts", true).await;
    assert_eq!(second, "Payouts settle weekly.");
    // The answered turn consumed the prompt, so the caller must not treat the
    // next question as a clarification reply.
    assert!(!is_awaiting_clarification(r.orchestrator.state()));

    r.orchestrator.process_turn("How do refunds work?", false).await;
    let state = r.orchestrator.state();
    assert_eq!(state.current_question, "How do refunds work?");
    // A fresh span: the old vague question is gone from the record.
    assert_eq!(state.original_question, "How do refunds work?");
}

#[tokio::test]
async fn insufficient_sentinel_falls_back_to_clarification() {
    let mut r = rig(
        MockLlm::new("need_both", "CANNOT_ANSWER_WITH_CONTEXT"),
        MockMemory::miss(),
        MockKnowledge::hit("Unrelated document."),
        &[],
    );

    let reply = r.orchestrator.process_turn("how do refunds work?", false).await;

    // The sentinel never reaches the user.
    assert!(!reply.contains("CANNOT_ANSWER_WITH_CONTEXT"));
    assert!(reply.contains("rephrase"));
    assert_eq!(r.orchestrator.state().clarification_attempts, 1);
    // No upsert: synthesis did not produce an answer.
    assert_eq!(r.memory.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn garbage_classifier_label_still_searches_both() {
    let mut r = rig(
        MockLlm::new("flibbertigibbet", "Found it anyway."),
        MockMemory::hit("Cached answer."),
        MockKnowledge::miss(),
        &[],
    );

    let reply = r.orchestrator.process_turn("odd question", false).await;
    assert_eq!(reply, "Found it anyway.");
}

#[tokio::test]
async fn declined_escalation_resets_the_conversation() {
    let mut r = rig(
        MockLlm::new("escalate", "unused"),
        MockMemory::miss(),
        MockKnowledge::miss(),
        &["no"],
    );

    let reply = r.orchestrator.process_turn("this is hopeless", false).await;

    assert!(reply.contains("more detailed question"));
    assert!(!r.orchestrator.escalation_needed());
    let state = r.orchestrator.state();
    assert_eq!(state.clarification_attempts, 0);
    assert!(state.original_question.is_empty());
}

#[tokio::test]
async fn reset_zeroes_state_after_escalation() {
    let mut r = rig(
        MockLlm::new("escalate", "unused"),
        MockMemory::miss(),
        MockKnowledge::miss(),
        &["yes", "user@example.com", "555-0100"],
    );

    r.orchestrator.process_turn("broken order", false).await;
    assert!(r.orchestrator.escalation_needed());

    r.orchestrator.reset();
    let state = r.orchestrator.state();
    assert!(!state.escalation_needed);
    assert_eq!(state.clarification_attempts, 0);
    assert!(state.contact_email.is_empty());
    assert!(state.contact_phone.is_empty());
}
