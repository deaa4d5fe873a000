//! Error types for deskhand.

use std::time::Duration;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Errors from the memory and knowledge lookup adapters.
///
/// Always non-fatal to the turn: the search controller coerces these to
/// not-found and logs them.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Lookup request to {store} failed: {reason}")]
    RequestFailed { store: String, reason: String },

    #[error("Invalid response from {store}: {reason}")]
    InvalidResponse { store: String, reason: String },
}

/// Errors delivering an escalation notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Webhook delivery failed with status {status}")]
    DeliveryFailed { status: u16 },

    #[error("Notifier not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors reading interactive input during escalation collection.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Input channel closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
