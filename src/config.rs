//! Configuration for deskhand.
//!
//! Everything is sourced from environment variables (with `.env` support via
//! dotenvy). Each component gets its own sub-config with a `from_env`
//! constructor so the binary can wire adapters independently.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Main configuration for the agent.
#[derive(Debug, Clone)]
pub struct Config {
    pub agent: AgentConfig,
    pub llm: LlmConfig,
    pub memory: MemoryConfig,
    pub knowledge: KnowledgeConfig,
    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            agent: AgentConfig::from_env()?,
            llm: LlmConfig::from_env()?,
            memory: MemoryConfig::from_env()?,
            knowledge: KnowledgeConfig::from_env()?,
            notify: NotifyConfig::from_env()?,
        })
    }
}

/// Turn-processing policy knobs.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// How many clarification prompts may be issued before a failed turn
    /// forces escalation.
    pub max_clarification_attempts: u32,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_clarification_attempts: parse_optional_env("MAX_CLARIFICATION_ATTEMPTS", 1)?,
        })
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_clarification_attempts: 1,
        }
    }
}

/// LLM provider configuration (OpenAI-compatible Chat Completions endpoint).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of the endpoint, e.g. `https://openrouter.ai/api`.
    pub base_url: String,
    /// Bearer token, if the endpoint requires one.
    pub api_key: Option<SecretString>,
    /// Model identifier passed through to the endpoint.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: require_env("LLM_BASE_URL")?,
            api_key: optional_env("LLM_API_KEY")?.map(SecretString::from),
            model: optional_env("LLM_MODEL")?.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            temperature: parse_optional_env("LLM_TEMPERATURE", 0.4)?,
            max_tokens: parse_optional_env("LLM_MAX_TOKENS", 500)?,
        })
    }
}

/// Semantic memory store (prior Q/A pairs) adapter configuration.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Base URL of the vector-search service for the Q/A memory table.
    pub endpoint: String,
    pub api_key: Option<SecretString>,
    /// Cosine-similarity threshold below which a row is not a match.
    pub match_threshold: f32,
    /// Maximum rows returned per lookup.
    pub match_count: u32,
}

impl MemoryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: require_env("MEMORY_ENDPOINT")?,
            api_key: optional_env("MEMORY_API_KEY")?.map(SecretString::from),
            match_threshold: parse_optional_env("MEMORY_MATCH_THRESHOLD", 0.82)?,
            match_count: parse_optional_env("MEMORY_MATCH_COUNT", 1)?,
        })
    }
}

/// Knowledge base (document store) adapter configuration.
#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    pub endpoint: String,
    pub api_key: Option<SecretString>,
    pub match_count: u32,
}

impl KnowledgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: require_env("KNOWLEDGE_ENDPOINT")?,
            api_key: optional_env("KNOWLEDGE_API_KEY")?.map(SecretString::from),
            match_count: parse_optional_env("KNOWLEDGE_MATCH_COUNT", 3)?,
        })
    }
}

/// Escalation notification configuration.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Incoming-webhook URL for the human support channel. Treated as a
    /// secret: webhook URLs embed their auth token.
    pub webhook_url: Option<SecretString>,
    /// Address quoted to the user when delivery to the channel fails.
    pub support_email: String,
}

impl NotifyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            webhook_url: optional_env("SUPPORT_WEBHOOK_URL")?.map(SecretString::from),
            support_email: optional_env("SUPPORT_EMAIL")?
                .unwrap_or_else(|| "support@bewhoop.com".to_string()),
        })
    }
}

pub(crate) fn require_env(key: &str) -> Result<String, ConfigError> {
    optional_env(key)?.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|v| v.unwrap_or(default))
}
