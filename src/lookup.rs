//! Memory and knowledge lookup adapters.
//!
//! The memory store is a semantic cache of previously answered questions; the
//! knowledge store is the document knowledge base. Both sit behind remote
//! vector-search services that own the embedding computation, so the adapters
//! here are plain HTTP clients: post the query text, decode matched rows.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::{KnowledgeConfig, MemoryConfig};
use crate::error::LookupError;
use crate::state::{Answer, Chunk};

/// Semantic cache of prior question/answer pairs.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Look up a semantically similar previously answered question.
    async fn lookup(&self, question: &str) -> Result<Answer, LookupError>;

    /// Store a freshly resolved answer keyed by question. Best-effort:
    /// callers log failures and never surface them to the user.
    async fn upsert(&self, question: &str, answer: &str) -> Result<(), LookupError>;
}

/// Document knowledge base.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn search(&self, question: &str) -> Result<Answer, LookupError>;
}

fn build_client(store: &str) -> Result<Client, LookupError> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| LookupError::RequestFailed {
            store: store.to_string(),
            reason: format!("Failed to build reqwest client: {e}"),
        })
}

fn add_auth_header(
    request: reqwest::RequestBuilder,
    api_key: Option<&SecretString>,
) -> reqwest::RequestBuilder {
    match api_key {
        Some(key) => request.header("Authorization", format!("Bearer {}", key.expose_secret())),
        None => request,
    }
}

async fn post_rows<T: Serialize>(
    client: &Client,
    store: &'static str,
    url: &str,
    api_key: Option<&SecretString>,
    body: &T,
) -> Result<Vec<Chunk>, LookupError> {
    let request = add_auth_header(client.post(url).json(body), api_key);

    let response = request.send().await.map_err(|e| LookupError::RequestFailed {
        store: store.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(LookupError::RequestFailed {
            store: store.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    response
        .json::<Vec<Chunk>>()
        .await
        .map_err(|e| LookupError::InvalidResponse {
            store: store.to_string(),
            reason: e.to_string(),
        })
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    query: &'a str,
    match_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    match_threshold: Option<f32>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    question: &'a str,
    answer: &'a str,
}

/// HTTP adapter for the Q/A memory service.
pub struct HttpMemoryStore {
    client: Client,
    config: MemoryConfig,
}

impl HttpMemoryStore {
    pub fn new(config: MemoryConfig) -> Result<Self, LookupError> {
        Ok(Self {
            client: build_client("memory")?,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl MemoryStore for HttpMemoryStore {
    async fn lookup(&self, question: &str) -> Result<Answer, LookupError> {
        let body = MatchRequest {
            query: question,
            match_count: self.config.match_count,
            match_threshold: Some(self.config.match_threshold),
        };
        let rows = post_rows(
            &self.client,
            "memory",
            &self.url("match"),
            self.config.api_key.as_ref(),
            &body,
        )
        .await?;

        tracing::debug!(found = !rows.is_empty(), "memory lookup");
        if rows.is_empty() {
            Ok(Answer::not_found())
        } else {
            Ok(Answer::found(rows))
        }
    }

    async fn upsert(&self, question: &str, answer: &str) -> Result<(), LookupError> {
        let body = UpsertRequest { question, answer };
        let request = add_auth_header(
            self.client.post(self.url("upsert")).json(&body),
            self.config.api_key.as_ref(),
        );

        let response = request.send().await.map_err(|e| LookupError::RequestFailed {
            store: "memory".to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::RequestFailed {
                store: "memory".to_string(),
                reason: format!("HTTP {status}"),
            });
        }
        Ok(())
    }
}

/// HTTP adapter for the document knowledge base service.
pub struct HttpKnowledgeStore {
    client: Client,
    config: KnowledgeConfig,
}

impl HttpKnowledgeStore {
    pub fn new(config: KnowledgeConfig) -> Result<Self, LookupError> {
        Ok(Self {
            client: build_client("knowledge")?,
            config,
        })
    }

    fn url(&self) -> String {
        format!("{}/match", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl KnowledgeStore for HttpKnowledgeStore {
    async fn search(&self, question: &str) -> Result<Answer, LookupError> {
        let body = MatchRequest {
            query: question,
            match_count: self.config.match_count,
            match_threshold: None,
        };
        let rows = post_rows(
            &self.client,
            "knowledge",
            &self.url(),
            self.config.api_key.as_ref(),
            &body,
        )
        .await?;

        tracing::debug!(found = !rows.is_empty(), "knowledge search");
        if rows.is_empty() {
            Ok(Answer::not_found())
        } else {
            Ok(Answer::found(rows))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_url_strips_trailing_slash() {
        let store = HttpMemoryStore::new(MemoryConfig {
            endpoint: "https://vectors.example.com/memory/".to_string(),
            api_key: None,
            match_threshold: 0.82,
            match_count: 1,
        })
        .unwrap();
        assert_eq!(store.url("match"), "https://vectors.example.com/memory/match");
    }

    #[test]
    fn chunk_rows_decode_both_shapes() {
        let memory_row: Chunk =
            serde_json::from_str(r#"{"question":"how to book","answer":"Tap Book."}"#).unwrap();
        assert_eq!(memory_row.answer.as_deref(), Some("Tap Book."));

        let kb_row: Chunk = serde_json::from_str(r#"{"content":"Booking guide..."}"#).unwrap();
        assert_eq!(kb_row.content, "Booking guide...");
        assert!(kb_row.answer.is_none());
    }
}
