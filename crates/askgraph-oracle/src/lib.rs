//! Oracle interfaces: text completion and text embedding.
//!
//! Everything above this crate treats a language model as an opaque function:
//!
//! - a **completion oracle** maps an ordered list of role-tagged messages to
//!   output text, and
//! - an **embedding oracle** maps one input text to a fixed-length vector.
//!
//! The traits are the seam used by the pipeline; `openai` provides the
//! production client (OpenAI Responses + Embeddings endpoints, or any
//! compatible server behind `OPENAI_BASE_URL`).

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::{OpenAiClient, OpenAiConfig};

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System-level instructions (sent as `developer` on the Responses API).
    Developer,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Developer => "developer",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn developer(content: impl Into<String>) -> Self {
        Self {
            role: Role::Developer,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Determinism / effort hint for reasoning models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            reasoning_effort: None,
        }
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle configuration error: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// Oracle traits
// ============================================================================

/// Prompt-in / text-out.
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, OracleError>;
}

/// Text-in / vector-out.
#[async_trait]
pub trait EmbeddingOracle: Send + Sync {
    async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, OracleError>;
}

#[async_trait]
impl<T: CompletionOracle + ?Sized> CompletionOracle for std::sync::Arc<T> {
    async fn complete(&self, request: CompletionRequest) -> Result<String, OracleError> {
        (**self).complete(request).await
    }
}

#[async_trait]
impl<T: EmbeddingOracle + ?Sized> EmbeddingOracle for std::sync::Arc<T> {
    async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, OracleError> {
        (**self).embed(model, input).await
    }
}
