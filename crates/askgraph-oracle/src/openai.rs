//! OpenAI-compatible oracle client (Responses API + Embeddings API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{CompletionOracle, CompletionRequest, EmbeddingOracle, OracleError};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    /// `None` means no client-side timeout.
    pub timeout: Option<Duration>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout: None,
        }
    }

    /// Load from `OPENAI_API_KEY` / `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, OracleError> {
        let key = std::env::var(OPENAI_API_KEY_ENV).unwrap_or_default();
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(OracleError::Config(format!(
                "{OPENAI_API_KEY_ENV} is not set (export it; do not hardcode secrets)"
            )));
        }
        let mut config = Self::new(key);
        if let Ok(base) = std::env::var(OPENAI_BASE_URL_ENV) {
            if !base.trim().is_empty() {
                config.base_url = base;
            }
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

fn normalize_http_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/v1").unwrap_or(trimmed);
    if trimmed.is_empty() {
        DEFAULT_OPENAI_BASE_URL.to_string()
    } else {
        trimmed.to_string()
    }
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, OracleError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| OracleError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            api_key: config.api_key,
            base_url: normalize_http_base_url(&config.base_url),
        })
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value, OracleError> {
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| OracleError::Network(format!("failed to reach {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OracleError::Http {
                status: status.as_u16(),
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| OracleError::InvalidResponse(format!("invalid JSON from {url}: {e}")))
    }
}

/// Collect every `output_text` fragment of `message` items in a Responses API payload.
pub(crate) fn extract_output_text(v: &serde_json::Value) -> Option<String> {
    if let Some(text) = v.get("output_text").and_then(|x| x.as_str()) {
        return Some(text.to_string());
    }

    let mut out = String::new();
    let output = v.get("output")?.as_array()?;
    for item in output {
        // Reasoning items and tool calls carry no user-visible text.
        if item.get("type").and_then(|x| x.as_str()) != Some("message") {
            continue;
        }
        let Some(content) = item.get("content").and_then(|x| x.as_array()) else {
            continue;
        };
        for c in content {
            if c.get("type").and_then(|x| x.as_str()) != Some("output_text") {
                continue;
            }
            if let Some(t) = c.get("text").and_then(|x| x.as_str()) {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(t);
            }
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

#[async_trait]
impl CompletionOracle for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, OracleError> {
        let url = format!("{}/v1/responses", self.base_url);

        let input: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": request.model,
            "input": input,
        });
        if let Some(effort) = request.reasoning_effort {
            body["reasoning"] = json!({ "effort": effort.as_str() });
        }

        tracing::debug!(model = %request.model, messages = request.messages.len(), "completion request");
        let v = self.post_json(&url, &body).await?;
        extract_output_text(&v).ok_or_else(|| {
            OracleError::InvalidResponse("no output_text in response (unexpected response shape)".to_string())
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsRow {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingOracle for OpenAiClient {
    async fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, OracleError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": model,
            "input": input,
            "encoding_format": "float"
        });

        tracing::debug!(model = %model, chars = input.chars().count(), "embedding request");
        let v = self.post_json(&url, &body).await?;
        let parsed: EmbeddingsResponse = serde_json::from_value(v)
            .map_err(|e| OracleError::InvalidResponse(format!("embeddings payload: {e}")))?;
        let row = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::InvalidResponse("embeddings returned no vectors".to_string()))?;
        if row.embedding.is_empty() {
            return Err(OracleError::InvalidResponse("embeddings returned an empty vector".to_string()));
        }
        Ok(row.embedding)
    }
}
