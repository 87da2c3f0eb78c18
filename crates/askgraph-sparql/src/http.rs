//! Remote SPARQL endpoint over HTTP.
//!
//! Transport problems (unreachable host, timeout, non-2xx status, undecodable
//! payload) are retried a fixed number of times with a fixed delay. After the
//! last attempt the endpoint answers with [`ResultTable::empty_sentinel`]
//! instead of an error, so the caller handles it exactly like a query that
//! matched nothing.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::engine::{EngineError, QueryEngine};
use crate::table::ResultTable;

pub const OEKG_SPARQL_ENDPOINT: &str = "https://openenergyplatform.org/api/v0/oekg/sparql/";

#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub url: String,
    /// Sent as `Authorization: Token <token>`.
    pub token: Option<String>,
    pub timeout: Duration,
    pub attempts: u32,
    pub retry_delay: Duration,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            timeout: Duration::from_secs(30),
            attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }
}

pub struct HttpSparqlEndpoint {
    client: Client,
    config: EndpointConfig,
}

impl HttpSparqlEndpoint {
    pub fn new(config: EndpointConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EngineError::Unavailable(format!("failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    async fn select_once(&self, query: &str) -> Result<ResultTable, EngineError> {
        let payload = json!({ "query": query, "format": "json" });
        let mut req = self.client.post(&self.config.url).json(&payload);
        if let Some(token) = &self.config.token {
            req = req.header("Authorization", format!("Token {token}"));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| EngineError::Unavailable(format!("failed to reach {}: {e}", self.config.url)))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngineError::Unavailable(format!("http {status}: {body}")));
        }
        let v: Value = resp
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;
        decode_endpoint_payload(v)
    }
}

/// Some deployments return the SPARQL JSON document encoded as a JSON string.
pub(crate) fn decode_endpoint_payload(v: Value) -> Result<ResultTable, EngineError> {
    match v {
        Value::String(inner) => {
            let inner: Value =
                serde_json::from_str(&inner).map_err(|e| EngineError::InvalidResponse(e.to_string()))?;
            ResultTable::from_sparql_json(&inner)
        }
        other => ResultTable::from_sparql_json(&other),
    }
}

#[async_trait]
impl QueryEngine for HttpSparqlEndpoint {
    async fn select(&self, query: &str) -> Result<ResultTable, EngineError> {
        let attempts = self.config.attempts.max(1);
        for attempt in 1..=attempts {
            match self.select_once(query).await {
                Ok(table) => return Ok(table),
                Err(e) => {
                    tracing::warn!(attempt, attempts, error = %e, "sparql endpoint request failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }
        tracing::warn!(url = %self.config.url, "sparql endpoint exhausted retries; returning empty result");
        Ok(ResultTable::empty_sentinel())
    }

    fn describe(&self) -> String {
        format!("sparql endpoint ({})", self.config.url)
    }
}
