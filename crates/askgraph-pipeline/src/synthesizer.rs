//! Query synthesis: request + schema context → candidate query text.
//!
//! The oracle output is returned verbatim. Validity is only discovered by
//! running it (see [`crate::executor`]).

use std::sync::Arc;

use askgraph_oracle::{CompletionOracle, CompletionRequest, Message, ReasoningEffort};
use askgraph_retrieval::SchemaFragment;

use crate::error::SynthesisError;

pub const DEFAULT_SYNTHESIS_MODEL: &str = "gpt-5";

/// Marks an out-of-domain turn; the text after it is a direct reply.
pub const DEFAULT_BYPASS_MARKER: &str = "[[NO_QUERY]]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    Query(String),
    DirectReply(String),
}

/// Split synthesizer output on the first occurrence of `marker`.
pub fn classify_synthesis(text: &str, marker: &str) -> Synthesis {
    if marker.is_empty() {
        return Synthesis::Query(text.to_string());
    }
    match text.find(marker) {
        Some(pos) => Synthesis::DirectReply(text[pos + marker.len()..].trim_start().to_string()),
        None => Synthesis::Query(text.to_string()),
    }
}

pub fn build_user_prompt(request: &str, context: &[SchemaFragment]) -> Result<String, serde_json::Error> {
    let records: Vec<&serde_json::Value> = context.iter().map(|f| &f.record).collect();
    let json = serde_json::to_string_pretty(&records)?;
    Ok(format!(
        "Request: {request}\n\nContext with classes and their allowed relations and properties:\n{json}"
    ))
}

pub struct Synthesizer {
    oracle: Arc<dyn CompletionOracle>,
    system_prompt: String,
    model: String,
    bypass_marker: String,
}

impl Synthesizer {
    pub fn new(oracle: Arc<dyn CompletionOracle>, system_prompt: impl Into<String>) -> Self {
        Self {
            oracle,
            system_prompt: system_prompt.into(),
            model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            bypass_marker: DEFAULT_BYPASS_MARKER.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_bypass_marker(mut self, marker: impl Into<String>) -> Self {
        self.bypass_marker = marker.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One completion call; the raw output is returned as-is.
    pub async fn synthesize(
        &self,
        request: &str,
        context: &[SchemaFragment],
    ) -> Result<String, SynthesisError> {
        let user_prompt = build_user_prompt(request, context)?;
        let completion = CompletionRequest::new(
            self.model.clone(),
            vec![
                Message::developer(self.system_prompt.clone()),
                Message::user(user_prompt),
            ],
        )
        .with_reasoning_effort(ReasoningEffort::Minimal);

        let text = self.oracle.complete(completion).await?;
        tracing::debug!(model = %self.model, chars = text.len(), "query synthesized");
        Ok(text)
    }

    pub fn classify(&self, text: &str) -> Synthesis {
        classify_synthesis(text, &self.bypass_marker)
    }
}
