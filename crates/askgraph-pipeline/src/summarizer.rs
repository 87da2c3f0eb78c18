//! Best-effort natural-language summary of a result table.

use std::sync::Arc;

use askgraph_oracle::{CompletionOracle, CompletionRequest, Message};
use askgraph_sparql::ResultTable;

pub const DEFAULT_SUMMARY_MODEL: &str = "gpt-5-nano";

/// Rendered results at or above this many characters are not summarized.
pub const SUMMARY_CHAR_LIMIT: usize = 10_000;

pub fn should_summarize(table: &ResultTable, results_text: &str) -> bool {
    !table.is_empty() && results_text.chars().count() < SUMMARY_CHAR_LIMIT
}

pub fn build_summary_prompt(request: &str, results_text: &str) -> String {
    format!(
        "The user's question: {request}\nThe formatted results from the SPARQL query: {results_text}"
    )
}

pub struct Summarizer {
    oracle: Arc<dyn CompletionOracle>,
    system_prompt: String,
    model: String,
}

impl Summarizer {
    pub fn new(oracle: Arc<dyn CompletionOracle>, system_prompt: impl Into<String>) -> Self {
        Self {
            oracle,
            system_prompt: system_prompt.into(),
            model: DEFAULT_SUMMARY_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Returns "" when skipped or when the oracle fails.
    pub async fn summarize(&self, table: &ResultTable, results_text: &str, request: &str) -> String {
        if !should_summarize(table, results_text) {
            tracing::debug!(
                rows = table.row_count(),
                chars = results_text.chars().count(),
                "summary skipped"
            );
            return String::new();
        }
        let completion = CompletionRequest::new(
            self.model.clone(),
            vec![
                Message::developer(self.system_prompt.clone()),
                Message::user(build_summary_prompt(request, results_text)),
            ],
        );
        match self.oracle.complete(completion).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, "summary failed");
                String::new()
            }
        }
    }
}
