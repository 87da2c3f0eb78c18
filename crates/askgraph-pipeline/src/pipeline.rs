//! One user turn, end to end.

use std::sync::Arc;

use askgraph_retrieval::EmbeddingRetriever;
use askgraph_sparql::{shorten_uri, ResultTable};

use crate::context::AskContext;
use crate::error::{ContextError, PipelineError};
use crate::executor::{Execution, QueryExecutor};
use crate::grouping::{BundleGrouper, ScenarioMatcher};
use crate::history::ConversationHistory;
use crate::summarizer::Summarizer;
use crate::synthesizer::{Synthesis, Synthesizer};

pub const NO_RESULTS: &str = "No results found.";

pub const APOLOGY: &str =
    "Sorry, something went wrong while answering your question. Please try again or rephrase it.";

/// `Query Results:` followed by the markdown table, or [`NO_RESULTS`].
pub fn render_results(table: &ResultTable, short_uris: bool) -> String {
    let body = if table.is_empty() {
        NO_RESULTS.to_string()
    } else if short_uris {
        table.to_markdown_with(shorten_uri)
    } else {
        table.to_markdown()
    };
    format!("Query Results:\n{body}")
}

pub fn assemble_response(execution: &Execution, results_text: &str, summary: &str) -> String {
    let mut out = execution.log_block();
    out.push_str(results_text);
    if !summary.is_empty() {
        out.push_str("\n\nSummary of results:\n");
        out.push_str(summary);
    }
    out
}

pub struct Pipeline {
    context: Arc<AskContext>,
    retriever: EmbeddingRetriever,
    synthesizer: Arc<Synthesizer>,
    executor: QueryExecutor,
    summarizer: Summarizer,
}

impl Pipeline {
    pub fn new(context: Arc<AskContext>) -> Result<Self, ContextError> {
        let settings = &context.settings;
        let retriever = EmbeddingRetriever::new(
            context.corpus.clone(),
            context.index.clone(),
            context.embedding.clone(),
            settings.embedding_model.clone(),
        )?;
        let synthesizer = Arc::new(
            Synthesizer::new(context.completion.clone(), context.prompts.sparql_system.clone())
                .with_model(settings.synthesis_model.clone())
                .with_bypass_marker(settings.bypass_marker.clone()),
        );
        let grouper = BundleGrouper::new(
            context.engine.clone(),
            ScenarioMatcher::new(settings.scenario_fragment.clone()),
        );
        let executor =
            QueryExecutor::new(context.engine.clone(), synthesizer.clone()).with_grouper(grouper);
        let summarizer =
            Summarizer::new(context.completion.clone(), context.prompts.summary_system.clone())
                .with_model(settings.summary_model.clone());

        tracing::info!(
            engine = %context.engine.describe(),
            fragments = context.corpus.fragment_count(),
            "pipeline ready"
        );
        Ok(Self {
            context,
            retriever,
            synthesizer,
            executor,
            summarizer,
        })
    }

    pub fn context(&self) -> &AskContext {
        &self.context
    }

    /// Answer `turn` given the prior conversation (which must not already
    /// contain `turn`).
    pub async fn answer(
        &self,
        turn: &str,
        history: &ConversationHistory,
    ) -> Result<String, PipelineError> {
        let settings = &self.context.settings;
        let request = history.serialize_with_turn(turn);

        let fragments = self.retriever.retrieve(&request, settings.k).await?;
        let raw = self.synthesizer.synthesize(&request, &fragments).await?;
        let query_text = match self.synthesizer.classify(&raw) {
            Synthesis::DirectReply(reply) => {
                tracing::info!("request answered without a query");
                return Ok(reply);
            }
            Synthesis::Query(text) => text,
        };

        let execution = self.executor.execute(&query_text, &request, &fragments).await;
        let results_text = render_results(&execution.table, settings.short_uris);
        let summary = self
            .summarizer
            .summarize(&execution.table, &results_text, &request)
            .await;
        Ok(assemble_response(&execution, &results_text, &summary))
    }

    /// Like [`Pipeline::answer`], but any failure becomes [`APOLOGY`].
    pub async fn answer_or_apology(&self, turn: &str, history: &ConversationHistory) -> String {
        match self.answer(turn, history).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                APOLOGY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RepairStage;
    use askgraph_sparql::StructuredQuery;

    fn execution(table: ResultTable) -> Execution {
        Execution {
            table,
            executed_query: StructuredQuery::new("SELECT ?s WHERE { ?s ?p ?o }"),
            stages: vec![RepairStage::InitialAttempt],
            submissions: 1,
        }
    }

    #[test]
    fn empty_table_renders_no_results() {
        assert_eq!(
            render_results(&ResultTable::empty_sentinel(), false),
            "Query Results:\nNo results found."
        );
    }

    #[test]
    fn short_uris_apply_to_cells() {
        let t = ResultTable::new(
            vec!["s".into()],
            vec![vec![Some("https://openenergyplatform.org/ontology/oeo/OEO_1".into())]],
        );
        assert!(render_results(&t, true).contains("oeo:OEO_1"));
        assert!(render_results(&t, false).contains("https://openenergyplatform.org/ontology/oeo/OEO_1"));
    }

    #[test]
    fn summary_section_only_when_present() {
        let exec = execution(ResultTable::empty_sentinel());
        let without = assemble_response(&exec, "Query Results:\nNo results found.", "");
        assert!(without.starts_with("Generated Query:\n```sparql\n"));
        assert!(without.ends_with("```\n\nQuery Results:\nNo results found."));
        assert!(!without.contains("Summary of results"));

        let with = assemble_response(&exec, "Query Results:\n| s |", "One entry.");
        assert!(with.ends_with("Query Results:\n| s |\n\nSummary of results:\nOne entry."));
    }
}
