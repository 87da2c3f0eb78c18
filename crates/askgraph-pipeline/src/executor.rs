//! Query execution with bounded, stage-specific repair.
//!
//! ```text
//! InitialAttempt ──rejected──▶ SyntaxRepair ──┐
//!       │                                     │
//!       └────────────── empty? ◀──────────────┘
//!                         │ yes
//!                         ▼
//!                 EmptyResultRepair ──▶ Done
//! ```
//!
//! Only a query the engine rejects goes to SyntaxRepair; an unavailable
//! engine or an undecodable response counts as an empty result.
//!
//! Each stage runs at most once, so a turn issues at most three engine
//! submissions and at most two synthesis calls beyond the initial one.
//! Failures inside a repair stage are never surfaced; they produce an empty
//! table and the loop moves on.

use std::sync::Arc;

use askgraph_retrieval::SchemaFragment;
use askgraph_sparql::{EngineError, QueryEngine, ResultTable, StructuredQuery};

use crate::grouping::BundleGrouper;
use crate::synthesizer::Synthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStage {
    InitialAttempt,
    SyntaxRepair,
    EmptyResultRepair,
}

/// Outcome of one request's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub table: ResultTable,
    /// The last query body that was attempted, under the prefix header.
    pub executed_query: StructuredQuery,
    pub stages: Vec<RepairStage>,
    pub submissions: usize,
}

impl Execution {
    pub fn log_block(&self) -> String {
        format!(
            "Generated Query:\n```sparql\n{}\n```\n\n",
            self.executed_query.full_text()
        )
    }
}

pub fn syntax_repair_request(request: &str, body: &str, message: &str) -> String {
    format!(
        "{request}\n\nThe previous SPARQL query was not correct:\n{body}\nThe following error occurred:\n{message}"
    )
}

pub fn empty_result_repair_request(request: &str, body: &str) -> String {
    format!(
        "{request}\n\nThe previous SPARQL query has not returned any results:\n{body}\nPlease check the query again and also check if your constraints were too strict. Also take into account that you may have to search for the pattern in the labels of subclasses of the mentioned entity."
    )
}

pub struct QueryExecutor {
    engine: Arc<dyn QueryEngine>,
    synthesizer: Arc<Synthesizer>,
    grouper: Option<BundleGrouper>,
}

impl QueryExecutor {
    pub fn new(engine: Arc<dyn QueryEngine>, synthesizer: Arc<Synthesizer>) -> Self {
        Self {
            engine,
            synthesizer,
            grouper: None,
        }
    }

    pub fn with_grouper(mut self, grouper: BundleGrouper) -> Self {
        self.grouper = Some(grouper);
        self
    }

    async fn submit(
        &self,
        query: &StructuredQuery,
        submissions: &mut usize,
    ) -> Result<ResultTable, EngineError> {
        *submissions += 1;
        self.engine.select(&query.full_text()).await
    }

    /// Re-synthesize from `feedback` and submit; any failure is an empty table.
    async fn repair(
        &self,
        stage: RepairStage,
        feedback: String,
        context: &[SchemaFragment],
        query: &mut StructuredQuery,
        submissions: &mut usize,
    ) -> ResultTable {
        let body = match self.synthesizer.synthesize(&feedback, context).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(?stage, error = %e, "repair synthesis failed");
                return ResultTable::empty_sentinel();
            }
        };
        query.replace_body(body);
        match self.submit(query, submissions).await {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!(?stage, error = %e, "repaired query failed");
                ResultTable::empty_sentinel()
            }
        }
    }

    pub async fn execute(
        &self,
        query_text: &str,
        request: &str,
        context: &[SchemaFragment],
    ) -> Execution {
        let mut query = StructuredQuery::new(query_text);
        let mut stages = vec![RepairStage::InitialAttempt];
        let mut submissions = 0;

        let mut table = match self.submit(&query, &mut submissions).await {
            Ok(table) => table,
            Err(EngineError::Rejected(message)) => {
                tracing::info!(engine = %self.engine.describe(), error = %message, "query rejected; attempting syntax repair");
                stages.push(RepairStage::SyntaxRepair);
                let feedback = syntax_repair_request(request, query.body(), &message);
                self.repair(
                    RepairStage::SyntaxRepair,
                    feedback,
                    context,
                    &mut query,
                    &mut submissions,
                )
                .await
            }
            Err(e) => {
                tracing::warn!(engine = %self.engine.describe(), error = %e, "engine failed; treating as empty result");
                ResultTable::empty_sentinel()
            }
        };

        if table.is_empty() {
            tracing::info!("query returned no rows; attempting relaxed repair");
            stages.push(RepairStage::EmptyResultRepair);
            let feedback = empty_result_repair_request(request, query.body());
            table = self
                .repair(
                    RepairStage::EmptyResultRepair,
                    feedback,
                    context,
                    &mut query,
                    &mut submissions,
                )
                .await;
        }

        if let Some(grouper) = &self.grouper {
            table = grouper.group(table).await;
        }

        tracing::info!(
            rows = table.row_count(),
            submissions,
            stages = stages.len(),
            "query execution finished"
        );
        Execution {
            table,
            executed_query: query,
            stages,
            submissions,
        }
    }
}
