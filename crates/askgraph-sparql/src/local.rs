//! In-process triple store: the whole graph is materialized once at startup
//! and queried through oxigraph's SPARQL evaluator.

use std::path::Path;

use async_trait::async_trait;
use oxigraph::io::RdfFormat;
use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::engine::{EngineError, QueryEngine};
use crate::table::ResultTable;

/// Public OEKG snapshot, used when no live export is configured.
pub const OEKG_FALLBACK_TURTLE_URL: &str = "https://github.com/OpenEnergyPlatform/oekg/raw/3449824246e39c10d0fd66028159b7b10040ce67/oekg/oekg_rework/output_rework_oekg_final.ttl";

#[derive(Clone)]
pub struct LocalGraphStore {
    store: Store,
    source: String,
}

impl LocalGraphStore {
    /// Parse Turtle bytes into a fresh in-memory store.
    pub fn from_turtle(data: &[u8], source: impl Into<String>) -> Result<Self, EngineError> {
        let store = Store::new().map_err(|e| EngineError::Unavailable(format!("failed to create store: {e}")))?;
        store
            .load_from_reader(RdfFormat::Turtle, data)
            .map_err(|e| EngineError::Unavailable(format!("failed to parse Turtle: {e}")))?;
        let source = source.into();
        tracing::info!(source = %source, "knowledge graph loaded");
        Ok(Self { store, source })
    }

    pub fn load_file(path: &Path) -> Result<Self, EngineError> {
        let data = std::fs::read(path)
            .map_err(|e| EngineError::Unavailable(format!("failed to read {}: {e}", path.display())))?;
        Self::from_turtle(&data, path.display().to_string())
    }

    pub async fn load_url(url: &str) -> Result<Self, EngineError> {
        let data = fetch_turtle(url).await?;
        Self::from_turtle(&data, url)
    }

    pub fn triple_count(&self) -> Result<usize, EngineError> {
        self.store
            .len()
            .map_err(|e| EngineError::Unavailable(format!("failed to count triples: {e}")))
    }
}

/// Download a Turtle export.
pub async fn fetch_turtle(url: &str) -> Result<Vec<u8>, EngineError> {
    let resp = reqwest::get(url)
        .await
        .map_err(|e| EngineError::Unavailable(format!("failed to reach {url}: {e}")))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(EngineError::Unavailable(format!("GET {url} returned {status}")));
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| EngineError::Unavailable(format!("failed to download {url}: {e}")))?;
    Ok(bytes.to_vec())
}

fn term_value(term: &Term) -> String {
    #[allow(unreachable_patterns)]
    match term {
        Term::NamedNode(n) => n.as_str().to_string(),
        Term::BlankNode(b) => b.as_str().to_string(),
        Term::Literal(l) => l.value().to_string(),
        other => other.to_string(),
    }
}

fn evaluate(store: &Store, query: &str) -> Result<ResultTable, EngineError> {
    let results = store
        .query(query)
        .map_err(|e| EngineError::Rejected(e.to_string()))?;

    match results {
        QueryResults::Solutions(solutions) => {
            let columns: Vec<String> = solutions
                .variables()
                .iter()
                .map(|v| v.as_str().to_string())
                .collect();
            let mut rows = Vec::new();
            for solution in solutions {
                let solution = solution.map_err(|e| EngineError::Rejected(e.to_string()))?;
                rows.push(
                    columns
                        .iter()
                        .map(|var| solution.get(var.as_str()).map(term_value))
                        .collect(),
                );
            }
            Ok(ResultTable::new(columns, rows))
        }
        QueryResults::Boolean(b) => Ok(ResultTable::new(
            vec!["boolean".to_string()],
            vec![vec![Some(b.to_string())]],
        )),
        QueryResults::Graph(_) => Err(EngineError::Rejected(
            "CONSTRUCT/DESCRIBE queries do not produce a table; use SELECT".to_string(),
        )),
    }
}

#[async_trait]
impl QueryEngine for LocalGraphStore {
    async fn select(&self, query: &str) -> Result<ResultTable, EngineError> {
        let store = self.store.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || evaluate(&store, &query))
            .await
            .map_err(|e| EngineError::Unavailable(format!("query task failed: {e}")))?
    }

    fn describe(&self) -> String {
        format!("local store ({})", self.source)
    }
}
