//! Build the shared `AskContext` from flags and environment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Args;

use askgraph_oracle::{OpenAiClient, OpenAiConfig};
use askgraph_pipeline::{
    AskContext, AskSettings, Pipeline, Prompts, DEFAULT_BYPASS_MARKER, DEFAULT_HISTORY_TURNS,
    DEFAULT_RETRIEVAL_K, DEFAULT_SCENARIO_FRAGMENT, DEFAULT_SUMMARY_MODEL, DEFAULT_SYNTHESIS_MODEL,
};
use askgraph_retrieval::{SchemaCorpus, VectorIndex, DEFAULT_EMBEDDING_MODEL};
use askgraph_sparql::{
    EndpointConfig, HttpSparqlEndpoint, LocalGraphStore, QueryEngine, OEKG_FALLBACK_TURTLE_URL,
    OEKG_SPARQL_ENDPOINT,
};

pub const OEP_API_TOKEN_ENV: &str = "OEP_API_TOKEN";
pub const DEFAULT_INDEX_FILE: &str = "vector_index.cbor";

#[derive(Args, Debug, Clone)]
pub struct ContextArgs {
    /// Directory with classes.json, relations_final.json, ids.json, the
    /// vector index and optional prompt overrides
    #[arg(long, env = "ASKGRAPH_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Vector index file (default: <data-dir>/vector_index.cbor)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Load a Turtle file into an in-process store
    #[arg(long, conflicts_with_all = ["graph_url", "endpoint"])]
    pub graph: Option<PathBuf>,

    /// Download a Turtle export into an in-process store (falls back to the
    /// public OEKG snapshot if the download fails)
    #[arg(long, conflicts_with = "endpoint")]
    pub graph_url: Option<String>,

    /// Remote SPARQL endpoint (default when no graph is given)
    #[arg(long)]
    pub endpoint: Option<String>,

    #[arg(long, default_value = DEFAULT_SYNTHESIS_MODEL)]
    pub synthesis_model: String,

    #[arg(long, default_value = DEFAULT_SUMMARY_MODEL)]
    pub summary_model: String,

    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Schema fragments retrieved per question
    #[arg(short = 'k', long, default_value_t = DEFAULT_RETRIEVAL_K)]
    pub k: usize,

    /// User turns kept in the chat window
    #[arg(long, default_value_t = DEFAULT_HISTORY_TURNS)]
    pub history_turns: usize,

    #[arg(long, default_value = DEFAULT_BYPASS_MARKER)]
    pub bypass_marker: String,

    /// Substring that identifies scenario IRIs for bundle grouping
    #[arg(long, default_value = DEFAULT_SCENARIO_FRAGMENT)]
    pub scenario_fragment: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Client-side timeout for oracle calls (none by default)
    #[arg(long)]
    pub llm_timeout_secs: Option<u64>,

    /// Render known-namespace IRIs as prefixed names
    #[arg(long)]
    pub short_uris: bool,
}

impl ContextArgs {
    pub fn settings(&self) -> AskSettings {
        AskSettings {
            synthesis_model: self.synthesis_model.clone(),
            summary_model: self.summary_model.clone(),
            embedding_model: self.embedding_model.clone(),
            k: self.k,
            history_turns: self.history_turns,
            bypass_marker: self.bypass_marker.clone(),
            scenario_fragment: self.scenario_fragment.clone(),
            short_uris: self.short_uris,
        }
    }

    fn index_path(&self) -> PathBuf {
        self.index
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_INDEX_FILE))
    }
}

async fn build_engine(args: &ContextArgs) -> Result<Arc<dyn QueryEngine>> {
    if let Some(path) = &args.graph {
        let store = LocalGraphStore::load_file(path)
            .with_context(|| format!("failed to load graph {}", path.display()))?;
        return Ok(Arc::new(store));
    }
    if let Some(url) = &args.graph_url {
        let store = match LocalGraphStore::load_url(url).await {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "graph download failed; using public snapshot");
                LocalGraphStore::load_url(OEKG_FALLBACK_TURTLE_URL)
                    .await
                    .context("failed to load public OEKG snapshot")?
            }
        };
        return Ok(Arc::new(store));
    }

    let url = args
        .endpoint
        .clone()
        .unwrap_or_else(|| OEKG_SPARQL_ENDPOINT.to_string());
    let token = std::env::var(OEP_API_TOKEN_ENV).ok();
    if token.is_none() {
        tracing::debug!("{OEP_API_TOKEN_ENV} not set; querying endpoint anonymously");
    }
    let endpoint = HttpSparqlEndpoint::new(EndpointConfig::new(url).with_token(token))?;
    Ok(Arc::new(endpoint))
}

pub async fn build_pipeline(args: &ContextArgs) -> Result<Pipeline> {
    let mut oracle_config = OpenAiConfig::from_env()?;
    if let Some(base) = &args.openai_base_url {
        oracle_config = oracle_config.with_base_url(base.clone());
    }
    let oracle_config = oracle_config.with_timeout(args.llm_timeout_secs.map(Duration::from_secs));
    let oracle = Arc::new(OpenAiClient::new(oracle_config)?);

    let corpus = SchemaCorpus::load_dir(&args.data_dir).with_context(|| {
        format!("failed to load schema corpus from {}", args.data_dir.display())
    })?;
    let index_path = args.index_path();
    let index = VectorIndex::load(&index_path)
        .with_context(|| format!("failed to load vector index {}", index_path.display()))?;
    if index.model() != args.embedding_model {
        return Err(anyhow!(
            "vector index was built with `{}` but --embedding-model is `{}`",
            index.model(),
            args.embedding_model
        ));
    }
    let prompts = Prompts::load_overrides(&args.data_dir)?;
    let engine = build_engine(args).await?;

    let context = AskContext {
        settings: args.settings(),
        prompts,
        corpus: Arc::new(corpus),
        index: Arc::new(index),
        engine,
        completion: oracle.clone(),
        embedding: oracle,
    };
    Ok(Pipeline::new(Arc::new(context))?)
}
