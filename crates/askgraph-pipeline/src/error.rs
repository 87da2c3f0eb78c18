use std::path::PathBuf;

use askgraph_oracle::OracleError;
use askgraph_retrieval::RetrievalError;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("query synthesis failed: {0}")]
    Oracle(#[from] OracleError),
    #[error("failed to serialize schema context: {0}")]
    Context(#[from] serde_json::Error),
}

/// A failure that ends the turn.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}
