//! Embedding retriever: text → top-k schema fragments.

use std::sync::Arc;

use askgraph_oracle::{EmbeddingOracle, OracleError};

use crate::corpus::{SchemaCorpus, SchemaFragment};
use crate::index::{IndexError, VectorIndex};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("embedding request failed: {0}")]
    Embedding(#[from] OracleError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("vector index has {index_rows} rows but the id list has {id_rows}")]
    Misaligned { index_rows: usize, id_rows: usize },
    #[error("vector index returned ordinal {0} with no corpus entry")]
    UnknownOrdinal(usize),
}

pub struct EmbeddingRetriever {
    corpus: Arc<SchemaCorpus>,
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingOracle>,
    model: String,
}

impl EmbeddingRetriever {
    pub fn new(
        corpus: Arc<SchemaCorpus>,
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingOracle>,
        model: impl Into<String>,
    ) -> Result<Self, RetrievalError> {
        if index.len() != corpus.len() {
            return Err(RetrievalError::Misaligned {
                index_rows: index.len(),
                id_rows: corpus.len(),
            });
        }
        Ok(Self {
            corpus,
            index,
            embedder,
            model: model.into(),
        })
    }

    pub fn corpus(&self) -> &SchemaCorpus {
        &self.corpus
    }

    /// Embed `text` and return the `k` closest fragments, nearest first.
    ///
    /// One outbound embedding request; failures are not retried.
    pub async fn retrieve(&self, text: &str, k: usize) -> Result<Vec<SchemaFragment>, RetrievalError> {
        let vector = self.embedder.embed(&self.model, text).await?;
        let hits = self.index.search(&vector, k)?;

        let mut fragments = Vec::with_capacity(hits.len());
        for (ordinal, _distance) in hits {
            let fragment = self
                .corpus
                .fragment_for_ordinal(ordinal)
                .ok_or(RetrievalError::UnknownOrdinal(ordinal))?;
            fragments.push(fragment.clone());
        }

        tracing::info!(k, retrieved = fragments.len(), "schema context retrieved");
        Ok(fragments)
    }
}
