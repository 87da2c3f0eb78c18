//! The query-engine seam.

use async_trait::async_trait;

use crate::table::ResultTable;

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The engine refused the query (parse error, unsupported form, evaluation error).
    #[error("query rejected: {0}")]
    Rejected(String),
    #[error("invalid engine response: {0}")]
    InvalidResponse(String),
    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

/// Query-in / table-out.
///
/// `query` is the complete text (prefix header included).
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn select(&self, query: &str) -> Result<ResultTable, EngineError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: QueryEngine + ?Sized> QueryEngine for std::sync::Arc<T> {
    async fn select(&self, query: &str) -> Result<ResultTable, EngineError> {
        (**self).select(query).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
