//! Schema-fragment retrieval.
//!
//! The retriever grounds query synthesis: it embeds the (history-prefixed)
//! request, searches the prebuilt vector index, and resolves the returned
//! ordinals through the id list into [`SchemaFragment`]s.
//!
//! All three artifacts (corpus, id list, vectors) are loaded once and are
//! read-only afterwards, so a single [`EmbeddingRetriever`] can be shared
//! across sessions.

pub mod corpus;
pub mod index;
pub mod retriever;

pub use corpus::{CorpusError, FragmentKind, SchemaCorpus, SchemaFragment};
pub use index::{
    decode_vector_index_file_v1, encode_vector_index_file_v1, IndexError, VectorIndex, VectorIndexFileV1,
    VECTOR_INDEX_FILE_VERSION_V1,
};
pub use retriever::{EmbeddingRetriever, RetrievalError, DEFAULT_EMBEDDING_MODEL};
