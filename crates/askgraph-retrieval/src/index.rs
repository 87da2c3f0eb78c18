//! Prebuilt, read-only vector index over schema fragments.
//!
//! The index file stores one embedding per id-list row (CBOR, or JSON when
//! the path ends in `.json`). At load time the rows are inserted into an
//! HNSW graph (L2) that is search-only afterwards.

use std::path::{Path, PathBuf};

use hnsw_rs::prelude::{DistL2, Hnsw};
use serde::{Deserialize, Serialize};

pub const VECTOR_INDEX_FILE_VERSION_V1: &str = "askgraph_vector_index_v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexFileV1 {
    pub version: String,
    /// Embedding model the rows were produced with.
    pub model: String,
    pub dim: usize,
    pub vectors: Vec<Vec<f32>>,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode vector index: {0}")]
    Decode(String),
    #[error("failed to encode vector index: {0}")]
    Encode(String),
    #[error("unsupported vector index version: {found} (expected {VECTOR_INDEX_FILE_VERSION_V1})")]
    Version { found: String },
    #[error("vector index has dim=0")]
    ZeroDim,
    #[error("vector index row #{row} has dim {got}, expected {expected}")]
    RowDim { row: usize, expected: usize, got: usize },
    #[error("query vector has dim {got}, index expects {expected}")]
    QueryDim { expected: usize, got: usize },
}

pub fn encode_vector_index_file_v1(file: &VectorIndexFileV1) -> Result<Vec<u8>, IndexError> {
    if file.version != VECTOR_INDEX_FILE_VERSION_V1 {
        return Err(IndexError::Version {
            found: file.version.clone(),
        });
    }
    let mut out = Vec::new();
    ciborium::ser::into_writer(file, &mut out).map_err(|e| IndexError::Encode(e.to_string()))?;
    Ok(out)
}

pub fn decode_vector_index_file_v1(bytes: &[u8]) -> Result<VectorIndexFileV1, IndexError> {
    let file: VectorIndexFileV1 =
        ciborium::de::from_reader(bytes).map_err(|e| IndexError::Decode(e.to_string()))?;
    if file.version != VECTOR_INDEX_FILE_VERSION_V1 {
        return Err(IndexError::Version {
            found: file.version,
        });
    }
    Ok(file)
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

pub struct VectorIndex {
    model: String,
    dim: usize,
    vectors: Vec<Vec<f32>>,
    // Search-only after build.
    hnsw: Option<Hnsw<'static, f32, DistL2>>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("model", &self.model)
            .field("dim", &self.dim)
            .field("rows", &self.vectors.len())
            .finish()
    }
}

impl VectorIndex {
    pub fn from_file(file: VectorIndexFileV1) -> Result<Self, IndexError> {
        if file.version != VECTOR_INDEX_FILE_VERSION_V1 {
            return Err(IndexError::Version {
                found: file.version,
            });
        }
        if file.dim == 0 {
            return Err(IndexError::ZeroDim);
        }
        for (row, v) in file.vectors.iter().enumerate() {
            if v.len() != file.dim {
                return Err(IndexError::RowDim {
                    row,
                    expected: file.dim,
                    got: v.len(),
                });
            }
        }

        let hnsw = if file.vectors.is_empty() {
            None
        } else {
            // HNSW params (conservative defaults):
            // - `m`: max connections per layer
            // - `ef_construction`: construction search width
            let m: usize = 16;
            let ef_construction: usize = 200;
            let nb_elem = file.vectors.len();
            let max_layer = 16.min((nb_elem as f32).ln().trunc() as usize).max(1);

            let hnsw = Hnsw::<f32, DistL2>::new(m, nb_elem, max_layer, ef_construction, DistL2 {});
            for (i, v) in file.vectors.iter().enumerate() {
                hnsw.insert((&v[..], i));
            }
            Some(hnsw)
        };

        Ok(Self {
            model: file.model,
            dim: file.dim,
            vectors: file.vectors,
            hnsw,
        })
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = std::fs::read(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let file = if is_json {
            serde_json::from_slice(&bytes).map_err(|e| IndexError::Decode(e.to_string()))?
        } else {
            decode_vector_index_file_v1(&bytes)?
        };
        let index = Self::from_file(file)?;
        tracing::info!(rows = index.len(), dim = index.dim, model = %index.model, "vector index loaded");
        Ok(index)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Nearest rows to `query` as `(ordinal, l2_distance)`, ascending distance.
    ///
    /// Returns exactly `min(k, len())` distinct rows: the approximate search
    /// is topped up with an exact scan when it comes back short.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::QueryDim {
                expected: self.dim,
                got: query.len(),
            });
        }
        let k = k.min(self.vectors.len());
        let Some(hnsw) = self.hnsw.as_ref() else {
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let ef_search = (k * 4).max(64);
        let mut seen = vec![false; self.vectors.len()];
        let mut hits: Vec<(usize, f32)> = Vec::with_capacity(k);
        for n in hnsw.search(query, k, ef_search) {
            let idx = n.d_id;
            if idx >= self.vectors.len() || seen[idx] {
                continue;
            }
            seen[idx] = true;
            hits.push((idx, l2_distance(query, &self.vectors[idx])));
        }

        if hits.len() < k {
            tracing::debug!(ann_hits = hits.len(), k, "ann search short; filling by exact scan");
            let mut rest: Vec<(usize, f32)> = self
                .vectors
                .iter()
                .enumerate()
                .filter(|(i, _)| !seen[*i])
                .map(|(i, v)| (i, l2_distance(query, v)))
                .collect();
            rest.sort_by(|(ia, da), (ib, db)| da.total_cmp(db).then_with(|| ia.cmp(ib)));
            hits.extend(rest.into_iter().take(k - hits.len()));
        }

        hits.sort_by(|(ia, da), (ib, db)| da.total_cmp(db).then_with(|| ia.cmp(ib)));
        hits.truncate(k);
        Ok(hits)
    }
}
