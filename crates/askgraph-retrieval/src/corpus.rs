//! Static schema corpus: class records, relation records, and the ordinal id list.
//!
//! On disk the corpus is three JSON files:
//!
//! - `classes.json`: array of objects, each identified by its `"class"` field,
//! - `relations_final.json`: array of objects, each identified by its `"uri"` field,
//! - `ids.json`: array of identifiers, row `i` naming the fragment embedded at
//!   row `i` of the vector index.
//!
//! Records are kept as raw JSON objects: the synthesizer serializes them
//! verbatim into its prompt, so every descriptive field survives.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CLASSES_FILE: &str = "classes.json";
pub const RELATIONS_FILE: &str = "relations_final.json";
pub const IDS_FILE: &str = "ids.json";

const CLASS_KEY: &str = "class";
const RELATION_KEY: &str = "uri";

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{kind:?} record #{index} has no string `{key}` field")]
    MissingIdentifier {
        kind: FragmentKind,
        index: usize,
        key: &'static str,
    },
    #[error("id list entry #{ordinal} (`{id}`) has no corpus record")]
    UnknownId { ordinal: usize, id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Class,
    Relation,
}

/// One retrievable description of an allowed class or relation.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaFragment {
    pub id: String,
    pub kind: FragmentKind,
    /// The corpus record exactly as loaded (a JSON object).
    pub record: Value,
}

impl SchemaFragment {
    pub fn label(&self) -> Option<&str> {
        self.record.get("label").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaCorpus {
    fragments: Vec<SchemaFragment>,
    by_id: HashMap<String, usize>,
    ids: Vec<String>,
}

impl SchemaCorpus {
    /// Build a corpus from in-memory records.
    ///
    /// A relation record whose identifier equals a class identifier replaces
    /// the class record. Every id in `ids` must resolve.
    pub fn from_records(
        classes: Vec<Value>,
        relations: Vec<Value>,
        ids: Vec<String>,
    ) -> Result<Self, CorpusError> {
        let mut corpus = SchemaCorpus::default();

        for (index, record) in classes.into_iter().enumerate() {
            corpus.insert(FragmentKind::Class, CLASS_KEY, index, record)?;
        }
        for (index, record) in relations.into_iter().enumerate() {
            corpus.insert(FragmentKind::Relation, RELATION_KEY, index, record)?;
        }

        for (ordinal, id) in ids.iter().enumerate() {
            if !corpus.by_id.contains_key(id) {
                return Err(CorpusError::UnknownId {
                    ordinal,
                    id: id.clone(),
                });
            }
        }
        corpus.ids = ids;
        Ok(corpus)
    }

    fn insert(
        &mut self,
        kind: FragmentKind,
        key: &'static str,
        index: usize,
        record: Value,
    ) -> Result<(), CorpusError> {
        let Some(id) = record.get(key).and_then(|v| v.as_str()).map(str::to_string) else {
            return Err(CorpusError::MissingIdentifier { kind, index, key });
        };
        let fragment = SchemaFragment {
            id: id.clone(),
            kind,
            record,
        };
        match self.by_id.get(&id) {
            Some(&slot) => self.fragments[slot] = fragment,
            None => {
                self.by_id.insert(id, self.fragments.len());
                self.fragments.push(fragment);
            }
        }
        Ok(())
    }

    /// Load `classes.json`, `relations_final.json` and `ids.json` from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, CorpusError> {
        Self::load(
            &dir.join(CLASSES_FILE),
            &dir.join(RELATIONS_FILE),
            &dir.join(IDS_FILE),
        )
    }

    pub fn load(classes: &Path, relations: &Path, ids: &Path) -> Result<Self, CorpusError> {
        let classes: Vec<Value> = read_json(classes)?;
        let relations: Vec<Value> = read_json(relations)?;
        let ids: Vec<String> = read_json(ids)?;
        let corpus = Self::from_records(classes, relations, ids)?;
        tracing::info!(
            fragments = corpus.fragments.len(),
            ordinals = corpus.ids.len(),
            "schema corpus loaded"
        );
        Ok(corpus)
    }

    /// Number of index rows (length of the id list).
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn get(&self, id: &str) -> Option<&SchemaFragment> {
        self.by_id.get(id).map(|&slot| &self.fragments[slot])
    }

    /// Resolve a vector-index row through the id list.
    pub fn fragment_for_ordinal(&self, ordinal: usize) -> Option<&SchemaFragment> {
        self.ids.get(ordinal).and_then(|id| self.get(id))
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, CorpusError> {
    let text = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CorpusError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SchemaCorpus {
        SchemaCorpus::from_records(
            vec![
                json!({ "class": "oeo:OEO_00000365", "label": "scenario", "relations": ["obo:BFO_0000051"] }),
                json!({ "class": "oeo:OEO_00020227", "label": "scenario bundle" }),
            ],
            vec![json!({ "uri": "obo:BFO_0000051", "label": "has part" })],
            vec![
                "obo:BFO_0000051".to_string(),
                "oeo:OEO_00000365".to_string(),
                "oeo:OEO_00020227".to_string(),
            ],
        )
        .expect("corpus")
    }

    #[test]
    fn resolves_ordinals_through_id_list() {
        let corpus = sample();
        assert_eq!(corpus.len(), 3);
        let f = corpus.fragment_for_ordinal(0).expect("ordinal 0");
        assert_eq!(f.kind, FragmentKind::Relation);
        assert_eq!(f.label(), Some("has part"));
        let f = corpus.fragment_for_ordinal(2).expect("ordinal 2");
        assert_eq!(f.id, "oeo:OEO_00020227");
        assert!(corpus.fragment_for_ordinal(3).is_none());
    }

    #[test]
    fn relation_record_replaces_class_with_same_id() {
        let corpus = SchemaCorpus::from_records(
            vec![json!({ "class": "x", "label": "as class" })],
            vec![json!({ "uri": "x", "label": "as relation" })],
            vec!["x".to_string()],
        )
        .expect("corpus");
        assert_eq!(corpus.fragment_count(), 1);
        let f = corpus.get("x").expect("x");
        assert_eq!(f.kind, FragmentKind::Relation);
        assert_eq!(f.label(), Some("as relation"));
    }

    #[test]
    fn rejects_unknown_ids() {
        let err = SchemaCorpus::from_records(
            vec![json!({ "class": "a" })],
            vec![],
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, CorpusError::UnknownId { ordinal: 1, .. }), "{err}");
    }

    #[test]
    fn rejects_records_without_identifier() {
        let err = SchemaCorpus::from_records(vec![json!({ "label": "orphan" })], vec![], vec![])
            .unwrap_err();
        assert!(matches!(err, CorpusError::MissingIdentifier { index: 0, .. }), "{err}");
    }

    #[test]
    fn loads_from_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CLASSES_FILE), r#"[{"class": "c1", "label": "one"}]"#)
            .expect("write classes");
        std::fs::write(dir.path().join(RELATIONS_FILE), r#"[{"uri": "r1"}]"#).expect("write relations");
        std::fs::write(dir.path().join(IDS_FILE), r#"["r1", "c1"]"#).expect("write ids");

        let corpus = SchemaCorpus::load_dir(dir.path()).expect("load");
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.fragment_for_ordinal(1).and_then(|f| f.label()), Some("one"));
    }
}
