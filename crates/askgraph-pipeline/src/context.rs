//! Shared, immutable per-process state.

use std::path::Path;
use std::sync::Arc;

use askgraph_oracle::{CompletionOracle, EmbeddingOracle};
use askgraph_retrieval::{SchemaCorpus, VectorIndex, DEFAULT_EMBEDDING_MODEL};
use askgraph_sparql::QueryEngine;

use crate::error::ContextError;
use crate::grouping::DEFAULT_SCENARIO_FRAGMENT;
use crate::history::DEFAULT_HISTORY_TURNS;
use crate::summarizer::DEFAULT_SUMMARY_MODEL;
use crate::synthesizer::{DEFAULT_BYPASS_MARKER, DEFAULT_SYNTHESIS_MODEL};

pub const SPARQL_PROMPT_FILE: &str = "sparql_system_prompt.txt";
pub const SUMMARY_PROMPT_FILE: &str = "summary_system_prompt.txt";

const BUILTIN_SPARQL_PROMPT: &str = include_str!("../../../prompts/sparql_system_prompt.txt");
const BUILTIN_SUMMARY_PROMPT: &str = include_str!("../../../prompts/summary_system_prompt.txt");

pub const DEFAULT_RETRIEVAL_K: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub sparql_system: String,
    pub summary_system: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Prompts {
    pub fn builtin() -> Self {
        Self {
            sparql_system: BUILTIN_SPARQL_PROMPT.to_string(),
            summary_system: BUILTIN_SUMMARY_PROMPT.to_string(),
        }
    }

    /// Built-in prompts, each replaced by its file in `dir` when present.
    pub fn load_overrides(dir: &Path) -> Result<Self, ContextError> {
        let mut prompts = Self::builtin();
        if let Some(text) = read_optional(&dir.join(SPARQL_PROMPT_FILE))? {
            prompts.sparql_system = text;
        }
        if let Some(text) = read_optional(&dir.join(SUMMARY_PROMPT_FILE))? {
            prompts.summary_system = text;
        }
        Ok(prompts)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ContextError> {
    if !path.is_file() {
        return Ok(None);
    }
    tracing::debug!(path = %path.display(), "using prompt override");
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|source| ContextError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskSettings {
    pub synthesis_model: String,
    pub summary_model: String,
    pub embedding_model: String,
    /// Schema fragments retrieved per turn.
    pub k: usize,
    pub history_turns: usize,
    pub bypass_marker: String,
    pub scenario_fragment: String,
    /// Render known-namespace IRIs in prefixed form.
    pub short_uris: bool,
}

impl Default for AskSettings {
    fn default() -> Self {
        Self {
            synthesis_model: DEFAULT_SYNTHESIS_MODEL.to_string(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            k: DEFAULT_RETRIEVAL_K,
            history_turns: DEFAULT_HISTORY_TURNS,
            bypass_marker: DEFAULT_BYPASS_MARKER.to_string(),
            scenario_fragment: DEFAULT_SCENARIO_FRAGMENT.to_string(),
            short_uris: false,
        }
    }
}

/// Everything loaded once at startup and shared read-only by every turn.
#[derive(Clone)]
pub struct AskContext {
    pub settings: AskSettings,
    pub prompts: Prompts,
    pub corpus: Arc<SchemaCorpus>,
    pub index: Arc<VectorIndex>,
    pub engine: Arc<dyn QueryEngine>,
    pub completion: Arc<dyn CompletionOracle>,
    pub embedding: Arc<dyn EmbeddingOracle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_prompts_are_present() {
        let p = Prompts::builtin();
        assert!(p.sparql_system.contains("[[NO_QUERY]]"));
        assert!(!p.summary_system.trim().is_empty());
    }

    #[test]
    fn data_dir_files_override_builtins() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(SUMMARY_PROMPT_FILE), "custom summary").expect("write");
        let p = Prompts::load_overrides(dir.path()).expect("load");
        assert_eq!(p.summary_system, "custom summary");
        assert_eq!(p.sparql_system, Prompts::builtin().sparql_system);
    }

    #[test]
    fn default_settings() {
        let s = AskSettings::default();
        assert_eq!(s.k, 10);
        assert_eq!(s.history_turns, 5);
        assert_eq!(s.synthesis_model, "gpt-5");
        assert_eq!(s.summary_model, "gpt-5-nano");
    }
}
