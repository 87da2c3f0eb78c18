//! The question-answering pipeline.
//!
//! ```text
//! turn + history ─▶ retrieve (k fragments) ─▶ synthesize ─┬─▶ direct reply
//!                                                        └─▶ execute + repair ─▶ group ─▶ summarize ─▶ response
//! ```
//!
//! All shared state lives in [`AskContext`]; a [`Pipeline`] is built from it
//! once and answers turns sequentially.

pub mod context;
pub mod error;
pub mod executor;
pub mod grouping;
pub mod history;
pub mod pipeline;
pub mod summarizer;
pub mod synthesizer;

pub use context::{AskContext, AskSettings, Prompts, DEFAULT_RETRIEVAL_K};
pub use error::{ContextError, PipelineError, SynthesisError};
pub use executor::{Execution, QueryExecutor, RepairStage};
pub use grouping::{
    bundle_page_uri, flatten_groups, BundleGroup, BundleGrouper, ScenarioEntry, ScenarioMatcher,
    DEFAULT_SCENARIO_FRAGMENT, GROUPED_COLUMNS,
};
pub use history::{ConversationHistory, Speaker, Turn, DEFAULT_HISTORY_TURNS};
pub use pipeline::{assemble_response, render_results, Pipeline, APOLOGY, NO_RESULTS};
pub use summarizer::{should_summarize, Summarizer, DEFAULT_SUMMARY_MODEL, SUMMARY_CHAR_LIMIT};
pub use synthesizer::{
    classify_synthesis, Synthesis, Synthesizer, DEFAULT_BYPASS_MARKER, DEFAULT_SYNTHESIS_MODEL,
};
