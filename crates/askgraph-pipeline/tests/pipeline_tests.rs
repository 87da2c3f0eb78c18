//! End-to-end turns through `Pipeline` with stubbed oracles and engines.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use askgraph_oracle::{CompletionOracle, CompletionRequest, EmbeddingOracle, OracleError};
use askgraph_pipeline::*;
use askgraph_retrieval::{
    SchemaCorpus, VectorIndex, VectorIndexFileV1, DEFAULT_EMBEDDING_MODEL,
    VECTOR_INDEX_FILE_VERSION_V1,
};
use askgraph_sparql::{EndpointConfig, EngineError, HttpSparqlEndpoint, QueryEngine, ResultTable};
use async_trait::async_trait;
use serde_json::json;

// ============================================================================
// Stubs
// ============================================================================

struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedOracle {
    fn new(replies: Vec<Result<String, OracleError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, i: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[i].clone()
    }
}

#[async_trait]
impl CompletionOracle for ScriptedOracle {
    async fn complete(&self, request: CompletionRequest) -> Result<String, OracleError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::InvalidResponse("script exhausted".into())))
    }
}

struct ConstantEmbedder {
    fail: bool,
}

#[async_trait]
impl EmbeddingOracle for ConstantEmbedder {
    async fn embed(&self, _model: &str, _input: &str) -> Result<Vec<f32>, OracleError> {
        if self.fail {
            Err(OracleError::Network("embedding service down".into()))
        } else {
            Ok(vec![0.0, 0.0])
        }
    }
}

type Handler = dyn Fn(&str) -> Result<ResultTable, EngineError> + Send + Sync;

struct ScriptedEngine {
    handler: Box<Handler>,
    calls: Mutex<usize>,
}

impl ScriptedEngine {
    fn new(handler: impl Fn(&str) -> Result<ResultTable, EngineError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl QueryEngine for ScriptedEngine {
    async fn select(&self, query: &str) -> Result<ResultTable, EngineError> {
        *self.calls.lock().unwrap() += 1;
        (self.handler)(query)
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn table(columns: &[&str], values: &[&[&str]]) -> ResultTable {
    ResultTable::new(
        columns.iter().map(|c| c.to_string()).collect(),
        values
            .iter()
            .map(|r| r.iter().map(|v| Some(v.to_string())).collect())
            .collect(),
    )
}

fn pipeline(
    completion: Arc<ScriptedOracle>,
    engine: Arc<dyn QueryEngine>,
    embedding_fails: bool,
) -> Pipeline {
    let classes = (0..12)
        .map(|i| json!({ "class": format!("https://openenergyplatform.org/ontology/oeo/C{i}"), "label": format!("class {i}") }))
        .collect();
    let ids = (0..12)
        .map(|i| format!("https://openenergyplatform.org/ontology/oeo/C{i}"))
        .collect();
    let corpus = SchemaCorpus::from_records(classes, vec![], ids).unwrap();
    let index = VectorIndex::from_file(VectorIndexFileV1 {
        version: VECTOR_INDEX_FILE_VERSION_V1.to_string(),
        model: DEFAULT_EMBEDDING_MODEL.to_string(),
        dim: 2,
        vectors: (0..12).map(|i| vec![i as f32, 1.0]).collect(),
    })
    .unwrap();

    let context = AskContext {
        settings: AskSettings::default(),
        prompts: Prompts::builtin(),
        corpus: Arc::new(corpus),
        index: Arc::new(index),
        engine,
        completion,
        embedding: Arc::new(ConstantEmbedder {
            fail: embedding_fails,
        }),
    };
    Pipeline::new(Arc::new(context)).unwrap()
}

const SCN: &str = "https://openenergyplatform.org/ontology/oekg/scenario/";
const BUNDLE_QUERY: &str =
    "SELECT ?scenario ?label WHERE { ?scenario dc:acronym ?label FILTER(?label = \"X\") }";

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn three_rows_two_bundles_are_grouped() {
    let oracle = ScriptedOracle::new(vec![
        Ok(BUNDLE_QUERY.to_string()),
        Ok("Three scenarios in two bundles.".to_string()),
    ]);
    let engine = ScriptedEngine::new(|q| {
        if q.contains(BUNDLE_QUERY) {
            return Ok(table(
                &["scenario", "label"],
                &[
                    &[&format!("{SCN}s1"), "X"],
                    &[&format!("{SCN}s2"), "X"],
                    &[&format!("{SCN}s3"), "X"],
                ],
            ));
        }
        let s = ["s1", "s2", "s3"]
            .into_iter()
            .find(|s| q.contains(&format!("{SCN}{s}>")))
            .unwrap_or("s1");
        if q.contains("?bundleLabel") {
            let (uri, label) = if s == "s3" {
                ("http://example.org/bundle/b", "Bundle B")
            } else {
                ("http://example.org/bundle/a", "Bundle A")
            };
            Ok(table(&["bundle", "bundleLabel"], &[&[uri, label]]))
        } else {
            Ok(table(
                &["scenario", "scenarioLabel", "scenarioAcronym"],
                &[&[&format!("{SCN}{s}"), &format!("Scenario {s}"), &s.to_uppercase()]],
            ))
        }
    });
    let p = pipeline(oracle.clone(), engine.clone(), false);

    let response = p
        .answer("List all scenario bundles with acronym X", &ConversationHistory::new())
        .await
        .unwrap();

    assert!(response.starts_with("Generated Query:\n```sparql\nPREFIX rdf:"));
    assert!(response.contains(BUNDLE_QUERY));
    assert!(response.ends_with("\n\nSummary of results:\nThree scenarios in two bundles."));

    let results = response
        .split("Query Results:\n")
        .nth(1)
        .and_then(|r| r.split("\n\nSummary of results:").next())
        .unwrap();
    let lines: Vec<&str> = results.lines().collect();
    assert!(lines[0].starts_with("| Bundle URI"));
    assert_eq!(lines.len(), 2 + 3);
    assert!(lines[2].contains("http://example.org/bundle/a") && lines[2].contains("Bundle A"));
    assert!(!lines[3].contains("Bundle A") && !lines[3].contains("http://example.org/bundle/a"));
    assert!(lines[4].contains("Bundle B"));

    // initial submission plus two lookups per scenario
    assert_eq!(engine.calls(), 1 + 2 * 3);
    assert_eq!(oracle.calls(), 2);
    assert_eq!(oracle.request(1).model, DEFAULT_SUMMARY_MODEL);
}

#[tokio::test]
async fn bypass_marker_skips_the_engine() {
    let oracle = ScriptedOracle::new(vec![Ok(
        "[[NO_QUERY]] Hi! I can answer questions about energy scenarios.".to_string(),
    )]);
    let engine = ScriptedEngine::new(|_| panic!("engine must not be called"));
    let p = pipeline(oracle.clone(), engine.clone(), false);

    let response = p.answer("hello", &ConversationHistory::new()).await.unwrap();
    assert_eq!(response, "Hi! I can answer questions about energy scenarios.");
    assert_eq!(engine.calls(), 0);
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn unreachable_endpoint_leads_to_one_relaxed_repair() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let mut config = EndpointConfig::new(format!("http://127.0.0.1:{port}/sparql"));
    config.timeout = Duration::from_millis(500);
    config.retry_delay = Duration::from_millis(0);
    let engine = Arc::new(HttpSparqlEndpoint::new(config).unwrap());

    let oracle = ScriptedOracle::new(vec![
        Ok("SELECT ?s WHERE { ?s a oeo:Strict }".to_string()),
        Ok("SELECT ?s WHERE { ?s a oeo:Relaxed }".to_string()),
    ]);
    let p = pipeline(oracle.clone(), engine, false);

    let response = p.answer("list strict things", &ConversationHistory::new()).await.unwrap();

    assert_eq!(oracle.calls(), 2);
    let relaxed_prompt = &oracle.request(1).messages[1].content;
    assert!(relaxed_prompt.contains("has not returned any results:\nSELECT ?s WHERE { ?s a oeo:Strict }"));
    assert!(response.contains("oeo:Relaxed"));
    assert!(response.ends_with("Query Results:\nNo results found."));
}

#[tokio::test]
async fn silent_endpoint_times_out_and_leads_to_one_relaxed_repair() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(Mutex::new(0usize));
    let counter = accepted.clone();
    tokio::spawn(async move {
        // accept and hold every connection without ever answering
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            *counter.lock().unwrap() += 1;
            held.push(stream);
        }
    });

    let mut config = EndpointConfig::new(format!("http://{addr}/sparql"));
    config.timeout = Duration::from_millis(200);
    config.retry_delay = Duration::from_millis(0);
    let engine = Arc::new(HttpSparqlEndpoint::new(config).unwrap());

    let oracle = ScriptedOracle::new(vec![
        Ok("SELECT ?s WHERE { ?s a oeo:Strict }".to_string()),
        Ok("SELECT ?s WHERE { ?s a oeo:Relaxed }".to_string()),
    ]);
    let p = pipeline(oracle.clone(), engine, false);

    let response = p.answer("list strict things", &ConversationHistory::new()).await.unwrap();

    // three timed-out attempts for the initial query, three for the relaxed one
    assert_eq!(*accepted.lock().unwrap(), 6);
    assert_eq!(oracle.calls(), 2);
    let relaxed_prompt = &oracle.request(1).messages[1].content;
    assert!(relaxed_prompt.contains("has not returned any results:\nSELECT ?s WHERE { ?s a oeo:Strict }"));
    assert!(!relaxed_prompt.contains("was not correct"));
    assert!(response.contains("oeo:Relaxed"));
    assert!(response.ends_with("Query Results:\nNo results found."));
}

#[tokio::test]
async fn history_is_folded_into_the_request() {
    let oracle = ScriptedOracle::new(vec![Ok("[[NO_QUERY]] ok".to_string())]);
    let engine = ScriptedEngine::new(|_| Ok(ResultTable::empty_sentinel()));
    let p = pipeline(oracle.clone(), engine, false);

    let mut history = ConversationHistory::new();
    history.record_exchange("which bundles exist?", "two", DEFAULT_HISTORY_TURNS);
    p.answer("and scenarios?", &history).await.unwrap();

    let prompt = &oracle.request(0).messages[1].content;
    assert!(prompt.starts_with(
        "Request: User: which bundles exist?\nAssistant: two\nUser: and scenarios?\n\n\nContext with classes"
    ));
    assert_eq!(oracle.request(0).model, DEFAULT_SYNTHESIS_MODEL);
}

#[tokio::test]
async fn summary_sees_the_conversation_history() {
    let oracle = ScriptedOracle::new(vec![
        Ok("SELECT ?s WHERE { ?s a oeo:OEO_00000365 }".to_string()),
        Ok("Two scenarios.".to_string()),
    ]);
    let engine = ScriptedEngine::new(|_| Ok(table(&["s"], &[&["http://example.org/s1"], &["http://example.org/s2"]])));
    let p = pipeline(oracle.clone(), engine, false);

    let mut history = ConversationHistory::new();
    history.record_exchange("which bundles exist?", "Bundle A and Bundle B.", DEFAULT_HISTORY_TURNS);
    let response = p.answer("and their scenarios?", &history).await.unwrap();

    assert!(response.ends_with("Summary of results:\nTwo scenarios."));
    let summary = oracle.request(1);
    assert_eq!(summary.model, DEFAULT_SUMMARY_MODEL);
    let prompt = &summary.messages[1].content;
    assert!(prompt.starts_with(
        "The user's question: User: which bundles exist?\nAssistant: Bundle A and Bundle B.\nUser: and their scenarios?\n"
    ));
    assert!(prompt.contains("| http://example.org/s2 |"));
}

#[tokio::test]
async fn failures_before_execution_become_an_apology() {
    let oracle = ScriptedOracle::new(vec![]);
    let engine = ScriptedEngine::new(|_| Ok(ResultTable::empty_sentinel()));

    let p = pipeline(oracle.clone(), engine.clone(), true);
    assert!(matches!(
        p.answer("anything", &ConversationHistory::new()).await,
        Err(PipelineError::Retrieval(_))
    ));
    assert_eq!(p.answer_or_apology("anything", &ConversationHistory::new()).await, APOLOGY);

    let p = pipeline(oracle.clone(), engine.clone(), false);
    assert!(matches!(
        p.answer("anything", &ConversationHistory::new()).await,
        Err(PipelineError::Synthesis(_))
    ));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn failed_summary_is_omitted() {
    let oracle = ScriptedOracle::new(vec![
        Ok("SELECT ?s WHERE { ?s ?p ?o }".to_string()),
        Err(OracleError::Http {
            status: 500,
            body: "boom".into(),
        }),
    ]);
    let engine = ScriptedEngine::new(|_| Ok(table(&["s"], &[&["http://example.org/x"]])));
    let p = pipeline(oracle.clone(), engine, false);

    let response = p.answer("anything", &ConversationHistory::new()).await.unwrap();
    assert!(response.ends_with("| http://example.org/x |"));
    assert!(!response.contains("Summary of results"));
}
