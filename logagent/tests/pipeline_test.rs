//! End-to-end tests of indexing and analysis through the LogAgent facade

use logagent::prelude::*;
use logagent::{EmbeddingEngine, InMemoryVectorIndex, MockAiBackend};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const SERVICE_MODULE: &str = r#"import json
import os

DEFAULT_TIMEOUT = 30


def load_settings(path):
    with open(path) as handle:
        settings = json.load(handle)
    return settings["database_url"]


def connect_database(url, timeout=DEFAULT_TIMEOUT):
    if not url:
        raise ValueError("database url is empty")
    return Connection(url, timeout=timeout)


class Connection:
    def __init__(self, url, timeout):
        self.url = url
        self.timeout = timeout
        self.socket = None

    def send(self, payload):
        return self.socket.write(json.dumps(payload))

    def close(self):
        if self.socket is not None:
            self.socket.close()


def retry(func, attempts=3):
    last_error = None
    for _ in range(attempts):
        try:
            return func()
        except ConnectionError as error:
            last_error = error
    raise last_error


def format_payload(record):
    return {"id": record.id, "name": record.name.strip()}


def main():
    url = load_settings(os.environ.get("SETTINGS_PATH", "settings.json"))
    conn = connect_database(url)
    conn.send({"hello": "world"})
"#;

const TRACEBACK: &str = "INFO starting service\n\
Traceback (most recent call last):\n  \
File \"service.py\", line 42, in main\n    \
url = load_settings(os.environ.get(\"SETTINGS_PATH\"))\n  \
File \"service.py\", line 10, in load_settings\n    \
return settings[\"database_url\"]\n\
KeyError: 'database_url'\n\
INFO shutting down";

fn write_project(dir: &Path) {
    fs::write(dir.join("service.py"), SERVICE_MODULE).unwrap();
    fs::write(dir.join("math_utils.py"), "def add(a,b): return a+b\n").unwrap();
}

async fn rule_based_agent() -> LogAgent {
    LogAgent::new(LogAgentConfig::for_development()).await.unwrap()
}

#[tokio::test]
async fn test_small_file_is_found_at_its_own_score() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("add.py"), "def add(a,b): return a+b").unwrap();

    let agent = rule_based_agent().await;
    let report = agent.index_codebase(temp.path(), None).await.unwrap();
    assert_eq!(report.total_chunks, 1);

    let all = agent.search_code("add", 5, -1.0).await.unwrap();
    assert_eq!(all.len(), 1);
    let hit = &all[0];
    assert_eq!(hit.chunk.chunk_type, ChunkType::Module);
    assert_eq!(hit.chunk.content, "def add(a,b): return a+b");
    assert_eq!(hit.chunk.start_line, 1);
    assert_eq!(hit.chunk.end_line, 1);

    let at_score = agent
        .search_code("add", 5, hit.similarity_score)
        .await
        .unwrap();
    assert_eq!(at_score.len(), 1);
    assert_eq!(at_score[0].id, hit.id);
}

#[tokio::test]
async fn test_mixed_log_summary() {
    let agent = rule_based_agent().await;
    let log = "INFO startup\nINFO ready\nERROR: Connection failed\nTraceback (most recent call last):\nConnectionError: timeout\nINFO cleanup";

    let result = agent.analyze(log).await;
    assert_eq!(
        result.error_summary,
        "ERROR: Connection failed\nTraceback (most recent call last):\nConnectionError: timeout"
    );
}

#[tokio::test]
async fn test_failing_ai_backend_falls_back_to_rules() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let backend = MockAiBackend::failing();
    let agent = LogAgent::with_components(
        LogAgentConfig::for_development(),
        Arc::new(EmbeddingEngine::new().unwrap()),
        Arc::new(InMemoryVectorIndex::default()),
        Some(Arc::new(backend.clone())),
    )
    .await
    .unwrap();
    assert!(agent.uses_llm());

    agent.index_codebase(temp.path(), None).await.unwrap();
    let result = agent.analyze_with(TRACEBACK, 5, -1.0).await;

    assert!(!result.used_llm);
    assert!(!result.advice.is_empty());
    let top = result.top_chunk().unwrap();
    assert!(result.advice.contains(&format!("Name: {}", top.chunk.display_name())));
    assert!(result.advice.contains("Validate dictionary keys before access"));
    assert_eq!(backend.completion_calls(), 1);
}

#[tokio::test]
async fn test_failing_ai_backend_without_matches() {
    let backend = MockAiBackend::failing();
    let agent = LogAgent::with_components(
        LogAgentConfig::for_development(),
        Arc::new(EmbeddingEngine::new().unwrap()),
        Arc::new(InMemoryVectorIndex::default()),
        Some(Arc::new(backend)),
    )
    .await
    .unwrap();

    let result = agent.analyze_with(TRACEBACK, 5, 0.3).await;
    assert!(!result.used_llm);
    assert_eq!(result.confidence, 0.0);
    assert!(result.advice.contains("No relevant code found"));
}

#[tokio::test]
async fn test_traceback_points_at_failing_function() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let agent = rule_based_agent().await;
    let report = agent.index_codebase(temp.path(), None).await.unwrap();
    assert_eq!(report.files_successful, 2);
    assert!(report.total_chunks >= 5);

    let result = agent.analyze_with(TRACEBACK, 20, -1.0).await;
    assert_eq!(result.relevant_chunks.len(), report.total_chunks);

    let position_of = |name: &str| {
        result
            .relevant_chunks
            .iter()
            .position(|r| r.chunk.name.as_deref() == Some(name))
            .unwrap()
    };
    // the frame's function outranks code the traceback never mentions
    assert!(position_of("load_settings") < position_of("format_payload"));
    assert!(position_of("load_settings") < position_of("math_utils.py"));
    assert!(result
        .relevant_chunks
        .windows(2)
        .all(|w| w[0].similarity_score >= w[1].similarity_score));
    assert!((0.0..=1.0).contains(&result.confidence));
}

#[tokio::test]
async fn test_reindexing_is_idempotent() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let agent = rule_based_agent().await;
    let first = agent.index_codebase(temp.path(), None).await.unwrap();
    let size_after_first = agent.get_stats().await.unwrap().total_chunks;
    let second = agent.index_codebase(temp.path(), None).await.unwrap();
    let size_after_second = agent.get_stats().await.unwrap().total_chunks;

    assert_eq!(first.total_chunks, second.total_chunks);
    assert_eq!(size_after_first, size_after_second);
    assert_eq!(size_after_first, first.total_chunks);
}

#[tokio::test]
async fn test_raising_min_score_never_grows_results() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let agent = rule_based_agent().await;
    agent.index_codebase(temp.path(), None).await.unwrap();

    let mut previous = usize::MAX;
    for step in 0..=10 {
        let threshold = -1.0 + step as f32 * 0.2;
        let results = agent.search_code(TRACEBACK, 20, threshold).await.unwrap();
        assert!(results.iter().all(|r| r.similarity_score >= threshold));
        assert!(results.len() <= previous);
        previous = results.len();
    }
}

#[tokio::test]
async fn test_analysis_result_serializes_to_json() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let agent = rule_based_agent().await;
    agent.index_codebase(temp.path(), None).await.unwrap();
    let result = agent.analyze_with(TRACEBACK, 2, -1.0).await;

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["used_llm"], false);
    assert_eq!(json["relevant_chunks"].as_array().unwrap().len(), 2);
    assert_eq!(json["relevant_chunks"][0]["rank"], 1);
}

#[tokio::test]
async fn test_analyze_file_and_multiple() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());
    let log_path = temp.path().join("service.log");
    fs::write(&log_path, TRACEBACK).unwrap();

    let agent = rule_based_agent().await;
    agent.index_codebase(temp.path(), None).await.unwrap();

    let from_file = agent.analyze_file(&log_path, 3, -1.0).await.unwrap();
    let direct = agent.analyze_with(TRACEBACK, 3, -1.0).await;
    assert_eq!(from_file.error_summary, direct.error_summary);
    assert_eq!(from_file.advice, direct.advice);

    let missing = agent
        .analyze_file(&temp.path().join("absent.log"), 3, -1.0)
        .await;
    assert!(matches!(missing, Err(LogAgentError::FileNotFound { .. })));

    let results = agent
        .analyze_multiple(&[TRACEBACK.to_string(), "FATAL out of memory".to_string()], 3)
        .await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].error_summary, "FATAL out of memory");
}
