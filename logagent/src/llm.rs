//! AI backends that turn a diagnostic prompt into advice
//!
//! [`ClaudeBackend`] talks to the Anthropic Messages API. [`MockAiBackend`]
//! answers from memory and can be told to fail, which is how the fallback
//! path is exercised in tests.

use crate::config::LogAgentConfig;
use crate::env_loader::load_env_nonempty;
use crate::error::{LogAgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Environment variable holding the Anthropic API key
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A text-completion service
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Complete `prompt`, generating at most `max_tokens` tokens
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;

    /// Whether the backend currently answers requests
    async fn health_check(&self) -> bool;

    /// Human readable backend name
    fn name(&self) -> &str;
}

/// Settings for the Claude backend
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    /// API key sent in the `x-api-key` header
    pub api_key: String,
    /// Base URL of the Messages API
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ClaudeConfig {
    /// Take model, URL and timeout from the pipeline configuration
    pub fn from_config(api_key: impl Into<String>, config: &LogAgentConfig) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: config.claude_base_url.trim_end_matches('/').to_string(),
            model: config.claude_model.clone(),
            timeout_secs: config.ai_timeout_secs,
        }
    }
}

/// Claude via the Anthropic Messages API
#[derive(Debug)]
pub struct ClaudeBackend {
    client: Client,
    config: ClaudeConfig,
}

impl ClaudeBackend {
    /// Create a backend with an explicit configuration
    pub fn new(config: ClaudeConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LogAgentError::Config("Claude API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LogAgentError::Backend(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a backend using the key in `ANTHROPIC_API_KEY`
    pub fn from_env(config: &LogAgentConfig) -> Result<Self> {
        let api_key = load_env_nonempty(API_KEY_ENV).ok_or_else(|| {
            LogAgentError::Config(format!("{API_KEY_ENV} environment variable not set"))
        })?;
        Self::new(ClaudeConfig::from_config(api_key, config))
    }

    /// Model the backend sends requests to
    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn make_request(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request_body = json!({
            "model": self.config.model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let url = format!("{}/messages", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LogAgentError::Backend(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LogAgentError::Backend(format!(
                "Claude API error {status}: {error_text}"
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LogAgentError::Backend(format!("Failed to parse response: {e}")))?;

        extract_text(&response_json)
    }
}

/// Text of the first content block of a Messages API response
pub(crate) fn extract_text(response: &serde_json::Value) -> Result<String> {
    response
        .get("content")
        .and_then(|content| content.get(0))
        .and_then(|block| block.get("text"))
        .and_then(|text| text.as_str())
        .map(str::to_string)
        .ok_or_else(|| LogAgentError::Backend("Invalid response format".to_string()))
}

#[async_trait]
impl AiBackend for ClaudeBackend {
    #[instrument(skip(self, prompt))]
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        debug!("Making Claude completion request ({} prompt chars)", prompt.len());
        self.make_request(prompt, max_tokens).await
    }

    async fn health_check(&self) -> bool {
        match self.make_request("Hello", 10).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Claude health check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "Claude AI"
    }
}

/// Behaviour switches for [`MockAiBackend`]
#[derive(Debug, Clone, Default)]
pub struct MockAiConfig {
    /// Report the backend as unhealthy
    pub unhealthy: bool,
    /// Fail every completion
    pub fail_complete: bool,
    /// Answer with an empty string
    pub empty_response: bool,
}

/// In-memory backend with a canned answer
#[derive(Debug, Clone)]
pub struct MockAiBackend {
    response: String,
    config: Arc<RwLock<MockAiConfig>>,
    prompts: Arc<RwLock<Vec<String>>>,
    calls: Arc<AtomicUsize>,
    health_checks: Arc<AtomicUsize>,
}

impl MockAiBackend {
    /// Backend that always answers with `response`
    pub fn new(response: impl Into<String>) -> Self {
        Self::new_with_config(response, MockAiConfig::default())
    }

    /// Backend with explicit failure switches
    pub fn new_with_config(response: impl Into<String>, config: MockAiConfig) -> Self {
        Self {
            response: response.into(),
            config: Arc::new(RwLock::new(config)),
            prompts: Arc::new(RwLock::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            health_checks: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Backend whose completions always fail
    pub fn failing() -> Self {
        Self::new_with_config(
            "",
            MockAiConfig {
                fail_complete: true,
                ..Default::default()
            },
        )
    }

    /// Change behaviour mid-test
    pub async fn set_config(&self, config: MockAiConfig) {
        *self.config.write().await = config;
    }

    /// Number of `complete` calls received
    pub fn completion_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `health_check` calls received
    pub fn health_checks(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }

    /// Most recent prompt received
    pub async fn last_prompt(&self) -> Option<String> {
        self.prompts.read().await.last().cloned()
    }
}

#[async_trait]
impl AiBackend for MockAiBackend {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.write().await.push(prompt.to_string());

        let config = self.config.read().await;
        if config.fail_complete {
            return Err(LogAgentError::Backend("Mock completion failure".to_string()));
        }
        if config.empty_response {
            return Ok(String::new());
        }
        Ok(self.response.clone())
    }

    async fn health_check(&self) -> bool {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        !self.config.read().await.unhealthy
    }

    fn name(&self) -> &str {
        "Mock AI"
    }
}
