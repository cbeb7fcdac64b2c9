//! Configuration management for LogAgent
//!
//! Values are resolved with the following precedence, lowest first:
//! 1. Built-in defaults (or a preset such as [`LogAgentConfig::for_development`])
//! 2. `LOGAGENT_*` environment variables
//! 3. A YAML file (`--config`, `./logagent.yaml` or `~/.config/logagent/logagent.yaml`)
//!
//! The Anthropic API key is never part of the configuration; it is read from
//! `ANTHROPIC_API_KEY` when the AI backend is constructed.

use crate::env_loader::EnvLoader;
use crate::error::{LogAgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the YAML configuration file
pub const CONFIG_FILE_NAME: &str = "logagent.yaml";
/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "LOGAGENT";

/// Default collection name for indexed chunks
pub const DEFAULT_COLLECTION_NAME: &str = "code_chunks";
/// Default identifier of the local embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "local-text-embedding-v1";
/// Files below this many characters are kept as a single chunk
pub const DEFAULT_SMALL_FILE_THRESHOLD: usize = 1000;
/// Default glob pattern for source discovery
pub const DEFAULT_FILE_PATTERN: &str = "**/*.py";
/// Default Claude model
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-sonnet-4-20250514";
/// Default Anthropic API base URL
pub const DEFAULT_CLAUDE_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Configuration for the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogAgentConfig {
    /// Name of the vector collection
    pub collection_name: String,
    /// Identifier of the embedding model
    pub embedding_model: String,
    /// Number of texts embedded per batch
    pub embedding_batch_size: usize,
    /// Maximum characters of a text fed to the embedder
    pub max_text_length: usize,
    /// Files below this many characters stay whole
    pub small_file_threshold: usize,
    /// Glob pattern used to discover source files
    pub file_pattern: String,
    /// Number of chunks retrieved per analysis
    pub default_num_results: usize,
    /// Minimum similarity for a chunk to be used in analysis
    pub default_min_score: f32,
    /// Minimum similarity for ad hoc code search
    pub search_min_score: f32,
    /// Maximum lines kept by the error summarizer
    pub summary_max_lines: usize,
    /// Lines returned when a log has no error markers
    pub summary_fallback_lines: usize,
    /// Match error markers without regard to case
    pub summary_case_insensitive: bool,
    /// Use the AI backend when credentials are available
    pub use_llm: bool,
    /// Claude model name
    pub claude_model: String,
    /// Anthropic API base URL
    pub claude_base_url: String,
    /// Maximum tokens requested from the AI backend
    pub max_tokens: u32,
    /// Request timeout for the AI backend in seconds
    pub ai_timeout_secs: u64,
    /// Number of retrieved chunks described in the prompt
    pub context_chunks: usize,
    /// Include chunk source code in the prompt
    pub include_code_in_prompt: bool,
    /// Maximum characters of the error summary placed in the prompt
    pub max_summary_chars: usize,
    /// Maximum characters of code per chunk placed in the prompt
    pub max_code_chars: usize,
    /// Show a progress bar while indexing
    pub show_progress: bool,
}

impl Default for LogAgentConfig {
    fn default() -> Self {
        Self {
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_batch_size: 10,
            max_text_length: 8000,
            small_file_threshold: DEFAULT_SMALL_FILE_THRESHOLD,
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            default_num_results: 5,
            default_min_score: 0.3,
            search_min_score: 0.5,
            summary_max_lines: 5,
            summary_fallback_lines: 3,
            summary_case_insensitive: false,
            use_llm: true,
            claude_model: DEFAULT_CLAUDE_MODEL.to_string(),
            claude_base_url: DEFAULT_CLAUDE_BASE_URL.to_string(),
            max_tokens: 2000,
            ai_timeout_secs: 60,
            context_chunks: 3,
            include_code_in_prompt: false,
            max_summary_chars: 4000,
            max_code_chars: 1500,
            show_progress: false,
        }
    }
}

impl LogAgentConfig {
    /// Configuration for local development and tests: no AI calls, small batches
    pub fn for_development() -> Self {
        Self {
            embedding_model: "local-text-embedding-dev".to_string(),
            embedding_batch_size: 4,
            use_llm: false,
            ai_timeout_secs: 15,
            ..Self::default()
        }
    }

    /// Configuration for production use: AI analysis enabled with progress output
    pub fn for_production() -> Self {
        Self {
            use_llm: true,
            show_progress: true,
            ..Self::default()
        }
    }

    /// Load configuration from defaults, environment and an optional YAML file
    ///
    /// An explicitly named file must exist and parse. A discovered file that
    /// fails to parse is reported with a warning and ignored.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_vars();

        match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(LogAgentError::file_not_found(path));
                }
                config = config.merge_yaml_file(path)?;
                tracing::info!("Loaded configuration from {}", path.display());
            }
            None => {
                if let Some(path) = Self::find_config_file() {
                    match config.clone().merge_yaml_file(&path) {
                        Ok(merged) => {
                            config = merged;
                            tracing::info!("Loaded configuration from {}", path.display());
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Ignoring invalid configuration file {}: {}",
                                path.display(),
                                e
                            );
                        }
                    }
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply `LOGAGENT_*` environment variables over the current values
    pub fn apply_env_vars(&mut self) {
        let loader = EnvLoader::new(ENV_PREFIX);

        self.collection_name = loader.load_string("COLLECTION_NAME", &self.collection_name);
        self.embedding_model = loader.load_string("EMBEDDING_MODEL", &self.embedding_model);
        self.embedding_batch_size =
            loader.load_parsed("EMBEDDING_BATCH_SIZE", self.embedding_batch_size);
        self.small_file_threshold =
            loader.load_parsed("SMALL_FILE_THRESHOLD", self.small_file_threshold);
        self.file_pattern = loader.load_string("FILE_PATTERN", &self.file_pattern);
        self.default_num_results =
            loader.load_parsed("DEFAULT_NUM_RESULTS", self.default_num_results);
        self.default_min_score = loader.load_parsed("DEFAULT_MIN_SCORE", self.default_min_score);
        self.search_min_score = loader.load_parsed("SEARCH_MIN_SCORE", self.search_min_score);
        self.summary_max_lines = loader.load_parsed("SUMMARY_MAX_LINES", self.summary_max_lines);
        self.use_llm = loader.load_bool("USE_LLM", self.use_llm);
        self.claude_model = loader.load_string("CLAUDE_MODEL", &self.claude_model);
        self.claude_base_url = loader.load_string("CLAUDE_BASE_URL", &self.claude_base_url);
        self.max_tokens = loader.load_parsed("MAX_TOKENS", self.max_tokens);
        self.ai_timeout_secs = loader.load_parsed("AI_TIMEOUT_SECS", self.ai_timeout_secs);
        self.context_chunks = loader.load_parsed("CONTEXT_CHUNKS", self.context_chunks);
        self.include_code_in_prompt =
            loader.load_bool("INCLUDE_CODE_IN_PROMPT", self.include_code_in_prompt);
    }

    /// Overlay the keys present in a YAML file onto this configuration
    pub fn merge_yaml_file(self, path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        self.merge_yaml_str(&contents)
    }

    /// Overlay the keys present in a YAML document onto this configuration
    pub fn merge_yaml_str(self, yaml: &str) -> Result<Self> {
        let overlay: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let overlay = match overlay {
            serde_yaml::Value::Mapping(map) => map,
            serde_yaml::Value::Null => return Ok(self),
            _ => {
                return Err(LogAgentError::Config(
                    "configuration file must contain a mapping of settings".to_string(),
                ))
            }
        };

        let mut base = match serde_yaml::to_value(&self)? {
            serde_yaml::Value::Mapping(map) => map,
            _ => {
                return Err(LogAgentError::Config(
                    "configuration did not serialize to a mapping".to_string(),
                ))
            }
        };

        for (key, value) in overlay {
            base.insert(key, value);
        }

        Ok(serde_yaml::from_value(serde_yaml::Value::Mapping(base))?)
    }

    /// Find a configuration file in the working directory or the user config directory
    pub fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("logagent").join(CONFIG_FILE_NAME))
            .filter(|path| path.is_file())
    }

    /// Validate value ranges
    pub fn validate(&self) -> Result<()> {
        if self.collection_name.trim().is_empty() {
            return Err(invalid("collection_name", "must not be empty"));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(invalid("embedding_model", "must not be empty"));
        }
        if self.embedding_batch_size == 0 {
            return Err(invalid("embedding_batch_size", "must be greater than 0"));
        }
        if self.max_text_length == 0 {
            return Err(invalid("max_text_length", "must be greater than 0"));
        }
        if self.small_file_threshold == 0 {
            return Err(invalid("small_file_threshold", "must be greater than 0"));
        }
        if self.file_pattern.trim().is_empty() {
            return Err(invalid("file_pattern", "must not be empty"));
        }
        if self.default_num_results == 0 {
            return Err(invalid("default_num_results", "must be greater than 0"));
        }
        for (field, score) in [
            ("default_min_score", self.default_min_score),
            ("search_min_score", self.search_min_score),
        ] {
            if !(-1.0..=1.0).contains(&score) {
                return Err(invalid(field, "must be between -1.0 and 1.0"));
            }
        }
        if self.summary_max_lines == 0 {
            return Err(invalid("summary_max_lines", "must be greater than 0"));
        }
        if self.max_tokens == 0 {
            return Err(invalid("max_tokens", "must be greater than 0"));
        }
        if self.ai_timeout_secs == 0 {
            return Err(invalid("ai_timeout_secs", "must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> LogAgentError {
    LogAgentError::Config(format!("invalid value for '{field}': {message}"))
}
