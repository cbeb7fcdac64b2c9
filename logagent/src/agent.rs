//! The [`LogAgent`] facade wiring the pipeline together

use crate::analyzer::{AdviceStrategy, Analyzer, PromptBuilder};
use crate::chunker::{ChunkerConfig, CodeChunker};
use crate::config::LogAgentConfig;
use crate::embedding::{Embedder, EmbeddingConfig, EmbeddingEngine};
use crate::error::{LogAgentError, Result};
use crate::indexer::CodeIndexer;
use crate::llm::{AiBackend, ClaudeBackend};
use crate::retriever::Retriever;
use crate::storage::{InMemoryVectorIndex, VectorIndex};
use crate::summarizer::ErrorSummarizer;
use crate::types::{AnalysisResult, IndexStats, IndexingReport, SearchResult};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Index a codebase, then analyze error logs against it
///
/// ```no_run
/// use logagent::prelude::*;
///
/// # async fn example() -> logagent::Result<()> {
/// let agent = LogAgent::new(LogAgentConfig::for_development()).await?;
/// agent.index_codebase(std::path::Path::new("./src"), None).await?;
/// let result = agent.analyze("KeyError: 'user_id'").await;
/// println!("{}", result.advice);
/// # Ok(())
/// # }
/// ```
pub struct LogAgent {
    config: LogAgentConfig,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    indexer: CodeIndexer,
    retriever: Retriever,
    analyzer: Analyzer,
    backend_name: Option<String>,
}

impl std::fmt::Debug for LogAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogAgent")
            .field("collection", &self.config.collection_name)
            .field("embedding_model", &self.embedder.model_id())
            .field("backend", &self.backend_name)
            .finish()
    }
}

impl LogAgent {
    /// Build the default pipeline: local embeddings, in-memory index, and
    /// Claude when enabled and `ANTHROPIC_API_KEY` is set
    pub async fn new(config: LogAgentConfig) -> Result<Self> {
        config.validate()?;

        let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingEngine::with_config(EmbeddingConfig {
            model_id: config.embedding_model.clone(),
            batch_size: config.embedding_batch_size,
            max_text_length: config.max_text_length,
        })?);
        let index: Arc<dyn VectorIndex> =
            Arc::new(InMemoryVectorIndex::new(config.collection_name.clone()));

        let backend: Option<Arc<dyn AiBackend>> = if config.use_llm {
            match ClaudeBackend::from_env(&config) {
                Ok(backend) => Some(Arc::new(backend)),
                Err(e) => {
                    warn!("AI analysis disabled, using rule-based advice: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self::with_components(config, embedder, index, backend).await
    }

    /// Build a pipeline from explicit collaborators
    ///
    /// Without a backend the analyzer uses rule-based advice only.
    pub async fn with_components(
        config: LogAgentConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        backend: Option<Arc<dyn AiBackend>>,
    ) -> Result<Self> {
        config.validate()?;

        let chunker = Arc::new(CodeChunker::new(ChunkerConfig {
            small_file_threshold: config.small_file_threshold,
        })?);
        let indexer = CodeIndexer::new(chunker, embedder.clone(), index.clone())
            .with_progress(config.show_progress);
        let retriever = Retriever::new(embedder.clone(), index.clone());

        let backend_name = backend.as_ref().map(|b| b.name().to_string());
        let analyzer = Analyzer::new(
            ErrorSummarizer::from_config(&config),
            retriever.clone(),
            AdviceStrategy::from_backend(backend),
        )
        .with_prompt_builder(PromptBuilder::from_config(&config))
        .with_max_tokens(config.max_tokens);

        let agent = Self {
            config,
            embedder,
            index,
            indexer,
            retriever,
            analyzer,
            backend_name,
        };
        agent.setup().await?;

        info!(
            "LogAgent ready (collection '{}', {})",
            agent.config.collection_name,
            agent.backend_name.as_deref().unwrap_or("rule-based analysis")
        );
        Ok(agent)
    }

    /// Create the vector collection if it does not exist yet
    pub async fn setup(&self) -> Result<()> {
        self.index.initialize(self.embedder.dimensions()).await
    }

    /// The configuration the agent was built with
    pub fn config(&self) -> &LogAgentConfig {
        &self.config
    }

    /// True when advice is requested from an AI backend
    pub fn uses_llm(&self) -> bool {
        self.analyzer.strategy().is_ai()
    }

    /// Name of the AI backend, if one is configured
    pub fn backend_name(&self) -> Option<&str> {
        self.backend_name.as_deref()
    }

    /// Index a directory (or single file) of source code
    ///
    /// `pattern` defaults to the configured file pattern.
    pub async fn index_codebase(
        &self,
        path: &Path,
        pattern: Option<&str>,
    ) -> Result<IndexingReport> {
        if !path.exists() {
            return Err(LogAgentError::file_not_found(path));
        }
        let pattern = pattern.unwrap_or(&self.config.file_pattern);
        self.indexer.index_with_report(path, pattern).await
    }

    /// Analyze a raw log with the configured result count and score threshold
    pub async fn analyze(&self, raw_log: &str) -> AnalysisResult {
        self.analyze_with(
            raw_log,
            self.config.default_num_results,
            self.config.default_min_score,
        )
        .await
    }

    /// Analyze a raw log with explicit retrieval parameters
    pub async fn analyze_with(&self, raw_log: &str, k: usize, min_score: f32) -> AnalysisResult {
        self.analyzer.analyze(raw_log, k, min_score).await
    }

    /// Read a log file and analyze it
    pub async fn analyze_file(
        &self,
        path: &Path,
        k: usize,
        min_score: f32,
    ) -> Result<AnalysisResult> {
        if !path.is_file() {
            return Err(LogAgentError::file_not_found(path));
        }
        let raw_log = tokio::fs::read_to_string(path).await?;
        Ok(self.analyze_with(&raw_log, k, min_score).await)
    }

    /// Analyze several logs with the configured score threshold
    pub async fn analyze_multiple(&self, logs: &[String], k: usize) -> Vec<AnalysisResult> {
        self.analyzer
            .analyze_multiple(logs, k, self.config.default_min_score)
            .await
    }

    /// Search the indexed code directly
    pub async fn search_code(
        &self,
        query: &str,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        self.retriever.retrieve(query, limit, min_score).await
    }

    /// Size and configuration of the index
    pub async fn get_stats(&self) -> Result<IndexStats> {
        let info = self.index.info().await?;
        Ok(IndexStats {
            collection_name: info.name,
            total_chunks: info.points_count,
            total_files: info.files_count,
            dimensions: self.embedder.dimensions(),
            embedding_model: self.embedder.model_id().to_string(),
            status: info.status,
        })
    }

    /// Drop everything indexed and recreate an empty collection
    pub async fn reset(&self) -> Result<()> {
        self.index.delete_collection().await?;
        self.setup().await?;
        info!("Index reset");
        Ok(())
    }
}
