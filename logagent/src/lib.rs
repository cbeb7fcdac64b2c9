//! # LogAgent
//!
//! Retrieval-augmented error analysis for Python codebases.
//!
//! ## Features
//!
//! - **Chunking**: Split Python sources into functions, classes and module code with tree-sitter
//! - **Embeddings**: Local deterministic embeddings, no external service required
//! - **Vector Search**: In-memory cosine-similarity index over code chunks
//! - **Error Summaries**: Pull the failure-describing lines out of a raw log
//! - **Analysis**: AI-generated advice via Claude, with a rule-based fallback
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use logagent::prelude::*;
//! use std::path::Path;
//!
//! # async fn run() -> logagent::Result<()> {
//! let agent = LogAgent::new(LogAgentConfig::load(None)?).await?;
//! let report = agent.index_codebase(Path::new("./my_project"), None).await?;
//! println!("{}", report.summary());
//!
//! let result = agent
//!     .analyze("Traceback (most recent call last):\nKeyError: 'user_id'")
//!     .await;
//! println!("{}", result.advice);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Unified error handling
pub mod error;

/// Core data types
pub mod types;

/// Similarity, chunk identity and path filtering helpers
pub mod utils;

/// Environment variable helpers
pub mod env_loader;

/// Pipeline configuration
pub mod config;

/// Python source chunking
pub mod chunker;

/// Text embeddings
pub mod embedding;

/// Vector index abstraction and in-memory implementation
pub mod storage;

/// Source file discovery
pub mod source;

/// Codebase indexing
pub mod indexer;

/// Error log summarization
pub mod summarizer;

/// Similarity retrieval
pub mod retriever;

/// AI backends
pub mod llm;

/// Error analysis and advice generation
pub mod analyzer;

/// High level facade
pub mod agent;

pub use agent::LogAgent;
pub use analyzer::{Advice, AdviceContext, AdviceStrategy, Analyzer, PromptBuilder};
pub use chunker::{ChunkerConfig, CodeChunker};
pub use config::LogAgentConfig;
pub use embedding::{Embedder, EmbeddingConfig, EmbeddingEngine};
pub use error::{ErrorChain, ErrorContext, LogAgentError, Result};
pub use indexer::CodeIndexer;
pub use llm::{AiBackend, ClaudeBackend, ClaudeConfig, MockAiBackend, MockAiConfig};
pub use retriever::Retriever;
pub use source::SourceFile;
pub use storage::{InMemoryVectorIndex, VectorIndex};
pub use summarizer::ErrorSummarizer;
pub use types::{
    AnalysisResult, ChunkType, CodeChunk, CollectionInfo, CollectionStatus, EmbeddedChunk,
    IndexStats, IndexingReport, ScoredPoint, SearchResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AiBackend, AnalysisResult, ChunkType, CodeChunk, Embedder, IndexingReport, LogAgent,
        LogAgentConfig, LogAgentError, Result, SearchResult, VectorIndex,
    };
}
