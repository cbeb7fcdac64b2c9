//! Core data types shared across the indexing and analysis pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::SemanticUtils;

/// Kind of source span a chunk covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    /// Whole file, or module-level code outside any definition
    Module,
    /// Top-level function
    Function,
    /// Class including all of its methods
    Class,
    /// Method of a class
    Method,
}

impl ChunkType {
    /// Lowercase label used in reports and prompts
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Module => "module",
            ChunkType::Function => "function",
            ChunkType::Class => "class",
            ChunkType::Method => "method",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous, semantically bounded span of a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChunk {
    /// File the chunk was taken from
    pub source_file: PathBuf,
    /// Verbatim source text of the span
    pub content: String,
    /// What kind of span this is
    pub chunk_type: ChunkType,
    /// Definition name, or the file name for module chunks
    pub name: Option<String>,
    /// First line of the span (1-based)
    pub start_line: usize,
    /// Last line of the span (1-based, inclusive)
    pub end_line: usize,
    /// Enclosing definition, set for methods
    pub parent_name: Option<String>,
}

impl CodeChunk {
    /// Stable identifier derived from file and line span
    pub fn id(&self) -> String {
        SemanticUtils::generate_chunk_id(&self.source_file, self.start_line, self.end_line)
    }

    /// Name for display, falling back to the file name
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| file_name_of(&self.source_file))
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A chunk together with its embedding vector, as stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// Identifier the vector is stored under
    pub id: String,
    /// The chunk the vector was computed from
    pub chunk: CodeChunk,
    /// Embedding vector
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    /// Pair a chunk with its vector, deriving the identifier from the chunk
    pub fn new(chunk: CodeChunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id(),
            chunk,
            vector,
        }
    }
}

/// Raw nearest-neighbour hit returned by a vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    /// Identifier of the stored point
    pub id: String,
    /// Cosine similarity to the query vector
    pub score: f32,
    /// Metadata stored with the point
    pub chunk: CodeChunk,
}

/// A ranked retrieval result handed to the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifier of the embedded chunk
    pub id: String,
    /// Chunk metadata and content
    pub chunk: CodeChunk,
    /// Similarity between the query and the chunk
    pub similarity_score: f32,
    /// Position in the result list, starting at 1
    pub rank: usize,
}

/// Outcome of analyzing one error log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Lines of the log that describe the failure
    pub error_summary: String,
    /// Diagnostic advice text
    pub advice: String,
    /// Whether the advice came from the AI backend
    pub used_llm: bool,
    /// Confidence in the analysis, in [0, 1]
    pub confidence: f32,
    /// Retrieved chunks, best first
    pub relevant_chunks: Vec<SearchResult>,
    /// When the analysis was produced
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// The best-matching chunk, if any
    pub fn top_chunk(&self) -> Option<&SearchResult> {
        self.relevant_chunks.first()
    }
}

/// State of a vector collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    /// Collection exists and accepts points
    Ready,
    /// Collection has not been created or was deleted
    Uninitialized,
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionStatus::Ready => f.write_str("ready"),
            CollectionStatus::Uninitialized => f.write_str("uninitialized"),
        }
    }
}

/// Information reported by a vector index about its collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name
    pub name: String,
    /// Number of stored points
    pub points_count: usize,
    /// Number of distinct source files the points came from
    pub files_count: usize,
    /// Vector dimension, once initialized
    pub vector_size: Option<usize>,
    /// Current status
    pub status: CollectionStatus,
}

/// Statistics about the indexed codebase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Collection name
    pub collection_name: String,
    /// Number of indexed chunks
    pub total_chunks: usize,
    /// Number of distinct source files with chunks
    pub total_files: usize,
    /// Embedding dimension
    pub dimensions: usize,
    /// Embedding model identifier
    pub embedding_model: String,
    /// Collection status
    pub status: CollectionStatus,
}

/// Report of an indexing operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexingReport {
    /// Number of files attempted
    pub files_processed: usize,
    /// Number of files indexed successfully
    pub files_successful: usize,
    /// Number of files that could not be read
    pub files_failed: usize,
    /// Number of files skipped because they were empty
    pub files_skipped: usize,
    /// Total chunks produced
    pub total_chunks: usize,
    /// Total vectors upserted
    pub total_embeddings: usize,
    /// Per-file failures
    pub errors: Vec<(PathBuf, String)>,
    /// Wall-clock time spent
    pub duration: Duration,
}

impl IndexingReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file that failed to index
    pub fn add_error(&mut self, file_path: PathBuf, error: String) {
        self.files_failed += 1;
        self.errors.push((file_path, error));
    }

    /// Record a successfully indexed file
    pub fn add_success(&mut self, chunks: usize, embeddings: usize) {
        self.files_successful += 1;
        self.total_chunks += chunks;
        self.total_embeddings += embeddings;
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: IndexingReport) {
        self.files_processed += other.files_processed;
        self.files_successful += other.files_successful;
        self.files_failed += other.files_failed;
        self.files_skipped += other.files_skipped;
        self.total_chunks += other.total_chunks;
        self.total_embeddings += other.total_embeddings;
        self.errors.extend(other.errors);
        self.duration += other.duration;
    }

    /// True when at least one file failed
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        format!(
            "Indexed {}/{} files ({} failed, {} skipped): {} chunks, {} embeddings in {:.2}s",
            self.files_successful,
            self.files_processed,
            self.files_failed,
            self.files_skipped,
            self.total_chunks,
            self.total_embeddings,
            self.duration.as_secs_f64()
        )
    }
}
