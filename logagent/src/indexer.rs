//! Codebase indexing: chunk, embed and store source files

use crate::chunker::CodeChunker;
use crate::embedding::{prepare_chunk_text, Embedder};
use crate::error::{LogAgentError, Result};
use crate::source::{discover_files, SourceFile};
use crate::storage::VectorIndex;
use crate::types::IndexingReport;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Indexes source files into a vector index
pub struct CodeIndexer {
    chunker: Arc<CodeChunker>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    show_progress: bool,
}

impl std::fmt::Debug for CodeIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeIndexer")
            .field("embedding_model", &self.embedder.model_id())
            .field("show_progress", &self.show_progress)
            .finish()
    }
}

impl CodeIndexer {
    /// Create an indexer over the given collaborators
    pub fn new(
        chunker: Arc<CodeChunker>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            show_progress: false,
        }
    }

    /// Show a progress bar on stderr while indexing
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Index every file under `codebase_path` matching `file_pattern`
    ///
    /// Returns the total number of chunks indexed.
    pub async fn index(&self, codebase_path: &Path, file_pattern: &str) -> Result<usize> {
        let report = self.index_with_report(codebase_path, file_pattern).await?;
        Ok(report.total_chunks)
    }

    /// Index every file under `codebase_path` matching `file_pattern`, with a full report
    pub async fn index_with_report(
        &self,
        codebase_path: &Path,
        file_pattern: &str,
    ) -> Result<IndexingReport> {
        let start_time = Instant::now();
        info!(
            "Starting indexing of {} with pattern: {}",
            codebase_path.display(),
            file_pattern
        );

        let file_paths = discover_files(codebase_path, file_pattern)?;
        if file_paths.is_empty() {
            warn!(
                "No files found matching pattern '{}' under {}",
                file_pattern,
                codebase_path.display()
            );
            return Ok(IndexingReport::new());
        }
        info!("Found {} files matching pattern", file_paths.len());

        let mut read_failures = IndexingReport::new();
        let mut sources = Vec::with_capacity(file_paths.len());
        for path in file_paths {
            match SourceFile::read(&path) {
                Ok(source) => sources.push(source),
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", path.display(), e);
                    read_failures.files_processed += 1;
                    read_failures.add_error(path, e.to_string());
                }
            }
        }

        let mut report = self.index_sources(sources).await?;
        report.merge(read_failures);
        report.duration = start_time.elapsed();

        info!("Indexing report: {}", report.summary());
        Ok(report)
    }

    /// Index already-loaded sources
    ///
    /// Empty files are skipped and lose any chunks stored for them earlier.
    /// Embedder and index failures abort the run.
    pub async fn index_sources(&self, sources: Vec<SourceFile>) -> Result<IndexingReport> {
        let start_time = Instant::now();
        let mut report = IndexingReport::new();
        let progress = self.progress_bar(sources.len());

        for source in &sources {
            progress.set_message(format!("Processing {}", source.path.display()));
            report.files_processed += 1;

            if source.content.trim().is_empty() {
                debug!("Skipping empty file: {}", source.path.display());
                self.index.remove_file(&source.path).await?;
                report.files_skipped += 1;
                progress.inc(1);
                continue;
            }

            let stored = self.index_file(source).await?;
            report.add_success(stored, stored);
            progress.inc(1);
        }

        progress.finish_with_message("Indexing complete");
        report.duration = start_time.elapsed();
        Ok(report)
    }

    /// Chunk, embed and store one file, replacing anything previously stored for it
    ///
    /// Returns the number of chunks stored.
    pub async fn index_file(&self, source: &SourceFile) -> Result<usize> {
        let chunks = self.chunker.split(&source.path, &source.content);
        if chunks.is_empty() {
            warn!("No chunks extracted from file: {}", source.path.display());
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(prepare_chunk_text).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(LogAgentError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks of {}",
                vectors.len(),
                chunks.len(),
                source.path.display()
            )));
        }

        let removed = self.index.remove_file(&source.path).await?;
        if removed > 0 {
            debug!(
                "Replacing {} previous chunks of {}",
                removed,
                source.path.display()
            );
        }

        let count = chunks.len();
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            let id = chunk.id();
            self.index.upsert(&id, vector, chunk).await?;
        }

        debug!("Indexed {} chunks from {}", count, source.path.display());
        Ok(count)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style);
        progress
    }
}
