//! Vector index abstraction and the in-memory implementation
//!
//! The indexer writes `(id, vector, chunk)` points through [`VectorIndex`] and
//! the retriever reads nearest neighbours back. Each point keeps its chunk as
//! payload so a search result never refers to missing metadata.

use crate::error::{LogAgentError, Result};
use crate::types::{CodeChunk, CollectionInfo, CollectionStatus, EmbeddedChunk, ScoredPoint};
use crate::utils::SemanticUtils;
use async_trait::async_trait;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Storage for embedded chunks with nearest-neighbour search
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection for vectors of the given dimension
    ///
    /// Initializing an existing collection with the same dimension is a no-op.
    async fn initialize(&self, vector_size: usize) -> Result<()>;

    /// Insert or replace the point stored under `id`
    async fn upsert(&self, id: &str, vector: Vec<f32>, chunk: CodeChunk) -> Result<()>;

    /// Up to `k` points with cosine similarity of at least `score_threshold`,
    /// best first
    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>>;

    /// Remove every point whose chunk came from `file_path`, returning how many were removed
    async fn remove_file(&self, file_path: &Path) -> Result<usize>;

    /// Drop all points and return the collection to the uninitialized state
    async fn delete_collection(&self) -> Result<()>;

    /// Name, size and status of the collection
    async fn info(&self) -> Result<CollectionInfo>;
}

#[derive(Debug, Default)]
struct CollectionState {
    vector_size: Option<usize>,
}

/// Vector index held entirely in memory
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    name: String,
    points: DashMap<String, EmbeddedChunk>,
    state: RwLock<CollectionState>,
}

impl InMemoryVectorIndex {
    /// Create an empty, uninitialized index
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: DashMap::new(),
            state: RwLock::new(CollectionState::default()),
        }
    }

    /// Number of stored points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no points are stored
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distinct source files with at least one stored chunk
    pub fn file_count(&self) -> usize {
        self.points
            .iter()
            .map(|entry| entry.value().chunk.source_file.clone())
            .collect::<HashSet<_>>()
            .len()
    }

    async fn require_dimension(&self) -> Result<usize> {
        self.state.read().await.vector_size.ok_or_else(|| {
            LogAgentError::Storage(format!("Collection '{}' is not initialized", self.name))
        })
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COLLECTION_NAME)
    }
}

/// Best first; equal scores fall back to ascending id so results are stable
pub(crate) fn compare_scored(a_score: f32, a_id: &str, b_score: f32, b_id: &str) -> Ordering {
    b_score
        .partial_cmp(&a_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a_id.cmp(b_id))
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn initialize(&self, vector_size: usize) -> Result<()> {
        if vector_size == 0 {
            return Err(LogAgentError::Storage(
                "Vector size must be greater than 0".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        match state.vector_size {
            Some(existing) if existing == vector_size => {
                debug!("Collection '{}' already initialized", self.name);
                Ok(())
            }
            Some(existing) => Err(LogAgentError::Storage(format!(
                "Collection '{}' already exists with dimension {existing}, requested {vector_size}",
                self.name
            ))),
            None => {
                state.vector_size = Some(vector_size);
                info!(
                    "Created collection '{}' with dimension {}",
                    self.name, vector_size
                );
                Ok(())
            }
        }
    }

    async fn upsert(&self, id: &str, vector: Vec<f32>, chunk: CodeChunk) -> Result<()> {
        let dimension = self.require_dimension().await?;
        if vector.len() != dimension {
            return Err(LogAgentError::Storage(format!(
                "Vector for '{id}' has dimension {}, collection expects {dimension}",
                vector.len()
            )));
        }

        self.points.insert(
            id.to_string(),
            EmbeddedChunk {
                id: id.to_string(),
                chunk,
                vector,
            },
        );
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>> {
        let dimension = self.require_dimension().await?;
        if vector.len() != dimension {
            return Err(LogAgentError::Storage(format!(
                "Query vector has dimension {}, collection expects {dimension}",
                vector.len()
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<ScoredPoint> = self
            .points
            .iter()
            .filter_map(|entry| {
                let point = entry.value();
                let score = SemanticUtils::cosine_similarity(vector, &point.vector);
                (score >= score_threshold).then(|| ScoredPoint {
                    id: point.id.clone(),
                    score,
                    chunk: point.chunk.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| compare_scored(a.score, &a.id, b.score, &b.id));
        hits.truncate(k);

        debug!(
            "Search over {} points returned {} hits (k={}, threshold={})",
            self.points.len(),
            hits.len(),
            k,
            score_threshold
        );
        Ok(hits)
    }

    async fn remove_file(&self, file_path: &Path) -> Result<usize> {
        let before = self.points.len();
        self.points
            .retain(|_, point| point.chunk.source_file.as_path() != file_path);
        let removed = before.saturating_sub(self.points.len());

        if removed > 0 {
            debug!("Removed {} points for {}", removed, file_path.display());
        }
        Ok(removed)
    }

    async fn delete_collection(&self) -> Result<()> {
        let mut state = self.state.write().await;
        self.points.clear();
        state.vector_size = None;
        info!("Deleted collection '{}'", self.name);
        Ok(())
    }

    async fn info(&self) -> Result<CollectionInfo> {
        let state = self.state.read().await;
        Ok(CollectionInfo {
            name: self.name.clone(),
            points_count: self.points.len(),
            files_count: self.file_count(),
            vector_size: state.vector_size,
            status: if state.vector_size.is_some() {
                CollectionStatus::Ready
            } else {
                CollectionStatus::Uninitialized
            },
        })
    }
}
