//! Similarity retrieval of code chunks for a query text

use crate::embedding::Embedder;
use crate::error::Result;
use crate::storage::{compare_scored, VectorIndex};
use crate::types::SearchResult;
use std::sync::Arc;
use tracing::debug;

/// Finds the code chunks most similar to a query
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedding_model", &self.embedder.model_id())
            .finish()
    }
}

impl Retriever {
    /// Create a retriever over an embedder and the index it populated
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Up to `k` chunks scoring at least `min_score` against `query_text`, best first
    ///
    /// A zero `k` or a blank query returns no results.
    pub async fn retrieve(
        &self,
        query_text: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        if k == 0 || query_text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query_text).await?;
        let mut hits = self.index.search(&query_vector, k, min_score).await?;

        hits.retain(|hit| hit.score >= min_score);
        hits.sort_by(|a, b| compare_scored(a.score, &a.id, b.score, &b.id));
        hits.truncate(k);

        let results: Vec<SearchResult> = hits
            .into_iter()
            .enumerate()
            .map(|(position, hit)| SearchResult {
                id: hit.id,
                chunk: hit.chunk,
                similarity_score: hit.score,
                rank: position + 1,
            })
            .collect();

        debug!(
            "Retrieved {} chunks (k={}, min_score={})",
            results.len(),
            k,
            min_score
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{prepare_chunk_text, EmbeddingEngine};
    use crate::storage::InMemoryVectorIndex;
    use crate::types::{ChunkType, CodeChunk};
    use std::path::PathBuf;

    async fn populated() -> Retriever {
        let embedder = Arc::new(EmbeddingEngine::new().unwrap());
        let index = Arc::new(InMemoryVectorIndex::new("test"));
        index.initialize(embedder.dimensions()).await.unwrap();

        let sources = [
            ("db.py", "connect_database", "def connect_database(url):\n    return Connection(url, timeout=30)"),
            ("config.py", "load_settings", "def load_settings(env):\n    return env['database_url']"),
            ("ui.py", "render_banner", "def render_banner(title):\n    print(title.upper())"),
        ];
        for (file, name, content) in sources {
            let chunk = CodeChunk {
                source_file: PathBuf::from(file),
                content: content.to_string(),
                chunk_type: ChunkType::Function,
                name: Some(name.to_string()),
                start_line: 1,
                end_line: 2,
                parent_name: None,
            };
            let vector = embedder.embed(&prepare_chunk_text(&chunk)).await.unwrap();
            index.upsert(&chunk.id(), vector, chunk).await.unwrap();
        }

        Retriever::new(embedder, index)
    }

    #[tokio::test]
    async fn test_results_are_ranked_and_sorted() {
        let retriever = populated().await;
        let results = retriever
            .retrieve("KeyError: 'database_url' in load_settings", 3, -1.0)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        for (position, result) in results.iter().enumerate() {
            assert_eq!(result.rank, position + 1);
        }
        assert!(results
            .windows(2)
            .all(|w| w[0].similarity_score >= w[1].similarity_score));
        assert_eq!(results[0].chunk.name.as_deref(), Some("load_settings"));
    }

    #[tokio::test]
    async fn test_degenerate_queries_return_nothing() {
        let retriever = populated().await;
        assert!(retriever.retrieve("anything", 0, 0.0).await.unwrap().is_empty());
        assert!(retriever.retrieve("   ", 5, 0.0).await.unwrap().is_empty());
        assert!(retriever.retrieve("anything", 5, 1.01).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_min_score_is_monotone() {
        let retriever = populated().await;
        let query = "Connection timeout while calling connect_database";

        let mut previous = usize::MAX;
        for threshold in [-1.0, 0.0, 0.2, 0.4, 0.6, 0.8, 1.0] {
            let results = retriever.retrieve(query, 10, threshold).await.unwrap();
            assert!(results.iter().all(|r| r.similarity_score >= threshold));
            assert!(results.len() <= previous);
            previous = results.len();
        }
    }

    #[tokio::test]
    async fn test_k_limits_results() {
        let retriever = populated().await;
        let results = retriever.retrieve("def", 2, -1.0).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
