//! Local embedding generation without external API dependencies
//!
//! [`Embedder`] is the contract the indexer and retriever depend on.
//! [`EmbeddingEngine`] is a deterministic implementation that hashes
//! identifier tokens into word vectors and averages them, so that texts
//! sharing identifiers (a function name in a traceback and in the source)
//! land close together.

use crate::error::{LogAgentError, Result};
use crate::types::CodeChunk;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Dimension of vectors produced by [`EmbeddingEngine`]
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Converts text into fixed-length vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts; the output has the same length and order as the input
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of every produced vector
    fn dimensions(&self) -> usize;

    /// Identifier of the underlying model
    fn model_id(&self) -> &str;
}

/// Configuration for the embedding engine
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Model identifier for the embedding model
    pub model_id: String,
    /// Number of texts to process in a single batch
    pub batch_size: usize,
    /// Maximum text length in characters before truncation
    pub max_text_length: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: crate::config::DEFAULT_EMBEDDING_MODEL.to_string(),
            batch_size: 10,
            max_text_length: 8000,
        }
    }
}

/// Embedding engine using local deterministic embedding generation
pub struct EmbeddingEngine {
    config: EmbeddingConfig,
    word_vectors: Arc<Mutex<HashMap<String, Vec<f32>>>>,
}

impl std::fmt::Debug for EmbeddingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingEngine")
            .field("config", &self.config)
            .finish()
    }
}

impl EmbeddingEngine {
    /// Create new embedding engine with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(EmbeddingConfig::default())
    }

    /// Create engine with custom configuration
    pub fn with_config(config: EmbeddingConfig) -> Result<Self> {
        if config.model_id.trim().is_empty() {
            return Err(LogAgentError::Config("Model ID cannot be empty".to_string()));
        }
        if config.batch_size == 0 {
            return Err(LogAgentError::Config(
                "Embedding batch size must be greater than 0".to_string(),
            ));
        }

        info!(
            "Initialized local embedding engine with model: {}",
            config.model_id
        );

        Ok(Self {
            config,
            word_vectors: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Number of distinct tokens with a cached vector
    pub async fn cached_words(&self) -> usize {
        self.word_vectors.lock().await.len()
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(LogAgentError::Embedding("Empty text provided".to_string()));
        }

        let cleaned_text = self.clean_text(text);
        let embedding = self.create_semantic_embedding(&cleaned_text).await;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    /// Weighted average of token vectors plus text-level structure features
    async fn create_semantic_embedding(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return self.create_deterministic_embedding(text);
        }

        let mut token_embeddings = Vec::with_capacity(tokens.len());
        {
            let mut word_vectors = self.word_vectors.lock().await;
            for token in &tokens {
                let vector = word_vectors
                    .entry(token.to_string())
                    .or_insert_with(|| self.create_word_embedding(token))
                    .clone();
                token_embeddings.push(vector);
            }
        }

        let mut embedding = vec![0.0f32; EMBEDDING_DIMENSIONS];
        let total = token_embeddings.len() as f32;
        for (index, token_embedding) in token_embeddings.iter().enumerate() {
            // later tokens weigh slightly more; the failing frame is usually last
            let position_weight = 1.0 + (index as f32 / total) * 0.1;
            for (value, token_value) in embedding.iter_mut().zip(token_embedding) {
                *value += token_value * position_weight / total;
            }
        }

        self.add_structural_features(&mut embedding, text);
        normalize_embedding(&mut embedding);
        embedding
    }

    fn create_word_embedding(&self, word: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; EMBEDDING_DIMENSIONS];

        let mut hasher = DefaultHasher::new();
        word.to_lowercase().hash(&mut hasher);
        let base_hash = hasher.finish();

        for (i, value) in embedding.iter_mut().enumerate() {
            let dim_hash = splitmix(base_hash.wrapping_add(i as u64)) % 1000;
            *value = ((dim_hash as f32 / 1000.0) - 0.5) * 2.0;
        }

        self.add_word_features(&mut embedding, word);
        normalize_embedding(&mut embedding);
        embedding
    }

    fn add_word_features(&self, embedding: &mut [f32], word: &str) {
        let word_lower = word.to_lowercase();

        if is_programming_keyword(&word_lower) {
            boost(embedding, 0, 8, 0.3);
        }

        // Exception class names such as KeyError or ValueError
        if word.ends_with("Error") || word.ends_with("Exception") {
            boost(embedding, 1, 8, 0.25);
        }

        if word.contains('_') || word.chars().skip(1).any(|c| c.is_uppercase()) {
            boost(embedding, 2, 8, 0.15);
        }

        if word.chars().all(|c| c.is_ascii_digit()) {
            boost(embedding, 3, 8, 0.1);
        }
    }

    fn add_structural_features(&self, embedding: &mut [f32], text: &str) {
        let text_len = text.len().max(1) as f32;
        let line_count = text.lines().count() as f32;

        let length_factor = (text_len / 1000.0).min(1.0);
        boost(embedding, 4, 16, length_factor * 0.02);

        if line_count > 1.0 {
            let multiline_factor = (line_count / 10.0).min(1.0);
            boost(embedding, 5, 16, multiline_factor * 0.02);
        }

        let bracket_count = text.chars().filter(|&c| "{}[]()".contains(c)).count() as f32;
        let bracket_density = (bracket_count / text_len).min(0.5);
        boost(embedding, 6, 16, bracket_density * 0.05);
    }

    fn create_deterministic_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; EMBEDDING_DIMENSIONS];

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let text_hash = hasher.finish();

        for (i, value) in embedding.iter_mut().enumerate() {
            let dim_hash = splitmix(text_hash.wrapping_add(i as u64));
            *value = ((dim_hash % 2000) as f32 / 2000.0 - 0.5) * 2.0;
        }

        normalize_embedding(&mut embedding);
        embedding
    }

    fn clean_text(&self, text: &str) -> String {
        let mut result = text
            .lines()
            .map(|line| line.trim())
            .collect::<Vec<_>>()
            .join("\n");

        while result.contains("\n\n\n") {
            result = result.replace("\n\n\n", "\n\n");
        }

        result.chars().take(self.config.max_text_length).collect()
    }
}

#[async_trait]
impl Embedder for EmbeddingEngine {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generate_embedding(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for text_batch in texts.chunks(self.config.batch_size) {
            for text in text_batch {
                embeddings.push(self.generate_embedding(text).await?);
            }
            debug!("Embedded batch of {} texts", text_batch.len());
            tokio::task::yield_now().await;
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }
}

/// Text fed to an embedder for a chunk: kind and name, then the code
pub fn prepare_chunk_text(chunk: &CodeChunk) -> String {
    let mut text = format!("{} {}: ", chunk.chunk_type, chunk.display_name());
    if let Some(parent) = &chunk.parent_name {
        text.push_str(parent);
        text.push(' ');
    }
    text.push_str(&chunk.content);
    text
}

/// Identifier-like tokens: runs of alphanumerics and underscores
fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .collect()
}

fn is_programming_keyword(word: &str) -> bool {
    matches!(
        word,
        "def" | "class" | "return" | "yield" | "import" | "from" | "as" | "if" | "elif"
            | "else" | "for" | "while" | "try" | "except" | "finally" | "raise" | "with"
            | "async" | "await" | "lambda" | "self" | "none" | "true" | "false" | "pass"
            | "global" | "nonlocal"
    )
}

fn boost(embedding: &mut [f32], offset: usize, step: usize, amount: f32) {
    for value in embedding.iter_mut().skip(offset).step_by(step) {
        *value += amount;
    }
}

fn normalize_embedding(embedding: &mut [f32]) {
    let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in embedding.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// SplitMix64 finalizer; spreads consecutive seeds across the output range
fn splitmix(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
