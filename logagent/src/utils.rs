//! Utilities and helpers for chunk identity, similarity and file filtering

use std::path::{Component, Path};

/// Cache, dependency and virtualenv directories that never hold project sources
const SKIPPED_DIRECTORIES: [&str; 5] = [
    "__pycache__",
    "node_modules",
    "target",
    "venv",
    "site-packages",
];

/// Utility functions for semantic search operations
pub struct SemanticUtils;

impl SemanticUtils {
    /// Calculate cosine similarity between two embedding vectors
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot_product / (norm_a * norm_b)
        }
    }

    /// Generate a unique ID for a code chunk
    pub fn generate_chunk_id(file_path: &Path, start_line: usize, end_line: usize) -> String {
        format!("{}:{}:{}", file_path.display(), start_line, end_line)
    }

    /// Check if a file should be indexed based on its path relative to the codebase root
    ///
    /// Hidden entries and cache, dependency and virtualenv directories are skipped.
    /// Package names such as `build` or `env` are ordinary source directories.
    /// Only normal path components are inspected, so `./src/app.py` is accepted.
    pub fn should_index_file(relative_path: &Path) -> bool {
        for component in relative_path.components() {
            if let Component::Normal(name) = component {
                let Some(name) = name.to_str() else {
                    return false;
                };
                if name.starts_with('.') || SKIPPED_DIRECTORIES.contains(&name) {
                    return false;
                }
            }
        }
        true
    }

    /// Truncate text to at most `max_chars` characters, appending a marker when cut
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let mut truncated: String = text.chars().take(max_chars).collect();
        truncated.push_str("\n... [truncated]");
        truncated
    }
}
