//! Bounded prompt construction for AI analysis

use super::rules::percent;
use crate::config::LogAgentConfig;
use crate::types::SearchResult;
use crate::utils::SemanticUtils;
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

/// Builds the diagnostic prompt sent to an AI backend
///
/// The prompt stays bounded: the summary and each code excerpt are truncated
/// and only the first `context_chunks` results are described.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    /// Number of retrieved chunks described
    pub context_chunks: usize,
    /// Include chunk source code
    pub include_code: bool,
    /// Maximum characters of the error summary
    pub max_summary_chars: usize,
    /// Maximum characters of code per chunk
    pub max_code_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            context_chunks: 3,
            include_code: false,
            max_summary_chars: 4000,
            max_code_chars: 1500,
        }
    }
}

impl PromptBuilder {
    /// Limits taken from the pipeline configuration
    pub fn from_config(config: &LogAgentConfig) -> Self {
        Self {
            context_chunks: config.context_chunks,
            include_code: config.include_code_in_prompt,
            max_summary_chars: config.max_summary_chars,
            max_code_chars: config.max_code_chars,
        }
    }

    /// Prompt asking for a diagnosis of `summary` given the retrieved chunks
    pub fn build(&self, summary: &str, results: &[SearchResult]) -> String {
        let mut prompt = String::from(
            "You are an expert software engineer analyzing error logs and providing actionable debugging advice.\n\n",
        );

        prompt.push_str("# Error Log\n\n```\n");
        prompt.push_str(&SemanticUtils::truncate_chars(summary, self.max_summary_chars));
        prompt.push_str("\n```\n\n");

        prompt.push_str("# Relevant Code Context\n\n");
        prompt.push_str(
            "The following code chunks were identified as most relevant to this error (using semantic search):\n",
        );

        for (position, result) in results.iter().take(self.context_chunks).enumerate() {
            let chunk = &result.chunk;
            let _ = write!(
                prompt,
                "\n## Relevant Code Chunk {} (Similarity: {})\n\
                 **File:** {}\n\
                 **Type:** {}\n\
                 **Name:** {}\n\
                 **Lines:** {}-{}\n\
                 **Parent:** {}\n",
                position + 1,
                percent(result.similarity_score),
                chunk.source_file.display(),
                chunk.chunk_type,
                chunk.display_name(),
                chunk.start_line,
                chunk.end_line,
                chunk.parent_name.as_deref().unwrap_or("N/A"),
            );

            if self.include_code {
                let _ = write!(
                    prompt,
                    "\n```python\n{}\n```\n",
                    SemanticUtils::truncate_chars(&chunk.content, self.max_code_chars)
                );
            }
        }

        prompt.push_str(
            "\n# Your Task\n\n\
             Analyze this error log in the context of the relevant code and provide:\n\n\
             1. **Root Cause Analysis**: What is causing this error?\n\
             2. **Specific Location**: Which file, function, and line numbers are involved?\n\
             3. **Explanation**: Why is this happening? What's the underlying issue?\n\
             4. **Recommended Fix**: Provide specific, actionable steps to fix the issue\n\
             5. **Code Suggestion**: If applicable, suggest actual code changes\n\
             6. **Prevention**: How to prevent similar errors in the future\n\n\
             Be specific, practical, and reference the actual file paths and code chunks provided above.\n\
             End your answer with a line of the form `Confidence: NN%` stating how confident you are in the diagnosis.\n",
        );

        prompt
    }
}

fn confidence_regex() -> Option<&'static Regex> {
    static CONFIDENCE: OnceLock<Option<Regex>> = OnceLock::new();
    CONFIDENCE
        .get_or_init(|| Regex::new(r"(?i)confidence\W{0,4}(\d{1,3}(?:\.\d+)?)\s*%").ok())
        .as_ref()
}

/// Confidence the model reported as `Confidence: NN%`, as a fraction in [0, 1]
///
/// The last occurrence wins, since the prompt asks for it as a closing line.
pub fn parse_reported_confidence(response: &str) -> Option<f32> {
    let regex = confidence_regex()?;
    let caps = regex.captures_iter(response).last()?;
    let value: f32 = caps.get(1)?.as_str().parse().ok()?;
    Some((value / 100.0).clamp(0.0, 1.0))
}
