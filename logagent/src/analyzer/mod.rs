//! Error analysis: summarize a log, retrieve related code, produce advice
//!
//! The [`Analyzer`] never fails. Retrieval problems degrade to "no results"
//! and any AI backend problem degrades to the rule-based advice in [`rules`].

pub mod prompt;
pub mod rules;

use crate::llm::AiBackend;
use crate::retriever::Retriever;
use crate::summarizer::ErrorSummarizer;
use crate::types::{AnalysisResult, SearchResult};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub use prompt::{parse_reported_confidence, PromptBuilder};
pub use rules::{rule_based_advice, ErrorClass, NO_RELEVANT_CODE};

/// Advice text with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    /// Advice shown to the user
    pub text: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// Whether the AI backend produced the text
    pub used_llm: bool,
}

/// Per-call inputs to advice generation beyond the summary and results
#[derive(Debug, Clone, Copy)]
pub struct AdviceContext<'a> {
    /// The unabridged log, scanned for the exception class
    pub raw_log: &'a str,
    /// Limits for the AI prompt
    pub prompt_builder: &'a PromptBuilder,
    /// Tokens requested from the AI backend
    pub max_tokens: u32,
}

/// How advice is produced, fixed when the analyzer is built
#[derive(Clone)]
pub enum AdviceStrategy {
    /// Ask an AI backend, falling back to rules when it cannot answer
    Ai {
        backend: Arc<dyn AiBackend>,
        /// Health check result, taken on first use and shared by clones
        healthy: Arc<OnceCell<bool>>,
    },
    /// Keyword-driven advice only
    RuleBased,
}

impl std::fmt::Debug for AdviceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdviceStrategy::Ai { backend, healthy } => f
                .debug_struct("Ai")
                .field("backend", &backend.name())
                .field("healthy", &healthy.get())
                .finish(),
            AdviceStrategy::RuleBased => f.write_str("RuleBased"),
        }
    }
}

impl AdviceStrategy {
    /// AI strategy over `backend`
    pub fn ai(backend: Arc<dyn AiBackend>) -> Self {
        AdviceStrategy::Ai {
            backend,
            healthy: Arc::new(OnceCell::new()),
        }
    }

    /// Pick the AI strategy when a backend is available
    pub fn from_backend(backend: Option<Arc<dyn AiBackend>>) -> Self {
        match backend {
            Some(backend) => AdviceStrategy::ai(backend),
            None => AdviceStrategy::RuleBased,
        }
    }

    /// True for the AI strategy
    pub fn is_ai(&self) -> bool {
        matches!(self, AdviceStrategy::Ai { .. })
    }

    /// Produce advice for a summarized error and its retrieved code
    pub async fn produce_advice(
        &self,
        summary: &str,
        results: &[SearchResult],
        context: &AdviceContext<'_>,
    ) -> Advice {
        if results.is_empty() {
            return Advice {
                text: NO_RELEVANT_CODE.to_string(),
                confidence: 0.0,
                used_llm: false,
            };
        }

        if let AdviceStrategy::Ai { backend, healthy } = self {
            let healthy = *healthy.get_or_init(|| backend.health_check()).await;
            let outcome = if healthy {
                ai_advice(backend.as_ref(), summary, results, context).await
            } else {
                Err("health check failed".to_string())
            };
            match outcome {
                Ok(advice) => return advice,
                Err(reason) => warn!(
                    "{} analysis unavailable, falling back to rule-based advice: {}",
                    backend.name(),
                    reason
                ),
            }
        }

        Advice {
            text: rule_based_advice(context.raw_log, results),
            confidence: calculate_confidence(results),
            used_llm: false,
        }
    }
}

async fn ai_advice(
    backend: &dyn AiBackend,
    summary: &str,
    results: &[SearchResult],
    context: &AdviceContext<'_>,
) -> std::result::Result<Advice, String> {
    let prompt = context.prompt_builder.build(summary, results);
    debug!("Sending {} character prompt to {}", prompt.len(), backend.name());

    let response = backend
        .complete(&prompt, context.max_tokens)
        .await
        .map_err(|e| e.to_string())?;
    if response.trim().is_empty() {
        return Err("empty response".to_string());
    }

    let confidence =
        parse_reported_confidence(&response).unwrap_or_else(|| calculate_confidence(results));

    Ok(Advice {
        text: format!("{}{}", response.trim_end(), code_locations(results)),
        confidence,
        used_llm: true,
    })
}

/// Listing of the top retrieved locations appended to AI advice
pub fn code_locations(results: &[SearchResult]) -> String {
    let rule = "=".repeat(80);
    let mut parts = vec![
        String::new(),
        String::new(),
        rule.clone(),
        "RELEVANT CODE LOCATIONS".to_string(),
        rule,
    ];

    for (position, result) in results.iter().take(5).enumerate() {
        let chunk = &result.chunk;
        parts.push(format!(
            "\n{}. {}:{}",
            position + 1,
            chunk.source_file.display(),
            chunk.start_line
        ));
        parts.push(format!("   Type: {}", chunk.chunk_type));
        parts.push(format!("   Name: {}", chunk.display_name()));
        parts.push(format!(
            "   Similarity: {}",
            rules::percent(result.similarity_score)
        ));
    }

    parts.join("\n")
}

/// Confidence derived from retrieval scores
///
/// The top score, boosted by 0.1 for each result scoring above 0.5 (at most
/// 0.3), capped at 1. No results means no confidence.
pub fn calculate_confidence(results: &[SearchResult]) -> f32 {
    let Some(top) = results.first() else {
        return 0.0;
    };

    let strong = results.iter().filter(|r| r.similarity_score > 0.5).count();
    let boost = (strong as f32 * 0.1).min(0.3);
    (top.similarity_score + boost).clamp(0.0, 1.0)
}

/// Combines summarizer, retriever and advice strategy
#[derive(Debug, Clone)]
pub struct Analyzer {
    summarizer: ErrorSummarizer,
    retriever: Retriever,
    strategy: AdviceStrategy,
    prompt_builder: PromptBuilder,
    max_tokens: u32,
}

impl Analyzer {
    /// Create an analyzer with default prompt limits
    pub fn new(summarizer: ErrorSummarizer, retriever: Retriever, strategy: AdviceStrategy) -> Self {
        Self {
            summarizer,
            retriever,
            strategy,
            prompt_builder: PromptBuilder::default(),
            max_tokens: 2000,
        }
    }

    /// Use custom prompt limits
    pub fn with_prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    /// Cap the tokens requested from the AI backend
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The strategy chosen at construction
    pub fn strategy(&self) -> &AdviceStrategy {
        &self.strategy
    }

    /// Analyze one raw log
    pub async fn analyze(&self, raw_log: &str, k: usize, min_score: f32) -> AnalysisResult {
        let error_summary = self.summarizer.summarize(raw_log);

        let relevant_chunks = match self.retriever.retrieve(raw_log, k, min_score).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Retrieval failed, analyzing without code context: {}", e);
                Vec::new()
            }
        };
        debug!("Retrieved {} relevant chunks", relevant_chunks.len());

        let context = AdviceContext {
            raw_log,
            prompt_builder: &self.prompt_builder,
            max_tokens: self.max_tokens,
        };
        let advice = self
            .strategy
            .produce_advice(&error_summary, &relevant_chunks, &context)
            .await;

        info!(
            "Analysis complete ({}, confidence {:.2})",
            if advice.used_llm { "AI" } else { "rule-based" },
            advice.confidence
        );

        AnalysisResult {
            error_summary,
            advice: advice.text,
            used_llm: advice.used_llm,
            confidence: advice.confidence.clamp(0.0, 1.0),
            relevant_chunks,
            analyzed_at: Utc::now(),
        }
    }

    /// Analyze several logs one after another
    pub async fn analyze_multiple(
        &self,
        logs: &[String],
        k: usize,
        min_score: f32,
    ) -> Vec<AnalysisResult> {
        let mut results = Vec::with_capacity(logs.len());
        for log in logs {
            results.push(self.analyze(log, k, min_score).await);
        }
        results
    }
}
