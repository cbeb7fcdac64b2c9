//! Deterministic advice used when no AI backend answers

use crate::types::SearchResult;
use regex::Regex;
use std::sync::OnceLock;

/// Advice given when retrieval found nothing
pub const NO_RELEVANT_CODE: &str = "No relevant code found in the indexed codebase. Suggestions:\n\
1. Ensure the codebase has been properly indexed\n\
2. Check if the error is related to external dependencies\n\
3. Review the error log for stack traces and line numbers";

/// Python exception families with dedicated advice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// `AttributeError`
    Attribute,
    /// `KeyError`
    Key,
    /// `TypeError`
    Type,
    /// `ImportError` or `ModuleNotFoundError`
    Import,
    /// `ValueError`
    Value,
    /// Anything else
    Other,
}

fn exception_name_regex() -> Option<&'static Regex> {
    static EXCEPTION_NAME: OnceLock<Option<Regex>> = OnceLock::new();
    EXCEPTION_NAME
        .get_or_init(|| Regex::new(r"\b([A-Z][A-Za-z0-9_]*(?:Error|Exception))\b").ok())
        .as_ref()
}

/// Exception class names mentioned in `text`, in order of appearance
pub fn exception_names(text: &str) -> Vec<&str> {
    match exception_name_regex() {
        Some(regex) => regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect(),
        None => Vec::new(),
    }
}

impl ErrorClass {
    /// Classify the failure described by `text`
    ///
    /// When several known classes are mentioned the more specific family
    /// wins in the order attribute, key, type, import, value.
    pub fn detect(text: &str) -> Self {
        let names = exception_names(text);
        let mentions = |candidates: &[&str]| names.iter().any(|name| candidates.contains(name));

        if mentions(&["AttributeError"]) {
            ErrorClass::Attribute
        } else if mentions(&["KeyError"]) {
            ErrorClass::Key
        } else if mentions(&["TypeError"]) {
            ErrorClass::Type
        } else if mentions(&["ImportError", "ModuleNotFoundError"]) {
            ErrorClass::Import
        } else if mentions(&["ValueError"]) {
            ErrorClass::Value
        } else {
            ErrorClass::Other
        }
    }

    /// Recommended actions for this class of failure
    pub fn actions(&self) -> [&'static str; 2] {
        match self {
            ErrorClass::Attribute => [
                "Check for None values or missing attributes",
                "Verify object initialization",
            ],
            ErrorClass::Key => [
                "Validate dictionary keys before access",
                "Use .get() method with defaults",
            ],
            ErrorClass::Type => [
                "Check function argument types",
                "Verify data type conversions",
            ],
            ErrorClass::Import => ["Verify package installation", "Check import paths"],
            ErrorClass::Value => [
                "Validate input values and ranges",
                "Check parsing of external data",
            ],
            ErrorClass::Other => [
                "Review the relevant code sections",
                "Check for edge cases and error handling",
            ],
        }
    }
}

pub(crate) fn percent(score: f32) -> String {
    format!("{:.2}%", score * 100.0)
}

/// Keyword-driven advice naming the best match and follow-up actions
///
/// `error_text` is scanned for the exception class that selects the actions.
pub fn rule_based_advice(error_text: &str, results: &[SearchResult]) -> String {
    let Some(top) = results.first() else {
        return NO_RELEVANT_CODE.to_string();
    };

    let mut parts = vec!["Based on the error log and relevant code analysis:".to_string()];

    let chunk = &top.chunk;
    parts.push("\n1. Most relevant code location:".to_string());
    parts.push(format!("   File: {}", chunk.source_file.display()));
    parts.push(format!("   Type: {}", chunk.chunk_type));
    parts.push(format!("   Name: {}", chunk.display_name()));
    parts.push(format!("   Lines: {}-{}", chunk.start_line, chunk.end_line));
    parts.push(format!("   Relevance: {}", percent(top.similarity_score)));

    parts.push("\n2. Recommended actions:".to_string());
    for action in ErrorClass::detect(error_text).actions() {
        parts.push(format!("   - {action}"));
    }

    if results.len() > 1 {
        parts.push("\n3. Other potentially relevant code:".to_string());
        for (position, result) in results.iter().skip(1).take(3).enumerate() {
            parts.push(format!(
                "   {}. {}:{} ({} match)",
                position + 1,
                result.chunk.source_file.display(),
                result.chunk.start_line,
                percent(result.similarity_score)
            ));
        }
    }

    parts.join("\n")
}
