use crate::cli::ReportFormat;
use crate::error::{CliError, CliResult, IntoCliResult};
use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use crate::setup::{build_agent, index_for_query};
use anyhow::Context;
use logagent::{AnalysisResult, LogAgentConfig};
use std::io::Read;
use std::path::PathBuf;

const RULE: &str = "================================================================================";
const SEPARATOR: &str = "--------------------------------------------------------------------------------";

/// Arguments of the `analyze` command
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub codebase: PathBuf,
    pub log: Option<PathBuf>,
    pub num_results: Option<usize>,
    pub min_score: Option<f32>,
    pub no_llm: bool,
    pub include_code: bool,
    pub format: ReportFormat,
}

pub async fn run_analyze_command(
    mut config: LogAgentConfig,
    options: AnalyzeOptions,
) -> CliResult<i32> {
    if options.no_llm {
        config.use_llm = false;
    }
    if options.include_code {
        config.include_code_in_prompt = true;
    }

    let raw_log =
        read_log(options.log.as_ref()).map_err(|e| CliError::from_anyhow(e, EXIT_ERROR))?;
    if raw_log.trim().is_empty() {
        return Err(CliError::new("the error log is empty", EXIT_ERROR));
    }

    let k = options.num_results.unwrap_or(config.default_num_results);
    let min_score = options.min_score.unwrap_or(config.default_min_score);

    let agent = build_agent(config).await?;
    index_for_query(&agent, &options.codebase).await?;

    let result = agent.analyze_with(&raw_log, k, min_score).await;

    match options.format {
        ReportFormat::Text => println!("{}", format_report(&result, agent.backend_name())),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&result).cli_fatal_error()?;
            println!("{json}");
        }
    }
    Ok(EXIT_SUCCESS)
}

fn read_log(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read log file {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read the error log from stdin")?;
            Ok(buffer)
        }
    }
}

/// Render an analysis as the plain text report
pub fn format_report(result: &AnalysisResult, backend_name: Option<&str>) -> String {
    let analysis_type = if result.used_llm {
        "AI-POWERED"
    } else {
        "RULE-BASED"
    };

    let mut output = vec![
        RULE.to_string(),
        format!("ERROR ANALYSIS REPORT ({analysis_type})"),
        RULE.to_string(),
        "\nERROR SUMMARY:".to_string(),
        SEPARATOR.to_string(),
        result.error_summary.clone(),
        format!("\n\nANALYSIS CONFIDENCE: {:.1}%", result.confidence * 100.0),
    ];
    if result.used_llm {
        output.push(format!(
            "Analysis Method: {}",
            backend_name.unwrap_or("AI backend")
        ));
    }

    output.push("\n\nRECOMMENDATIONS:".to_string());
    output.push(SEPARATOR.to_string());
    output.push(result.advice.clone());

    if !result.relevant_chunks.is_empty() {
        output.push("\n\nRELEVANT CODE DETAILS:".to_string());
        output.push(SEPARATOR.to_string());
        for (i, hit) in result.relevant_chunks.iter().take(3).enumerate() {
            let chunk = &hit.chunk;
            output.push(format!("\n[{}] {}", i + 1, chunk.display_name()));
            output.push(format!("    File: {}", chunk.source_file.display()));
            output.push(format!("    Type: {}", chunk.chunk_type));
            output.push(format!("    Lines: {}-{}", chunk.start_line, chunk.end_line));
            output.push(format!("    Match: {:.2}%", hit.similarity_score * 100.0));
        }
    }

    output.push(format!("\n{RULE}"));
    output.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use logagent::{ChunkType, CodeChunk, SearchResult};

    fn hit(name: &str, score: f32, rank: usize) -> SearchResult {
        let chunk = CodeChunk {
            source_file: PathBuf::from("app/settings.py"),
            content: "def x(): pass".to_string(),
            chunk_type: ChunkType::Function,
            name: Some(name.to_string()),
            start_line: 4,
            end_line: 12,
            parent_name: None,
        };
        SearchResult {
            id: chunk.id(),
            chunk,
            similarity_score: score,
            rank,
        }
    }

    fn result(used_llm: bool, hits: Vec<SearchResult>) -> AnalysisResult {
        AnalysisResult {
            error_summary: "KeyError: 'database_url'".to_string(),
            advice: "Check the settings file".to_string(),
            used_llm,
            confidence: 0.756,
            relevant_chunks: hits,
            analyzed_at: Utc::now(),
        }
    }

    #[test]
    fn test_rule_based_report() {
        let report = format_report(&result(false, vec![hit("load_settings", 0.8, 1)]), None);

        assert!(report.contains("ERROR ANALYSIS REPORT (RULE-BASED)"));
        assert!(report.contains("ERROR SUMMARY:\n"));
        assert!(report.contains("KeyError: 'database_url'"));
        assert!(report.contains("ANALYSIS CONFIDENCE: 75.6%"));
        assert!(!report.contains("Analysis Method"));
        assert!(report.contains("RECOMMENDATIONS:"));
        assert!(report.contains("[1] load_settings"));
        assert!(report.contains("    Lines: 4-12"));
        assert!(report.contains("    Match: 80.00%"));
        assert!(report.ends_with(RULE));
    }

    #[test]
    fn test_ai_report_names_backend_and_limits_details() {
        let hits = (0..5).map(|i| hit(&format!("f{i}"), 0.9, i + 1)).collect();
        let report = format_report(&result(true, hits), Some("Claude AI"));

        assert!(report.contains("ERROR ANALYSIS REPORT (AI-POWERED)"));
        assert!(report.contains("Analysis Method: Claude AI"));
        assert!(report.contains("[3] f2"));
        assert!(!report.contains("[4] f3"));
    }

    #[test]
    fn test_report_without_code() {
        let report = format_report(&result(false, Vec::new()), None);
        assert!(!report.contains("RELEVANT CODE DETAILS"));
    }

    #[test]
    fn test_read_log_missing_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = read_log(Some(&temp.path().join("missing.log"))).unwrap_err();
        let cli = CliError::from_anyhow(err, EXIT_ERROR);
        assert_eq!(cli.exit_code, EXIT_ERROR);
        assert!(cli.message.starts_with("failed to read log file"));
        assert!(cli.message.contains("missing.log"));
        assert!(cli.message.contains("Caused by:"));
    }
}
