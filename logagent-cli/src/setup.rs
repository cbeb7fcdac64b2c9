//! Configuration loading and agent construction shared by the commands

use crate::error::{CliError, CliResult, IntoCliResult};
use crate::exit_codes::EXIT_ERROR;
use logagent::{IndexingReport, LogAgent, LogAgentConfig};
use std::path::Path;

/// Load configuration from defaults, `LOGAGENT_*` variables and the YAML file
pub fn load_config(explicit_path: Option<&Path>) -> CliResult<LogAgentConfig> {
    LogAgentConfig::load(explicit_path).cli_fatal_error()
}

/// Build the agent, turning construction failures into exit code 2
pub async fn build_agent(config: LogAgentConfig) -> CliResult<LogAgent> {
    LogAgent::new(config).await.cli_fatal_error()
}

/// Index `codebase` before a query, refusing to continue when nothing was indexed
pub async fn index_for_query(agent: &LogAgent, codebase: &Path) -> CliResult<IndexingReport> {
    let report = agent.index_codebase(codebase, None).await.cli_fatal_error()?;
    tracing::info!("{}", report.summary());

    if report.files_processed == 0 {
        tracing::warn!(
            "No files matching '{}' under {}",
            agent.config().file_pattern,
            codebase.display()
        );
    } else if report.files_failed == report.files_processed {
        return Err(CliError::new(
            format!(
                "none of the {} files under {} could be indexed",
                report.files_processed,
                codebase.display()
            ),
            EXIT_ERROR,
        ));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let err = load_config(Some(&temp.path().join("absent.yaml"))).unwrap_err();
        assert_eq!(err.exit_code, EXIT_ERROR);
    }

    #[test]
    fn test_load_config_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logagent.yaml");
        fs::write(&path, "default_num_results: 9\nuse_llm: false\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.default_num_results, 9);
        assert!(!config.use_llm);
    }

    #[tokio::test]
    async fn test_index_for_query() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.py"), "def a():\n    return 1\n").unwrap();

        let agent = build_agent(LogAgentConfig::for_development()).await.unwrap();
        let report = index_for_query(&agent, temp.path()).await.unwrap();
        assert_eq!(report.files_successful, 1);

        let err = index_for_query(&agent, &temp.path().join("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code, EXIT_ERROR);
    }

    #[tokio::test]
    async fn test_index_for_query_empty_directory_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let agent = build_agent(LogAgentConfig::for_development()).await.unwrap();
        let report = index_for_query(&agent, temp.path()).await.unwrap();
        assert_eq!(report.files_processed, 0);
    }
}
