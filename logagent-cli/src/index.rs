use crate::cli::Cli;
use crate::error::{CliResult, IntoCliResult};
use crate::exit_codes::{EXIT_SUCCESS, EXIT_WARNING};
use crate::setup::build_agent;
use colored::*;
use logagent::{IndexingReport, LogAgentConfig};
use std::path::Path;

/// Index `path` and print a report of files and chunks
///
/// Returns `EXIT_WARNING` when some files could not be indexed.
pub async fn run_index_command(
    mut config: LogAgentConfig,
    path: &Path,
    pattern: Option<&str>,
    quiet: bool,
) -> CliResult<i32> {
    config.show_progress = !quiet;
    let agent = build_agent(config).await?;

    let report = agent.index_codebase(path, pattern).await.cli_fatal_error()?;
    let stats = agent.get_stats().await.cli_fatal_error()?;

    if !quiet {
        print_report(&report, stats.total_chunks, Cli::should_use_color());
    }

    Ok(if report.has_errors() {
        EXIT_WARNING
    } else {
        EXIT_SUCCESS
    })
}

fn print_report(report: &IndexingReport, indexed_chunks: usize, use_color: bool) {
    let heading = "Indexing complete";
    if use_color {
        println!("{}", heading.bold().green());
    } else {
        println!("{heading}");
    }
    println!("  Files processed: {}", report.files_processed);
    println!("  Files indexed:   {}", report.files_successful);
    println!("  Files skipped:   {}", report.files_skipped);
    println!("  Files failed:    {}", report.files_failed);
    println!("  Chunks:          {indexed_chunks}");
    println!("  Duration:        {:.2}s", report.duration.as_secs_f64());

    if report.has_errors() {
        println!();
        let heading = "Failed files:";
        if use_color {
            println!("{}", heading.bold().yellow());
        } else {
            println!("{heading}");
        }
        for (path, error) in &report.errors {
            println!("  {}: {}", path.display(), error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_ERROR;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_index_command_success() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.py"), "def main():\n    pass\n").unwrap();

        let code = run_index_command(LogAgentConfig::for_development(), temp.path(), None, true)
            .await
            .unwrap();
        assert_eq!(code, EXIT_SUCCESS);
    }

    #[tokio::test]
    async fn test_index_command_warns_on_unreadable_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("good.py"), "def ok():\n    pass\n").unwrap();
        fs::write(temp.path().join("bad.py"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let code = run_index_command(LogAgentConfig::for_development(), temp.path(), None, true)
            .await
            .unwrap();
        assert_eq!(code, EXIT_WARNING);
    }

    #[tokio::test]
    async fn test_index_command_missing_path() {
        let temp = TempDir::new().unwrap();
        let err = run_index_command(
            LogAgentConfig::for_development(),
            &temp.path().join("nope"),
            None,
            true,
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code, EXIT_ERROR);
    }
}
