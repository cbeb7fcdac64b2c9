use clap::CommandFactory;
use logagent_cli::analyze::{self, AnalyzeOptions};
use logagent_cli::cli::{self, Commands};
use logagent_cli::doctor::Doctor;
use logagent_cli::error::handle_cli_result;
use logagent_cli::exit_codes::EXIT_SUCCESS;
use logagent_cli::{index, search, setup};
use std::path::Path;
use std::process;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse_args();

    // Fast path for help
    let Some(command) = cli.command.as_ref() else {
        let _ = cli::Cli::command().print_help();
        println!();
        process::exit(EXIT_SUCCESS);
    };

    use tracing::Level;

    let log_level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::TRACE
    } else if cli.debug {
        Level::DEBUG
    } else if cli.is_machine_readable() {
        Level::WARN
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level)
        .init();

    let config_path = cli.config.as_deref();

    let exit_code = match command {
        Commands::Index { path, pattern } => {
            tracing::info!("Running index command");
            run_index(config_path, path, pattern.as_deref(), cli.quiet).await
        }
        Commands::Analyze {
            codebase,
            log,
            num_results,
            min_score,
            no_llm,
            include_code,
            format,
        } => {
            tracing::info!("Running analyze command");
            let options = AnalyzeOptions {
                codebase: codebase.clone(),
                log: log.clone(),
                num_results: *num_results,
                min_score: *min_score,
                no_llm: *no_llm,
                include_code: *include_code,
                format: *format,
            };
            run_analyze(config_path, options).await
        }
        Commands::Search {
            codebase,
            query,
            limit,
            min_score,
            format,
        } => {
            tracing::info!("Running search command");
            run_search(config_path, codebase, query, *limit, *min_score, *format).await
        }
        Commands::Doctor => {
            tracing::info!("Running doctor command");
            run_doctor(config_path).await
        }
    };

    process::exit(exit_code);
}

async fn run_index(
    config_path: Option<&Path>,
    path: &Path,
    pattern: Option<&str>,
    quiet: bool,
) -> i32 {
    let result = match setup::load_config(config_path) {
        Ok(config) => index::run_index_command(config, path, pattern, quiet).await,
        Err(e) => Err(e),
    };
    handle_cli_result(result)
}

async fn run_analyze(config_path: Option<&Path>, options: AnalyzeOptions) -> i32 {
    let result = match setup::load_config(config_path) {
        Ok(config) => analyze::run_analyze_command(config, options).await,
        Err(e) => Err(e),
    };
    handle_cli_result(result)
}

async fn run_search(
    config_path: Option<&Path>,
    codebase: &Path,
    query: &str,
    limit: usize,
    min_score: Option<f32>,
    format: cli::OutputFormat,
) -> i32 {
    let result = match setup::load_config(config_path) {
        Ok(config) => {
            search::run_search_command(config, codebase, query, limit, min_score, format).await
        }
        Err(e) => Err(e),
    };
    handle_cli_result(result)
}

async fn run_doctor(config_path: Option<&Path>) -> i32 {
    let mut doctor = Doctor::new();
    doctor.run_diagnostics(config_path).await
}
