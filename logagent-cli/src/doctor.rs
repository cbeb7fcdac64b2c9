//! Diagnostics for a LogAgent installation
//!
//! Checks that the configuration loads and validates, that the embedding
//! engine works, and whether AI-powered analysis is available. The doctor
//! returns exit codes:
//! - 0: All checks passed
//! - 1: Some warnings detected
//! - 2: Errors detected

use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_WARNING};
use colored::*;
use logagent::env_loader::load_env_nonempty;
use logagent::llm::API_KEY_ENV;
use logagent::{
    AiBackend, ClaudeBackend, Embedder, EmbeddingConfig, EmbeddingEngine, LogAgentConfig,
};
use std::path::{Path, PathBuf};

/// Status of a single diagnostic check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed without issues
    Ok,
    /// Works, but not fully
    Warning,
    /// Check failed
    Error,
}

/// Result of one diagnostic check
#[derive(Debug, Clone)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    /// Suggested fix for warnings and errors
    pub fix: Option<String>,
}

impl Check {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            fix: None,
        }
    }

    fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

/// Accumulates check results and prints a summary
#[derive(Debug, Default)]
pub struct Doctor {
    checks: Vec<Check>,
}

impl Doctor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks performed so far
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Run every check and print the results
    pub async fn run_diagnostics(&mut self, config_path: Option<&Path>) -> i32 {
        let use_color = crate::cli::Cli::should_use_color();
        if use_color {
            println!("{}", "LogAgent Doctor".bold().blue());
            println!("{}", "Running diagnostics...".dimmed());
        } else {
            println!("LogAgent Doctor");
            println!("Running diagnostics...");
        }
        println!();

        self.collect(config_path).await;
        self.print_results(use_color);
        self.exit_code()
    }

    /// Run the checks without printing anything
    pub async fn collect(&mut self, config_path: Option<&Path>) {
        self.check_config_file(config_path);
        let Some(config) = self.check_config(config_path) else {
            return;
        };
        self.check_embeddings(&config).await;
        if self.check_ai_settings(&config) {
            self.check_ai_backend(&config).await;
        }
    }

    fn check_config_file(&mut self, config_path: Option<&Path>) {
        let located: Option<PathBuf> = config_path
            .map(Path::to_path_buf)
            .or_else(LogAgentConfig::find_config_file);

        let check = match located {
            Some(path) if path.is_file() => Check::new(
                "Configuration file",
                CheckStatus::Ok,
                format!("Using {}", path.display()),
            ),
            Some(path) => Check::new(
                "Configuration file",
                CheckStatus::Error,
                format!("{} does not exist", path.display()),
            )
            .with_fix("Pass an existing file to --config"),
            None => Check::new(
                "Configuration file",
                CheckStatus::Ok,
                "No logagent.yaml found, using defaults and environment",
            ),
        };
        self.checks.push(check);
    }

    fn check_config(&mut self, config_path: Option<&Path>) -> Option<LogAgentConfig> {
        match LogAgentConfig::load(config_path) {
            Ok(config) => {
                self.checks.push(Check::new(
                    "Configuration validation",
                    CheckStatus::Ok,
                    format!(
                        "Collection '{}', pattern '{}', {} results at min score {}",
                        config.collection_name,
                        config.file_pattern,
                        config.default_num_results,
                        config.default_min_score
                    ),
                ));
                Some(config)
            }
            Err(e) => {
                self.checks.push(
                    Check::new("Configuration validation", CheckStatus::Error, e.to_string())
                        .with_fix("Fix the value in logagent.yaml or the LOGAGENT_* variables"),
                );
                None
            }
        }
    }

    async fn check_embeddings(&mut self, config: &LogAgentConfig) {
        let engine = EmbeddingEngine::with_config(EmbeddingConfig {
            model_id: config.embedding_model.clone(),
            batch_size: config.embedding_batch_size,
            max_text_length: config.max_text_length,
        });

        let check = match engine {
            Ok(engine) => match engine.embed("def health_check(): pass").await {
                Ok(vector) if vector.len() == engine.dimensions() => Check::new(
                    "Embedding engine",
                    CheckStatus::Ok,
                    format!("{} ({} dimensions)", engine.model_id(), vector.len()),
                ),
                Ok(vector) => Check::new(
                    "Embedding engine",
                    CheckStatus::Error,
                    format!(
                        "expected {} dimensions, got {}",
                        engine.dimensions(),
                        vector.len()
                    ),
                ),
                Err(e) => Check::new("Embedding engine", CheckStatus::Error, e.to_string()),
            },
            Err(e) => Check::new("Embedding engine", CheckStatus::Error, e.to_string()),
        };
        self.checks.push(check);
    }

    /// Returns true when the AI backend is worth contacting
    fn check_ai_settings(&mut self, config: &LogAgentConfig) -> bool {
        if !config.use_llm {
            self.checks.push(
                Check::new(
                    "AI analysis",
                    CheckStatus::Warning,
                    "Disabled, advice will be rule-based",
                )
                .with_fix("Set use_llm: true or LOGAGENT_USE_LLM=true"),
            );
            return false;
        }

        if load_env_nonempty(API_KEY_ENV).is_none() {
            self.checks.push(
                Check::new(
                    "AI API key",
                    CheckStatus::Warning,
                    format!("{API_KEY_ENV} is not set, advice will be rule-based"),
                )
                .with_fix(format!("export {API_KEY_ENV}=<your key>")),
            );
            return false;
        }

        self.checks.push(Check::new(
            "AI API key",
            CheckStatus::Ok,
            format!("{API_KEY_ENV} is set"),
        ));
        true
    }

    async fn check_ai_backend(&mut self, config: &LogAgentConfig) {
        let check = match ClaudeBackend::from_env(config) {
            Ok(backend) => {
                if backend.health_check().await {
                    Check::new(
                        "AI backend",
                        CheckStatus::Ok,
                        format!("{} reachable with model {}", backend.name(), backend.model()),
                    )
                } else {
                    Check::new(
                        "AI backend",
                        CheckStatus::Warning,
                        format!("{} did not answer, analysis will fall back to rules", backend.name()),
                    )
                    .with_fix("Check the API key, network access and claude_base_url")
                }
            }
            Err(e) => Check::new("AI backend", CheckStatus::Error, e.to_string()),
        };
        self.checks.push(check);
    }

    fn print_results(&self, use_color: bool) {
        for check in &self.checks {
            print_check(check, use_color);
        }
        println!();

        let ok = self.count(CheckStatus::Ok);
        let warnings = self.count(CheckStatus::Warning);
        let errors = self.count(CheckStatus::Error);

        if use_color {
            println!("{}", "Summary:".bold().green());
        } else {
            println!("Summary:");
        }
        match (errors, warnings) {
            (0, 0) => println!("  All checks passed!"),
            (0, _) => println!("  {ok} checks passed, {warnings} warnings"),
            _ => println!("  {ok} checks passed, {warnings} warnings, {errors} errors"),
        }
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// Exit code for the collected results
    pub fn exit_code(&self) -> i32 {
        if self.count(CheckStatus::Error) > 0 {
            EXIT_ERROR
        } else if self.count(CheckStatus::Warning) > 0 {
            EXIT_WARNING
        } else {
            EXIT_SUCCESS
        }
    }
}

fn print_check(check: &Check, use_color: bool) {
    let (symbol, color_fn): (&str, fn(&str) -> ColoredString) = match check.status {
        CheckStatus::Ok => ("✓", |s: &str| s.green()),
        CheckStatus::Warning => ("⚠", |s: &str| s.yellow()),
        CheckStatus::Error => ("✗", |s: &str| s.red()),
    };

    if use_color {
        println!(
            "  {} {} - {}",
            color_fn(symbol),
            check.name.bold(),
            check.message
        );
    } else {
        println!("  {} {} - {}", symbol, check.name, check.message);
    }

    if let Some(fix) = &check.fix {
        if use_color {
            println!("    {} {}", "→".dimmed(), fix.dimmed());
        } else {
            println!("    → {fix}");
        }
    }
}
