//! Error handling for the LogAgent CLI
//!
//! Library errors are wrapped together with the exit code the command should
//! finish with, keeping the source chain for display.

use crate::exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use std::error::Error;
use std::fmt;

/// CLI-specific result type that preserves error information
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type carrying a message, an exit code and the underlying cause
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: i32,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    /// Create a new CLI error with a message and exit code
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// Create a CLI error from another error with a specific exit code
    pub fn from_error<E: Error + Send + Sync + 'static>(error: E, exit_code: i32) -> Self {
        Self {
            message: error.to_string(),
            exit_code,
            source: Some(Box::new(error)),
        }
    }

    /// Create a CLI error from an `anyhow` error, keeping its chain in the message
    pub fn from_anyhow(error: anyhow::Error, exit_code: i32) -> Self {
        let message = error
            .chain()
            .map(|cause| cause.to_string())
            .collect::<Vec<_>>()
            .join("\n  Caused by: ");
        Self::new(message, exit_code)
    }

    /// Exit code 2
    pub fn fatal<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self::from_error(error, EXIT_ERROR)
    }

    /// Get the full error chain as a formatted string
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();

        let mut current_source = self.source();
        while let Some(err) = current_source {
            result.push_str(&format!("\n  Caused by: {err}"));
            current_source = err.source();
        }

        result
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Extension trait for converting results to CLI results
pub trait IntoCliResult<T> {
    fn cli_error(self, exit_code: i32) -> CliResult<T>;
    fn cli_fatal_error(self) -> CliResult<T>;
}

impl<T, E: Error + Send + Sync + 'static> IntoCliResult<T> for Result<T, E> {
    fn cli_error(self, exit_code: i32) -> CliResult<T> {
        self.map_err(|e| CliError::from_error(e, exit_code))
    }

    fn cli_fatal_error(self) -> CliResult<T> {
        self.map_err(CliError::fatal)
    }
}

/// Convert a command result to an exit code, printing the full error chain on failure
pub fn handle_cli_result(result: CliResult<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e.full_chain());
            if e.exit_code == EXIT_SUCCESS {
                EXIT_ERROR
            } else {
                e.exit_code
            }
        }
    }
}
