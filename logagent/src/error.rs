//! Unified error handling for the LogAgent library
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! is [`LogAgentError`]. The analysis path itself never fails: backend errors
//! are turned into the rule-based fallback before they reach the caller.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the LogAgent library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LogAgentError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A path named explicitly by the caller does not exist
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// The missing path
        path: PathBuf,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source code could not be parsed into chunks
    #[error("Parse error: {0}")]
    Parse(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// AI backend call failed
    #[error("AI backend error: {0}")]
    Backend(String),

    /// Invalid glob pattern for file discovery
    #[error("Invalid file pattern '{pattern}': {message}")]
    Pattern {
        /// The offending pattern
        pattern: String,
        /// What was wrong with it
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{message}")]
    Context {
        /// Description of what was being attempted
        message: String,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for LogAgent operations
pub type Result<T> = std::result::Result<T, LogAgentError>;

impl LogAgentError {
    /// Create a `FileNotFound` error for the given path
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// True for errors raised by the AI backend
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, msg: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S: Into<String>>(self, msg: S) -> Result<T> {
        self.map_err(|e| LogAgentError::Context {
            message: msg.into(),
            source: Box::new(e),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| LogAgentError::Context {
            message: f().into(),
            source: Box::new(e),
        })
    }
}

/// Error chain formatter for detailed error reporting
pub struct ErrorChain<'a>(&'a dyn std::error::Error);

impl<'a> ErrorChain<'a> {
    /// Wrap an error for chained display
    pub fn new(error: &'a dyn std::error::Error) -> Self {
        Self(error)
    }
}

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;

        let mut current = self.0.source();
        while let Some(err) = current {
            write!(f, "\n  Caused by: {err}")?;
            current = err.source();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_display() {
        let err = LogAgentError::file_not_found("/tmp/missing.log");
        assert_eq!(err.to_string(), "File not found: /tmp/missing.log");
    }

    #[test]
    fn test_context_wraps_source() {
        let io_result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let err = io_result.context("Failed to read app.py").unwrap_err();

        assert_eq!(err.to_string(), "Failed to read app.py");
        let chain = ErrorChain::new(&err).to_string();
        assert!(chain.contains("Caused by: denied"));
    }

    #[test]
    fn test_with_context_is_lazy() {
        let ok: std::result::Result<u32, io::Error> = Ok(7);
        let value = ok
            .with_context(|| -> String { panic!("closure must not run on success") })
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_backend_error_classification() {
        assert!(LogAgentError::Backend("timeout".into()).is_backend_error());
        assert!(!LogAgentError::Storage("down".into()).is_backend_error());
    }
}
