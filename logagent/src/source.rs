//! Source file discovery for indexing

use crate::error::{ErrorContext, LogAgentError, Result};
use crate::utils::SemanticUtils;
use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A source file loaded into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path the content was read from
    pub path: PathBuf,
    /// Full file content
    pub content: String,
}

impl SourceFile {
    /// Wrap already-loaded content
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::new(path, content))
    }
}

/// Enumerate files under `root` that match `pattern`
///
/// `root` may also be a single file, which is returned as-is. Paths inside
/// hidden, cache, build and virtualenv directories are skipped. The result is
/// sorted so repeated runs visit files in the same order.
pub fn discover_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(LogAgentError::file_not_found(root));
    }
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let full_pattern = format!(
        "{}/{}",
        Pattern::escape(&root.to_string_lossy()),
        pattern.trim_start_matches("./")
    );

    let entries = glob(&full_pattern).map_err(|e| LogAgentError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                if SemanticUtils::should_index_file(relative) {
                    files.push(path);
                } else {
                    debug!("Skipping excluded path: {}", path.display());
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Error processing glob entry: {}", e),
        }
    }

    files.sort();
    files.dedup();
    debug!(
        "Discovered {} files under {} matching '{}'",
        files.len(),
        root.display(),
        pattern
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_python_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app.py", "x = 1");
        write(temp.path(), "pkg/util.py", "y = 2");
        write(temp.path(), "README.md", "# readme");

        let files = discover_files(temp.path(), "**/*.py").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "py"));
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_discover_skips_excluded_directories() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "main.py", "pass");
        write(temp.path(), "__pycache__/main.py", "pass");
        write(temp.path(), ".venv/lib/site.py", "pass");
        write(temp.path(), "venv/lib/other.py", "pass");

        let files = discover_files(temp.path(), "**/*.py").unwrap();
        assert_eq!(files, vec![temp.path().join("main.py")]);
    }

    #[test]
    fn test_discover_keeps_build_and_env_packages() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app/build/steps.py", "pass");
        write(temp.path(), "env/config.py", "pass");

        let files = discover_files(temp.path(), "**/*.py").unwrap();
        assert_eq!(
            files,
            vec![
                temp.path().join("app/build/steps.py"),
                temp.path().join("env/config.py"),
            ]
        );
    }

    #[test]
    fn test_discover_single_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "only.py", "pass");

        let path = temp.path().join("only.py");
        assert_eq!(discover_files(&path, "**/*.py").unwrap(), vec![path]);
    }

    #[test]
    fn test_discover_missing_root() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let err = discover_files(&missing, "**/*.py").unwrap_err();
        assert!(matches!(err, LogAgentError::FileNotFound { .. }));
    }

    #[test]
    fn test_discover_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let err = discover_files(temp.path(), "***/[.py").unwrap_err();
        assert!(matches!(err, LogAgentError::Pattern { .. }));
    }

    #[test]
    fn test_source_file_read() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "print('hi')\n");

        let source = SourceFile::read(&temp.path().join("a.py")).unwrap();
        assert_eq!(source.content, "print('hi')\n");
        assert!(SourceFile::read(&temp.path().join("missing.py")).is_err());
    }
}
