//! Extraction of the failure-describing lines from a raw log

/// Substrings that mark a log line as describing a failure
pub const ERROR_MARKERS: [&str; 5] = ["Error:", "Exception:", "Traceback", "ERROR", "FATAL"];

/// Reduces a raw log to the lines that describe what went wrong
#[derive(Debug, Clone)]
pub struct ErrorSummarizer {
    max_lines: usize,
    fallback_lines: usize,
    case_insensitive: bool,
}

impl Default for ErrorSummarizer {
    fn default() -> Self {
        Self {
            max_lines: 5,
            fallback_lines: 3,
            case_insensitive: false,
        }
    }
}

impl ErrorSummarizer {
    /// Create a summarizer with explicit limits
    pub fn new(max_lines: usize, fallback_lines: usize) -> Self {
        Self {
            max_lines,
            fallback_lines,
            case_insensitive: false,
        }
    }

    /// Match markers regardless of case
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    /// Build a summarizer from pipeline configuration
    pub fn from_config(config: &crate::config::LogAgentConfig) -> Self {
        Self::new(config.summary_max_lines, config.summary_fallback_lines)
            .case_insensitive(config.summary_case_insensitive)
    }

    /// Summarize a raw log
    ///
    /// Lines containing an error marker are kept, trimmed, together with the
    /// indented non-blank lines directly below them. Collection stops after
    /// `max_lines`. A log without markers yields its first `fallback_lines`
    /// lines.
    pub fn summarize(&self, raw_log: &str) -> String {
        let lines: Vec<&str> = raw_log.lines().collect();
        let mut collected: Vec<&str> = Vec::new();
        let mut index = 0;

        while index < lines.len() && collected.len() < self.max_lines {
            let line = lines[index];
            index += 1;
            if !self.is_error_line(line) {
                continue;
            }

            collected.push(line.trim());
            while index < lines.len() && collected.len() < self.max_lines {
                let next = lines[index];
                if !is_continuation(next) || self.is_error_line(next) {
                    break;
                }
                collected.push(next.trim_end());
                index += 1;
            }
        }

        if collected.is_empty() {
            return raw_log
                .trim()
                .lines()
                .take(self.fallback_lines)
                .collect::<Vec<_>>()
                .join("\n");
        }

        collected.join("\n")
    }

    fn is_error_line(&self, line: &str) -> bool {
        if self.case_insensitive {
            let lowered = line.to_lowercase();
            ERROR_MARKERS
                .iter()
                .any(|marker| lowered.contains(&marker.to_lowercase()))
        } else {
            ERROR_MARKERS.iter().any(|marker| line.contains(marker))
        }
    }
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(char::is_whitespace) && !line.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_error_line() {
        let summarizer = ErrorSummarizer::default();
        assert_eq!(
            summarizer.summarize("INFO ok\nERROR: X\nINFO done"),
            "ERROR: X"
        );
    }

    #[test]
    fn test_mixed_log_drops_info_lines() {
        let log = "INFO startup\nINFO ready\nERROR: Connection failed\nTraceback (most recent call last):\nConnectionError: timeout\nINFO cleanup";
        let summary = ErrorSummarizer::default().summarize(log);

        assert_eq!(
            summary,
            "ERROR: Connection failed\nTraceback (most recent call last):\nConnectionError: timeout"
        );
        assert!(!summary.contains("INFO"));
    }

    #[test]
    fn test_indented_continuation_lines_follow_marker() {
        let log = "Traceback (most recent call last):\n  File \"app.py\", line 3, in <module>\n    main()\nKeyError: 'x'\nnext request";
        let summary = ErrorSummarizer::default().summarize(log);

        assert_eq!(
            summary,
            "Traceback (most recent call last):\n  File \"app.py\", line 3, in <module>\n    main()\nKeyError: 'x'"
        );
    }

    #[test]
    fn test_max_lines_cap() {
        let log = (0..10)
            .map(|i| format!("ERROR: failure {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let summary = ErrorSummarizer::default().summarize(&log);

        assert_eq!(summary.lines().count(), 5);
        assert!(summary.starts_with("ERROR: failure 0"));
        assert!(summary.ends_with("ERROR: failure 4"));
    }

    #[test]
    fn test_continuations_count_toward_cap() {
        let log = "Traceback\n  a\n  b\n  c\n  d\n  e\n  f";
        let summary = ErrorSummarizer::new(3, 3).summarize(log);
        assert_eq!(summary, "Traceback\n  a\n  b");
    }

    #[test]
    fn test_fallback_without_markers() {
        let log = "\n\nstarting\nloading\nworking\nstopping\n";
        assert_eq!(
            ErrorSummarizer::default().summarize(log),
            "starting\nloading\nworking"
        );
    }

    #[test]
    fn test_case_sensitivity() {
        let log = "info\nerror: lowercase failure";
        assert_eq!(ErrorSummarizer::default().summarize(log), "info\nerror: lowercase failure");

        let insensitive = ErrorSummarizer::default().case_insensitive(true);
        assert_eq!(insensitive.summarize(log), "error: lowercase failure");
    }

    #[test]
    fn test_matched_lines_are_trimmed() {
        let summary = ErrorSummarizer::default().summarize("   FATAL disk full   \nok");
        assert_eq!(summary, "FATAL disk full");
    }

    #[test]
    fn test_empty_log() {
        assert_eq!(ErrorSummarizer::default().summarize(""), "");
    }

    proptest! {
        #[test]
        fn prop_summarize_is_deterministic(log in "[A-Za-z:\\n ]{0,200}") {
            let summarizer = ErrorSummarizer::default();
            prop_assert_eq!(summarizer.summarize(&log), summarizer.summarize(&log));
        }

        #[test]
        fn prop_summary_respects_cap(lines in proptest::collection::vec("(ERROR|INFO|  at) [a-z]{1,10}", 0..30)) {
            let log = lines.join("\n");
            let summary = ErrorSummarizer::default().summarize(&log);
            prop_assert!(summary.lines().count() <= 5);
        }
    }
}
