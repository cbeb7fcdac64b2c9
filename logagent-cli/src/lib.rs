//! LogAgent CLI Library
//!
//! Command-line definitions, command implementations and exit codes for the
//! `logagent` binary.

/// Command-line interface definitions and argument parsing
pub mod cli;
/// Exit codes used by the CLI application
pub mod exit_codes;
/// CLI error type and exit code mapping
pub mod error;
/// Configuration loading and agent construction
pub mod setup;
/// The `index` command
pub mod index;
/// The `analyze` command and text report
pub mod analyze;
/// The `search` command
pub mod search;
/// The `doctor` command
pub mod doctor;
