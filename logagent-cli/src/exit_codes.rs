//! Exit code constants for CLI commands
//!
//! - 0: Success
//! - 1: Finished with warnings (for example files that failed to index)
//! - 2: The command could not do its job

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Completed, but something needs attention
pub const EXIT_WARNING: i32 = 1;

/// Invalid input, configuration or a fatal pipeline failure
pub const EXIT_ERROR: i32 = 2;
