use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::io;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "logagent")]
#[command(version)]
#[command(about = "Explain Python error logs using the code that produced them")]
#[command(long_about = "
logagent indexes a Python codebase into semantic chunks, then takes an error
log, pulls out the lines describing the failure, finds the code most related
to them and produces advice. Advice comes from Claude when ANTHROPIC_API_KEY is
set, and from built-in rules otherwise.

Example usage:
  logagent index ./my_project                          # Check what gets indexed
  logagent analyze --codebase ./my_project --log app.log
  logagent search --codebase ./my_project \"load settings\"
  logagent doctor                                       # Check configuration and AI access
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./logagent.yaml, then ~/.config/logagent/logagent.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a codebase and report what was found
    #[command(long_about = "
Discovers Python files under PATH, splits them into functions, classes and
module-level code, and embeds every chunk. The index lives in memory, so this
command is mainly useful for checking what a codebase yields before analysis.

Exit codes:
  0 - All files indexed
  1 - Some files could not be read
  2 - Indexing failed

Examples:
  logagent index ./my_project
  logagent index ./my_project --pattern 'app/**/*.py'
")]
    Index {
        /// Directory or single file to index
        path: PathBuf,

        /// Glob pattern relative to PATH
        #[arg(long)]
        pattern: Option<String>,
    },
    /// Analyze an error log against a codebase
    #[command(long_about = "
Indexes the codebase, summarizes the error log and reports the most relevant
code together with advice. The log is read from --log or from stdin.

Examples:
  logagent analyze --codebase ./my_project --log error.log
  cat error.log | logagent analyze --codebase ./my_project --no-llm
  logagent analyze --codebase ./my_project --log error.log --format json
")]
    Analyze {
        /// Codebase directory to search for relevant code
        #[arg(long)]
        codebase: PathBuf,

        /// Log file to analyze (reads stdin when omitted)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Number of code chunks to retrieve
        #[arg(short = 'n', long)]
        num_results: Option<usize>,

        /// Minimum similarity score for retrieved chunks
        #[arg(long, allow_negative_numbers = true)]
        min_score: Option<f32>,

        /// Use rule-based advice only
        #[arg(long)]
        no_llm: bool,

        /// Send code snippets to the AI backend along with their metadata
        #[arg(long)]
        include_code: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },
    /// Search a codebase for code similar to a query
    #[command(long_about = "
Indexes the codebase and lists the chunks most similar to QUERY.

Output formats:
  table  - Formatted table (default)
  json   - JSON output for scripting
  yaml   - YAML output for scripting

Examples:
  logagent search --codebase ./my_project \"database connection\"
  logagent search --codebase ./my_project KeyError --limit 3 --format json
")]
    Search {
        /// Codebase directory to search
        #[arg(long)]
        codebase: PathBuf,

        /// Free text query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Minimum similarity score (defaults to the configured search threshold)
        #[arg(long, allow_negative_numbers = true)]
        min_score: Option<f32>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Check configuration and AI backend access
    #[command(long_about = "
Loads and validates the configuration, then checks whether the AI backend can
be used.

Exit codes:
  0 - All checks passed
  1 - Warnings found (for example rule-based analysis only)
  2 - Errors found

Example:
  logagent doctor
")]
    Doctor,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }

    pub fn is_tty() -> bool {
        io::stdout().is_terminal()
    }

    pub fn should_use_color() -> bool {
        Self::is_tty() && std::env::var("NO_COLOR").is_err()
    }

    /// True when the command writes structured data to stdout
    pub fn is_machine_readable(&self) -> bool {
        match &self.command {
            Some(Commands::Analyze { format, .. }) => *format == ReportFormat::Json,
            Some(Commands::Search { format, .. }) => *format != OutputFormat::Table,
            _ => false,
        }
    }
}
