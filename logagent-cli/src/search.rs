use crate::cli::{Cli, OutputFormat};
use crate::error::{CliResult, IntoCliResult};
use crate::exit_codes::EXIT_SUCCESS;
use crate::setup::{build_agent, index_for_query};
use logagent::{LogAgentConfig, SearchResult};
use std::path::Path;
use tabled::{
    settings::{object::Rows, Alignment, Color, Modify, Style},
    Table, Tabled,
};

const EXCERPT_CHARS: usize = 60;

#[derive(Tabled)]
struct SearchResultRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Type")]
    chunk_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Excerpt")]
    excerpt: String,
}

pub async fn run_search_command(
    config: LogAgentConfig,
    codebase: &Path,
    query: &str,
    limit: usize,
    min_score: Option<f32>,
    format: OutputFormat,
) -> CliResult<i32> {
    let min_score = min_score.unwrap_or(config.search_min_score);
    let agent = build_agent(config).await?;
    index_for_query(&agent, codebase).await?;

    let results = agent
        .search_code(query, limit, min_score)
        .await
        .cli_fatal_error()?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&results).cli_fatal_error()?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&results).cli_fatal_error()?;
            print!("{yaml}");
        }
        OutputFormat::Table => display_table(&results),
    }
    Ok(EXIT_SUCCESS)
}

fn display_table(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No matching code found.");
        return;
    }

    let is_tty = Cli::should_use_color();
    println!("{}", build_table(results, is_tty));

    if is_tty {
        println!();
        println!("{} results found", results.len());
    }
}

fn build_table(results: &[SearchResult], highlight_header: bool) -> Table {
    let rows: Vec<SearchResultRow> = results.iter().map(to_row).collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    if highlight_header {
        table.with(Modify::new(Rows::first()).with(Color::FG_BRIGHT_CYAN));
    }
    table.with(Modify::new(Rows::new(1..)).with(Alignment::left()));
    table
}

fn to_row(result: &SearchResult) -> SearchResultRow {
    let chunk = &result.chunk;
    SearchResultRow {
        rank: result.rank,
        score: format!("{:.3}", result.similarity_score),
        chunk_type: chunk.chunk_type.to_string(),
        name: chunk.display_name(),
        location: format!(
            "{}:{}-{}",
            chunk.source_file.display(),
            chunk.start_line,
            chunk.end_line
        ),
        excerpt: excerpt(&chunk.content),
    }
}

/// First non-blank line of `content`, shortened for a table cell
pub fn excerpt(content: &str) -> String {
    let line = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    if line.chars().count() > EXCERPT_CHARS {
        let short: String = line.chars().take(EXCERPT_CHARS - 3).collect();
        format!("{short}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logagent::{ChunkType, CodeChunk};
    use std::path::PathBuf;

    #[test]
    fn test_excerpt_takes_first_code_line() {
        assert_eq!(excerpt("\n\n    def main():\n        pass"), "def main():");
        assert_eq!(excerpt(""), "");
    }

    #[test]
    fn test_excerpt_truncates_long_lines() {
        let long = "x".repeat(100);
        let short = excerpt(&long);
        assert_eq!(short.chars().count(), EXCERPT_CHARS);
        assert!(short.ends_with("..."));
    }

    fn sample_result() -> SearchResult {
        let chunk = CodeChunk {
            source_file: PathBuf::from("app/db.py"),
            content: "    def send(self, payload):\n        return 1".to_string(),
            chunk_type: ChunkType::Method,
            name: Some("send".to_string()),
            start_line: 7,
            end_line: 8,
            parent_name: Some("Connection".to_string()),
        };
        SearchResult {
            id: chunk.id(),
            chunk,
            similarity_score: 0.51234,
            rank: 2,
        }
    }

    #[test]
    fn test_row_formatting() {
        let row = to_row(&sample_result());
        assert_eq!(row.rank, 2);
        assert_eq!(row.score, "0.512");
        assert_eq!(row.location, "app/db.py:7-8");
        assert_eq!(row.excerpt, "def send(self, payload):");
    }

    #[test]
    fn test_table_header_highlight() {
        let results = vec![sample_result()];

        let plain = build_table(&results, false).to_string();
        assert!(plain.contains("Rank"));
        assert!(plain.contains("app/db.py:7-8"));
        assert!(!plain.contains('\u{1b}'));

        let colored = build_table(&results, true).to_string();
        let header = colored.lines().find(|line| line.contains("Rank")).unwrap();
        assert!(header.contains('\u{1b}'));
        assert!(!colored
            .lines()
            .find(|line| line.contains("app/db.py"))
            .unwrap()
            .contains('\u{1b}'));
    }
}
