//! Tree-sitter based chunking of Python source files
//!
//! Small files are kept whole. Larger files are split into one chunk per
//! top-level function and per top-level class (methods stay inside their
//! class), plus module-level chunks for the code in between definitions.
//! Files that fail to parse fall back to a single whole-file chunk.

use crate::error::{ErrorContext, LogAgentError, Result};
use crate::types::{file_name_of, ChunkType, CodeChunk};
use std::path::Path;
use std::sync::Mutex;
use tree_sitter::{Node, Parser, Query, QueryCursor, StreamingIterator};

/// Default size below which a file is kept as one chunk
pub const DEFAULT_SMALL_FILE_THRESHOLD: usize = crate::config::DEFAULT_SMALL_FILE_THRESHOLD;

/// Queries for top-level definitions. `@definition` is the full span and
/// `@name` the identifier.
const TOP_LEVEL_QUERIES: [(&str, ChunkType); 4] = [
    (
        "(module (function_definition name: (identifier) @name) @definition)",
        ChunkType::Function,
    ),
    (
        "(module (class_definition name: (identifier) @name) @definition)",
        ChunkType::Class,
    ),
    (
        "(module (decorated_definition definition: (function_definition name: (identifier) @name)) @definition)",
        ChunkType::Function,
    ),
    (
        "(module (decorated_definition definition: (class_definition name: (identifier) @name)) @definition)",
        ChunkType::Class,
    ),
];

/// Configuration for the chunker
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Files with fewer characters than this are kept whole
    pub small_file_threshold: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            small_file_threshold: DEFAULT_SMALL_FILE_THRESHOLD,
        }
    }
}

/// A top-level definition located in the syntax tree
#[derive(Debug, Clone)]
struct Definition {
    chunk_type: ChunkType,
    name: String,
    start_byte: usize,
    end_byte: usize,
    start_line: usize,
    end_line: usize,
}

/// Splits Python files into semantically bounded chunks
pub struct CodeChunker {
    parser: Mutex<Parser>,
    queries: Vec<(Query, ChunkType)>,
    config: ChunkerConfig,
}

impl std::fmt::Debug for CodeChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeChunker")
            .field("config", &self.config)
            .field("queries", &self.queries.len())
            .finish()
    }
}

impl CodeChunker {
    /// Create a chunker, compiling the top-level definition queries
    ///
    /// # Errors
    /// Returns `Config` if the threshold is zero, or `Parse` if the Python
    /// grammar cannot be loaded or a query does not match it.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        if config.small_file_threshold == 0 {
            return Err(LogAgentError::Config(
                "small_file_threshold must be greater than 0".to_string(),
            ));
        }

        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();

        let mut parser = Parser::new();
        parser.set_language(&language).map_err(|e| {
            LogAgentError::Parse(format!("Failed to load the Python grammar: {e}"))
        })?;

        let mut queries = Vec::with_capacity(TOP_LEVEL_QUERIES.len());
        for (source, chunk_type) in TOP_LEVEL_QUERIES {
            let query = Query::new(&language, source).map_err(|e| {
                LogAgentError::Parse(format!(
                    "Invalid tree-sitter query for {chunk_type} chunks: {e}\nQuery pattern: {source}"
                ))
            })?;
            queries.push((query, chunk_type));
        }

        tracing::debug!(
            "Initialized Python chunker with threshold {} characters",
            config.small_file_threshold
        );

        Ok(Self {
            parser: Mutex::new(parser),
            queries,
            config,
        })
    }

    /// Read a file from disk and split it
    pub fn split_file(&self, file_path: &Path) -> Result<Vec<CodeChunk>> {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        Ok(self.split(file_path, &content))
    }

    /// Split source content into ordered, non-overlapping chunks
    ///
    /// Never fails: malformed syntax degrades to a single module chunk.
    pub fn split(&self, file_path: &Path, content: &str) -> Vec<CodeChunk> {
        if content.chars().count() < self.config.small_file_threshold {
            tracing::debug!(
                "Keeping small file {} as a single chunk",
                file_path.display()
            );
            return vec![whole_file_chunk(file_path, content)];
        }

        let definitions = match self.find_definitions(file_path, content) {
            Ok(definitions) => definitions,
            Err(e) => {
                tracing::warn!(
                    "Could not parse {}: {}. Indexing it as a single module chunk.",
                    file_path.display(),
                    e
                );
                return vec![whole_file_chunk(file_path, content)];
            }
        };

        if definitions.is_empty() {
            return vec![whole_file_chunk(file_path, content)];
        }

        let chunks = assemble_chunks(file_path, content, &definitions);
        tracing::debug!(
            "Split {} into {} chunks ({} definitions)",
            file_path.display(),
            chunks.len(),
            definitions.len()
        );
        chunks
    }

    fn find_definitions(&self, file_path: &Path, content: &str) -> Result<Vec<Definition>> {
        let tree = {
            let mut parser = self
                .parser
                .lock()
                .map_err(|e| LogAgentError::Parse(format!("Parser lock poisoned: {e}")))?;
            parser.parse(content, None).ok_or_else(|| {
                LogAgentError::Parse(format!(
                    "tree-sitter returned no tree for {}",
                    file_path.display()
                ))
            })?
        };

        let root = tree.root_node();
        if root.has_error() {
            return Err(LogAgentError::Parse(format!(
                "syntax errors in {}",
                file_path.display()
            )));
        }

        let mut definitions = Vec::new();
        for (query, chunk_type) in &self.queries {
            let (Some(definition_index), Some(name_index)) = (
                query.capture_index_for_name("definition"),
                query.capture_index_for_name("name"),
            ) else {
                continue;
            };

            let mut cursor = QueryCursor::new();
            let mut matches = cursor.matches(query, root, content.as_bytes());
            while let Some(query_match) = matches.next() {
                let mut span: Option<Node> = None;
                let mut name = None;
                for capture in query_match.captures {
                    if capture.index == definition_index {
                        span = Some(capture.node);
                    } else if capture.index == name_index {
                        name = capture
                            .node
                            .utf8_text(content.as_bytes())
                            .ok()
                            .map(str::to_string);
                    }
                }

                if let (Some(node), Some(name)) = (span, name) {
                    let (start_line, end_line) = node_lines(&node);
                    definitions.push(Definition {
                        chunk_type: *chunk_type,
                        name,
                        start_byte: node.start_byte(),
                        end_byte: node.end_byte(),
                        start_line,
                        end_line,
                    });
                }
            }
        }

        definitions.sort_by_key(|d| d.start_byte);
        definitions.dedup_by_key(|d| d.start_byte);
        Ok(definitions)
    }
}

/// 1-based inclusive line span of a node. A node ending at column 0 ends on
/// the previous line.
fn node_lines(node: &Node) -> (usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    let start_line = start.row + 1;
    let mut end_line = end.row + 1;
    if end.column == 0 && end.row > start.row {
        end_line -= 1;
    }
    (start_line, end_line)
}

fn whole_file_chunk(file_path: &Path, content: &str) -> CodeChunk {
    CodeChunk {
        source_file: file_path.to_path_buf(),
        content: content.to_string(),
        chunk_type: ChunkType::Module,
        name: Some(file_name_of(file_path)),
        start_line: 1,
        end_line: content.lines().count().max(1),
        parent_name: None,
    }
}

fn assemble_chunks(file_path: &Path, content: &str, definitions: &[Definition]) -> Vec<CodeChunk> {
    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = Vec::with_capacity(definitions.len() * 2 + 1);
    let mut next_free_line = 1;

    for definition in definitions {
        if definition.start_line > next_free_line {
            if let Some(residual) =
                residual_chunk(file_path, &lines, next_free_line, definition.start_line - 1)
            {
                chunks.push(residual);
            }
        }

        chunks.push(CodeChunk {
            source_file: file_path.to_path_buf(),
            content: content[definition.start_byte..definition.end_byte].to_string(),
            chunk_type: definition.chunk_type,
            name: Some(definition.name.clone()),
            start_line: definition.start_line,
            end_line: definition.end_line,
            parent_name: None,
        });
        next_free_line = next_free_line.max(definition.end_line + 1);
    }

    if next_free_line <= lines.len() {
        if let Some(residual) = residual_chunk(file_path, &lines, next_free_line, lines.len()) {
            chunks.push(residual);
        }
    }

    chunks
}

/// Module-level chunk for lines `first..=last`, trimmed of blank lines at
/// both ends. `None` when the gap holds only whitespace.
fn residual_chunk(file_path: &Path, lines: &[&str], first: usize, last: usize) -> Option<CodeChunk> {
    let last = last.min(lines.len());
    let is_code = |line: &usize| !lines[line - 1].trim().is_empty();

    let start_line = (first..=last).find(is_code)?;
    let end_line = (start_line..=last).rev().find(is_code)?;

    Some(CodeChunk {
        source_file: file_path.to_path_buf(),
        content: lines[start_line - 1..end_line].join("\n"),
        chunk_type: ChunkType::Module,
        name: Some(file_name_of(file_path)),
        start_line,
        end_line,
        parent_name: None,
    })
}
