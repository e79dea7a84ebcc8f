//! Traits for source readers.

use crate::ast::Module;

/// Error that can occur when reading source code into the syntax tree.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("parse error: {0}")]
    Parse(String),

    /// The source uses a construct the writer has no rendering rule for.
    #[error("line {line}: unsupported node kind `{kind}`")]
    UnsupportedNodeKind { kind: String, line: usize },

    #[error("line {line}: {node} missing {field}")]
    MissingField {
        node: String,
        field: &'static str,
        line: usize,
    },
}

/// A reader parses source code into the Python syntax tree.
pub trait Reader: Send + Sync {
    /// Language identifier (e.g., "python").
    fn language(&self) -> &'static str;

    /// File extensions this reader handles (e.g., &["py"]).
    fn extensions(&self) -> &'static [&'static str];

    /// Parse source code into a module.
    fn read(&self, source: &str) -> Result<Module, ReadError>;
}
