//! Errors and diagnostics.
//!
//! Fatal conditions abort the render of one file and surface as `Err`.
//! Recoverable ones degrade a single fragment and are reported as
//! [`Diagnostic`]s next to the rendered text.

use crate::ops::OpKind;
use crate::traits::ReadError;
use serde::Serialize;

/// Raw text that cannot be turned into a token stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: EOF in multi-line string")]
    EofInString { line: usize },

    #[error("line {line}: EOF in multi-line statement")]
    EofInStatement { line: usize },

    #[error("line {line}: unindent does not match any outer indentation level")]
    InconsistentDedent { line: usize },

    #[error("line {line}, column {column}: unexpected character {ch:?}")]
    UnexpectedChar { ch: char, line: usize, column: usize },

    /// A supplied token does not land on any source line.
    #[error("token on row {row} lies outside the {lines} source lines")]
    TokenOutOfRange { row: usize, lines: usize },
}

/// Fatal error while rendering a syntax tree.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Lex(#[from] LexError),

    /// Only raised when `RenderOptions::strict_operators` is set.
    #[error("line {line}: operator `{op}` has no spelling")]
    UnsupportedOperator { op: OpKind, line: usize },
}

/// Any error of the tokenize → read → render pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A literal's line had no string token left to consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: no string token left to consume")]
pub struct StringQueueUnderflow {
    pub line: usize,
}

/// Kind of degraded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// The AST value was re-quoted instead of the source spelling.
    StringQueueUnderflow,
    /// Comparators were rendered without operators.
    MalformedComparisonShape,
    /// A `<Kind>` placeholder stands in for an operator.
    UnsupportedOperator,
}

/// Recoverable problem found while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: Option<usize>,
    pub message: String,
}
