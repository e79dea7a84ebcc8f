//! Python to CoffeeScript transliteration.
//!
//! `py2coffee` renders a Python syntax tree as CoffeeScript-flavoured text
//! while keeping what the tree throws away: blank lines, standalone and
//! trailing comments, and the exact spelling of string literals. The output
//! is a starting point for a human port, not a compiler result.
//!
//! # Architecture
//!
//! ```text
//! source ──> tokenize ──> Vec<TokenRecord> ──┐
//!    │                                        ├─> TokenSync ──┐
//!    └─────> input::python ──> ast::Module ───┴───────────────┴─> CoffeeWriter ─> text
//! ```
//!
//! The writer walks the tree in source order and asks the token index
//! ([`sync::TokenSync`]) for the comment and blank lines above each
//! statement, the comment trailing it, and the source text of each string
//! literal.
//!
//! # Example
//!
//! ```ignore
//! let coffee = py2coffee::translate("def f(a, b=1):\n    return a+b\n")?;
//! assert_eq!(coffee, "f = (a, b=1) ->\n    return a+b\n");
//! ```
//!
//! # Degraded output
//!
//! Some problems only spoil one fragment. Those are returned as
//! [`Diagnostic`]s next to the text (see [`translate_with`]) and logged with
//! `tracing::warn!`; install a subscriber to see them.

pub mod ast;
pub mod error;
pub mod ops;
pub mod sync;
pub mod tokenize;
pub mod traits;

pub mod input;
pub mod output;

// Re-exports: syntax tree
pub use ast::{Expr, Module, Stmt};

// Re-exports: errors
pub use error::{Diagnostic, DiagnosticKind, Error, LexError, RenderError, StringQueueUnderflow};

// Re-exports: traits
pub use traits::{ReadError, Reader};

// Re-exports: token index and writer
pub use output::{CoffeeWriter, RenderOptions, Rendered, render, render_with};
pub use sync::TokenSync;
pub use tokenize::{TokenKind, TokenRecord, tokenize};

// Re-exports: built-in reader
#[cfg(feature = "read-python")]
pub use input::python::PythonReader;
#[cfg(feature = "read-python")]
pub use input::read_python;

/// Tokenize, read and render one Python source with default options.
#[cfg(feature = "read-python")]
pub fn translate(source: &str) -> Result<String, Error> {
    Ok(translate_with(source, &RenderOptions::default())?.text)
}

/// Tokenize, read and render one Python source.
#[cfg(feature = "read-python")]
pub fn translate_with(source: &str, options: &RenderOptions) -> Result<Rendered, Error> {
    let tokens = tokenize(source)?;
    let module = read_python(source)?;
    Ok(render_with(&module, source, &tokens, options)?)
}

/// Translate many in-memory sources in parallel.
///
/// Each entry is `(name, source)`; results come back in input order, paired
/// with their name. A failure only affects its own slot.
#[cfg(feature = "read-python")]
pub fn translate_batch(
    files: &[(&str, &str)],
    options: &RenderOptions,
) -> Vec<(String, Result<Rendered, Error>)> {
    use rayon::prelude::*;

    files
        .par_iter()
        .map(|(name, source)| {
            let result = translate_with(source, options);
            if let Err(err) = &result {
                tracing::debug!(file = %name, error = %err, "translation failed");
            }
            (name.to_string(), result)
        })
        .collect()
}
