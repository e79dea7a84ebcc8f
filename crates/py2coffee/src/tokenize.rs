//! Python tokenizer.
//!
//! Produces the flat token stream the token index is built from. Lexemes
//! come from a `logos` lexer; a layout pass over them adds the conventions
//! of CPython's `tokenize` module:
//!
//! - rows are 1-based, columns are 0-based byte offsets into the line
//! - a blank or comment-only line yields `Nl` (after the `Comment`), never
//!   `Indent`/`Dedent`
//! - line ends inside brackets yield `Nl`; the end of a logical line `Newline`
//! - a string token spanning lines carries every physical line in `raw_text`
//! - trailing `Dedent`s and `EndMarker` sit on row `lines + 1`

use crate::error::LexError;
use logos::Logos;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Name,
    Number,
    String,
    Op,
    Comment,
    /// Non-logical line break: blank lines, comment lines, breaks inside brackets.
    Nl,
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// One classified lexical unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub kind: TokenKind,
    /// The token's own text.
    pub text: String,
    /// The physical line(s) the token was found on.
    pub raw_text: String,
    pub start: Position,
    pub end: Position,
}

impl TokenRecord {
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        raw_text: impl Into<String>,
        start: Position,
        end: Position,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            raw_text: raw_text.into(),
            start,
            end,
        }
    }
}

const TAB_SIZE: usize = 8;

/// Lexemes as logos sees them. Layout (indentation, logical lines, bracket
/// nesting) is layered on top by [`Layout`].
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\x0c]+")]
#[logos(subpattern prefix = r"([rRuUbBfF]|[bB][rR]|[rR][bB]|[fF][rR]|[rR][fF])?")]
#[logos(subpattern escape = r"\\(.|\r?\n)")]
enum RawToken {
    #[regex(r"#[^\r\n]*")]
    Comment,

    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"\\\r?\n")]
    LineContinuation,

    #[regex(r"[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*")]
    Name,

    #[regex(r"0[xX][0-9a-fA-F_]+[lL]?")]
    #[regex(r"0[oO][0-7_]+[lL]?")]
    #[regex(r"0[bB][01_]+[lL]?")]
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9][0-9_]*)?[jJlL]?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9][0-9_]*)?[jJ]?")]
    Number,

    // A backslash-newline inside a single-quoted literal continues it.
    #[regex(r"(?&prefix)'([^'\\\r\n]|(?&escape))*'")]
    #[regex(r#"(?&prefix)"([^"\\\r\n]|(?&escape))*""#)]
    #[regex(r"(?&prefix)'''([^'\\]|(?&escape)|'([^'\\]|(?&escape))|''([^'\\]|(?&escape)))*'''")]
    #[regex(r#"(?&prefix)"""([^"\\]|(?&escape)|"([^"\\]|(?&escape))|""([^"\\]|(?&escape)))*""""#)]
    String,

    /// Single-quoted literal cut off by the end of its line.
    #[regex(r"(?&prefix)'([^'\\\r\n]|(?&escape))*", priority = 1)]
    #[regex(r#"(?&prefix)"([^"\\\r\n]|(?&escape))*"#, priority = 1)]
    UnterminatedString,

    /// Triple-quoted literal still open at end of input.
    #[regex(r"(?&prefix)'''([^'\\]|(?&escape)|'([^'\\]|(?&escape))|''([^'\\]|(?&escape)))*", priority = 1)]
    #[regex(r#"(?&prefix)"""([^"\\]|(?&escape)|"([^"\\]|(?&escape))|""([^"\\]|(?&escape)))*"#, priority = 1)]
    UnterminatedTriple,

    #[token("(")]
    #[token("[")]
    #[token("{")]
    Open,

    #[token(")")]
    #[token("]")]
    #[token("}")]
    Close,

    #[token("**=")]
    #[token("//=")]
    #[token(">>=")]
    #[token("<<=")]
    #[token("...")]
    #[token("!=")]
    #[token("%=")]
    #[token("&=")]
    #[token("**")]
    #[token("*=")]
    #[token("+=")]
    #[token("-=")]
    #[token("->")]
    #[token("//")]
    #[token("/=")]
    #[token(":=")]
    #[token("<<")]
    #[token("<=")]
    #[token("<>")]
    #[token("==")]
    #[token(">=")]
    #[token(">>")]
    #[token("@=")]
    #[token("^=")]
    #[token("|=")]
    #[token("%")]
    #[token("&")]
    #[token("*")]
    #[token("+")]
    #[token(",")]
    #[token("-")]
    #[token(".")]
    #[token("/")]
    #[token(":")]
    #[token(";")]
    #[token("<")]
    #[token("=")]
    #[token(">")]
    #[token("@")]
    #[token("^")]
    #[token("|")]
    #[token("~")]
    Op,
}

/// Tokenize Python source.
pub fn tokenize(source: &str) -> Result<Vec<TokenRecord>, LexError> {
    Layout::new(source).run()
}

/// Turns the raw lexeme stream into logical lines with `Indent`/`Dedent`.
struct Layout<'a> {
    source: &'a str,
    lines: Vec<&'a str>,
    /// Byte offset where each line starts.
    line_starts: Vec<usize>,
    tokens: Vec<TokenRecord>,
    /// Indentation columns of the enclosing blocks; the implicit 0 is not stored.
    indents: Vec<usize>,
    paren_depth: usize,
    /// No token other than a comment has been seen on this logical line.
    at_line_start: bool,
    /// The last lexeme was a backslash-newline.
    continued: bool,
}

impl<'a> Layout<'a> {
    fn new(source: &'a str) -> Self {
        let lines: Vec<&str> = source.split_inclusive('\n').collect();
        let line_starts = lines
            .iter()
            .scan(0, |offset, line| {
                let start = *offset;
                *offset += line.len();
                Some(start)
            })
            .collect();
        Self {
            source,
            lines,
            line_starts,
            tokens: Vec::new(),
            indents: Vec::new(),
            paren_depth: 0,
            at_line_start: true,
            continued: false,
        }
    }

    fn run(mut self) -> Result<Vec<TokenRecord>, LexError> {
        let mut lexer = RawToken::lexer(self.source);
        while let Some(raw) = lexer.next() {
            let span = lexer.span();
            let raw = raw.map_err(|()| self.unexpected(span.start))?;
            self.lexeme(raw, span)?;
        }
        self.finish()?;
        Ok(self.tokens)
    }

    /// 1-based row and byte column of a source offset.
    fn position(&self, offset: usize) -> Position {
        let row = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .max(1);
        let line_start = self.line_starts.get(row - 1).copied().unwrap_or(0);
        Position::new(row, offset - line_start)
    }

    /// Physical lines `first..=last` as one slice.
    fn raw_lines(&self, first: usize, last: usize) -> &'a str {
        let source = self.source;
        let start = self
            .line_starts
            .get(first - 1)
            .copied()
            .unwrap_or(source.len());
        let end = self.line_starts.get(last).copied().unwrap_or(source.len());
        &source[start..end]
    }

    fn record(&mut self, kind: TokenKind, text: &str, raw: &str, start: Position, end: Position) {
        self.tokens
            .push(TokenRecord::new(kind, text, raw, start, end));
    }

    fn unexpected(&self, offset: usize) -> LexError {
        let at = self.position(offset);
        LexError::UnexpectedChar {
            ch: self.source[offset..].chars().next().unwrap_or('\0'),
            line: at.row,
            column: at.col,
        }
    }

    fn lexeme(&mut self, raw: RawToken, span: Range<usize>) -> Result<(), LexError> {
        let source = self.source;
        let text = &source[span.clone()];
        let start = self.position(span.start);

        let kind = match raw {
            RawToken::LineContinuation => {
                self.continued = true;
                return Ok(());
            }
            RawToken::UnterminatedString => {
                return Err(LexError::UnterminatedString { line: start.row });
            }
            RawToken::UnterminatedTriple => {
                return Err(LexError::EofInString { line: start.row });
            }
            RawToken::Newline => {
                let kind = if self.paren_depth > 0 || self.at_line_start {
                    TokenKind::Nl
                } else {
                    TokenKind::Newline
                };
                // The line end, not the start of the next line.
                let end = Position::new(start.row, start.col + text.len());
                let line = self.raw_lines(start.row, start.row);
                self.record(kind, text, line, start, end);
                if kind == TokenKind::Newline {
                    self.at_line_start = true;
                }
                self.continued = false;
                return Ok(());
            }
            RawToken::Comment => TokenKind::Comment,
            RawToken::Name => TokenKind::Name,
            RawToken::Number => TokenKind::Number,
            RawToken::String => TokenKind::String,
            RawToken::Open | RawToken::Close | RawToken::Op => TokenKind::Op,
        };

        if kind != TokenKind::Comment && self.at_line_start {
            self.indentation(start.row)?;
            self.at_line_start = false;
        }
        match raw {
            RawToken::Open => self.paren_depth += 1,
            RawToken::Close => self.paren_depth = self.paren_depth.saturating_sub(1),
            _ => {}
        }

        let end = self.position(span.end);
        let lines = self.raw_lines(start.row, end.row);
        self.record(kind, text, lines, start, end);
        self.continued = false;
        Ok(())
    }

    /// `Indent`/`Dedent` before the first real token of a logical line.
    fn indentation(&mut self, row: usize) -> Result<(), LexError> {
        let line = self.lines.get(row - 1).copied().unwrap_or("");
        let (column, offset) = measure_indent(line);
        let at = Position::new(row, offset);

        if column > self.indents.last().copied().unwrap_or(0) {
            self.indents.push(column);
            self.record(TokenKind::Indent, &line[..offset], line, Position::new(row, 0), at);
        }
        while column < self.indents.last().copied().unwrap_or(0) {
            if column != 0 && !self.indents.contains(&column) {
                return Err(LexError::InconsistentDedent { line: row });
            }
            self.indents.pop();
            self.record(TokenKind::Dedent, "", line, at, at);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), LexError> {
        let line_count = self.lines.len();
        if self.paren_depth > 0 || self.continued {
            return Err(LexError::EofInStatement { line: line_count });
        }

        if let Some(last) = self.lines.last().copied()
            && !last.ends_with('\n')
        {
            let kind = if self.at_line_start {
                TokenKind::Nl
            } else {
                TokenKind::Newline
            };
            let end = Position::new(line_count, last.len());
            self.record(kind, "", last, end, end);
        }

        let eof = Position::new(line_count + 1, 0);
        for _ in 0..self.indents.len() {
            self.record(TokenKind::Dedent, "", "", eof, eof);
        }
        self.indents.clear();
        self.record(TokenKind::EndMarker, "", "", eof, eof);
        Ok(())
    }
}

/// Indentation column (tabs to the next multiple of 8) and byte offset of
/// the first non-blank character.
fn measure_indent(line: &str) -> (usize, usize) {
    let mut column = 0;
    for (offset, ch) in line.char_indices() {
        match ch {
            ' ' => column += 1,
            '\t' => column = (column / TAB_SIZE + 1) * TAB_SIZE,
            '\x0c' => column = 0,
            _ => return (column, offset),
        }
    }
    (column, line.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_statement() {
        use TokenKind::*;
        assert_eq!(
            kinds("x = 1\n"),
            vec![Name, Op, Number, Newline, EndMarker]
        );
    }

    #[test]
    fn blank_and_comment_lines_yield_nl() {
        let tokens = tokenize("x = 1\n\n# note\ny = 2\n").unwrap();
        let line2: Vec<_> = tokens.iter().filter(|t| t.start.row == 2).collect();
        assert_eq!(line2.len(), 1);
        assert_eq!(line2[0].kind, TokenKind::Nl);

        let line3: Vec<_> = tokens.iter().filter(|t| t.start.row == 3).collect();
        assert_eq!(line3[0].kind, TokenKind::Comment);
        assert_eq!(line3[0].text, "# note");
        assert_eq!(line3[0].raw_text, "# note\n");
        assert_eq!(line3[1].kind, TokenKind::Nl);
    }

    #[test]
    fn indentation_produces_indent_and_dedent() {
        use TokenKind::*;
        let tokens = tokenize("if x:\n    y\nz\n").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![Name, Name, Op, Newline, Indent, Name, Newline, Dedent, Name, Newline, EndMarker]
        );
        let dedent = tokens.iter().find(|t| t.kind == Dedent).unwrap();
        assert_eq!(dedent.start.row, 3);
    }

    #[test]
    fn trailing_dedents_and_endmarker_sit_past_last_line() {
        let tokens = tokenize("def f():\n    pass\n").unwrap();
        let tail: Vec<_> = tokens.iter().rev().take(2).collect();
        assert_eq!(tail[0].kind, TokenKind::EndMarker);
        assert_eq!(tail[0].start.row, 3);
        assert_eq!(tail[1].kind, TokenKind::Dedent);
        assert_eq!(tail[1].start.row, 3);
    }

    #[test]
    fn comment_inside_indented_block_keeps_raw_line() {
        let tokens = tokenize("if x:\n    # inner\n    y\n").unwrap();
        let comment = tokens.iter().find(|t| t.kind == TokenKind::Comment).unwrap();
        assert_eq!(comment.raw_text, "    # inner\n");
        assert_eq!(comment.start, Position::new(2, 4));
    }

    #[test]
    fn multi_line_string_spans_rows() {
        let tokens = tokenize("s = '''a\nb\nc'''\n").unwrap();
        let string = tokens.iter().find(|t| t.kind == TokenKind::String).unwrap();
        assert_eq!(string.text, "'''a\nb\nc'''");
        assert_eq!(string.start, Position::new(1, 4));
        assert_eq!(string.end, Position::new(3, 4));
        assert_eq!(string.raw_text, "s = '''a\nb\nc'''\n");
    }

    #[test]
    fn prefixed_and_escaped_strings() {
        let tokens = tokenize("x = rb'\\d' + f\"{y}\" + 'it\\'s'\n").unwrap();
        let strings: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::String)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(strings, vec!["rb'\\d'", "f\"{y}\"", "'it\\'s'"]);
    }

    #[test]
    fn brackets_turn_line_ends_into_nl() {
        use TokenKind::*;
        let tokens = tokenize("x = (1,\n     2)\n").unwrap();
        let line_ends: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t.kind, Nl | Newline))
            .map(|t| (t.kind, t.start.row))
            .collect();
        assert_eq!(line_ends, vec![(Nl, 1), (Newline, 2)]);
    }

    #[test]
    fn backslash_continues_line() {
        use TokenKind::*;
        assert_eq!(
            kinds("x = 1 + \\\n    2\n"),
            vec![Name, Op, Number, Op, Number, Newline, EndMarker]
        );
    }

    #[test]
    fn backslash_newline_continues_single_quoted_literal() {
        let tokens = tokenize("s = 'a\\\nb'\n").unwrap();
        let string = tokens.iter().find(|t| t.kind == TokenKind::String).unwrap();
        assert_eq!(string.text, "'a\\\nb'");
        assert_eq!(string.start, Position::new(1, 4));
        assert_eq!(string.end, Position::new(2, 2));
    }

    #[test]
    fn crlf_line_endings() {
        use TokenKind::*;
        let tokens = tokenize("x = 1\r\n\r\ny\r\n").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![Name, Op, Number, Newline, Nl, Name, Newline, EndMarker]);
        assert_eq!(tokens[3].text, "\r\n");
        assert_eq!(tokens[3].end, Position::new(1, 7));
    }

    #[test]
    fn only_known_prefixes_start_strings() {
        use TokenKind::*;
        let tokens = tokenize("x = Br'a' + print'b'\n").unwrap();
        let pairs: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(t.kind, Name | String))
            .map(|t| (t.kind, t.text.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![(Name, "x"), (String, "Br'a'"), (Name, "print"), (String, "'b'")]
        );
    }

    #[test]
    fn numbers() {
        let tokens = tokenize("a = 0x1F + 1_000 + 3.14e-2 + 2j + .5\n").unwrap();
        let numbers: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Number)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(numbers, vec!["0x1F", "1_000", "3.14e-2", "2j", ".5"]);
    }

    #[test]
    fn longest_operator_wins() {
        let tokens = tokenize("a **= b // c\n").unwrap();
        let ops: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Op)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec!["**=", "//"]);
    }

    #[test]
    fn missing_final_newline_gets_empty_newline() {
        let tokens = tokenize("x = 1").unwrap();
        let newline = &tokens[tokens.len() - 2];
        assert_eq!(newline.kind, TokenKind::Newline);
        assert_eq!(newline.text, "");
        assert_eq!(newline.start, Position::new(1, 5));
    }

    #[test]
    fn empty_source_is_just_endmarker() {
        let tokens = tokenize("").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::EndMarker);
        assert_eq!(tokens[0].start.row, 1);
    }

    #[test]
    fn unterminated_string_fails() {
        assert_eq!(
            tokenize("x = 'abc\n"),
            Err(LexError::UnterminatedString { line: 1 })
        );
    }

    #[test]
    fn unterminated_triple_string_fails_at_eof() {
        assert_eq!(
            tokenize("x = '''abc\n\n"),
            Err(LexError::EofInString { line: 1 })
        );
    }

    #[test]
    fn open_bracket_fails_at_eof() {
        assert_eq!(
            tokenize("x = (1,\n"),
            Err(LexError::EofInStatement { line: 1 })
        );
    }

    #[test]
    fn inconsistent_dedent_fails() {
        assert_eq!(
            tokenize("if x:\n    y\n  z\n"),
            Err(LexError::InconsistentDedent { line: 3 })
        );
    }

    #[test]
    fn unexpected_character_fails() {
        assert_eq!(
            tokenize("x = $\n"),
            Err(LexError::UnexpectedChar {
                ch: '$',
                line: 1,
                column: 4
            })
        );
    }
}
