//! Token synchronization.
//!
//! The syntax tree drops comments, blank lines and the exact spelling of
//! string literals. [`TokenSync`] indexes the raw text and token stream of one
//! file so the writer can ask for them back as it walks the tree in source
//! order.

use crate::error::{LexError, StringQueueUnderflow};
use crate::tokenize::{TokenKind, TokenRecord};
use std::collections::BTreeSet;

/// Raw source lines with trailing whitespace stripped.
#[derive(Debug, Clone)]
pub struct SourceLines<'a> {
    lines: Vec<&'a str>,
}

impl<'a> SourceLines<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().map(str::trim_end).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 1-based line, or `""` past either end.
    pub fn get(&self, line: usize) -> &'a str {
        line.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .copied()
            .unwrap_or("")
    }

    /// 1-based line; with `continued`, backslash-continued physical lines are
    /// joined onto it.
    pub fn line_at(&self, line: usize, continued: bool) -> String {
        let mut text = self.get(line).to_string();
        if !continued {
            return text;
        }
        let mut next = line + 1;
        while text.ends_with('\\') && next <= self.len() {
            text.pop();
            text.push_str(self.get(next));
            next += 1;
        }
        text
    }
}

/// What the tree does not represent on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredLine {
    /// A full-line comment; holds the token index.
    Comment(usize),
    Blank,
    Code,
}

/// Per-line FIFO of string tokens, drained once per literal in the tree.
#[derive(Debug, Clone, Default)]
pub struct StringCursor {
    queues: Vec<Vec<usize>>,
    next: Vec<usize>,
}

impl StringCursor {
    fn new(lines: usize) -> Self {
        Self {
            queues: vec![Vec::new(); lines],
            next: vec![0; lines],
        }
    }

    fn push(&mut self, line: usize, token: usize) {
        self.queues[line].push(token);
    }

    /// Next token index queued on 0-based `line`.
    pub fn pop(&mut self, line: usize) -> Option<usize> {
        let queue = self.queues.get(line)?;
        let next = self.next.get_mut(line)?;
        let token = queue.get(*next).copied()?;
        *next += 1;
        Some(token)
    }
}

/// Line-indexed view over the tokens of one file.
///
/// Built once per file and consumed by a single forward pass: the watermark
/// behind [`leading_lines`](Self::leading_lines) and the string cursor only
/// move forward.
#[derive(Debug)]
pub struct TokenSync<'a> {
    tokens: &'a [TokenRecord],
    lines: SourceLines<'a>,
    /// One bucket per source line plus a sentinel for EOF tokens.
    line_tokens: Vec<Vec<usize>>,
    ignored_lines: Vec<IgnoredLine>,
    strings: StringCursor,
    /// 0-based index of the first line not yet handed out as a leading line.
    first_leading_line: usize,
}

impl<'a> TokenSync<'a> {
    pub fn new(source: &'a str, tokens: &'a [TokenRecord]) -> Result<Self, LexError> {
        let lines = SourceLines::new(source);
        let buckets = lines.len() + 1;

        let mut line_tokens = vec![Vec::new(); buckets];
        let mut strings = StringCursor::new(buckets);
        for (index, token) in tokens.iter().enumerate() {
            let row = if token.kind == TokenKind::String {
                token.end.row
            } else {
                token.start.row
            };
            if row == 0 || row > buckets {
                return Err(LexError::TokenOutOfRange {
                    row,
                    lines: lines.len(),
                });
            }
            line_tokens[row - 1].push(index);
            if token.kind == TokenKind::String {
                strings.push(row - 1, index);
            }
        }

        let blank_lines: BTreeSet<usize> = line_tokens
            .iter()
            .enumerate()
            .filter(|(_, bucket)| {
                matches!(bucket.as_slice(), [only] if tokens[*only].kind == TokenKind::Nl)
            })
            .map(|(line, _)| line)
            .collect();

        let ignored_lines: Vec<IgnoredLine> = line_tokens
            .iter()
            .enumerate()
            .map(|(line, bucket)| {
                let comment = bucket.iter().copied().find(|&i| is_full_line_comment(&tokens[i]));
                match comment {
                    Some(index) => IgnoredLine::Comment(index),
                    None if blank_lines.contains(&line) => IgnoredLine::Blank,
                    None => IgnoredLine::Code,
                }
            })
            .collect();

        let first_leading_line = ignored_lines
            .iter()
            .position(|line| *line != IgnoredLine::Code)
            .unwrap_or(ignored_lines.len());

        Ok(Self {
            tokens,
            lines,
            line_tokens,
            ignored_lines,
            strings,
            first_leading_line,
        })
    }

    /// Comment and blank lines above 1-based `line` not yet returned, each
    /// terminated by `\n`. Advances the watermark to `line`.
    pub fn leading_lines(&mut self, line: usize) -> Vec<String> {
        let end = line.min(self.ignored_lines.len());
        let mut result = Vec::new();
        for index in self.first_leading_line..end {
            match self.ignored_lines[index] {
                IgnoredLine::Comment(token) => {
                    result.push(format!("{}\n", self.tokens[token].raw_text.trim_end()));
                }
                IgnoredLine::Blank => result.push("\n".to_string()),
                IgnoredLine::Code => {}
            }
        }
        self.first_leading_line = self.first_leading_line.max(end);
        result
    }

    pub fn leading_string(&mut self, line: usize) -> String {
        self.leading_lines(line).concat()
    }

    /// `" # comment\n"` for a comment following code on 1-based `line`,
    /// otherwise `"\n"`.
    pub fn trailing_comment(&self, line: usize) -> String {
        let comment = line
            .checked_sub(1)
            .and_then(|i| self.line_tokens.get(i))
            .and_then(|bucket| {
                bucket.iter().map(|&i| &self.tokens[i]).find(|token| {
                    token.kind == TokenKind::Comment && !is_full_line_comment(token)
                })
            });
        match comment {
            Some(token) => format!(" {}\n", token.text.trim_end()),
            None => "\n".to_string(),
        }
    }

    /// Exact source text of the next string literal on 1-based `line`.
    pub fn next_string_literal(&mut self, line: usize) -> Result<&'a str, StringQueueUnderflow> {
        let tokens = self.tokens;
        line.checked_sub(1)
            .and_then(|i| self.strings.pop(i))
            .map(|i| tokens[i].text.as_str())
            .ok_or(StringQueueUnderflow { line })
    }

    pub fn lines(&self) -> &SourceLines<'a> {
        &self.lines
    }
}

fn is_full_line_comment(token: &TokenRecord) -> bool {
    token.kind == TokenKind::Comment && token.raw_text.trim_start().starts_with('#')
}
