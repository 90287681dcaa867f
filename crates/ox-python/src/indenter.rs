// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Post-lexer that turns indentation into `_INDENT` and `_DEDENT` tokens.
//!
//! The lexer emits one `_NEWLINE` token per run of line breaks, carrying
//! the whitespace that starts the next non-blank line. The indenter keeps
//! a stack of open indentation widths and compares each new line against
//! it. Line breaks inside brackets are dropped.

// Spurious warnings from miette derive macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use ox_core::{Position, Scalar, Span, Token};
use thiserror::Error;

/// Terminal carrying line breaks.
pub const NEWLINE: &str = "_NEWLINE";
/// Synthesized when a line is indented deeper than the previous one.
pub const INDENT: &str = "_INDENT";
/// Synthesized once per closed indentation level.
pub const DEDENT: &str = "_DEDENT";

const OPEN: [&str; 2] = ["LPAR", "LSQB"];
const CLOSE: [&str; 2] = ["RPAR", "RSQB"];

/// A line dedented to a width no enclosing block uses.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("unindent to width {width} at {position} does not match any outer indentation level")]
#[diagnostic(code(ox::python::indent))]
pub struct IndentError {
    /// Indentation width of the offending line.
    pub width: usize,
    /// Start of the offending line.
    pub position: Position,
    /// The line break token that introduced it.
    #[label("inconsistent dedent")]
    pub span: Span,
}

/// Indentation tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indenter {
    /// Width a tab counts for.
    pub tab_len: usize,
}

impl Default for Indenter {
    fn default() -> Self {
        Self { tab_len: 8 }
    }
}

fn synthetic(kind: &str, after: Option<&Token>) -> Token {
    let token = Token::new(kind, Scalar::str(""));
    match after {
        Some(prev) => {
            let end = prev.span().end();
            token.with_location(Span::new(end, end), prev.end(), prev.end())
        }
        None => token,
    }
}

impl Indenter {
    /// Width of the indentation carried by a `_NEWLINE` token.
    #[must_use]
    pub fn width(&self, newline: &Token) -> usize {
        let text = newline.text();
        let line = text.rsplit('\n').next().unwrap_or_default();
        line.chars()
            .take_while(|c| matches!(c, ' ' | '\t'))
            .map(|c| if c == '\t' { self.tab_len } else { 1 })
            .sum()
    }

    /// Rewrites a token stream, inserting indentation tokens.
    ///
    /// The result always ends with a `_NEWLINE` (unless it is empty) and
    /// closes every open level.
    ///
    /// # Errors
    ///
    /// Returns an [`IndentError`] when a line dedents to a width that no
    /// enclosing block uses.
    #[tracing::instrument(skip_all, fields(tokens = tokens.len()))]
    pub fn process(&self, tokens: Vec<Token>) -> Result<Vec<Token>, IndentError> {
        let mut out = Vec::with_capacity(tokens.len() + 4);
        let mut levels = vec![0_usize];
        let mut depth = 0_usize;

        for token in tokens {
            let kind = token.kind().as_str();
            if kind == NEWLINE {
                if depth > 0 {
                    continue;
                }
                let width = self.width(&token);
                let (span, position) = (token.span(), token.end());
                out.push(token);
                let current = levels.last().copied().unwrap_or_default();
                if width > current {
                    levels.push(width);
                    out.push(synthetic(INDENT, out.last()));
                    continue;
                }
                while levels.last().is_some_and(|&level| width < level) {
                    levels.pop();
                    out.push(synthetic(DEDENT, out.last()));
                }
                if levels.last() != Some(&width) {
                    return Err(IndentError {
                        width,
                        position,
                        span,
                    });
                }
                continue;
            }
            if OPEN.contains(&kind) {
                depth += 1;
            } else if CLOSE.contains(&kind) {
                depth = depth.saturating_sub(1);
            }
            out.push(token);
        }

        let ends_line = out
            .iter()
            .rev()
            .find(|t| !t.is(DEDENT))
            .is_none_or(|t| t.is(NEWLINE));
        if !ends_line {
            out.push(synthetic(NEWLINE, out.last()));
        }
        for _ in 1..levels.len() {
            out.push(synthetic(DEDENT, out.last()));
        }
        tracing::trace!(tokens = out.len(), "indented");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: &str, text: &str) -> Token {
        Token::new(kind, Scalar::str(text))
    }

    fn kinds(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.kind().as_str()).collect()
    }

    #[test]
    fn indents_and_dedents() {
        let tokens = vec![
            tok("IF", "if"),
            tok("NAME", "x"),
            tok("COLON", ":"),
            tok(NEWLINE, "\n    "),
            tok("PASS", "pass"),
            tok(NEWLINE, "\n"),
            tok("NAME", "y"),
        ];
        let out = Indenter::default().process(tokens).unwrap();
        assert_eq!(
            kinds(&out),
            [
                "IF", "NAME", "COLON", NEWLINE, INDENT, "PASS", NEWLINE, DEDENT, "NAME", NEWLINE
            ]
        );
    }

    #[test]
    fn closes_open_levels_at_end() {
        let tokens = vec![
            tok("COLON", ":"),
            tok(NEWLINE, "\n  "),
            tok("COLON", ":"),
            tok(NEWLINE, "\n    "),
            tok("PASS", "pass"),
        ];
        let out = Indenter::default().process(tokens).unwrap();
        assert_eq!(
            kinds(&out),
            ["COLON", NEWLINE, INDENT, "COLON", NEWLINE, INDENT, "PASS", NEWLINE, DEDENT, DEDENT]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_dropped() {
        let tokens = vec![
            tok("NAME", "f"),
            tok("LPAR", "("),
            tok(NEWLINE, "\n        "),
            tok("NAME", "x"),
            tok("RPAR", ")"),
            tok(NEWLINE, "\n"),
        ];
        let out = Indenter::default().process(tokens).unwrap();
        assert_eq!(kinds(&out), ["NAME", "LPAR", "NAME", "RPAR", NEWLINE]);
    }

    #[test]
    fn comment_lines_do_not_count() {
        let indenter = Indenter { tab_len: 4 };
        assert_eq!(indenter.width(&tok(NEWLINE, "\n  # note\n\t x")), 5);
        assert_eq!(indenter.width(&tok(NEWLINE, "\n# trailing")), 0);
    }

    #[test]
    fn inconsistent_dedent_is_an_error() {
        let tokens = vec![
            tok("COLON", ":"),
            tok(NEWLINE, "\n    "),
            tok("PASS", "pass"),
            tok(NEWLINE, "\n  "),
        ];
        let err = Indenter::default().process(tokens).unwrap_err();
        assert_eq!(err.width, 2);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(Indenter::default().process(Vec::new()).unwrap().is_empty());
    }
}
