// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexer errors.
//!
//! [`LexError`] is an input error raised while tokenizing; it carries the
//! [`Span`] of the offending text for miette diagnostics.
//! [`LexerBuildError`] is a declaration error raised while compiling token
//! rules.

// Spurious warnings from miette derive macro expansion
#![allow(unused_assignments)]

use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

use super::{Position, Span};
use crate::grammar::GrammarError;

/// A lexical error encountered during tokenization.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{kind} at {position}")]
#[diagnostic()]
pub struct LexError {
    /// The kind of lexical error.
    #[source]
    pub kind: LexErrorKind,
    /// The source location of the error.
    #[label("here")]
    pub span: Span,
    /// Line and column of the error.
    pub position: Position,
}

impl LexError {
    /// Creates a new lexical error.
    #[must_use]
    pub fn new(kind: LexErrorKind, span: Span, position: Position) -> Self {
        Self {
            kind,
            span,
            position,
        }
    }

    /// Creates an "unexpected character" error.
    #[must_use]
    pub fn unexpected_char(c: char, span: Span, position: Position) -> Self {
        Self::new(LexErrorKind::UnexpectedCharacter(c), span, position)
    }

    /// Creates an "invalid value" error for a failed transform.
    #[must_use]
    pub fn invalid_value(
        token: impl Into<EcoString>,
        message: impl Into<String>,
        span: Span,
        position: Position,
    ) -> Self {
        Self::new(
            LexErrorKind::InvalidValue {
                token: token.into(),
                message: message.into(),
            },
            span,
            position,
        )
    }
}

/// The kind of lexical error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    /// No rule matches at the current position.
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),

    /// A token's transform rejected the matched text.
    #[error("invalid value for {token}: {message}")]
    InvalidValue {
        /// The terminal whose transform failed.
        token: EcoString,
        /// The transform's message.
        message: String,
    },
}

/// An error in a set of token declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerBuildError {
    /// The token name does not follow the `(_)?NAME(_<digits>_)?` convention.
    #[error("invalid token name {0:?}: token names must be uppercase identifiers")]
    InvalidName(EcoString),

    /// The same token was declared twice.
    #[error("token {0} is declared more than once")]
    Duplicate(EcoString),

    /// The regular expression does not compile.
    #[error("invalid pattern for {name}: {message}")]
    InvalidPattern {
        /// Token name.
        name: EcoString,
        /// Regex compiler message.
        message: String,
    },

    /// The pattern can match without consuming input.
    #[error("pattern for {0} matches the empty string")]
    EmptyMatch(EcoString),

    /// A `{regex: transform}` mapping did not have exactly one entry.
    #[error("cannot declare more than one pattern at once")]
    MultiplePatterns,

    /// An ignored token was never declared.
    #[error("cannot ignore undeclared token {0}")]
    UnknownIgnored(EcoString),

    /// Token rules and grammar text were both supplied.
    #[error("cannot specify token rules and grammar text simultaneously")]
    RulesAndGrammar,

    /// Lexer grammar text declared a nonterminal rule.
    #[error("cannot declare rules in a lexer grammar: {0}")]
    RuleInLexer(EcoString),

    /// A transform was attached to a terminal the grammar does not declare.
    #[error("transform given for undeclared token {0}")]
    UnknownTransform(EcoString),

    /// Lexer grammar text failed to parse.
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_display() {
        let err = LexError::unexpected_char('^', Span::new(3, 4), Position::new(1, 4));
        assert_eq!(err.to_string(), "unexpected character '^' at 1:4");
    }

    #[test]
    fn invalid_value_display() {
        let err = LexError::invalid_value("INT", "too large", Span::new(0, 30), Position::START);
        assert_eq!(err.to_string(), "invalid value for INT: too large at 1:1");
        assert_eq!(err.span.len(), 30);
    }

    #[test]
    fn build_error_display() {
        assert_eq!(
            LexerBuildError::MultiplePatterns.to_string(),
            "cannot declare more than one pattern at once"
        );
    }
}
