// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parser errors.
//!
//! [`ParseError`] is an input error: the token stream did not fit the
//! grammar, or a reducer rejected what it was given. [`ParserBuildError`]
//! is a declaration error raised while compiling rules.

// Spurious warnings from miette derive macro expansion
#![allow(unused_assignments)]

use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

use crate::ast::AstError;
use crate::grammar::GrammarError;
use crate::operators::ChainError;
use crate::source_analysis::{LexError, LexerBuildError, Position, Span};

/// An error raised while parsing input.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    /// The input could not be tokenized.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    /// A token that no production accepts in the current state.
    #[error("unexpected {found} at {position}, expected one of: {}", .expected.join(", "))]
    #[diagnostic(code(ox::parse::unexpected_token))]
    UnexpectedToken {
        /// Terminal name and text of the offending token.
        found: String,
        /// Terminals the parser would have accepted.
        expected: Vec<EcoString>,
        /// Location of the token.
        #[label("unexpected token")]
        span: Span,
        /// Line and column of the token.
        position: Position,
    },

    /// The input ended while a production was still open.
    #[error("unexpected end of input, expected one of: {}", .expected.join(", "))]
    #[diagnostic(code(ox::parse::unexpected_eof))]
    UnexpectedEof {
        /// Terminals the parser would have accepted.
        expected: Vec<EcoString>,
        /// Empty span at the end of the input.
        #[label("input ends here")]
        span: Span,
    },

    /// A reducer failed.
    #[error("cannot reduce {rule}: {source}")]
    #[diagnostic(code(ox::parse::reduce))]
    Reduce {
        /// The alias the reducer is registered under.
        rule: EcoString,
        /// The reducer's error.
        source: ReduceError,
        /// Tokens covered by the reduction.
        #[label("while reducing this")]
        span: Span,
    },

    /// The input exceeds `ParserOptions::max_input_len`.
    #[error("input of {len} bytes exceeds the limit of {max} bytes")]
    InputTooLarge {
        /// Input length in bytes.
        len: usize,
        /// Configured limit.
        max: usize,
    },
}

/// An error returned by a reducer.
#[derive(Debug, Error)]
pub enum ReduceError {
    /// Building an AST node failed.
    #[error(transparent)]
    Ast(#[from] AstError),

    /// Folding an operator chain failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// A child value had the wrong shape.
    #[error("expected {expected}, found {found}")]
    UnexpectedValue {
        /// What the reducer wanted.
        expected: &'static str,
        /// Description of what it got.
        found: String,
    },

    /// Any other failure.
    #[error("{0}")]
    Message(String),
}

impl ReduceError {
    /// Creates a free-form reducer error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// An error in parser declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ParserBuildError {
    /// The combined grammar is invalid.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),

    /// The grammar's terminals do not compile.
    #[error(transparent)]
    Lexer(#[from] LexerBuildError),

    /// An alternative pattern does not parse.
    #[error("invalid alternative {pattern:?} in rule {rule}: {source}")]
    Alternative {
        /// Rule name.
        rule: EcoString,
        /// The pattern text.
        pattern: String,
        /// What the grammar reader reported.
        source: GrammarError,
    },

    /// A reducer was registered for an alias that no production uses.
    #[error("reducer given for unknown alias {0}")]
    UnknownReducer(EcoString),

    /// Declarative rules were combined with raw grammar text.
    #[error("cannot specify rules and grammar text simultaneously")]
    RulesAndGrammar,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_token_lists_expected() {
        let err = ParseError::UnexpectedToken {
            found: "RPAR(')')".into(),
            expected: vec!["NUMBER".into(), "LPAR".into()],
            span: Span::new(2, 3),
            position: Position::new(1, 3),
        };
        assert_eq!(
            err.to_string(),
            "unexpected RPAR(')') at 1:3, expected one of: NUMBER, LPAR"
        );
    }

    #[test]
    fn lex_errors_are_transparent() {
        let err = ParseError::from(LexError::unexpected_char(
            '^',
            Span::new(0, 1),
            Position::START,
        ));
        assert_eq!(err.to_string(), "unexpected character '^' at 1:1");
    }

    #[test]
    fn reduce_error_display() {
        let err = ParseError::Reduce {
            rule: "fn_sum".into(),
            source: ReduceError::message("boom"),
            span: Span::new(0, 3),
        };
        assert_eq!(err.to_string(), "cannot reduce fn_sum: boom");
    }
}
