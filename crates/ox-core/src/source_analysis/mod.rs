// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexing infrastructure.
//!
//! A [`Lexer`] is compiled from named token rules by a [`LexerBuilder`] and
//! converts source text into [`Token`]s. Each token carries a [`Scalar`]
//! value, its byte [`Span`] and the line/column [`Position`]s where it
//! starts and ends.
//!
//! # Error Handling
//!
//! Tokenizing stops at the first error. [`LexError`] integrates with miette
//! so callers can render a labelled snippet. Problems in the rules
//! themselves surface earlier, as [`LexerBuildError`] from
//! [`LexerBuilder::build`].

mod error;
mod lexer;
mod scalar;
mod span;
mod token;

#[cfg(test)]
mod lexer_property_tests;

pub use error::{LexError, LexErrorKind, LexerBuildError};
pub use lexer::{Lexer, LexerBuilder, PatternSpec, TerminalSpec, Tokens, Transform};
pub(crate) use lexer::{Cursor, Scanner};
pub use scalar::{Scalar, ScalarKind};
pub use span::{Position, Span};
pub use token::Token;
