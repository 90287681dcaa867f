// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Token type produced by compiled lexers.
//!
//! # Token Structure
//!
//! Each token consists of:
//! - A kind: the name of the terminal that matched (`INT`, `PLUS`, ...)
//! - A [`Scalar`] value: the matched text, or the result of the terminal's
//!   transform
//! - A [`Span`] plus start and end [`Position`]s
//! - The raw matched text, kept only when a transform changed it
//!
//! Two tokens are equal when their kinds and values are equal; locations
//! are metadata.

use std::fmt;

use ecow::EcoString;

use super::{Position, Scalar, Span};

/// A lexical token.
#[derive(Debug, Clone)]
pub struct Token {
    kind: EcoString,
    value: Scalar,
    span: Span,
    start: Position,
    end: Position,
    raw: Option<EcoString>,
}

impl Token {
    /// Creates a token without location information.
    pub fn new(kind: impl Into<EcoString>, value: impl Into<Scalar>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
            span: Span::default(),
            start: Position::START,
            end: Position::START,
            raw: None,
        }
    }

    /// Attaches source location.
    #[must_use]
    pub fn with_location(mut self, span: Span, start: Position, end: Position) -> Self {
        self.span = span;
        self.start = start;
        self.end = end;
        self
    }

    /// Records the raw source text when it differs from the value.
    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<EcoString>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Returns the terminal name.
    #[must_use]
    pub fn kind(&self) -> &EcoString {
        &self.kind
    }

    /// Returns the token value.
    #[must_use]
    pub fn value(&self) -> &Scalar {
        &self.value
    }

    /// Consumes the token, returning its value.
    #[must_use]
    pub fn into_value(self) -> Scalar {
        self.value
    }

    /// Returns the byte span.
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Returns the start position.
    #[must_use]
    pub fn start(&self) -> Position {
        self.start
    }

    /// Returns the end position (just past the last character).
    #[must_use]
    pub fn end(&self) -> Position {
        self.end
    }

    /// Returns the raw text if a transform rewrote the value.
    #[must_use]
    pub fn raw(&self) -> Option<&EcoString> {
        self.raw.as_ref()
    }

    /// Returns the source text of the token.
    #[must_use]
    pub fn text(&self) -> EcoString {
        match &self.raw {
            Some(raw) => raw.clone(),
            None => match &self.value {
                Scalar::Str(s) | Scalar::Symbol(s) => s.clone(),
                other => other.to_string().into(),
            },
        }
    }

    /// Returns true if this token was produced by terminal `kind`.
    #[must_use]
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.value.repr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_location() {
        let a = Token::new("INT", 20).with_location(
            Span::new(0, 2),
            Position::START,
            Position::new(1, 3),
        );
        let b = Token::new("INT", 20);
        assert_eq!(a, b);
        assert_ne!(a, Token::new("NAME", 20));
        assert_ne!(a, Token::new("INT", 21));
    }

    #[test]
    fn text_prefers_raw() {
        let tok = Token::new("NUMBER", 1.5).with_raw("1.50");
        assert_eq!(tok.text(), "1.50");
        assert_eq!(Token::new("SUM", "+").text(), "+");
        assert_eq!(Token::new("INT", 7).text(), "7");
    }

    #[test]
    fn display() {
        assert_eq!(Token::new("SUM", "+").to_string(), "SUM('+')");
        assert_eq!(Token::new("INT", 1).to_string(), "INT(1)");
    }
}
