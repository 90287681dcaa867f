// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Scalar host values.
//!
//! Token values, leaf payloads and folded constants are all [`Scalar`]s.

use std::fmt;

use ecow::EcoString;

/// A scalar value.
///
/// `Str` is string data; `Symbol` is an identifier-like name (variable
/// names, tree tags, operator member names).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    /// The absence of a value.
    #[default]
    None,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// String data.
    Str(EcoString),
    /// An identifier.
    Symbol(EcoString),
}

/// The kind of a [`Scalar`], used as a coercion key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    /// [`Scalar::None`]
    None,
    /// [`Scalar::Bool`]
    Bool,
    /// [`Scalar::Int`]
    Int,
    /// [`Scalar::Float`]
    Float,
    /// [`Scalar::Str`]
    Str,
    /// [`Scalar::Symbol`]
    Symbol,
}

impl ScalarKind {
    /// Returns the kind's name as used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Symbol => "symbol",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Scalar {
    /// Creates a symbol.
    pub fn symbol(name: impl Into<EcoString>) -> Self {
        Self::Symbol(name.into())
    }

    /// Creates a string.
    pub fn str(text: impl Into<EcoString>) -> Self {
        Self::Str(text.into())
    }

    /// Returns the kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::None => ScalarKind::None,
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int(_) => ScalarKind::Int,
            Self::Float(_) => ScalarKind::Float,
            Self::Str(_) => ScalarKind::Str,
            Self::Symbol(_) => ScalarKind::Symbol,
        }
    }

    /// Truth value, following Python conventions.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(x) => *x != 0.0,
            Self::Str(s) | Self::Symbol(s) => !s.is_empty(),
        }
    }

    /// Returns the integer value; booleans count as 0 and 1.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Returns the numeric value as a float.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "matches host float promotion")]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            Self::Int(i) => Some(*i as f64),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Returns the text of a string or symbol.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as a source literal.
    ///
    /// Strings are single-quoted with escapes; everything else renders as
    /// its [`Display`](fmt::Display) form.
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for c in s.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
                out
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_infinite() => {
                f.write_str(if *x > 0.0 { "inf" } else { "-inf" })
            }
            Self::Float(x) if x.is_nan() => f.write_str("nan"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) | Self::Symbol(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<EcoString> for Scalar {
    fn from(value: EcoString) -> Self {
        Self::Str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_host_spelling() {
        assert_eq!(Scalar::None.to_string(), "None");
        assert_eq!(Scalar::Bool(true).to_string(), "True");
        assert_eq!(Scalar::Int(-3).to_string(), "-3");
        assert_eq!(Scalar::Float(1.0).to_string(), "1.0");
        assert_eq!(Scalar::Float(2.5).to_string(), "2.5");
        assert_eq!(Scalar::symbol("x").to_string(), "x");
    }

    #[test]
    fn repr_quotes_strings() {
        assert_eq!(Scalar::str("bar").repr(), "'bar'");
        assert_eq!(Scalar::str("it's\n").repr(), "'it\\'s\\n'");
        assert_eq!(Scalar::Int(42).repr(), "42");
    }

    #[test]
    fn truthiness() {
        assert!(!Scalar::None.is_truthy());
        assert!(!Scalar::Int(0).is_truthy());
        assert!(Scalar::Float(0.5).is_truthy());
        assert!(!Scalar::str("").is_truthy());
        assert!(Scalar::str("a").is_truthy());
    }

    #[test]
    fn numeric_views() {
        assert_eq!(Scalar::Bool(true).as_int(), Some(1));
        assert_eq!(Scalar::Int(2).as_float(), Some(2.0));
        assert_eq!(Scalar::str("2").as_int(), None);
    }

    #[test]
    fn kinds() {
        assert_eq!(Scalar::from(1.5).kind(), ScalarKind::Float);
        assert_eq!(Scalar::from("x").kind(), ScalarKind::Str);
        assert_eq!(ScalarKind::Symbol.to_string(), "symbol");
    }
}
