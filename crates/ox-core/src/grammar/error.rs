// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Grammar compilation errors.
//!
//! These are declaration errors: they surface while reading grammar text or
//! building parse tables, never while parsing input.

use ecow::EcoString;
use miette::Diagnostic;
use thiserror::Error;

/// An error in a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum GrammarError {
    /// The grammar text itself is malformed.
    #[error("grammar syntax error at {line}:{column}: {message}")]
    #[diagnostic(code(ox::grammar::syntax))]
    Syntax {
        /// Line in the grammar text.
        line: u32,
        /// Column in the grammar text.
        column: u32,
        /// What went wrong.
        message: String,
    },

    /// A rule name was defined twice.
    #[error("rule {0} is defined more than once")]
    DuplicateRule(EcoString),

    /// A terminal name was defined twice.
    #[error("terminal {0} is defined more than once")]
    DuplicateTerminal(EcoString),

    /// A rule refers to a name that is neither a rule nor a terminal.
    #[error("rule {rule} references undefined symbol {symbol}")]
    UndefinedSymbol {
        /// The referencing rule (or directive).
        rule: EcoString,
        /// The missing name.
        symbol: EcoString,
    },

    /// The grammar declares no rules.
    #[error("grammar has no rules")]
    NoRules,

    /// The requested start rule does not exist.
    #[error("start rule {0} is not defined")]
    UnknownStart(EcoString),

    /// Two productions can be reduced on the same lookahead.
    #[error("reduce/reduce conflict on {terminal} between `{first}` and `{second}`")]
    #[diagnostic(
        code(ox::grammar::conflict),
        help("rewrite one of the rules so the next token tells the two productions apart")
    )]
    ReduceReduce {
        /// The lookahead terminal.
        terminal: EcoString,
        /// The first production, rendered as `rule: symbols`.
        first: String,
        /// The second production.
        second: String,
    },

    /// A `%directive` the reader does not support.
    #[error("unsupported directive %{0}")]
    UnsupportedDirective(EcoString),

    /// A terminal pattern does not compile.
    #[error("invalid pattern for {name}: {message}")]
    InvalidPattern {
        /// Terminal name.
        name: EcoString,
        /// Regex compiler message.
        message: String,
    },

    /// A terminal pattern can match without consuming input.
    #[error("pattern for {0} matches the empty string")]
    EmptyMatch(EcoString),
}

impl GrammarError {
    /// Creates a syntax error at a grammar-text location.
    #[must_use]
    pub fn syntax(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            column,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let err = GrammarError::syntax(3, 7, "expected ':'");
        assert_eq!(err.to_string(), "grammar syntax error at 3:7: expected ':'");
    }

    #[test]
    fn conflict_display() {
        let err = GrammarError::ReduceReduce {
            terminal: "NAME".into(),
            first: "a: NAME".into(),
            second: "b: NAME".into(),
        };
        assert_eq!(
            err.to_string(),
            "reduce/reduce conflict on NAME between `a: NAME` and `b: NAME`"
        );
    }
}
