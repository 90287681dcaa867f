// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! ox compiler-construction core.
//!
//! This crate contains the generic machinery that language front ends are
//! built from:
//! - Operator tables and precedence-driven chain reduction
//! - Lexer compilation from named token patterns
//! - Grammar compilation into LALR(1) parse tables
//! - Typed AST arenas with ownership, equality, folding and S-expression dispatch
//! - Precedence-aware source printing
//!
//! The pipeline is: token and rule declarations → [`Lexer`] → [`Parser`] →
//! [`Ast`] → (optional) [`Ast::simplify`] → [`printer::source`].
//!
//! # Example
//!
//! ```
//! use ox_core::source_analysis::LexerBuilder;
//!
//! let lexer = LexerBuilder::new()
//!     .token("INT", r"\d+")
//!     .token("SUM", r"[+-]")
//!     .token("WS", r"\s+")
//!     .ignore(["WS"])
//!     .build()
//!     .unwrap();
//! let kinds: Vec<_> = lexer
//!     .tokenize("20 + 1")
//!     .unwrap()
//!     .iter()
//!     .map(|t| t.kind().clone())
//!     .collect();
//! assert_eq!(kinds, ["INT", "SUM", "INT"]);
//! ```

pub mod ast;
pub mod grammar;
pub mod operators;
pub mod parser;
pub mod printer;
pub mod source_analysis;
pub mod wrapper;

pub use ast::{Ast, NodeId, NodeRef, Registry, RegistryBuilder, TypeDecl, TypeId};
pub use parser::{Parser, ParserBuilder, Rule, Tree, Value};
pub use source_analysis::{Lexer, LexerBuilder, Position, Scalar, ScalarKind, Span, Token};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::ast::{Arg, Ast, Behavior, FieldType, Head, NodeId, NodeRef, TypeDecl};
    pub use crate::operators::{Associativity, Operator, OperatorFamily};
    pub use crate::printer::{Fragments, PrintContext, Wrap};
    pub use crate::source_analysis::{Scalar, ScalarKind, Span, Token};
}
