// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! A Python subset built on the ox toolkit.
//!
//! This crate is a complete front end assembled from `ox-core` parts:
//! - [`operators`]: operator families and precedence levels
//! - [`nodes`]: the node catalog and its printing behaviors
//! - [`fold`]: constant folding with Python semantics
//! - [`grammar`]: grammar text and reducers
//! - [`indenter`]: the indentation post-lexer
//! - [`py`]: operator-overloaded tree building
//!
//! [`Python`] ties them together: it parses source into an [`Ast`], builds
//! trees from S-expressions or Rust operators, and prints them back.
//!
//! # Example
//!
//! ```
//! use ox_python::Python;
//!
//! let py = Python::new().unwrap();
//! let (ast, module) = py.parse_module("if x:\n  y = x*(1+2)\n").unwrap();
//! assert_eq!(ast.get(module).source().unwrap(), "if x:\n    y = x * (1 + 2)\n");
//!
//! let e = py.var("x") + py.var("y") + 2;
//! assert_eq!(e.source().unwrap(), "x + y + 2");
//! ```

// Spurious warnings from miette derive macro expansion
#![allow(unused_assignments)]

pub mod fold;
pub mod grammar;
pub mod indenter;
pub mod nodes;
pub mod operators;
pub mod py;

use std::sync::Arc;

use ecow::EcoString;
use miette::Diagnostic;
use ox_core::ast::{Arg, AstError, DeclarationError, Head, Registry};
use ox_core::parser::{ParseError, ParserBuildError, ReduceError};
use ox_core::printer::PrintError;
use ox_core::wrapper::{Operand, Wrapped};
use ox_core::{Ast, NodeId, Parser, Scalar};
use thiserror::Error;

pub use indenter::{IndentError, Indenter};
pub use nodes::PyTypes;
pub use operators::{BinaryOp, UnaryOp};
pub use py::PyExpr;

/// Errors raised by the Python front end.
#[derive(Debug, Error, Diagnostic)]
pub enum PythonError {
    /// The node catalog is inconsistent.
    #[error(transparent)]
    #[diagnostic(code(ox::python::declaration))]
    Declaration(#[from] DeclarationError),

    /// The grammar does not compile.
    #[error(transparent)]
    #[diagnostic(transparent)]
    ParserBuild(#[from] ParserBuildError),

    /// The input does not lex or parse.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    /// The input is inconsistently indented.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Indent(#[from] IndentError),

    /// The parse result is not a node.
    #[error(transparent)]
    #[diagnostic(code(ox::python::reduce))]
    Reduce(#[from] ReduceError),

    /// Building a tree failed.
    #[error(transparent)]
    #[diagnostic(code(ox::python::ast))]
    Ast(#[from] AstError),

    /// Printing a tree failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Print(#[from] PrintError),
}

/// The Python front end: node catalog, parsers and indenter.
///
/// Cheap to clone; parsers and the registry are shared.
#[derive(Debug, Clone)]
pub struct Python {
    registry: Arc<Registry>,
    types: PyTypes,
    module: Parser<Ast>,
    expression: Parser<Ast>,
    indenter: Indenter,
}

impl Python {
    /// Declares the catalog and compiles both parsers.
    ///
    /// # Errors
    ///
    /// Returns [`PythonError::Declaration`] or [`PythonError::ParserBuild`]
    /// if the built-in declarations are broken.
    #[tracing::instrument]
    pub fn new() -> Result<Self, PythonError> {
        let (registry, types) = nodes::registry()?;
        let module = grammar::parser(types, grammar::MODULE)?;
        let expression = grammar::parser(types, grammar::EXPRESSION)?;
        tracing::debug!(types = registry.types().count(), "python front end ready");
        Ok(Self {
            registry,
            types,
            module,
            expression,
            indenter: Indenter::default(),
        })
    }

    /// Replaces the indenter, e.g. to change the tab width.
    #[must_use]
    pub fn with_indenter(mut self, indenter: Indenter) -> Self {
        self.indenter = indenter;
        self
    }

    /// The node registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Handles of the node types.
    #[must_use]
    pub fn types(&self) -> PyTypes {
        self.types
    }

    /// An empty arena over the Python registry.
    #[must_use]
    pub fn ast(&self) -> Ast {
        Ast::new(Arc::clone(&self.registry))
    }

    fn parse(&self, parser: &Parser<Ast>, source: &str) -> Result<(Ast, NodeId), PythonError> {
        let tokens = parser.tokenize(source)?;
        let tokens = self.indenter.process(tokens)?;
        let mut ast = self.ast();
        let id = parser.parse_tokens(&mut ast, tokens)?.into_node()?;
        tracing::debug!(nodes = ast.len(), "parsed");
        Ok((ast, id))
    }

    /// Parses a module into a `Block` of statements.
    ///
    /// # Errors
    ///
    /// Returns a [`PythonError`] for input that does not lex, indent or
    /// parse.
    pub fn parse_module(&self, source: &str) -> Result<(Ast, NodeId), PythonError> {
        self.parse(&self.module, source)
    }

    /// Parses a single expression.
    ///
    /// # Errors
    ///
    /// Returns a [`PythonError`] for input that does not lex or parse.
    pub fn parse_expr(&self, source: &str) -> Result<(Ast, NodeId), PythonError> {
        self.parse(&self.expression, source)
    }

    /// Parses a module and prints it back in canonical form.
    ///
    /// # Errors
    ///
    /// Returns the parse or print error.
    pub fn reformat(&self, source: &str) -> Result<String, PythonError> {
        let (ast, id) = self.parse_module(source)?;
        Ok(ast.get(id).source()?)
    }

    /// A variable reference.
    #[must_use]
    pub fn var(&self, name: &str) -> Wrapped {
        Wrapped::new(Arc::clone(&self.registry), self.types.expr, Scalar::symbol(name))
    }

    /// A host value, coerced into an expression.
    #[must_use]
    pub fn value(&self, value: impl Into<Arg>) -> Wrapped {
        Wrapped::new(Arc::clone(&self.registry), self.types.expr, value)
    }

    /// Builds `(head args...)`, trying expression heads before statement
    /// heads.
    #[must_use]
    pub fn sexpr(
        &self,
        head: &str,
        args: Vec<Operand>,
        kwargs: Vec<(EcoString, Operand)>,
    ) -> Wrapped {
        let expr = Wrapped::sexpr(
            Arc::clone(&self.registry),
            self.types.expr,
            Head::from(head),
            args.clone(),
            kwargs.clone(),
        );
        match expr.error() {
            Some(AstError::InvalidHead(_)) => self.stmt(head, args, kwargs),
            _ => expr,
        }
    }

    /// Builds the statement `(head args...)`.
    #[must_use]
    pub fn stmt(
        &self,
        head: &str,
        args: Vec<Operand>,
        kwargs: Vec<(EcoString, Operand)>,
    ) -> Wrapped {
        Wrapped::sexpr(
            Arc::clone(&self.registry),
            self.types.stmt,
            Head::from(head),
            args,
            kwargs,
        )
    }
}
