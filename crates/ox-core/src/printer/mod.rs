// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Source printing.
//!
//! Each node type renders itself through its
//! [`Behavior`](crate::ast::Behavior): usually a `command` template such as
//! `"{value}.{attr}"`, sometimes a hand-written `tokens` method. Children
//! are printed through [`child_tokens`], which asks the parent how to wrap
//! them so that the output reparses to the same tree.
//!
//! Output is collected as [`Fragments`] and joined at the end; a
//! [`PrintContext`] carries the indentation level for block-structured
//! languages.

// Spurious warnings from miette derive macro expansion
#![allow(unused_assignments)]

use ecow::EcoString;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::{FieldKind, NodeRef};

/// Printing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// One level of indentation.
    pub indentation: EcoString,
    /// Level the outermost node starts at.
    pub initial_level: usize,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            indentation: "    ".into(),
            initial_level: 0,
        }
    }
}

/// An error raised while printing.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum PrintError {
    /// The type has neither a template nor a `tokens` implementation.
    #[error("no printer for {0}")]
    #[diagnostic(code(ox::print::no_renderer))]
    NoRenderer(EcoString),

    /// A template names something the node does not have.
    #[error("template of {ty} refers to unknown field {name}")]
    #[diagnostic(code(ox::print::unknown_placeholder))]
    UnknownPlaceholder {
        /// Node type.
        ty: EcoString,
        /// The placeholder.
        name: EcoString,
    },

    /// A `{` without its `}`.
    #[error("unclosed placeholder in template {template:?} of {ty}")]
    #[diagnostic(code(ox::print::unclosed_placeholder))]
    UnclosedPlaceholder {
        /// Node type.
        ty: EcoString,
        /// The template.
        template: String,
    },

    /// More dedents than indents.
    #[error("cannot dedent by {by} from level {level}")]
    #[diagnostic(code(ox::print::dedent))]
    DedentBelowZero {
        /// Current level.
        level: usize,
        /// Requested dedent.
        by: usize,
    },

    /// A behavior rejected the node.
    #[error("{0}")]
    Invalid(String),
}

/// Indentation state threaded through a print.
#[derive(Debug, Clone)]
pub struct PrintContext {
    options: PrintOptions,
    level: usize,
}

impl PrintContext {
    /// Starts at the options' initial level.
    #[must_use]
    pub fn new(options: PrintOptions) -> Self {
        let level = options.initial_level;
        Self { options, level }
    }

    /// Current indentation level.
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Increases the level.
    pub fn indent(&mut self, by: usize) {
        self.level += by;
    }

    /// Decreases the level.
    pub fn dedent(&mut self, by: usize) -> Result<(), PrintError> {
        self.level = self
            .level
            .checked_sub(by)
            .ok_or(PrintError::DedentBelowZero {
                level: self.level,
                by,
            })?;
        Ok(())
    }

    /// Indentation prefix for a line at the current level.
    #[must_use]
    pub fn start_line(&self) -> String {
        self.options.indentation.repeat(self.level).to_string()
    }
}

impl Default for PrintContext {
    fn default() -> Self {
        Self::new(PrintOptions::default())
    }
}

/// Collected output pieces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragments(Vec<EcoString>);

impl Fragments {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a piece.
    pub fn push(&mut self, piece: impl Into<EcoString>) {
        self.0.push(piece.into());
    }

    /// Returns the pieces.
    #[must_use]
    pub fn as_slice(&self) -> &[EcoString] {
        &self.0
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenates the pieces.
    #[must_use]
    pub fn join(&self) -> String {
        self.0.concat()
    }
}

/// How a child is delimited inside its parent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Wrap {
    /// Printed bare.
    #[default]
    No,
    /// Wrapped in `(` and `)`.
    Parens,
    /// Wrapped in the given opening and closing strings.
    Custom(EcoString, EcoString),
}

/// Emits a node's fragments.
pub fn render(
    node: NodeRef<'_>,
    ctx: &mut PrintContext,
    out: &mut Fragments,
) -> Result<(), PrintError> {
    node.behavior().tokens(node, ctx, out)
}

/// Emits a child's fragments, wrapped as its parent decides for `role`.
pub fn child_tokens(
    parent: NodeRef<'_>,
    child: NodeRef<'_>,
    role: &str,
    ctx: &mut PrintContext,
    out: &mut Fragments,
) -> Result<(), PrintError> {
    match parent.behavior().wrap_child(parent, child, role) {
        Wrap::No => render(child, ctx, out),
        Wrap::Parens => {
            out.push("(");
            render(child, ctx, out)?;
            out.push(")");
            Ok(())
        }
        Wrap::Custom(open, close) => {
            out.push(open);
            render(child, ctx, out)?;
            out.push(close);
            Ok(())
        }
    }
}

/// Fills a template: `{field}` prints a field, `{{` and `}}` are literal
/// braces.
///
/// Child fields print through [`child_tokens`]; variadic ones are joined
/// with `", "`. An operator tag prints its symbol, a string attribute its
/// raw text, and other scalars their literal form.
pub fn fill_template(
    node: NodeRef<'_>,
    template: &str,
    ctx: &mut PrintContext,
    out: &mut Fragments,
) -> Result<(), PrintError> {
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, n) in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(PrintError::UnclosedPlaceholder {
                        ty: node.type_name().clone(),
                        template: template.to_string(),
                    });
                }
                if !literal.is_empty() {
                    out.push(std::mem::take(&mut literal));
                }
                field_tokens(node, name.trim(), ctx, out)?;
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        out.push(literal);
    }
    Ok(())
}

fn field_tokens(
    node: NodeRef<'_>,
    name: &str,
    ctx: &mut PrintContext,
    out: &mut Fragments,
) -> Result<(), PrintError> {
    let info = node.info();
    let unknown = || PrintError::UnknownPlaceholder {
        ty: info.name.clone(),
        name: name.into(),
    };
    let field = info
        .fields
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(unknown)?;
    match &field.kind {
        FieldKind::Child(_) | FieldKind::Children(_) => {
            for (i, child) in node.children_of(name).into_iter().enumerate() {
                if i > 0 {
                    out.push(", ");
                }
                child_tokens(node, child, name, ctx, out)?;
            }
        }
        FieldKind::Tag(_) => match node.operator() {
            Some(op) => out.push(op.symbol),
            None => return Err(unknown()),
        },
        FieldKind::Scalar(_) | FieldKind::Any => {
            let value = node.attr(name).ok_or_else(unknown)?;
            match value {
                crate::Scalar::Str(text) | crate::Scalar::Symbol(text) => out.push(text.clone()),
                other => out.push(other.repr()),
            }
        }
    }
    Ok(())
}

/// Collects a node's fragments.
pub fn tokens(node: NodeRef<'_>, ctx: &mut PrintContext) -> Result<Fragments, PrintError> {
    let mut out = Fragments::new();
    render(node, ctx, &mut out)?;
    Ok(out)
}

/// Renders a node as source text with default options.
pub fn source(node: NodeRef<'_>) -> Result<String, PrintError> {
    source_with(node, PrintOptions::default())
}

/// Renders a node as source text.
pub fn source_with(node: NodeRef<'_>, options: PrintOptions) -> Result<String, PrintError> {
    let mut ctx = PrintContext::new(options);
    Ok(tokens(node, &mut ctx)?.join())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, Behavior, FieldType, RegistryBuilder, TypeDecl, TypeId};
    use crate::source_analysis::{Scalar, ScalarKind};

    #[derive(Debug)]
    struct Template(&'static str);

    impl Behavior for Template {
        fn command(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    #[derive(Debug)]
    struct Suite;

    impl Behavior for Suite {
        fn tokens(
            &self,
            node: NodeRef<'_>,
            ctx: &mut PrintContext,
            out: &mut Fragments,
        ) -> Result<(), PrintError> {
            out.push("suite:\n");
            ctx.indent(1);
            for child in node.children() {
                out.push(ctx.start_line());
                render(child, ctx, out)?;
                out.push("\n");
            }
            ctx.dedent(1)
        }
    }

    fn registry(template: &'static str) -> (Ast, TypeId, TypeId) {
        let mut b = RegistryBuilder::new();
        let expr = b.declare(TypeDecl::node("Expr").root().abstract_());
        b.declare(
            TypeDecl::leaf("Atom")
                .extends(expr)
                .atomic()
                .coerces([ScalarKind::Int, ScalarKind::Str]),
        );
        b.declare(
            TypeDecl::leaf("Name")
                .extends(expr)
                .coerces([ScalarKind::Symbol]),
        );
        let node = b.declare(
            TypeDecl::node("Call")
                .extends(expr)
                .field("func", FieldType::Child(expr.into()))
                .field("args", FieldType::Children(expr.into()))
                .behavior(Template(template)),
        );
        let suite = b.declare(
            TypeDecl::node("Suite")
                .extends(expr)
                .field("body", FieldType::Children(expr.into()))
                .behavior(Suite),
        );
        (Ast::new(b.finish().unwrap()), node, suite)
    }

    #[test]
    fn templates_fill_fields() {
        let (mut ast, call, _) = registry("{func}({args})");
        let id = ast
            .node(call, vec![Scalar::symbol("f").into(), 1.into(), "two".into()])
            .unwrap();
        assert_eq!(ast.get(id).source().unwrap(), "f(1, 'two')");
    }

    #[test]
    fn braces_escape() {
        let (mut ast, call, _) = registry("{{{func}}}");
        let id = ast.node(call, vec![Scalar::symbol("f").into()]).unwrap();
        assert_eq!(ast.get(id).source().unwrap(), "{f}");
    }

    #[test]
    fn template_errors() {
        let (mut ast, call, _) = registry("{func}({nope})");
        let id = ast.node(call, vec![Scalar::symbol("f").into()]).unwrap();
        assert_eq!(
            ast.get(id).source().unwrap_err(),
            PrintError::UnknownPlaceholder {
                ty: "Call".into(),
                name: "nope".into(),
            }
        );

        let (mut ast, call, _) = registry("{func");
        let id = ast.node(call, vec![Scalar::symbol("f").into()]).unwrap();
        assert!(matches!(
            ast.get(id).source().unwrap_err(),
            PrintError::UnclosedPlaceholder { .. }
        ));
    }

    #[test]
    fn indentation_follows_context() {
        let (mut ast, _, suite) = registry("");
        let inner = ast.node(suite, vec![1.into()]).unwrap();
        let outer = ast.node(suite, vec![inner.into()]).unwrap();
        let options = PrintOptions {
            indentation: "  ".into(),
            initial_level: 0,
        };
        assert_eq!(
            source_with(ast.get(outer), options).unwrap(),
            "suite:\n  suite:\n    1\n\n"
        );
    }

    #[test]
    fn dedent_below_zero_is_an_error() {
        let mut ctx = PrintContext::default();
        ctx.indent(1);
        ctx.dedent(1).unwrap();
        assert_eq!(
            ctx.dedent(1).unwrap_err(),
            PrintError::DedentBelowZero { level: 0, by: 1 }
        );
    }

    #[test]
    fn options_from_json() {
        let options: PrintOptions = serde_json::from_str(r#"{"indentation":"\t"}"#).unwrap();
        assert_eq!(options.indentation, "\t");
        assert_eq!(options.initial_level, 0);
        let ctx = PrintContext::new(PrintOptions {
            initial_level: 2,
            ..options
        });
        assert_eq!(ctx.start_line(), "\t\t");
    }
}
