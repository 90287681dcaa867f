// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Statement behaviors.
//!
//! A statement prints from the current column to the end of its last
//! line, newline included; whoever prints a sequence of statements emits
//! the indentation in front of each one.

use ecow::EcoString;
use ox_core::ast::{Behavior, NodeRef};
use ox_core::printer::{self, Fragments, PrintContext, PrintError};

/// Prints `stmts` one per line at the current level. Nested blocks are
/// flattened into the sequence.
fn lines(
    stmts: &[NodeRef<'_>],
    ctx: &mut PrintContext,
    out: &mut Fragments,
) -> Result<(), PrintError> {
    for stmt in stmts {
        if stmt.type_name() == "Block" {
            printer::render(*stmt, ctx, out)?;
        } else {
            out.push(ctx.start_line());
            printer::render(*stmt, ctx, out)?;
        }
    }
    Ok(())
}

/// Prints `header` followed by an indented suite.
fn suite(
    header: &str,
    body: &[NodeRef<'_>],
    ctx: &mut PrintContext,
    out: &mut Fragments,
) -> Result<(), PrintError> {
    out.push(header);
    out.push(":\n");
    ctx.indent(1);
    lines(body, ctx, out)?;
    ctx.dedent(1)
}

fn expr_source(
    node: NodeRef<'_>,
    field: &str,
    ctx: &mut PrintContext,
) -> Result<String, PrintError> {
    let mut out = Fragments::new();
    for child in node.children_of(field) {
        printer::child_tokens(node, child, field, ctx, &mut out)?;
    }
    Ok(out.join())
}

/// A node printed from a fixed template.
#[derive(Debug, Clone, Copy)]
pub struct LineBehavior(pub &'static str);

impl Behavior for LineBehavior {
    fn command(&self) -> Option<&str> {
        Some(self.0)
    }
}

/// `return` with any number of values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnBehavior;

impl Behavior for ReturnBehavior {
    fn tokens(
        &self,
        node: NodeRef<'_>,
        ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        out.push("return");
        for (i, value) in node.children_of("values").into_iter().enumerate() {
            out.push(if i == 0 { " " } else { ", " });
            printer::child_tokens(node, value, "values", ctx, out)?;
        }
        out.push("\n");
        Ok(())
    }
}

/// `pass`, `break` and `continue`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmdBehavior;

impl Behavior for CmdBehavior {
    fn tokens(
        &self,
        node: NodeRef<'_>,
        _ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        out.push(node.value().to_string());
        out.push("\n");
        Ok(())
    }
}

/// A statement sequence. An empty block prints `pass`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockBehavior;

impl Behavior for BlockBehavior {
    fn tokens(
        &self,
        node: NodeRef<'_>,
        ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        let body = node.children_of("body");
        if body.is_empty() {
            out.push(ctx.start_line());
            out.push("pass\n");
            return Ok(());
        }
        lines(&body, ctx, out)
    }
}

/// `if` with `elif` and `else` branches.
///
/// An `else` branch holding a single `If` prints as `elif`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IfBehavior;

impl Behavior for IfBehavior {
    fn tokens(
        &self,
        node: NodeRef<'_>,
        ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        let header = format!("if {}", expr_source(node, "cond", ctx)?);
        suite(&header, &node.children_of("body"), ctx, out)?;
        let orelse = node.children_of("orelse");
        match orelse.as_slice() {
            [] => Ok(()),
            [single] if single.type_name() == "If" => {
                out.push(ctx.start_line());
                out.push("el");
                printer::render(*single, ctx, out)
            }
            stmts => {
                out.push(ctx.start_line());
                suite("else", stmts, ctx, out)
            }
        }
    }
}

/// `while cond:` and its body.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhileBehavior;

impl Behavior for WhileBehavior {
    fn tokens(
        &self,
        node: NodeRef<'_>,
        ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        let header = format!("while {}", expr_source(node, "cond", ctx)?);
        suite(&header, &node.children_of("body"), ctx, out)
    }
}

/// `def name(params):` and its body. The parameters are bound inside.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionBehavior;

impl Behavior for FunctionBehavior {
    fn bound_names(&self, node: NodeRef<'_>) -> Vec<EcoString> {
        node.children_of("params")
            .into_iter()
            .filter_map(|param| param.value().as_str().map(EcoString::from))
            .collect()
    }

    fn tokens(
        &self,
        node: NodeRef<'_>,
        ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        let name = node.tag().map(ToString::to_string).unwrap_or_default();
        let params = node
            .children_of("params")
            .iter()
            .map(|p| p.value().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        suite(&format!("def {name}({params})"), &node.children_of("body"), ctx, out)
    }
}

#[cfg(test)]
mod tests {
    use ox_core::ast::{Arg, Head};
    use ox_core::printer::{source_with, PrintOptions};
    use ox_core::Scalar;

    use crate::Python;

    fn name(n: &str) -> Arg {
        Scalar::symbol(n).into()
    }

    fn stmt(py: &Python, ast: &mut ox_core::Ast, head: &str, args: Vec<Arg>) -> ox_core::NodeId {
        ast.sexpr(py.types().stmt, Head::from(head), args, Vec::new())
            .unwrap()
    }

    #[test]
    fn simple_statements() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let assign = stmt(&py, &mut ast, "=", vec![name("x"), 1.into()]);
        assert_eq!(ast.get(assign).source().unwrap(), "x = 1\n");
        let ret = stmt(&py, &mut ast, "return", vec![name("a"), name("b")]);
        assert_eq!(ast.get(ret).source().unwrap(), "return a, b\n");
        let bare = stmt(&py, &mut ast, "return", Vec::new());
        assert_eq!(ast.get(bare).source().unwrap(), "return\n");
        let pass = stmt(&py, &mut ast, "pass", Vec::new());
        assert_eq!(ast.get(pass).source().unwrap(), "pass\n");
        let aug = stmt(&py, &mut ast, "//=", vec![name("n"), 2.into()]);
        assert_eq!(ast.get(aug).source().unwrap(), "n //= 2\n");
    }

    #[test]
    fn expressions_become_statements() {
        let py = Python::new().unwrap();
        let types = py.types();
        let mut ast = py.ast();
        let call = ast
            .sexpr(types.expr, "()".into(), vec![name("f")], Vec::new())
            .unwrap();
        let block = stmt(&py, &mut ast, "do", vec![call.into(), name("x")]);
        assert_eq!(ast.get(block).source().unwrap(), "f()\nx\n");
        let first = ast.get(block).children().next().unwrap();
        assert_eq!(first.ty(), types.expr_stmt);
    }

    #[test]
    fn empty_block_prints_pass() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let block = stmt(&py, &mut ast, "do", Vec::new());
        assert_eq!(ast.get(block).source().unwrap(), "pass\n");
    }

    #[test]
    fn function_definition() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let ret = stmt(&py, &mut ast, "return", vec![name("x")]);
        let def = stmt(
            &py,
            &mut ast,
            "def",
            vec![name("fn"), Arg::List(vec![name("x")]), Arg::List(vec![ret.into()])],
        );
        assert_eq!(ast.get(def).source().unwrap(), "def fn(x):\n    return x\n");
        assert!(ast.free_vars(def).is_empty());
    }

    #[test]
    fn if_elif_else() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let inner = stmt(
            &py,
            &mut ast,
            "if",
            vec![name("b"), Arg::List(vec![name("y")]), Arg::List(vec![name("z")])],
        );
        let outer = stmt(
            &py,
            &mut ast,
            "if",
            vec![name("a"), Arg::List(vec![name("x")]), Arg::List(vec![inner.into()])],
        );
        assert_eq!(
            ast.get(outer).source().unwrap(),
            "if a:\n    x\nelif b:\n    y\nelse:\n    z\n"
        );
    }

    #[test]
    fn nested_suites_indent() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let brk = stmt(&py, &mut ast, "break", Vec::new());
        let body = stmt(&py, &mut ast, "if", vec![name("done"), Arg::List(vec![brk.into()])]);
        let loop_ = stmt(&py, &mut ast, "while", vec![true.into(), Arg::List(vec![body.into()])]);
        let options = PrintOptions {
            indentation: "  ".into(),
            initial_level: 0,
        };
        assert_eq!(
            source_with(ast.get(loop_), options).unwrap(),
            "while True:\n  if done:\n    break\n"
        );
    }

    #[test]
    fn empty_suite_prints_pass() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let loop_ = stmt(&py, &mut ast, "while", vec![name("x"), Arg::List(Vec::new())]);
        assert_eq!(ast.get(loop_).source().unwrap(), "while x:\n    pass\n");
    }
}
