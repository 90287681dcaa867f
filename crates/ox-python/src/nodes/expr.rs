// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Expression behaviors.

use ox_core::ast::{Behavior, BinaryOperator, NodeRef};
use ox_core::printer::{self, Fragments, PrintContext, PrintError, Wrap};
use ox_core::Scalar;

use crate::fold;
use crate::operators::{COMPARISON, TERNARY, UNARY};

/// Literal leaves. Negative numbers print with a sign, so they bind like
/// a unary minus.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomBehavior;

impl Behavior for AtomBehavior {
    fn precedence(&self, node: NodeRef<'_>) -> Option<u8> {
        let negative = match node.value() {
            Scalar::Int(i) => *i < 0,
            Scalar::Float(x) => x.is_sign_negative(),
            _ => false,
        };
        negative.then_some(UNARY)
    }
}

/// Binary operators, with Python's non-associative comparisons.
#[derive(Debug, Clone)]
pub struct BinOpBehavior {
    inner: BinaryOperator,
}

impl Default for BinOpBehavior {
    fn default() -> Self {
        Self {
            inner: BinaryOperator::new()
                .regroupable(["ADD", "MUL", "BITAND", "BITOR", "BITXOR"])
                .fold(fold::binary),
        }
    }
}

impl Behavior for BinOpBehavior {
    fn from_static_children(&self, node: NodeRef<'_>, values: &[Scalar]) -> Option<Scalar> {
        self.inner.from_static_children(node, values)
    }

    fn command(&self) -> Option<&str> {
        self.inner.command()
    }

    fn precedence(&self, node: NodeRef<'_>) -> Option<u8> {
        self.inner.precedence(node)
    }

    fn wrap_child(&self, node: NodeRef<'_>, child: NodeRef<'_>, role: &str) -> Wrap {
        // `a < b < c` is a chained comparison in Python, not a nested one
        let nested_comparison = node.operator().is_some_and(|op| op.precedence == COMPARISON)
            && child.behavior().precedence(child) == Some(COMPARISON);
        if nested_comparison {
            return Wrap::Parens;
        }
        // the exponent may be a bare unary: `2 ** -y`
        let signed_exponent = role == "rhs"
            && node.operator().is_some_and(|op| op.name == "POW")
            && child.behavior().precedence(child) == Some(UNARY);
        if signed_exponent {
            return Wrap::No;
        }
        let wrap = self.inner.wrap_child(node, child, role);
        // only the same operator regroups: `a + (b - c)` keeps its parentheses
        let (ours, theirs) = (node.operator(), child.operator());
        let mixed = role == "rhs"
            && child.behavior().precedence(child) == ours.map(|op| op.precedence)
            && theirs.map(|op| op.name) != ours.map(|op| op.name);
        if mixed { Wrap::Parens } else { wrap }
    }
}

/// Unary operators: `-x`, `+x`, `~x` and `not x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnaryOpBehavior;

impl Behavior for UnaryOpBehavior {
    fn from_static_children(&self, node: NodeRef<'_>, values: &[Scalar]) -> Option<Scalar> {
        match values {
            [value] => fold::unary(node.operator()?, value),
            _ => None,
        }
    }

    fn precedence(&self, node: NodeRef<'_>) -> Option<u8> {
        node.operator().map(|op| op.precedence)
    }

    fn tokens(
        &self,
        node: NodeRef<'_>,
        ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        let op = node
            .operator()
            .ok_or_else(|| PrintError::Invalid(format!("{node:?} has no operator")))?;
        out.push(op.symbol);
        if op.symbol.chars().all(char::is_alphabetic) {
            out.push(" ");
        }
        match node.child("value") {
            Some(value) => printer::child_tokens(node, value, "value", ctx, out),
            None => Ok(()),
        }
    }

    fn wrap_child(&self, node: NodeRef<'_>, child: NodeRef<'_>, _role: &str) -> Wrap {
        match (node.operator(), child.behavior().precedence(child)) {
            (Some(op), Some(theirs)) if theirs < op.precedence => Wrap::Parens,
            _ => Wrap::No,
        }
    }
}

/// `and` and `or`, which fold to one of their operands.
#[derive(Debug, Clone, Copy)]
pub struct BoolOpBehavior {
    template: &'static str,
    precedence: u8,
    fold: fn(&Scalar, &Scalar) -> Scalar,
}

impl BoolOpBehavior {
    /// `lhs and rhs`.
    #[must_use]
    pub fn and() -> Self {
        Self {
            template: "{lhs} and {rhs}",
            precedence: crate::operators::AND,
            fold: fold::and,
        }
    }

    /// `lhs or rhs`.
    #[must_use]
    pub fn or() -> Self {
        Self {
            template: "{lhs} or {rhs}",
            precedence: crate::operators::OR,
            fold: fold::or,
        }
    }
}

impl Behavior for BoolOpBehavior {
    fn from_static_children(&self, _node: NodeRef<'_>, values: &[Scalar]) -> Option<Scalar> {
        match values {
            [lhs, rhs] => Some((self.fold)(lhs, rhs)),
            _ => None,
        }
    }

    fn command(&self) -> Option<&str> {
        Some(self.template)
    }

    fn precedence(&self, _node: NodeRef<'_>) -> Option<u8> {
        Some(self.precedence)
    }

    fn wrap_child(&self, _node: NodeRef<'_>, child: NodeRef<'_>, role: &str) -> Wrap {
        match child.behavior().precedence(child) {
            Some(theirs) if theirs < self.precedence => Wrap::Parens,
            Some(theirs) if theirs == self.precedence && role == "rhs" => Wrap::Parens,
            _ => Wrap::No,
        }
    }
}

/// Attribute access, subscripts and calls: the operand in `role` is
/// parenthesized unless it is a primary expression.
#[derive(Debug, Clone, Copy)]
pub struct PostfixBehavior {
    template: &'static str,
    role: &'static str,
}

impl PostfixBehavior {
    /// Prints `template`, guarding the child field `role`.
    #[must_use]
    pub const fn new(template: &'static str, role: &'static str) -> Self {
        Self { template, role }
    }
}

impl Behavior for PostfixBehavior {
    fn command(&self) -> Option<&str> {
        Some(self.template)
    }

    fn wrap_child(&self, _node: NodeRef<'_>, child: NodeRef<'_>, role: &str) -> Wrap {
        if role != self.role {
            return Wrap::No;
        }
        // `42.real` does not lex as an attribute access
        let numeric = child.is_leaf() && matches!(child.value(), Scalar::Int(_) | Scalar::Float(_));
        if numeric || child.behavior().precedence(child).is_some() {
            Wrap::Parens
        } else {
            Wrap::No
        }
    }
}

/// `then if cond else orelse`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TernaryBehavior;

impl Behavior for TernaryBehavior {
    fn from_static_children(&self, _node: NodeRef<'_>, values: &[Scalar]) -> Option<Scalar> {
        match values {
            [cond, then, orelse] => Some(if cond.is_truthy() { then } else { orelse }.clone()),
            _ => None,
        }
    }

    fn command(&self) -> Option<&str> {
        Some("{then} if {cond} else {orelse}")
    }

    fn precedence(&self, _node: NodeRef<'_>) -> Option<u8> {
        Some(TERNARY)
    }

    fn wrap_child(&self, _node: NodeRef<'_>, child: NodeRef<'_>, role: &str) -> Wrap {
        let loose = child
            .behavior()
            .precedence(child)
            .is_some_and(|p| p <= TERNARY);
        if loose && role != "orelse" {
            Wrap::Parens
        } else {
            Wrap::No
        }
    }
}

/// `(a, b)`, with the trailing comma of a one-element tuple.
#[derive(Debug, Clone, Copy, Default)]
pub struct TupleBehavior;

impl Behavior for TupleBehavior {
    fn tokens(
        &self,
        node: NodeRef<'_>,
        ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        out.push("(");
        let items = node.children_of("items");
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(", ");
            }
            printer::child_tokens(node, *item, "items", ctx, out)?;
        }
        if items.len() == 1 {
            out.push(",");
        }
        out.push(")");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ox_core::ast::{Arg, Head};
    use ox_core::Scalar;

    use crate::Python;

    fn render(py: &Python, head: &str, args: Vec<Arg>) -> String {
        let mut ast = py.ast();
        let id = ast
            .sexpr(py.types().expr, Head::from(head), args, Vec::new())
            .unwrap();
        ast.get(id).source().unwrap()
    }

    fn name(n: &str) -> Arg {
        Scalar::symbol(n).into()
    }

    #[test]
    fn atoms_print_as_literals() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let expr = py.types().expr;
        for (value, text) in [
            (Scalar::None, "None"),
            (Scalar::Bool(true), "True"),
            (Scalar::Int(42), "42"),
            (Scalar::Float(2.5), "2.5"),
            (Scalar::str("it's"), "'it\\'s'"),
        ] {
            let id = ast.coerce(expr, value.into()).unwrap();
            assert_eq!(ast.get(id).source().unwrap(), text);
        }
    }

    #[test]
    fn unary_operators() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let expr = py.types().expr;
        let sum = ast.sexpr(expr, "+".into(), vec![name("x"), 1.into()], Vec::new()).unwrap();
        let neg = ast.sexpr(expr, "-".into(), vec![sum.into()], Vec::new()).unwrap();
        assert_eq!(ast.get(neg).source().unwrap(), "-(x + 1)");

        let both = ast.sexpr(expr, "and".into(), vec![name("a"), name("b")], Vec::new()).unwrap();
        let not = ast.sexpr(expr, "not".into(), vec![both.into()], Vec::new()).unwrap();
        assert_eq!(ast.get(not).source().unwrap(), "not (a and b)");

        let pow = ast.sexpr(expr, "**".into(), vec![name("x"), 2.into()], Vec::new()).unwrap();
        let neg = ast.sexpr(expr, "-".into(), vec![pow.into()], Vec::new()).unwrap();
        assert_eq!(ast.get(neg).source().unwrap(), "-x ** 2");

        let neg = ast.sexpr(expr, "-".into(), vec![name("x")], Vec::new()).unwrap();
        let pow = ast.sexpr(expr, "**".into(), vec![neg.into(), 2.into()], Vec::new()).unwrap();
        assert_eq!(ast.get(pow).source().unwrap(), "(-x) ** 2");
    }

    #[test]
    fn signed_exponents_stay_bare() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let expr = py.types().expr;
        let neg = ast.sexpr(expr, "-".into(), vec![name("y")], Vec::new()).unwrap();
        let pow = ast.sexpr(expr, "**".into(), vec![2.into(), neg.into()], Vec::new()).unwrap();
        assert_eq!(ast.get(pow).source().unwrap(), "2 ** -y");

        let pow = ast.sexpr(expr, "**".into(), vec![2.into(), (-1).into()], Vec::new()).unwrap();
        assert_eq!(ast.get(pow).source().unwrap(), "2 ** -1");

        let inv = ast.sexpr(expr, "~".into(), vec![name("y")], Vec::new()).unwrap();
        let pow = ast.sexpr(expr, "**".into(), vec![name("x"), inv.into()], Vec::new()).unwrap();
        let neg = ast.sexpr(expr, "-".into(), vec![pow.into()], Vec::new()).unwrap();
        assert_eq!(ast.get(neg).source().unwrap(), "-x ** ~y");

        assert_eq!(py.reformat("x = 2 ** (-y)\n").unwrap(), "x = 2 ** -y\n");
    }

    #[test]
    fn comparisons_do_not_chain() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let expr = py.types().expr;
        let lt = ast.sexpr(expr, "<".into(), vec![name("a"), name("b")], Vec::new()).unwrap();
        let outer = ast.sexpr(expr, "<".into(), vec![lt.into(), name("c")], Vec::new()).unwrap();
        assert_eq!(ast.get(outer).source().unwrap(), "(a < b) < c");

        let sum = ast.sexpr(expr, "+".into(), vec![name("a"), 1.into()], Vec::new()).unwrap();
        let eq = ast.sexpr(expr, "==".into(), vec![sum.into(), name("b")], Vec::new()).unwrap();
        assert_eq!(ast.get(eq).source().unwrap(), "a + 1 == b");
    }

    #[test]
    fn only_the_same_operator_regroups() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let expr = py.types().expr;
        let mut build = |head: &str, lhs: Arg, rhs: Arg| {
            ast.sexpr(expr, head.into(), vec![lhs, rhs], Vec::new()).unwrap()
        };
        let inner = build("+", name("b"), name("c"));
        let same = build("+", name("a"), inner.into());
        let inner = build("-", name("b"), name("c"));
        let mixed = build("+", name("a"), inner.into());
        let inner = build("//", name("b"), name("c"));
        let div = build("*", name("a"), inner.into());
        assert_eq!(ast.get(same).source().unwrap(), "a + b + c");
        assert_eq!(ast.get(mixed).source().unwrap(), "a + (b - c)");
        assert_eq!(ast.get(div).source().unwrap(), "a * (b // c)");
    }

    #[test]
    fn boolean_operators() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let expr = py.types().expr;
        let or = ast.sexpr(expr, "or".into(), vec![name("a"), name("b")], Vec::new()).unwrap();
        let and = ast.sexpr(expr, "and".into(), vec![or.into(), name("c")], Vec::new()).unwrap();
        assert_eq!(ast.get(and).source().unwrap(), "(a or b) and c");

        let inner = ast.sexpr(expr, "and".into(), vec![name("b"), name("c")], Vec::new()).unwrap();
        let and = ast.sexpr(expr, "and".into(), vec![name("a"), inner.into()], Vec::new()).unwrap();
        assert_eq!(ast.get(and).source().unwrap(), "a and (b and c)");

        let folded = ast.sexpr(expr, "or".into(), vec![0.into(), "x".into()], Vec::new()).unwrap();
        let folded = ast.simplify(folded).unwrap();
        assert_eq!(ast.get(folded).value(), &Scalar::str("x"));
    }

    #[test]
    fn postfix_operands() {
        let py = Python::new().unwrap();
        assert_eq!(render(&py, ".", vec![42.into(), "y".into()]), "(42).y");
        assert_eq!(render(&py, ".", vec![name("x"), "y".into()]), "x.y");
        assert_eq!(render(&py, "[]", vec![name("xs"), 0.into()]), "xs[0]");

        let mut ast = py.ast();
        let expr = py.types().expr;
        let sum = ast
            .sexpr(expr, "+".into(), vec![name("a"), name("b")], Vec::new())
            .unwrap();
        let attr = ast
            .sexpr(expr, ".".into(), vec![sum.into(), "real".into()], Vec::new())
            .unwrap();
        assert_eq!(ast.get(attr).source().unwrap(), "(a + b).real");
    }

    #[test]
    fn calls_with_keywords() {
        let py = Python::new().unwrap();
        let mut ast = py.ast();
        let expr = py.types().expr;
        let call = ast
            .sexpr(
                expr,
                "()".into(),
                vec![name("fn"), name("x")],
                vec![("y".into(), 42.into())],
            )
            .unwrap();
        assert_eq!(ast.get(call).source().unwrap(), "fn(x, y=42)");
        assert_eq!(render(&py, "()", vec![name("f")]), "f()");
    }

    #[test]
    fn ternary() {
        let py = Python::new().unwrap();
        assert_eq!(render(&py, "if", vec![name("c"), name("x"), name("y")]), "x if c else y");

        let mut ast = py.ast();
        let expr = py.types().expr;
        let inner = ast
            .sexpr(expr, "if".into(), vec![name("c"), name("x"), name("y")], Vec::new())
            .unwrap();
        let outer = ast
            .sexpr(expr, "if".into(), vec![inner.into(), 1.into(), 2.into()], Vec::new())
            .unwrap();
        assert_eq!(ast.get(outer).source().unwrap(), "1 if (x if c else y) else 2");

        let folded = ast
            .sexpr(expr, "if".into(), vec![true.into(), 1.into(), 2.into()], Vec::new())
            .unwrap();
        let folded = ast.simplify(folded).unwrap();
        assert_eq!(ast.get(folded).value(), &Scalar::Int(1));
    }

    #[test]
    fn containers() {
        let py = Python::new().unwrap();
        let types = py.types();
        let mut ast = py.ast();
        let empty = ast.node(types.tuple, Vec::new()).unwrap();
        assert_eq!(ast.get(empty).source().unwrap(), "()");
        let single = ast.node(types.tuple, vec![name("x")]).unwrap();
        assert_eq!(ast.get(single).source().unwrap(), "(x,)");
        let pair = ast.node(types.tuple, vec![1.into(), 2.into()]).unwrap();
        assert_eq!(ast.get(pair).source().unwrap(), "(1, 2)");

        let list = ast
            .coerce(types.expr, Arg::List(vec![1.into(), name("y")]))
            .unwrap();
        assert_eq!(ast.get(list).ty(), types.list);
        assert_eq!(ast.get(list).source().unwrap(), "[1, y]");
    }
}
