// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Per-type behavior: printing, folding and name binding.
//!
//! Each registered type carries one [`Behavior`]. Every method has a
//! default, so a type only overrides what it needs: most node types set
//! nothing but a [`command`](Behavior::command) template.

use std::fmt;

use ecow::EcoString;

use super::NodeRef;
use crate::operators::OperatorInfo;
use crate::printer::{self, Fragments, PrintContext, PrintError, Wrap};
use crate::source_analysis::Scalar;

/// Hooks a node type provides to the generic algorithms.
pub trait Behavior: fmt::Debug + Send + Sync {
    /// The node's value if it is known without evaluation. Atomic leaves
    /// report their value; everything else is unknown.
    fn static_value(&self, node: NodeRef<'_>) -> Option<Scalar> {
        let info = node.info();
        (info.leaf && info.atomic).then(|| node.value().clone())
    }

    /// Folds a node whose children all have known `values`. Returning
    /// `None` keeps the node.
    fn from_static_children(&self, node: NodeRef<'_>, values: &[Scalar]) -> Option<Scalar> {
        let _ = (node, values);
        None
    }

    /// Names this node binds for its children, removed from their free
    /// variables.
    fn bound_names(&self, node: NodeRef<'_>) -> Vec<EcoString> {
        let _ = node;
        Vec::new()
    }

    /// Printing template, e.g. `"{value}.{attr}"`.
    fn command(&self) -> Option<&str> {
        None
    }

    /// Binding strength of this node when printed inside another.
    fn precedence(&self, node: NodeRef<'_>) -> Option<u8> {
        let _ = node;
        None
    }

    /// Emits the node's source fragments.
    ///
    /// The default fills the [`command`](Behavior::command) template, or
    /// prints a leaf's value as a literal.
    fn tokens(
        &self,
        node: NodeRef<'_>,
        ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        if let Some(template) = self.command() {
            return printer::fill_template(node, template, ctx, out);
        }
        if node.is_leaf() {
            out.push(node.value().repr());
            return Ok(());
        }
        Err(PrintError::NoRenderer(node.type_name().clone()))
    }

    /// How to wrap `child`, printed in the field `role` of `node`.
    fn wrap_child(&self, node: NodeRef<'_>, child: NodeRef<'_>, role: &str) -> Wrap {
        let _ = (node, child, role);
        Wrap::No
    }
}

/// Behavior of types that set none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl Behavior for DefaultBehavior {}

/// Prints a generic tree as its comma-separated children.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct TreeBehavior;

impl Behavior for TreeBehavior {
    fn tokens(
        &self,
        node: NodeRef<'_>,
        ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        for (i, child) in node.children().enumerate() {
            if i > 0 {
                out.push(", ");
            }
            printer::child_tokens(node, child, "children", ctx, out)?;
        }
        Ok(())
    }
}

/// Prints a token leaf as its source text.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct TokenBehavior;

impl Behavior for TokenBehavior {
    fn tokens(
        &self,
        node: NodeRef<'_>,
        _ctx: &mut PrintContext,
        out: &mut Fragments,
    ) -> Result<(), PrintError> {
        match node.meta("raw") {
            Some(super::Attr::Scalar(raw)) => out.push(raw.to_string()),
            _ => out.push(node.value().to_string()),
        }
        Ok(())
    }
}

/// Folds two known operands of a binary operator.
pub type BinaryFold = fn(&OperatorInfo, &Scalar, &Scalar) -> Option<Scalar>;

/// Behavior of nodes tagged with a binary operator.
///
/// The node's tag supplies the operator. A child is parenthesized when it
/// binds more loosely than the operator, and at equal precedence when
/// printing it bare would regroup the expression: the left operand of a
/// right-associative operator, or the right operand of a left-associative
/// one that is not [regroupable](BinaryOperator::regroupable).
#[derive(Debug, Clone)]
pub struct BinaryOperator {
    template: EcoString,
    regroupable: Vec<&'static str>,
    fold: Option<BinaryFold>,
}

impl Default for BinaryOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryOperator {
    /// Prints as `"{lhs} {op} {rhs}"`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            template: "{lhs} {op} {rhs}".into(),
            regroupable: Vec::new(),
            fold: None,
        }
    }

    /// Replaces the printing template.
    #[must_use]
    pub fn template(mut self, template: impl Into<EcoString>) -> Self {
        self.template = template.into();
        self
    }

    /// Operators, by member name, whose right operand may be printed bare
    /// at equal precedence because regrouping keeps the meaning.
    #[must_use]
    pub fn regroupable(mut self, ops: impl IntoIterator<Item = &'static str>) -> Self {
        self.regroupable.extend(ops);
        self
    }

    /// Folds nodes whose operands are both known.
    #[must_use]
    pub fn fold(mut self, fold: BinaryFold) -> Self {
        self.fold = Some(fold);
        self
    }
}

impl Behavior for BinaryOperator {
    fn from_static_children(&self, node: NodeRef<'_>, values: &[Scalar]) -> Option<Scalar> {
        let fold = self.fold?;
        let op = node.operator()?;
        match values {
            [lhs, rhs] => fold(op, lhs, rhs),
            _ => None,
        }
    }

    fn command(&self) -> Option<&str> {
        Some(&self.template)
    }

    fn precedence(&self, node: NodeRef<'_>) -> Option<u8> {
        node.operator().map(|op| op.precedence)
    }

    fn wrap_child(&self, node: NodeRef<'_>, child: NodeRef<'_>, role: &str) -> Wrap {
        let Some(op) = node.operator() else {
            return Wrap::No;
        };
        let Some(theirs) = child.behavior().precedence(child) else {
            return Wrap::No;
        };
        if theirs < op.precedence {
            return Wrap::Parens;
        }
        if theirs > op.precedence {
            return Wrap::No;
        }
        let is_lhs = node
            .info()
            .child_fields()
            .first()
            .is_some_and(|f| f.name == role);
        let regroups = if is_lhs {
            op.is_right_assoc()
        } else {
            !op.is_right_assoc() && !self.regroupable.contains(&op.name)
        };
        if regroups {
            Wrap::Parens
        } else {
            Wrap::No
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Arg, Ast, FieldType, NodeId, RegistryBuilder, TypeDecl, TypeId};
    use crate::operators::{Associativity, OperatorFamily};
    use crate::source_analysis::ScalarKind;

    fn arith(a: &OperatorInfo, l: &Scalar, r: &Scalar) -> Option<Scalar> {
        let (l, r) = (l.as_int()?, r.as_int()?);
        match a.name {
            "ADD" => l.checked_add(r).map(Scalar::Int),
            "SUB" => l.checked_sub(r).map(Scalar::Int),
            "MUL" => l.checked_mul(r).map(Scalar::Int),
            "POW" => u32::try_from(r).ok().and_then(|r| l.checked_pow(r)).map(Scalar::Int),
            _ => None,
        }
    }

    fn family() -> OperatorFamily {
        let op = |name, symbol, precedence, associativity| OperatorInfo {
            name,
            symbol,
            precedence,
            associativity,
        };
        OperatorFamily::new(
            "Op",
            [
                op("ADD", "+", 1, Associativity::Left),
                op("SUB", "-", 1, Associativity::Left),
                op("MUL", "*", 2, Associativity::Left),
                op("POW", "**", 3, Associativity::Right),
            ],
        )
    }

    fn setup() -> (Ast, TypeId, TypeId) {
        let mut builder = RegistryBuilder::new();
        let expr = builder.declare(TypeDecl::node("Expr").root().abstract_());
        builder.declare(
            TypeDecl::leaf("Num")
                .extends(expr)
                .atomic()
                .coerces([ScalarKind::Int]),
        );
        builder.declare(
            TypeDecl::leaf("Var")
                .extends(expr)
                .name_leaf()
                .coerces([ScalarKind::Symbol])
                .behavior(VarBehavior),
        );
        let binop = builder.declare(
            TypeDecl::node("BinOp")
                .extends(expr)
                .field("op", FieldType::Tag(family()))
                .field("lhs", FieldType::Child(expr.into()))
                .field("rhs", FieldType::Child(expr.into()))
                .behavior(BinaryOperator::new().regroupable(["ADD", "MUL"]).fold(arith)),
        );
        (Ast::new(builder.finish().unwrap()), expr, binop)
    }

    #[derive(Debug)]
    struct VarBehavior;

    impl Behavior for VarBehavior {
        fn tokens(
            &self,
            node: NodeRef<'_>,
            _ctx: &mut PrintContext,
            out: &mut Fragments,
        ) -> Result<(), PrintError> {
            out.push(node.value().to_string());
            Ok(())
        }
    }

    fn op(ast: &mut Ast, binop: TypeId, name: &str, l: Arg, r: Arg) -> NodeId {
        ast.node(binop, vec![Scalar::symbol(name).into(), l, r]).unwrap()
    }

    fn var(name: &str) -> Arg {
        Scalar::symbol(name).into()
    }

    #[test]
    fn lower_precedence_children_are_wrapped() {
        let (mut ast, _, binop) = setup();
        let sum = op(&mut ast, binop, "ADD", var("x"), 1.into());
        let tail = op(&mut ast, binop, "MUL", var("y"), 2.into());
        let product = op(&mut ast, binop, "MUL", sum.into(), tail.into());
        assert_eq!(ast.get(product).source().unwrap(), "(x + 1) * y * 2");
    }

    #[test]
    fn non_regroupable_right_operand_is_wrapped() {
        let (mut ast, _, binop) = setup();
        let inner = op(&mut ast, binop, "SUB", var("b"), var("c"));
        let outer = op(&mut ast, binop, "SUB", var("a"), inner.into());
        assert_eq!(ast.get(outer).source().unwrap(), "a - (b - c)");

        let inner = op(&mut ast, binop, "SUB", var("a"), var("b"));
        let outer = op(&mut ast, binop, "SUB", inner.into(), var("c"));
        assert_eq!(ast.get(outer).source().unwrap(), "a - b - c");
    }

    #[test]
    fn right_associative_left_operand_is_wrapped() {
        let (mut ast, _, binop) = setup();
        let inner = op(&mut ast, binop, "POW", var("a"), var("b"));
        let outer = op(&mut ast, binop, "POW", inner.into(), var("c"));
        assert_eq!(ast.get(outer).source().unwrap(), "(a ** b) ** c");

        let inner = op(&mut ast, binop, "POW", var("b"), var("c"));
        let outer = op(&mut ast, binop, "POW", var("a"), inner.into());
        assert_eq!(ast.get(outer).source().unwrap(), "a ** b ** c");
    }

    #[test]
    fn binary_fold() {
        let (mut ast, _, binop) = setup();
        let node = op(&mut ast, binop, "MUL", 6.into(), 7.into());
        let folded = ast.simplify(node).unwrap();
        assert_eq!(ast.get(folded).value(), &Scalar::Int(42));
        assert_eq!(ast.get(folded).type_name(), "Num");
    }

    #[test]
    fn default_leaf_prints_literal() {
        let (mut ast, expr, _) = setup();
        let num = ast.coerce(expr, 5.into()).unwrap();
        assert_eq!(ast.get(num).source().unwrap(), "5");
    }
}
