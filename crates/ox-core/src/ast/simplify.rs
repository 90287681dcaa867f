// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Constant folding and free-variable analysis.

use std::collections::BTreeSet;

use ecow::EcoString;

use super::{Arg, Ast, AstError, NodeId, NodeRef};

impl Ast {
    /// Returns the node's value if it is statically known.
    #[must_use]
    pub fn static_value(&self, id: NodeId) -> Option<crate::Scalar> {
        self.get(id).static_value()
    }

    /// Returns a simplified copy of a node; the original is untouched.
    ///
    /// A node whose children all have known values is folded by its
    /// behavior. Otherwise its children are simplified and, if any of them
    /// changed, the rebuilt node gets one more chance to fold.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn simplify(&mut self, id: NodeId) -> Result<NodeId, AstError> {
        if let Some(folded) = self.try_fold(id) {
            return Ok(folded);
        }
        let originals: Vec<NodeId> = self.get(id).children().map(NodeRef::id).collect();
        let mut children = Vec::with_capacity(originals.len());
        let mut changed = false;
        for original in originals {
            let simplified = self.simplify(original)?;
            changed |= !self.structurally_equal(simplified, original);
            children.push(simplified);
        }
        let rebuilt = self.rebuild(id, children);
        if !changed {
            return Ok(rebuilt);
        }
        Ok(self.try_fold(rebuilt).unwrap_or(rebuilt))
    }

    /// Folds `id` into a leaf if every child is known and the behavior
    /// produces a value the hierarchy can hold.
    fn try_fold(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id);
        let mut values = Vec::with_capacity(node.info().child_fields().len());
        for child in node.children() {
            values.push(child.static_value()?);
        }
        let value = node.behavior().from_static_children(node, &values)?;
        let root = node.info().root;
        match self.coerce(root, Arg::Scalar(value)) {
            Ok(leaf) => Some(leaf),
            Err(err) => {
                tracing::trace!(%err, "folded value has no leaf type");
                None
            }
        }
    }

    /// Names used in a node and not bound around their use.
    #[must_use]
    pub fn free_vars(&self, id: NodeId) -> BTreeSet<EcoString> {
        self.free_vars_with(id, &BTreeSet::new(), &BTreeSet::new())
    }

    /// Like [`free_vars`](Self::free_vars), treating `exclude` as bound
    /// and adding `include` to the result.
    #[must_use]
    pub fn free_vars_with(
        &self,
        id: NodeId,
        exclude: &BTreeSet<EcoString>,
        include: &BTreeSet<EcoString>,
    ) -> BTreeSet<EcoString> {
        let mut out = include.clone();
        collect_free(self.get(id), exclude, &mut out);
        out
    }
}

fn collect_free(node: NodeRef<'_>, bound: &BTreeSet<EcoString>, out: &mut BTreeSet<EcoString>) {
    if node.info().name_leaf {
        if let Some(name) = node.value().as_str() {
            if !bound.contains(name) {
                out.insert(name.into());
            }
        }
        return;
    }
    let binds = node.behavior().bound_names(node);
    if binds.is_empty() {
        for child in node.children() {
            collect_free(child, bound, out);
        }
        return;
    }
    let mut inner = bound.clone();
    inner.extend(binds);
    for child in node.children() {
        collect_free(child, &inner, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Behavior, FieldType, RegistryBuilder, TypeDecl, TypeId};
    use crate::operators::{Associativity, OperatorFamily, OperatorInfo};
    use crate::source_analysis::{Scalar, ScalarKind};
    use crate::ast::BinaryOperator;

    fn add(op: &OperatorInfo, l: &Scalar, r: &Scalar) -> Option<Scalar> {
        match op.name {
            "ADD" => Some(Scalar::Int(l.as_int()?.checked_add(r.as_int()?)?)),
            _ => None,
        }
    }

    #[derive(Debug)]
    struct Lambda;

    impl Behavior for Lambda {
        fn bound_names(&self, node: NodeRef<'_>) -> Vec<EcoString> {
            node.attr("param")
                .and_then(Scalar::as_str)
                .map(EcoString::from)
                .into_iter()
                .collect()
        }
    }

    struct Fixture {
        ast: Ast,
        bin: TypeId,
        lambda: TypeId,
        call: TypeId,
    }

    fn fixture() -> Fixture {
        let mut b = RegistryBuilder::new();
        let expr = b.declare(TypeDecl::node("Expr").root().abstract_());
        b.declare(
            TypeDecl::leaf("Num")
                .extends(expr)
                .atomic()
                .coerces([ScalarKind::Int]),
        );
        b.declare(
            TypeDecl::leaf("Name")
                .extends(expr)
                .name_leaf()
                .coerces([ScalarKind::Symbol]),
        );
        let family = OperatorFamily::new(
            "Op",
            [
                OperatorInfo {
                    name: "ADD",
                    symbol: "+",
                    precedence: 1,
                    associativity: Associativity::Left,
                },
                OperatorInfo {
                    name: "CAT",
                    symbol: "++",
                    precedence: 1,
                    associativity: Associativity::Left,
                },
            ],
        );
        let bin = b.declare(
            TypeDecl::node("BinOp")
                .extends(expr)
                .field("op", FieldType::Tag(family))
                .field("lhs", FieldType::Child(expr.into()))
                .field("rhs", FieldType::Child(expr.into()))
                .behavior(BinaryOperator::new().fold(add)),
        );
        let lambda = b.declare(
            TypeDecl::node("Lambda")
                .extends(expr)
                .field("body", FieldType::Child(expr.into()))
                .field("param", FieldType::Scalar(ScalarKind::Symbol))
                .behavior(Lambda),
        );
        let call = b.declare(
            TypeDecl::node("Call")
                .extends(expr)
                .field("func", FieldType::Child(expr.into()))
                .field("args", FieldType::Children(expr.into())),
        );
        Fixture {
            ast: Ast::new(b.finish().unwrap()),
            bin,
            lambda,
            call,
        }
    }

    fn sym(name: &str) -> Arg {
        Scalar::symbol(name).into()
    }

    #[test]
    fn known_children_fold() {
        let mut f = fixture();
        let inner = f.ast.node(f.bin, vec!["ADD".into(), 1.into(), 2.into()]).unwrap();
        let outer = f.ast.node(f.bin, vec!["ADD".into(), inner.into(), 3.into()]).unwrap();
        let folded = f.ast.simplify(outer).unwrap();
        assert_eq!(f.ast.get(folded).value(), &Scalar::Int(6));
        assert_eq!(f.ast.static_value(folded), Some(Scalar::Int(6)));
        // the input is left alone
        assert_eq!(f.ast.get(outer).children().count(), 2);
    }

    #[test]
    fn unknown_children_block_folding() {
        let mut f = fixture();
        let known = f.ast.node(f.bin, vec!["ADD".into(), 1.into(), 2.into()]).unwrap();
        let node = f.ast.node(f.bin, vec!["ADD".into(), sym("x"), known.into()]).unwrap();
        let simplified = f.ast.simplify(node).unwrap();
        assert_eq!(format!("{:?}", f.ast.get(simplified)), "BinOp(ADD, Name(x), Num(3))");
    }

    #[test]
    fn unchanged_nodes_are_copied() {
        let mut f = fixture();
        let node = f.ast.node(f.bin, vec!["ADD".into(), sym("x"), sym("y")]).unwrap();
        let simplified = f.ast.simplify(node).unwrap();
        assert_ne!(simplified, node);
        assert!(f.ast.structurally_equal(simplified, node));
        assert!(f.ast.get(simplified).parent().is_none());
    }

    #[test]
    fn unfoldable_operators_stay() {
        let mut f = fixture();
        let node = f.ast.node(f.bin, vec!["CAT".into(), 1.into(), 2.into()]).unwrap();
        let simplified = f.ast.simplify(node).unwrap();
        assert!(f.ast.structurally_equal(simplified, node));
    }

    #[test]
    fn free_variables_are_lexical() {
        let mut f = fixture();
        let body = f.ast.node(f.bin, vec!["ADD".into(), sym("x"), sym("y")]).unwrap();
        let lambda = f
            .ast
            .node(f.lambda, vec![body.into(), sym("x")])
            .unwrap();
        let call = f.ast.node(f.call, vec![lambda.into(), sym("x"), sym("z")]).unwrap();

        let names: Vec<_> = f.ast.free_vars(lambda).into_iter().collect();
        assert_eq!(names, ["y"]);
        let names: Vec<_> = f.ast.free_vars(call).into_iter().collect();
        assert_eq!(names, ["x", "y", "z"]);

        let exclude = BTreeSet::from(["z".into()]);
        let include = BTreeSet::from(["w".into()]);
        let names: Vec<_> = f
            .ast
            .free_vars_with(call, &exclude, &include)
            .into_iter()
            .collect();
        assert_eq!(names, ["w", "x", "y"]);
    }
}
