// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! S-expression construction.
//!
//! Every hierarchy root owns a table from heads to constructors. A head is
//! a type, a symbol such as `"+"`, an operator family member, or an inline
//! constructor function. Tables are filled when the registry is finished;
//! the helpers here build the constructors that operator symbols usually
//! map to.

use std::fmt;
use std::sync::Arc;

use ecow::EcoString;

use super::{Arg, Ast, AstError, FieldKind, NodeId, TypeId};
use crate::operators::Operator;
use crate::source_analysis::Scalar;

/// Builds a node from positional and keyword arguments.
pub type Constructor = Arc<
    dyn Fn(&mut Ast, Vec<Arg>, Vec<(EcoString, Arg)>) -> Result<NodeId, AstError> + Send + Sync,
>;

/// A key in a root's S-expression table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeadKey {
    /// A concrete type.
    Type(TypeId),
    /// A symbol, e.g. `"+"` or `"if"`.
    Symbol(EcoString),
    /// A member of an operator family.
    Member {
        /// Family name.
        family: EcoString,
        /// Member name.
        name: EcoString,
    },
}

impl HeadKey {
    /// Key for an operator member.
    pub fn member<O: Operator>(op: O) -> Self {
        Self::Member {
            family: O::FAMILY.into(),
            name: op.name().into(),
        }
    }
}

impl fmt::Display for HeadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(ty) => write!(f, "type {}", ty.index()),
            Self::Symbol(symbol) => write!(f, "{symbol:?}"),
            Self::Member { family, name } => write!(f, "{family}.{name}"),
        }
    }
}

impl From<&str> for HeadKey {
    fn from(symbol: &str) -> Self {
        Self::Symbol(symbol.into())
    }
}

impl From<TypeId> for HeadKey {
    fn from(ty: TypeId) -> Self {
        Self::Type(ty)
    }
}

/// The head of an S-expression.
#[derive(Clone)]
pub enum Head {
    /// A concrete type.
    Type(TypeId),
    /// A registered symbol. Falls back to a type name of the same
    /// hierarchy.
    Symbol(EcoString),
    /// A member of an operator family.
    Member {
        /// Family name.
        family: EcoString,
        /// Member name.
        name: EcoString,
    },
    /// A constructor called directly.
    Func(Constructor),
}

impl Head {
    /// Head for an operator member.
    pub fn member<O: Operator>(op: O) -> Self {
        Self::Member {
            family: O::FAMILY.into(),
            name: op.name().into(),
        }
    }
}

impl fmt::Debug for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(ty) => f.debug_tuple("Type").field(ty).finish(),
            Self::Symbol(s) => f.debug_tuple("Symbol").field(s).finish(),
            Self::Member { family, name } => f
                .debug_struct("Member")
                .field("family", family)
                .field("name", name)
                .finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<&str> for Head {
    fn from(symbol: &str) -> Self {
        Self::Symbol(symbol.into())
    }
}

impl From<TypeId> for Head {
    fn from(ty: TypeId) -> Self {
        Self::Type(ty)
    }
}

impl From<Constructor> for Head {
    fn from(f: Constructor) -> Self {
        Self::Func(f)
    }
}

impl Ast {
    /// Builds a node from an S-expression in the hierarchy of `root`.
    ///
    /// Type heads are looked up in their own hierarchy's table.
    pub fn sexpr(
        &mut self,
        root: TypeId,
        head: Head,
        args: Vec<Arg>,
        kwargs: Vec<(EcoString, Arg)>,
    ) -> Result<NodeId, AstError> {
        let registry = Arc::clone(self.registry());
        let root = registry.root_of(root);
        let (root, key) = match head {
            Head::Func(f) => return self.transaction(|ast| f(ast, args, kwargs)),
            Head::Type(ty) => {
                let info = registry.info(ty);
                if info.is_abstract {
                    return Err(AstError::AbstractType(info.name.clone()));
                }
                (info.root, HeadKey::Type(ty))
            }
            Head::Symbol(symbol) => {
                let key = HeadKey::Symbol(symbol.clone());
                if registry.constructor(root, &key).is_none() {
                    let same_root = |ty: &TypeId| registry.root_of(*ty) == root;
                    if let Some(ty) = registry.lookup(&symbol).filter(same_root) {
                        return self.sexpr(root, Head::Type(ty), args, kwargs);
                    }
                }
                (root, key)
            }
            Head::Member { family, name } => (root, HeadKey::Member { family, name }),
        };
        match registry.constructor(root, &key) {
            Some(ctor) => self.transaction(|ast| ctor(ast, args, kwargs)),
            None => Err(AstError::InvalidHead(key.to_string())),
        }
    }
}

fn tag_of(ast: &Ast, ty: TypeId, op: &str) -> Result<(Scalar, bool), AstError> {
    let info = ast.registry().info(ty);
    let Some(FieldKind::Tag(family)) = info.tag_field().map(|f| &f.kind) else {
        return Err(AstError::InvalidHead(format!("{} has no operator tag", info.name)));
    };
    let member = family
        .resolve(op)
        .ok_or_else(|| AstError::UnknownOperator {
            family: family.name().into(),
            name: op.into(),
        })?;
    Ok((Scalar::symbol(member.name), member.is_right_assoc()))
}

/// A constructor for the binary operator `op` on the tagged type `ty`.
///
/// More than two arguments are folded by the operator's associativity:
/// `(+ a b c)` is `(a + b) + c`, `(** a b c)` is `a ** (b ** c)`.
pub fn binary_constructor(ty: TypeId, op: &'static str) -> Constructor {
    Arc::new(
        move |ast: &mut Ast, args: Vec<Arg>, kwargs: Vec<(EcoString, Arg)>| {
            if args.len() < 2 {
                return Err(AstError::Arity {
                    ty: ast.registry().info(ty).name.clone(),
                    expected: "at least 2".into(),
                    found: args.len(),
                });
            }
            let (tag, right) = tag_of(ast, ty, op)?;
            let mut args = args;
            if right {
                args.reverse();
            }
            let mut args = args.into_iter();
            let (Some(first), Some(second)) = (args.next(), args.next()) else {
                unreachable!("length checked above")
            };
            let pair = |a: Arg, b: Arg| {
                if right {
                    vec![tag.clone().into(), b, a]
                } else {
                    vec![tag.clone().into(), a, b]
                }
            };
            let mut acc = ast.new_node(ty, pair(first, second), kwargs.clone())?;
            for next in args {
                acc = ast.new_node(ty, pair(acc.into(), next), kwargs.clone())?;
            }
            Ok(acc)
        },
    )
}

/// A constructor for the unary operator `op` on the tagged type `ty`.
pub fn unary_constructor(ty: TypeId, op: &'static str) -> Constructor {
    Arc::new(
        move |ast: &mut Ast, args: Vec<Arg>, kwargs: Vec<(EcoString, Arg)>| {
            if args.len() != 1 {
                return Err(AstError::Arity {
                    ty: ast.registry().info(ty).name.clone(),
                    expected: "1".into(),
                    found: args.len(),
                });
            }
            let (tag, _) = tag_of(ast, ty, op)?;
            let mut full = vec![tag.into()];
            full.extend(args);
            ast.new_node(ty, full, kwargs)
        },
    )
}

/// A constructor that is unary with one argument and binary otherwise,
/// for symbols like `-`.
pub fn flexible_constructor(
    unary: (TypeId, &'static str),
    binary: (TypeId, &'static str),
) -> Constructor {
    let unary = unary_constructor(unary.0, unary.1);
    let binary = binary_constructor(binary.0, binary.1);
    Arc::new(
        move |ast: &mut Ast, args: Vec<Arg>, kwargs: Vec<(EcoString, Arg)>| {
            if args.len() == 1 {
                unary(ast, args, kwargs)
            } else {
                binary(ast, args, kwargs)
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldType, RegistryBuilder, TypeDecl};
    use crate::operators::{Associativity, OperatorFamily, OperatorInfo};
    use crate::source_analysis::ScalarKind;

    fn family(name: &str) -> OperatorFamily {
        let op = |name, symbol, precedence, associativity| OperatorInfo {
            name,
            symbol,
            precedence,
            associativity,
        };
        match name {
            "Bin" => OperatorFamily::new(
                "Bin",
                [
                    op("SUB", "-", 1, Associativity::Left),
                    op("POW", "**", 3, Associativity::Right),
                ],
            ),
            _ => OperatorFamily::new("Un", [op("NEG", "-", 2, Associativity::Left)]),
        }
    }

    fn setup() -> (Ast, TypeId, TypeId, TypeId) {
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
        let bin = b.declare(
            TypeDecl::node("BinOp")
                .extends(expr)
                .field("op", FieldType::Tag(family("Bin")))
                .field("lhs", FieldType::Child(expr.into()))
                .field("rhs", FieldType::Child(expr.into())),
        );
        let un = b.declare(
            TypeDecl::node("UnaryOp")
                .extends(expr)
                .field("op", FieldType::Tag(family("Un")))
                .field("value", FieldType::Child(expr.into())),
        );
        b.sexpr(expr, "-", flexible_constructor((un, "NEG"), (bin, "SUB")))
            .sexpr(expr, "**", binary_constructor(bin, "POW"));
        (Ast::new(b.finish().unwrap()), expr, bin, un)
    }

    fn render(ast: &Ast, id: NodeId) -> String {
        format!("{:?}", ast.get(id))
    }

    #[test]
    fn symbols_dispatch_by_arity() {
        let (mut ast, expr, bin, un) = setup();
        let neg = ast.sexpr(expr, "-".into(), vec![1.into()], Vec::new()).unwrap();
        assert_eq!(ast.get(neg).ty(), un);
        let sub = ast
            .sexpr(expr, "-".into(), vec![1.into(), 2.into(), 3.into()], Vec::new())
            .unwrap();
        assert_eq!(ast.get(sub).ty(), bin);
        assert_eq!(render(&ast, sub), "BinOp(SUB, BinOp(SUB, Num(1), Num(2)), Num(3))");
    }

    #[test]
    fn right_associative_folding() {
        let (mut ast, expr, _, _) = setup();
        let pow = ast
            .sexpr(
                expr,
                "**".into(),
                vec![1.into(), 2.into(), 3.into()],
                Vec::new(),
            )
            .unwrap();
        assert_eq!(render(&ast, pow), "BinOp(POW, Num(1), BinOp(POW, Num(2), Num(3)))");
    }

    #[test]
    fn members_and_types_are_heads() {
        let (mut ast, expr, bin, _) = setup();
        let head = Head::Member {
            family: "Bin".into(),
            name: "SUB".into(),
        };
        let id = ast
            .sexpr(expr, head, vec![Scalar::symbol("x").into(), 1.into()], Vec::new())
            .unwrap();
        assert_eq!(render(&ast, id), "BinOp(SUB, Name(x), Num(1))");

        let id = ast
            .sexpr(expr, bin.into(), vec!["-".into(), 1.into(), 2.into()], Vec::new())
            .unwrap();
        assert_eq!(ast.get(id).tag(), Some(&Scalar::symbol("SUB")));

        let id = ast
            .sexpr(expr, "UnaryOp".into(), vec!["NEG".into(), 1.into()], Vec::new())
            .unwrap();
        assert_eq!(render(&ast, id), "UnaryOp(NEG, Num(1))");
    }

    #[test]
    fn head_errors() {
        let (mut ast, expr, _, _) = setup();
        assert_eq!(
            ast.sexpr(expr, "%".into(), vec![1.into()], Vec::new())
                .unwrap_err(),
            AstError::InvalidHead("\"%\"".into())
        );
        assert_eq!(
            ast.sexpr(expr, expr.into(), Vec::new(), Vec::new())
                .unwrap_err(),
            AstError::AbstractType("Expr".into())
        );
        assert!(matches!(
            ast.sexpr(expr, "**".into(), vec![1.into()], Vec::new()),
            Err(AstError::Arity { .. })
        ));
    }

    #[test]
    fn inline_functions() {
        let (mut ast, expr, _, _) = setup();
        let f: Constructor = Arc::new(|ast: &mut Ast, args: Vec<Arg>, _: Vec<(EcoString, Arg)>| {
            let root = ast.registry().lookup("Expr").unwrap();
            ast.coerce(root, args.into_iter().next().unwrap_or(Arg::Scalar(Scalar::Int(0))))
        });
        let id = ast.sexpr(expr, Head::Func(f), Vec::new(), Vec::new()).unwrap();
        assert_eq!(render(&ast, id), "Num(0)");
    }
}
