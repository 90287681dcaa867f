// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Operator-overload adapter for building trees.
//!
//! A [`Wrapped`] value owns a small arena holding one tree. Rust operators,
//! and the methods below, dispatch through the S-expression table of the
//! wrapped hierarchy, so `x + 1` builds whatever the hierarchy registered
//! under the `"+"` head:
//!
//! | Operation                         | Head          |
//! |-----------------------------------|---------------|
//! | `+ - * / % & \| ^ << >>`          | the operator  |
//! | unary `-`, `!`                    | `"-"`, `"~"`  |
//! | [`attr`](Wrapped::attr)           | `"."`         |
//! | [`call`](Wrapped::call)           | `"()"`        |
//! | [`index`](Wrapped::index)         | `"[]"`        |
//!
//! Errors do not panic: they are carried through further operations and
//! surface at [`finish`](Wrapped::finish) or [`source`](Wrapped::source).
//!
//! # Example
//!
//! ```
//! use ox_core::ast::{binary_constructor, BinaryOperator, FieldType, RegistryBuilder, TypeDecl};
//! use ox_core::operators::{Associativity, OperatorFamily, OperatorInfo};
//! use ox_core::wrapper::Wrapped;
//! use ox_core::{Scalar, ScalarKind};
//!
//! let mut b = RegistryBuilder::new();
//! let expr = b.declare(TypeDecl::node("Expr").root().abstract_());
//! b.declare(TypeDecl::leaf("Num").extends(expr).atomic().coerces([ScalarKind::Int]));
//! b.declare(TypeDecl::leaf("Name").extends(expr).name_leaf().coerces([ScalarKind::Symbol]));
//! let add = OperatorInfo {
//!     name: "ADD",
//!     symbol: "+",
//!     precedence: 1,
//!     associativity: Associativity::Left,
//! };
//! let bin = b.declare(
//!     TypeDecl::node("BinOp")
//!         .extends(expr)
//!         .field("op", FieldType::Tag(OperatorFamily::new("Op", [add])))
//!         .field("lhs", FieldType::Child(expr.into()))
//!         .field("rhs", FieldType::Child(expr.into()))
//!         .behavior(BinaryOperator::new()),
//! );
//! b.sexpr(expr, "+", binary_constructor(bin, "ADD"));
//! let registry = b.finish().unwrap();
//!
//! let x = Wrapped::new(registry, expr, Scalar::symbol("x"));
//! assert_eq!((x + 1).source().unwrap(), "x + 1");
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::ops;
use std::sync::Arc;

use ecow::EcoString;
use thiserror::Error;

use crate::ast::{Arg, Ast, AstError, Head, NodeId, NodeRef, Registry, TypeId};
use crate::printer::PrintError;
use crate::source_analysis::Scalar;

/// Errors surfaced when rendering a wrapped tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WrapError {
    /// Building the tree failed.
    #[error(transparent)]
    Ast(#[from] AstError),
    /// Printing the tree failed.
    #[error(transparent)]
    Print(#[from] PrintError),
}

/// A tree, or the error that interrupted building it.
#[derive(Clone)]
pub struct Wrapped {
    root: TypeId,
    state: Result<(Ast, NodeId), AstError>,
}

/// An argument to a wrapped operation.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Another wrapped tree, copied into the result.
    Wrapped(Wrapped),
    /// A host value, coerced by the receiving hierarchy.
    Scalar(Scalar),
    /// A list of operands.
    List(Vec<Operand>),
}

impl From<Wrapped> for Operand {
    fn from(value: Wrapped) -> Self {
        Self::Wrapped(value)
    }
}

impl From<&Wrapped> for Operand {
    fn from(value: &Wrapped) -> Self {
        Self::Wrapped(value.clone())
    }
}

impl From<Scalar> for Operand {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Self::Scalar(Scalar::Int(i64::from(value)))
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Scalar(Scalar::Float(value))
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Self::Scalar(Scalar::Bool(value))
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Scalar(Scalar::str(value))
    }
}

impl<T: Into<Operand>> From<Vec<T>> for Operand {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Moves an operand into `ast`.
fn lower(ast: &mut Ast, operand: Operand) -> Result<Arg, AstError> {
    match operand {
        Operand::Wrapped(wrapped) => {
            let (other, id) = wrapped.state?;
            Ok(ast.import(&other, id)?.into())
        }
        Operand::Scalar(value) => Ok(Arg::Scalar(value)),
        Operand::List(items) => items
            .into_iter()
            .map(|item| lower(ast, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Arg::List),
    }
}

fn lower_kwargs(
    ast: &mut Ast,
    kwargs: Vec<(EcoString, Operand)>,
) -> Result<Vec<(EcoString, Arg)>, AstError> {
    kwargs
        .into_iter()
        .map(|(name, operand)| Ok((name, lower(ast, operand)?)))
        .collect()
}

impl Wrapped {
    /// Wraps `value`, coerced into the hierarchy of `root`.
    pub fn new(registry: Arc<Registry>, root: TypeId, value: impl Into<Arg>) -> Self {
        let mut ast = Ast::new(registry);
        let state = ast.coerce(root, value.into()).map(|id| (ast, id));
        Self { root, state }
    }

    /// Wraps an existing node, which becomes the root of the tree.
    #[must_use]
    pub fn from_node(ast: Ast, id: NodeId) -> Self {
        let root = ast.get(id).info().root;
        Self {
            root,
            state: Ok((ast, id)),
        }
    }

    /// Builds `(head args... kwargs...)` in the hierarchy of `root`.
    pub fn sexpr(
        registry: Arc<Registry>,
        root: TypeId,
        head: impl Into<Head>,
        args: Vec<Operand>,
        kwargs: Vec<(EcoString, Operand)>,
    ) -> Self {
        let mut ast = Ast::new(registry);
        let state = (|| {
            let args = args
                .into_iter()
                .map(|arg| lower(&mut ast, arg))
                .collect::<Result<Vec<_>, _>>()?;
            let kwargs = lower_kwargs(&mut ast, kwargs)?;
            ast.sexpr(root, head.into(), args, kwargs)
        })();
        Self {
            root,
            state: state.map(|id| (ast, id)),
        }
    }

    /// Hierarchy the wrapped tree is built in.
    #[must_use]
    pub fn root(&self) -> TypeId {
        self.root
    }

    /// The wrapped node, unless building it failed.
    #[must_use]
    pub fn node(&self) -> Option<NodeRef<'_>> {
        self.state.as_ref().ok().map(|(ast, id)| ast.get(*id))
    }

    /// The error that interrupted building, if any.
    #[must_use]
    pub fn error(&self) -> Option<&AstError> {
        self.state.as_ref().err()
    }

    /// Applies `head` with this tree as the first argument.
    #[must_use]
    pub fn apply(
        self,
        head: impl Into<Head>,
        rest: Vec<Operand>,
        kwargs: Vec<(EcoString, Operand)>,
    ) -> Self {
        let root = self.root;
        let head = head.into();
        let state = self.state.and_then(|(mut ast, id)| {
            let mut args = Vec::with_capacity(rest.len() + 1);
            args.push(Arg::Node(id));
            for operand in rest {
                args.push(lower(&mut ast, operand)?);
            }
            let kwargs = lower_kwargs(&mut ast, kwargs)?;
            let id = ast.sexpr(root, head, args, kwargs)?;
            Ok((ast, id))
        });
        Self { root, state }
    }

    /// `self <head> rhs`.
    #[must_use]
    pub fn binary(self, head: impl Into<Head>, rhs: impl Into<Operand>) -> Self {
        self.apply(head, vec![rhs.into()], Vec::new())
    }

    /// `lhs <head> self`, for operators whose left operand is a host value.
    #[must_use]
    pub fn binary_reversed(self, head: impl Into<Head>, lhs: impl Into<Operand>) -> Self {
        let root = self.root;
        let head = head.into();
        let lhs = lhs.into();
        let state = self.state.and_then(|(mut ast, id)| {
            let lhs = lower(&mut ast, lhs)?;
            let id = ast.sexpr(root, head, vec![lhs, Arg::Node(id)], Vec::new())?;
            Ok((ast, id))
        });
        Self { root, state }
    }

    /// `<head> self`.
    #[must_use]
    pub fn unary(self, head: impl Into<Head>) -> Self {
        self.apply(head, Vec::new(), Vec::new())
    }

    /// Attribute access, `self.name`.
    #[must_use]
    pub fn attr(self, name: &str) -> Self {
        self.binary(".", Scalar::str(name))
    }

    /// Function call, `self(args..., name=value...)`.
    #[must_use]
    pub fn call<K: Into<EcoString>>(
        self,
        args: Vec<Operand>,
        kwargs: impl IntoIterator<Item = (K, Operand)>,
    ) -> Self {
        let kwargs = kwargs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.apply("()", args, kwargs)
    }

    /// Subscript, `self[key]`.
    #[must_use]
    pub fn index(self, key: impl Into<Operand>) -> Self {
        self.binary("[]", key)
    }

    /// Comparison under the operator symbol `op`, e.g. `"<"` or `"=="`.
    #[must_use]
    pub fn compare(self, op: &str, rhs: impl Into<Operand>) -> Self {
        self.binary(op, rhs)
    }

    /// Constant-folds the wrapped tree.
    #[must_use]
    pub fn simplify(self) -> Self {
        let root = self.root;
        let state = self.state.and_then(|(mut ast, id)| {
            let id = ast.simplify(id)?;
            Ok((ast, id))
        });
        Self { root, state }
    }

    /// Unwraps the tree.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while building it.
    pub fn finish(self) -> Result<(Ast, NodeId), AstError> {
        self.state
    }

    /// Renders the tree as source.
    ///
    /// # Errors
    ///
    /// Returns the building error, or the printer's.
    pub fn source(&self) -> Result<String, WrapError> {
        match &self.state {
            Ok((ast, id)) => Ok(ast.get(*id).source()?),
            Err(err) => Err(err.clone().into()),
        }
    }

    /// Free variables of the wrapped tree.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while building it.
    pub fn free_vars(&self) -> Result<BTreeSet<EcoString>, AstError> {
        match &self.state {
            Ok((ast, id)) => Ok(ast.free_vars(*id)),
            Err(err) => Err(err.clone()),
        }
    }
}

impl fmt::Debug for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            Ok((ast, id)) => write!(f, "wrap({:?})", ast.get(*id)),
            Err(err) => write!(f, "wrap(error: {err})"),
        }
    }
}

impl PartialEq for Wrapped {
    fn eq(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (Ok((a, x)), Ok((b, y))) => a.get(*x) == b.get(*y),
            (Err(a), Err(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! binary_ops {
    ($($trait:ident :: $method:ident => $head:literal),* $(,)?) => {$(
        impl<T: Into<Operand>> ops::$trait<T> for Wrapped {
            type Output = Wrapped;

            fn $method(self, rhs: T) -> Wrapped {
                self.binary($head, rhs)
            }
        }

        impl ops::$trait<Wrapped> for i64 {
            type Output = Wrapped;

            fn $method(self, rhs: Wrapped) -> Wrapped {
                rhs.binary_reversed($head, self)
            }
        }

        impl ops::$trait<Wrapped> for f64 {
            type Output = Wrapped;

            fn $method(self, rhs: Wrapped) -> Wrapped {
                rhs.binary_reversed($head, self)
            }
        }
    )*};
}

binary_ops! {
    Add::add => "+",
    Sub::sub => "-",
    Mul::mul => "*",
    Div::div => "/",
    Rem::rem => "%",
    BitAnd::bitand => "&",
    BitOr::bitor => "|",
    BitXor::bitxor => "^",
    Shl::shl => "<<",
    Shr::shr => ">>",
}

impl ops::Neg for Wrapped {
    type Output = Wrapped;

    fn neg(self) -> Wrapped {
        self.unary("-")
    }
}

/// Bitwise inversion, `~self`.
impl ops::Not for Wrapped {
    type Output = Wrapped;

    fn not(self) -> Wrapped {
        self.unary("~")
    }
}
