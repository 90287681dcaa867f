// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Typed syntax trees.
//!
//! Node types are declared with [`TypeDecl`], resolved by a
//! [`RegistryBuilder`] into a shared [`Registry`], and instantiated in an
//! [`Ast`] arena. A type is either an interior node with named fields or a
//! leaf holding one [`Scalar`](crate::Scalar).
//!
//! **Field roles.** A non-node first field is the *tag* (an operator, a
//! tree label, a function name). `Child`/`Children` fields are the node's
//! children and must be declared contiguously, either right after the tag
//! or at the end. Every other field is an *attribute*.
//!
//! **Hierarchies.** Each type belongs to the hierarchy of its nearest
//! `root()` ancestor. A hierarchy owns an S-expression table and a set of
//! coercions that turn scalars, lists or foreign nodes into its nodes.
//!
//! **Ownership.** A node has at most one parent. Construction is atomic:
//! on error no argument node is adopted.
//!
//! # Example
//!
//! ```
//! use ox_core::ast::{Ast, FieldType, RegistryBuilder, TypeDecl};
//! use ox_core::{Scalar, ScalarKind};
//!
//! let mut builder = RegistryBuilder::new();
//! let expr = builder.declare(TypeDecl::node("Expr").root().abstract_());
//! builder.declare(
//!     TypeDecl::leaf("Name")
//!         .extends(expr)
//!         .name_leaf()
//!         .coerces([ScalarKind::Symbol]),
//! );
//! let attr = builder.declare(
//!     TypeDecl::node("GetAttr")
//!         .extends(expr)
//!         .field("value", FieldType::Child(expr.into()))
//!         .field("attr", FieldType::Scalar(ScalarKind::Str))
//!         .symbol("."),
//! );
//! let mut ast = Ast::new(builder.finish().unwrap());
//!
//! let node = ast
//!     .sexpr(expr, ".".into(), vec![Scalar::symbol("z").into(), "real".into()], Vec::new())
//!     .unwrap();
//! assert_eq!(ast.get(node).ty(), attr);
//! assert_eq!(ast.free_vars(node).into_iter().collect::<Vec<_>>(), ["z"]);
//! ```

mod arena;
mod behavior;
mod decl;
mod error;
mod registry;
mod sexpr;
mod simplify;

pub use arena::{Arg, Ast, Attr, NodeId, NodeRef};
pub use behavior::{Behavior, BinaryFold, BinaryOperator, DefaultBehavior};
pub use decl::{FieldType, TypeDecl, TypeRef};
pub use error::{AstError, DeclarationError};
pub use registry::{
    CoerceFn, CoerceSource, FieldInfo, FieldKind, Registry, RegistryBuilder, TypeId, TypeInfo,
    default_constructor, tagged_constructor,
};
pub use sexpr::{
    Constructor, Head, HeadKey, binary_constructor, flexible_constructor, unary_constructor,
};
