// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Type declarations.
//!
//! A [`TypeDecl`] is a description handed to a
//! [`RegistryBuilder`](super::RegistryBuilder); nothing is validated until
//! the builder is finished.

use std::fmt;
use std::sync::Arc;

use ecow::EcoString;

use super::{Behavior, Constructor, HeadKey, TypeId};
use crate::operators::OperatorFamily;
use crate::source_analysis::ScalarKind;

/// A reference to another type in the same registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A type already declared with the builder.
    Id(TypeId),
    /// A type declared under this name, possibly later.
    Name(EcoString),
    /// Any node, of any hierarchy.
    Any,
}

impl From<TypeId> for TypeRef {
    fn from(id: TypeId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::Name(name.into())
    }
}

/// The declared type of a field.
///
/// `Child` and `Children` fields hold nodes; the others hold scalars. A
/// non-node first field is the node's tag.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// Exactly one node of the given type.
    Child(TypeRef),
    /// Any number of nodes of the given type. Must be the last child field.
    Children(TypeRef),
    /// A member of an operator family.
    Tag(OperatorFamily),
    /// A scalar of the given kind.
    Scalar(ScalarKind),
    /// Any scalar.
    Any,
}

impl FieldType {
    /// Returns true for fields that hold nodes.
    #[must_use]
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Child(_) | Self::Children(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DeclKind {
    Node,
    Leaf,
}

/// Declaration of a node or leaf type.
///
/// ```
/// use ox_core::ast::{FieldType, TypeDecl};
/// use ox_core::ScalarKind;
///
/// let expr = TypeDecl::node("Expr").root().abstract_();
/// let atom = TypeDecl::leaf("Atom")
///     .extends("Expr")
///     .atomic()
///     .coerces([ScalarKind::Int, ScalarKind::Float]);
/// let neg = TypeDecl::node("Neg")
///     .extends("Expr")
///     .field("value", FieldType::Child("Expr".into()))
///     .symbol("neg");
/// # let _ = (expr, atom, neg);
/// ```
#[derive(Clone)]
pub struct TypeDecl {
    pub(super) name: EcoString,
    pub(super) kind: DeclKind,
    pub(super) parent: Option<TypeRef>,
    pub(super) root: bool,
    pub(super) is_abstract: bool,
    pub(super) fields: Vec<(EcoString, FieldType)>,
    pub(super) symbols: Vec<EcoString>,
    pub(super) sexprs: Vec<(HeadKey, Constructor)>,
    pub(super) coerces: Vec<ScalarKind>,
    pub(super) accepts: Vec<ScalarKind>,
    pub(super) atomic: bool,
    pub(super) name_leaf: bool,
    pub(super) behavior: Option<Arc<dyn Behavior>>,
}

impl TypeDecl {
    fn new(name: impl Into<EcoString>, kind: DeclKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            root: false,
            is_abstract: false,
            fields: Vec::new(),
            symbols: Vec::new(),
            sexprs: Vec::new(),
            coerces: Vec::new(),
            accepts: Vec::new(),
            atomic: false,
            name_leaf: false,
            behavior: None,
        }
    }

    /// Declares an interior node type.
    pub fn node(name: impl Into<EcoString>) -> Self {
        Self::new(name, DeclKind::Node)
    }

    /// Declares a leaf type holding a single scalar.
    pub fn leaf(name: impl Into<EcoString>) -> Self {
        Self::new(name, DeclKind::Leaf)
    }

    /// Returns the declared name.
    #[must_use]
    pub fn name(&self) -> &EcoString {
        &self.name
    }

    /// Makes this type a subtype of `parent`.
    #[must_use]
    pub fn extends(mut self, parent: impl Into<TypeRef>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Makes this type the root of its own hierarchy, with its own symbol
    /// table and coercions. Types without a parent are roots implicitly.
    #[must_use]
    pub fn root(mut self) -> Self {
        self.root = true;
        self
    }

    /// Forbids instantiating this type directly.
    #[must_use]
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Adds a field. Fields are positional in declaration order.
    #[must_use]
    pub fn field(mut self, name: impl Into<EcoString>, ty: FieldType) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    /// Registers `symbol` as an S-expression head for the default
    /// constructor.
    #[must_use]
    pub fn symbol(mut self, symbol: impl Into<EcoString>) -> Self {
        self.symbols.push(symbol.into());
        self
    }

    /// Registers a custom constructor under `head`.
    #[must_use]
    pub fn sexpr(mut self, head: impl Into<HeadKey>, constructor: Constructor) -> Self {
        self.sexprs.push((head.into(), constructor));
        self
    }

    /// For leaves: registers this type as the hierarchy's conversion target
    /// for scalars of the given kinds. Implies [`accepts`](Self::accepts).
    #[must_use]
    pub fn coerces(mut self, kinds: impl IntoIterator<Item = ScalarKind>) -> Self {
        let kinds: Vec<_> = kinds.into_iter().collect();
        self.accepts.extend(kinds.iter().copied());
        self.coerces.extend(kinds);
        self
    }

    /// For leaves: restricts the value to the given kinds. Leaves accept
    /// any scalar by default.
    #[must_use]
    pub fn accepts(mut self, kinds: impl IntoIterator<Item = ScalarKind>) -> Self {
        self.accepts.extend(kinds);
        self
    }

    /// For leaves: the value is statically known, so folding may read it.
    #[must_use]
    pub fn atomic(mut self) -> Self {
        self.atomic = true;
        self
    }

    /// For leaves: the value is a variable name, reported by free-variable
    /// analysis.
    #[must_use]
    pub fn name_leaf(mut self) -> Self {
        self.name_leaf = true;
        self
    }

    /// Sets the printing and folding behavior. Subtypes without one inherit
    /// their parent's.
    #[must_use]
    pub fn behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Arc::new(behavior));
        self
    }
}

impl fmt::Debug for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDecl")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
