// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Node storage.
//!
//! An [`Ast`] owns its nodes in a flat arena and hands out [`NodeId`]s.
//! Each node records its parent, so a node can be a child of at most one
//! other node. Construction is all-or-nothing: arguments are checked
//! before anything is allocated, and a failed call leaves every argument
//! node as it was.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use ecow::{EcoString, eco_format};

use super::{
    AstError, Behavior, CoerceFn, CoerceSource, FieldInfo, FieldKind, Registry, TypeId, TypeInfo,
};
use crate::operators::OperatorInfo;
use crate::printer::{self, PrintError};
use crate::source_analysis::{Position, Scalar, ScalarKind, Span, Token};

/// Handle to a node in an [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn new(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Returns the arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Metadata attached to a node. Not part of structural equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    /// A scalar, e.g. a token's raw text.
    Scalar(Scalar),
    /// A line and column.
    Position(Position),
    /// A byte range.
    Span(Span),
}

/// A constructor argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// An existing node, which becomes a child.
    Node(NodeId),
    /// A scalar, used as-is by scalar fields and coerced by child fields.
    Scalar(Scalar),
    /// Several arguments: the items of a variadic field, or a value for a
    /// list coercion.
    List(Vec<Arg>),
}

impl Arg {
    fn describe(&self, ast: &Ast) -> String {
        match self {
            Self::Node(id) => ast
                .try_get(*id)
                .map_or_else(|| id.to_string(), |n| n.type_name().to_string()),
            Self::Scalar(s) => s.kind().name().to_string(),
            Self::List(_) => "list".to_string(),
        }
    }
}

impl From<NodeId> for Arg {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<Scalar> for Arg {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<Vec<Arg>> for Arg {
    fn from(items: Vec<Arg>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<NodeId>> for Arg {
    fn from(items: Vec<NodeId>) -> Self {
        Self::List(items.into_iter().map(Self::Node).collect())
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    ty: TypeId,
    tag: Option<Scalar>,
    value: Scalar,
    children: Vec<NodeId>,
    /// Attribute fields in declaration order, tag excluded.
    attrs: Vec<Scalar>,
    parent: Option<NodeId>,
    meta: BTreeMap<EcoString, Attr>,
}

impl NodeData {
    fn leaf(ty: TypeId, value: Scalar) -> Self {
        Self {
            ty,
            tag: None,
            value,
            children: Vec::new(),
            attrs: Vec::new(),
            parent: None,
            meta: BTreeMap::new(),
        }
    }
}

/// A planned child: validated, not yet allocated.
enum Plan {
    Existing(NodeId),
    Leaf(TypeId, Scalar),
    Custom {
        f: CoerceFn,
        arg: Arg,
        expected: TypeId,
        field: EcoString,
    },
}

/// An arena of typed nodes sharing one [`Registry`].
#[derive(Clone)]
pub struct Ast {
    registry: Arc<Registry>,
    nodes: Vec<NodeData>,
}

impl fmt::Debug for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ast")
            .field("registry", &self.registry)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl Ast {
    /// Creates an empty arena.
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            nodes: Vec::new(),
        }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Number of nodes allocated, including unreachable ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns a view of a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this arena.
    #[must_use]
    pub fn get(&self, id: NodeId) -> NodeRef<'_> {
        assert!(id.index() < self.nodes.len(), "unknown node {id}");
        NodeRef { ast: self, id }
    }

    /// Returns a view of a node, or `None` for a foreign id.
    #[must_use]
    pub fn try_get(&self, id: NodeId) -> Option<NodeRef<'_>> {
        (id.index() < self.nodes.len()).then_some(NodeRef { ast: self, id })
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn checked(&self, id: NodeId) -> Result<&NodeData, AstError> {
        self.nodes.get(id.index()).ok_or(AstError::UnknownNode(id))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId::new(self.nodes.len() - 1)
    }

    fn adopt(&mut self, parent: NodeId) {
        let children = self.nodes[parent.index()].children.clone();
        for child in children {
            self.nodes[child.index()].parent = Some(parent);
        }
    }

    /// Runs `f`, undoing everything it did to the arena if it fails: nodes
    /// it created are dropped and nodes it adopted are free again.
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, AstError>,
    ) -> Result<T, AstError> {
        let mark = self.nodes.len();
        let result = f(self);
        if result.is_err() && self.nodes.len() > mark {
            for data in &mut self.nodes[..mark] {
                if data.parent.is_some_and(|p| p.index() >= mark) {
                    data.parent = None;
                }
            }
            self.nodes.truncate(mark);
        }
        result
    }

    /// Creates a leaf.
    pub fn leaf(&mut self, ty: TypeId, value: impl Into<Scalar>) -> Result<NodeId, AstError> {
        let value = value.into();
        let info = self.registry.info(ty);
        if !info.leaf {
            return Err(AstError::WrongKind {
                ty: info.name.clone(),
                kind: "node",
            });
        }
        if info.is_abstract {
            return Err(AstError::AbstractType(info.name.clone()));
        }
        if !info.accepts.is_empty() && !info.accepts.contains(&value.kind()) {
            return Err(AstError::LeafValue {
                ty: info.name.clone(),
                found: value.kind().name(),
                value: value.repr(),
            });
        }
        Ok(self.push(NodeData::leaf(ty, value)))
    }

    /// Creates a `Token` leaf: the tag is the token kind and the location
    /// is kept as metadata.
    pub fn token(&mut self, token: &Token) -> NodeId {
        let mut data = NodeData::leaf(self.registry.token(), token.value().clone());
        data.tag = Some(Scalar::symbol(token.kind().clone()));
        data.meta.insert("start".into(), Attr::Position(token.start()));
        data.meta.insert("end".into(), Attr::Position(token.end()));
        data.meta.insert("span".into(), Attr::Span(token.span()));
        if let Some(raw) = token.raw() {
            data.meta
                .insert("raw".into(), Attr::Scalar(Scalar::Str(raw.clone())));
        }
        self.push(data)
    }

    /// Creates a generic `Tree` node.
    pub fn tree(
        &mut self,
        tag: impl Into<EcoString>,
        children: Vec<NodeId>,
    ) -> Result<NodeId, AstError> {
        let tree = self.registry.tree();
        self.new_node(
            tree,
            vec![Scalar::symbol(tag).into(), children.into()],
            Vec::new(),
        )
    }

    /// Creates a node from positional arguments.
    pub fn node(&mut self, ty: TypeId, args: Vec<Arg>) -> Result<NodeId, AstError> {
        self.new_node(ty, args, Vec::new())
    }

    /// Creates a node from positional and keyword arguments.
    ///
    /// Positional arguments fill fields in declaration order; a variadic
    /// field takes all remaining ones (or the items of a single list), so
    /// fields after it can only be given by keyword. Missing attributes
    /// default to `None` and a missing variadic field to no children.
    /// Scalars and foreign nodes given to child fields are coerced into
    /// the field's hierarchy.
    pub fn new_node(
        &mut self,
        ty: TypeId,
        args: Vec<Arg>,
        kwargs: Vec<(EcoString, Arg)>,
    ) -> Result<NodeId, AstError> {
        let registry = Arc::clone(&self.registry);
        let info = registry.info(ty);
        if info.is_abstract {
            return Err(AstError::AbstractType(info.name.clone()));
        }
        if info.leaf {
            return self.leaf_from_args(info, args, kwargs);
        }

        let slots = bind(info, args, kwargs)?;
        let mut tag = None;
        let mut attrs = Vec::new();
        let mut plans = Vec::new();
        for (i, (field, arg)) in info.fields.iter().zip(slots).enumerate() {
            match &field.kind {
                FieldKind::Child(expected) => plans.push(self.plan(info, field, *expected, arg)?),
                FieldKind::Children(expected) => {
                    let items = match arg {
                        Arg::List(items) => items,
                        other => vec![other],
                    };
                    for item in items {
                        plans.push(self.plan(info, field, *expected, item)?);
                    }
                }
                kind => {
                    let is_tag = info.tag == Some(i);
                    let value = check_scalar(self, info, field, kind, arg, is_tag)?;
                    if is_tag {
                        tag = Some(value);
                    } else {
                        attrs.push(value);
                    }
                }
            }
        }
        self.check_ownership(&plans)?;

        let children = self.transaction(|ast| {
            plans
                .into_iter()
                .map(|plan| ast.realize(info, plan))
                .collect::<Result<Vec<_>, _>>()
        })?;
        let id = self.push(NodeData {
            ty,
            tag,
            value: Scalar::None,
            children,
            attrs,
            parent: None,
            meta: BTreeMap::new(),
        });
        self.adopt(id);
        Ok(id)
    }

    fn leaf_from_args(
        &mut self,
        info: &TypeInfo,
        mut args: Vec<Arg>,
        kwargs: Vec<(EcoString, Arg)>,
    ) -> Result<NodeId, AstError> {
        for (name, arg) in kwargs {
            if name != "value" {
                return Err(AstError::UnknownField {
                    ty: info.name.clone(),
                    field: name,
                });
            }
            args.push(arg);
        }
        if args.len() != 1 {
            return Err(AstError::Arity {
                ty: info.name.clone(),
                expected: "1".into(),
                found: args.len(),
            });
        }
        match args.remove(0) {
            Arg::Scalar(value) => self.leaf(info.id, value),
            other => Err(AstError::FieldType {
                ty: info.name.clone(),
                field: "value".into(),
                expected: "a scalar".into(),
                found: other.describe(self),
            }),
        }
    }

    /// Decides how `arg` becomes a child of a field expecting `expected`,
    /// without allocating.
    fn plan(
        &self,
        info: &TypeInfo,
        field: &FieldInfo,
        expected: Option<TypeId>,
        arg: Arg,
    ) -> Result<Plan, AstError> {
        let registry = &self.registry;
        let mismatch = |found: String| AstError::FieldType {
            ty: info.name.clone(),
            field: field.name.clone(),
            expected: expected.map_or_else(
                || "a node".to_string(),
                |e| registry.info(e).name.to_string(),
            ),
            found,
        };
        if let Arg::Node(id) = &arg {
            let child = self.checked(*id)?.ty;
            let Some(expected) = expected else {
                return Ok(Plan::Existing(*id));
            };
            if registry.is_subtype(child, expected) {
                return Ok(Plan::Existing(*id));
            }
            let source = CoerceSource::Hierarchy(registry.root_of(child));
            return match registry.custom_coercion(registry.root_of(expected), source) {
                Some(f) => Ok(Plan::Custom {
                    f: Arc::clone(f),
                    arg,
                    expected,
                    field: field.name.clone(),
                }),
                None => Err(mismatch(registry.info(child).name.to_string())),
            };
        }

        let Some(expected) = expected else {
            return Err(self.coercion_error(&arg, "a node".into()));
        };
        let root = registry.root_of(expected);
        let source = match &arg {
            Arg::Scalar(value) => {
                if let Some(target) = registry.scalar_target(root, value.kind()) {
                    return if registry.is_subtype(target, expected) {
                        Ok(Plan::Leaf(target, value.clone()))
                    } else {
                        Err(mismatch(registry.info(target).name.to_string()))
                    };
                }
                CoerceSource::Scalar(value.kind())
            }
            _ => CoerceSource::List,
        };
        match registry.custom_coercion(root, source) {
            Some(f) => Ok(Plan::Custom {
                f: Arc::clone(f),
                arg,
                expected,
                field: field.name.clone(),
            }),
            None => Err(self.coercion_error(&arg, registry.info(root).name.clone())),
        }
    }

    fn check_ownership(&self, plans: &[Plan]) -> Result<(), AstError> {
        let mut seen = HashSet::new();
        for plan in plans {
            let id = match plan {
                Plan::Existing(id)
                | Plan::Custom {
                    arg: Arg::Node(id), ..
                } => *id,
                _ => continue,
            };
            let data = self.data(id);
            if data.parent.is_some() {
                return Err(AstError::AlreadyParented {
                    ty: self.registry.info(data.ty).name.clone(),
                    node: id,
                });
            }
            if !seen.insert(id) {
                return Err(AstError::DuplicateChild(id));
            }
        }
        Ok(())
    }

    fn realize(&mut self, info: &TypeInfo, plan: Plan) -> Result<NodeId, AstError> {
        match plan {
            Plan::Existing(id) => Ok(id),
            Plan::Leaf(ty, value) => self.leaf(ty, value),
            Plan::Custom {
                f,
                arg,
                expected,
                field,
            } => {
                let id = f(self, arg)?;
                let ty = self.checked(id)?.ty;
                if self.registry.is_subtype(ty, expected) {
                    Ok(id)
                } else {
                    Err(AstError::FieldType {
                        ty: info.name.clone(),
                        field,
                        expected: self.registry.info(expected).name.to_string(),
                        found: self.registry.info(ty).name.to_string(),
                    })
                }
            }
        }
    }

    fn coercion_error(&self, arg: &Arg, hierarchy: EcoString) -> AstError {
        let value = match arg {
            Arg::Node(id) => id.to_string(),
            Arg::Scalar(s) => s.repr(),
            Arg::List(items) => format!("[{} items]", items.len()),
        };
        AstError::Coercion {
            kind: arg.describe(self),
            value,
            hierarchy,
        }
    }

    /// Converts `arg` into a node of the hierarchy rooted at `root`.
    ///
    /// Nodes already in the hierarchy are returned unchanged. Scalars
    /// become the leaf type registered for their kind. Anything else goes
    /// through a custom coercion, if one is registered.
    pub fn coerce(&mut self, root: TypeId, arg: Arg) -> Result<NodeId, AstError> {
        let registry = Arc::clone(&self.registry);
        let root = registry.root_of(root);
        let source = match &arg {
            Arg::Node(id) => {
                let source = registry.root_of(self.checked(*id)?.ty);
                if source == root {
                    return Ok(*id);
                }
                CoerceSource::Hierarchy(source)
            }
            Arg::Scalar(value) => {
                if let Some(target) = registry.scalar_target(root, value.kind()) {
                    return self.leaf(target, value.clone());
                }
                CoerceSource::Scalar(value.kind())
            }
            Arg::List(_) => CoerceSource::List,
        };
        match registry.custom_coercion(root, source) {
            Some(f) => f(self, arg),
            None => Err(self.coercion_error(&arg, registry.info(root).name.clone())),
        }
    }

    /// Attaches metadata to a node.
    pub fn set_meta(
        &mut self,
        id: NodeId,
        key: impl Into<EcoString>,
        attr: Attr,
    ) -> Result<(), AstError> {
        self.checked(id)?;
        self.nodes[id.index()].meta.insert(key.into(), attr);
        Ok(())
    }

    /// Deep-copies a node. The copy has no parent; metadata is kept.
    pub fn copy(&mut self, id: NodeId) -> Result<NodeId, AstError> {
        self.checked(id)?;
        Ok(self.copy_unchecked(id))
    }

    fn copy_unchecked(&mut self, id: NodeId) -> NodeId {
        let children = self.data(id).children.clone();
        let children = children.into_iter().map(|c| self.copy_unchecked(c)).collect();
        self.rebuild(id, children)
    }

    /// Copies `id` alone, adopting `children` in place of its own. The new
    /// children must be free.
    pub(super) fn rebuild(&mut self, id: NodeId, children: Vec<NodeId>) -> NodeId {
        let data = self.data(id).clone();
        let new = self.push(NodeData {
            children,
            parent: None,
            ..data
        });
        self.adopt(new);
        new
    }

    /// Deep-copies a node from another arena with the same registry.
    pub fn import(&mut self, other: &Ast, id: NodeId) -> Result<NodeId, AstError> {
        if !Arc::ptr_eq(&self.registry, &other.registry) {
            return Err(AstError::RegistryMismatch);
        }
        other.checked(id)?;
        Ok(self.import_unchecked(other, id))
    }

    fn import_unchecked(&mut self, other: &Ast, id: NodeId) -> NodeId {
        let data = other.data(id).clone();
        let children = data
            .children
            .iter()
            .map(|&c| self.import_unchecked(other, c))
            .collect();
        let new = self.push(NodeData {
            children,
            parent: None,
            ..data
        });
        self.adopt(new);
        new
    }

    /// Compares two nodes of this arena by type, tag, value, attributes
    /// and children, ignoring metadata and parents.
    #[must_use]
    pub fn structurally_equal(&self, a: NodeId, b: NodeId) -> bool {
        self.get(a) == self.get(b)
    }
}

/// Matches positional and keyword arguments to fields.
fn bind(
    info: &TypeInfo,
    args: Vec<Arg>,
    kwargs: Vec<(EcoString, Arg)>,
) -> Result<Vec<Arg>, AstError> {
    let total = args.len();
    let variadic = info.is_variadic().then(|| info.children.end - 1);
    let mut slots: Vec<Option<Arg>> = info.fields.iter().map(|_| None).collect();
    let mut args = args.into_iter();
    for (i, slot) in slots.iter_mut().enumerate() {
        if Some(i) == variadic {
            let mut rest: Vec<Arg> = args.by_ref().collect();
            if matches!(rest.as_slice(), [Arg::List(_)]) {
                if let Some(Arg::List(items)) = rest.pop() {
                    rest = items;
                }
            }
            if !rest.is_empty() {
                *slot = Some(Arg::List(rest));
            }
            break;
        }
        match args.next() {
            Some(arg) => *slot = Some(arg),
            None => break,
        }
    }
    if args.next().is_some() {
        return Err(AstError::Arity {
            ty: info.name.clone(),
            expected: format!("at most {}", info.fields.len()),
            found: total,
        });
    }

    for (name, arg) in kwargs {
        let Some(i) = info.field_index(&name) else {
            return Err(AstError::UnknownField {
                ty: info.name.clone(),
                field: name,
            });
        };
        if slots[i].is_some() {
            return Err(AstError::DuplicateField {
                ty: info.name.clone(),
                field: name,
            });
        }
        slots[i] = Some(arg);
    }

    slots
        .into_iter()
        .zip(&info.fields)
        .enumerate()
        .map(|(i, (slot, field))| match (slot, &field.kind) {
            (Some(arg), _) => Ok(arg),
            (None, FieldKind::Children(_)) => Ok(Arg::List(Vec::new())),
            (None, FieldKind::Child(_)) => Err(AstError::MissingField {
                ty: info.name.clone(),
                field: field.name.clone(),
            }),
            (None, _) if info.tag == Some(i) => Err(AstError::MissingField {
                ty: info.name.clone(),
                field: field.name.clone(),
            }),
            (None, _) => Ok(Arg::Scalar(Scalar::None)),
        })
        .collect()
}

/// Validates a value for a tag or attribute field.
fn check_scalar(
    ast: &Ast,
    info: &TypeInfo,
    field: &FieldInfo,
    kind: &FieldKind,
    arg: Arg,
    is_tag: bool,
) -> Result<Scalar, AstError> {
    let expected = match kind {
        FieldKind::Tag(family) => eco_format!("a member of {}", family.name()),
        FieldKind::Scalar(k) => eco_format!("{k}"),
        _ => "a scalar".into(),
    };
    let mismatch = |found: String| AstError::FieldType {
        ty: info.name.clone(),
        field: field.name.clone(),
        expected: expected.to_string(),
        found,
    };
    let value = match arg {
        Arg::Scalar(value) => value,
        other => return Err(mismatch(other.describe(ast))),
    };
    if value == Scalar::None && !is_tag {
        return Ok(value);
    }
    match (kind, value) {
        (FieldKind::Tag(family), value) => value
            .as_str()
            .and_then(|text| family.resolve(text))
            .map(|member| Scalar::symbol(member.name))
            .ok_or_else(|| AstError::UnknownOperator {
                family: family.name().into(),
                name: value.to_string().into(),
            }),
        (FieldKind::Scalar(ScalarKind::Symbol), Scalar::Str(text)) => Ok(Scalar::Symbol(text)),
        (FieldKind::Scalar(ScalarKind::Str), Scalar::Symbol(text)) => Ok(Scalar::Str(text)),
        (FieldKind::Scalar(k), value) if value.kind() != *k => {
            Err(mismatch(value.kind().name().to_string()))
        }
        (_, value) => Ok(value),
    }
}

/// A borrowed view of one node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    ast: &'a Ast,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    fn data(self) -> &'a NodeData {
        self.ast.data(self.id)
    }

    /// Returns the node's id.
    #[must_use]
    pub fn id(self) -> NodeId {
        self.id
    }

    /// Returns the arena the node lives in.
    #[must_use]
    pub fn ast(self) -> &'a Ast {
        self.ast
    }

    /// Returns the node's type.
    #[must_use]
    pub fn ty(self) -> TypeId {
        self.data().ty
    }

    /// Returns the registry entry of the node's type.
    #[must_use]
    pub fn info(self) -> &'a TypeInfo {
        self.ast.registry.info(self.ty())
    }

    /// Returns the name of the node's type.
    #[must_use]
    pub fn type_name(self) -> &'a EcoString {
        &self.info().name
    }

    /// Returns true if the node's type is `ty` or a subtype of it.
    #[must_use]
    pub fn is_a(self, ty: TypeId) -> bool {
        self.ast.registry.is_subtype(self.ty(), ty)
    }

    /// Returns true for leaves.
    #[must_use]
    pub fn is_leaf(self) -> bool {
        self.info().leaf
    }

    /// Returns the tag, if the type has one.
    #[must_use]
    pub fn tag(self) -> Option<&'a Scalar> {
        self.data().tag.as_ref()
    }

    /// Returns a leaf's value; `None` for interior nodes.
    #[must_use]
    pub fn value(self) -> &'a Scalar {
        &self.data().value
    }

    /// Resolves an operator-family tag to its member.
    #[must_use]
    pub fn operator(self) -> Option<&'a OperatorInfo> {
        let FieldKind::Tag(family) = &self.info().tag_field()?.kind else {
            return None;
        };
        family.get(self.tag()?.as_str()?)
    }

    /// Iterates over all children in field order.
    pub fn children(self) -> impl Iterator<Item = NodeRef<'a>> {
        let ast = self.ast;
        self.data()
            .children
            .iter()
            .map(move |&id| NodeRef { ast, id })
    }

    /// Returns the node in a single-child field.
    #[must_use]
    pub fn child(self, field: &str) -> Option<NodeRef<'a>> {
        let info = self.info();
        let j = info.child_fields().iter().position(|f| f.name == field)?;
        if info.is_variadic() && j + 1 == info.child_fields().len() {
            return None;
        }
        let id = *self.data().children.get(j)?;
        Some(NodeRef { ast: self.ast, id })
    }

    /// Returns the nodes in a child field: all of them for a variadic
    /// field, one otherwise.
    #[must_use]
    pub fn children_of(self, field: &str) -> Vec<NodeRef<'a>> {
        let info = self.info();
        let Some(j) = info.child_fields().iter().position(|f| f.name == field) else {
            return Vec::new();
        };
        let children = &self.data().children;
        let range = if info.is_variadic() && j + 1 == info.child_fields().len() {
            j.min(children.len())..children.len()
        } else {
            j.min(children.len())..(j + 1).min(children.len())
        };
        children[range]
            .iter()
            .map(|&id| NodeRef { ast: self.ast, id })
            .collect()
    }

    /// Returns a scalar field: the tag or an attribute.
    #[must_use]
    pub fn attr(self, field: &str) -> Option<&'a Scalar> {
        let info = self.info();
        if info.tag_field().is_some_and(|f| f.name == field) {
            return self.tag();
        }
        let position = info.attr_fields().position(|f| f.name == field)?;
        self.data().attrs.get(position)
    }

    /// Returns metadata.
    #[must_use]
    pub fn meta(self, key: &str) -> Option<&'a Attr> {
        self.data().meta.get(key)
    }

    /// Returns the parent node.
    #[must_use]
    pub fn parent(self) -> Option<NodeRef<'a>> {
        self.data().parent.map(|id| NodeRef { ast: self.ast, id })
    }

    /// Returns the type's behavior.
    #[must_use]
    pub fn behavior(self) -> &'a dyn Behavior {
        self.info().behavior().as_ref()
    }

    /// Returns the value if it is statically known.
    #[must_use]
    pub fn static_value(self) -> Option<Scalar> {
        self.behavior().static_value(self)
    }

    /// Renders the node as source text with default options.
    pub fn source(self) -> Result<String, PrintError> {
        printer::source(self)
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        let same_type = if Arc::ptr_eq(&self.ast.registry, &other.ast.registry) {
            self.ty() == other.ty()
        } else {
            self.type_name() == other.type_name()
        };
        let (a, b) = (self.data(), other.data());
        same_type
            && a.tag == b.tag
            && a.value == b.value
            && a.attrs == b.attrs
            && a.children.len() == b.children.len()
            && self.children().zip(other.children()).all(|(x, y)| x == y)
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_name())?;
        let mut first = true;
        let mut sep = |f: &mut fmt::Formatter<'_>| {
            let result = if first { Ok(()) } else { f.write_str(", ") };
            first = false;
            result
        };
        if let Some(tag) = self.tag() {
            sep(f)?;
            write!(f, "{tag}")?;
        }
        if self.is_leaf() {
            sep(f)?;
            f.write_str(&self.value().repr())?;
        }
        for child in self.children() {
            sep(f)?;
            write!(f, "{child:?}")?;
        }
        for value in &self.data().attrs {
            sep(f)?;
            f.write_str(&value.repr())?;
        }
        f.write_str(")")
    }
}
