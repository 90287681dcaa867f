// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The type registry.
//!
//! Declarations are collected by a [`RegistryBuilder`] and resolved in a
//! single pass by [`RegistryBuilder::finish`]: parents and field types are
//! looked up by name, field roles are classified, behaviors are inherited
//! and each root's S-expression table is populated. The resulting
//! [`Registry`] is immutable and shared by every [`Ast`](super::Ast) that
//! uses it.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use ecow::EcoString;

use super::behavior::{DefaultBehavior, TokenBehavior, TreeBehavior};
use super::decl::DeclKind;
use super::{
    Arg, Ast, AstError, Behavior, Constructor, DeclarationError, FieldType, HeadKey, NodeId,
    TypeDecl, TypeRef,
};
use crate::operators::OperatorFamily;
use crate::source_analysis::{Scalar, ScalarKind};

/// Handle to a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    fn new(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Returns the index of the type in its registry.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a custom coercion converts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoerceSource {
    /// Nodes of the hierarchy rooted at the given type.
    Hierarchy(TypeId),
    /// Scalars of the given kind.
    Scalar(ScalarKind),
    /// Lists of arguments.
    List,
}

/// A custom coercion into a hierarchy.
pub type CoerceFn = Arc<dyn Fn(&mut Ast, Arg) -> Result<NodeId, AstError> + Send + Sync>;

/// A resolved field type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// One node; `None` accepts any node.
    Child(Option<TypeId>),
    /// Any number of nodes; `None` accepts any node.
    Children(Option<TypeId>),
    /// An operator family member.
    Tag(OperatorFamily),
    /// A scalar of the given kind.
    Scalar(ScalarKind),
    /// Any scalar.
    Any,
}

impl FieldKind {
    /// Returns true for fields that hold nodes.
    #[must_use]
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Child(_) | Self::Children(_))
    }
}

/// A resolved field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Field name.
    pub name: EcoString,
    /// Resolved type.
    pub kind: FieldKind,
}

/// Everything the registry knows about one type.
#[derive(Debug)]
pub struct TypeInfo {
    /// Handle of this type.
    pub id: TypeId,
    /// Declared name.
    pub name: EcoString,
    /// True for leaf types.
    pub leaf: bool,
    /// True if the type cannot be instantiated.
    pub is_abstract: bool,
    /// Direct supertype.
    pub parent: Option<TypeId>,
    /// Root of the hierarchy this type belongs to.
    pub root: TypeId,
    /// Fields in declaration order.
    pub fields: Vec<FieldInfo>,
    /// Scalar kinds a leaf accepts; empty accepts all.
    pub accepts: Vec<ScalarKind>,
    /// Leaf value is statically known.
    pub atomic: bool,
    /// Leaf value is a variable name.
    pub name_leaf: bool,
    pub(super) tag: Option<usize>,
    pub(super) children: Range<usize>,
    pub(super) variadic: bool,
    pub(super) behavior: Arc<dyn Behavior>,
}

impl TypeInfo {
    /// Returns the tag field, if the type has one.
    #[must_use]
    pub fn tag_field(&self) -> Option<&FieldInfo> {
        self.tag.map(|i| &self.fields[i])
    }

    /// Returns the child fields, contiguous and in order.
    #[must_use]
    pub fn child_fields(&self) -> &[FieldInfo] {
        &self.fields[self.children.clone()]
    }

    /// Returns the attribute fields: scalar fields other than the tag.
    pub fn attr_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        let tag = self.tag;
        self.fields
            .iter()
            .enumerate()
            .filter(move |(i, f)| Some(*i) != tag && !f.kind.is_node())
            .map(|(_, f)| f)
    }

    /// Returns true if the last child field is variadic.
    #[must_use]
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Returns the position of a field by name.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Returns the printing and folding behavior.
    #[must_use]
    pub fn behavior(&self) -> &Arc<dyn Behavior> {
        &self.behavior
    }
}

#[derive(Default)]
struct Coercions {
    scalar: HashMap<ScalarKind, TypeId>,
    custom: HashMap<CoerceSource, CoerceFn>,
}

/// An immutable set of resolved types.
pub struct Registry {
    types: Vec<TypeInfo>,
    by_name: HashMap<EcoString, TypeId>,
    tables: HashMap<TypeId, HashMap<HeadKey, Constructor>>,
    coercions: HashMap<TypeId, Coercions>,
    ignored: Vec<(TypeId, HeadKey)>,
    tree: TypeId,
    token: TypeId,
}

impl Registry {
    /// Returns the type behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if `ty` comes from another registry and is out of range.
    #[must_use]
    pub fn info(&self, ty: TypeId) -> &TypeInfo {
        &self.types[ty.index()]
    }

    /// Looks a type up by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Iterates over all types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.iter()
    }

    /// The built-in generic `Tree` node type.
    #[must_use]
    pub fn tree(&self) -> TypeId {
        self.tree
    }

    /// The built-in `Token` leaf type.
    #[must_use]
    pub fn token(&self) -> TypeId {
        self.token
    }

    /// Returns the root of the hierarchy `ty` belongs to.
    #[must_use]
    pub fn root_of(&self, ty: TypeId) -> TypeId {
        self.info(ty).root
    }

    /// Returns true if `ty` is `ancestor` or one of its subtypes.
    #[must_use]
    pub fn is_subtype(&self, ty: TypeId, ancestor: TypeId) -> bool {
        let mut current = Some(ty);
        while let Some(t) = current {
            if t == ancestor {
                return true;
            }
            current = self.info(t).parent;
        }
        false
    }

    /// Returns the constructor registered under `head` in `root`'s table.
    #[must_use]
    pub fn constructor(&self, root: TypeId, head: &HeadKey) -> Option<&Constructor> {
        self.tables.get(&root).and_then(|t| t.get(head))
    }

    /// Returns every head registered in `root`'s table.
    pub fn heads(&self, root: TypeId) -> impl Iterator<Item = &HeadKey> {
        self.tables.get(&root).into_iter().flat_map(HashMap::keys)
    }

    /// Registrations dropped because an earlier one claimed the same head.
    #[must_use]
    pub fn ignored_heads(&self) -> &[(TypeId, HeadKey)] {
        &self.ignored
    }

    /// Returns the leaf type scalars of `kind` become in `root`'s hierarchy.
    #[must_use]
    pub fn scalar_target(&self, root: TypeId, kind: ScalarKind) -> Option<TypeId> {
        self.coercions.get(&root)?.scalar.get(&kind).copied()
    }

    /// Returns a custom coercion into `root`'s hierarchy.
    #[must_use]
    pub fn custom_coercion(&self, root: TypeId, source: CoerceSource) -> Option<&CoerceFn> {
        self.coercions.get(&root)?.custom.get(&source)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field(
                "types",
                &self.types.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            )
            .field("ignored", &self.ignored)
            .finish_non_exhaustive()
    }
}

/// Collects type declarations and custom coercions.
///
/// ```
/// use ox_core::ast::{Ast, FieldType, RegistryBuilder, TypeDecl};
/// use ox_core::ScalarKind;
///
/// let mut builder = RegistryBuilder::new();
/// let expr = builder.declare(TypeDecl::node("Expr").root().abstract_());
/// builder.declare(TypeDecl::leaf("Num").extends(expr).atomic().coerces([ScalarKind::Int]));
/// let neg = builder.declare(
///     TypeDecl::node("Neg")
///         .extends(expr)
///         .field("value", FieldType::Child(expr.into())),
/// );
/// let registry = builder.finish().unwrap();
///
/// let mut ast = Ast::new(registry);
/// let node = ast.node(neg, vec![42.into()]).unwrap();
/// assert_eq!(ast.get(node).children().count(), 1);
/// ```
pub struct RegistryBuilder {
    decls: Vec<TypeDecl>,
    sexprs: Vec<(TypeId, HeadKey, Constructor)>,
    coercions: Vec<(TypeId, CoerceSource, CoerceFn)>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Creates a builder with the built-in `Tree` and `Token` types.
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self {
            decls: Vec::new(),
            sexprs: Vec::new(),
            coercions: Vec::new(),
        };
        builder.declare(
            TypeDecl::node("Tree")
                .root()
                .field("tag", FieldType::Scalar(ScalarKind::Symbol))
                .field("children", FieldType::Children(TypeRef::Any))
                .behavior(TreeBehavior),
        );
        builder.declare(TypeDecl::leaf("Token").root().behavior(TokenBehavior));
        builder
    }

    /// Adds a declaration and returns its handle.
    pub fn declare(&mut self, decl: TypeDecl) -> TypeId {
        self.decls.push(decl);
        TypeId::new(self.decls.len() - 1)
    }

    /// Registers a constructor in `root`'s table once every declared type
    /// has registered its own heads. Useful for heads spanning several
    /// types.
    pub fn sexpr(
        &mut self,
        root: TypeId,
        head: impl Into<HeadKey>,
        constructor: Constructor,
    ) -> &mut Self {
        self.sexprs.push((root, head.into(), constructor));
        self
    }

    /// Registers a custom coercion into the hierarchy rooted at `root`.
    pub fn coerce_with<F>(&mut self, root: TypeId, source: CoerceSource, f: F) -> &mut Self
    where
        F: Fn(&mut Ast, Arg) -> Result<NodeId, AstError> + Send + Sync + 'static,
    {
        self.coercions.push((root, source, Arc::new(f)));
        self
    }

    /// Resolves every declaration.
    #[tracing::instrument(skip_all, fields(types = self.decls.len()))]
    pub fn finish(self) -> Result<Arc<Registry>, DeclarationError> {
        let mut by_name = HashMap::new();
        for (i, decl) in self.decls.iter().enumerate() {
            if by_name.insert(decl.name.clone(), TypeId::new(i)).is_some() {
                return Err(DeclarationError::DuplicateType(decl.name.clone()));
            }
        }
        let resolve = |owner: &TypeDecl, r: &TypeRef| -> Result<Option<TypeId>, DeclarationError> {
            match r {
                TypeRef::Id(id) if id.index() < self.decls.len() => Ok(Some(*id)),
                TypeRef::Id(id) => Err(DeclarationError::UnknownType {
                    ty: owner.name.clone(),
                    name: format!("#{}", id.index()).into(),
                }),
                TypeRef::Name(name) => by_name.get(name).copied().map(Some).ok_or_else(|| {
                    DeclarationError::UnknownType {
                        ty: owner.name.clone(),
                        name: name.clone(),
                    }
                }),
                TypeRef::Any => Ok(None),
            }
        };

        let mut parents = Vec::with_capacity(self.decls.len());
        for decl in &self.decls {
            let parent = match &decl.parent {
                Some(r) => resolve(decl, r)?,
                None => None,
            };
            // abstract types are shared by nodes and leaves alike
            if let Some(p) = parent {
                let parent_decl = &self.decls[p.index()];
                if !parent_decl.is_abstract && parent_decl.kind != decl.kind {
                    return Err(DeclarationError::KindMismatch {
                        ty: decl.name.clone(),
                        parent: self.decls[p.index()].name.clone(),
                    });
                }
            }
            parents.push(parent);
        }

        let mut roots = Vec::with_capacity(self.decls.len());
        for (i, decl) in self.decls.iter().enumerate() {
            let mut current = i;
            let mut steps = 0;
            loop {
                if self.decls[current].root {
                    break;
                }
                match parents[current] {
                    Some(p) => current = p.index(),
                    None => break,
                }
                steps += 1;
                if steps > self.decls.len() {
                    return Err(DeclarationError::CyclicHierarchy(decl.name.clone()));
                }
            }
            roots.push(TypeId::new(current));
        }

        let mut types = Vec::with_capacity(self.decls.len());
        for (i, decl) in self.decls.iter().enumerate() {
            let fields = resolve_fields(decl, &resolve)?;
            let (tag, children, variadic) = classify_fields(&decl.name, &fields)?;
            types.push(TypeInfo {
                id: TypeId::new(i),
                name: decl.name.clone(),
                leaf: decl.kind == DeclKind::Leaf,
                is_abstract: decl.is_abstract,
                parent: parents[i],
                root: roots[i],
                fields,
                accepts: decl.accepts.clone(),
                atomic: decl.atomic,
                name_leaf: decl.name_leaf,
                tag,
                children,
                variadic,
                behavior: inherited_behavior(&self.decls, &parents, i),
            });
        }

        let mut tables: HashMap<TypeId, HashMap<HeadKey, Constructor>> = HashMap::new();
        let mut ignored = Vec::new();
        let mut register = |root: TypeId, key: HeadKey, ctor: Constructor| {
            let table = tables.entry(root).or_default();
            if table.contains_key(&key) {
                let root_name = types_name(&self.decls, root);
                tracing::debug!(%key, root = %root_name, "head already registered, ignoring");
                ignored.push((root, key));
            } else {
                table.insert(key, ctor);
            }
        };
        for (info, decl) in types.iter().zip(&self.decls) {
            let root = info.root;
            if !info.is_abstract {
                register(root, HeadKey::Type(info.id), default_constructor(info.id));
                for symbol in &decl.symbols {
                    register(root, HeadKey::Symbol(symbol.clone()), default_constructor(info.id));
                }
            }
            for (key, ctor) in &decl.sexprs {
                register(root, key.clone(), Arc::clone(ctor));
            }
            if info.is_abstract {
                continue;
            }
            if let Some(FieldKind::Tag(family)) = info.tag_field().map(|f| &f.kind) {
                for member in family.members() {
                    register(
                        root,
                        HeadKey::Member {
                            family: family.name().into(),
                            name: member.name.into(),
                        },
                        tagged_constructor(info.id, member.name),
                    );
                }
            }
        }

        for (root, key, ctor) in self.sexprs {
            register(types[root.index()].root, key, ctor);
        }

        let mut coercions: HashMap<TypeId, Coercions> = HashMap::new();
        for (info, decl) in types.iter().zip(&self.decls) {
            for kind in &decl.coerces {
                let entry = coercions.entry(info.root).or_default();
                entry.scalar.entry(*kind).or_insert(info.id);
            }
        }
        for (root, source, f) in self.coercions {
            coercions.entry(root).or_default().custom.entry(source).or_insert(f);
        }

        let tree = by_name.get("Tree").copied().unwrap_or(TypeId(0));
        let token = by_name.get("Token").copied().unwrap_or(TypeId(1));
        tracing::debug!(types = types.len(), ignored = ignored.len(), "registry finished");
        Ok(Arc::new(Registry {
            types,
            by_name,
            tables,
            coercions,
            ignored,
            tree,
            token,
        }))
    }
}

fn types_name(decls: &[TypeDecl], ty: TypeId) -> &str {
    &decls[ty.index()].name
}

fn resolve_fields(
    decl: &TypeDecl,
    resolve: &dyn Fn(&TypeDecl, &TypeRef) -> Result<Option<TypeId>, DeclarationError>,
) -> Result<Vec<FieldInfo>, DeclarationError> {
    if decl.kind == DeclKind::Leaf && !decl.fields.is_empty() {
        return Err(DeclarationError::LeafWithFields(decl.name.clone()));
    }
    let mut fields: Vec<FieldInfo> = Vec::with_capacity(decl.fields.len());
    for (name, ty) in &decl.fields {
        if fields.iter().any(|f| &f.name == name) {
            return Err(DeclarationError::DuplicateField {
                ty: decl.name.clone(),
                field: name.clone(),
            });
        }
        let kind = match ty {
            FieldType::Child(r) => FieldKind::Child(resolve(decl, r)?),
            FieldType::Children(r) => FieldKind::Children(resolve(decl, r)?),
            FieldType::Tag(family) => FieldKind::Tag(family.clone()),
            FieldType::Scalar(kind) => FieldKind::Scalar(*kind),
            FieldType::Any => FieldKind::Any,
        };
        fields.push(FieldInfo {
            name: name.clone(),
            kind,
        });
    }
    Ok(fields)
}

/// Splits fields into tag, child range and variadic flag.
fn classify_fields(
    ty: &EcoString,
    fields: &[FieldInfo],
) -> Result<(Option<usize>, Range<usize>, bool), DeclarationError> {
    let tag = fields.first().filter(|f| !f.kind.is_node()).map(|_| 0);
    let rest = tag.map_or(0, |_| 1);
    let nodes: Vec<usize> = (rest..fields.len())
        .filter(|&i| fields[i].kind.is_node())
        .collect();
    let children = match (nodes.first(), nodes.last()) {
        (Some(&first), Some(&last)) => first..last + 1,
        _ => rest..rest,
    };
    if children.len() != nodes.len()
        || !(children.is_empty() || children.start == rest || children.end == fields.len())
    {
        return Err(DeclarationError::NonContiguousChildren(ty.clone()));
    }
    let mut variadic = false;
    for i in children.clone() {
        if matches!(fields[i].kind, FieldKind::Children(_)) {
            if i + 1 != children.end {
                return Err(DeclarationError::VariadicNotLast {
                    ty: ty.clone(),
                    field: fields[i].name.clone(),
                });
            }
            variadic = true;
        }
    }
    Ok((tag, children, variadic))
}

fn inherited_behavior(
    decls: &[TypeDecl],
    parents: &[Option<TypeId>],
    start: usize,
) -> Arc<dyn Behavior> {
    let mut current = Some(start);
    let mut steps = 0;
    while let Some(i) = current {
        if let Some(behavior) = &decls[i].behavior {
            return Arc::clone(behavior);
        }
        current = parents[i].map(TypeId::index);
        steps += 1;
        if steps > decls.len() {
            break;
        }
    }
    Arc::new(DefaultBehavior)
}

/// Builds `ty` from the arguments as given.
pub fn default_constructor(ty: TypeId) -> Constructor {
    Arc::new(move |ast: &mut Ast, args: Vec<Arg>, kwargs: Vec<(EcoString, Arg)>| {
        ast.new_node(ty, args, kwargs)
    })
}

/// Builds `ty` with `member` prepended as its tag.
pub fn tagged_constructor(ty: TypeId, member: &'static str) -> Constructor {
    Arc::new(move |ast: &mut Ast, mut args: Vec<Arg>, kwargs: Vec<(EcoString, Arg)>| {
        args.insert(0, Arg::Scalar(Scalar::symbol(member)));
        ast.new_node(ty, args, kwargs)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{Associativity, OperatorInfo};

    fn ops() -> OperatorFamily {
        OperatorFamily::new(
            "Op",
            [
                OperatorInfo {
                    name: "ADD",
                    symbol: "+",
                    precedence: 1,
                    associativity: Associativity::Left,
                },
                OperatorInfo {
                    name: "MUL",
                    symbol: "*",
                    precedence: 2,
                    associativity: Associativity::Left,
                },
            ],
        )
    }

    #[test]
    fn builtins_are_declared() {
        let registry = RegistryBuilder::new().finish().unwrap();
        let tree = registry.info(registry.tree());
        assert_eq!(tree.name, "Tree");
        assert!(tree.is_variadic());
        assert_eq!(tree.tag_field().unwrap().name, "tag");
        let token = registry.info(registry.token());
        assert!(token.leaf);
        assert_eq!(token.root, registry.token());
    }

    #[test]
    fn fields_are_classified() {
        let mut builder = RegistryBuilder::new();
        let expr = builder.declare(TypeDecl::node("Expr").root().abstract_());
        let binop = builder.declare(
            TypeDecl::node("BinOp")
                .extends(expr)
                .field("op", FieldType::Tag(ops()))
                .field("lhs", FieldType::Child(expr.into()))
                .field("rhs", FieldType::Child(expr.into())),
        );
        let attr = builder.declare(
            TypeDecl::node("GetAttr")
                .extends(expr)
                .field("value", FieldType::Child(expr.into()))
                .field("attr", FieldType::Scalar(ScalarKind::Str)),
        );
        let registry = builder.finish().unwrap();

        let info = registry.info(binop);
        assert_eq!(info.tag_field().unwrap().name, "op");
        assert_eq!(info.child_fields().len(), 2);
        assert_eq!(info.attr_fields().count(), 0);
        assert_eq!(info.root, expr);

        let info = registry.info(attr);
        assert!(info.tag_field().is_none());
        assert_eq!(info.child_fields()[0].name, "value");
        let attrs: Vec<_> = info.attr_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(attrs, ["attr"]);
    }

    #[test]
    fn children_must_be_contiguous() {
        let mut builder = RegistryBuilder::new();
        let expr = builder.declare(TypeDecl::node("Expr").root());
        builder.declare(
            TypeDecl::node("Bad")
                .extends(expr)
                .field("a", FieldType::Child(expr.into()))
                .field("x", FieldType::Any)
                .field("b", FieldType::Child(expr.into()))
                .field("y", FieldType::Any),
        );
        assert_eq!(
            builder.finish().unwrap_err(),
            DeclarationError::NonContiguousChildren("Bad".into())
        );
    }

    #[test]
    fn trailing_children_after_attributes() {
        let mut builder = RegistryBuilder::new();
        let expr = builder.declare(TypeDecl::node("Expr").root());
        let f = builder.declare(
            TypeDecl::node("Function")
                .extends(expr)
                .field("name", FieldType::Scalar(ScalarKind::Str))
                .field("doc", FieldType::Any)
                .field("body", FieldType::Children(expr.into())),
        );
        let registry = builder.finish().unwrap();
        let info = registry.info(f);
        assert_eq!(info.tag_field().unwrap().name, "name");
        assert_eq!(info.child_fields()[0].name, "body");
        assert!(info.is_variadic());
    }

    #[test]
    fn variadic_must_be_last() {
        let mut builder = RegistryBuilder::new();
        let expr = builder.declare(TypeDecl::node("Expr").root());
        builder.declare(
            TypeDecl::node("Bad")
                .extends(expr)
                .field("many", FieldType::Children(expr.into()))
                .field("one", FieldType::Child(expr.into())),
        );
        assert!(matches!(
            builder.finish().unwrap_err(),
            DeclarationError::VariadicNotLast { field, .. } if field == "many"
        ));
    }

    #[test]
    fn names_resolve_regardless_of_order() {
        let mut builder = RegistryBuilder::new();
        let neg = builder.declare(
            TypeDecl::node("Neg")
                .extends("Expr")
                .field("value", FieldType::Child("Expr".into())),
        );
        let expr = builder.declare(TypeDecl::node("Expr").root().abstract_());
        let registry = builder.finish().unwrap();
        assert!(registry.is_subtype(neg, expr));
        assert_eq!(registry.root_of(neg), expr);
        assert_eq!(
            registry.info(neg).child_fields()[0].kind,
            FieldKind::Child(Some(expr))
        );
    }

    #[test]
    fn declaration_errors() {
        let mut builder = RegistryBuilder::new();
        builder.declare(TypeDecl::node("A").extends("Missing"));
        assert!(matches!(
            builder.finish().unwrap_err(),
            DeclarationError::UnknownType { name, .. } if name == "Missing"
        ));

        let mut builder = RegistryBuilder::new();
        builder.declare(TypeDecl::node("A"));
        builder.declare(TypeDecl::node("A"));
        assert_eq!(
            builder.finish().unwrap_err(),
            DeclarationError::DuplicateType("A".into())
        );

        let mut builder = RegistryBuilder::new();
        builder.declare(TypeDecl::node("A").extends("B"));
        builder.declare(TypeDecl::node("B").extends("A"));
        assert!(matches!(
            builder.finish().unwrap_err(),
            DeclarationError::CyclicHierarchy(_)
        ));

        let mut builder = RegistryBuilder::new();
        builder.declare(TypeDecl::node("A").field("x", FieldType::Any));
        builder.declare(TypeDecl::leaf("B").extends("A"));
        assert!(matches!(
            builder.finish().unwrap_err(),
            DeclarationError::KindMismatch { .. }
        ));

        let mut builder = RegistryBuilder::new();
        builder.declare(TypeDecl::leaf("A"));
        builder.declare(TypeDecl::node("B").extends("A"));
        assert!(matches!(
            builder.finish().unwrap_err(),
            DeclarationError::KindMismatch { .. }
        ));

        let mut builder = RegistryBuilder::new();
        builder.declare(TypeDecl::leaf("L").field("x", FieldType::Any));
        assert_eq!(
            builder.finish().unwrap_err(),
            DeclarationError::LeafWithFields("L".into())
        );
    }

    #[test]
    fn leaves_extend_abstract_nodes() {
        let mut builder = RegistryBuilder::new();
        let expr = builder.declare(TypeDecl::node("Expr").root().abstract_());
        let value = builder.declare(TypeDecl::node("Value").extends(expr).abstract_());
        let atom = builder.declare(TypeDecl::leaf("Atom").extends(value).atomic());
        let name = builder.declare(TypeDecl::leaf("Name").extends(expr).name_leaf());
        let registry = builder.finish().unwrap();
        assert_eq!(registry.root_of(atom), expr);
        assert_eq!(registry.root_of(name), expr);
        assert!(registry.is_subtype(atom, value));
    }

    #[test]
    fn first_registration_wins() {
        let mut builder = RegistryBuilder::new();
        let expr = builder.declare(TypeDecl::node("Expr").root().abstract_());
        let first = builder.declare(
            TypeDecl::node("First")
                .extends(expr)
                .field("v", FieldType::Any)
                .symbol("dup"),
        );
        let second = builder.declare(
            TypeDecl::node("Second")
                .extends(expr)
                .field("v", FieldType::Any)
                .symbol("dup"),
        );
        let registry = builder.finish().unwrap();
        assert_eq!(
            registry.ignored_heads(),
            [(expr, HeadKey::Symbol("dup".into()))]
        );

        let mut ast = Ast::new(registry);
        let node = ast
            .sexpr(expr, "dup".into(), vec![1.into()], Vec::new())
            .unwrap();
        assert_eq!(ast.get(node).ty(), first);
        assert_ne!(ast.get(node).ty(), second);
    }

    #[test]
    fn operator_members_are_registered() {
        let mut builder = RegistryBuilder::new();
        let expr = builder.declare(TypeDecl::node("Expr").root().abstract_());
        builder.declare(
            TypeDecl::node("BinOp")
                .extends(expr)
                .field("op", FieldType::Tag(ops()))
                .field("lhs", FieldType::Child(expr.into()))
                .field("rhs", FieldType::Child(expr.into())),
        );
        let registry = builder.finish().unwrap();
        let key = HeadKey::Member {
            family: "Op".into(),
            name: "MUL".into(),
        };
        assert!(registry.constructor(expr, &key).is_some());
        assert!(registry
            .constructor(expr, &HeadKey::Type(expr))
            .is_none());
    }

    #[test]
    fn behaviors_are_inherited() {
        #[derive(Debug)]
        struct Marker;
        impl Behavior for Marker {
            fn command(&self) -> Option<&str> {
                Some("marker")
            }
        }

        let mut builder = RegistryBuilder::new();
        let expr = builder.declare(TypeDecl::node("Expr").root().behavior(Marker));
        let sub = builder.declare(TypeDecl::node("Sub").extends(expr));
        let registry = builder.finish().unwrap();
        assert_eq!(registry.info(sub).behavior().command(), Some("marker"));
        assert_eq!(
            registry.info(registry.tree()).behavior().command(),
            None
        );
    }
}
