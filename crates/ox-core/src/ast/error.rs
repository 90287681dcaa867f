// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! AST errors.
//!
//! [`DeclarationError`] is raised once, while a [`Registry`](super::Registry)
//! is finished. [`AstError`] is raised per call, by node construction,
//! coercion and S-expression dispatch.

use ecow::EcoString;
use thiserror::Error;

use super::NodeId;

/// An error in a set of type declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// Two types share a name.
    #[error("type {0} is declared more than once")]
    DuplicateType(EcoString),

    /// A type reference names no declared type.
    #[error("type {ty} refers to undeclared type {name}")]
    UnknownType {
        /// The referring type.
        ty: EcoString,
        /// The missing name.
        name: EcoString,
    },

    /// A type declares the same field twice.
    #[error("type {ty} declares field {field} more than once")]
    DuplicateField {
        /// The type.
        ty: EcoString,
        /// The repeated field.
        field: EcoString,
    },

    /// Child fields are interleaved with attribute fields.
    #[error("children of {0} must be declared contiguously, all leading or all trailing")]
    NonContiguousChildren(EcoString),

    /// A variadic `Children` field is not the last child field.
    #[error("variadic field {field} of {ty} must be the last child field")]
    VariadicNotLast {
        /// The type.
        ty: EcoString,
        /// The variadic field.
        field: EcoString,
    },

    /// A leaf type declares fields.
    #[error("leaf type {0} cannot declare fields")]
    LeafWithFields(EcoString),

    /// A node extends a leaf or a leaf extends a node.
    #[error("{ty} cannot extend {parent}: one is a node and the other a leaf")]
    KindMismatch {
        /// The extending type.
        ty: EcoString,
        /// Its parent.
        parent: EcoString,
    },

    /// Following `extends` links returns to the starting type.
    #[error("type {0} extends itself")]
    CyclicHierarchy(EcoString),
}

/// An error raised while building or transforming nodes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AstError {
    /// Wrong number of positional arguments.
    #[error("{ty} takes {expected} arguments, got {found}")]
    Arity {
        /// Node type.
        ty: EcoString,
        /// Human-readable expected count.
        expected: String,
        /// Number supplied.
        found: usize,
    },

    /// An argument does not fit its field.
    #[error("field {field} of {ty} expects {expected}, got {found}")]
    FieldType {
        /// Node type.
        ty: EcoString,
        /// Field name.
        field: EcoString,
        /// What the field accepts.
        expected: String,
        /// What was given.
        found: String,
    },

    /// A keyword argument names no field.
    #[error("{ty} has no field {field}")]
    UnknownField {
        /// Node type.
        ty: EcoString,
        /// The keyword.
        field: EcoString,
    },

    /// A field was given both positionally and by keyword.
    #[error("field {field} of {ty} given more than once")]
    DuplicateField {
        /// Node type.
        ty: EcoString,
        /// Field name.
        field: EcoString,
    },

    /// A required field was not given.
    #[error("missing field {field} of {ty}")]
    MissingField {
        /// Node type.
        ty: EcoString,
        /// Field name.
        field: EcoString,
    },

    /// A child already belongs to another node.
    #[error("{ty} node {node} already has a parent")]
    AlreadyParented {
        /// Type of the child.
        ty: EcoString,
        /// The child.
        node: NodeId,
    },

    /// The same node was passed twice as a child.
    #[error("node {0} appears more than once among the children")]
    DuplicateChild(NodeId),

    /// A node id that does not belong to this arena.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// An abstract type was instantiated.
    #[error("cannot instantiate abstract type {0}")]
    AbstractType(EcoString),

    /// Constructing a node from a leaf type, or a leaf from a node type.
    #[error("{ty} is a {kind} type")]
    WrongKind {
        /// The type.
        ty: EcoString,
        /// `"node"` or `"leaf"`.
        kind: &'static str,
    },

    /// A leaf value of a kind the type does not hold.
    #[error("{ty} cannot hold {found} value {value}")]
    LeafValue {
        /// Leaf type.
        ty: EcoString,
        /// Kind of the value.
        found: &'static str,
        /// Its repr.
        value: String,
    },

    /// A value cannot be converted into the hierarchy.
    #[error("cannot coerce {kind} {value} to {hierarchy}")]
    Coercion {
        /// Type of the offending value.
        kind: String,
        /// Its rendering.
        value: String,
        /// Root of the target hierarchy.
        hierarchy: EcoString,
    },

    /// An S-expression head with no registered constructor.
    #[error("invalid head {0}")]
    InvalidHead(String),

    /// A tag names no member of the operator family.
    #[error("{family} has no member {name}")]
    UnknownOperator {
        /// Family name.
        family: EcoString,
        /// The given name.
        name: EcoString,
    },

    /// Nodes from arenas with different registries were combined.
    #[error("nodes belong to different registries")]
    RegistryMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            AstError::AbstractType("Expr".into()).to_string(),
            "cannot instantiate abstract type Expr"
        );
        assert_eq!(
            AstError::Coercion {
                kind: "list".into(),
                value: "[1, 2]".into(),
                hierarchy: "Expr".into(),
            }
            .to_string(),
            "cannot coerce list [1, 2] to Expr"
        );
        assert_eq!(
            DeclarationError::NonContiguousChildren("If".into()).to_string(),
            "children of If must be declared contiguously, all leading or all trailing"
        );
    }
}
