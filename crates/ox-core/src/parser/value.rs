// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Values produced by parsing.

use std::fmt;

use ecow::EcoString;

use super::ReduceError;
use crate::ast::NodeId;
use crate::source_analysis::{Scalar, Token};

/// A value on the parser's stack: what reducers receive and return.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// A placeholder for an absent `[...]` item.
    #[default]
    None,
    /// A plain value computed by a reducer.
    Scalar(Scalar),
    /// A token straight from the lexer.
    Token(Token),
    /// A generic tree, produced by rules without reducers.
    Tree(Tree),
    /// A node in the caller's AST arena.
    Node(NodeId),
    /// A sequence of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns true for [`Value::None`].
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the token, if this is one.
    #[must_use]
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Self::Token(token) => Some(token),
            _ => None,
        }
    }

    /// Returns the tree, if this is one.
    #[must_use]
    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Returns the node id, if this is a node.
    #[must_use]
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Converts a scalar or token into its scalar value.
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError::UnexpectedValue`] for trees, nodes and lists.
    pub fn into_scalar(self) -> Result<Scalar, ReduceError> {
        match self {
            Self::None => Ok(Scalar::None),
            Self::Scalar(value) => Ok(value),
            Self::Token(token) => Ok(token.into_value()),
            other => Err(other.unexpected("a scalar or token")),
        }
    }

    /// Unwraps a token.
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError::UnexpectedValue`] for anything else.
    pub fn into_token(self) -> Result<Token, ReduceError> {
        match self {
            Self::Token(token) => Ok(token),
            other => Err(other.unexpected("a token")),
        }
    }

    /// Unwraps a node id.
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError::UnexpectedValue`] for anything else.
    pub fn into_node(self) -> Result<NodeId, ReduceError> {
        match self {
            Self::Node(id) => Ok(id),
            other => Err(other.unexpected("an AST node")),
        }
    }

    /// Flattens into a list: lists yield their items, `None` yields
    /// nothing, anything else yields itself.
    #[must_use]
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Self::List(items) => items,
            Self::None => Vec::new(),
            other => vec![other],
        }
    }

    /// Builds the error for a value a reducer cannot use.
    #[must_use]
    pub fn unexpected(&self, expected: &'static str) -> ReduceError {
        ReduceError::UnexpectedValue {
            expected,
            found: self.to_string(),
        }
    }
}

impl From<Token> for Value {
    fn from(token: Token) -> Self {
        Self::Token(token)
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<Tree> for Value {
    fn from(tree: Tree) -> Self {
        Self::Tree(tree)
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Scalar(value) => f.write_str(&value.repr()),
            Self::Token(token) => write!(f, "{token}"),
            Self::Tree(tree) => write!(f, "{tree}"),
            Self::Node(id) => write!(f, "{id}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A generic parse tree: a tag plus children.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    /// Rule name or alias.
    pub tag: EcoString,
    /// Child values.
    pub children: Vec<Value>,
}

impl Tree {
    /// Creates a tree.
    pub fn new(tag: impl Into<EcoString>, children: Vec<Value>) -> Self {
        Self {
            tag: tag.into(),
            children,
        }
    }
}

impl fmt::Display for Tree {
    /// S-expression rendering: `(tag child child)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.tag)?;
        for child in &self.children {
            write!(f, " {child}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_renders_as_sexpr() {
        let tree = Tree::new(
            "sum",
            vec![
                Value::Token(Token::new("INT", 1)),
                Value::Tree(Tree::new("neg", vec![Value::Scalar(Scalar::Int(2))])),
                Value::None,
            ],
        );
        assert_eq!(tree.to_string(), "(sum INT(1) (neg 2) None)");
    }

    #[test]
    fn into_scalar_unwraps_tokens() {
        let value = Value::Token(Token::new("INT", 7));
        assert_eq!(value.into_scalar().unwrap(), Scalar::Int(7));
        assert!(Value::List(vec![]).into_scalar().is_err());
    }

    #[test]
    fn into_list_flattens() {
        assert!(Value::None.into_list().is_empty());
        assert_eq!(Value::Scalar(Scalar::Int(1)).into_list().len(), 1);
        assert_eq!(
            Value::List(vec![Value::None, Value::None]).into_list().len(),
            2
        );
    }
}
