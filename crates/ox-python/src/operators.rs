// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Python operator families and precedence levels.
//!
//! Levels follow the Python reference: higher binds tighter. `and`, `or`
//! and the conditional expression are separate node types, so their levels
//! are plain constants.

use ox_core::operators::{Associativity, Operator, OperatorInfo};

/// `x if c else y`.
pub const TERNARY: u8 = 1;
/// `or`.
pub const OR: u8 = 2;
/// `and`.
pub const AND: u8 = 3;
/// `not`.
pub const NOT: u8 = 4;
/// `==`, `<`, ...
pub const COMPARISON: u8 = 5;
/// `-x`, `+x`, `~x`.
pub const UNARY: u8 = 12;
/// `**`.
pub const POWER: u8 = 13;

/// Binary operators: arithmetic, bitwise and comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    TrueDiv,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,
    /// `@`
    MatMul,
    /// `**`
    Pow,
    /// `<<`
    LShift,
    /// `>>`
    RShift,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl BinaryOp {
    /// True for `==`, `!=`, `<`, `<=`, `>`, `>=`.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        self.precedence() == COMPARISON
    }
}

impl Operator for BinaryOp {
    const FAMILY: &'static str = "BinaryOp";

    fn all() -> &'static [Self] {
        &[
            Self::Add,
            Self::Sub,
            Self::Mul,
            Self::TrueDiv,
            Self::FloorDiv,
            Self::Mod,
            Self::MatMul,
            Self::Pow,
            Self::LShift,
            Self::RShift,
            Self::BitOr,
            Self::BitXor,
            Self::BitAnd,
            Self::Eq,
            Self::Ne,
            Self::Lt,
            Self::Le,
            Self::Gt,
            Self::Ge,
        ]
    }

    fn info(self) -> OperatorInfo {
        let (name, symbol, precedence) = match self {
            Self::Add => ("ADD", "+", 10),
            Self::Sub => ("SUB", "-", 10),
            Self::Mul => ("MUL", "*", 11),
            Self::TrueDiv => ("TRUEDIV", "/", 11),
            Self::FloorDiv => ("FLOORDIV", "//", 11),
            Self::Mod => ("MOD", "%", 11),
            Self::MatMul => ("MATMUL", "@", 11),
            Self::Pow => ("POW", "**", POWER),
            Self::LShift => ("LSHIFT", "<<", 9),
            Self::RShift => ("RSHIFT", ">>", 9),
            Self::BitOr => ("BITOR", "|", 6),
            Self::BitXor => ("BITXOR", "^", 7),
            Self::BitAnd => ("BITAND", "&", 8),
            Self::Eq => ("EQ", "==", COMPARISON),
            Self::Ne => ("NE", "!=", COMPARISON),
            Self::Lt => ("LT", "<", COMPARISON),
            Self::Le => ("LE", "<=", COMPARISON),
            Self::Gt => ("GT", ">", COMPARISON),
            Self::Ge => ("GE", ">=", COMPARISON),
        };
        OperatorInfo {
            name,
            symbol,
            precedence,
            associativity: if self == Self::Pow {
                Associativity::Right
            } else {
                Associativity::Left
            },
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Pos,
    /// `~x`
    Invert,
    /// `not x`
    Not,
}

impl Operator for UnaryOp {
    const FAMILY: &'static str = "UnaryOp";

    fn all() -> &'static [Self] {
        &[Self::Neg, Self::Pos, Self::Invert, Self::Not]
    }

    fn info(self) -> OperatorInfo {
        let (name, symbol, precedence) = match self {
            Self::Neg => ("NEG", "-", UNARY),
            Self::Pos => ("POS", "+", UNARY),
            Self::Invert => ("INVERT", "~", UNARY),
            Self::Not => ("NOT", "not", NOT),
        };
        OperatorInfo {
            name,
            symbol,
            precedence,
            associativity: Associativity::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ox_core::operators::{Chain, reduce_chain};

    #[test]
    fn lookups() {
        assert_eq!(BinaryOp::from_symbol("//"), Some(BinaryOp::FloorDiv));
        assert_eq!(BinaryOp::from_name("POW"), Some(BinaryOp::Pow));
        assert_eq!(UnaryOp::from_symbol("not"), Some(UnaryOp::Not));
        assert!(BinaryOp::Le.is_comparison());
        assert!(!BinaryOp::BitOr.is_comparison());
        assert!(BinaryOp::Pow.is_right_assoc());
        assert_eq!(BinaryOp::family().members().len(), BinaryOp::all().len());
    }

    #[test]
    fn python_precedence_in_chains() {
        let table = BinaryOp::precedence_table();
        let chain = |text: &str| -> String {
            let items = text
                .split_whitespace()
                .enumerate()
                .map(|(i, part)| {
                    if i % 2 == 0 {
                        Chain::Value(part.to_string())
                    } else {
                        Chain::Op(BinaryOp::from_symbol(part).unwrap())
                    }
                })
                .collect();
            reduce_chain(items, &table, |op, l, r| format!("({} {l} {r})", op.symbol())).unwrap()
        };
        assert_eq!(chain("a | b & c"), "(| a (& b c))");
        assert_eq!(chain("a << b + c"), "(<< a (+ b c))");
        assert_eq!(chain("a < b + c * d"), "(< a (+ b (* c d)))");
        assert_eq!(chain("a ** b ** c"), "(** a (** b c))");
        assert_eq!(chain("a - b - c"), "(- (- a b) c)");
    }
}
