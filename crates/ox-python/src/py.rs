// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Python operators without a Rust operator trait.
//!
//! `std::ops` covers arithmetic, bitwise operators and shifts on
//! [`Wrapped`] directly. The rest go through [`PyExpr`]:
//!
//! ```
//! use ox_python::{PyExpr, Python};
//!
//! let py = Python::new().unwrap();
//! let e = (py.var("x") + 1).pow(2).and_(py.var("ok"));
//! assert_eq!(e.source().unwrap(), "(x + 1) ** 2 and ok");
//! ```

use ox_core::wrapper::{Operand, Wrapped};

/// Python operators on wrapped expressions.
pub trait PyExpr: Sized {
    /// `self ** rhs`.
    #[must_use]
    fn pow(self, rhs: impl Into<Operand>) -> Wrapped;

    /// `self // rhs`.
    #[must_use]
    fn floor_div(self, rhs: impl Into<Operand>) -> Wrapped;

    /// `self @ rhs`.
    #[must_use]
    fn matmul(self, rhs: impl Into<Operand>) -> Wrapped;

    /// `self and rhs`.
    #[must_use]
    fn and_(self, rhs: impl Into<Operand>) -> Wrapped;

    /// `self or rhs`.
    #[must_use]
    fn or_(self, rhs: impl Into<Operand>) -> Wrapped;

    /// `not self`.
    #[must_use]
    fn not_(self) -> Wrapped;

    /// `self if cond else orelse`.
    #[must_use]
    fn if_else(self, cond: Wrapped, orelse: impl Into<Operand>) -> Wrapped;
}

impl PyExpr for Wrapped {
    fn pow(self, rhs: impl Into<Operand>) -> Wrapped {
        self.binary("**", rhs)
    }

    fn floor_div(self, rhs: impl Into<Operand>) -> Wrapped {
        self.binary("//", rhs)
    }

    fn matmul(self, rhs: impl Into<Operand>) -> Wrapped {
        self.binary("@", rhs)
    }

    fn and_(self, rhs: impl Into<Operand>) -> Wrapped {
        self.binary("and", rhs)
    }

    fn or_(self, rhs: impl Into<Operand>) -> Wrapped {
        self.binary("or", rhs)
    }

    fn not_(self) -> Wrapped {
        self.unary("not")
    }

    fn if_else(self, cond: Wrapped, orelse: impl Into<Operand>) -> Wrapped {
        cond.apply("if", vec![self.into(), orelse.into()], Vec::new())
    }
}
