// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Constant folding with Python semantics.
//!
//! Every function returns `None` when Python would raise (division by
//! zero, unsupported operand types) or when the result does not fit the
//! host value model, so the node is kept unfolded.

use ox_core::operators::OperatorInfo;
use ox_core::Scalar;

/// A numeric operand: `bool` and `int` fold as integers.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

fn num(value: &Scalar) -> Option<Num> {
    match value {
        Scalar::Float(x) => Some(Num::Float(*x)),
        other => other.as_int().map(Num::Int),
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && (r < 0) != (b < 0) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn float_mod(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 {
        return None;
    }
    Some(a - b * (a / b).floor())
}

fn int_pow(base: i64, exp: i64) -> Option<Scalar> {
    if exp < 0 {
        #[expect(clippy::cast_precision_loss, reason = "negative powers are floats in Python")]
        let base = base as f64;
        #[expect(clippy::cast_precision_loss, reason = "negative powers are floats in Python")]
        let exp = exp as f64;
        return Some(Scalar::Float(base.powf(exp)));
    }
    let exp = u32::try_from(exp).ok()?;
    base.checked_pow(exp).map(Scalar::Int)
}

fn shift(a: i64, b: i64, left: bool) -> Option<i64> {
    let b = u32::try_from(b).ok()?;
    if left {
        let shifted = a.checked_shl(b)?;
        (shifted >> b == a).then_some(shifted)
    } else {
        Some(a >> b.min(63))
    }
}

fn arithmetic(name: &str, lhs: Num, rhs: Num) -> Option<Scalar> {
    use Num::Int;
    match (lhs, rhs) {
        (Int(a), Int(b)) => match name {
            "ADD" => a.checked_add(b).map(Scalar::Int),
            "SUB" => a.checked_sub(b).map(Scalar::Int),
            "MUL" => a.checked_mul(b).map(Scalar::Int),
            "TRUEDIV" if b != 0 => {
                #[expect(clippy::cast_precision_loss, reason = "true division yields a float")]
                let value = a as f64 / b as f64;
                Some(Scalar::Float(value))
            }
            "FLOORDIV" => floor_div(a, b).map(Scalar::Int),
            "MOD" => floor_mod(a, b).map(Scalar::Int),
            "POW" => int_pow(a, b),
            "LSHIFT" => shift(a, b, true).map(Scalar::Int),
            "RSHIFT" => shift(a, b, false).map(Scalar::Int),
            "BITAND" => Some(Scalar::Int(a & b)),
            "BITOR" => Some(Scalar::Int(a | b)),
            "BITXOR" => Some(Scalar::Int(a ^ b)),
            _ => None,
        },
        _ => {
            let (a, b) = (float(lhs), float(rhs));
            let value = match name {
                "ADD" => a + b,
                "SUB" => a - b,
                "MUL" => a * b,
                "TRUEDIV" if b != 0.0 => a / b,
                "FLOORDIV" if b != 0.0 => (a / b).floor(),
                "MOD" => float_mod(a, b)?,
                "POW" => a.powf(b),
                _ => return None,
            };
            value.is_finite().then_some(Scalar::Float(value))
        }
    }
}

#[expect(clippy::cast_precision_loss, reason = "mixed arithmetic promotes to float")]
fn float(n: Num) -> f64 {
    match n {
        Num::Int(i) => i as f64,
        Num::Float(x) => x,
    }
}

fn compare(name: &str, lhs: &Scalar, rhs: &Scalar) -> Option<Scalar> {
    use std::cmp::Ordering;

    let ordering = match (num(lhs), num(rhs)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
        (Some(a), Some(b)) => float(a).partial_cmp(&float(b)),
        _ => match (lhs, rhs) {
            (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
            (Scalar::None, Scalar::None) => Some(Ordering::Equal),
            _ => None,
        },
    };
    let result = match name {
        "EQ" => ordering == Some(Ordering::Equal),
        "NE" => ordering != Some(Ordering::Equal),
        // None and mixed types do not order
        _ if matches!(lhs, Scalar::None) => return None,
        "LT" => ordering? == Ordering::Less,
        "LE" => ordering? != Ordering::Greater,
        "GT" => ordering? == Ordering::Greater,
        "GE" => ordering? != Ordering::Less,
        _ => return None,
    };
    Some(Scalar::Bool(result))
}

/// Folds a binary operator.
#[must_use]
pub fn binary(op: &OperatorInfo, lhs: &Scalar, rhs: &Scalar) -> Option<Scalar> {
    if matches!(op.name, "EQ" | "NE" | "LT" | "LE" | "GT" | "GE") {
        return compare(op.name, lhs, rhs);
    }
    if let (Scalar::Bool(a), Scalar::Bool(b)) = (lhs, rhs) {
        match op.name {
            "BITAND" => return Some(Scalar::Bool(a & b)),
            "BITOR" => return Some(Scalar::Bool(a | b)),
            "BITXOR" => return Some(Scalar::Bool(a ^ b)),
            _ => {}
        }
    }
    if let (Scalar::Str(a), Scalar::Str(b), "ADD") = (lhs, rhs, op.name) {
        let mut joined = a.clone();
        joined.push_str(b);
        return Some(Scalar::Str(joined));
    }
    arithmetic(op.name, num(lhs)?, num(rhs)?)
}

/// Folds a unary operator.
#[must_use]
pub fn unary(op: &OperatorInfo, value: &Scalar) -> Option<Scalar> {
    if op.name == "NOT" {
        return Some(Scalar::Bool(!value.is_truthy()));
    }
    match (op.name, num(value)?) {
        ("NEG", Num::Int(i)) => i.checked_neg().map(Scalar::Int),
        ("NEG", Num::Float(x)) => Some(Scalar::Float(-x)),
        ("POS", Num::Int(i)) => Some(Scalar::Int(i)),
        ("POS", Num::Float(x)) => Some(Scalar::Float(x)),
        ("INVERT", Num::Int(i)) => Some(Scalar::Int(!i)),
        _ => None,
    }
}

/// Folds `lhs and rhs`: the first falsy operand, else the last.
#[must_use]
pub fn and(lhs: &Scalar, rhs: &Scalar) -> Scalar {
    if lhs.is_truthy() { rhs } else { lhs }.clone()
}

/// Folds `lhs or rhs`: the first truthy operand, else the last.
#[must_use]
pub fn or(lhs: &Scalar, rhs: &Scalar) -> Scalar {
    if lhs.is_truthy() { lhs } else { rhs }.clone()
}
