// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Operator tables and precedence-driven chain reduction.
//!
//! An operator family is an enumeration whose members carry a symbolic name
//! (`ADD`), a display string (`+`), a precedence level (higher binds tighter)
//! and an associativity. Families are described statically through the
//! [`Operator`] trait and type-erased into an [`OperatorFamily`] when a
//! registry needs to validate tag fields at runtime.
//!
//! [`reduce_chain`] folds a flat `[value, op, value, op, value]` sequence
//! into a nested binary tree.
//!
//! # Example
//!
//! ```
//! use ox_core::operators::{reduce_chain, Chain, PrecedenceTable};
//!
//! let table = PrecedenceTable::new().level(["+"], 1).level(["*"], 2);
//! let chain = vec![
//!     Chain::Value("1".to_string()),
//!     Chain::Op("*"),
//!     Chain::Value("2".to_string()),
//!     Chain::Op("+"),
//!     Chain::Value("3".to_string()),
//! ];
//! let tree = reduce_chain(chain, &table, |op, l, r| format!("({op} {l} {r})")).unwrap();
//! assert_eq!(tree, "(+ (* 1 2) 3)");
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use ecow::EcoString;
use thiserror::Error;

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Associativity {
    /// `a - b - c` groups as `(a - b) - c`.
    #[default]
    Left,
    /// `a ** b ** c` groups as `a ** (b ** c)`.
    Right,
}

/// Static description of a single operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperatorInfo {
    /// Symbolic member name, e.g. `ADD`.
    pub name: &'static str,
    /// Display string, e.g. `+`.
    pub symbol: &'static str,
    /// Precedence level. Higher values bind tighter; `0` means the operator
    /// never takes part in precedence comparisons.
    pub precedence: u8,
    /// Associativity for chains of equal precedence.
    pub associativity: Associativity,
}

impl OperatorInfo {
    /// Returns true for right-associative operators.
    #[must_use]
    pub fn is_right_assoc(&self) -> bool {
        self.associativity == Associativity::Right
    }
}

/// An operator enumeration.
///
/// Implementors list their members once in [`Operator::all`] and describe
/// each one through [`Operator::info`]; lookups by name and symbol come for
/// free.
pub trait Operator: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Name of the family, used in diagnostics and as a registry key.
    const FAMILY: &'static str;

    /// All members in declaration order.
    fn all() -> &'static [Self];

    /// Static description of this member.
    fn info(self) -> OperatorInfo;

    /// Symbolic member name, e.g. `ADD`.
    fn name(self) -> &'static str {
        self.info().name
    }

    /// Display string, e.g. `+`.
    fn symbol(self) -> &'static str {
        self.info().symbol
    }

    /// Precedence level.
    fn precedence(self) -> u8 {
        self.info().precedence
    }

    /// Returns true for right-associative operators.
    fn is_right_assoc(self) -> bool {
        self.info().is_right_assoc()
    }

    /// Finds a member by its symbolic name.
    fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|op| op.name() == name)
    }

    /// Finds a member by its display string.
    fn from_symbol(symbol: &str) -> Option<Self> {
        Self::all().iter().copied().find(|op| op.symbol() == symbol)
    }

    /// Type-erased description of the whole family.
    fn family() -> OperatorFamily {
        OperatorFamily::new(Self::FAMILY, Self::all().iter().map(|op| op.info()))
    }

    /// Precedence table covering every member of the family.
    fn precedence_table() -> PrecedenceTable<Self> {
        let mut table = PrecedenceTable::new();
        for &op in Self::all() {
            table = table.level([op], op.precedence());
            if op.is_right_assoc() {
                table = table.right_assoc([op]);
            }
        }
        table
    }
}

/// Runtime description of an operator family.
///
/// Registries use this to validate and normalise tag values: a tag given
/// either as member name (`ADD`) or display string (`+`) resolves to the
/// member.
#[derive(Debug, Clone)]
pub struct OperatorFamily {
    name: EcoString,
    members: Arc<[OperatorInfo]>,
}

impl OperatorFamily {
    /// Creates a family from its members.
    pub fn new(
        name: impl Into<EcoString>,
        members: impl IntoIterator<Item = OperatorInfo>,
    ) -> Self {
        Self {
            name: name.into(),
            members: members.into_iter().collect(),
        }
    }

    /// Returns the family name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all members in declaration order.
    #[must_use]
    pub fn members(&self) -> &[OperatorInfo] {
        &self.members
    }

    /// Looks a member up by its symbolic name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OperatorInfo> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Resolves a member by name first, then by display string.
    #[must_use]
    pub fn resolve(&self, text: &str) -> Option<&OperatorInfo> {
        self.get(text)
            .or_else(|| self.members.iter().find(|m| m.symbol == text))
    }
}

impl PartialEq for OperatorFamily {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for OperatorFamily {}

/// Precedence levels and right-associativity for chain reduction.
#[derive(Debug, Clone)]
pub struct PrecedenceTable<O> {
    levels: HashMap<O, u8>,
    right: HashSet<O>,
}

impl<O: Eq + Hash> Default for PrecedenceTable<O> {
    fn default() -> Self {
        Self {
            levels: HashMap::new(),
            right: HashSet::new(),
        }
    }
}

impl<O: Eq + Hash> PrecedenceTable<O> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `precedence` to every operator in `ops`.
    #[must_use]
    pub fn level(mut self, ops: impl IntoIterator<Item = O>, precedence: u8) -> Self {
        for op in ops {
            self.levels.insert(op, precedence);
        }
        self
    }

    /// Marks every operator in `ops` as right-associative.
    #[must_use]
    pub fn right_assoc(mut self, ops: impl IntoIterator<Item = O>) -> Self {
        self.right.extend(ops);
        self
    }

    /// Returns the precedence of `op`, if it is in the table.
    pub fn precedence(&self, op: &O) -> Option<u8> {
        self.levels.get(op).copied()
    }

    /// Returns true if `op` is right-associative.
    pub fn is_right_assoc(&self, op: &O) -> bool {
        self.right.contains(op)
    }
}

/// One element of an operator chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Chain<V, O> {
    /// An operand.
    Value(V),
    /// An operator between two operands.
    Op(O),
}

/// Errors raised by chain reduction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The sequence was empty.
    #[error("cannot reduce an empty operator chain")]
    Empty,
    /// The sequence did not alternate value, operator, value.
    #[error("malformed operator chain: expected {expected} at position {position}")]
    Malformed {
        /// `"value"` or `"operator"`.
        expected: &'static str,
        /// Index in the input sequence.
        position: usize,
    },
    /// An operator missing from the precedence table.
    #[error("operator {0} has no precedence")]
    UnknownOperator(String),
}

/// Folds an alternating `[value, op, value, ...]` sequence into a tree.
///
/// Each step reduces the operator with the highest precedence. Among
/// operators of equal precedence, left-associative ones reduce leftmost
/// first and right-associative ones rightmost first, so `a - b - c`
/// becomes `(a - b) - c` and `a ** b ** c` becomes `a ** (b ** c)`.
///
/// # Errors
///
/// Returns [`ChainError`] when the sequence is empty, does not alternate or
/// uses an operator missing from `table`.
pub fn reduce_chain<V, O, F>(
    items: Vec<Chain<V, O>>,
    table: &PrecedenceTable<O>,
    mut build: F,
) -> Result<V, ChainError>
where
    O: Eq + Hash + Debug,
    F: FnMut(O, V, V) -> V,
{
    try_reduce_chain(items, table, |op, lhs, rhs| Ok(build(op, lhs, rhs)))
}

/// Fallible form of [`reduce_chain`] for builders that can fail.
///
/// # Errors
///
/// Returns the builder's error, or a [`ChainError`] converted into `E`.
pub fn try_reduce_chain<V, O, F, E>(
    items: Vec<Chain<V, O>>,
    table: &PrecedenceTable<O>,
    mut build: F,
) -> Result<V, E>
where
    O: Eq + Hash + Debug,
    F: FnMut(O, V, V) -> Result<V, E>,
    E: From<ChainError>,
{
    let (mut values, mut ops) = split_chain(items)?;
    let mut keys = ops
        .iter()
        .map(|op| {
            table
                .precedence(op)
                .map(|prec| (prec, table.is_right_assoc(op)))
                .ok_or_else(|| ChainError::UnknownOperator(format!("{op:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    while !ops.is_empty() {
        let idx = select_operator(&keys);
        keys.remove(idx);
        let op = ops.remove(idx);
        let lhs = values.remove(idx);
        let rhs = values.remove(idx);
        values.insert(idx, build(op, lhs, rhs)?);
    }

    values.pop().ok_or_else(|| ChainError::Empty.into())
}

/// Picks the operator to reduce next: maximum of `(precedence, signed index)`
/// where the index is negated for left-associative operators.
fn select_operator(keys: &[(u8, bool)]) -> usize {
    let mut best = 0;
    let mut best_key = None;
    for (i, &(prec, right)) in keys.iter().enumerate() {
        #[expect(clippy::cast_possible_wrap, reason = "chains are far shorter than isize::MAX")]
        let signed = if right { i as isize } else { -(i as isize) };
        let key = (prec, signed);
        if best_key.is_none_or(|b| key > b) {
            best = i;
            best_key = Some(key);
        }
    }
    best
}

fn split_chain<V, O>(items: Vec<Chain<V, O>>) -> Result<(Vec<V>, Vec<O>), ChainError> {
    if items.is_empty() {
        return Err(ChainError::Empty);
    }
    if items.len() % 2 == 0 {
        return Err(ChainError::Malformed {
            expected: "value",
            position: items.len(),
        });
    }
    let mut values = Vec::with_capacity(items.len() / 2 + 1);
    let mut ops = Vec::with_capacity(items.len() / 2);
    for (position, item) in items.into_iter().enumerate() {
        match (position % 2 == 0, item) {
            (true, Chain::Value(v)) => values.push(v),
            (false, Chain::Op(op)) => ops.push(op),
            (true, Chain::Op(_)) => {
                return Err(ChainError::Malformed {
                    expected: "value",
                    position,
                });
            }
            (false, Chain::Value(_)) => {
                return Err(ChainError::Malformed {
                    expected: "operator",
                    position,
                });
            }
        }
    }
    Ok((values, ops))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arith() -> PrecedenceTable<&'static str> {
        PrecedenceTable::new()
            .level(["+", "-"], 1)
            .level(["*", "/"], 2)
            .level(["^"], 3)
            .right_assoc(["^"])
    }

    fn chain(text: &str) -> Vec<Chain<String, &str>> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, part)| {
                if i % 2 == 0 {
                    Chain::Value(part.to_string())
                } else {
                    Chain::Op(match part {
                        "+" => "+",
                        "-" => "-",
                        "*" => "*",
                        "/" => "/",
                        "^" => "^",
                        _ => "?",
                    })
                }
            })
            .collect()
    }

    fn sexpr(text: &str) -> Result<String, ChainError> {
        reduce_chain(chain(text), &arith(), |op, l, r| format!("({op} {l} {r})"))
    }

    #[test]
    fn higher_precedence_reduces_first() {
        assert_eq!(sexpr("1 * 2 + 3").unwrap(), "(+ (* 1 2) 3)");
        assert_eq!(sexpr("1 + 2 * 3").unwrap(), "(+ 1 (* 2 3))");
    }

    #[test]
    fn left_assoc_groups_left() {
        assert_eq!(sexpr("a - b - c").unwrap(), "(- (- a b) c)");
        assert_eq!(sexpr("a * b / c * d").unwrap(), "(* (/ (* a b) c) d)");
    }

    #[test]
    fn right_assoc_groups_right() {
        assert_eq!(sexpr("a ^ b ^ c").unwrap(), "(^ a (^ b c))");
        assert_eq!(sexpr("a * b ^ c ^ d").unwrap(), "(* a (^ b (^ c d)))");
    }

    #[test]
    fn single_value_is_returned() {
        assert_eq!(sexpr("42").unwrap(), "42");
    }

    #[test]
    fn empty_chain_fails() {
        assert_eq!(sexpr(""), Err(ChainError::Empty));
    }

    #[test]
    fn even_chain_fails() {
        assert!(matches!(sexpr("1 +"), Err(ChainError::Malformed { .. })));
    }

    #[test]
    fn misplaced_operator_fails() {
        let items: Vec<Chain<i32, &str>> = vec![Chain::Op("+"), Chain::Value(1), Chain::Op("+")];
        let err = reduce_chain(items, &arith(), |_, l, _| l).unwrap_err();
        assert_eq!(
            err,
            ChainError::Malformed {
                expected: "value",
                position: 0
            }
        );
    }

    #[test]
    fn unknown_operator_fails() {
        assert!(matches!(
            sexpr("1 % 2"),
            Err(ChainError::UnknownOperator(_))
        ));
    }

    #[test]
    fn builder_errors_propagate() {
        #[derive(Debug, PartialEq)]
        enum E {
            Chain(ChainError),
            Div,
        }
        impl From<ChainError> for E {
            fn from(err: ChainError) -> Self {
                E::Chain(err)
            }
        }
        let items = vec![Chain::Value(1), Chain::Op("/"), Chain::Value(0)];
        let result: Result<i64, E> = try_reduce_chain(items, &arith(), |_, l, r| {
            if r == 0 { Err(E::Div) } else { Ok(l / r) }
        });
        assert_eq!(result, Err(E::Div));
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Op {
        Add,
        Pow,
    }

    impl Operator for Op {
        const FAMILY: &'static str = "Op";

        fn all() -> &'static [Self] {
            &[Op::Add, Op::Pow]
        }

        fn info(self) -> OperatorInfo {
            match self {
                Op::Add => OperatorInfo {
                    name: "ADD",
                    symbol: "+",
                    precedence: 1,
                    associativity: Associativity::Left,
                },
                Op::Pow => OperatorInfo {
                    name: "POW",
                    symbol: "**",
                    precedence: 2,
                    associativity: Associativity::Right,
                },
            }
        }
    }

    #[test]
    fn operator_lookup() {
        assert_eq!(Op::from_symbol("**"), Some(Op::Pow));
        assert_eq!(Op::from_name("ADD"), Some(Op::Add));
        assert_eq!(Op::from_name("SUB"), None);
        assert!(Op::Pow.is_right_assoc());
    }

    #[test]
    fn family_resolves_names_and_symbols() {
        let family = Op::family();
        assert_eq!(family.name(), "Op");
        assert_eq!(family.resolve("+").map(|m| m.name), Some("ADD"));
        assert_eq!(family.resolve("POW").map(|m| m.symbol), Some("**"));
        assert!(family.resolve("-").is_none());
    }

    #[test]
    fn operator_table_from_family() {
        let table = Op::precedence_table();
        let items = vec![
            Chain::Value(2_i64),
            Chain::Op(Op::Pow),
            Chain::Value(3),
            Chain::Op(Op::Pow),
            Chain::Value(2),
        ];
        let value = reduce_chain(items, &table, |op, l, r| match op {
            Op::Add => l + r,
            Op::Pow => l.pow(u32::try_from(r).unwrap()),
        })
        .unwrap();
        assert_eq!(value, 512);
    }

    fn eval_reference(values: &[i64], ops: &[char]) -> i64 {
        // Sum of products: the conventional two-level evaluation.
        let mut total = 0;
        let mut sign = 1;
        let mut product = values[0];
        for (op, &v) in ops.iter().zip(&values[1..]) {
            match op {
                '*' => product *= v,
                '+' | '-' => {
                    total += sign * product;
                    sign = if *op == '+' { 1 } else { -1 };
                    product = v;
                }
                _ => unreachable!(),
            }
        }
        total + sign * product
    }

    proptest! {
        #[test]
        fn matches_conventional_evaluation(
            values in prop::collection::vec(-20_i64..20, 1..8),
            ops in prop::collection::vec(prop::sample::select(vec!['+', '-', '*']), 7),
        ) {
            let ops = &ops[..values.len() - 1];
            let mut items = vec![Chain::Value(values[0])];
            for (op, &v) in ops.iter().zip(&values[1..]) {
                items.push(Chain::Op(*op));
                items.push(Chain::Value(v));
            }
            let table = PrecedenceTable::new().level(['+', '-'], 1).level(['*'], 2);
            let got = reduce_chain(items, &table, |op, l, r| match op {
                '+' => l + r,
                '-' => l - r,
                _ => l * r,
            }).unwrap();
            prop_assert_eq!(got, eval_reference(&values, ops));
        }
    }
}
