// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Building Python trees from Rust expressions.

use std::collections::BTreeSet;

use ecow::EcoString;
use ox_core::Scalar;
use ox_core::ast::AstError;
use ox_core::wrapper::Operand;
use ox_python::{PyExpr, Python};

fn py() -> Python {
    Python::new().unwrap()
}

#[test]
fn rust_operators_build_python_operators() {
    let py = py();
    let (x, y) = (py.var("x"), py.var("y"));
    let cases = [
        (x.clone() + y.clone() * 2, "x + y * 2"),
        ((x.clone() + &y) * 2, "(x + y) * 2"),
        (x.clone() - (y.clone() - 1), "x - (y - 1)"),
        (x.clone() / 2.5 % 3, "x / 2.5 % 3"),
        (x.clone() << 1 | y.clone() & 7 ^ 1, "x << 1 | y & 7 ^ 1"),
        (-x.clone() >> 2, "-x >> 2"),
        (!(x.clone() + 1), "~(x + 1)"),
    ];
    for (wrapped, expected) in cases {
        assert_eq!(wrapped.source().unwrap(), expected);
    }
}

#[test]
fn host_values_on_the_left() {
    let py = py();
    assert_eq!((1_i64 - py.var("x")).source().unwrap(), "1 - x");
    assert_eq!((0.5 * (py.var("x") + 1)).source().unwrap(), "0.5 * (x + 1)");
}

#[test]
fn python_only_operators() {
    let py = py();
    let x = py.var("x");
    assert_eq!(x.clone().pow(2).pow(3).source().unwrap(), "(x ** 2) ** 3");
    assert_eq!(x.clone().floor_div(2).matmul(&x).source().unwrap(), "x // 2 @ x");
    assert_eq!(x.clone().or_(false).not_().source().unwrap(), "not (x or False)");
    let pick = py.value("a").if_else(x.clone().compare(">", 0), py.value(Scalar::None));
    assert_eq!(pick.source().unwrap(), "'a' if x > 0 else None");
}

#[test]
fn postfix_forms() {
    let py = py();
    let call = py
        .var("print")
        .call(vec![py.var("x").attr("real").into(), 1.into()], [("sep", Operand::from(""))]);
    assert_eq!(call.source().unwrap(), "print(x.real, 1, sep='')");
    let item = py.var("xs").index(py.var("i") + 1).attr("imag");
    assert_eq!(item.source().unwrap(), "xs[i + 1].imag");
    let literal = py.value(3).attr("bit_length").call(Vec::new(), Vec::<(EcoString, _)>::new());
    assert_eq!(literal.source().unwrap(), "(3).bit_length()");
}

#[test]
fn statements_from_sexprs() {
    let py = py();
    let x = py.var("x");
    let body = vec![
        Operand::from(py.sexpr("+=", vec![(&x).into(), 1.into()], Vec::new())),
        py.stmt("break", Vec::new(), Vec::new()).into(),
    ];
    let loop_ = py.sexpr("while", vec![x.clone().compare("<", 10).into(), body.into()], Vec::new());
    assert_eq!(loop_.source().unwrap(), "while x < 10:\n    x += 1\n    break\n");

    let ret = py.sexpr("return", vec![x.clone().into(), 2.into()], Vec::new());
    let def = py.sexpr(
        "def",
        vec![Scalar::symbol("f").into(), vec![Scalar::symbol("x")].into(), vec![ret].into()],
        Vec::new(),
    );
    assert_eq!(def.source().unwrap(), "def f(x):\n    return x, 2\n");
}

#[test]
fn free_variables_skip_bound_names() {
    let py = py();
    let e = py.var("x") * py.var("y") + py.var("x");
    let expected: BTreeSet<EcoString> = ["x".into(), "y".into()].into();
    assert_eq!(e.free_vars().unwrap(), expected);

    let body = vec![py.sexpr("return", vec![e.into()], Vec::new())];
    let def = py.sexpr(
        "def",
        vec![Scalar::symbol("f").into(), vec![Scalar::symbol("x")].into(), body.into()],
        Vec::new(),
    );
    let expected: BTreeSet<EcoString> = ["y".into()].into();
    assert_eq!(def.free_vars().unwrap(), expected);
}

#[test]
fn errors_propagate_through_operators() {
    let py = py();
    let bad = py.sexpr("nope", vec![1.into()], Vec::new());
    assert!(matches!(bad.error(), Some(AstError::InvalidHead(_))));

    let wrapped = (bad + 1) * py.var("x");
    assert!(matches!(wrapped.error(), Some(AstError::InvalidHead(_))));
    assert!(wrapped.source().is_err());
    assert!(wrapped.free_vars().is_err());
}

#[test]
fn simplify_folds_constants() {
    let py = py();
    let e = (py.value(2) + 3) * py.var("x") + py.value(7).floor_div(-2);
    assert_eq!(e.simplify().source().unwrap(), "5 * x + -4");
    let all = py.value(1).compare("<", 2).and_(py.value("yes"));
    let (ast, id) = all.simplify().finish().unwrap();
    assert_eq!(ast.get(id).value(), &Scalar::str("yes"));
}

#[test]
fn built_trees_match_parsed_trees() {
    let py = py();
    let keyword = ("k", Operand::from(py.var("d").index(0)));
    let built = py.var("a").attr("b").call(vec![(py.var("c") - 1).into()], [keyword]);
    let (parsed, id) = py.parse_expr("a.b(c - 1, k=d[0])").unwrap();
    let (mut ast, built) = built.finish().unwrap();
    let parsed = ast.import(&parsed, id).unwrap();
    assert!(ast.structurally_equal(built, parsed));
}
