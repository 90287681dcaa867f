// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The Python node catalog.
//!
//! Two hierarchies, `Expr` and `Stmt`, declared on one registry:
//!
//! | Type        | Fields                                   | Heads                         |
//! |-------------|------------------------------------------|-------------------------------|
//! | `Atom`      | leaf: None, bool, int, float, str        |                               |
//! | `Name`      | leaf: symbol                             |                               |
//! | `BinOp`     | `op`, `lhs`, `rhs`                       | operator symbols              |
//! | `UnaryOp`   | `op`, `value`                            | `+ - ~ not`                   |
//! | `And`, `Or` | `lhs`, `rhs`                             | `and`, `or`                   |
//! | `GetAttr`   | `value`, `attr`                          | `.`                           |
//! | `GetItem`   | `value`, `index`                         | `[]`                          |
//! | `Call`      | `func`, `args...`                        | `()`                          |
//! | `Keyword`   | `value`, `name`                          |                               |
//! | `Ternary`   | `cond`, `then`, `orelse`                 | `if`                          |
//! | `Tuple`     | `items...`                               |                               |
//! | `List`      | `items...`                               |                               |
//! | `ExprStmt`  | `value`                                  |                               |
//! | `Assign`    | `target`, `value`                        | `=`                           |
//! | `AugAssign` | `op`, `target`, `value`                  | `+=`, `-=`, ...               |
//! | `Return`    | `values...`                              | `return`                      |
//! | `Cmd`       | leaf: `pass`, `break` or `continue`      | `pass`, `break`, `continue`   |
//! | `Block`     | `body...`                                | `do`                          |
//! | `If`        | `cond`, `body`, `orelse...`              | `if`                          |
//! | `While`     | `cond`, `body`                           | `while`                       |
//! | `Function`  | `name`, `body`, `params...`              | `def`                         |
//!
//! Lists become `List` expressions or `Block` statements, and expressions
//! and scalars used as statements become `ExprStmt`s.

mod expr;
mod stmt;

use std::sync::Arc;

use ecow::{EcoString, eco_format};
use ox_core::ast::{
    Arg, AstError, CoerceSource, Constructor, DeclarationError, FieldType, HeadKey, Registry,
    RegistryBuilder, TypeDecl, TypeId, binary_constructor, flexible_constructor,
    tagged_constructor, unary_constructor,
};
use ox_core::operators::{Operator, OperatorFamily};
use ox_core::{Ast, Scalar, ScalarKind};

pub use expr::{
    AtomBehavior, BinOpBehavior, BoolOpBehavior, PostfixBehavior, TernaryBehavior, TupleBehavior,
    UnaryOpBehavior,
};
pub use stmt::{
    BlockBehavior, CmdBehavior, FunctionBehavior, IfBehavior, LineBehavior, ReturnBehavior,
    WhileBehavior,
};

use crate::operators::{BinaryOp, UnaryOp};

/// Handles of every Python node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[expect(missing_docs, reason = "fields are named after their types")]
pub struct PyTypes {
    pub expr: TypeId,
    pub atom: TypeId,
    pub name: TypeId,
    pub bin_op: TypeId,
    pub unary_op: TypeId,
    pub and: TypeId,
    pub or: TypeId,
    pub get_attr: TypeId,
    pub get_item: TypeId,
    pub call: TypeId,
    pub keyword: TypeId,
    pub ternary: TypeId,
    pub tuple: TypeId,
    pub list: TypeId,
    pub stmt: TypeId,
    pub expr_stmt: TypeId,
    pub assign: TypeId,
    pub aug_assign: TypeId,
    pub ret: TypeId,
    pub cmd: TypeId,
    pub block: TypeId,
    pub if_: TypeId,
    pub while_: TypeId,
    pub function: TypeId,
}

/// Operators that have an augmented assignment form.
fn augmented_ops() -> OperatorFamily {
    OperatorFamily::new(
        "AugOp",
        BinaryOp::all()
            .iter()
            .filter(|op| !op.is_comparison())
            .map(|op| op.info()),
    )
}

fn arity(ty: &str, expected: &str, found: usize) -> AstError {
    AstError::Arity {
        ty: ty.into(),
        expected: expected.into(),
        found,
    }
}

/// Normalizes a suite argument: blocks and lists pass, a single statement
/// becomes a one-item list.
fn suite_arg(ast: &Ast, block: TypeId, arg: Arg) -> Arg {
    match arg {
        Arg::List(_) => arg,
        Arg::Node(id) if ast.try_get(id).is_some_and(|n| n.ty() == block) => arg,
        other => Arg::List(vec![other]),
    }
}

fn list_arg(arg: Arg) -> Arg {
    match arg {
        Arg::List(_) => arg,
        other => Arg::List(vec![other]),
    }
}

/// `(if cond body [orelse])`
fn if_constructor(if_: TypeId, block: TypeId) -> Constructor {
    Arc::new(move |ast: &mut Ast, args: Vec<Arg>, kwargs: Vec<(EcoString, Arg)>| {
        let found = args.len();
        let mut args = args.into_iter();
        let (Some(cond), Some(body), orelse, None) =
            (args.next(), args.next(), args.next(), args.next())
        else {
            return Err(arity("If", "2 or 3", found));
        };
        let mut full = vec![cond, suite_arg(ast, block, body)];
        full.extend(orelse.map(list_arg));
        ast.new_node(if_, full, kwargs)
    })
}

/// `(while cond body)`
fn while_constructor(while_: TypeId, block: TypeId) -> Constructor {
    Arc::new(move |ast: &mut Ast, args: Vec<Arg>, kwargs: Vec<(EcoString, Arg)>| {
        let found = args.len();
        let mut args = args.into_iter();
        let (Some(cond), Some(body), None) = (args.next(), args.next(), args.next()) else {
            return Err(arity("While", "2", found));
        };
        let body = suite_arg(ast, block, body);
        ast.new_node(while_, vec![cond, body], kwargs)
    })
}

/// `(def name params body)`
fn def_constructor(function: TypeId, block: TypeId) -> Constructor {
    Arc::new(move |ast: &mut Ast, args: Vec<Arg>, kwargs: Vec<(EcoString, Arg)>| {
        let found = args.len();
        let mut args = args.into_iter();
        let (Some(name), Some(params), Some(body), None) =
            (args.next(), args.next(), args.next(), args.next())
        else {
            return Err(arity("Function", "3", found));
        };
        let body = suite_arg(ast, block, body);
        ast.new_node(function, vec![name, body, list_arg(params)], kwargs)
    })
}

/// `(pass)`, `(break)`, `(continue)`
fn cmd_constructor(cmd: TypeId, word: &'static str) -> Constructor {
    Arc::new(move |ast: &mut Ast, args: Vec<Arg>, _kwargs: Vec<(EcoString, Arg)>| {
        if !args.is_empty() {
            return Err(arity("Cmd", "0", args.len()));
        }
        ast.leaf(cmd, Scalar::symbol(word))
    })
}

/// `(() func args... name=value...)`: keyword arguments become `Keyword`
/// children after the positional ones.
fn call_constructor(call: TypeId, keyword: TypeId) -> Constructor {
    Arc::new(move |ast: &mut Ast, args: Vec<Arg>, kwargs: Vec<(EcoString, Arg)>| {
        let mut args = args.into_iter();
        let Some(func) = args.next() else {
            return Err(arity("Call", "at least 1", 0));
        };
        let mut rest: Vec<Arg> = args.collect();
        for (name, value) in kwargs {
            let kw = ast.node(keyword, vec![value, Scalar::Symbol(name).into()])?;
            rest.push(kw.into());
        }
        ast.node(call, vec![func, Arg::List(rest)])
    })
}

/// Declares the catalog.
///
/// # Errors
///
/// Returns a [`DeclarationError`] only if the declarations themselves are
/// inconsistent.
#[tracing::instrument]
pub fn registry() -> Result<(Arc<Registry>, PyTypes), DeclarationError> {
    let mut b = RegistryBuilder::new();
    let expr = b.declare(TypeDecl::node("Expr").root().abstract_());
    let child = || FieldType::Child(expr.into());
    let children = || FieldType::Children(expr.into());

    let atom = b.declare(
        TypeDecl::leaf("Atom")
            .extends(expr)
            .atomic()
            .coerces([
                ScalarKind::None,
                ScalarKind::Bool,
                ScalarKind::Int,
                ScalarKind::Float,
                ScalarKind::Str,
            ])
            .behavior(AtomBehavior),
    );
    let name = b.declare(
        TypeDecl::leaf("Name")
            .extends(expr)
            .name_leaf()
            .coerces([ScalarKind::Symbol]),
    );
    let bin_op = b.declare(
        TypeDecl::node("BinOp")
            .extends(expr)
            .field("op", FieldType::Tag(BinaryOp::family()))
            .field("lhs", child())
            .field("rhs", child())
            .behavior(BinOpBehavior::default()),
    );
    let unary_op = b.declare(
        TypeDecl::node("UnaryOp")
            .extends(expr)
            .field("op", FieldType::Tag(UnaryOp::family()))
            .field("value", child())
            .behavior(UnaryOpBehavior),
    );
    let and = b.declare(
        TypeDecl::node("And")
            .extends(expr)
            .field("lhs", child())
            .field("rhs", child())
            .symbol("and")
            .behavior(BoolOpBehavior::and()),
    );
    let or = b.declare(
        TypeDecl::node("Or")
            .extends(expr)
            .field("lhs", child())
            .field("rhs", child())
            .symbol("or")
            .behavior(BoolOpBehavior::or()),
    );
    let get_attr = b.declare(
        TypeDecl::node("GetAttr")
            .extends(expr)
            .field("value", child())
            .field("attr", FieldType::Scalar(ScalarKind::Str))
            .symbol(".")
            .behavior(PostfixBehavior::new("{value}.{attr}", "value")),
    );
    let get_item = b.declare(
        TypeDecl::node("GetItem")
            .extends(expr)
            .field("value", child())
            .field("index", child())
            .symbol("[]")
            .behavior(PostfixBehavior::new("{value}[{index}]", "value")),
    );
    let call = b.declare(
        TypeDecl::node("Call")
            .extends(expr)
            .field("func", child())
            .field("args", children())
            .behavior(PostfixBehavior::new("{func}({args})", "func")),
    );
    let keyword = b.declare(
        TypeDecl::node("Keyword")
            .extends(expr)
            .field("value", child())
            .field("name", FieldType::Scalar(ScalarKind::Symbol))
            .behavior(LineBehavior("{name}={value}")),
    );
    let ternary = b.declare(
        TypeDecl::node("Ternary")
            .extends(expr)
            .field("cond", child())
            .field("then", child())
            .field("orelse", child())
            .symbol("if")
            .behavior(TernaryBehavior),
    );
    let tuple = b.declare(
        TypeDecl::node("Tuple")
            .extends(expr)
            .field("items", children())
            .behavior(TupleBehavior),
    );
    let list = b.declare(
        TypeDecl::node("List")
            .extends(expr)
            .field("items", children())
            .behavior(LineBehavior("[{items}]")),
    );

    let stmt = b.declare(TypeDecl::node("Stmt").root().abstract_());
    let expr_stmt = b.declare(
        TypeDecl::node("ExprStmt")
            .extends(stmt)
            .field("value", child())
            .behavior(LineBehavior("{value}\n")),
    );
    let assign = b.declare(
        TypeDecl::node("Assign")
            .extends(stmt)
            .field("target", child())
            .field("value", child())
            .symbol("=")
            .behavior(LineBehavior("{target} = {value}\n")),
    );
    let aug_assign = b.declare(
        TypeDecl::node("AugAssign")
            .extends(stmt)
            .field("op", FieldType::Tag(augmented_ops()))
            .field("target", child())
            .field("value", child())
            .behavior(LineBehavior("{target} {op}= {value}\n")),
    );
    let ret = b.declare(
        TypeDecl::node("Return")
            .extends(stmt)
            .field("values", children())
            .symbol("return")
            .behavior(ReturnBehavior),
    );
    let cmd = b.declare(
        TypeDecl::leaf("Cmd")
            .extends(stmt)
            .accepts([ScalarKind::Symbol])
            .behavior(CmdBehavior),
    );
    let block = b.declare(
        TypeDecl::node("Block")
            .extends(stmt)
            .field("body", FieldType::Children(stmt.into()))
            .symbol("do")
            .behavior(BlockBehavior),
    );
    let if_ = b.declare(
        TypeDecl::node("If")
            .extends(stmt)
            .field("cond", child())
            .field("body", FieldType::Child(block.into()))
            .field("orelse", FieldType::Children(stmt.into()))
            .behavior(IfBehavior),
    );
    let while_ = b.declare(
        TypeDecl::node("While")
            .extends(stmt)
            .field("cond", child())
            .field("body", FieldType::Child(block.into()))
            .behavior(WhileBehavior),
    );
    let function = b.declare(
        TypeDecl::node("Function")
            .extends(stmt)
            .field("name", FieldType::Scalar(ScalarKind::Symbol))
            .field("body", FieldType::Child(block.into()))
            .field("params", FieldType::Children(name.into()))
            .behavior(FunctionBehavior),
    );

    for &op in BinaryOp::all() {
        if !matches!(op, BinaryOp::Add | BinaryOp::Sub) {
            b.sexpr(expr, op.symbol(), binary_constructor(bin_op, op.name()));
        }
        if !op.is_comparison() {
            let head = HeadKey::Symbol(eco_format!("{}=", op.symbol()));
            b.sexpr(stmt, head, tagged_constructor(aug_assign, op.name()));
        }
    }
    b.sexpr(expr, "+", flexible_constructor((unary_op, "POS"), (bin_op, "ADD")))
        .sexpr(expr, "-", flexible_constructor((unary_op, "NEG"), (bin_op, "SUB")))
        .sexpr(expr, "~", unary_constructor(unary_op, "INVERT"))
        .sexpr(expr, "not", unary_constructor(unary_op, "NOT"))
        .sexpr(expr, "()", call_constructor(call, keyword))
        .sexpr(stmt, "if", if_constructor(if_, block))
        .sexpr(stmt, "while", while_constructor(while_, block))
        .sexpr(stmt, "def", def_constructor(function, block))
        .sexpr(stmt, "pass", cmd_constructor(cmd, "pass"))
        .sexpr(stmt, "break", cmd_constructor(cmd, "break"))
        .sexpr(stmt, "continue", cmd_constructor(cmd, "continue"));

    b.coerce_with(expr, CoerceSource::List, move |ast, arg| ast.node(list, vec![arg]))
        .coerce_with(stmt, CoerceSource::List, move |ast, arg| ast.node(block, vec![arg]))
        .coerce_with(stmt, CoerceSource::Hierarchy(expr), move |ast, arg| {
            ast.node(expr_stmt, vec![arg])
        });
    for kind in [
        ScalarKind::None,
        ScalarKind::Bool,
        ScalarKind::Int,
        ScalarKind::Float,
        ScalarKind::Str,
        ScalarKind::Symbol,
    ] {
        b.coerce_with(stmt, CoerceSource::Scalar(kind), move |ast, arg| {
            ast.node(expr_stmt, vec![arg])
        });
    }

    let registry = b.finish()?;
    let types = PyTypes {
        expr,
        atom,
        name,
        bin_op,
        unary_op,
        and,
        or,
        get_attr,
        get_item,
        call,
        keyword,
        ternary,
        tuple,
        list,
        stmt,
        expr_stmt,
        assign,
        aug_assign,
        ret,
        cmd,
        block,
        if_,
        while_,
        function,
    };
    Ok((registry, types))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_no_duplicate_heads() {
        let (registry, _) = registry().unwrap();
        assert!(registry.ignored_heads().is_empty(), "{:?}", registry.ignored_heads());
    }

    #[test]
    fn operator_members_are_heads() {
        let (registry, types) = registry().unwrap();
        let mut ast = Ast::new(registry);
        let id = ast
            .sexpr(
                types.expr,
                ox_core::ast::Head::member(BinaryOp::FloorDiv),
                vec![7.into(), 2.into()],
                Vec::new(),
            )
            .unwrap();
        assert_eq!(ast.get(id).source().unwrap(), "7 // 2");
        let folded = ast.simplify(id).unwrap();
        assert_eq!(ast.get(folded).value(), &Scalar::Int(3));
    }

    #[test]
    fn variadic_binary_heads_fold_by_associativity() {
        let (registry, types) = registry().unwrap();
        let mut ast = Ast::new(registry);
        let x = || Arg::Scalar(Scalar::symbol("x"));
        let sub = ast
            .sexpr(types.expr, "-".into(), vec![x(), 1.into(), 2.into()], Vec::new())
            .unwrap();
        assert_eq!(ast.get(sub).source().unwrap(), "x - 1 - 2");
        let pow = ast
            .sexpr(types.expr, "**".into(), vec![x(), 2.into(), 3.into()], Vec::new())
            .unwrap();
        assert_eq!(ast.get(pow).source().unwrap(), "x ** 2 ** 3");
    }

    #[test]
    fn augmented_assignment_rejects_comparisons() {
        let (registry, types) = registry().unwrap();
        let mut ast = Ast::new(registry);
        let err = ast
            .node(
                types.aug_assign,
                vec![Scalar::symbol("EQ").into(), Scalar::symbol("x").into(), 1.into()],
            )
            .unwrap_err();
        assert!(matches!(err, AstError::UnknownOperator { .. }));
    }

    #[test]
    fn heads_check_arity() {
        let (registry, types) = registry().unwrap();
        let mut ast = Ast::new(registry);
        let err = ast
            .sexpr(types.stmt, "while".into(), vec![true.into()], Vec::new())
            .unwrap_err();
        assert_eq!(err, arity("While", "2", 1));
        let err = ast
            .sexpr(types.stmt, "pass".into(), vec![1.into()], Vec::new())
            .unwrap_err();
        assert_eq!(err, arity("Cmd", "0", 1));
    }

    #[test]
    fn function_parameters_are_bound() {
        let (registry, types) = registry().unwrap();
        let mut ast = Ast::new(registry);
        let sym = |s: &str| Arg::Scalar(Scalar::symbol(s));
        let sum = ast
            .sexpr(types.expr, "+".into(), vec![sym("x"), sym("y")], Vec::new())
            .unwrap();
        let ret = ast
            .sexpr(types.stmt, "return".into(), vec![sum.into()], Vec::new())
            .unwrap();
        let def = ast
            .sexpr(
                types.stmt,
                "def".into(),
                vec![sym("f"), Arg::List(vec![sym("x")]), ret.into()],
                Vec::new(),
            )
            .unwrap();
        assert_eq!(ast.free_vars(def).into_iter().collect::<Vec<_>>(), ["y"]);
    }

    #[test]
    fn failed_calls_release_keyword_values() {
        let (registry, types) = registry().unwrap();
        let mut ast = Ast::new(registry);
        let f = ast.leaf(types.name, Scalar::symbol("f")).unwrap();
        ast.node(types.expr_stmt, vec![f.into()]).unwrap();
        let v = ast.leaf(types.atom, 1).unwrap();
        let before = ast.len();

        let err = ast
            .sexpr(types.expr, "()".into(), vec![f.into()], vec![("k".into(), v.into())])
            .unwrap_err();
        assert!(matches!(err, AstError::AlreadyParented { node, .. } if node == f));
        assert!(ast.get(v).parent().is_none());
        assert_eq!(ast.len(), before);

        let g = ast.leaf(types.name, Scalar::symbol("g")).unwrap();
        let call = ast
            .sexpr(types.expr, "()".into(), vec![g.into()], vec![("k".into(), v.into())])
            .unwrap();
        assert_eq!(ast.get(call).source().unwrap(), "g(k=1)");
    }

    #[test]
    fn failed_blocks_release_statements() {
        let (registry, types) = registry().unwrap();
        let mut ast = Ast::new(registry);
        let x = ast.leaf(types.name, Scalar::symbol("x")).unwrap();
        let taken = ast.leaf(types.name, Scalar::symbol("y")).unwrap();
        ast.node(types.expr_stmt, vec![taken.into()]).unwrap();

        let err = ast
            .node(types.block, vec![x.into(), Arg::List(vec![taken.into()])])
            .unwrap_err();
        assert!(matches!(err, AstError::AlreadyParented { .. }));
        assert!(ast.get(x).parent().is_none());
    }
}
