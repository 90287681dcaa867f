// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Grammar text and reducers for the Python subset.
//!
//! Binary operators are parsed as flat chains (`factor (op factor)*`) and
//! folded by precedence, so the grammar needs one rule for all of them.
//! `**` keeps its own rule because it binds tighter than unary minus on
//! its left.

use ecow::EcoString;
use ox_core::ast::{Arg, Head};
use ox_core::operators::{Chain, Operator, try_reduce_chain};
use ox_core::parser::{LexerMode, ParserBuildError, ParserOptions, ReduceError, Value};
use ox_core::source_analysis::Transform;
use ox_core::{Ast, NodeId, Parser, Scalar};

use crate::nodes::PyTypes;
use crate::operators::{BinaryOp, UnaryOp};

/// Start rule for whole modules.
pub const MODULE: &str = "file_input";
/// Start rule for a single expression.
pub const EXPRESSION: &str = "eval_input";

/// The grammar, terminals included.
pub const GRAMMAR: &str = r#"
file_input: (_NEWLINE | stmt)* -> module
eval_input: testlist _NEWLINE* -> expression

?stmt: simple_stmt | compound_stmt
simple_stmt: small_stmt (";" small_stmt)* [";"] _NEWLINE -> simple_stmt
?small_stmt: testlist -> expr_stmt
           | testlist "=" testlist -> assign
           | test AUG_OP test -> aug_assign
           | "return" [test ("," test)*] -> return_stmt
           | "pass" -> pass_stmt
           | "break" -> break_stmt
           | "continue" -> continue_stmt
?compound_stmt: if_stmt | while_stmt | funcdef
if_stmt: "if" test ":" suite [else_part] -> if_stmt
?else_part: "elif" test ":" suite [else_part] -> if_stmt
          | "else" ":" suite
while_stmt: "while" test ":" suite -> while_stmt
funcdef: "def" NAME "(" [NAME ("," NAME)*] ")" ":" suite -> funcdef
suite: _NEWLINE _INDENT stmt+ _DEDENT -> suite
     | simple_stmt -> suite

?testlist: test
         | test ("," test)+ [","] -> tuple
         | test "," -> tuple
?test: or_test
     | or_test "if" or_test "else" test -> ternary
?or_test: and_test
        | or_test "or" and_test -> or_op
?and_test: not_test
         | and_test "and" not_test -> and_op
?not_test: "not" not_test -> not_op
         | expr
?expr: factor
     | factor (_binop factor)+ -> chain
!_binop: "+" | "-" | "*" | "/" | "//" | "%" | "@" | "<<" | ">>" | "&" | "|" | "^"
       | "==" | "!=" | "<" | "<=" | ">" | ">="
?factor: "-" factor -> neg
       | "+" factor -> pos
       | "~" factor -> invert
       | power
?power: atom_expr
      | atom_expr "**" factor -> pow
?atom_expr: atom_expr "(" [_arguments] ")" -> call
          | atom_expr "[" test "]" -> getitem
          | atom_expr "." NAME -> getattr
          | atom
_arguments: argument ("," argument)* [","]
?argument: test
         | NAME "=" test -> keyword
?atom: NAME -> name
     | INT -> number
     | FLOAT -> number
     | STRING+ -> string
     | "None" -> const_none
     | "True" -> const_true
     | "False" -> const_false
     | "(" ")" -> empty_tuple
     | "(" testlist ")"
     | "[" [test ("," test)* [","]] "]" -> list

NAME: /[A-Za-z_][A-Za-z0-9_]*/
FLOAT: /(\d+\.\d*|\.\d+)([eE][-+]?\d+)?|\d+[eE][-+]?\d+/
INT: /\d+/
STRING: /'(?:[^'\\\n]|\\.)*'|"(?:[^"\\\n]|\\.)*"/
AUG_OP: /(\*\*|\/\/|<<|>>|[-+*\/%@&|^])=/
_NEWLINE: /(\r?\n[\t ]*(#[^\n]*)?)+/
WS: /[\t \f]+/
COMMENT: /#[^\n]*/
LINE_CONT: /\\[\t \f]*\r?\n/
%ignore WS
%ignore COMMENT
%ignore LINE_CONT
%declare _INDENT _DEDENT
"#;

/// Decodes a quoted string literal.
fn unescape(text: &str) -> Result<Scalar, String> {
    let body = text
        .get(1..text.len().saturating_sub(1))
        .ok_or_else(|| format!("malformed string literal {text}"))?;
    let mut out = EcoString::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(c @ ('\\' | '\'' | '"')) => out.push(c),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => return Err(format!("trailing backslash in {text}")),
        }
    }
    Ok(Scalar::Str(out))
}

/// Exactly `N` node children.
fn nodes<const N: usize>(children: Vec<Value>) -> Result<[NodeId; N], ReduceError> {
    let ids = children
        .into_iter()
        .map(Value::into_node)
        .collect::<Result<Vec<_>, _>>()?;
    let found = ids.len();
    ids.try_into()
        .map_err(|_| ReduceError::message(format!("expected {N} children, found {found}")))
}

/// Node children, skipping placeholders of absent optional items.
fn present(children: Vec<Value>) -> Result<Vec<Arg>, ReduceError> {
    children
        .into_iter()
        .filter(|v| !v.is_none())
        .map(|v| v.into_node().map(Arg::Node))
        .collect()
}

/// Statements, flattening the lists produced by `simple_stmt` and `suite`.
fn statements(children: Vec<Value>) -> Result<Arg, ReduceError> {
    let mut out = Vec::new();
    for child in children {
        for item in child.into_list() {
            out.push(Arg::Node(item.into_node()?));
        }
    }
    Ok(Arg::List(out))
}

fn token_text(value: Value) -> Result<EcoString, ReduceError> {
    Ok(value.into_token()?.text())
}

fn unary(
    ast: &mut Ast,
    types: PyTypes,
    op: UnaryOp,
    children: Vec<Value>,
) -> Result<Value, ReduceError> {
    let [value] = nodes(children)?;
    let id = ast.node(types.unary_op, vec![Scalar::symbol(op.name()).into(), value.into()])?;
    Ok(Value::Node(id))
}

fn cmd(ast: &mut Ast, types: PyTypes, word: &str) -> Result<Value, ReduceError> {
    Ok(Value::Node(ast.leaf(types.cmd, Scalar::symbol(word))?))
}

/// Folds `factor (op factor)*` by operator precedence.
fn chain(ast: &mut Ast, types: PyTypes, children: Vec<Value>) -> Result<Value, ReduceError> {
    let mut items = Vec::with_capacity(children.len());
    for (i, child) in children.into_iter().enumerate() {
        if i % 2 == 0 {
            items.push(Chain::Value(child.into_node()?));
            continue;
        }
        let text = token_text(child)?;
        let op = BinaryOp::from_symbol(&text)
            .ok_or_else(|| ReduceError::message(format!("unknown operator {text}")))?;
        items.push(Chain::Op(op));
    }
    let table = BinaryOp::precedence_table();
    let id = try_reduce_chain(items, &table, |op, lhs, rhs| {
        let args = vec![Scalar::symbol(op.name()).into(), lhs.into(), rhs.into()];
        ast.node(types.bin_op, args).map_err(ReduceError::from)
    })?;
    Ok(Value::Node(id))
}

/// Builds a parser starting at `start` whose reducers produce nodes of
/// the Python catalog.
///
/// # Errors
///
/// Returns a [`ParserBuildError`] if the grammar does not compile.
#[tracing::instrument(skip(types))]
pub fn parser(types: PyTypes, start: &str) -> Result<Parser<Ast>, ParserBuildError> {
    Parser::from_grammar(GRAMMAR)
        .options(ParserOptions::default().with_lexer(LexerMode::Standard))
        .start(start)
        .transform("INT", Transform::int())
        .transform("FLOAT", Transform::float())
        .transform("STRING", Transform::new(unescape))
        // Statements
        .reducer("module", move |ast: &mut Ast, children| {
            let body = statements(children)?;
            Ok(Value::Node(ast.node(types.block, vec![body])?))
        })
        .reducer("expression", |_, children: Vec<Value>| {
            let [value] = nodes(children)?;
            Ok(Value::Node(value))
        })
        .reducer("simple_stmt", |_, children| Ok(Value::List(children)))
        .reducer("suite", |_, children| {
            let Arg::List(items) = statements(children)? else {
                return Err(ReduceError::message("suite is not a statement list"));
            };
            let items = items
                .into_iter()
                .filter_map(|item| match item {
                    Arg::Node(id) => Some(Value::Node(id)),
                    _ => None,
                })
                .collect();
            Ok(Value::List(items))
        })
        .reducer("expr_stmt", move |ast: &mut Ast, children| {
            let [value] = nodes(children)?;
            Ok(Value::Node(ast.node(types.expr_stmt, vec![value.into()])?))
        })
        .reducer("assign", move |ast: &mut Ast, children| {
            let [target, value] = nodes(children)?;
            let id = ast.node(types.assign, vec![target.into(), value.into()])?;
            Ok(Value::Node(id))
        })
        .reducer("aug_assign", move |ast: &mut Ast, children: Vec<Value>| {
            let mut children = children.into_iter();
            let (Some(target), Some(op), Some(value)) =
                (children.next(), children.next(), children.next())
            else {
                return Err(ReduceError::message("augmented assignment needs three parts"));
            };
            let op = token_text(op)?;
            let symbol = op.strip_suffix('=').unwrap_or(op.as_str());
            let args = vec![
                Scalar::symbol(symbol).into(),
                target.into_node()?.into(),
                value.into_node()?.into(),
            ];
            Ok(Value::Node(ast.node(types.aug_assign, args)?))
        })
        .reducer("return_stmt", move |ast: &mut Ast, children| {
            let values = present(children)?;
            Ok(Value::Node(ast.node(types.ret, vec![Arg::List(values)])?))
        })
        .reducer("pass_stmt", move |ast: &mut Ast, _| cmd(ast, types, "pass"))
        .reducer("break_stmt", move |ast: &mut Ast, _| cmd(ast, types, "break"))
        .reducer("continue_stmt", move |ast: &mut Ast, _| cmd(ast, types, "continue"))
        .reducer("if_stmt", move |ast: &mut Ast, children: Vec<Value>| {
            let mut children = children.into_iter();
            let (Some(cond), Some(body)) = (children.next(), children.next()) else {
                return Err(ReduceError::message("if needs a condition and a body"));
            };
            let args = vec![
                cond.into_node()?.into(),
                statements(vec![body])?,
                statements(children.collect())?,
            ];
            Ok(Value::Node(ast.sexpr(types.stmt, Head::from("if"), args, Vec::new())?))
        })
        .reducer("while_stmt", move |ast: &mut Ast, children: Vec<Value>| {
            let mut children = children.into_iter();
            let (Some(cond), Some(body), None) = (children.next(), children.next(), children.next())
            else {
                return Err(ReduceError::message("while needs a condition and a body"));
            };
            let args = vec![cond.into_node()?.into(), statements(vec![body])?];
            Ok(Value::Node(ast.sexpr(types.stmt, Head::from("while"), args, Vec::new())?))
        })
        .reducer("funcdef", move |ast: &mut Ast, mut children: Vec<Value>| {
            let body = children.pop().unwrap_or_default();
            let mut children = children.into_iter();
            let name = token_text(children.next().unwrap_or_default())?;
            let params = children
                .filter(|v| !v.is_none())
                .map(|v| Ok(Arg::Scalar(Scalar::symbol(token_text(v)?))))
                .collect::<Result<Vec<_>, ReduceError>>()?;
            let args = vec![
                Scalar::symbol(name).into(),
                Arg::List(params),
                statements(vec![body])?,
            ];
            Ok(Value::Node(ast.sexpr(types.stmt, Head::from("def"), args, Vec::new())?))
        })
        // Expressions
        .reducer("tuple", move |ast: &mut Ast, children| {
            let items = present(children)?;
            Ok(Value::Node(ast.node(types.tuple, vec![Arg::List(items)])?))
        })
        .reducer("empty_tuple", move |ast: &mut Ast, _| {
            Ok(Value::Node(ast.node(types.tuple, Vec::new())?))
        })
        .reducer("list", move |ast: &mut Ast, children| {
            let items = present(children)?;
            Ok(Value::Node(ast.node(types.list, vec![Arg::List(items)])?))
        })
        .reducer("ternary", move |ast: &mut Ast, children| {
            let [then, cond, orelse] = nodes(children)?;
            let args = vec![cond.into(), then.into(), orelse.into()];
            Ok(Value::Node(ast.node(types.ternary, args)?))
        })
        .reducer("or_op", move |ast: &mut Ast, children| {
            let [lhs, rhs] = nodes(children)?;
            Ok(Value::Node(ast.node(types.or, vec![lhs.into(), rhs.into()])?))
        })
        .reducer("and_op", move |ast: &mut Ast, children| {
            let [lhs, rhs] = nodes(children)?;
            Ok(Value::Node(ast.node(types.and, vec![lhs.into(), rhs.into()])?))
        })
        .reducer("not_op", move |ast: &mut Ast, children| unary(ast, types, UnaryOp::Not, children))
        .reducer("neg", move |ast: &mut Ast, children| unary(ast, types, UnaryOp::Neg, children))
        .reducer("pos", move |ast: &mut Ast, children| unary(ast, types, UnaryOp::Pos, children))
        .reducer("invert", move |ast: &mut Ast, children| {
            unary(ast, types, UnaryOp::Invert, children)
        })
        .reducer("chain", move |ast: &mut Ast, children| chain(ast, types, children))
        .reducer("pow", move |ast: &mut Ast, children| {
            let [base, exp] = nodes(children)?;
            let args = vec![Scalar::symbol(BinaryOp::Pow.name()).into(), base.into(), exp.into()];
            Ok(Value::Node(ast.node(types.bin_op, args)?))
        })
        .reducer("call", move |ast: &mut Ast, children: Vec<Value>| {
            let mut children = children.into_iter();
            let func = children.next().unwrap_or_default().into_node()?;
            let args = present(children.collect())?;
            let id = ast.node(types.call, vec![func.into(), Arg::List(args)])?;
            Ok(Value::Node(id))
        })
        .reducer("getitem", move |ast: &mut Ast, children| {
            let [value, index] = nodes(children)?;
            Ok(Value::Node(ast.node(types.get_item, vec![value.into(), index.into()])?))
        })
        .reducer("getattr", move |ast: &mut Ast, children: Vec<Value>| {
            let mut children = children.into_iter();
            let value = children.next().unwrap_or_default().into_node()?;
            let attr = token_text(children.next().unwrap_or_default())?;
            let id = ast.node(types.get_attr, vec![value.into(), Scalar::Str(attr).into()])?;
            Ok(Value::Node(id))
        })
        .reducer("keyword", move |ast: &mut Ast, children: Vec<Value>| {
            let mut children = children.into_iter();
            let name = token_text(children.next().unwrap_or_default())?;
            let value = children.next().unwrap_or_default().into_node()?;
            let id = ast.node(types.keyword, vec![value.into(), Scalar::Symbol(name).into()])?;
            Ok(Value::Node(id))
        })
        // Atoms
        .reducer("name", move |ast: &mut Ast, children: Vec<Value>| {
            let name = token_text(children.into_iter().next().unwrap_or_default())?;
            Ok(Value::Node(ast.leaf(types.name, Scalar::Symbol(name))?))
        })
        .reducer("number", move |ast: &mut Ast, children: Vec<Value>| {
            let value = children.into_iter().next().unwrap_or_default().into_scalar()?;
            Ok(Value::Node(ast.leaf(types.atom, value)?))
        })
        .reducer("string", move |ast: &mut Ast, children: Vec<Value>| {
            let mut text = EcoString::new();
            for child in children {
                match child.into_scalar()? {
                    Scalar::Str(part) => text.push_str(&part),
                    other => return Err(ReduceError::message(format!("not a string: {other}"))),
                }
            }
            Ok(Value::Node(ast.leaf(types.atom, Scalar::Str(text))?))
        })
        .reducer("const_none", move |ast: &mut Ast, _| {
            Ok(Value::Node(ast.leaf(types.atom, Scalar::None)?))
        })
        .reducer("const_true", move |ast: &mut Ast, _| {
            Ok(Value::Node(ast.leaf(types.atom, true)?))
        })
        .reducer("const_false", move |ast: &mut Ast, _| {
            Ok(Value::Node(ast.leaf(types.atom, false)?))
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_escapes() {
        assert_eq!(unescape(r"'a\nb'"), Ok(Scalar::str("a\nb")));
        assert_eq!(unescape(r#""it's""#), Ok(Scalar::str("it's")));
        assert_eq!(unescape(r"'\'\\'"), Ok(Scalar::str("'\\")));
        assert_eq!(unescape(r"'\d'"), Ok(Scalar::str("\\d")));
    }

    #[test]
    fn grammar_compiles_for_both_start_rules() {
        let (_, types) = crate::nodes::registry().unwrap();
        let module = parser(types, MODULE).unwrap();
        let expr = parser(types, EXPRESSION).unwrap();
        assert_eq!(module.grammar_text(), expr.grammar_text());
        assert_eq!(module.options().lexer, LexerMode::Standard);
    }

    #[test]
    fn keywords_beat_names() {
        let (_, types) = crate::nodes::registry().unwrap();
        let parser = parser(types, MODULE).unwrap();
        let kinds: Vec<_> = parser
            .tokenize("if iffy: x //= 2.5e3")
            .unwrap()
            .iter()
            .map(|t| t.kind().to_string())
            .collect();
        assert_eq!(kinds, ["IF", "NAME", "COLON", "NAME", "AUG_OP", "FLOAT"]);
    }
}
