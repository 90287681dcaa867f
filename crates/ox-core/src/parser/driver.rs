// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The table-driven LR loop.
//!
//! The driver is iterative: the state and value stacks live on the heap,
//! so deeply nested input cannot overflow the call stack.

use std::collections::HashMap;

use ecow::EcoString;

use super::{Compiled, ParseError, Tree, Value};
use crate::grammar::{Action, ParseTable, Slot};
use crate::source_analysis::{Cursor, LexErrorKind, Scanner, Span, Token};

/// Where the driver's tokens come from.
pub(super) trait TokenSource {
    /// Returns the next token as `(terminal id, token)`, lexing for `state`
    /// when the source is contextual. `Ok(None)` is end of input.
    fn next_token(&mut self, state: usize) -> Result<Option<(usize, Token)>, ParseError>;

    /// Empty span at the end of the input.
    fn end_span(&self) -> Span;
}

/// Lexes source text on demand.
pub(super) struct ScanSource<'a> {
    pub(super) scanner: &'a Scanner,
    pub(super) table: &'a ParseTable,
    pub(super) used: &'a [bool],
    pub(super) source: &'a str,
    pub(super) cursor: Cursor,
    pub(super) contextual: bool,
}

impl TokenSource for ScanSource<'_> {
    fn next_token(&mut self, state: usize) -> Result<Option<(usize, Token)>, ParseError> {
        let used = self.used;
        if !self.contextual {
            return Ok(self
                .scanner
                .next_token(self.source, &mut self.cursor, &|t| used[t])?);
        }
        let row = &self.table.actions[state];
        let mut probe = self.cursor;
        match self
            .scanner
            .next_token(self.source, &mut probe, &|t| row.contains_key(&t))
        {
            Ok(found) => {
                self.cursor = probe;
                Ok(found)
            }
            Err(err) if matches!(err.kind, LexErrorKind::UnexpectedCharacter(_)) => {
                // Something unacceptable here may still be a valid token;
                // report it as such rather than as a bad character.
                let mut retry = self.cursor;
                match self.scanner.next_token(self.source, &mut retry, &|t| used[t]) {
                    Ok(Some(found)) => {
                        self.cursor = retry;
                        Ok(Some(found))
                    }
                    _ => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn end_span(&self) -> Span {
        Span::from(self.source.len()..self.source.len())
    }
}

/// Feeds an already-lexed token stream.
pub(super) struct TokenStream<'a, I> {
    pub(super) tokens: I,
    pub(super) ids: &'a HashMap<EcoString, usize>,
    pub(super) ignored: &'a [bool],
    /// Id used for kinds the grammar does not know; it has no actions.
    pub(super) unknown: usize,
    pub(super) end: Span,
}

impl<I: Iterator<Item = Token>> TokenSource for TokenStream<'_, I> {
    fn next_token(&mut self, _state: usize) -> Result<Option<(usize, Token)>, ParseError> {
        for token in self.tokens.by_ref() {
            self.end = Span::new(token.span().end(), token.span().end());
            let id = self.ids.get(token.kind()).copied().unwrap_or(self.unknown);
            if id != self.unknown && self.ignored[id] {
                continue;
            }
            return Ok(Some((id, token)));
        }
        Ok(None)
    }

    fn end_span(&self) -> Span {
        self.end
    }
}

enum StackValue {
    Value(Value),
    /// Children of a `_rule`, to be spliced into the parent.
    Splice(Vec<Value>),
}

/// Runs the LR automaton over `tokens`.
pub(super) fn run<C>(
    compiled: &Compiled<C>,
    ctx: &mut C,
    tokens: &mut dyn TokenSource,
) -> Result<Value, ParseError> {
    let table = &compiled.table;
    let grammar = &compiled.grammar;
    let mut states: Vec<usize> = vec![0];
    let mut values: Vec<StackValue> = Vec::new();
    let mut spans: Vec<Option<Span>> = Vec::new();
    let mut lookahead = tokens.next_token(0)?;

    loop {
        let state = states[states.len() - 1];
        let terminal = lookahead.as_ref().map_or(0, |(id, _)| *id);
        match table.action(state, terminal) {
            Some(Action::Shift(next)) => {
                let Some((_, token)) = lookahead.take() else {
                    unreachable!("end of input is never shifted")
                };
                tracing::trace!(%token, state = next, "shift");
                spans.push(Some(token.span()));
                values.push(StackValue::Value(Value::Token(token)));
                states.push(next);
                lookahead = tokens.next_token(next)?;
            }
            Some(Action::Reduce(p)) => {
                let production = &grammar.productions[p];
                let n = production.rhs.len();
                states.truncate(states.len() - n);
                let popped = values.split_off(values.len() - n);
                let span = spans
                    .split_off(spans.len() - n)
                    .into_iter()
                    .flatten()
                    .reduce(Span::merge);
                let children = collect_children(&production.slots, popped);
                let value = reduce(compiled, ctx, p, children, span)?;
                let top = states[states.len() - 1];
                let Some(next) = table.goto(top, production.lhs) else {
                    unreachable!("every reduction has a goto")
                };
                states.push(next);
                values.push(value);
                spans.push(span);
            }
            Some(Action::Accept) => {
                return Ok(match values.pop() {
                    Some(StackValue::Value(value)) => value,
                    Some(StackValue::Splice(items)) => Value::List(items),
                    None => Value::None,
                });
            }
            None => {
                let expected = table
                    .expected(state)
                    .map(|t| grammar.terminals[t].name.clone())
                    .collect();
                return Err(match lookahead {
                    Some((_, token)) => ParseError::UnexpectedToken {
                        found: token.to_string(),
                        expected,
                        span: token.span(),
                        position: token.start(),
                    },
                    None => ParseError::UnexpectedEof {
                        expected,
                        span: tokens.end_span(),
                    },
                });
            }
        }
    }
}

fn collect_children(slots: &[Slot], popped: Vec<StackValue>) -> Vec<Value> {
    let mut popped = popped.into_iter();
    let mut children = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Placeholder => children.push(Value::None),
            Slot::Take { keep } => {
                let Some(value) = popped.next() else { break };
                if !keep {
                    continue;
                }
                match value {
                    StackValue::Value(value) => children.push(value),
                    StackValue::Splice(items) => children.extend(items),
                }
            }
        }
    }
    children
}

fn reduce<C>(
    compiled: &Compiled<C>,
    ctx: &mut C,
    production: usize,
    mut children: Vec<Value>,
    span: Option<Span>,
) -> Result<StackValue, ParseError> {
    let p = &compiled.grammar.productions[production];
    let rule = &compiled.grammar.nonterminals[p.lhs];
    tracing::trace!(rule = %rule.name, children = children.len(), "reduce");

    if let Some(alias) = &p.alias {
        return match &compiled.reducers[production] {
            Some(reducer) => reducer(ctx, children)
                .map(StackValue::Value)
                .map_err(|source| ParseError::Reduce {
                    rule: alias.clone(),
                    source,
                    span: span.unwrap_or_default(),
                }),
            None => Ok(StackValue::Value(Value::Tree(Tree::new(
                alias.clone(),
                children,
            )))),
        };
    }
    if rule.splice {
        return Ok(StackValue::Splice(children));
    }
    if rule.inline_single && children.len() == 1 {
        return Ok(StackValue::Value(children.remove(0)));
    }
    Ok(StackValue::Value(Value::Tree(Tree::new(
        rule.name.clone(),
        children,
    ))))
}
