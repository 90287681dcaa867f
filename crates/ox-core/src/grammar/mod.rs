// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Grammar text and LALR(1) table construction.
//!
//! Grammar text is read into a [`GrammarDef`], normalized into a BNF
//! [`Grammar`] and compiled into a [`ParseTable`]. All three steps report
//! problems as [`GrammarError`].

mod definition;
mod error;
mod lalr;
mod normalize;
mod reader;

pub use definition::{
    Alternative, GrammarDef, IgnoreItem, Item, Pattern, Repeat, RuleDef, RuleModifiers,
    TerminalDef, escape_regex,
};
pub use error::GrammarError;
pub use lalr::{Action, ParseTable};
pub use normalize::{END, Grammar, NonTerminal, Production, START, Slot, Sym, TerminalInfo};
pub use reader::read_grammar;
