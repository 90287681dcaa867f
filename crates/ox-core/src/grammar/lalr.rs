// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! LALR(1) parse table construction.
//!
//! States are the LR(0) item-set automaton; lookaheads are computed by
//! spontaneous generation and propagation over kernel items (Aho, Lam,
//! Sethi & Ullman, 4.7.5), using a dummy terminal one past the last real
//! terminal id as the propagation marker.
//!
//! Shift/reduce conflicts are resolved in favour of the shift, which gives
//! the usual "dangling else" behaviour. Reduce/reduce conflicts are errors.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::normalize::{Grammar, Sym};
use super::GrammarError;

/// `(production, dot position)`.
type Item = (usize, usize);

/// A parse action for a state and lookahead terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Push the token and go to the state.
    Shift(usize),
    /// Reduce by the production.
    Reduce(usize),
    /// Input is complete.
    Accept,
}

/// LALR(1) action and goto tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTable {
    /// Per state: terminal id to action.
    pub actions: Vec<BTreeMap<usize, Action>>,
    /// Per state: nonterminal id to successor state.
    pub gotos: Vec<BTreeMap<usize, usize>>,
}

impl ParseTable {
    /// Builds the tables for a normalized grammar.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::ReduceReduce`] when two productions are
    /// reducible on the same lookahead in the same state.
    pub fn build(grammar: &Grammar) -> Result<Self, GrammarError> {
        Builder::new(grammar).build()
    }

    /// Returns the number of states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if the table has no states.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the action for `terminal` in `state`.
    #[must_use]
    pub fn action(&self, state: usize, terminal: usize) -> Option<Action> {
        self.actions[state].get(&terminal).copied()
    }

    /// Returns the state to go to after reducing to `nonterminal`.
    #[must_use]
    pub fn goto(&self, state: usize, nonterminal: usize) -> Option<usize> {
        self.gotos[state].get(&nonterminal).copied()
    }

    /// Returns the terminals with an action in `state`.
    pub fn expected(&self, state: usize) -> impl Iterator<Item = usize> + '_ {
        self.actions[state].keys().copied()
    }
}

struct Builder<'g> {
    grammar: &'g Grammar,
    by_lhs: Vec<Vec<usize>>,
    nullable: Vec<bool>,
    first: Vec<BTreeSet<usize>>,
    marker: usize,
}

impl<'g> Builder<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        let mut by_lhs = vec![Vec::new(); grammar.nonterminals.len()];
        for (id, p) in grammar.productions.iter().enumerate() {
            by_lhs[p.lhs].push(id);
        }
        let mut builder = Self {
            grammar,
            by_lhs,
            nullable: vec![false; grammar.nonterminals.len()],
            first: vec![BTreeSet::new(); grammar.nonterminals.len()],
            marker: grammar.terminals.len(),
        };
        builder.compute_first();
        builder
    }

    fn compute_first(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for p in &self.grammar.productions {
                let mut all_nullable = true;
                for sym in &p.rhs {
                    match *sym {
                        Sym::Term(t) => {
                            changed |= self.first[p.lhs].insert(t);
                            all_nullable = false;
                        }
                        Sym::NonTerm(n) => {
                            let firsts: Vec<usize> = self.first[n].iter().copied().collect();
                            for t in firsts {
                                changed |= self.first[p.lhs].insert(t);
                            }
                            all_nullable = self.nullable[n];
                        }
                    }
                    if !all_nullable {
                        break;
                    }
                }
                if all_nullable && !self.nullable[p.lhs] {
                    self.nullable[p.lhs] = true;
                    changed = true;
                }
            }
        }
    }

    /// FIRST of `seq` followed by `lookahead`.
    fn first_of(&self, seq: &[Sym], lookahead: usize) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        for sym in seq {
            match *sym {
                Sym::Term(t) => {
                    out.insert(t);
                    return out;
                }
                Sym::NonTerm(n) => {
                    out.extend(self.first[n].iter().copied());
                    if !self.nullable[n] {
                        return out;
                    }
                }
            }
        }
        out.insert(lookahead);
        out
    }

    fn next_symbol(&self, (prod, dot): Item) -> Option<Sym> {
        self.grammar.productions[prod].rhs.get(dot).copied()
    }

    fn closure0(&self, kernel: &[Item]) -> BTreeSet<Item> {
        let mut items: BTreeSet<Item> = kernel.iter().copied().collect();
        let mut work: Vec<Item> = kernel.to_vec();
        while let Some(item) = work.pop() {
            if let Some(Sym::NonTerm(n)) = self.next_symbol(item) {
                for &p in &self.by_lhs[n] {
                    if items.insert((p, 0)) {
                        work.push((p, 0));
                    }
                }
            }
        }
        items
    }

    fn closure1(&self, seed: impl IntoIterator<Item = (Item, usize)>) -> BTreeSet<(Item, usize)> {
        let mut items = BTreeSet::new();
        let mut work = Vec::new();
        for entry in seed {
            if items.insert(entry) {
                work.push(entry);
            }
        }
        while let Some(((prod, dot), la)) = work.pop() {
            let rhs = &self.grammar.productions[prod].rhs;
            let Some(Sym::NonTerm(n)) = rhs.get(dot).copied() else {
                continue;
            };
            for b in self.first_of(&rhs[dot + 1..], la) {
                for &p in &self.by_lhs[n] {
                    let entry = ((p, 0), b);
                    if items.insert(entry) {
                        work.push(entry);
                    }
                }
            }
        }
        items
    }

    fn build(&self) -> Result<ParseTable, GrammarError> {
        let (kernels, transitions) = self.lr0_automaton();
        let lookaheads = self.lookaheads(&kernels, &transitions);

        let mut actions = vec![BTreeMap::new(); kernels.len()];
        let mut gotos = vec![BTreeMap::new(); kernels.len()];
        for (state, edges) in transitions.iter().enumerate() {
            for (&sym, &target) in edges {
                match sym {
                    Sym::Term(t) => {
                        actions[state].insert(t, Action::Shift(target));
                    }
                    Sym::NonTerm(n) => {
                        gotos[state].insert(n, target);
                    }
                }
            }
        }

        for (state, kernel) in kernels.iter().enumerate() {
            let seed = kernel.iter().flat_map(|item| {
                lookaheads[state][item].iter().map(move |&la| (*item, la))
            });
            for ((prod, dot), la) in self.closure1(seed) {
                if dot < self.grammar.productions[prod].rhs.len() {
                    continue;
                }
                let action = if prod == 0 {
                    Action::Accept
                } else {
                    Action::Reduce(prod)
                };
                self.add_reduction(&mut actions[state], state, la, action)?;
            }
        }

        tracing::debug!(states = kernels.len(), "built LALR(1) table");
        Ok(ParseTable { actions, gotos })
    }

    fn add_reduction(
        &self,
        row: &mut BTreeMap<usize, Action>,
        state: usize,
        terminal: usize,
        action: Action,
    ) -> Result<(), GrammarError> {
        match row.get(&terminal).copied() {
            None => {
                row.insert(terminal, action);
                Ok(())
            }
            Some(existing) if existing == action => Ok(()),
            Some(Action::Shift(_)) => {
                tracing::debug!(
                    state,
                    terminal = %self.grammar.terminals[terminal].name,
                    "shift/reduce conflict resolved as shift"
                );
                Ok(())
            }
            Some(existing) => {
                let production = |a: Action| match a {
                    Action::Reduce(p) => p,
                    Action::Accept | Action::Shift(_) => 0,
                };
                let (a, b) = (production(existing), production(action));
                Err(GrammarError::ReduceReduce {
                    terminal: self.grammar.terminals[terminal].name.clone(),
                    first: self.grammar.describe(a.min(b)),
                    second: self.grammar.describe(a.max(b)),
                })
            }
        }
    }

    /// Builds the LR(0) automaton: kernel item sets and their transitions.
    fn lr0_automaton(&self) -> (Vec<Vec<Item>>, Vec<BTreeMap<Sym, usize>>) {
        let mut kernels: Vec<Vec<Item>> = vec![vec![(0, 0)]];
        let mut ids: HashMap<Vec<Item>, usize> = HashMap::new();
        ids.insert(kernels[0].clone(), 0);
        let mut transitions: Vec<BTreeMap<Sym, usize>> = Vec::new();

        let mut state = 0;
        while state < kernels.len() {
            let mut successors: BTreeMap<Sym, BTreeSet<Item>> = BTreeMap::new();
            for item in self.closure0(&kernels[state]) {
                if let Some(sym) = self.next_symbol(item) {
                    successors
                        .entry(sym)
                        .or_default()
                        .insert((item.0, item.1 + 1));
                }
            }
            let mut edges = BTreeMap::new();
            for (sym, kernel) in successors {
                let kernel: Vec<Item> = kernel.into_iter().collect();
                let target = match ids.get(&kernel) {
                    Some(&id) => id,
                    None => {
                        let id = kernels.len();
                        ids.insert(kernel.clone(), id);
                        kernels.push(kernel);
                        id
                    }
                };
                edges.insert(sym, target);
            }
            transitions.push(edges);
            state += 1;
        }
        (kernels, transitions)
    }

    /// Computes the LALR(1) lookahead set of every kernel item.
    fn lookaheads(
        &self,
        kernels: &[Vec<Item>],
        transitions: &[BTreeMap<Sym, usize>],
    ) -> Vec<HashMap<Item, BTreeSet<usize>>> {
        let mut la: Vec<HashMap<Item, BTreeSet<usize>>> = kernels
            .iter()
            .map(|k| k.iter().map(|&item| (item, BTreeSet::new())).collect())
            .collect();
        let mut propagate: Vec<((usize, Item), (usize, Item))> = Vec::new();

        for (state, kernel) in kernels.iter().enumerate() {
            for &item in kernel {
                for ((prod, dot), b) in self.closure1([(item, self.marker)]) {
                    let Some(sym) = self.next_symbol((prod, dot)) else {
                        continue;
                    };
                    let target = transitions[state][&sym];
                    let advanced = (prod, dot + 1);
                    if b == self.marker {
                        propagate.push(((state, item), (target, advanced)));
                    } else if let Some(set) = la[target].get_mut(&advanced) {
                        set.insert(b);
                    }
                }
            }
        }

        if let Some(set) = la[0].get_mut(&(0, 0)) {
            set.insert(0);
        }
        let mut changed = true;
        while changed {
            changed = false;
            for &((from_state, from_item), (to_state, to_item)) in &propagate {
                let incoming: Vec<usize> = la[from_state][&from_item].iter().copied().collect();
                if let Some(set) = la[to_state].get_mut(&to_item) {
                    for t in incoming {
                        changed |= set.insert(t);
                    }
                }
            }
        }
        la
    }
}
