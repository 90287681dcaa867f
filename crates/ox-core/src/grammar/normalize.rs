// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! EBNF to BNF normalization.
//!
//! Every alternative of every rule becomes one or more flat productions:
//! groups and optionals are expanded into variants, repetitions become
//! left-recursive helper rules, and inline patterns become anonymous
//! terminals. Each production remembers which of its symbols produce
//! children (`Slot::Take { keep: true }`) and where absent `[...]` items
//! leave a `None` placeholder.

use std::collections::HashMap;

use ecow::{EcoString, eco_format};

use super::definition::{Alternative, GrammarDef, IgnoreItem, Item, Pattern, Repeat};
use super::GrammarError;

/// Name of the end-of-input terminal (id 0).
pub const END: &str = "$END";

/// Name of the augmented start nonterminal (id 0).
pub const START: &str = "$start";

/// A grammar symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sym {
    /// Terminal id.
    Term(usize),
    /// Nonterminal id.
    NonTerm(usize),
}

/// How one position of a production maps to the children of its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Consumes the next right-hand-side symbol; `keep` says whether its
    /// value becomes a child.
    Take {
        /// The symbol's value is kept.
        keep: bool,
    },
    /// A `None` child for an absent `[...]` item.
    Placeholder,
}

/// A terminal of the normalized grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalInfo {
    /// Terminal name.
    pub name: EcoString,
    /// Patterns; empty for `$END` and `%declare`d terminals.
    pub patterns: Vec<Pattern>,
    /// Match priority.
    pub priority: i32,
    /// Referenced by a production or `%ignore`.
    pub used: bool,
    /// Matches are discarded by the lexer.
    pub ignored: bool,
}

/// A nonterminal of the normalized grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonTerminal {
    /// Rule name.
    pub name: EcoString,
    /// `?rule`: a single child replaces the rule's tree.
    pub inline_single: bool,
    /// `!rule` (or the global option): anonymous tokens are kept.
    pub keep_all: bool,
    /// `_rule`: children are spliced into the parent.
    pub splice: bool,
}

/// A BNF production.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    /// Nonterminal id of the left-hand side.
    pub lhs: usize,
    /// Right-hand side symbols.
    pub rhs: Vec<Sym>,
    /// Child mapping, one `Take` per `rhs` symbol plus placeholders.
    pub slots: Vec<Slot>,
    /// `-> alias` of the alternative this came from.
    pub alias: Option<EcoString>,
}

/// A grammar in BNF form, ready for table construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    /// Terminals; id 0 is `$END`.
    pub terminals: Vec<TerminalInfo>,
    /// Nonterminals; id 0 is `$start`.
    pub nonterminals: Vec<NonTerminal>,
    /// Productions; production 0 is `$start -> <start rule>`.
    pub productions: Vec<Production>,
    /// Nonterminal id of the start rule.
    pub start: usize,
}

impl Grammar {
    /// Normalizes a grammar definition.
    ///
    /// `start` selects the start rule (default: the first rule);
    /// `keep_all_tokens` behaves as if every rule were written `!rule`.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::NoRules`], [`GrammarError::UnknownStart`] or
    /// [`GrammarError::UndefinedSymbol`].
    pub fn from_definition(
        def: &GrammarDef,
        start: Option<&str>,
        keep_all_tokens: bool,
    ) -> Result<Self, GrammarError> {
        if def.rules.is_empty() {
            return Err(GrammarError::NoRules);
        }
        let mut n = Normalizer::new(def);
        let start_name = start.map_or_else(|| def.rules[0].name.clone(), EcoString::from);
        let start_id = n
            .rule_ids
            .get(&start_name)
            .copied()
            .ok_or(GrammarError::UnknownStart(start_name))?;
        n.productions.push(Production {
            lhs: 0,
            rhs: vec![Sym::NonTerm(start_id)],
            slots: vec![Slot::Take { keep: true }],
            alias: None,
        });

        for rule in &def.rules {
            let lhs = n.rule_ids[&rule.name];
            let keep_all = keep_all_tokens || rule.modifiers.keep_all_tokens;
            n.nonterminals[lhs].keep_all = keep_all;
            for alt in &rule.alternatives {
                n.add_alternative(lhs, &rule.name, alt, keep_all)?;
            }
        }

        for item in &def.ignore {
            let id = match item {
                IgnoreItem::Name(name) => n.terminal_ids.get(name).copied().ok_or_else(|| {
                    GrammarError::UndefinedSymbol {
                        rule: "%ignore".into(),
                        symbol: name.clone(),
                    }
                })?,
                IgnoreItem::Pattern(pattern) => {
                    let name = eco_format!("__IGNORE_{}", n.ignore_counter);
                    n.ignore_counter += 1;
                    n.push_terminal(name, vec![pattern.clone()], 0)
                }
            };
            n.terminals[id].ignored = true;
            n.terminals[id].used = true;
        }

        tracing::debug!(
            terminals = n.terminals.len(),
            nonterminals = n.nonterminals.len(),
            productions = n.productions.len(),
            "normalized grammar"
        );
        Ok(Self {
            terminals: n.terminals,
            nonterminals: n.nonterminals,
            productions: n.productions,
            start: start_id,
        })
    }

    /// Looks up a terminal id by name.
    #[must_use]
    pub fn terminal_id(&self, name: &str) -> Option<usize> {
        self.terminals.iter().position(|t| t.name == name)
    }

    /// Looks up a nonterminal id by name.
    #[must_use]
    pub fn nonterminal_id(&self, name: &str) -> Option<usize> {
        self.nonterminals.iter().position(|t| t.name == name)
    }

    /// Returns the name of a symbol.
    #[must_use]
    pub fn symbol_name(&self, sym: Sym) -> &EcoString {
        match sym {
            Sym::Term(id) => &self.terminals[id].name,
            Sym::NonTerm(id) => &self.nonterminals[id].name,
        }
    }

    /// Renders a production as `rule: SYM sym`.
    #[must_use]
    pub fn describe(&self, production: usize) -> String {
        let p = &self.productions[production];
        let mut out = format!("{}:", self.nonterminals[p.lhs].name);
        for sym in &p.rhs {
            out.push(' ');
            out.push_str(self.symbol_name(*sym));
        }
        out
    }
}

type Variant = Vec<Elem>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Elem {
    Sym(Sym, bool),
    Placeholder,
}

struct Normalizer<'a> {
    def: &'a GrammarDef,
    terminals: Vec<TerminalInfo>,
    terminal_ids: HashMap<EcoString, usize>,
    anonymous: HashMap<Pattern, usize>,
    nonterminals: Vec<NonTerminal>,
    rule_ids: HashMap<EcoString, usize>,
    productions: Vec<Production>,
    anon_counter: usize,
    ignore_counter: usize,
    helper_counter: usize,
}

impl<'a> Normalizer<'a> {
    fn new(def: &'a GrammarDef) -> Self {
        let mut n = Self {
            def,
            terminals: Vec::new(),
            terminal_ids: HashMap::new(),
            anonymous: HashMap::new(),
            nonterminals: Vec::new(),
            rule_ids: HashMap::new(),
            productions: Vec::new(),
            anon_counter: 0,
            ignore_counter: 0,
            helper_counter: 0,
        };
        n.push_terminal(END.into(), Vec::new(), 0);
        for t in &def.terminals {
            n.push_terminal(t.name.clone(), t.patterns.clone(), t.priority);
        }
        for name in &def.declared {
            if !n.terminal_ids.contains_key(name) {
                n.push_terminal(name.clone(), Vec::new(), 0);
            }
        }
        n.push_nonterminal(START.into());
        for rule in &def.rules {
            let id = n.push_nonterminal(rule.name.clone());
            n.nonterminals[id].inline_single = rule.modifiers.inline_single;
        }
        n
    }

    fn push_terminal(&mut self, name: EcoString, patterns: Vec<Pattern>, priority: i32) -> usize {
        let id = self.terminals.len();
        self.terminal_ids.insert(name.clone(), id);
        self.terminals.push(TerminalInfo {
            name,
            patterns,
            priority,
            used: false,
            ignored: false,
        });
        id
    }

    fn push_nonterminal(&mut self, name: EcoString) -> usize {
        let id = self.nonterminals.len();
        self.rule_ids.insert(name.clone(), id);
        self.nonterminals.push(NonTerminal {
            splice: name.starts_with('_'),
            name,
            inline_single: false,
            keep_all: false,
        });
        id
    }

    fn add_alternative(
        &mut self,
        lhs: usize,
        rule: &EcoString,
        alt: &Alternative,
        keep_all: bool,
    ) -> Result<(), GrammarError> {
        for variant in self.expand_sequence(rule, &alt.items, keep_all)? {
            self.add_production(lhs, variant, alt.alias.clone());
        }
        Ok(())
    }

    fn add_production(&mut self, lhs: usize, variant: Variant, alias: Option<EcoString>) {
        let mut rhs = Vec::new();
        let mut slots = Vec::with_capacity(variant.len());
        for elem in variant {
            match elem {
                Elem::Sym(sym, keep) => {
                    if let Sym::Term(id) = sym {
                        self.terminals[id].used = true;
                    }
                    rhs.push(sym);
                    slots.push(Slot::Take { keep });
                }
                Elem::Placeholder => slots.push(Slot::Placeholder),
            }
        }
        let production = Production {
            lhs,
            rhs,
            slots,
            alias,
        };
        if !self.productions.contains(&production) {
            self.productions.push(production);
        }
    }

    fn expand_sequence(
        &mut self,
        rule: &EcoString,
        items: &[Item],
        keep_all: bool,
    ) -> Result<Vec<Variant>, GrammarError> {
        let mut variants: Vec<Variant> = vec![Vec::new()];
        for item in items {
            let options = self.expand_item(rule, item, keep_all)?;
            let mut next = Vec::with_capacity(variants.len() * options.len());
            for prefix in &variants {
                for option in &options {
                    let mut v = prefix.clone();
                    v.extend_from_slice(option);
                    next.push(v);
                }
            }
            variants = next;
        }
        Ok(variants)
    }

    fn expand_alternatives(
        &mut self,
        rule: &EcoString,
        alts: &[Alternative],
        keep_all: bool,
    ) -> Result<Vec<Variant>, GrammarError> {
        let mut out = Vec::new();
        for alt in alts {
            out.extend(self.expand_sequence(rule, &alt.items, keep_all)?);
        }
        Ok(out)
    }

    fn expand_item(
        &mut self,
        rule: &EcoString,
        item: &Item,
        keep_all: bool,
    ) -> Result<Vec<Variant>, GrammarError> {
        match item {
            Item::Name(name) => {
                if let Some(&id) = self.rule_ids.get(name) {
                    return Ok(vec![vec![Elem::Sym(Sym::NonTerm(id), true)]]);
                }
                if let Some(&id) = self.terminal_ids.get(name) {
                    let keep = keep_all || !name.starts_with('_');
                    return Ok(vec![vec![Elem::Sym(Sym::Term(id), keep)]]);
                }
                Err(GrammarError::UndefinedSymbol {
                    rule: rule.clone(),
                    symbol: name.clone(),
                })
            }
            Item::Pattern(pattern) => {
                let id = self.anonymous_terminal(pattern);
                let keep = keep_all || !pattern.is_literal();
                Ok(vec![vec![Elem::Sym(Sym::Term(id), keep)]])
            }
            Item::Group(alts) => self.expand_alternatives(rule, alts, keep_all),
            Item::Maybe(alts) => {
                let mut variants = self.expand_alternatives(rule, alts, keep_all)?;
                let simple = matches!(alts.as_slice(), [alt] if alt
                    .items
                    .iter()
                    .all(|i| matches!(i, Item::Name(_) | Item::Pattern(_))));
                let absent = if simple && variants.len() == 1 {
                    variants[0]
                        .iter()
                        .filter(|e| matches!(e, Elem::Sym(_, true)))
                        .map(|_| Elem::Placeholder)
                        .collect()
                } else {
                    Vec::new()
                };
                variants.push(absent);
                Ok(variants)
            }
            Item::Repeat(inner, Repeat::Optional) => {
                let mut variants = self.expand_item(rule, inner, keep_all)?;
                variants.push(Vec::new());
                Ok(variants)
            }
            Item::Repeat(inner, repeat) => {
                let helper = self.repetition_helper(rule, inner, keep_all)?;
                let mut variants = vec![vec![Elem::Sym(Sym::NonTerm(helper), true)]];
                if *repeat == Repeat::ZeroOrMore {
                    variants.push(Vec::new());
                }
                Ok(variants)
            }
        }
    }

    /// Creates `H: x | H x` for `x+`; `H` is spliced into its parent.
    fn repetition_helper(
        &mut self,
        rule: &EcoString,
        inner: &Item,
        keep_all: bool,
    ) -> Result<usize, GrammarError> {
        let name = eco_format!("__{}_plus_{}", rule.trim_start_matches('_'), self.helper_counter);
        self.helper_counter += 1;
        let helper = self.push_nonterminal(name);
        self.nonterminals[helper].keep_all = keep_all;
        for variant in self.expand_item(rule, inner, keep_all)? {
            let mut recursive = vec![Elem::Sym(Sym::NonTerm(helper), true)];
            recursive.extend_from_slice(&variant);
            self.add_production(helper, variant, None);
            self.add_production(helper, recursive, None);
        }
        Ok(helper)
    }

    fn anonymous_terminal(&mut self, pattern: &Pattern) -> usize {
        if let Some(&id) = self.anonymous.get(pattern) {
            return id;
        }
        let declared = self
            .def
            .terminals
            .iter()
            .find(|t| t.patterns.len() == 1 && &t.patterns[0] == pattern)
            .map(|t| self.terminal_ids[&t.name]);
        let id = match declared {
            Some(id) => id,
            None => {
                let name = self.anonymous_name(pattern);
                self.push_terminal(name, vec![pattern.clone()], 0)
            }
        };
        self.anonymous.insert(pattern.clone(), id);
        id
    }

    fn anonymous_name(&mut self, pattern: &Pattern) -> EcoString {
        if let Pattern::Literal { text, .. } = pattern {
            let is_word = text.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            let candidate = if is_word {
                Some(EcoString::from(text.to_ascii_uppercase()))
            } else {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => punctuation_name(c).map(EcoString::from),
                    _ => None,
                }
            };
            if let Some(name) = candidate.filter(|n| !self.terminal_ids.contains_key(n)) {
                return name;
            }
        }
        let name = eco_format!("__ANON_{}", self.anon_counter);
        self.anon_counter += 1;
        name
    }
}

fn punctuation_name(c: char) -> Option<&'static str> {
    Some(match c {
        '+' => "PLUS",
        '-' => "MINUS",
        '*' => "STAR",
        '/' => "SLASH",
        '(' => "LPAR",
        ')' => "RPAR",
        '=' => "EQUAL",
        '[' => "LSQB",
        ']' => "RSQB",
        '{' => "LBRACE",
        '}' => "RBRACE",
        ',' => "COMMA",
        '.' => "DOT",
        ':' => "COLON",
        ';' => "SEMICOLON",
        '^' => "CIRCUMFLEX",
        '%' => "PERCENT",
        '&' => "AMPERSAND",
        '|' => "VBAR",
        '<' => "LESSTHAN",
        '>' => "MORETHAN",
        '~' => "TILDE",
        '@' => "AT",
        '!' => "BANG",
        '?' => "QMARK",
        '#' => "HASH",
        '$' => "DOLLAR",
        '\\' => "BACKSLASH",
        '_' => "UNDERSCORE",
        '\'' => "QUOTE",
        '"' => "DBLQUOTE",
        '`' => "BACKQUOTE",
        _ => return None,
    })
}
