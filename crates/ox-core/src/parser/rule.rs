// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Declarative grammar rules.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use ecow::{EcoString, eco_format};

use super::{ParserBuildError, ReduceError, Value};
use crate::grammar::{read_grammar, RuleDef, RuleModifiers};

/// A reduction callback: receives the caller's context and the kept
/// children of a match, returns the value that replaces them.
pub type Reducer<C> = Arc<dyn Fn(&mut C, Vec<Value>) -> Result<Value, ReduceError> + Send + Sync>;

/// A nonterminal with its alternatives.
///
/// An alternative is written in grammar-text syntax and may pack several
/// expansions with `|`; they all share the alternative's reducer.
///
/// ```
/// use ox_core::parser::{Rule, Value};
///
/// let rule: Rule = Rule::new("pair")
///     .alt_with("NAME \"=\" NAME", |_, children| Ok(Value::List(children)))
///     .alt("NAME");
/// assert_eq!(rule.name(), "pair");
/// ```
pub struct Rule<C = ()> {
    name: EcoString,
    alternatives: Vec<RuleAlternative<C>>,
}

struct RuleAlternative<C> {
    pattern: String,
    alias: Option<EcoString>,
    reducer: Option<Reducer<C>>,
}

impl<C> Rule<C> {
    /// Starts a rule.
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            alternatives: Vec::new(),
        }
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &EcoString {
        &self.name
    }

    /// Adds an alternative without a reducer.
    #[must_use]
    pub fn alt(mut self, pattern: impl Into<String>) -> Self {
        self.alternatives.push(RuleAlternative {
            pattern: pattern.into(),
            alias: None,
            reducer: None,
        });
        self
    }

    /// Adds an alternative reduced by `f`, under a generated alias.
    #[must_use]
    pub fn alt_with<F>(mut self, pattern: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut C, Vec<Value>) -> Result<Value, ReduceError> + Send + Sync + 'static,
    {
        self.alternatives.push(RuleAlternative {
            pattern: pattern.into(),
            alias: None,
            reducer: Some(Arc::new(f)),
        });
        self
    }

    /// Adds an alternative reduced by `f`, under an alias based on `name`.
    #[must_use]
    pub fn alt_named<F>(
        mut self,
        name: impl Into<EcoString>,
        pattern: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn(&mut C, Vec<Value>) -> Result<Value, ReduceError> + Send + Sync + 'static,
    {
        self.alternatives.push(RuleAlternative {
            pattern: pattern.into(),
            alias: Some(name.into()),
            reducer: Some(Arc::new(f)),
        });
        self
    }

    /// Converts the rule to a grammar definition, registering each reducer
    /// under a unique alias.
    pub(super) fn compile(
        self,
        names: &mut UniqueNames,
        reducers: &mut Vec<(EcoString, Reducer<C>)>,
    ) -> Result<RuleDef, ParserBuildError> {
        let mut alternatives = Vec::new();
        for alt in self.alternatives {
            let text = format!("{}: {}", self.name, alt.pattern);
            let parsed = read_grammar(&text).map_err(|source| ParserBuildError::Alternative {
                rule: self.name.clone(),
                pattern: alt.pattern.clone(),
                source,
            })?;
            let Some(rule) = parsed.rules.into_iter().next() else {
                continue;
            };
            let alias = match alt.reducer {
                Some(reducer) => {
                    let base = alt.alias.unwrap_or_else(|| eco_format!("fn_{}", self.name));
                    let alias = names.fresh(&base);
                    reducers.push((alias.clone(), reducer));
                    Some(alias)
                }
                None => alt.alias,
            };
            for mut expansion in rule.alternatives {
                if alias.is_some() {
                    expansion.alias.clone_from(&alias);
                }
                alternatives.push(expansion);
            }
        }
        Ok(RuleDef {
            name: self.name,
            modifiers: RuleModifiers {
                inline_single: true,
                keep_all_tokens: false,
            },
            alternatives,
        })
    }
}

impl<C> fmt::Debug for Rule<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field(
                "alternatives",
                &self
                    .alternatives
                    .iter()
                    .map(|a| a.pattern.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Generates names not handed out before: `base`, `base_1`, `base_2`, ...
#[derive(Debug, Default)]
pub(super) struct UniqueNames {
    used: HashSet<EcoString>,
}

impl UniqueNames {
    pub(super) fn fresh(&mut self, base: &str) -> EcoString {
        let mut candidate = EcoString::from(base);
        let mut n = 0;
        while self.used.contains(&candidate) {
            n += 1;
            candidate = eco_format!("{base}_{n}");
        }
        self.used.insert(candidate.clone());
        candidate
    }
}
