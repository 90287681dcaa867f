// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Parser compiler and runtime.
//!
//! A [`Parser`] is built either from a [`Lexer`] plus declarative [`Rule`]s,
//! or from hand-written grammar text. Both paths go through the same
//! grammar text: declarative rules are rendered to text, appended to the
//! lexer's terminal definitions and read back, so [`Parser::grammar_text`]
//! always shows exactly what was compiled.
//!
//! # Reduction
//!
//! Each production reduces its kept children to a [`Value`]:
//!
//! 1. an alternative with a reducer calls it;
//! 2. an aliased alternative without one yields `Tree(alias, children)`;
//! 3. a `_rule` splices its children into the parent;
//! 4. a `?rule` with exactly one child yields that child;
//! 5. anything else yields `Tree(rule, children)`.
//!
//! Every declarative rule is emitted as a `?rule`, so an alternative without
//! a reducer passes a single child through unchanged.
//!
//! # Example
//!
//! ```
//! use ox_core::parser::{ParserBuilder, Rule, Value};
//! use ox_core::source_analysis::{LexerBuilder, Scalar, Transform};
//!
//! let lexer = LexerBuilder::new()
//!     .token("INT", (r"\d+", Transform::int()))
//!     .token("_WS", r"\s+")
//!     .build()
//!     .unwrap();
//! let parser = ParserBuilder::new(&lexer)
//!     .rule(Rule::new("sum").alt_with("sum \"+\" INT | INT", |_, children| {
//!         let mut total = 0;
//!         for child in children {
//!             total += child.into_scalar()?.as_int().unwrap_or(0);
//!         }
//!         Ok(Value::Scalar(Scalar::Int(total)))
//!     }))
//!     .build()
//!     .unwrap();
//! assert_eq!(parser.parse("1 + 2 + 3").unwrap(), Value::Scalar(Scalar::Int(6)));
//! ```

mod driver;
mod error;
mod rule;
mod value;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ecow::EcoString;
use serde::{Deserialize, Serialize};

pub use error::{ParseError, ParserBuildError, ReduceError};
pub use rule::{Reducer, Rule};
pub use value::{Tree, Value};

use crate::grammar::{read_grammar, Grammar, GrammarError, ParseTable};
use crate::source_analysis::{
    Cursor, Lexer, LexerBuildError, Scanner, Span, TerminalSpec, Token, Transform,
};
use driver::{ScanSource, TokenSource, TokenStream};
use rule::UniqueNames;

/// How input text is split into tokens while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexerMode {
    /// Only terminals the current parser state can accept are tried.
    #[default]
    Contextual,
    /// Every terminal is tried at every position.
    Standard,
}

/// Parser compilation options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Start rule; defaults to the first rule.
    pub start: Option<EcoString>,
    /// Lexing mode.
    pub lexer: LexerMode,
    /// Keep anonymous tokens in every rule, as if each were `!rule`.
    pub keep_all_tokens: bool,
    /// Reject inputs longer than this many bytes.
    pub max_input_len: Option<usize>,
}

impl ParserOptions {
    /// Sets the start rule.
    #[must_use]
    pub fn with_start(mut self, start: impl Into<EcoString>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Sets the lexing mode.
    #[must_use]
    pub fn with_lexer(mut self, mode: LexerMode) -> Self {
        self.lexer = mode;
        self
    }

    /// Keeps anonymous tokens.
    #[must_use]
    pub fn with_keep_all_tokens(mut self, keep: bool) -> Self {
        self.keep_all_tokens = keep;
        self
    }

    /// Bounds the input size.
    #[must_use]
    pub fn with_max_input_len(mut self, max: usize) -> Self {
        self.max_input_len = Some(max);
        self
    }
}

/// Collects rules (or grammar text) and compiles a [`Parser`].
pub struct ParserBuilder<C = ()> {
    lexer: Option<Lexer>,
    grammar: Option<String>,
    rules: Vec<Rule<C>>,
    reducers: Vec<(EcoString, Reducer<C>)>,
    transforms: Vec<(EcoString, Transform)>,
    options: ParserOptions,
}

impl<C> ParserBuilder<C> {
    /// Starts a parser over `lexer`'s tokens.
    #[must_use]
    pub fn new(lexer: &Lexer) -> Self {
        Self {
            lexer: Some(lexer.clone()),
            grammar: None,
            rules: Vec::new(),
            reducers: Vec::new(),
            transforms: Vec::new(),
            options: ParserOptions::default(),
        }
    }

    /// Starts a parser from hand-written grammar text, terminals included.
    #[must_use]
    pub fn from_grammar(text: impl Into<String>) -> Self {
        Self {
            lexer: None,
            grammar: Some(text.into()),
            rules: Vec::new(),
            reducers: Vec::new(),
            transforms: Vec::new(),
            options: ParserOptions::default(),
        }
    }

    /// Adds a rule. The first rule added is the default start rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule<C>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Registers a reducer for productions aliased `-> alias` in grammar
    /// text.
    #[must_use]
    pub fn reducer<F>(mut self, alias: impl Into<EcoString>, f: F) -> Self
    where
        F: Fn(&mut C, Vec<Value>) -> Result<Value, ReduceError> + Send + Sync + 'static,
    {
        self.reducers.push((alias.into(), Arc::new(f)));
        self
    }

    /// Attaches a value transform to a terminal of the grammar text.
    #[must_use]
    pub fn transform(mut self, terminal: impl Into<EcoString>, transform: Transform) -> Self {
        self.transforms.push((terminal.into(), transform));
        self
    }

    /// Replaces the options.
    #[must_use]
    pub fn options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the start rule.
    #[must_use]
    pub fn start(mut self, start: impl Into<EcoString>) -> Self {
        self.options.start = Some(start.into());
        self
    }

    /// Compiles the parser.
    ///
    /// # Errors
    ///
    /// Returns [`ParserBuildError`] for malformed rules or grammar text,
    /// undefined symbols, reduce/reduce conflicts, invalid terminal
    /// patterns, and reducers or transforms naming unknown aliases or
    /// terminals.
    #[tracing::instrument(skip_all, fields(rules = self.rules.len()))]
    pub fn build(self) -> Result<Parser<C>, ParserBuildError> {
        let mut reducers = self.reducers;
        let mut transforms: HashMap<EcoString, Transform> = self.transforms.into_iter().collect();

        let text = match (self.lexer, self.grammar) {
            (Some(lexer), None) => {
                let mut names = UniqueNames::default();
                let mut text = String::new();
                for rule in self.rules {
                    let def = rule.compile(&mut names, &mut reducers)?;
                    text.push_str(&format!("{def}\n"));
                }
                text.push_str(lexer.grammar());
                for (name, transform) in lexer.transforms() {
                    transforms
                        .entry(name.clone())
                        .or_insert_with(|| transform.clone());
                }
                text
            }
            (None, Some(text)) if self.rules.is_empty() => text,
            _ => return Err(ParserBuildError::RulesAndGrammar),
        };

        let def = read_grammar(&text)?;
        let grammar = Grammar::from_definition(
            &def,
            self.options.start.as_deref(),
            self.options.keep_all_tokens,
        )?;
        let table = ParseTable::build(&grammar)?;

        for name in transforms.keys() {
            if grammar.terminal_id(name).is_none() {
                return Err(LexerBuildError::UnknownTransform(name.clone()).into());
            }
        }
        let specs = grammar
            .terminals
            .iter()
            .map(|t| TerminalSpec {
                name: t.name.clone(),
                patterns: t.patterns.clone(),
                priority: t.priority,
                transform: transforms.get(&t.name).cloned(),
                ignored: t.ignored,
            })
            .collect();
        let scanner = Scanner::compile(specs).map_err(|err| match err {
            GrammarError::InvalidPattern { name, message } => {
                ParserBuildError::Lexer(LexerBuildError::InvalidPattern { name, message })
            }
            GrammarError::EmptyMatch(name) => {
                ParserBuildError::Lexer(LexerBuildError::EmptyMatch(name))
            }
            other => ParserBuildError::Grammar(other),
        })?;

        let mut by_alias: HashMap<EcoString, Reducer<C>> = HashMap::new();
        for (alias, reducer) in reducers {
            if !grammar
                .productions
                .iter()
                .any(|p| p.alias.as_ref() == Some(&alias))
            {
                return Err(ParserBuildError::UnknownReducer(alias));
            }
            by_alias.insert(alias, reducer);
        }
        let production_reducers = grammar
            .productions
            .iter()
            .map(|p| p.alias.as_ref().and_then(|a| by_alias.get(a)).cloned())
            .collect();

        let terminal_ids = grammar
            .terminals
            .iter()
            .enumerate()
            .map(|(id, t)| (t.name.clone(), id))
            .collect();
        let used = grammar.terminals.iter().map(|t| t.used).collect();
        let ignored = grammar.terminals.iter().map(|t| t.ignored).collect();

        tracing::debug!(
            productions = grammar.productions.len(),
            terminals = grammar.terminals.len(),
            states = table.len(),
            "compiled parser"
        );
        Ok(Parser {
            inner: Arc::new(Compiled {
                text,
                grammar,
                table,
                scanner,
                reducers: production_reducers,
                terminal_ids,
                used,
                ignored,
                options: self.options,
            }),
        })
    }
}

impl<C> fmt::Debug for ParserBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserBuilder")
            .field("rules", &self.rules)
            .field("grammar", &self.grammar)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

struct Compiled<C> {
    text: String,
    grammar: Grammar,
    table: ParseTable,
    scanner: Scanner,
    reducers: Vec<Option<Reducer<C>>>,
    terminal_ids: HashMap<EcoString, usize>,
    used: Vec<bool>,
    ignored: Vec<bool>,
    options: ParserOptions,
}

/// A compiled LALR(1) parser.
///
/// Immutable once built and cheap to clone. Reducers receive a `&mut C`
/// context supplied per call, so one parser can serve many threads.
pub struct Parser<C = ()> {
    inner: Arc<Compiled<C>>,
}

impl<C> Clone for Parser<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> fmt::Debug for Parser<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("productions", &self.inner.grammar.productions.len())
            .field("states", &self.inner.table.len())
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl<C> Parser<C> {
    /// Starts a parser over `lexer`'s tokens.
    #[must_use]
    pub fn builder(lexer: &Lexer) -> ParserBuilder<C> {
        ParserBuilder::new(lexer)
    }

    /// Starts a parser from grammar text.
    #[must_use]
    pub fn from_grammar(text: impl Into<String>) -> ParserBuilder<C> {
        ParserBuilder::from_grammar(text)
    }

    /// Returns the grammar text that was compiled.
    #[must_use]
    pub fn grammar_text(&self) -> &str {
        &self.inner.text
    }

    /// Returns the normalized grammar.
    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.inner.grammar
    }

    /// Returns the parse table.
    #[must_use]
    pub fn table(&self) -> &ParseTable {
        &self.inner.table
    }

    /// Returns the options the parser was built with.
    #[must_use]
    pub fn options(&self) -> &ParserOptions {
        &self.inner.options
    }

    fn check_size(&self, source: &str) -> Result<(), ParseError> {
        match self.inner.options.max_input_len {
            Some(max) if source.len() > max => Err(ParseError::InputTooLarge {
                len: source.len(),
                max,
            }),
            _ => Ok(()),
        }
    }

    /// Tokenizes `source` with every terminal of the grammar, dropping
    /// ignored ones.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Lex`] or [`ParseError::InputTooLarge`].
    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, ParseError> {
        self.check_size(source)?;
        let used = &self.inner.used;
        let mut cursor = Cursor::default();
        let mut tokens = Vec::new();
        while let Some((_, token)) =
            self.inner
                .scanner
                .next_token(source, &mut cursor, &|t| used[t])?
        {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Parses `source`, passing `ctx` to every reducer.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the input does not lex or parse, or a
    /// reducer fails.
    pub fn parse_with(&self, ctx: &mut C, source: &str) -> Result<Value, ParseError> {
        self.check_size(source)?;
        let inner = &*self.inner;
        let mut tokens = ScanSource {
            scanner: &inner.scanner,
            table: &inner.table,
            used: &inner.used,
            source,
            cursor: Cursor::default(),
            contextual: inner.options.lexer == LexerMode::Contextual,
        };
        driver::run(inner, ctx, &mut tokens)
    }

    /// Parses an already-lexed token stream, for example one rewritten by
    /// a post-lexer. Token kinds are matched to terminals by name; ignored
    /// terminals are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the tokens do not parse or a reducer
    /// fails.
    pub fn parse_tokens<I>(&self, ctx: &mut C, tokens: I) -> Result<Value, ParseError>
    where
        I: IntoIterator<Item = Token>,
    {
        let inner = &*self.inner;
        let mut stream = TokenStream {
            tokens: tokens.into_iter(),
            ids: &inner.terminal_ids,
            ignored: &inner.ignored,
            unknown: inner.grammar.terminals.len(),
            end: Span::default(),
        };
        let source: &mut dyn TokenSource = &mut stream;
        driver::run(inner, ctx, source)
    }
}

impl Parser<()> {
    /// Parses `source` with reducers that need no context.
    ///
    /// # Errors
    ///
    /// See [`Parser::parse_with`].
    pub fn parse(&self, source: &str) -> Result<Value, ParseError> {
        self.parse_with(&mut (), source)
    }
}
