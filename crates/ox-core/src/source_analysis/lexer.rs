// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Lexer compiler.
//!
//! Token rules are declared by name. A name may carry two conventions:
//! a leading underscore marks the token as always skipped (`_WS`), and a
//! trailing `_<digits>_` gives it an explicit priority (`NAME_2_`). The
//! rules are compiled into grammar text, one terminal line per token, and
//! that text is what the parser compiler later merges with its rules.
//!
//! # Matching
//!
//! At each position every candidate terminal is tried and the winner is
//! chosen by, in order: higher priority, longer match, literal over regex,
//! earlier declaration.
//!
//! # Example
//!
//! ```
//! use ox_core::source_analysis::{LexerBuilder, Scalar, Transform};
//!
//! let lexer = LexerBuilder::new()
//!     .token("INT", (r"\d+", Transform::int()))
//!     .token("SUM", r"[+-]")
//!     .token("_WS", r"\s+")
//!     .build()
//!     .unwrap();
//! let tokens = lexer.tokenize("20 + 1").unwrap();
//! assert_eq!(tokens[0].value(), &Scalar::Int(20));
//! assert_eq!(tokens.len(), 3);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, LazyLock};

use ecow::EcoString;
use regex::Regex;

use super::{LexError, LexerBuildError, Position, Scalar, Span, Token};
use crate::grammar::{read_grammar, GrammarDef, GrammarError, IgnoreItem, Pattern, TerminalDef};

#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
static TOKEN_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(_)?([A-Z][A-Z0-9_]*?)(?:_(\d+)_)?$").expect("valid token name pattern")
});

/// A function from matched text to a token value.
#[derive(Clone)]
pub struct Transform(Arc<dyn Fn(&str) -> Result<Scalar, String> + Send + Sync>);

impl Transform {
    /// Wraps a conversion function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<Scalar, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Parses the text as an `i64`.
    #[must_use]
    pub fn int() -> Self {
        Self::new(|text| {
            text.parse::<i64>()
                .map(Scalar::Int)
                .map_err(|e| e.to_string())
        })
    }

    /// Parses the text as an `f64`.
    #[must_use]
    pub fn float() -> Self {
        Self::new(|text| {
            text.parse::<f64>()
                .map(Scalar::Float)
                .map_err(|e| e.to_string())
        })
    }

    /// Keeps the text as a [`Scalar::Symbol`].
    #[must_use]
    pub fn symbol() -> Self {
        Self::new(|text| Ok(Scalar::symbol(text)))
    }

    /// Applies the transform.
    ///
    /// # Errors
    ///
    /// Returns the transform's message when it rejects `text`.
    pub fn apply(&self, text: &str) -> Result<Scalar, String> {
        (self.0)(text)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// How a token's pattern was declared.
#[derive(Debug, Clone)]
pub enum PatternSpec {
    /// A bare regex; the value is the matched text.
    Regex(EcoString),
    /// A regex whose matched text is passed through a transform.
    Transformed(EcoString, Transform),
}

impl PatternSpec {
    /// Builds a spec from a `{regex: transform}` mapping.
    ///
    /// # Errors
    ///
    /// Returns [`LexerBuildError::MultiplePatterns`] unless the mapping has
    /// exactly one entry.
    pub fn from_mapping<S, I>(entries: I) -> Result<Self, LexerBuildError>
    where
        S: Into<EcoString>,
        I: IntoIterator<Item = (S, Transform)>,
    {
        let mut entries = entries.into_iter();
        match (entries.next(), entries.next()) {
            (Some((regex, transform)), None) => Ok(Self::Transformed(regex.into(), transform)),
            _ => Err(LexerBuildError::MultiplePatterns),
        }
    }

    fn regex(&self) -> &EcoString {
        match self {
            Self::Regex(r) | Self::Transformed(r, _) => r,
        }
    }

    fn transform(&self) -> Option<&Transform> {
        match self {
            Self::Regex(_) => None,
            Self::Transformed(_, t) => Some(t),
        }
    }
}

impl From<&str> for PatternSpec {
    fn from(regex: &str) -> Self {
        Self::Regex(regex.into())
    }
}

impl From<(&str, Transform)> for PatternSpec {
    fn from((regex, transform): (&str, Transform)) -> Self {
        Self::Transformed(regex.into(), transform)
    }
}

/// Declares token rules and compiles them into a [`Lexer`].
#[derive(Debug, Default)]
pub struct LexerBuilder {
    rules: Vec<(EcoString, PatternSpec)>,
    ignore: Vec<EcoString>,
    grammar: Option<String>,
    transforms: Vec<(EcoString, Transform)>,
}

impl LexerBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a token rule.
    #[must_use]
    pub fn token(mut self, name: impl Into<EcoString>, spec: impl Into<PatternSpec>) -> Self {
        self.rules.push((name.into(), spec.into()));
        self
    }

    /// Marks tokens to discard from the output stream.
    #[must_use]
    pub fn ignore<S: Into<EcoString>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.ignore.extend(names.into_iter().map(Into::into));
        self
    }

    /// Marks tokens to discard, given as a comma-separated list.
    #[must_use]
    pub fn ignore_list(self, names: &str) -> Self {
        let names: Vec<EcoString> = names
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(EcoString::from)
            .collect();
        self.ignore(names)
    }

    /// Uses hand-written grammar text instead of token rules.
    ///
    /// The text may only contain terminal definitions and `%ignore`
    /// directives.
    #[must_use]
    pub fn grammar(mut self, text: impl Into<String>) -> Self {
        self.grammar = Some(text.into());
        self
    }

    /// Attaches a transform to a terminal of the grammar text.
    #[must_use]
    pub fn transform(mut self, name: impl Into<EcoString>, transform: Transform) -> Self {
        self.transforms.push((name.into(), transform));
        self
    }

    /// Compiles the declarations.
    ///
    /// # Errors
    ///
    /// Returns a [`LexerBuildError`] when a name or pattern is invalid, a
    /// token is declared twice, an ignored token is undeclared, or token
    /// rules and grammar text are mixed.
    #[tracing::instrument(skip_all, fields(rules = self.rules.len()))]
    pub fn build(self) -> Result<Lexer, LexerBuildError> {
        match self.grammar {
            Some(_) if !self.rules.is_empty() => Err(LexerBuildError::RulesAndGrammar),
            Some(text) => {
                let transforms = self.transforms.into_iter().collect();
                Lexer::from_grammar_text(text, transforms, &self.ignore)
            }
            None => {
                let (text, transforms) = rules_to_grammar(self.rules, &self.ignore)?;
                Lexer::from_grammar_text(text, transforms, &[])
            }
        }
    }
}

struct DeclaredToken {
    name: EcoString,
    priority: Option<i32>,
    spec: PatternSpec,
}

/// Validates token rules and renders them as grammar text.
fn rules_to_grammar(
    rules: Vec<(EcoString, PatternSpec)>,
    ignore: &[EcoString],
) -> Result<(String, HashMap<EcoString, Transform>), LexerBuildError> {
    let mut declared: Vec<DeclaredToken> = Vec::with_capacity(rules.len());
    let mut skipped: Vec<EcoString> = Vec::new();
    for (raw_name, spec) in rules {
        let caps = TOKEN_NAME
            .captures(&raw_name)
            .ok_or_else(|| LexerBuildError::InvalidName(raw_name.clone()))?;
        let name: EcoString = caps.get(2).map_or("", |m| m.as_str()).into();
        let priority = match caps.get(3) {
            Some(m) => Some(
                m.as_str()
                    .parse::<i32>()
                    .map_err(|_| LexerBuildError::InvalidName(raw_name.clone()))?,
            ),
            None => None,
        };
        if declared.iter().any(|d| d.name == name) {
            return Err(LexerBuildError::Duplicate(name));
        }
        if caps.get(1).is_some() {
            skipped.push(name.clone());
        }
        declared.push(DeclaredToken {
            name,
            priority,
            spec,
        });
    }

    for name in ignore {
        if !declared.iter().any(|d| &d.name == name) {
            return Err(LexerBuildError::UnknownIgnored(name.clone()));
        }
    }

    let mut ordered: Vec<&DeclaredToken> = declared.iter().collect();
    ordered.sort_by_key(|d| std::cmp::Reverse(d.priority.unwrap_or(0)));

    let mut text = String::new();
    for token in ordered {
        let pattern = Pattern::regex(token.spec.regex().clone());
        match token.priority {
            Some(p) => text.push_str(&format!("{}.{p} : {pattern}\n", token.name)),
            None => text.push_str(&format!("{} : {pattern}\n", token.name)),
        }
    }
    let mut ignored: Vec<&EcoString> = Vec::new();
    for name in ignore.iter().chain(&skipped) {
        if !ignored.contains(&name) {
            ignored.push(name);
            text.push_str(&format!("%ignore {name}\n"));
        }
    }

    let transforms = declared
        .into_iter()
        .filter_map(|d| d.spec.transform().cloned().map(|t| (d.name, t)))
        .collect();
    Ok((text, transforms))
}

/// A terminal ready for matching.
#[derive(Debug, Clone)]
pub struct TerminalSpec {
    /// Terminal name.
    pub name: EcoString,
    /// Alternative patterns.
    pub patterns: Vec<Pattern>,
    /// Match priority.
    pub priority: i32,
    /// Value transform.
    pub transform: Option<Transform>,
    /// Matches are discarded.
    pub ignored: bool,
}

#[derive(Debug, Clone)]
struct CompiledTerminal {
    name: EcoString,
    /// `None` for `%declare`d terminals, which are never matched.
    regex: Option<Regex>,
    priority: i32,
    literal: bool,
    transform: Option<Transform>,
    ignored: bool,
}

/// Byte offset plus line/column, advanced as input is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Cursor {
    pub(crate) offset: usize,
    pub(crate) position: Position,
}

/// The matching engine shared by [`Lexer`] and the parser's contextual
/// lexing.
#[derive(Debug, Clone)]
pub(crate) struct Scanner {
    terminals: Vec<CompiledTerminal>,
}

impl Scanner {
    /// Compiles terminal specs; indices in `specs` are the terminal ids
    /// passed to the `allowed` predicates.
    pub(crate) fn compile(specs: Vec<TerminalSpec>) -> Result<Self, GrammarError> {
        let terminals = specs
            .into_iter()
            .map(compile_terminal)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { terminals })
    }

    pub(crate) fn len(&self) -> usize {
        self.terminals.len()
    }

    /// Finds the best match at the start of `rest`.
    fn best_match(&self, rest: &str, allowed: &dyn Fn(usize) -> bool) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        let mut best_key = None;
        for (idx, terminal) in self.terminals.iter().enumerate() {
            if !(terminal.ignored || allowed(idx)) {
                continue;
            }
            let Some(m) = terminal.regex.as_ref().and_then(|r| r.find(rest)) else {
                continue;
            };
            let len = m.end();
            if len == 0 {
                continue;
            }
            let key = (terminal.priority, len, terminal.literal);
            if best_key.is_none_or(|b| key > b) {
                best = Some((idx, len));
                best_key = Some(key);
            }
        }
        best
    }

    /// Scans the next significant token, skipping ignored terminals.
    ///
    /// Returns `Ok(None)` at end of input.
    pub(crate) fn next_token(
        &self,
        source: &str,
        cursor: &mut Cursor,
        allowed: &dyn Fn(usize) -> bool,
    ) -> Result<Option<(usize, Token)>, LexError> {
        loop {
            let Some(rest) = source.get(cursor.offset..).filter(|r| !r.is_empty()) else {
                return Ok(None);
            };
            let Some((idx, len)) = self.best_match(rest, allowed) else {
                let c = rest.chars().next().unwrap_or_default();
                return Err(LexError::unexpected_char(
                    c,
                    Span::from(cursor.offset..cursor.offset + c.len_utf8()),
                    cursor.position,
                ));
            };
            let text = &rest[..len];
            let start = cursor.position;
            let end = start.advance(text);
            let span = Span::from(cursor.offset..cursor.offset + len);
            cursor.offset += len;
            cursor.position = end;

            let terminal = &self.terminals[idx];
            if terminal.ignored {
                tracing::trace!(terminal = %terminal.name, "skipped");
                continue;
            }
            let token = match &terminal.transform {
                None => Token::new(terminal.name.clone(), Scalar::str(text)),
                Some(transform) => {
                    let value = transform.apply(text).map_err(|message| {
                        LexError::invalid_value(terminal.name.clone(), message, span, start)
                    })?;
                    let token = Token::new(terminal.name.clone(), value);
                    if token.text() == text {
                        token
                    } else {
                        token.with_raw(text)
                    }
                }
            }
            .with_location(span, start, end);
            tracing::trace!(%token, "lexed");
            return Ok(Some((idx, token)));
        }
    }
}

fn compile_terminal(spec: TerminalSpec) -> Result<CompiledTerminal, GrammarError> {
    let source = match spec.patterns.as_slice() {
        [] => {
            return Ok(CompiledTerminal {
                name: spec.name,
                regex: None,
                priority: spec.priority,
                literal: false,
                transform: spec.transform,
                ignored: spec.ignored,
            });
        }
        [single] => single.to_regex(),
        many => many
            .iter()
            .map(|p| format!("(?:{})", p.to_regex()))
            .collect::<Vec<_>>()
            .join("|"),
    };
    let regex = Regex::new(&format!("^(?:{source})")).map_err(|e| GrammarError::InvalidPattern {
        name: spec.name.clone(),
        message: e.to_string(),
    })?;
    if regex.is_match("") {
        return Err(GrammarError::EmptyMatch(spec.name));
    }
    let literal = matches!(spec.patterns.as_slice(), [p] if p.is_literal());
    Ok(CompiledTerminal {
        name: spec.name,
        regex: Some(regex),
        priority: spec.priority,
        literal,
        transform: spec.transform,
        ignored: spec.ignored,
    })
}

/// A compiled lexer.
///
/// Cheap to clone; the compiled patterns are shared.
#[derive(Debug, Clone)]
pub struct Lexer {
    scanner: Arc<Scanner>,
    grammar: String,
    definition: GrammarDef,
    transforms: HashMap<EcoString, Transform>,
}

impl Lexer {
    /// Starts declaring token rules.
    #[must_use]
    pub fn builder() -> LexerBuilder {
        LexerBuilder::new()
    }

    fn from_grammar_text(
        text: String,
        transforms: HashMap<EcoString, Transform>,
        extra_ignore: &[EcoString],
    ) -> Result<Self, LexerBuildError> {
        let definition = read_grammar(&text).map_err(|err| match err {
            GrammarError::InvalidPattern { name, message } => {
                LexerBuildError::InvalidPattern { name, message }
            }
            other => LexerBuildError::Grammar(other),
        })?;
        if let Some(rule) = definition.rules.first() {
            return Err(LexerBuildError::RuleInLexer(rule.name.clone()));
        }
        for name in transforms.keys() {
            if !definition.terminals.iter().any(|t| &t.name == name) {
                return Err(LexerBuildError::UnknownTransform(name.clone()));
            }
        }

        let mut ignored: HashSet<EcoString> = extra_ignore.iter().cloned().collect();
        let mut specs: Vec<TerminalSpec> = Vec::new();
        let mut anonymous = Vec::new();
        for item in &definition.ignore {
            match item {
                IgnoreItem::Name(name) => {
                    ignored.insert(name.clone());
                }
                IgnoreItem::Pattern(pattern) => anonymous.push(pattern.clone()),
            }
        }
        for name in &ignored {
            if !definition.terminals.iter().any(|t| &t.name == name) {
                return Err(LexerBuildError::UnknownIgnored(name.clone()));
            }
        }
        for TerminalDef {
            name,
            priority,
            patterns,
        } in &definition.terminals
        {
            specs.push(TerminalSpec {
                name: name.clone(),
                patterns: patterns.clone(),
                priority: *priority,
                transform: transforms.get(name).cloned(),
                ignored: ignored.contains(name),
            });
        }
        for (i, pattern) in anonymous.into_iter().enumerate() {
            specs.push(TerminalSpec {
                name: format!("__IGNORE_{i}").into(),
                patterns: vec![pattern],
                priority: 0,
                transform: None,
                ignored: true,
            });
        }

        let scanner = Scanner::compile(specs).map_err(|err| match err {
            GrammarError::InvalidPattern { name, message } => {
                LexerBuildError::InvalidPattern { name, message }
            }
            GrammarError::EmptyMatch(name) => LexerBuildError::EmptyMatch(name),
            other => LexerBuildError::Grammar(other),
        })?;
        tracing::debug!(terminals = scanner.len(), "compiled lexer");

        let mut grammar = text;
        for name in extra_ignore {
            grammar.push_str(&format!("%ignore {name}\n"));
        }
        Ok(Self {
            scanner: Arc::new(scanner),
            grammar,
            definition,
            transforms,
        })
    }

    /// Returns the generated grammar text: one terminal per line followed
    /// by `%ignore` directives.
    #[must_use]
    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    /// Returns the terminal definitions.
    #[must_use]
    pub fn definition(&self) -> &GrammarDef {
        &self.definition
    }

    pub(crate) fn transforms(&self) -> &HashMap<EcoString, Transform> {
        &self.transforms
    }

    /// Returns the transform attached to terminal `name`.
    #[must_use]
    pub fn transform(&self, name: &str) -> Option<&Transform> {
        self.transforms.get(name)
    }

    /// Returns an iterator over the tokens of `source`.
    ///
    /// The iterator stops after the first error.
    #[must_use]
    pub fn tokens<'a>(&'a self, source: &'a str) -> Tokens<'a> {
        Tokens {
            scanner: &self.scanner,
            source,
            cursor: Cursor::default(),
            done: false,
        }
    }

    /// Tokenizes all of `source`.
    ///
    /// # Errors
    ///
    /// Returns a [`LexError`] when no terminal matches at some position or
    /// a transform rejects its text.
    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, LexError> {
        self.tokens(source).collect()
    }
}

/// Lazy token stream returned by [`Lexer::tokens`].
#[derive(Debug)]
pub struct Tokens<'a> {
    scanner: &'a Scanner,
    source: &'a str,
    cursor: Cursor,
    done: bool,
}

impl Iterator for Tokens<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.scanner.next_token(self.source, &mut self.cursor, &|_| true) {
            Ok(Some((_, token))) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
