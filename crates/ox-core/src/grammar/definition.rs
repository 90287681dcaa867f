// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Grammar definitions as read from grammar text.
//!
//! This is the EBNF-level view: rules still contain groups, optionals and
//! repetitions. [`Grammar`](super::Grammar) is the flattened BNF view the
//! table builder works on.

use std::fmt;

use ecow::EcoString;

/// A terminal pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// A literal string, `"if"` or `"if"i`.
    Literal {
        /// The exact text.
        text: EcoString,
        /// Match regardless of case.
        case_insensitive: bool,
    },
    /// A regular expression, `/[a-z]+/i`.
    Regex {
        /// Regex source, with `\/` already unescaped.
        source: EcoString,
        /// Inline flags (`i`, `m`, `s`, `x`).
        flags: EcoString,
    },
}

impl Pattern {
    /// Creates a case-sensitive literal.
    pub fn literal(text: impl Into<EcoString>) -> Self {
        Self::Literal {
            text: text.into(),
            case_insensitive: false,
        }
    }

    /// Creates a regex without flags.
    pub fn regex(source: impl Into<EcoString>) -> Self {
        Self::Regex {
            source: source.into(),
            flags: EcoString::new(),
        }
    }

    /// Returns true for literal strings.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }

    /// Returns the pattern as regex source (unanchored).
    #[must_use]
    pub fn to_regex(&self) -> String {
        match self {
            Self::Literal {
                text,
                case_insensitive,
            } => {
                let escaped = regex::escape(text);
                if *case_insensitive {
                    format!("(?i:{escaped})")
                } else {
                    escaped
                }
            }
            Self::Regex { source, flags } if flags.is_empty() => source.to_string(),
            Self::Regex { source, flags } => format!("(?{flags}:{source})"),
        }
    }
}

impl fmt::Display for Pattern {
    /// Renders the pattern in grammar-text syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal {
                text,
                case_insensitive,
            } => {
                f.write_str("\"")?;
                for c in text.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")?;
                if *case_insensitive {
                    f.write_str("i")?;
                }
                Ok(())
            }
            Self::Regex { source, flags } => {
                write!(f, "/{}/{flags}", escape_regex(source))
            }
        }
    }
}

/// Escapes a regex for grammar text: every `/` that is not already escaped,
/// and control characters, which cannot appear raw on a grammar line.
#[must_use]
pub fn escape_regex(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut escaped = false;
    for c in source.chars() {
        if c.is_control() {
            if !escaped {
                out.push('\\');
            }
            match c {
                '\n' => out.push('n'),
                '\r' => out.push('r'),
                '\t' => out.push('t'),
                c => out.push_str(&format!("x{{{:X}}}", u32::from(c))),
            }
            escaped = false;
            continue;
        }
        if c == '/' && !escaped {
            out.push('\\');
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out
}

/// A terminal definition: `NAME.prio : pattern | pattern`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalDef {
    /// Terminal name.
    pub name: EcoString,
    /// Match priority; higher wins before length is considered.
    pub priority: i32,
    /// Alternative patterns.
    pub patterns: Vec<Pattern>,
}

/// Rule modifiers written before the rule name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleModifiers {
    /// `?rule`: a match with exactly one child is replaced by that child.
    pub inline_single: bool,
    /// `!rule`: anonymous literal tokens are kept.
    pub keep_all_tokens: bool,
}

/// A rule definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
    /// Rule name.
    pub name: EcoString,
    /// Modifiers.
    pub modifiers: RuleModifiers,
    /// Alternatives in declaration order.
    pub alternatives: Vec<Alternative>,
}

/// One `|`-separated alternative, with an optional `-> alias`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alternative {
    /// Items in sequence.
    pub items: Vec<Item>,
    /// Alias the produced value is named (and reduced) by.
    pub alias: Option<EcoString>,
}

/// Repetition suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// `x?`
    Optional,
    /// `x*`
    ZeroOrMore,
    /// `x+`
    OneOrMore,
}

/// An item of an alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A reference to a rule or named terminal.
    Name(EcoString),
    /// An inline anonymous terminal.
    Pattern(Pattern),
    /// `( a | b )`
    Group(Vec<Alternative>),
    /// `[ a | b ]`: optional, producing `None` placeholders when absent.
    Maybe(Vec<Alternative>),
    /// `x?`, `x*`, `x+`
    Repeat(Box<Item>, Repeat),
}

/// An `%ignore` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreItem {
    /// A named terminal.
    Name(EcoString),
    /// An anonymous pattern.
    Pattern(Pattern),
}

impl fmt::Display for RuleDef {
    /// Renders the rule in grammar-text syntax, one alternative per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.inline_single {
            f.write_str("?")?;
        }
        if self.modifiers.keep_all_tokens {
            f.write_str("!")?;
        }
        write!(f, "{}:", self.name)?;
        for (i, alt) in self.alternatives.iter().enumerate() {
            if i > 0 {
                write!(f, "\n{:width$}|", "", width = self.name.len())?;
            }
            if !alt.items.is_empty() || alt.alias.is_some() {
                write!(f, " {alt}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sequence(f, &self.items)?;
        if let Some(alias) = &self.alias {
            if !self.items.is_empty() {
                f.write_str(" ")?;
            }
            write!(f, "-> {alias}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Pattern(pattern) => write!(f, "{pattern}"),
            Self::Group(alts) => {
                f.write_str("(")?;
                write_alternatives(f, alts)?;
                f.write_str(")")
            }
            Self::Maybe(alts) => {
                f.write_str("[")?;
                write_alternatives(f, alts)?;
                f.write_str("]")
            }
            Self::Repeat(inner, repeat) => {
                let suffix = match repeat {
                    Repeat::Optional => "?",
                    Repeat::ZeroOrMore => "*",
                    Repeat::OneOrMore => "+",
                };
                write!(f, "{inner}{suffix}")
            }
        }
    }
}

fn write_sequence(f: &mut fmt::Formatter<'_>, items: &[Item]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_alternatives(f: &mut fmt::Formatter<'_>, alts: &[Alternative]) -> fmt::Result {
    for (i, alt) in alts.iter().enumerate() {
        if i > 0 {
            f.write_str(" | ")?;
        }
        write_sequence(f, &alt.items)?;
    }
    Ok(())
}

/// A whole grammar as written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GrammarDef {
    /// Rules in declaration order.
    pub rules: Vec<RuleDef>,
    /// Terminals in declaration order.
    pub terminals: Vec<TerminalDef>,
    /// `%ignore` targets.
    pub ignore: Vec<IgnoreItem>,
    /// `%declare`d terminals: names without patterns, produced by post-lexers.
    pub declared: Vec<EcoString>,
}

impl GrammarDef {
    /// Appends the contents of `other`.
    pub fn extend(&mut self, other: Self) {
        self.rules.extend(other.rules);
        self.terminals.extend(other.terminals);
        self.ignore.extend(other.ignore);
        self.declared.extend(other.declared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_regex_is_escaped() {
        assert_eq!(Pattern::literal("+").to_regex(), r"\+");
        let ci = Pattern::Literal {
            text: "if".into(),
            case_insensitive: true,
        };
        assert_eq!(ci.to_regex(), "(?i:if)");
    }

    #[test]
    fn regex_flags_become_inline_group() {
        let p = Pattern::Regex {
            source: "[a-z]+".into(),
            flags: "i".into(),
        };
        assert_eq!(p.to_regex(), "(?i:[a-z]+)");
        assert_eq!(p.to_string(), "/[a-z]+/i");
    }

    #[test]
    fn display_escapes_slashes_once() {
        assert_eq!(Pattern::regex("[*/]").to_string(), r"/[*\/]/");
        assert_eq!(Pattern::regex(r"[*\/]").to_string(), r"/[*\/]/");
        assert_eq!(Pattern::regex(r"\\/").to_string(), r"/\\\//");
    }

    #[test]
    fn display_escapes_control_characters() {
        assert_eq!(Pattern::regex("\n").to_string(), r"/\n/");
        assert_eq!(Pattern::regex("[ \t\r]+\u{1}").to_string(), r"/[ \t\r]+\x{1}/");
        assert_eq!(Pattern::regex("\\\n").to_string(), r"/\n/");
        assert_eq!(Pattern::regex(r"\n").to_string(), r"/\n/");
    }

    #[test]
    fn rule_display_is_grammar_text() {
        let rule = RuleDef {
            name: "sum".into(),
            modifiers: RuleModifiers {
                inline_single: true,
                keep_all_tokens: false,
            },
            alternatives: vec![
                Alternative {
                    items: vec![
                        Item::Name("sum".into()),
                        Item::Pattern(Pattern::literal("+")),
                        Item::Repeat(Box::new(Item::Name("term".into())), Repeat::OneOrMore),
                    ],
                    alias: Some("add".into()),
                },
                Alternative {
                    items: vec![Item::Maybe(vec![
                        Alternative {
                            items: vec![Item::Name("A".into())],
                            alias: None,
                        },
                        Alternative {
                            items: vec![Item::Name("B".into())],
                            alias: None,
                        },
                    ])],
                    alias: None,
                },
            ],
        };
        assert_eq!(rule.to_string(), "?sum: sum \"+\" term+ -> add\n   | [A | B]");
    }

    #[test]
    fn display_quotes_literals() {
        assert_eq!(Pattern::literal("a\"b").to_string(), r#""a\"b""#);
    }
}
