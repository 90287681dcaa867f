// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Reader for grammar text.
//!
//! The accepted syntax is a subset of Lark's:
//!
//! ```text
//! // comment
//! ?expr   : expr PLUS term -> binop
//!         | term
//! !atom   : "(" expr ")" | NUMBER
//! list    : [item ("," item)*]
//! NUMBER.2: /\d+/
//! %ignore /\s+/
//! %declare _INDENT _DEDENT
//! ```
//!
//! Rule names start with a lowercase letter (after optional underscores);
//! terminal names with an uppercase one. A definition ends at a newline
//! unless the next line continues it with `|`. Newlines inside `( )` and
//! `[ ]` are insignificant.

use std::iter::Peekable;
use std::str::CharIndices;

use ecow::EcoString;

use super::definition::{
    Alternative, GrammarDef, IgnoreItem, Item, Pattern, Repeat, RuleDef, RuleModifiers,
    TerminalDef,
};
use super::GrammarError;

/// Reads grammar text into a [`GrammarDef`].
///
/// # Errors
///
/// Returns [`GrammarError::Syntax`] for malformed text,
/// [`GrammarError::UnsupportedDirective`] for directives other than
/// `%ignore` and `%declare`, and duplicate-definition errors.
pub fn read_grammar(text: &str) -> Result<GrammarDef, GrammarError> {
    let tokens = GrammarLexer::new(text).tokenize()?;
    Reader { tokens, pos: 0 }.read()
}

#[derive(Debug, Clone, PartialEq)]
enum MetaKind {
    RuleName(EcoString),
    TermName(EcoString),
    Pattern(Pattern),
    Number(i32),
    Directive(EcoString),
    Colon,
    Pipe,
    Arrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Question,
    Star,
    Plus,
    Bang,
    Dot,
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
struct MetaToken {
    kind: MetaKind,
    line: u32,
    column: u32,
}

struct GrammarLexer<'src> {
    chars: Peekable<CharIndices<'src>>,
    line: u32,
    column: u32,
}

impl<'src> GrammarLexer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> GrammarError {
        GrammarError::syntax(self.line, self.column, message)
    }

    fn tokenize(mut self) -> Result<Vec<MetaToken>, GrammarError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_blanks();
            let (line, column) = (self.line, self.column);
            let kind = match self.peek_char() {
                None => {
                    tokens.push(MetaToken {
                        kind: MetaKind::Eof,
                        line,
                        column,
                    });
                    return Ok(tokens);
                }
                Some(c) => self.lex_token(c)?,
            };
            tokens.push(MetaToken { kind, line, column });
        }
    }

    /// Skips spaces, tabs, carriage returns and `//` comments (not newlines).
    fn skip_blanks(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ' | '\t' | '\r') => {
                    self.advance();
                }
                Some('/') if self.second_char() == Some('/') => {
                    while self.peek_char().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn second_char(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, c)| c)
    }

    fn lex_token(&mut self, c: char) -> Result<MetaKind, GrammarError> {
        let kind = match c {
            '\n' => {
                self.advance();
                MetaKind::Newline
            }
            ':' => {
                self.advance();
                MetaKind::Colon
            }
            '|' => {
                self.advance();
                MetaKind::Pipe
            }
            '(' => {
                self.advance();
                MetaKind::LParen
            }
            ')' => {
                self.advance();
                MetaKind::RParen
            }
            '[' => {
                self.advance();
                MetaKind::LBracket
            }
            ']' => {
                self.advance();
                MetaKind::RBracket
            }
            '?' => {
                self.advance();
                MetaKind::Question
            }
            '*' => {
                self.advance();
                MetaKind::Star
            }
            '+' => {
                self.advance();
                MetaKind::Plus
            }
            '!' => {
                self.advance();
                MetaKind::Bang
            }
            '.' => {
                self.advance();
                MetaKind::Dot
            }
            '-' if self.second_char() == Some('>') => {
                self.advance();
                self.advance();
                MetaKind::Arrow
            }
            '-' | '0'..='9' => self.lex_number()?,
            '"' => self.lex_literal()?,
            '/' => self.lex_regex()?,
            '%' => {
                self.advance();
                MetaKind::Directive(self.lex_word())
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                let word = self.lex_word();
                match word.trim_start_matches('_').chars().next() {
                    Some(first) if first.is_ascii_uppercase() => MetaKind::TermName(word),
                    Some(_) => MetaKind::RuleName(word),
                    None => return Err(self.error(format!("invalid name {word:?}"))),
                }
            }
            other => return Err(self.error(format!("unexpected character {other:?}"))),
        };
        Ok(kind)
    }

    fn lex_word(&mut self) -> EcoString {
        let mut word = EcoString::new();
        while let Some(c) = self.peek_char() {
            if c == '_' || c.is_ascii_alphanumeric() {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    fn lex_number(&mut self) -> Result<MetaKind, GrammarError> {
        let mut text = String::new();
        if self.peek_char() == Some('-') {
            text.push('-');
            self.advance();
        }
        while let Some(c) = self.peek_char().filter(char::is_ascii_digit) {
            text.push(c);
            self.advance();
        }
        text.parse()
            .map(MetaKind::Number)
            .map_err(|_| self.error(format!("invalid number {text:?}")))
    }

    fn lex_literal(&mut self) -> Result<MetaKind, GrammarError> {
        self.advance();
        let mut text = EcoString::new();
        loop {
            match self.advance() {
                None | Some('\n') => return Err(self.error("unterminated string literal")),
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(c @ ('"' | '\\')) => text.push(c),
                    Some(c) => {
                        text.push('\\');
                        text.push(c);
                    }
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) => text.push(c),
            }
        }
        if text.is_empty() {
            return Err(self.error("empty string literal"));
        }
        let case_insensitive =
            self.peek_char() == Some('i') && !self.second_char().is_some_and(is_word_char);
        if case_insensitive {
            self.advance();
        }
        Ok(MetaKind::Pattern(Pattern::Literal {
            text,
            case_insensitive,
        }))
    }

    fn lex_regex(&mut self) -> Result<MetaKind, GrammarError> {
        self.advance();
        let mut source = EcoString::new();
        loop {
            match self.advance() {
                None | Some('\n') => return Err(self.error("unterminated regular expression")),
                Some('/') => break,
                Some('\\') => match self.advance() {
                    Some('/') => source.push('/'),
                    Some(c) => {
                        source.push('\\');
                        source.push(c);
                    }
                    None => return Err(self.error("unterminated regular expression")),
                },
                Some(c) => source.push(c),
            }
        }
        let mut flags = EcoString::new();
        while let Some(c) = self.peek_char().filter(|c| matches!(*c, 'i' | 'm' | 's' | 'x')) {
            flags.push(c);
            self.advance();
        }
        if self.peek_char().is_some_and(is_word_char) {
            return Err(self.error("unsupported regular expression flag"));
        }
        Ok(MetaKind::Pattern(Pattern::Regex { source, flags }))
    }
}

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

struct Reader {
    tokens: Vec<MetaToken>,
    pos: usize,
}

impl Reader {
    fn peek(&self) -> &MetaKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn current(&self) -> &MetaToken {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> MetaKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn error(&self, message: impl Into<String>) -> GrammarError {
        let tok = self.current();
        GrammarError::syntax(tok.line, tok.column, message)
    }

    fn expect(&mut self, kind: &MetaKind, what: &str) -> Result<(), GrammarError> {
        if self.peek() == kind {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn skip_newlines(&mut self) {
        while *self.peek() == MetaKind::Newline {
            self.bump();
        }
    }

    /// True if the next significant token, skipping newlines, is `|`.
    fn continues_with_pipe(&self) -> bool {
        self.tokens[self.pos..]
            .iter()
            .find(|t| t.kind != MetaKind::Newline)
            .is_some_and(|t| t.kind == MetaKind::Pipe)
    }

    fn end_definition(&mut self) -> Result<(), GrammarError> {
        match self.peek() {
            MetaKind::Newline | MetaKind::Eof => Ok(()),
            _ => Err(self.error("expected end of line")),
        }
    }

    fn read(mut self) -> Result<GrammarDef, GrammarError> {
        let mut def = GrammarDef::default();
        loop {
            self.skip_newlines();
            match self.peek().clone() {
                MetaKind::Eof => return Ok(def),
                MetaKind::Directive(name) => {
                    self.bump();
                    self.read_directive(&name, &mut def)?;
                }
                MetaKind::TermName(name) => {
                    self.bump();
                    let terminal = self.read_terminal(name)?;
                    if def.terminals.iter().any(|t| t.name == terminal.name) {
                        return Err(GrammarError::DuplicateTerminal(terminal.name));
                    }
                    def.terminals.push(terminal);
                }
                MetaKind::RuleName(_) | MetaKind::Question | MetaKind::Bang => {
                    let rule = self.read_rule()?;
                    if def.rules.iter().any(|r| r.name == rule.name) {
                        return Err(GrammarError::DuplicateRule(rule.name));
                    }
                    def.rules.push(rule);
                }
                _ => return Err(self.error("expected a rule or terminal definition")),
            }
            self.end_definition()?;
        }
    }

    fn read_directive(&mut self, name: &str, def: &mut GrammarDef) -> Result<(), GrammarError> {
        match name {
            "ignore" => loop {
                match self.bump() {
                    MetaKind::TermName(term) => def.ignore.push(IgnoreItem::Name(term)),
                    MetaKind::Pattern(pattern) => def.ignore.push(IgnoreItem::Pattern(pattern)),
                    _ => return Err(self.error("expected a terminal or pattern after %ignore")),
                }
                if *self.peek() != MetaKind::Pipe {
                    return Ok(());
                }
                self.bump();
            },
            "declare" => {
                let mut any = false;
                while let MetaKind::TermName(term) = self.peek().clone() {
                    self.bump();
                    def.declared.push(term);
                    any = true;
                }
                if any {
                    Ok(())
                } else {
                    Err(self.error("expected terminal names after %declare"))
                }
            }
            other => Err(GrammarError::UnsupportedDirective(other.into())),
        }
    }

    fn read_terminal(&mut self, name: EcoString) -> Result<TerminalDef, GrammarError> {
        let mut priority = 0;
        if *self.peek() == MetaKind::Dot {
            self.bump();
            match self.bump() {
                MetaKind::Number(n) => priority = n,
                _ => return Err(self.error("expected a priority after '.'")),
            }
        }
        self.expect(&MetaKind::Colon, "':'")?;
        let mut patterns = Vec::new();
        loop {
            match self.bump() {
                MetaKind::Pattern(p) => patterns.push(p),
                _ => {
                    return Err(self.error(format!(
                        "terminal {name} may only contain string literals and regular expressions"
                    )));
                }
            }
            if self.continues_with_pipe() {
                self.skip_newlines();
                self.bump();
            } else {
                break;
            }
        }
        Ok(TerminalDef {
            name,
            priority,
            patterns,
        })
    }

    fn read_rule(&mut self) -> Result<RuleDef, GrammarError> {
        let mut modifiers = RuleModifiers::default();
        loop {
            match self.peek() {
                MetaKind::Question => modifiers.inline_single = true,
                MetaKind::Bang => modifiers.keep_all_tokens = true,
                _ => break,
            }
            self.bump();
        }
        let MetaKind::RuleName(name) = self.bump() else {
            return Err(self.error("expected a rule name"));
        };
        self.expect(&MetaKind::Colon, "':'")?;
        let alternatives = self.read_alternatives(0)?;
        Ok(RuleDef {
            name,
            modifiers,
            alternatives,
        })
    }

    fn read_alternatives(&mut self, depth: usize) -> Result<Vec<Alternative>, GrammarError> {
        let mut alternatives = vec![self.read_alternative(depth)?];
        loop {
            if depth > 0 {
                self.skip_newlines();
            } else if self.continues_with_pipe() {
                self.skip_newlines();
            }
            if *self.peek() != MetaKind::Pipe {
                return Ok(alternatives);
            }
            self.bump();
            alternatives.push(self.read_alternative(depth)?);
        }
    }

    fn read_alternative(&mut self, depth: usize) -> Result<Alternative, GrammarError> {
        let mut items = Vec::new();
        loop {
            if depth > 0 {
                self.skip_newlines();
            }
            match self.peek() {
                MetaKind::RuleName(_)
                | MetaKind::TermName(_)
                | MetaKind::Pattern(_)
                | MetaKind::LParen
                | MetaKind::LBracket => items.push(self.read_item(depth)?),
                _ => break,
            }
        }
        let alias = if *self.peek() == MetaKind::Arrow {
            self.bump();
            match self.bump() {
                MetaKind::RuleName(alias) => Some(alias),
                _ => return Err(self.error("expected an alias name after '->'")),
            }
        } else {
            None
        };
        Ok(Alternative { items, alias })
    }

    fn read_item(&mut self, depth: usize) -> Result<Item, GrammarError> {
        let atom = match self.bump() {
            MetaKind::RuleName(name) | MetaKind::TermName(name) => Item::Name(name),
            MetaKind::Pattern(pattern) => Item::Pattern(pattern),
            MetaKind::LParen => {
                let alternatives = self.read_alternatives(depth + 1)?;
                self.expect(&MetaKind::RParen, "')'")?;
                Item::Group(alternatives)
            }
            MetaKind::LBracket => {
                let alternatives = self.read_alternatives(depth + 1)?;
                self.expect(&MetaKind::RBracket, "']'")?;
                return Ok(Item::Maybe(alternatives));
            }
            _ => return Err(self.error("expected a grammar item")),
        };
        let repeat = match self.peek() {
            MetaKind::Question => Repeat::Optional,
            MetaKind::Star => Repeat::ZeroOrMore,
            MetaKind::Plus => Repeat::OneOrMore,
            _ => return Ok(atom),
        };
        self.bump();
        Ok(Item::Repeat(Box::new(atom), repeat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Item {
        Item::Name(n.into())
    }

    #[test]
    fn reads_rules_with_aliases_and_continuations() {
        let def = read_grammar(
            "?expr : expr PLUS term -> binop\n      | term\nterm: NUMBER\n",
        )
        .unwrap();
        assert_eq!(def.rules.len(), 2);
        let expr = &def.rules[0];
        assert_eq!(expr.name, "expr");
        assert!(expr.modifiers.inline_single);
        assert_eq!(expr.alternatives.len(), 2);
        assert_eq!(
            expr.alternatives[0].items,
            vec![name("expr"), name("PLUS"), name("term")]
        );
        assert_eq!(expr.alternatives[0].alias.as_deref(), Some("binop"));
        assert_eq!(expr.alternatives[1].alias, None);
    }

    #[test]
    fn reads_terminals_with_priority() {
        let def = read_grammar("NUMBER.2 : /\\d+/\nWS: /\\s+/\n%ignore WS").unwrap();
        assert_eq!(def.terminals[0].name, "NUMBER");
        assert_eq!(def.terminals[0].priority, 2);
        assert_eq!(def.terminals[0].patterns, vec![Pattern::regex("\\d+")]);
        assert_eq!(def.terminals[1].priority, 0);
        assert_eq!(def.ignore, vec![IgnoreItem::Name("WS".into())]);
    }

    #[test]
    fn unescapes_slashes_in_regexes() {
        let def = read_grammar("MUL: /[*\\/]/").unwrap();
        assert_eq!(def.terminals[0].patterns, vec![Pattern::regex("[*/]")]);
    }

    #[test]
    fn reads_literals_and_inline_regexes() {
        let def = read_grammar("atom: \"(\" expr \")\" | atom /\\^/ atom").unwrap();
        let alts = &def.rules[0].alternatives;
        assert_eq!(alts[0].items[0], Item::Pattern(Pattern::literal("(")));
        assert_eq!(alts[1].items[1], Item::Pattern(Pattern::regex("\\^")));
    }

    #[test]
    fn reads_case_insensitive_literal() {
        let def = read_grammar("kw: \"select\"i").unwrap();
        assert_eq!(
            def.rules[0].alternatives[0].items[0],
            Item::Pattern(Pattern::Literal {
                text: "select".into(),
                case_insensitive: true
            })
        );
    }

    #[test]
    fn reads_groups_and_repetition() {
        let def = read_grammar("args: [arg (\",\" arg)*]\n!op: (\"+\" | \"-\")+").unwrap();
        let Item::Maybe(inner) = &def.rules[0].alternatives[0].items[0] else {
            panic!("expected [..]");
        };
        assert_eq!(inner[0].items.len(), 2);
        assert!(matches!(inner[0].items[1], Item::Repeat(_, Repeat::ZeroOrMore)));
        assert!(def.rules[1].modifiers.keep_all_tokens);
        assert!(matches!(
            def.rules[1].alternatives[0].items[0],
            Item::Repeat(_, Repeat::OneOrMore)
        ));
    }

    #[test]
    fn newlines_inside_groups_are_insignificant() {
        let def = read_grammar("call: NAME \"(\" [\n  NAME\n  | NUMBER\n] \")\"").unwrap();
        assert_eq!(def.rules[0].alternatives[0].items.len(), 4);
    }

    #[test]
    fn empty_alternative_is_allowed() {
        let def = read_grammar("tail: \"else\" NAME | -> no_else").unwrap();
        let alts = &def.rules[0].alternatives;
        assert!(alts[1].items.is_empty());
        assert_eq!(alts[1].alias.as_deref(), Some("no_else"));
    }

    #[test]
    fn comments_are_skipped() {
        let def = read_grammar("// leading\nstart: A // trailing\nA: \"a\"").unwrap();
        assert_eq!(def.rules.len(), 1);
        assert_eq!(def.terminals.len(), 1);
    }

    #[test]
    fn declare_directive() {
        let def = read_grammar("%declare _INDENT _DEDENT").unwrap();
        assert_eq!(def.declared, vec!["_INDENT", "_DEDENT"]);
    }

    #[test]
    fn unsupported_directive() {
        assert_eq!(
            read_grammar("%import common.WS"),
            Err(GrammarError::UnsupportedDirective("import".into()))
        );
    }

    #[test]
    fn duplicate_rule() {
        assert_eq!(
            read_grammar("a: B\na: C"),
            Err(GrammarError::DuplicateRule("a".into()))
        );
    }

    #[test]
    fn missing_colon_reports_location() {
        let err = read_grammar("start A").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, column: 7, .. }));
    }

    #[test]
    fn unterminated_literal() {
        assert!(matches!(
            read_grammar("a: \"x"),
            Err(GrammarError::Syntax { .. })
        ));
    }
}
