// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for compiled lexers.
//!
//! 1. **Lexer never panics** on arbitrary input
//! 2. **Spans are ordered and within the input**
//! 3. **Token text reassembles the input** minus ignored whitespace
//! 4. **Positions agree with spans**

use proptest::prelude::*;

use super::{Lexer, LexerBuilder, Position, Transform};

fn lexer() -> Lexer {
    LexerBuilder::new()
        .token("INT", (r"\d+", Transform::int()))
        .token("NAME", r"[a-z_][a-z0-9_]*")
        .token("OP", r"[-+*/()]")
        .token("_WS", r"[ \t\n]+")
        .build()
        .unwrap()
}

fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..100_000).prop_map(|n| n.to_string()),
        "[a-z_][a-z0-9_]{0,6}",
        prop::sample::select(vec!["+", "-", "*", "/", "(", ")"]).prop_map(str::to_string),
    ]
}

fn separator() -> impl Strategy<Value = String> {
    prop::sample::select(vec![" ", "  ", "\n", "\t", " \n "]).prop_map(str::to_string)
}

fn valid_input() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec((fragment(), separator()), 1..20).prop_map(|parts| {
        parts
            .into_iter()
            .flat_map(|(frag, sep)| [frag, sep])
            .collect()
    })
}

proptest! {
    #[test]
    fn never_panics(input in "\\PC{0,64}") {
        let _ = lexer().tokenize(&input);
    }

    #[test]
    fn spans_are_ordered_and_in_bounds(parts in valid_input()) {
        let input: String = parts.concat();
        let tokens = lexer().tokenize(&input).unwrap();
        let mut last_end = 0;
        for token in &tokens {
            let span = token.span();
            prop_assert!(span.start() as usize >= last_end);
            prop_assert!(span.end() as usize <= input.len());
            last_end = span.end() as usize;
        }
    }

    #[test]
    fn token_text_reassembles_input(parts in valid_input()) {
        let input: String = parts.concat();
        let tokens = lexer().tokenize(&input).unwrap();
        let joined: String = tokens.iter().map(|t| t.text().to_string()).collect();
        let expected: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        prop_assert_eq!(joined, expected);
    }

    #[test]
    fn positions_agree_with_spans(parts in valid_input()) {
        let input: String = parts.concat();
        for token in lexer().tokenize(&input).unwrap() {
            let before = &input[..token.span().start() as usize];
            prop_assert_eq!(token.start(), Position::START.advance(before));
        }
    }
}
