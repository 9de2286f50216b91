//! Hand-built fixture language for the query tests.

use std::sync::Arc;

use stolyar_core::{Language, LanguageBuilder, LexState, LexTransition, ParseAction, Symbol};
use stolyar_engine::{Parser, Tree};

pub(crate) const FUNC: Symbol = 1;
pub(crate) const IDENTIFIER: Symbol = 2;
pub(crate) const FUNCTION_DECLARATION: Symbol = 7;

fn t(lo: char, hi: char, next: u16) -> LexTransition {
    LexTransition {
        lo: lo as u32,
        hi: hi as u32,
        next,
    }
}

/// `function_declaration = "func" identifier "(" ")" "{" "}"`, with the
/// identifier under a `name:` field.
pub(crate) fn fixture_language() -> Arc<Language> {
    let mut b = LanguageBuilder::new("funcs");
    let func = b.terminal("func", false);
    let identifier = b.terminal("identifier", true);
    let lparen = b.terminal("(", false);
    let rparen = b.terminal(")", false);
    let lbrace = b.terminal("{", false);
    let rbrace = b.terminal("}", false);
    let declaration = b.nonterminal("function_declaration", true);
    assert_eq!(
        (func, identifier, declaration),
        (FUNC, IDENTIFIER, FUNCTION_DECLARATION)
    );
    let name = b.field("name");
    b.states(8);
    b.production_fields(0, vec![(name, 1)]);

    let shift = |b: &mut LanguageBuilder, state| {
        b.action(ParseAction::Shift {
            state,
            extra: false,
            repetition: false,
        })
    };
    let shift_func = shift(&mut b, 1);
    let shift_identifier = shift(&mut b, 2);
    let shift_lparen = shift(&mut b, 3);
    let shift_rparen = shift(&mut b, 4);
    let shift_lbrace = shift(&mut b, 5);
    let shift_rbrace = shift(&mut b, 6);
    let goto_declaration = shift(&mut b, 7);
    let reduce_declaration = b.action(ParseAction::Reduce {
        symbol: declaration,
        child_count: 6,
        dynamic_precedence: 0,
        production_id: 0,
    });
    let accept = b.action(ParseAction::Accept);

    b.table(0, func, shift_func)
        .table(0, declaration, goto_declaration)
        .table(1, identifier, shift_identifier)
        .table(2, lparen, shift_lparen)
        .table(3, rparen, shift_rparen)
        .table(4, lbrace, shift_lbrace)
        .table(5, rbrace, shift_rbrace)
        .table(6, 0, reduce_declaration)
        .table(7, 0, accept);

    // DFA: 0 start, 1 identifier body, 2..=4 "f"/"fu"/"fun" prefixes,
    // 5..=8 punctuation, 9 whitespace, 10 the full "func" keyword.
    b.lex_state(LexState {
        accept: None,
        skip: false,
        transitions: vec![
            t(' ', ' ', 9),
            t('(', '(', 5),
            t(')', ')', 6),
            t('a', 'e', 1),
            t('f', 'f', 2),
            t('g', 'z', 1),
            t('{', '{', 7),
            t('}', '}', 8),
        ],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(identifier),
        skip: false,
        transitions: vec![t('a', 'z', 1)],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(identifier),
        skip: false,
        transitions: vec![t('a', 't', 1), t('u', 'u', 3), t('v', 'z', 1)],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(identifier),
        skip: false,
        transitions: vec![t('a', 'm', 1), t('n', 'n', 4), t('o', 'z', 1)],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(identifier),
        skip: false,
        transitions: vec![t('a', 'b', 1), t('c', 'c', 10), t('d', 'z', 1)],
        default_state: None,
        eof_state: None,
    });
    for symbol in [lparen, rparen, lbrace, rbrace] {
        b.lex_state(LexState {
            accept: Some(symbol),
            skip: false,
            transitions: vec![],
            default_state: None,
            eof_state: None,
        });
    }
    b.lex_state(LexState {
        accept: None,
        skip: true,
        transitions: vec![t(' ', ' ', 9)],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(func),
        skip: false,
        transitions: vec![t('a', 'z', 1)],
        default_state: None,
        eof_state: None,
    });
    Arc::new(b.build())
}

pub(crate) fn parse_fixture(source: &str) -> Tree {
    Parser::new(fixture_language()).parse(source)
}
