//! Hand-built grammars shared by the engine tests.

use std::sync::Arc;

use stolyar_core::{Language, LanguageBuilder, LexState, LexTransition, ParseAction, Symbol};

pub(crate) const NUMBER: Symbol = 1;
pub(crate) const PLUS: Symbol = 2;
pub(crate) const COMMENT: Symbol = 3;
pub(crate) const EXPRESSION: Symbol = 4;

fn t(lo: char, hi: char, next: u16) -> LexTransition {
    LexTransition {
        lo: lo as u32,
        hi: hi as u32,
        next,
    }
}

/// Left-associative arithmetic: `E -> E '+' number | number`, `#`-comments
/// as extras, whitespace skipped.
///
/// Fields on the three-child production: `left` = child 0, `right` =
/// child 2.
pub(crate) fn arithmetic_language() -> Arc<Language> {
    let mut b = LanguageBuilder::new("arithmetic");
    let number = b.terminal("number", true);
    let plus = b.terminal("+", false);
    let comment = b.terminal("comment", true);
    let expression = b.nonterminal("expression", true);
    assert_eq!(
        (number, plus, comment, expression),
        (NUMBER, PLUS, COMMENT, EXPRESSION)
    );
    let left = b.field("left");
    let right = b.field("right");
    b.states(5);
    b.production_fields(0, vec![(left, 0), (right, 2)]);

    let shift = |b: &mut LanguageBuilder, state| {
        b.action(ParseAction::Shift {
            state,
            extra: false,
            repetition: false,
        })
    };
    let shift_number_1 = shift(&mut b, 1);
    let goto_expression = shift(&mut b, 2);
    let shift_plus = shift(&mut b, 3);
    let shift_number_4 = shift(&mut b, 4);
    let shift_comment = b.action(ParseAction::Shift {
        state: 0,
        extra: true,
        repetition: false,
    });
    let reduce_unit = b.action(ParseAction::Reduce {
        symbol: expression,
        child_count: 1,
        dynamic_precedence: 0,
        production_id: 1,
    });
    let reduce_sum = b.action(ParseAction::Reduce {
        symbol: expression,
        child_count: 3,
        dynamic_precedence: 0,
        production_id: 0,
    });
    let accept = b.action(ParseAction::Accept);

    b.table(0, number, shift_number_1)
        .table(0, expression, goto_expression)
        .table(1, plus, reduce_unit)
        .table(1, 0, reduce_unit)
        .table(2, plus, shift_plus)
        .table(2, 0, accept)
        .table(3, number, shift_number_4)
        .table(4, plus, reduce_sum)
        .table(4, 0, reduce_sum);
    for state in 0..5 {
        b.table(state, comment, shift_comment);
    }

    // DFA: 0 = start, 1 = number, 2 = '+', 3 = whitespace skip,
    // 4 = comment body.
    b.lex_state(LexState {
        accept: None,
        skip: false,
        transitions: vec![
            t('\t', '\n', 3),
            t(' ', ' ', 3),
            t('#', '#', 4),
            t('+', '+', 2),
            t('0', '9', 1),
        ],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(number),
        skip: false,
        transitions: vec![t('0', '9', 1)],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(plus),
        skip: false,
        transitions: vec![],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: None,
        skip: true,
        transitions: vec![t('\t', '\n', 3), t(' ', ' ', 3)],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(comment),
        skip: false,
        transitions: vec![t('\u{0}', '\t', 4), t('\u{b}', '\u{10ffff}', 4)],
        default_state: None,
        eof_state: None,
    });

    Arc::new(b.build())
}

pub(crate) const KEYWORD_IF: Symbol = 1;
pub(crate) const IDENTIFIER: Symbol = 2;

/// Keyword-vs-identifier lexing: `if` is a keyword, `[a-z]+` an
/// identifier. Maximal munch must prefer `iffy` as one identifier.
pub(crate) fn keyword_language() -> Arc<Language> {
    let mut b = LanguageBuilder::new("keywords");
    let kw_if = b.terminal("if", false);
    let identifier = b.terminal("identifier", true);
    assert_eq!((kw_if, identifier), (KEYWORD_IF, IDENTIFIER));
    b.states(1);

    // 0 = start, 1 = "i", 2 = identifier body, 3 = "if", 4 = whitespace.
    b.lex_state(LexState {
        accept: None,
        skip: false,
        transitions: vec![
            t('\n', '\n', 4),
            t(' ', ' ', 4),
            t('a', 'h', 2),
            t('i', 'i', 1),
            t('j', 'z', 2),
        ],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(identifier),
        skip: false,
        transitions: vec![t('a', 'e', 2), t('f', 'f', 3), t('g', 'z', 2)],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(identifier),
        skip: false,
        transitions: vec![t('a', 'z', 2)],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(kw_if),
        skip: false,
        transitions: vec![t('a', 'z', 2)],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: None,
        skip: true,
        transitions: vec![t('\n', '\n', 4), t(' ', ' ', 4)],
        default_state: None,
        eof_state: None,
    });
    Arc::new(b.build())
}

/// Ambiguous single-token grammar: after shifting `x`, both `A -> x`
/// (precedence 0) and `B -> x` (precedence 5) fire.
pub(crate) fn precedence_language() -> Arc<Language> {
    let mut b = LanguageBuilder::new("ambiguous");
    let x = b.terminal("x", true);
    let a = b.nonterminal("A", true);
    let b_sym = b.nonterminal("B", true);
    b.states(4);

    let shift_x = b.action(ParseAction::Shift {
        state: 1,
        extra: false,
        repetition: false,
    });
    let goto_a = b.action(ParseAction::Shift {
        state: 2,
        extra: false,
        repetition: false,
    });
    let goto_b = b.action(ParseAction::Shift {
        state: 3,
        extra: false,
        repetition: false,
    });
    let reduce_both = b.action_entry(vec![
        ParseAction::Reduce {
            symbol: a,
            child_count: 1,
            dynamic_precedence: 0,
            production_id: 0,
        },
        ParseAction::Reduce {
            symbol: b_sym,
            child_count: 1,
            dynamic_precedence: 5,
            production_id: 1,
        },
    ]);
    let accept = b.action(ParseAction::Accept);

    b.table(0, x, shift_x)
        .table(0, a, goto_a)
        .table(0, b_sym, goto_b)
        .table(1, 0, reduce_both)
        .table(2, 0, accept)
        .table(3, 0, accept);

    b.lex_state(LexState {
        accept: None,
        skip: false,
        transitions: vec![t('x', 'x', 1)],
        default_state: None,
        eof_state: None,
    });
    b.lex_state(LexState {
        accept: Some(x),
        skip: false,
        transitions: vec![],
        default_state: None,
        eof_state: None,
    });
    Arc::new(b.build())
}
