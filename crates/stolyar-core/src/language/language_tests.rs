use super::tables::{LexMode, LexState, LexTransition, ParseAction, ParseActionEntry};
use super::{Language, LanguageBuilder, LanguageData};
use crate::{SYMBOL_END, SYMBOL_ERROR};

/// Minimal hand-built grammar: `E -> x`.
fn tiny_language() -> Language {
    let mut b = LanguageBuilder::new("tiny");
    let x = b.terminal("x", true);
    let e = b.nonterminal("expression", true);
    b.states(3);

    let shift_x = b.action(ParseAction::Shift {
        state: 1,
        extra: false,
        repetition: false,
    });
    let goto_e = b.action(ParseAction::Shift {
        state: 2,
        extra: false,
        repetition: false,
    });
    let reduce_e = b.action(ParseAction::Reduce {
        symbol: e,
        child_count: 1,
        dynamic_precedence: 0,
        production_id: 0,
    });
    let accept = b.action(ParseAction::Accept);

    b.table(0, x, shift_x)
        .table(0, e, goto_e)
        .table(1, SYMBOL_END, reduce_e)
        .table(2, SYMBOL_END, accept);
    b.build()
}

#[test]
fn dense_lookup() {
    let lang = tiny_language();
    assert!(!lang.is_table_driven());
    assert_eq!(lang.initial_state(), 0);

    let actions = lang.actions(0, 1);
    assert_eq!(actions.len(), 1);
    assert!(matches!(actions[0], ParseAction::Shift { state: 1, .. }));

    // Unmapped cells yield the empty entry.
    assert!(lang.actions(2, 1).is_empty());
    assert_eq!(lang.raw_lookup(0, SYMBOL_ERROR), 0);
}

#[test]
fn goto_through_shift_entries() {
    let lang = tiny_language();
    // Hand-built grammars route gotos through the action table.
    assert_eq!(lang.goto_state(0, 2), Some(2));
    assert_eq!(lang.goto_state(1, 2), None);
    // Terminals never have gotos.
    assert_eq!(lang.goto_state(0, 1), None);
}

#[test]
fn symbol_names_and_metadata() {
    let lang = tiny_language();
    assert_eq!(lang.symbol_name(1), "x");
    assert_eq!(lang.symbol_name(2), "expression");
    assert_eq!(lang.symbol_name(SYMBOL_ERROR), "ERROR");
    assert!(lang.symbol_metadata(SYMBOL_ERROR).named);
    assert!(!lang.symbol_metadata(SYMBOL_END).visible);
    assert!(lang.is_nonterminal(2));
    assert!(!lang.is_nonterminal(1));
    assert!(!lang.is_nonterminal(SYMBOL_ERROR));
}

#[test]
fn lazy_name_indices() {
    let lang = tiny_language();
    assert_eq!(lang.symbol_for_name("expression", true), Some(2));
    assert_eq!(lang.symbol_for_name("expression", false), None);
    assert_eq!(lang.symbol_for_name("x", true), Some(1));
    assert_eq!(lang.symbol_for_name("nope", true), None);
    // "end" is invisible and not indexed.
    assert_eq!(lang.symbol_for_name("end", false), None);
}

#[test]
fn anonymous_symbols_index_separately() {
    let mut b = LanguageBuilder::new("mixed");
    let plus = b.terminal("+", false);
    let ident = b.terminal("identifier", true);
    b.states(1);
    let lang = b.build();

    assert_eq!(lang.symbol_for_name("+", false), Some(plus));
    assert_eq!(lang.symbol_for_name("+", true), None);
    assert_eq!(lang.symbol_for_name("identifier", true), Some(ident));
    assert!(!lang.symbol_metadata(plus).named);
}

#[test]
fn field_names_roundtrip() {
    let mut b = LanguageBuilder::new("fields");
    let _x = b.terminal("x", true);
    let decl = b.nonterminal("declaration", true);
    let name = b.field("name");
    b.states(1);
    b.production_fields(0, vec![(name, 0)]);
    let lang = b.build();

    let _ = decl;
    assert_eq!(lang.field_name(name), "name");
    assert_eq!(lang.field_id_for_name("name"), Some(name));
    assert_eq!(lang.field_id_for_name("body"), None);
    assert_eq!(lang.field_name(0), "");

    let map = lang.field_map(0);
    assert_eq!(map.len(), 1);
    assert_eq!(map[0].field_id, name);
    assert_eq!(map[0].child_index, 0);
    assert!(lang.field_map(7).is_empty());
}

#[test]
fn default_lex_mode() {
    let lang = tiny_language();
    assert_eq!(lang.lex_mode(0), LexMode::default());
    assert_eq!(lang.lex_mode(99), LexMode::default());
}

#[test]
fn lex_transition_ranges() {
    let state = LexState {
        accept: None,
        skip: false,
        transitions: vec![
            LexTransition {
                lo: 'a' as u32,
                hi: 'f' as u32,
                next: 1,
            },
            LexTransition {
                lo: 'h' as u32,
                hi: 'z' as u32,
                next: 2,
            },
        ],
        default_state: None,
        eof_state: None,
    };
    assert_eq!(state.transition_for('a'), Some(1));
    assert_eq!(state.transition_for('f'), Some(1));
    assert_eq!(state.transition_for('g'), None);
    assert_eq!(state.transition_for('m'), Some(2));
    assert_eq!(state.transition_for('A'), None);
}

/// Table-driven shape: 1 dense state plus 2 sparse states.
fn sparse_language() -> Language {
    // Sparse stream: two records.
    //   state 1 (offset 0): 2 groups:
    //     value 3 for symbols {1, 2}; value 4 for symbol {0}
    //   state 2 (offset 8): 1 group: value 5 for nonterminal {3}
    let data = LanguageData {
        name: "sparse".into(),
        symbol_count: 4,
        token_count: 3,
        external_token_count: 0,
        state_count: 3,
        large_state_count: 1,
        field_count: 0,
        production_id_count: 0,
        symbol_names: vec!["end".into(), "x".into(), "y".into(), "thing".into()],
        symbol_metadata: vec![
            crate::language::SymbolMetadata {
                visible: false,
                named: false,
                supertype: false,
            };
            4
        ],
        field_names: vec![],
        parse_table: vec![0, 1, 0, 2],
        small_parse_table: vec![
            2, // state 1: group count
            3, 2, 1, 2, // value 3 for symbols 1 and 2
            4, 1, 0, // value 4 for symbol 0
            1, // state 2: group count
            5, 1, 3, // value 5 for symbol 3 (goto state, raw)
        ],
        small_parse_table_map: vec![0, 8],
        parse_actions: vec![
            ParseActionEntry::default(),
            ParseActionEntry {
                reusable: true,
                actions: vec![ParseAction::Shift {
                    state: 1,
                    extra: false,
                    repetition: false,
                }],
            },
            ParseActionEntry::default(),
            ParseActionEntry {
                reusable: true,
                actions: vec![ParseAction::Accept],
            },
            ParseActionEntry {
                reusable: true,
                actions: vec![ParseAction::Accept],
            },
        ],
        lex_modes: vec![LexMode::default(); 3],
        lex_states: vec![LexState::default()],
        field_map_slices: vec![],
        field_map_entries: vec![],
        external_symbol_map: vec![],
        external_scanner_states: vec![],
        initial_state: None,
    };
    Language::from_data(data).expect("valid tables")
}

#[test]
fn sparse_lookup_walks_groups() {
    let lang = sparse_language();
    assert!(lang.is_table_driven());
    // Table-driven default initial state is 1.
    assert_eq!(lang.initial_state(), 1);

    assert_eq!(lang.raw_lookup(1, 1), 3);
    assert_eq!(lang.raw_lookup(1, 2), 3);
    assert_eq!(lang.raw_lookup(1, 0), 4);
    assert_eq!(lang.raw_lookup(2, 3), 5);
    // Symbol absent from every group.
    assert_eq!(lang.raw_lookup(2, 1), 0);
}

#[test]
fn table_driven_goto_is_raw() {
    let lang = sparse_language();
    // Nonterminal lookups in table-driven grammars are goto states, not
    // action indices.
    assert_eq!(lang.goto_state(2, 3), Some(5));
    assert_eq!(lang.goto_state(1, 3), None);
}
