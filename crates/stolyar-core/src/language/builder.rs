//! Programmatic construction of hand-built languages.
//!
//! Test grammars and custom-lexer bridges build their tables directly
//! instead of going through the extractor. Hand-built languages are fully
//! dense (`large_state_count == state_count`) and encode gotos as shift
//! actions.

use std::sync::OnceLock;

use crate::scanner::ScannerFactory;
use crate::{FieldId, ProductionId, StateId, Symbol};

use super::tables::{
    FieldMapEntry, FieldMapSlice, LexMode, LexState, ParseAction, ParseActionEntry, SymbolMetadata,
};
use super::Language;

/// Builder for hand-assembled [`Language`] tables.
///
/// Symbols are numbered in insertion order; all terminals must be added
/// before the first nonterminal. Symbol 0 (end of input) and the empty
/// action entry are pre-registered.
pub struct LanguageBuilder {
    name: String,
    symbol_names: Vec<String>,
    symbol_metadata: Vec<SymbolMetadata>,
    token_count: Option<u16>,
    field_names: Vec<String>,
    state_count: u16,
    initial_state: StateId,
    parse_actions: Vec<ParseActionEntry>,
    table_entries: Vec<(StateId, Symbol, u16)>,
    lex_states: Vec<LexState>,
    lex_modes: Vec<(StateId, LexMode)>,
    field_maps: Vec<(ProductionId, Vec<(FieldId, u16)>)>,
    external_symbol_map: Vec<Symbol>,
    external_scanner_states: Vec<Vec<bool>>,
    external_scanner: Option<Box<ScannerFactory>>,
}

impl LanguageBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            symbol_names: vec!["end".to_owned()],
            symbol_metadata: vec![SymbolMetadata {
                visible: false,
                named: false,
                supertype: false,
            }],
            token_count: None,
            field_names: vec![String::new()],
            state_count: 0,
            initial_state: 0,
            parse_actions: vec![ParseActionEntry::default()],
            table_entries: Vec::new(),
            lex_states: Vec::new(),
            lex_modes: Vec::new(),
            field_maps: Vec::new(),
            external_symbol_map: Vec::new(),
            external_scanner_states: Vec::new(),
            external_scanner: None,
        }
    }

    /// Register a terminal symbol, returning its ID.
    pub fn terminal(&mut self, name: &str, named: bool) -> Symbol {
        assert!(
            self.token_count.is_none(),
            "terminals must be added before nonterminals"
        );
        self.push_symbol(name, named)
    }

    /// Register a nonterminal symbol, returning its ID. Freezes the
    /// terminal range.
    pub fn nonterminal(&mut self, name: &str, named: bool) -> Symbol {
        if self.token_count.is_none() {
            self.token_count = Some(self.symbol_names.len() as u16);
        }
        self.push_symbol(name, named)
    }

    /// Register a hidden nonterminal; its children splice into the parent.
    pub fn hidden_nonterminal(&mut self, name: &str) -> Symbol {
        let symbol = self.nonterminal(name, true);
        self.symbol_metadata[symbol as usize].visible = false;
        symbol
    }

    fn push_symbol(&mut self, name: &str, named: bool) -> Symbol {
        let symbol = self.symbol_names.len() as Symbol;
        self.symbol_names.push(name.to_owned());
        self.symbol_metadata.push(SymbolMetadata {
            visible: true,
            named,
            supertype: false,
        });
        symbol
    }

    /// Register a named field, returning its ID (1-based; 0 is "no field").
    pub fn field(&mut self, name: &str) -> FieldId {
        let id = self.field_names.len() as FieldId;
        self.field_names.push(name.to_owned());
        id
    }

    /// Set the number of parser states.
    pub fn states(&mut self, count: u16) -> &mut Self {
        self.state_count = count;
        self
    }

    pub fn initial_state(&mut self, state: StateId) -> &mut Self {
        self.initial_state = state;
        self
    }

    /// Register an action entry, returning its table index.
    pub fn action_entry(&mut self, actions: Vec<ParseAction>) -> u16 {
        let idx = self.parse_actions.len() as u16;
        self.parse_actions.push(ParseActionEntry {
            reusable: true,
            actions,
        });
        idx
    }

    /// Convenience: a single-action entry.
    pub fn action(&mut self, action: ParseAction) -> u16 {
        self.action_entry(vec![action])
    }

    /// Point `(state, symbol)` at an action entry (or goto-as-shift entry).
    pub fn table(&mut self, state: StateId, symbol: Symbol, entry: u16) -> &mut Self {
        self.table_entries.push((state, symbol, entry));
        self
    }

    /// Append a DFA state, returning its index.
    pub fn lex_state(&mut self, state: LexState) -> u16 {
        let idx = self.lex_states.len() as u16;
        self.lex_states.push(state);
        idx
    }

    /// Override the lex mode for one parser state (default: DFA state 0,
    /// no external symbols).
    pub fn lex_mode(&mut self, state: StateId, mode: LexMode) -> &mut Self {
        self.lex_modes.push((state, mode));
        self
    }

    /// Assign fields to a production's children.
    pub fn production_fields(
        &mut self,
        production_id: ProductionId,
        fields: Vec<(FieldId, u16)>,
    ) -> &mut Self {
        self.field_maps.push((production_id, fields));
        self
    }

    /// Map an external-token index to a grammar symbol.
    pub fn external_token(&mut self, symbol: Symbol) -> u16 {
        let idx = self.external_symbol_map.len() as u16;
        self.external_symbol_map.push(symbol);
        idx
    }

    /// Valid-symbol sets per external lex state.
    pub fn external_scanner_states(&mut self, states: Vec<Vec<bool>>) -> &mut Self {
        self.external_scanner_states = states;
        self
    }

    pub fn external_scanner(
        &mut self,
        factory: impl Fn() -> Box<dyn crate::ExternalScanner> + Send + Sync + 'static,
    ) -> &mut Self {
        self.external_scanner = Some(Box::new(factory));
        self
    }

    /// Assemble the language. Panics on internally inconsistent tables;
    /// hand-built grammars are authored, not ingested.
    pub fn build(self) -> Language {
        let symbol_count = self.symbol_names.len() as u16;
        let token_count = self.token_count.unwrap_or(symbol_count);
        let state_count = self.state_count;
        assert!(state_count > 0, "language needs at least one parser state");

        let mut parse_table = vec![0u16; state_count as usize * symbol_count as usize];
        for (state, symbol, entry) in &self.table_entries {
            assert!(*state < state_count, "table entry for unknown state");
            assert!(*symbol < symbol_count, "table entry for unknown symbol");
            assert!(
                (*entry as usize) < self.parse_actions.len(),
                "table entry references unknown action"
            );
            parse_table[*state as usize * symbol_count as usize + *symbol as usize] = *entry;
        }

        let mut lex_modes = vec![LexMode::default(); state_count as usize];
        for (state, mode) in &self.lex_modes {
            lex_modes[*state as usize] = *mode;
        }

        let mut field_map_slices = Vec::new();
        let mut field_map_entries = Vec::new();
        for (production_id, fields) in &self.field_maps {
            let slot = *production_id as usize;
            if field_map_slices.len() <= slot {
                field_map_slices.resize(slot + 1, FieldMapSlice::default());
            }
            field_map_slices[slot] = FieldMapSlice {
                start: field_map_entries.len() as u16,
                length: fields.len() as u16,
            };
            for (field_id, child_index) in fields {
                field_map_entries.push(FieldMapEntry {
                    field_id: *field_id,
                    child_index: *child_index,
                    inherited: false,
                });
            }
        }

        let production_id_count = field_map_slices.len() as u16;
        let field_count = self.field_names.len() as u16 - 1;
        let external_token_count = self.external_symbol_map.len() as u16;

        Language {
            name: self.name,
            symbol_count,
            token_count,
            external_token_count,
            state_count,
            large_state_count: state_count,
            field_count,
            production_id_count,
            symbol_names: self.symbol_names,
            symbol_metadata: self.symbol_metadata,
            field_names: self.field_names,
            parse_table,
            small_parse_table: Vec::new(),
            small_parse_table_map: Vec::new(),
            parse_actions: self.parse_actions,
            lex_modes,
            lex_states: self.lex_states,
            field_map_slices,
            field_map_entries,
            external_symbol_map: self.external_symbol_map,
            external_scanner_states: self.external_scanner_states,
            external_scanner: self.external_scanner,
            initial_state: self.initial_state,
            indices: OnceLock::new(),
        }
    }
}
