//! Immutable grammar data for one language.
//!
//! A [`Language`] bundles symbol metadata, the dense and compressed-sparse
//! parse tables, the lexer DFA, field maps, and the external-scanner hook.
//! Tables arrive from an out-of-tree extractor, either as JSON or as the
//! compact binary format.

mod binary;
mod builder;
mod json;
mod tables;

#[cfg(test)]
mod language_tests;

use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::scanner::ScannerFactory;
use crate::{FieldId, SYMBOL_END, SYMBOL_ERROR, StateId, Symbol};

pub use builder::LanguageBuilder;
pub use json::{LanguageData, LanguageError};
pub use tables::{
    FieldMapEntry, FieldMapSlice, LexMode, LexState, LexTransition, ParseAction, ParseActionEntry,
    SymbolMetadata,
};

/// Name of the synthetic error symbol.
const ERROR_NAME: &str = "ERROR";

static ERROR_METADATA: SymbolMetadata = SymbolMetadata {
    visible: true,
    named: true,
    supertype: false,
};

/// Lazily-built name→ID indices, populated on first query compile.
#[derive(Default)]
struct NameIndices {
    named_symbols: IndexMap<String, Symbol>,
    anonymous_symbols: IndexMap<String, Symbol>,
    fields: IndexMap<String, FieldId>,
}

/// Immutable grammar tables for one language.
///
/// Construction goes through [`LanguageBuilder`] (hand-built grammars,
/// mostly tests) or [`Language::from_json`]/[`Language::from_binary`]
/// (extractor output). All lookups take `&self`; the only interior state is
/// the one-shot name index.
pub struct Language {
    pub(crate) name: String,

    pub(crate) symbol_count: u16,
    pub(crate) token_count: u16,
    pub(crate) external_token_count: u16,
    pub(crate) state_count: u16,
    pub(crate) large_state_count: u16,
    pub(crate) field_count: u16,
    pub(crate) production_id_count: u16,

    pub(crate) symbol_names: Vec<String>,
    pub(crate) symbol_metadata: Vec<SymbolMetadata>,
    pub(crate) field_names: Vec<String>,

    /// Dense rows: `[large_state_count][symbol_count]` action indices
    /// (goto states for nonterminals in table-driven grammars).
    pub(crate) parse_table: Vec<u16>,
    /// Compressed-sparse stream for states at or above `large_state_count`.
    pub(crate) small_parse_table: Vec<u16>,
    /// Offsets into the sparse stream, indexed by `state - large_state_count`.
    pub(crate) small_parse_table_map: Vec<u32>,
    pub(crate) parse_actions: Vec<ParseActionEntry>,

    pub(crate) lex_modes: Vec<LexMode>,
    pub(crate) lex_states: Vec<LexState>,

    pub(crate) field_map_slices: Vec<FieldMapSlice>,
    pub(crate) field_map_entries: Vec<FieldMapEntry>,

    pub(crate) external_symbol_map: Vec<Symbol>,
    /// Valid-symbol sets per external lex state; empty means "all valid".
    pub(crate) external_scanner_states: Vec<Vec<bool>>,
    pub(crate) external_scanner: Option<Box<ScannerFactory>>,

    pub(crate) initial_state: StateId,

    indices: OnceLock<NameIndices>,
}

impl std::fmt::Debug for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name)
            .field("symbol_count", &self.symbol_count)
            .field("token_count", &self.token_count)
            .field("state_count", &self.state_count)
            .field("large_state_count", &self.large_state_count)
            .field("field_count", &self.field_count)
            .finish_non_exhaustive()
    }
}

impl Language {
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn symbol_count(&self) -> u16 {
        self.symbol_count
    }

    #[inline]
    pub fn token_count(&self) -> u16 {
        self.token_count
    }

    #[inline]
    pub fn external_token_count(&self) -> u16 {
        self.external_token_count
    }

    #[inline]
    pub fn state_count(&self) -> u16 {
        self.state_count
    }

    #[inline]
    pub fn field_count(&self) -> u16 {
        self.field_count
    }

    /// The state a fresh parse starts in. Table-driven grammars reserve
    /// state 0 for error recovery and start at 1; hand-built grammars may
    /// start anywhere.
    #[inline]
    pub fn initial_state(&self) -> StateId {
        self.initial_state
    }

    /// Whether the tables came from the extractor. Table-driven grammars
    /// store goto targets raw in the parse table; hand-built grammars
    /// encode gotos as shift actions.
    #[inline]
    pub fn is_table_driven(&self) -> bool {
        self.state_count > self.large_state_count
    }

    #[inline]
    pub fn is_nonterminal(&self, symbol: Symbol) -> bool {
        symbol != SYMBOL_ERROR && symbol >= self.token_count && symbol < self.symbol_count
    }

    /// Display name of a symbol. The synthetic error symbol has a fixed
    /// name outside the tables.
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        if symbol == SYMBOL_ERROR {
            return ERROR_NAME;
        }
        self.symbol_names
            .get(symbol as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn symbol_metadata(&self, symbol: Symbol) -> &SymbolMetadata {
        if symbol == SYMBOL_ERROR {
            return &ERROR_METADATA;
        }
        &self.symbol_metadata[symbol as usize]
    }

    pub fn field_name(&self, field: FieldId) -> &str {
        self.field_names
            .get(field as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Raw table value for `(state, symbol)`: an action index for
    /// terminals, a goto state for nonterminals in table-driven grammars.
    /// 0 means "no action".
    pub fn raw_lookup(&self, state: StateId, symbol: Symbol) -> u16 {
        if symbol >= self.symbol_count {
            return 0;
        }
        if state < self.large_state_count {
            let row = state as usize * self.symbol_count as usize;
            return self.parse_table[row + symbol as usize];
        }
        self.sparse_lookup(state, symbol)
    }

    /// Walk one compressed-sparse record. Layout per record:
    /// `[group_count, {section_value, symbol_count, symbol…}*]`.
    fn sparse_lookup(&self, state: StateId, symbol: Symbol) -> u16 {
        let slot = (state - self.large_state_count) as usize;
        let Some(&offset) = self.small_parse_table_map.get(slot) else {
            return 0;
        };
        let mut pos = offset as usize;
        let group_count = self.small_parse_table[pos];
        pos += 1;
        for _ in 0..group_count {
            let section_value = self.small_parse_table[pos];
            let symbol_count = self.small_parse_table[pos + 1] as usize;
            pos += 2;
            let symbols = &self.small_parse_table[pos..pos + symbol_count];
            if symbols.contains(&symbol) {
                return section_value;
            }
            pos += symbol_count;
        }
        0
    }

    /// Parse actions for `(state, terminal)`. Empty slice when the table
    /// has no entry.
    pub fn actions(&self, state: StateId, symbol: Symbol) -> &[ParseAction] {
        let idx = self.raw_lookup(state, symbol);
        match self.parse_actions.get(idx as usize) {
            Some(entry) => &entry.actions,
            None => &[],
        }
    }

    pub fn action_entry(&self, state: StateId, symbol: Symbol) -> Option<&ParseActionEntry> {
        let idx = self.raw_lookup(state, symbol);
        if idx == 0 {
            return None;
        }
        self.parse_actions.get(idx as usize)
    }

    /// Goto target after reducing `symbol` with `state` on top.
    ///
    /// Table-driven grammars store the target state raw; hand-built
    /// grammars route gotos through shift actions.
    pub fn goto_state(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        if !self.is_nonterminal(symbol) {
            return None;
        }
        let raw = self.raw_lookup(state, symbol);
        if raw == 0 {
            return None;
        }
        if self.is_table_driven() {
            return Some(raw);
        }
        self.parse_actions
            .get(raw as usize)?
            .actions
            .iter()
            .find_map(|action| match action {
                ParseAction::Shift { state, .. } => Some(*state),
                _ => None,
            })
    }

    /// Lex mode for a parser state. States without an entry lex from DFA
    /// state 0 with no external symbols.
    pub fn lex_mode(&self, state: StateId) -> LexMode {
        self.lex_modes
            .get(state as usize)
            .copied()
            .unwrap_or_default()
    }

    #[inline]
    pub fn lex_state(&self, index: u16) -> &LexState {
        &self.lex_states[index as usize]
    }

    #[inline]
    pub fn lex_state_count(&self) -> usize {
        self.lex_states.len()
    }

    /// Field assignments for one production, in child-index order.
    pub fn field_map(&self, production_id: crate::ProductionId) -> &[FieldMapEntry] {
        let Some(slice) = self.field_map_slices.get(production_id as usize) else {
            return &[];
        };
        let start = slice.start as usize;
        let end = start + slice.length as usize;
        &self.field_map_entries[start..end]
    }

    /// Grammar symbol for an external-token index.
    pub fn external_symbol(&self, external_index: u16) -> Symbol {
        self.external_symbol_map
            .get(external_index as usize)
            .copied()
            .unwrap_or(SYMBOL_END)
    }

    /// Valid external symbols in an external lex state. `None` when the
    /// language ships no per-state sets (every external symbol valid).
    pub fn external_valid_symbols(&self, external_state: u16) -> Option<&[bool]> {
        self.external_scanner_states
            .get(external_state as usize)
            .map(Vec::as_slice)
    }

    pub fn has_external_scanner(&self) -> bool {
        self.external_scanner.is_some()
    }

    /// Fresh scanner instance for one parse.
    pub fn new_scanner(&self) -> Option<Box<dyn crate::ExternalScanner>> {
        self.external_scanner.as_ref().map(|factory| factory())
    }

    fn indices(&self) -> &NameIndices {
        self.indices.get_or_init(|| {
            let mut indices = NameIndices::default();
            for (i, name) in self.symbol_names.iter().enumerate() {
                let symbol = i as Symbol;
                let meta = &self.symbol_metadata[i];
                if !meta.visible {
                    continue;
                }
                let bucket = if meta.named {
                    &mut indices.named_symbols
                } else {
                    &mut indices.anonymous_symbols
                };
                // First definition wins; aliases may repeat names.
                bucket.entry(name.clone()).or_insert(symbol);
            }
            for (i, name) in self.field_names.iter().enumerate().skip(1) {
                indices.fields.entry(name.clone()).or_insert(i as FieldId);
            }
            indices
        })
    }

    /// Resolve a display name to a symbol, split by named-ness.
    pub fn symbol_for_name(&self, name: &str, named: bool) -> Option<Symbol> {
        let indices = self.indices();
        let bucket = if named {
            &indices.named_symbols
        } else {
            &indices.anonymous_symbols
        };
        bucket.get(name).copied()
    }

    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        self.indices().fields.get(name).copied()
    }
}
