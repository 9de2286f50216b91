//! JSON ingestion for extractor-produced language tables.
//!
//! The extractor dumps one self-describing JSON document per language. The
//! document is a 1:1 mirror of the in-memory tables; ingestion validates
//! cross-references so the runtime can index without bounds anxiety.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::{StateId, Symbol};

use super::tables::{
    FieldMapEntry, FieldMapSlice, LexMode, LexState, ParseActionEntry, SymbolMetadata,
};
use super::Language;

/// Error during language-table ingestion.
#[derive(Debug)]
pub enum LanguageError {
    Json(serde_json::Error),
    Binary(postcard::Error),
    Malformed(String),
}

impl std::fmt::Display for LanguageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Binary(e) => write!(f, "binary decode error: {e}"),
            Self::Malformed(msg) => write!(f, "malformed language tables: {msg}"),
        }
    }
}

impl std::error::Error for LanguageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Binary(e) => Some(e),
            Self::Malformed(_) => None,
        }
    }
}

/// Serializable mirror of a [`Language`]'s tables.
///
/// The external-scanner hook is process-local and attaches after ingestion
/// via [`Language::with_scanner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageData {
    pub name: String,
    pub symbol_count: u16,
    pub token_count: u16,
    #[serde(default)]
    pub external_token_count: u16,
    pub state_count: u16,
    pub large_state_count: u16,
    #[serde(default)]
    pub field_count: u16,
    #[serde(default)]
    pub production_id_count: u16,
    pub symbol_names: Vec<String>,
    pub symbol_metadata: Vec<SymbolMetadata>,
    #[serde(default)]
    pub field_names: Vec<String>,
    pub parse_table: Vec<u16>,
    #[serde(default)]
    pub small_parse_table: Vec<u16>,
    #[serde(default)]
    pub small_parse_table_map: Vec<u32>,
    pub parse_actions: Vec<ParseActionEntry>,
    pub lex_modes: Vec<LexMode>,
    pub lex_states: Vec<LexState>,
    #[serde(default)]
    pub field_map_slices: Vec<FieldMapSlice>,
    #[serde(default)]
    pub field_map_entries: Vec<FieldMapEntry>,
    #[serde(default)]
    pub external_symbol_map: Vec<Symbol>,
    #[serde(default)]
    pub external_scanner_states: Vec<Vec<bool>>,
    /// Defaults to 1 for table-driven grammars (state 0 is the error row).
    #[serde(default)]
    pub initial_state: Option<StateId>,
}

impl Language {
    /// Ingest extractor output from JSON.
    pub fn from_json(json: &str) -> Result<Self, LanguageError> {
        let data: LanguageData = serde_json::from_str(json).map_err(LanguageError::Json)?;
        Self::from_data(data)
    }

    /// Ingest extractor output from the compact binary format.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, LanguageError> {
        Self::from_data(LanguageData::from_binary(bytes)?)
    }

    /// Validate and freeze a table mirror into a [`Language`].
    pub fn from_data(data: LanguageData) -> Result<Self, LanguageError> {
        validate(&data)?;
        let initial_state = data.initial_state.unwrap_or({
            if data.state_count > data.large_state_count {
                1
            } else {
                0
            }
        });
        Ok(Language {
            name: data.name,
            symbol_count: data.symbol_count,
            token_count: data.token_count,
            external_token_count: data.external_token_count,
            state_count: data.state_count,
            large_state_count: data.large_state_count,
            field_count: data.field_count,
            production_id_count: data.production_id_count,
            symbol_names: data.symbol_names,
            symbol_metadata: data.symbol_metadata,
            field_names: data.field_names,
            parse_table: data.parse_table,
            small_parse_table: data.small_parse_table,
            small_parse_table_map: data.small_parse_table_map,
            parse_actions: data.parse_actions,
            lex_modes: data.lex_modes,
            lex_states: data.lex_states,
            field_map_slices: data.field_map_slices,
            field_map_entries: data.field_map_entries,
            external_symbol_map: data.external_symbol_map,
            external_scanner_states: data.external_scanner_states,
            external_scanner: None,
            initial_state,
            indices: OnceLock::new(),
        })
    }

    /// Attach an external scanner factory to an ingested language.
    pub fn with_scanner(
        mut self,
        factory: impl Fn() -> Box<dyn crate::ExternalScanner> + Send + Sync + 'static,
    ) -> Self {
        self.external_scanner = Some(Box::new(factory));
        self
    }
}

fn malformed(msg: impl Into<String>) -> LanguageError {
    LanguageError::Malformed(msg.into())
}

fn validate(data: &LanguageData) -> Result<(), LanguageError> {
    let symbol_count = data.symbol_count as usize;
    if data.symbol_names.len() != symbol_count {
        return Err(malformed(format!(
            "symbol_names has {} entries, expected {symbol_count}",
            data.symbol_names.len()
        )));
    }
    if data.symbol_metadata.len() != symbol_count {
        return Err(malformed(format!(
            "symbol_metadata has {} entries, expected {symbol_count}",
            data.symbol_metadata.len()
        )));
    }
    if data.token_count > data.symbol_count {
        return Err(malformed("token_count exceeds symbol_count"));
    }
    if !data.field_names.is_empty() {
        if !data.field_names[0].is_empty() {
            return Err(malformed("field_names[0] must be the empty string"));
        }
        if data.field_names.len() != data.field_count as usize + 1 {
            return Err(malformed(format!(
                "field_names has {} entries, expected field_count + 1 = {}",
                data.field_names.len(),
                data.field_count + 1
            )));
        }
    }
    if data.large_state_count > data.state_count {
        return Err(malformed("large_state_count exceeds state_count"));
    }
    let dense_len = data.large_state_count as usize * symbol_count;
    if data.parse_table.len() != dense_len {
        return Err(malformed(format!(
            "parse_table has {} entries, expected {dense_len}",
            data.parse_table.len()
        )));
    }
    let sparse_states = (data.state_count - data.large_state_count) as usize;
    if data.small_parse_table_map.len() != sparse_states {
        return Err(malformed(format!(
            "small_parse_table_map has {} entries, expected {sparse_states}",
            data.small_parse_table_map.len()
        )));
    }
    for &offset in &data.small_parse_table_map {
        if offset as usize >= data.small_parse_table.len() {
            return Err(malformed("small_parse_table_map offset out of range"));
        }
    }
    match data.parse_actions.first() {
        None => return Err(malformed("parse_actions must not be empty")),
        Some(entry) if !entry.actions.is_empty() => {
            return Err(malformed("parse_actions[0] must be the empty entry"));
        }
        Some(_) => {}
    }
    let lex_state_count = data.lex_states.len();
    for (i, state) in data.lex_states.iter().enumerate() {
        for t in &state.transitions {
            if t.next as usize >= lex_state_count {
                return Err(malformed(format!(
                    "lex state {i} transition targets unknown state {}",
                    t.next
                )));
            }
        }
        for target in [state.default_state, state.eof_state].into_iter().flatten() {
            if target as usize >= lex_state_count {
                return Err(malformed(format!(
                    "lex state {i} fallback targets unknown state {target}"
                )));
            }
        }
    }
    for mode in &data.lex_modes {
        if mode.main_state as usize >= lex_state_count && lex_state_count > 0 {
            return Err(malformed("lex mode references unknown DFA state"));
        }
    }
    for slice in &data.field_map_slices {
        let end = slice.start as usize + slice.length as usize;
        if end > data.field_map_entries.len() {
            return Err(malformed("field map slice out of range"));
        }
    }
    for entry in &data.field_map_entries {
        if entry.field_id > data.field_count {
            return Err(malformed("field map entry references unknown field"));
        }
    }
    for &symbol in &data.external_symbol_map {
        if symbol >= data.symbol_count {
            return Err(malformed("external symbol map references unknown symbol"));
        }
    }
    Ok(())
}
