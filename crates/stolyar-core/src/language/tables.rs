//! Parse-table and lexer-DFA record types.

use serde::{Deserialize, Serialize};

use crate::{ProductionId, StateId, Symbol};

/// Per-symbol grammar metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    /// Hidden symbols are spliced into their parent during node assembly.
    pub visible: bool,
    /// Named nodes are addressable by type name in queries; anonymous
    /// nodes display their lexeme.
    pub named: bool,
    /// Supertypes group related productions under a hidden alias.
    pub supertype: bool,
}

/// One parser decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseAction {
    Shift {
        state: StateId,
        /// Extra tokens (comments) attach without changing state.
        extra: bool,
        /// Repetition shifts merge with an existing top node of the same
        /// symbol.
        repetition: bool,
    },
    Reduce {
        symbol: Symbol,
        child_count: u16,
        dynamic_precedence: i32,
        production_id: ProductionId,
    },
    Accept,
    Recover {
        state: StateId,
    },
}

/// Ordered action list for one `(state, symbol)` entry. More than one
/// action forks the parse stack.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseActionEntry {
    /// Whether a subtree rooted at this lookahead may be grafted from an
    /// old tree during incremental parsing.
    pub reusable: bool,
    pub actions: Vec<ParseAction>,
}

/// One DFA character-class edge. Bounds are inclusive Unicode scalar
/// values; transitions within a state are sorted by `lo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexTransition {
    pub lo: u32,
    pub hi: u32,
    pub next: u16,
}

/// One DFA vertex.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LexState {
    /// Symbol accepted on stopping here; `None` for non-accepting states.
    pub accept: Option<Symbol>,
    /// Skip states match trivia that produces no token.
    pub skip: bool,
    pub transitions: Vec<LexTransition>,
    /// Taken when no explicit transition matches.
    pub default_state: Option<u16>,
    /// Taken once at end of input.
    pub eof_state: Option<u16>,
}

impl LexState {
    /// First transition whose range contains `ch`.
    pub fn transition_for(&self, ch: char) -> Option<u16> {
        let cp = ch as u32;
        for t in &self.transitions {
            if cp < t.lo {
                break;
            }
            if cp <= t.hi {
                return Some(t.next);
            }
        }
        None
    }
}

/// Lexing parameters for one parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LexMode {
    /// DFA start state.
    pub main_state: u16,
    /// External-scanner permission set; 0 admits no external symbols.
    pub external_state: u16,
}

/// Slice of `field_map_entries` owned by one production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldMapSlice {
    pub start: u16,
    pub length: u16,
}

/// Assignment of a field to one child of a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapEntry {
    pub field_id: crate::FieldId,
    pub child_index: u16,
    /// Inherited entries come from a hidden child's production.
    pub inherited: bool,
}
