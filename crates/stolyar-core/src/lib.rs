#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for the Stolyar parsing runtime.
//!
//! Two layers:
//! - **Primitives**: symbol/state/field IDs, points, tokens, ranges
//! - **Language tables**: immutable grammar data consumed from an external
//!   extractor (parse tables, DFA states, field maps, scanner hooks)
//!
//! The runtime crates (`stolyar-engine`, `stolyar-query`) never mutate a
//! [`Language`] after construction; the lazy name indices are built once
//! under a one-shot guard and read without synchronization afterwards.

pub mod language;
mod point;
mod scanner;
mod token;


pub use language::{
    FieldMapEntry, FieldMapSlice, Language, LanguageBuilder, LanguageData, LanguageError, LexMode,
    LexState, LexTransition, ParseAction, ParseActionEntry, SymbolMetadata,
};
pub use point::{Point, Range};
pub use scanner::{ExternalScanner, ScanContext, ScannerFactory};
pub use token::Token;

/// Grammar symbol ID (terminals first, then nonterminals).
pub type Symbol = u16;

/// End-of-input sentinel symbol.
pub const SYMBOL_END: Symbol = 0;

/// Synthetic error symbol, outside every grammar's symbol range.
pub const SYMBOL_ERROR: Symbol = u16::MAX;

/// Parser state ID.
pub type StateId = u16;

/// State reserved for error recovery in table-driven grammars.
pub const STATE_ERROR: StateId = 0;

/// Named-field ID; 0 means "no field".
pub type FieldId = u16;

/// The "no field" sentinel.
pub const FIELD_NONE: FieldId = 0;

/// Identifier of one right-hand-side choice for a nonterminal.
/// Keys field-map lookups during node assembly.
pub type ProductionId = u16;
