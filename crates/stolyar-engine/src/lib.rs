#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Stolyar parsing engine: table-driven lexing, GLR parsing, and
//! incremental syntax trees.
//!
//! The engine consumes immutable [`stolyar_core::Language`] tables and
//! turns source text into [`Tree`]s. Parsing is total: error recovery
//! inserts synthetic error nodes instead of failing, and deterministic
//! caps bound runaway inputs. Incremental reparses graft clean subtrees
//! out of an edited old tree, sharing their arenas instead of copying.
//!
//! ```no_run
//! # fn language() -> std::sync::Arc<stolyar_core::Language> { unimplemented!() }
//! use stolyar_engine::Parser;
//!
//! let parser = Parser::new(language());
//! let mut tree = parser.parse("1+2+3");
//! # let edit = unimplemented!();
//! tree.edit(edit);
//! let tree2 = parser.parse_incremental("1+4+3", &tree);
//! ```

mod lexer;
mod parser;
mod scanner;
mod tokens;
mod trace;
mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use lexer::Lexer;
pub use parser::{Parser, ParserLimits};
pub use tokens::TokenSource;
pub use trace::{NoopTracer, ParseTracer};
pub use tree::{InputEdit, Node, Tree};
