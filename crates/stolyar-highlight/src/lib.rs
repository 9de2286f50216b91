#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Syntax highlighting: parse → query → overlap-resolved ranges.
//!
//! A [`Highlighter`] bundles a parser and a compiled highlight query. Each
//! call parses the source (incrementally when an old tree is supplied),
//! turns every capture into a byte range named after its capture, and
//! sweeps the ranges into sorted, non-overlapping segments where the
//! innermost capture wins.

mod resolve;

#[cfg(test)]
mod resolve_tests;

use std::sync::Arc;

use stolyar_core::Language;
use stolyar_engine::{Parser, TokenSource, Tree};
use stolyar_query::{Query, QueryError};

pub use resolve::resolve_overlaps;

/// Highlight compilation failure (the query did not compile).
#[derive(Debug, Clone, thiserror::Error)]
pub enum HighlightError {
    #[error("highlight query: {0}")]
    Query(#[from] QueryError),
}

/// One highlighted span. `name` is the capture name that owns the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRange {
    pub start: u32,
    pub end: u32,
    pub name: String,
}

impl HighlightRange {
    pub fn new(start: u32, end: u32, name: impl Into<String>) -> Self {
        Self {
            start,
            end,
            name: name.into(),
        }
    }

    #[inline]
    pub(crate) fn width(&self) -> u32 {
        self.end - self.start
    }
}

/// Factory for custom lexer bridges; handed the source each parse.
pub type TokenSourceFactory =
    dyn for<'s> Fn(&'s str) -> Box<dyn TokenSource<'s> + 's> + Send + Sync;

pub struct Highlighter {
    parser: Parser,
    query: Query,
    token_source_factory: Option<Box<TokenSourceFactory>>,
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("parser", &self.parser)
            .field("query", &self.query)
            .field(
                "token_source_factory",
                &self.token_source_factory.is_some(),
            )
            .finish()
    }
}

impl Highlighter {
    /// Compile a highlight query and set up a parser for `language`.
    pub fn new(language: Arc<Language>, query_source: &str) -> Result<Self, HighlightError> {
        let query = Query::new(query_source, &language)?;
        Ok(Self {
            parser: Parser::new(language),
            query,
            token_source_factory: None,
        })
    }

    /// Use a custom token source instead of the built-in DFA lexer.
    pub fn with_token_source_factory(
        mut self,
        factory: impl for<'s> Fn(&'s str) -> Box<dyn TokenSource<'s> + 's> + Send + Sync + 'static,
    ) -> Self {
        self.token_source_factory = Some(Box::new(factory));
        self
    }

    /// Highlight from scratch.
    pub fn highlight(&self, source: &str) -> Vec<HighlightRange> {
        let tree = self.parse(source, None);
        self.ranges_for(&tree)
    }

    /// Highlight after edits, reusing the old tree; returns the new tree
    /// for the next round.
    pub fn highlight_incremental(
        &self,
        source: &str,
        old_tree: &Tree,
    ) -> (Vec<HighlightRange>, Tree) {
        let tree = self.parse(source, Some(old_tree));
        let ranges = self.ranges_for(&tree);
        (ranges, tree)
    }

    fn parse(&self, source: &str, old_tree: Option<&Tree>) -> Tree {
        match (&self.token_source_factory, old_tree) {
            (Some(factory), Some(old)) => {
                let mut tokens = factory(source);
                self.parser
                    .parse_incremental_with(source, old, tokens.as_mut())
            }
            (Some(factory), None) => {
                let mut tokens = factory(source);
                self.parser.parse_with(source, tokens.as_mut())
            }
            (None, Some(old)) => self.parser.parse_incremental(source, old),
            (None, None) => self.parser.parse(source),
        }
    }

    fn ranges_for(&self, tree: &Tree) -> Vec<HighlightRange> {
        let mut ranges = Vec::new();
        for m in self.query.execute(tree) {
            for capture in &m.captures {
                let range = capture.node.range();
                ranges.push(HighlightRange {
                    start: range.start_byte,
                    end: range.end_byte,
                    name: self.query.capture_name(capture.index).to_string(),
                });
            }
        }
        resolve_overlaps(ranges)
    }
}
