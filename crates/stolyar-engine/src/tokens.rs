//! Pluggable token sources.
//!
//! The parser consumes tokens through this trait, so custom lexer bridges
//! for real-world grammars slot in without parser changes. Only
//! `next_token` is required; the mode hook matters to the built-in DFA
//! lexer and the skip hook is a fast-forward used by incremental reuse.

use stolyar_core::{LexMode, Token};

pub trait TokenSource<'s> {
    /// Produce the next token. Must eventually return EOF and never
    /// re-emit the same non-EOF token.
    fn next_token(&mut self) -> Token<'s>;

    /// Lexing parameters for the parser's current state. Sources that
    /// ignore lex modes keep the default no-op.
    fn set_mode(&mut self, _mode: LexMode) {}

    /// First token at or after `offset`. The default loops `next_token`,
    /// which any source supports; seekable sources override it.
    fn skip_to_byte(&mut self, offset: u32) -> Token<'s> {
        loop {
            let token = self.next_token();
            if token.is_eof() || token.range.start_byte >= offset {
                return token;
            }
        }
    }
}
