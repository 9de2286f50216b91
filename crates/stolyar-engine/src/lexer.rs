//! Table-driven maximal-munch lexer.
//!
//! Walks the language's DFA from the start state of the current lex mode,
//! tracking the last accepting position. On a dead end it rewinds to that
//! position and emits; skip states emit nothing and loop. Unrecognized
//! bytes are skipped one UTF-8 rune at a time, so the lexer always makes
//! forward progress: every token has positive width except the final EOF.

use std::sync::Arc;

use stolyar_core::{Language, LexMode, Point, Range, Symbol, Token};

use crate::scanner::ScanView;
use crate::tokens::TokenSource;

/// Forward-only position in source text, tracking row/column.
#[derive(Clone)]
pub(crate) struct Cursor<'s> {
    source: &'s str,
    byte: usize,
    row: u32,
    column: u32,
}

/// Saved cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CursorPos {
    pub byte: usize,
    pub row: u32,
    pub column: u32,
}

impl<'s> Cursor<'s> {
    pub(crate) fn new(source: &'s str) -> Self {
        Self {
            source,
            byte: 0,
            row: 0,
            column: 0,
        }
    }

    #[inline]
    pub(crate) fn pos(&self) -> CursorPos {
        CursorPos {
            byte: self.byte,
            row: self.row,
            column: self.column,
        }
    }

    #[inline]
    pub(crate) fn restore(&mut self, pos: CursorPos) {
        self.byte = pos.byte;
        self.row = pos.row;
        self.column = pos.column;
    }

    #[inline]
    pub(crate) fn point(&self) -> Point {
        Point::new(self.row, self.column)
    }

    #[inline]
    pub(crate) fn byte(&self) -> usize {
        self.byte
    }

    #[inline]
    pub(crate) fn column(&self) -> u32 {
        self.column
    }

    #[inline]
    pub(crate) fn at_end(&self) -> bool {
        self.byte >= self.source.len()
    }

    #[inline]
    pub(crate) fn peek(&self) -> Option<char> {
        self.source[self.byte..].chars().next()
    }

    /// Consume one character, updating row/column.
    pub(crate) fn advance(&mut self) {
        let Some(ch) = self.peek() else {
            return;
        };
        self.byte += ch.len_utf8();
        if ch == '\n' {
            self.row += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

fn point_of(pos: CursorPos) -> Point {
    Point::new(pos.row, pos.column)
}

/// The built-in [`TokenSource`]: DFA scan plus the external-scanner hook.
pub struct Lexer<'s> {
    source: &'s str,
    language: Arc<Language>,
    cursor: Cursor<'s>,
    mode: LexMode,
    scanner: Option<Box<dyn stolyar_core::ExternalScanner>>,
    all_external_valid: Vec<bool>,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str, language: Arc<Language>) -> Self {
        let scanner = language.new_scanner();
        let all_external_valid = vec![true; language.external_token_count() as usize];
        Self {
            source,
            language,
            cursor: Cursor::new(source),
            mode: LexMode::default(),
            scanner,
            all_external_valid,
        }
    }

    /// Restore external-scanner state snapshotted by an earlier parse.
    pub fn with_scanner_state(mut self, state: Option<&[u8]>) -> Self {
        if let (Some(scanner), Some(bytes)) = (self.scanner.as_mut(), state) {
            scanner.deserialize(bytes);
        }
        self
    }

    /// Snapshot external-scanner state at the end of a parse.
    pub(crate) fn serialize_scanner(&mut self) -> Option<Vec<u8>> {
        self.scanner.as_mut().map(|scanner| scanner.serialize())
    }

    fn eof_token(&self) -> Token<'s> {
        Token::eof(self.source.len() as u32, self.cursor.point())
    }

    /// One external-scanner attempt. The scanner works on a cursor copy;
    /// the real cursor moves only when it recognizes a token.
    fn scan_external(&mut self) -> Option<Token<'s>> {
        if self.mode.external_state == 0 {
            return None;
        }
        let scanner = self.scanner.as_mut()?;
        let valid = self
            .language
            .external_valid_symbols(self.mode.external_state)
            .unwrap_or(&self.all_external_valid);

        let mut view = ScanView::new(self.cursor.clone());
        if !scanner.scan(&mut view, valid) {
            return None;
        }
        let external_index = view.result()?;
        let (start, end) = view.token_bounds();
        if end.byte < start.byte {
            return None;
        }

        let symbol = self.language.external_symbol(external_index);
        self.cursor.restore(end);
        Some(Token::new(
            symbol,
            &self.source[start.byte..end.byte],
            Range::new(
                start.byte as u32,
                end.byte as u32,
                point_of(start),
                point_of(end),
            ),
        ))
    }

    /// Maximal-munch DFA scan from the current mode's start state.
    fn scan_dfa(&mut self) -> Token<'s> {
        if self.language.lex_state_count() == 0 {
            return self.eof_token();
        }

        loop {
            if self.cursor.at_end() && !self.has_eof_edge() {
                return self.eof_token();
            }

            let start = self.cursor.pos();
            let mut state = self.mode.main_state;
            let mut eof_taken = false;
            let mut last_accept: Option<(CursorPos, Symbol, bool)> = None;

            loop {
                let lex_state = self.language.lex_state(state);
                if let Some(symbol) = lex_state.accept {
                    last_accept = Some((self.cursor.pos(), symbol, lex_state.skip));
                }
                let Some(ch) = self.cursor.peek() else {
                    // One end-of-input edge, for tokens closed by EOF.
                    match lex_state.eof_state {
                        Some(next) if !eof_taken => {
                            eof_taken = true;
                            state = next;
                            continue;
                        }
                        _ => break,
                    }
                };
                let next = lex_state
                    .transition_for(ch)
                    .or(lex_state.default_state);
                let Some(next) = next else {
                    break;
                };
                self.cursor.advance();
                state = next;
            }

            match last_accept {
                None => {
                    if start.byte >= self.source.len() {
                        return self.eof_token();
                    }
                    // Unrecognized input: skip one rune and rescan.
                    self.cursor.restore(start);
                    self.cursor.advance();
                }
                Some((accept_pos, symbol, skip)) => {
                    self.cursor.restore(accept_pos);
                    if skip || accept_pos.byte == start.byte {
                        // Skip states emit nothing; a zero-width accept
                        // cannot satisfy the progress invariant either
                        // way, so force one rune of movement.
                        if accept_pos.byte == start.byte {
                            if self.cursor.at_end() {
                                return self.eof_token();
                            }
                            self.cursor.advance();
                        }
                        continue;
                    }
                    return Token::new(
                        symbol,
                        &self.source[start.byte..accept_pos.byte],
                        Range::new(
                            start.byte as u32,
                            accept_pos.byte as u32,
                            point_of(start),
                            point_of(accept_pos),
                        ),
                    );
                }
            }
        }
    }

    fn has_eof_edge(&self) -> bool {
        self.language
            .lex_state(self.mode.main_state)
            .eof_state
            .is_some()
    }
}

impl<'s> TokenSource<'s> for Lexer<'s> {
    fn next_token(&mut self) -> Token<'s> {
        if let Some(token) = self.scan_external() {
            return token;
        }
        self.scan_dfa()
    }

    fn set_mode(&mut self, mode: LexMode) {
        self.mode = mode;
    }

    fn skip_to_byte(&mut self, offset: u32) -> Token<'s> {
        while (self.cursor.byte() as u32) < offset && !self.cursor.at_end() {
            self.cursor.advance();
        }
        self.next_token()
    }
}
