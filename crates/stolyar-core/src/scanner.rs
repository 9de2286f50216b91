//! External scanner capability set.
//!
//! Languages with context-sensitive tokens (heredocs, indentation, raw
//! strings) supply a scanner object alongside their tables. The parser
//! consults it between DFA scans whenever the current lex mode admits an
//! external symbol. Scanners are stateful per-parse; the language carries a
//! factory so concurrent parses get independent instances.

/// The lexer view an external scanner drives during one scan attempt.
///
/// The scanner walks lookahead characters, marks how far the token extends,
/// and reports which external symbol it recognized. Nothing is consumed
/// from the real cursor unless the scan succeeds.
pub trait ScanContext {
    /// Current lookahead character, or `None` at end of input.
    fn lookahead(&self) -> Option<char>;

    /// Consume the lookahead. With `skip` set, the consumed character is
    /// excluded from the token (moves the token start while nothing has
    /// been marked yet).
    fn advance(&mut self, skip: bool);

    /// Mark the current position as the token end. The parser consumes
    /// exactly the marked range on success.
    fn mark_end(&mut self);

    /// Column of the current position, in Unicode scalars since the last
    /// newline.
    fn column(&self) -> u32;

    /// Report the recognized token as an index into the language's
    /// external-token map.
    fn set_result(&mut self, external_index: u16);
}

/// A language-supplied scanner for tokens the DFA cannot express.
///
/// `serialize`/`deserialize` move opaque scanner state across incremental
/// runs; state management is entirely the scanner's responsibility. The
/// core drives scanners on the parsing thread, but nothing here requires
/// that.
pub trait ExternalScanner: Send {
    /// Attempt to recognize one external token. `valid` is indexed by
    /// external-token index; only marked symbols are acceptable in the
    /// current parse state. Returns true when a token was recognized and
    /// reported via [`ScanContext::set_result`].
    fn scan(&mut self, ctx: &mut dyn ScanContext, valid: &[bool]) -> bool;

    /// Snapshot opaque state at the end of a parse.
    fn serialize(&mut self) -> Vec<u8> {
        Vec::new()
    }

    /// Restore state snapshotted by an earlier parse.
    fn deserialize(&mut self, _bytes: &[u8]) {}
}

/// Constructor for per-parse scanner instances.
pub type ScannerFactory = dyn Fn() -> Box<dyn ExternalScanner> + Send + Sync;
