//! Tokenizer for the query language.
//!
//! Span-based tokens; text is sliced from the query source when needed.
//! Whitespace and `;` line comments are skipped in the token rules.

use logos::Logos;
use std::ops::Range;

use crate::QueryError;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip(r";[^\n]*", allow_greedy = true))]
pub(crate) enum QueryToken {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    /// `_` alone; identifiers starting with `_` lex as `Ident`, which
    /// always wins on length.
    #[token("_", priority = 10)]
    Wildcard,

    /// `name:` — a field constraint on the following child pattern.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*:")]
    Field,

    /// `@name`, dotted names allowed (`@func.name`).
    #[regex(r"@[A-Za-z_][A-Za-z0-9_.]*")]
    Capture,

    /// `#eq?`, `#match?`, …
    #[regex(r"#[A-Za-z_][A-Za-z0-9_\-]*\??")]
    Predicate,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

/// Tokenize a query. Lexer errors surface as compile errors: an
/// unterminated string at a quote, anything else as an unexpected
/// character.
pub(crate) fn lex(source: &str) -> Result<Vec<(QueryToken, Range<usize>)>, QueryError> {
    let mut tokens = Vec::new();
    let mut lexer = QueryToken::lexer(source);
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let offender = source[span.start..].chars().next().unwrap_or('\0');
                if offender == '"' {
                    return Err(QueryError::UnterminatedString);
                }
                return Err(QueryError::UnexpectedCharacter(offender));
            }
        }
    }
    Ok(tokens)
}

/// Strip quotes and process escapes in a string literal's lexeme.
pub(crate) fn unescape_string(lexeme: &str) -> String {
    let inner = &lexeme[1..lexeme.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
