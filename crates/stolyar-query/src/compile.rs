//! Query compiler: token stream → resolved patterns → dispatch index.
//!
//! Resolution happens against the language's lazy name indices; any
//! unknown name, malformed predicate, or bad regex fails the whole
//! compilation. Predicates are parsed with raw capture names and resolved
//! once their pattern is complete, so a capture may appear after the
//! predicate that references it.

use std::collections::HashMap;
use std::ops::Range;

use regex_automata::dfa::dense;

use stolyar_core::{FieldId, Language, Symbol};

use crate::lexer::{QueryToken, lex, unescape_string};
use crate::pattern::{AltBranch, EqOperand, Pattern, Predicate, Step, StepKind};
use crate::{Query, QueryError};

impl Query {
    /// Compile a query against a language.
    pub fn new(source: &str, language: &Language) -> Result<Query, QueryError> {
        let tokens = lex(source)?;
        let mut compiler = Compiler {
            source,
            language,
            tokens,
            pos: 0,
            capture_names: Vec::new(),
        };
        compiler.compile()
    }
}

enum RawArg {
    Capture(String),
    Literal(String),
}

struct RawPredicate {
    name: String,
    args: Vec<RawArg>,
}

struct Compiler<'q, 'l> {
    source: &'q str,
    language: &'l Language,
    tokens: Vec<(QueryToken, Range<usize>)>,
    pos: usize,
    capture_names: Vec<String>,
}

impl<'q> Compiler<'q, '_> {
    fn compile(&mut self) -> Result<Query, QueryError> {
        let mut parsed: Vec<(Vec<Step>, Vec<RawPredicate>)> = Vec::new();

        while let Some(token) = self.peek() {
            match token {
                QueryToken::LParen if self.peek_nth(1) == Some(QueryToken::Predicate) => {
                    // Top-level predicate: attaches to the previous
                    // top-level pattern.
                    self.pos += 1;
                    let predicate = self.parse_predicate()?;
                    match parsed.last_mut() {
                        Some((_, predicates)) => predicates.push(predicate),
                        None => return Err(QueryError::MisplacedPredicate),
                    }
                }
                QueryToken::LParen
                | QueryToken::LBracket
                | QueryToken::Str
                | QueryToken::Wildcard => {
                    let mut steps = Vec::new();
                    let mut predicates = Vec::new();
                    self.parse_element(&mut steps, &mut predicates, 0, None)?;
                    parsed.push((steps, predicates));
                }
                _ => {
                    let (_, span) = self.bump()?;
                    return Err(QueryError::UnexpectedToken(
                        self.source[span].to_string(),
                    ));
                }
            }
        }

        let mut patterns = Vec::with_capacity(parsed.len());
        for (steps, raw_predicates) in parsed {
            patterns.push(self.finalize(steps, raw_predicates)?);
        }

        let mut buckets: HashMap<Symbol, Vec<usize>> = HashMap::new();
        let mut fallback = Vec::new();
        for (index, pattern) in patterns.iter().enumerate() {
            match &pattern.steps[0].kind {
                StepKind::Symbol { symbol, .. } => {
                    buckets.entry(*symbol).or_default().push(index);
                }
                StepKind::Alternation(branches)
                    if branches
                        .iter()
                        .all(|b| matches!(b, AltBranch::Symbol { .. })) =>
                {
                    for branch in branches {
                        if let AltBranch::Symbol { symbol, .. } = branch {
                            let bucket = buckets.entry(*symbol).or_default();
                            if bucket.last() != Some(&index) {
                                bucket.push(index);
                            }
                        }
                    }
                }
                _ => fallback.push(index),
            }
        }

        Ok(Query {
            patterns,
            capture_names: std::mem::take(&mut self.capture_names),
            buckets,
            fallback,
        })
    }

    /// One pattern element: parenthesized node, alternation, string, or
    /// wildcard, plus any trailing captures.
    fn parse_element(
        &mut self,
        steps: &mut Vec<Step>,
        predicates: &mut Vec<RawPredicate>,
        depth: u16,
        field: Option<FieldId>,
    ) -> Result<(), QueryError> {
        let index = steps.len();
        let (token, span) = self.bump()?;
        match token {
            QueryToken::LParen => {
                let (head, head_span) = self.bump()?;
                let kind = match head {
                    QueryToken::Ident => {
                        let name = &self.source[head_span];
                        let symbol = self
                            .language
                            .symbol_for_name(name, true)
                            .ok_or_else(|| QueryError::UnknownNodeType(name.to_string()))?;
                        StepKind::Symbol {
                            symbol,
                            named: true,
                        }
                    }
                    QueryToken::Wildcard => StepKind::Wildcard { named_only: true },
                    _ => {
                        return Err(QueryError::UnexpectedToken(
                            self.source[head_span].to_string(),
                        ));
                    }
                };
                steps.push(Step {
                    kind,
                    depth,
                    field,
                    capture: None,
                });
                self.parse_children(steps, predicates, depth, index)?;
            }
            QueryToken::LBracket => {
                let branches = self.parse_alternation()?;
                steps.push(Step {
                    kind: StepKind::Alternation(branches),
                    depth,
                    field,
                    capture: None,
                });
            }
            QueryToken::Str => {
                let literal = unescape_string(&self.source[span]);
                steps.push(Step {
                    kind: StepKind::Text(literal),
                    depth,
                    field,
                    capture: None,
                });
            }
            QueryToken::Wildcard => {
                steps.push(Step {
                    kind: StepKind::Wildcard { named_only: false },
                    depth,
                    field,
                    capture: None,
                });
            }
            _ => {
                return Err(QueryError::UnexpectedToken(self.source[span].to_string()));
            }
        }

        while self.peek() == Some(QueryToken::Capture) {
            let (_, capture_span) = self.bump()?;
            let name = self.source[capture_span].trim_start_matches('@').to_string();
            let capture = self.intern_capture(&name);
            let step = &mut steps[index];
            if step.capture.is_none() {
                step.capture = Some(capture);
            }
        }
        Ok(())
    }

    /// Body of a parenthesized node, through the closing paren.
    fn parse_children(
        &mut self,
        steps: &mut Vec<Step>,
        predicates: &mut Vec<RawPredicate>,
        depth: u16,
        enclosing: usize,
    ) -> Result<(), QueryError> {
        loop {
            let Some(token) = self.peek() else {
                return Err(QueryError::UnexpectedEnd);
            };
            match token {
                QueryToken::RParen => {
                    self.pos += 1;
                    return Ok(());
                }
                QueryToken::Field => {
                    let (_, span) = self.bump()?;
                    let lexeme = &self.source[span];
                    let name = &lexeme[..lexeme.len() - 1];
                    let field = self
                        .language
                        .field_id_for_name(name)
                        .ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
                    self.parse_element(steps, predicates, depth + 1, Some(field))?;
                }
                QueryToken::LParen if self.peek_nth(1) == Some(QueryToken::Predicate) => {
                    self.pos += 1;
                    predicates.push(self.parse_predicate()?);
                }
                QueryToken::LParen
                | QueryToken::LBracket
                | QueryToken::Str
                | QueryToken::Wildcard => {
                    self.parse_element(steps, predicates, depth + 1, None)?;
                }
                QueryToken::Capture => {
                    // A bare capture inside the parens binds the
                    // enclosing node.
                    let (_, span) = self.bump()?;
                    let name = self.source[span].trim_start_matches('@').to_string();
                    let capture = self.intern_capture(&name);
                    let step = &mut steps[enclosing];
                    if step.capture.is_none() {
                        step.capture = Some(capture);
                    }
                }
                _ => {
                    let (_, span) = self.bump()?;
                    return Err(QueryError::UnexpectedToken(
                        self.source[span].to_string(),
                    ));
                }
            }
        }
    }

    /// `[ branch… ]` with simple branches only.
    fn parse_alternation(&mut self) -> Result<Vec<AltBranch>, QueryError> {
        let mut branches = Vec::new();
        loop {
            let (token, span) = self.bump()?;
            match token {
                QueryToken::RBracket => break,
                QueryToken::LParen => {
                    let (head, head_span) = self.bump()?;
                    if head != QueryToken::Ident {
                        return Err(QueryError::UnexpectedToken(
                            self.source[head_span].to_string(),
                        ));
                    }
                    let name = &self.source[head_span];
                    let symbol = self
                        .language
                        .symbol_for_name(name, true)
                        .ok_or_else(|| QueryError::UnknownNodeType(name.to_string()))?;
                    let (close, close_span) = self.bump()?;
                    if close != QueryToken::RParen {
                        return Err(QueryError::UnexpectedToken(
                            self.source[close_span].to_string(),
                        ));
                    }
                    branches.push(AltBranch::Symbol {
                        symbol,
                        named: true,
                    });
                }
                QueryToken::Str => {
                    branches.push(AltBranch::Text(unescape_string(&self.source[span])));
                }
                QueryToken::Wildcard => branches.push(AltBranch::Wildcard),
                _ => {
                    return Err(QueryError::UnexpectedToken(self.source[span].to_string()));
                }
            }
        }
        if branches.is_empty() {
            return Err(QueryError::EmptyAlternation);
        }
        Ok(branches)
    }

    /// `#name arg… )` — the opening paren is already consumed.
    fn parse_predicate(&mut self) -> Result<RawPredicate, QueryError> {
        let (token, span) = self.bump()?;
        debug_assert_eq!(token, QueryToken::Predicate);
        let name = self.source[span].to_string();

        let mut args = Vec::new();
        loop {
            let (token, span) = self.bump()?;
            match token {
                QueryToken::RParen => break,
                QueryToken::Capture => {
                    args.push(RawArg::Capture(
                        self.source[span].trim_start_matches('@').to_string(),
                    ));
                }
                QueryToken::Str => {
                    args.push(RawArg::Literal(unescape_string(&self.source[span])));
                }
                _ => {
                    return Err(QueryError::UnexpectedToken(self.source[span].to_string()));
                }
            }
        }
        Ok(RawPredicate { name, args })
    }

    /// Resolve predicate capture names against the completed pattern and
    /// compile regexes.
    fn finalize(
        &self,
        steps: Vec<Step>,
        raw_predicates: Vec<RawPredicate>,
    ) -> Result<Pattern, QueryError> {
        let pattern = Pattern {
            steps,
            predicates: Vec::new(),
        };
        let bound: Vec<u16> = pattern.bound_captures().collect();

        let resolve = |name: &str| -> Result<u16, QueryError> {
            let index = self
                .capture_names
                .iter()
                .position(|n| n == name)
                .map(|i| i as u16)
                .ok_or_else(|| QueryError::MissingCapture(name.to_string()))?;
            if !bound.contains(&index) {
                return Err(QueryError::MissingCapture(name.to_string()));
            }
            Ok(index)
        };

        let mut predicates = Vec::with_capacity(raw_predicates.len());
        for raw in raw_predicates {
            match raw.name.as_str() {
                "#eq?" => {
                    let [first, second] = <[RawArg; 2]>::try_from(raw.args).map_err(|_| {
                        QueryError::MalformedPredicate("#eq? takes exactly two arguments".into())
                    })?;
                    let RawArg::Capture(name) = first else {
                        return Err(QueryError::MalformedPredicate(
                            "#eq? needs a capture as its first argument".into(),
                        ));
                    };
                    let capture = resolve(&name)?;
                    let operand = match second {
                        RawArg::Capture(other) => EqOperand::Capture(resolve(&other)?),
                        RawArg::Literal(literal) => EqOperand::Literal(literal),
                    };
                    predicates.push(Predicate::Eq { capture, operand });
                }
                "#match?" => {
                    let [first, second] = <[RawArg; 2]>::try_from(raw.args).map_err(|_| {
                        QueryError::MalformedPredicate("#match? takes exactly two arguments".into())
                    })?;
                    let RawArg::Capture(name) = first else {
                        return Err(QueryError::MalformedPredicate(
                            "#match? needs a capture as its first argument".into(),
                        ));
                    };
                    let RawArg::Literal(regex) = second else {
                        return Err(QueryError::MalformedPredicate(
                            "#match? needs a regex literal as its second argument".into(),
                        ));
                    };
                    let capture = resolve(&name)?;
                    let dfa = dense::DFA::new(&regex)
                        .map_err(|e| QueryError::InvalidRegex(e.to_string()))?;
                    predicates.push(Predicate::Match { capture, dfa });
                }
                other => return Err(QueryError::UnknownPredicate(other.to_string())),
            }
        }

        Ok(Pattern {
            predicates,
            ..pattern
        })
    }

    fn peek(&self) -> Option<QueryToken> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn peek_nth(&self, n: usize) -> Option<QueryToken> {
        self.tokens.get(self.pos + n).map(|(t, _)| *t)
    }

    fn bump(&mut self) -> Result<(QueryToken, Range<usize>), QueryError> {
        let (token, span) = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(QueryError::UnexpectedEnd)?;
        self.pos += 1;
        Ok((token, span))
    }

    fn intern_capture(&mut self, name: &str) -> u16 {
        if let Some(index) = self.capture_names.iter().position(|n| n == name) {
            return index as u16;
        }
        self.capture_names.push(name.to_string());
        (self.capture_names.len() - 1) as u16
    }
}
