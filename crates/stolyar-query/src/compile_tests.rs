use indoc::indoc;

use crate::testing::fixture_language;
use crate::{Query, QueryError};

#[test]
fn compiles_field_constrained_pattern() {
    let language = fixture_language();
    let query = Query::new(
        "(function_declaration name: (identifier) @func.name)",
        &language,
    )
    .expect("valid query");
    assert_eq!(query.pattern_count(), 1);
    assert_eq!(query.capture_names(), ["func.name"]);
}

#[test]
fn captures_number_in_first_appearance_order() {
    let language = fixture_language();
    let query = Query::new(
        indoc! {r#"
            (identifier) @second ; reused below
            (function_declaration) @first
            (identifier) @second
        "#},
        &language,
    )
    .expect("valid query");
    assert_eq!(query.pattern_count(), 3);
    assert_eq!(query.capture_names(), ["second", "first"]);
}

#[test]
fn unknown_node_type_fails() {
    let language = fixture_language();
    let err = Query::new("(no_such_node)", &language).unwrap_err();
    assert!(matches!(err, QueryError::UnknownNodeType(name) if name == "no_such_node"));
}

#[test]
fn anonymous_names_are_not_named_nodes() {
    // "func" exists only as an anonymous symbol; `(func)` must not
    // resolve to it.
    let language = fixture_language();
    assert!(matches!(
        Query::new("(func)", &language),
        Err(QueryError::UnknownNodeType(_))
    ));
}

#[test]
fn unknown_field_fails() {
    let language = fixture_language();
    let err = Query::new("(function_declaration body: (identifier))", &language).unwrap_err();
    assert!(matches!(err, QueryError::UnknownField(name) if name == "body"));
}

#[test]
fn empty_alternation_fails() {
    let language = fixture_language();
    assert!(matches!(
        Query::new("[ ] @x", &language),
        Err(QueryError::EmptyAlternation)
    ));
}

#[test]
fn predicate_without_pattern_fails() {
    let language = fixture_language();
    assert!(matches!(
        Query::new(r#"(#eq? @a "x")"#, &language),
        Err(QueryError::MisplacedPredicate)
    ));
}

#[test]
fn unknown_predicate_fails() {
    let language = fixture_language();
    let err = Query::new(r#"(identifier) @a (#is-not? @a "x")"#, &language).unwrap_err();
    assert!(matches!(err, QueryError::UnknownPredicate(name) if name == "#is-not?"));
}

#[test]
fn invalid_regex_fails() {
    let language = fixture_language();
    assert!(matches!(
        Query::new(r#"(identifier) @a (#match? @a "[")"#, &language),
        Err(QueryError::InvalidRegex(_))
    ));
}

#[test]
fn predicate_referencing_unbound_capture_fails() {
    let language = fixture_language();
    assert!(matches!(
        Query::new(r#"(identifier) @a (#eq? @b "x")"#, &language),
        Err(QueryError::MissingCapture(name)) if name == "b"
    ));
}

#[test]
fn predicate_capture_must_come_from_its_own_pattern() {
    let language = fixture_language();
    // `@a` exists, but pattern 2 does not bind it.
    let err = Query::new(
        indoc! {r#"
            (identifier) @a
            (function_declaration) @f (#eq? @a "x")
        "#},
        &language,
    )
    .unwrap_err();
    assert!(matches!(err, QueryError::MissingCapture(name) if name == "a"));
}

#[test]
fn malformed_predicate_arity_fails() {
    let language = fixture_language();
    assert!(matches!(
        Query::new("(identifier) @a (#eq? @a)", &language),
        Err(QueryError::MalformedPredicate(_))
    ));
}

#[test]
fn predicate_may_precede_its_capture() {
    let language = fixture_language();
    let query = Query::new(
        r#"(function_declaration (#eq? @id "main") (identifier) @id)"#,
        &language,
    )
    .expect("late-bound capture resolves");
    assert_eq!(query.pattern_count(), 1);
}

#[test]
fn unterminated_query_fails() {
    let language = fixture_language();
    assert!(matches!(
        Query::new("(function_declaration", &language),
        Err(QueryError::UnexpectedEnd)
    ));
}

#[test]
fn stray_token_fails() {
    let language = fixture_language();
    assert!(matches!(
        Query::new(") oops", &language),
        Err(QueryError::UnexpectedToken(_))
    ));
}
