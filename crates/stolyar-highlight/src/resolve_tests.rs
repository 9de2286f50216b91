use crate::{HighlightRange, resolve_overlaps};

fn r(start: u32, end: u32, name: &str) -> HighlightRange {
    HighlightRange::new(start, end, name)
}

fn flat(ranges: Vec<HighlightRange>) -> Vec<(u32, u32, String)> {
    resolve_overlaps(ranges)
        .into_iter()
        .map(|h| (h.start, h.end, h.name))
        .collect()
}

#[test]
fn nested_captures_alternate() {
    let out = flat(vec![
        r(0, 30, "function"),
        r(5, 25, "type"),
        r(10, 15, "keyword"),
    ]);
    assert_eq!(
        out,
        vec![
            (0, 5, "function".to_string()),
            (5, 10, "type".to_string()),
            (10, 15, "keyword".to_string()),
            (15, 25, "type".to_string()),
            (25, 30, "function".to_string()),
        ]
    );
}

#[test]
fn disjoint_ranges_pass_through() {
    let out = flat(vec![r(0, 3, "a"), r(5, 8, "b")]);
    assert_eq!(
        out,
        vec![(0, 3, "a".to_string()), (5, 8, "b".to_string())]
    );
}

#[test]
fn zero_width_ranges_are_dropped() {
    let out = flat(vec![r(2, 2, "ghost"), r(0, 4, "real")]);
    assert_eq!(out, vec![(0, 4, "real".to_string())]);
}

#[test]
fn identical_spans_inner_wins() {
    // Same span twice: the later-started (innermost) one owns the bytes.
    let out = flat(vec![r(0, 4, "outer"), r(0, 4, "inner")]);
    assert_eq!(out, vec![(0, 4, "inner".to_string())]);
}

#[test]
fn shared_boundary_ends_before_starts() {
    let out = flat(vec![r(0, 5, "a"), r(5, 10, "b")]);
    assert_eq!(
        out,
        vec![(0, 5, "a".to_string()), (5, 10, "b".to_string())]
    );
}

#[test]
fn output_is_sorted_and_non_overlapping() {
    let out = flat(vec![
        r(10, 20, "x"),
        r(0, 30, "y"),
        r(12, 18, "z"),
        r(25, 28, "w"),
    ]);
    let mut last_end = 0;
    for (start, end, _) in &out {
        assert!(*start >= last_end);
        assert!(end > start);
        last_end = *end;
    }
    assert_eq!(out.first().unwrap().0, 0);
    assert_eq!(out.last().unwrap().1, 30);
}

#[test]
fn empty_input_empty_output() {
    assert!(flat(Vec::new()).is_empty());
}
