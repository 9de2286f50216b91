//! Sweep-based overlap resolution.
//!
//! Captures routinely nest (a keyword inside a type inside a function);
//! editors want flat, non-overlapping spans. The resolver turns each
//! range into start/end events, sweeps them in byte order, and emits a
//! segment per gap between events, owned by the innermost (most recently
//! started) active range.

use crate::HighlightRange;

#[derive(Clone, Copy)]
struct Event {
    pos: u32,
    is_start: bool,
    width: u32,
    range: usize,
}

/// Flatten possibly-nested ranges into sorted, non-overlapping segments.
///
/// Zero-width input ranges are dropped. At a shared position, end events
/// fire before start events; wider starts fire first (outer ranges go
/// under), narrower ends fire first (inner ranges close first).
pub fn resolve_overlaps(mut ranges: Vec<HighlightRange>) -> Vec<HighlightRange> {
    ranges.retain(|r| r.end > r.start);
    ranges.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.width().cmp(&a.width()))
    });

    let mut events = Vec::with_capacity(ranges.len() * 2);
    for (index, range) in ranges.iter().enumerate() {
        events.push(Event {
            pos: range.start,
            is_start: true,
            width: range.width(),
            range: index,
        });
        events.push(Event {
            pos: range.end,
            is_start: false,
            width: range.width(),
            range: index,
        });
    }
    events.sort_by(|a, b| {
        a.pos
            .cmp(&b.pos)
            .then_with(|| a.is_start.cmp(&b.is_start))
            .then_with(|| {
                if a.is_start {
                    b.width.cmp(&a.width)
                } else {
                    a.width.cmp(&b.width)
                }
            })
    });

    let mut active: Vec<usize> = Vec::new();
    let mut out = Vec::new();
    let mut cursor = 0u32;
    for event in events {
        if event.pos > cursor {
            if let Some(&innermost) = active.last() {
                out.push(HighlightRange {
                    start: cursor,
                    end: event.pos,
                    name: ranges[innermost].name.clone(),
                });
            }
            cursor = event.pos;
        }
        if event.is_start {
            active.push(event.range);
        } else if let Some(at) = active.iter().rposition(|&r| r == event.range) {
            active.remove(at);
        }
    }
    out
}
