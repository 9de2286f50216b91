//! Edit bookkeeping: byte/point shifting and dirty marking.
//!
//! An edit splits the old tree three ways. Nodes ending at or before the
//! edit are untouched; nodes starting at or after the old end shift
//! wholesale; nodes overlapping the edit absorb it — they go dirty (which
//! bars them from incremental reuse) and their span stretches over the new
//! range. Later edits are interpreted in the coordinate space produced by
//! earlier ones, so callers must apply edits in order.

use stolyar_core::{Point, Range};

use super::node::Node;

/// One recorded source edit, in both bytes and points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEdit {
    pub start_byte: u32,
    pub old_end_byte: u32,
    pub new_end_byte: u32,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

impl InputEdit {
    fn shift_byte(&self, byte: u32) -> u32 {
        (byte as i64 + self.new_end_byte as i64 - self.old_end_byte as i64) as u32
    }

    /// Shift a point at or after the old end. Columns move only on the old
    /// end's row; rows move by the row delta.
    fn shift_point(&self, point: Point) -> Point {
        let row = (point.row as i64 + self.new_end_point.row as i64
            - self.old_end_point.row as i64) as u32;
        let column = if point.row == self.old_end_point.row {
            (point.column as i64 + self.new_end_point.column as i64
                - self.old_end_point.column as i64) as u32
        } else {
            point.column
        };
        Point::new(row, column)
    }
}

enum Walk {
    /// Still classifying against the edit window.
    Classify(Node),
    /// Everything below starts after the old end; pure shift.
    Shift(Node),
}

/// Apply one edit to the subtree under `root`. Iterative: error-recovery
/// trees can be deep enough to overflow the call stack.
pub(crate) fn shift_tree(root: &Node, edit: &InputEdit) {
    let mut work = vec![Walk::Classify(root.clone())];
    while let Some(item) = work.pop() {
        match item {
            Walk::Shift(node) => {
                let r = node.range();
                node.store_range(Range::new(
                    edit.shift_byte(r.start_byte),
                    edit.shift_byte(r.end_byte),
                    edit.shift_point(r.start_point),
                    edit.shift_point(r.end_point),
                ));
                for child in node.children() {
                    work.push(Walk::Shift(child));
                }
            }
            Walk::Classify(node) => {
                let r = node.range();
                if r.end_byte <= edit.start_byte {
                    continue;
                }
                if r.start_byte >= edit.old_end_byte {
                    work.push(Walk::Shift(node));
                    continue;
                }

                // Overlap: absorb the edit.
                node.mark_dirty();
                let mut updated = r;
                if r.start_byte > edit.start_byte {
                    updated.start_byte = edit.start_byte;
                    updated.start_point = edit.start_point;
                }
                if r.end_byte >= edit.old_end_byte {
                    updated.end_byte = edit.shift_byte(r.end_byte);
                    updated.end_point = edit.shift_point(r.end_point);
                } else {
                    updated.end_byte = edit.new_end_byte;
                    updated.end_point = edit.new_end_point;
                }
                node.store_range(updated);

                for child in node.children() {
                    work.push(Walk::Classify(child));
                }
            }
        }
    }
}
