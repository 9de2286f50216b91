use stolyar_core::Point;

use crate::parser::Parser;
use crate::testing::{EXPRESSION, NUMBER, arithmetic_language};
use crate::tree::InputEdit;

fn replace_byte(at: u32, with_len: u32) -> InputEdit {
    InputEdit {
        start_byte: at,
        old_end_byte: at + 1,
        new_end_byte: at + with_len,
        start_point: Point::new(0, at),
        old_end_point: Point::new(0, at + 1),
        new_end_point: Point::new(0, at + with_len),
    }
}

#[test]
fn identity_reparse_returns_the_same_root() {
    let parser = Parser::new(arithmetic_language());
    let tree = parser.parse("1+2+3");
    let again = parser.parse_incremental("1+2+3", &tree);
    // Whole-tree reuse: the root is pointer-identical, not a copy.
    assert_eq!(tree.root_node(), again.root_node());
}

#[test]
fn edited_leaf_is_rebuilt_and_clean_leaf_is_reused() {
    let parser = Parser::new(arithmetic_language());
    let mut tree = parser.parse("1+2+3");
    let old_root = tree.root_node().unwrap();
    let old_tail = old_root.child(2).unwrap();
    assert_eq!(old_tail.text(tree.source()), "3");

    tree.edit(replace_byte(2, 1));
    let new_tree = parser.parse_incremental("1+4+3", &tree);
    let new_root = new_tree.root_node().unwrap();
    assert!(!new_tree.has_error());
    assert_eq!(new_root.symbol(), EXPRESSION);

    // The trailing "3" was grafted from the old tree: identity equality.
    let new_tail = new_root.child(2).unwrap();
    assert_eq!(new_tail, old_tail);
    assert_eq!(new_tail.text(new_tree.source()), "3");

    // The edited leaf is a fresh node with the new text.
    let changed = new_root.child(0).unwrap().child(2).unwrap();
    assert_eq!(changed.symbol(), NUMBER);
    assert_eq!(changed.text(new_tree.source()), "4");
    assert_ne!(changed, old_root.child(0).unwrap().child(2).unwrap());
}

#[test]
fn untouched_prefix_subtree_is_reused() {
    let parser = Parser::new(arithmetic_language());
    let mut tree = parser.parse("1+2+3");
    let old_prefix_unit = tree
        .root_node()
        .unwrap()
        .child(0)
        .unwrap()
        .child(0)
        .unwrap();
    assert_eq!(old_prefix_unit.text(tree.source()), "1");

    tree.edit(replace_byte(4, 1));
    let new_tree = parser.parse_incremental("1+2+9", &tree);
    let new_prefix_unit = new_tree
        .root_node()
        .unwrap()
        .child(0)
        .unwrap()
        .child(0)
        .unwrap();
    // The untouched `expression (number "1")` subtree came across whole.
    assert_eq!(new_prefix_unit, old_prefix_unit);
}

#[test]
fn grafted_nodes_get_new_parents() {
    let parser = Parser::new(arithmetic_language());
    let mut tree = parser.parse("1+2+3");
    tree.edit(replace_byte(2, 1));
    let new_tree = parser.parse_incremental("1+4+3", &tree);
    let new_root = new_tree.root_node().unwrap();
    let grafted = new_root.child(2).unwrap();
    // The reused node's parent link points into the new tree.
    assert_eq!(grafted.parent().as_ref(), Some(&new_root));
}

#[test]
fn reused_tree_survives_dropping_the_old_one() {
    let parser = Parser::new(arithmetic_language());
    let mut tree = parser.parse("1+2+3");
    tree.edit(replace_byte(2, 1));
    let new_tree = parser.parse_incremental("1+4+3", &tree);
    drop(tree);
    // The new tree retains the old arena; grafted nodes stay readable.
    let tail = new_tree.root_node().unwrap().child(2).unwrap();
    assert_eq!(tail.text(new_tree.source()), "3");
}

#[test]
fn growing_edit_shifts_and_reuses_the_tail() {
    let parser = Parser::new(arithmetic_language());
    let mut tree = parser.parse("1+2+3");
    let old_tail = tree.root_node().unwrap().child(2).unwrap();

    // "2" -> "222": later nodes shift right by two.
    tree.edit(InputEdit {
        start_byte: 2,
        old_end_byte: 3,
        new_end_byte: 5,
        start_point: Point::new(0, 2),
        old_end_point: Point::new(0, 3),
        new_end_point: Point::new(0, 5),
    });
    assert_eq!((old_tail.start_byte(), old_tail.end_byte()), (6, 7));

    let new_tree = parser.parse_incremental("1+222+3", &tree);
    assert!(!new_tree.has_error());
    let new_tail = new_tree.root_node().unwrap().child(2).unwrap();
    assert_eq!(new_tail, old_tail);
    assert_eq!(new_tail.text(new_tree.source()), "3");
}

#[test]
fn incremental_without_usable_subtrees_still_parses() {
    let parser = Parser::new(arithmetic_language());
    let mut tree = parser.parse("1");
    // The whole tree overlaps the edit; nothing is reusable.
    tree.edit(replace_byte(0, 1));
    let new_tree = parser.parse_incremental("9", &tree);
    let root = new_tree.root_node().unwrap();
    assert_eq!(root.symbol(), EXPRESSION);
    assert_eq!(root.child(0).unwrap().text(new_tree.source()), "9");
}

#[test]
fn incremental_result_parses_like_a_fresh_tree() {
    let parser = Parser::new(arithmetic_language());
    let mut tree = parser.parse("1+2+3");
    tree.edit(replace_byte(2, 1));
    let incremental = parser.parse_incremental("1+4+3", &tree);
    let fresh = parser.parse("1+4+3");
    let language = incremental.language().clone();
    assert_eq!(
        incremental.root_node().unwrap().to_sexp(&language),
        fresh.root_node().unwrap().to_sexp(&language)
    );
}
