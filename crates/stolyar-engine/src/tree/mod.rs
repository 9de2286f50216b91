//! Syntax trees.
//!
//! A tree owns the arena its nodes were parsed into and retains the arenas
//! of every tree it reused subtrees from; dropping the tree releases those
//! references, and fully-released arenas return to a shared pool. Trees
//! are immutable apart from recorded edits, which shift node coordinates
//! in place and mark overlapped subtrees as unusable for reuse.

pub(crate) mod arena;
mod edit;
mod node;


use std::sync::Arc;

use stolyar_core::Language;

use arena::Arena;

pub use edit::InputEdit;
pub use node::Node;
pub(crate) use node::NodeAlloc;

/// A parsed syntax tree.
///
/// Cloning is cheap and shares the underlying nodes; an identity reparse
/// returns a clone whose root is pointer-identical to the input's.
#[derive(Clone)]
pub struct Tree {
    root: Option<Node>,
    source: Arc<str>,
    language: Arc<Language>,
    edits: Vec<InputEdit>,
    arena: Option<Arc<Arena>>,
    retained: Vec<Arc<Arena>>,
    scanner_state: Option<Vec<u8>>,
}

impl Tree {
    pub(crate) fn new(
        root: Option<Node>,
        source: Arc<str>,
        language: Arc<Language>,
        arena: Arc<Arena>,
        retained: Vec<Arc<Arena>>,
    ) -> Self {
        Self {
            root,
            source,
            language,
            edits: Vec::new(),
            arena: Some(arena),
            retained,
            scanner_state: None,
        }
    }

    /// Root node; `None` for empty input.
    pub fn root_node(&self) -> Option<Node> {
        self.root.clone()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    /// Edits recorded since this tree was produced, in application order.
    pub fn edits(&self) -> &[InputEdit] {
        &self.edits
    }

    /// Record an edit and shift the tree's coordinates. Offsets are in the
    /// coordinate space produced by earlier edits on this tree.
    pub fn edit(&mut self, edit: InputEdit) {
        if let Some(root) = &self.root {
            edit::shift_tree(root, &edit);
        }
        self.edits.push(edit);
    }

    pub fn has_error(&self) -> bool {
        self.root.as_ref().is_some_and(Node::has_error)
    }

    pub(crate) fn set_scanner_state(&mut self, state: Option<Vec<u8>>) {
        self.scanner_state = state;
    }

    pub(crate) fn scanner_state(&self) -> Option<&[u8]> {
        self.scanner_state.as_deref()
    }

    /// Arenas a new incremental tree must retain when it grafts subtrees
    /// out of this one.
    pub(crate) fn reusable_arenas(&self) -> Vec<Arc<Arena>> {
        self.arena
            .iter()
            .chain(self.retained.iter())
            .cloned()
            .collect()
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        // Release the root handle first; a sole-owner arena is only
        // recognizably unique once no node handle pins it.
        self.root = None;
        if let Some(arena) = self.arena.take() {
            arena::recycle(arena);
        }
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("root", &self.root)
            .field("source_len", &self.source.len())
            .field("edits", &self.edits.len())
            .finish_non_exhaustive()
    }
}
