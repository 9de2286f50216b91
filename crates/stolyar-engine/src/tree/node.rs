//! Syntax-tree nodes.
//!
//! One `NodeData` serves leaves and parents; parents carry a child array
//! with a parallel field-ID array. Spans are atomically mutable so edit
//! shifting can run through shared handles, and the edited/error bits live
//! in one flag byte. The parent edge is a weak back-link, never an
//! ownership edge; ownership flows root-to-leaf through child slots.
//!
//! Child slots come in three shapes: an index into the node's own arena, a
//! heap node from the same parse (arena overflow), or a strong handle into
//! an older arena (incremental graft). Only the graft shape holds an
//! `Arc`, and it always points at a *different* arena, so arena reference
//! counts never cycle.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use stolyar_core::{
    FIELD_NONE, FieldId, Language, Point, ProductionId, Range, SYMBOL_ERROR, Symbol, Token,
};

use super::arena::Arena;

const FLAG_ERROR: u8 = 1 << 0;
const FLAG_DIRTY: u8 = 1 << 1;

/// Byte/point span with interior mutability for edit shifting.
pub(crate) struct SpanCell {
    start_byte: AtomicU32,
    end_byte: AtomicU32,
    start_row: AtomicU32,
    start_column: AtomicU32,
    end_row: AtomicU32,
    end_column: AtomicU32,
}

impl SpanCell {
    fn new(range: Range) -> Self {
        Self {
            start_byte: AtomicU32::new(range.start_byte),
            end_byte: AtomicU32::new(range.end_byte),
            start_row: AtomicU32::new(range.start_point.row),
            start_column: AtomicU32::new(range.start_point.column),
            end_row: AtomicU32::new(range.end_point.row),
            end_column: AtomicU32::new(range.end_point.column),
        }
    }

    pub(crate) fn load(&self) -> Range {
        Range {
            start_byte: self.start_byte.load(Ordering::Relaxed),
            end_byte: self.end_byte.load(Ordering::Relaxed),
            start_point: Point::new(
                self.start_row.load(Ordering::Relaxed),
                self.start_column.load(Ordering::Relaxed),
            ),
            end_point: Point::new(
                self.end_row.load(Ordering::Relaxed),
                self.end_column.load(Ordering::Relaxed),
            ),
        }
    }

    pub(crate) fn store(&self, range: Range) {
        self.start_byte.store(range.start_byte, Ordering::Relaxed);
        self.end_byte.store(range.end_byte, Ordering::Relaxed);
        self.start_row.store(range.start_point.row, Ordering::Relaxed);
        self.start_column
            .store(range.start_point.column, Ordering::Relaxed);
        self.end_row.store(range.end_point.row, Ordering::Relaxed);
        self.end_column
            .store(range.end_point.column, Ordering::Relaxed);
    }
}

/// Ownership edge from a parent to one child.
pub(crate) enum ChildSlot {
    /// Child lives in the same arena.
    Local(u32),
    /// Child overflowed onto the heap during the same parse.
    Heap(Arc<NodeData>),
    /// Child grafted from an older tree's arena.
    Reused(Node),
}

enum ParentRepr {
    Slab(u32),
    Heap(Weak<NodeData>),
}

/// Weak back-link to the parent. Upgrading fails only when the parent's
/// tree has been dropped while a grafted child outlived it.
pub(crate) struct ParentLink {
    arena: Weak<Arena>,
    repr: ParentRepr,
}

/// Storage for one tree vertex.
pub struct NodeData {
    symbol: Symbol,
    production_id: ProductionId,
    named: bool,
    missing: bool,
    extra: bool,
    span: SpanCell,
    flags: AtomicU8,
    parent: Mutex<Option<ParentLink>>,
    children: Box<[ChildSlot]>,
    field_ids: Box<[FieldId]>,
}

#[derive(Clone)]
enum Repr {
    Slab(u32),
    Heap(Arc<NodeData>),
}

/// Shared handle to a tree vertex.
///
/// Handles are cheap to clone and keep the backing arena alive. Equality
/// is identity: two handles compare equal when they address the same
/// stored node, which is how incremental reuse is observed.
#[derive(Clone)]
pub struct Node {
    arena: Arc<Arena>,
    repr: Repr,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.data(), other.data())
    }
}

impl Eq for Node {}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let range = self.range();
        f.debug_struct("Node")
            .field("symbol", &self.symbol())
            .field("bytes", &(range.start_byte..range.end_byte))
            .field("children", &self.child_count())
            .finish()
    }
}

impl Node {
    fn data(&self) -> &NodeData {
        match &self.repr {
            Repr::Slab(index) => self.arena.get(*index),
            Repr::Heap(data) => data,
        }
    }

    #[inline]
    pub fn symbol(&self) -> Symbol {
        self.data().symbol
    }

    /// Display name of the node's symbol.
    pub fn kind<'l>(&self, language: &'l Language) -> &'l str {
        language.symbol_name(self.symbol())
    }

    #[inline]
    pub fn is_named(&self) -> bool {
        self.data().named
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.data().missing
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.data().symbol == SYMBOL_ERROR
    }

    pub fn has_error(&self) -> bool {
        self.data().flags.load(Ordering::Relaxed) & FLAG_ERROR != 0
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.data().flags.load(Ordering::Relaxed) & FLAG_DIRTY != 0
    }

    /// Clean nodes are candidates for incremental reuse.
    pub(crate) fn is_clean(&self) -> bool {
        self.data().flags.load(Ordering::Relaxed) & (FLAG_ERROR | FLAG_DIRTY) == 0
    }

    pub(crate) fn mark_error(&self) {
        self.data().flags.fetch_or(FLAG_ERROR, Ordering::Relaxed);
    }

    pub(crate) fn mark_dirty(&self) {
        self.data().flags.fetch_or(FLAG_DIRTY, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn is_extra(&self) -> bool {
        self.data().extra
    }

    #[inline]
    pub(crate) fn production_id(&self) -> ProductionId {
        self.data().production_id
    }

    pub fn range(&self) -> Range {
        self.data().span.load()
    }

    pub(crate) fn store_range(&self, range: Range) {
        self.data().span.store(range);
    }

    #[inline]
    pub fn start_byte(&self) -> u32 {
        self.data().span.start_byte.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn end_byte(&self) -> u32 {
        self.data().span.end_byte.load(Ordering::Relaxed)
    }

    pub fn start_point(&self) -> Point {
        self.range().start_point
    }

    pub fn end_point(&self) -> Point {
        self.range().end_point
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        let range = self.range();
        &source[range.start_byte as usize..range.end_byte as usize]
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node> {
        let slot = self.data().children.get(index)?;
        Some(self.resolve_child(slot))
    }

    fn resolve_child(&self, slot: &ChildSlot) -> Node {
        match slot {
            ChildSlot::Local(index) => Node {
                arena: self.arena.clone(),
                repr: Repr::Slab(*index),
            },
            ChildSlot::Heap(data) => Node {
                arena: self.arena.clone(),
                repr: Repr::Heap(data.clone()),
            },
            ChildSlot::Reused(node) => node.clone(),
        }
    }

    pub fn children(&self) -> impl Iterator<Item = Node> + '_ {
        self.data().children.iter().map(|slot| self.resolve_child(slot))
    }

    pub fn named_child_count(&self) -> usize {
        self.children().filter(Node::is_named).count()
    }

    pub fn named_child(&self, index: usize) -> Option<Node> {
        self.children().filter(Node::is_named).nth(index)
    }

    /// Field assigned to the child at `index`, or [`FIELD_NONE`].
    pub(crate) fn field_id_at(&self, index: usize) -> FieldId {
        self.data()
            .field_ids
            .get(index)
            .copied()
            .unwrap_or(FIELD_NONE)
    }

    pub fn child_by_field_id(&self, field: FieldId) -> Option<Node> {
        if field == FIELD_NONE {
            return None;
        }
        let data = self.data();
        data.field_ids
            .iter()
            .position(|&f| f == field)
            .map(|i| self.resolve_child(&data.children[i]))
    }

    pub fn child_by_field_name(&self, name: &str, language: &Language) -> Option<Node> {
        self.child_by_field_id(language.field_id_for_name(name)?)
    }

    pub fn parent(&self) -> Option<Node> {
        let guard = self.data().parent.lock().unwrap();
        let link = guard.as_ref()?;
        let arena = link.arena.upgrade()?;
        let repr = match &link.repr {
            ParentRepr::Slab(index) => Repr::Slab(*index),
            ParentRepr::Heap(weak) => Repr::Heap(weak.upgrade()?),
        };
        Some(Node { arena, repr })
    }

    /// Smallest node whose span contains `[start, end)`.
    pub fn descendant_for_byte_range(&self, start: u32, end: u32) -> Option<Node> {
        let range = self.range();
        if start < range.start_byte || end > range.end_byte {
            return None;
        }
        let mut current = self.clone();
        loop {
            let next = current.children().find(|child| {
                let r = child.range();
                r.start_byte <= start && end <= r.end_byte
            });
            match next {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }

    /// S-expression rendering of the subtree, named nodes only.
    pub fn to_sexp(&self, language: &Language) -> String {
        let mut out = String::new();
        self.write_sexp(language, &mut out);
        out
    }

    fn write_sexp(&self, language: &Language, out: &mut String) {
        if !self.is_named() {
            let _ = write!(out, "{:?}", self.kind(language));
            return;
        }
        let _ = write!(out, "({}", self.kind(language));
        for child in self.children() {
            out.push(' ');
            child.write_sexp(language, out);
        }
        out.push(')');
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Node factory for one parse: bump-allocates into the parse's arena and
/// counts allocations toward the parser's node cap. Overflow goes to the
/// heap.
pub(crate) struct NodeAlloc {
    arena: Arc<Arena>,
    allocated: usize,
}

impl NodeAlloc {
    pub(crate) fn new(arena: Arc<Arena>) -> Self {
        Self {
            arena,
            allocated: 0,
        }
    }

    pub(crate) fn into_arena(self) -> Arc<Arena> {
        self.arena
    }

    pub(crate) fn count(&self) -> usize {
        self.allocated
    }

    fn alloc(&mut self, data: NodeData) -> Node {
        self.allocated += 1;
        match self.arena.alloc(data) {
            Ok(index) => Node {
                arena: self.arena.clone(),
                repr: Repr::Slab(index),
            },
            Err(data) => Node {
                arena: self.arena.clone(),
                repr: Repr::Heap(Arc::new(data)),
            },
        }
    }

    /// Leaf for one shifted token.
    pub(crate) fn leaf(&mut self, token: &Token<'_>, extra: bool, language: &Language) -> Node {
        let meta = language.symbol_metadata(token.symbol);
        self.alloc(NodeData {
            symbol: token.symbol,
            production_id: 0,
            named: meta.named,
            missing: false,
            extra,
            span: SpanCell::new(token.range),
            flags: AtomicU8::new(0),
            parent: Mutex::new(None),
            children: Box::new([]),
            field_ids: Box::new([]),
        })
    }

    /// Synthetic error leaf covering an unparsable lookahead.
    pub(crate) fn error_leaf(&mut self, range: Range) -> Node {
        self.alloc(NodeData {
            symbol: SYMBOL_ERROR,
            production_id: 0,
            named: true,
            missing: range.is_empty(),
            extra: false,
            span: SpanCell::new(range),
            flags: AtomicU8::new(FLAG_ERROR),
            parent: Mutex::new(None),
            children: Box::new([]),
            field_ids: Box::new([]),
        })
    }

    /// Assemble a parent over `children` (source order). The span derives
    /// from the first and last child, or `fallback` for empty productions.
    /// Error flags propagate upward here.
    pub(crate) fn parent(
        &mut self,
        symbol: Symbol,
        production_id: ProductionId,
        children: Vec<(Node, FieldId)>,
        error: bool,
        fallback: Range,
        language: &Language,
    ) -> Node {
        let meta = language.symbol_metadata(symbol);
        let range = match (children.first(), children.last()) {
            (Some((first, _)), Some((last, _))) => {
                let start = first.range();
                let end = last.range();
                Range::new(
                    start.start_byte,
                    end.end_byte,
                    start.start_point,
                    end.end_point,
                )
            }
            _ => fallback,
        };

        let mut flags = 0u8;
        if error || symbol == SYMBOL_ERROR {
            flags |= FLAG_ERROR;
        }

        let mut slots = Vec::with_capacity(children.len());
        let mut field_ids = Vec::with_capacity(children.len());
        for (child, field) in &children {
            if child.has_error() {
                flags |= FLAG_ERROR;
            }
            let slot = if Arc::ptr_eq(&child.arena, &self.arena) {
                match &child.repr {
                    Repr::Slab(index) => ChildSlot::Local(*index),
                    Repr::Heap(data) => ChildSlot::Heap(data.clone()),
                }
            } else {
                ChildSlot::Reused(child.clone())
            };
            slots.push(slot);
            field_ids.push(*field);
        }

        let parent = self.alloc(NodeData {
            symbol,
            production_id,
            named: meta.named,
            missing: false,
            extra: false,
            span: SpanCell::new(range),
            flags: AtomicU8::new(flags),
            parent: Mutex::new(None),
            children: slots.into_boxed_slice(),
            field_ids: field_ids.into_boxed_slice(),
        });

        for (child, _) in &children {
            child.set_parent(&parent);
        }
        parent
    }
}

impl Node {
    fn set_parent(&self, parent: &Node) {
        let link = ParentLink {
            arena: Arc::downgrade(&parent.arena),
            repr: match &parent.repr {
                Repr::Slab(index) => ParentRepr::Slab(*index),
                Repr::Heap(data) => ParentRepr::Heap(Arc::downgrade(data)),
            },
        };
        *self.data().parent.lock().unwrap() = Some(link);
    }
}
