//! Slab arenas for node storage.
//!
//! A parse allocates all its nodes from one arena: a pre-allocated slot
//! array with a bump cursor. Arenas are shared by `Arc`; an incremental
//! tree that grafts subtrees from an old tree retains the old arenas until
//! it is dropped, so grafted nodes stay valid without copying.
//!
//! Two pooled size classes: a small one for the incremental edit hot path
//! and a large one for full parses. Exhausted arenas fall back to
//! individually heap-allocated nodes that do not participate in arena
//! lifetime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex, OnceLock};

use super::node::NodeData;

/// Slots in the incremental-parse arena class.
pub(crate) const INCREMENTAL_SLOTS: usize = 4 * 1024;

/// Slots in the full-parse arena class.
pub(crate) const FULL_PARSE_SLOTS: usize = 64 * 1024;

const INCREMENTAL_POOL_CAP: usize = 4;
const FULL_PARSE_POOL_CAP: usize = 1;

/// A slab of node slots with bump allocation.
pub struct Arena {
    slots: Box<[OnceLock<NodeData>]>,
    len: AtomicUsize,
}

impl Arena {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceLock::new()).collect(),
            len: AtomicUsize::new(0),
        }
    }

    /// Bump-allocate one slot. Returns the node back on exhaustion so the
    /// caller can fall back to the heap.
    pub(crate) fn alloc(&self, data: NodeData) -> Result<u32, NodeData> {
        let idx = self.len.fetch_add(1, Ordering::Relaxed);
        if idx >= self.slots.len() {
            return Err(data);
        }
        assert!(
            self.slots[idx].set(data).is_ok(),
            "arena slot initialized twice"
        );
        Ok(idx as u32)
    }

    #[inline]
    pub(crate) fn get(&self, index: u32) -> &NodeData {
        self.slots[index as usize]
            .get()
            .expect("uninitialized arena slot")
    }

    /// Drop all stored nodes and rewind the cursor. Requires unique
    /// ownership, so pooled arenas never alias live trees.
    fn reset(&mut self) {
        let len = self.len.load(Ordering::Relaxed).min(self.slots.len());
        for slot in &mut self.slots[..len] {
            slot.take();
        }
        self.len.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArenaKind {
    Incremental,
    FullParse,
}

static INCREMENTAL_POOL: LazyLock<Mutex<Vec<Arc<Arena>>>> = LazyLock::new(|| Mutex::new(Vec::new()));
static FULL_PARSE_POOL: LazyLock<Mutex<Vec<Arc<Arena>>>> = LazyLock::new(|| Mutex::new(Vec::new()));

fn pool(kind: ArenaKind) -> (&'static Mutex<Vec<Arc<Arena>>>, usize, usize) {
    match kind {
        ArenaKind::Incremental => (&*INCREMENTAL_POOL, INCREMENTAL_SLOTS, INCREMENTAL_POOL_CAP),
        ArenaKind::FullParse => (&*FULL_PARSE_POOL, FULL_PARSE_SLOTS, FULL_PARSE_POOL_CAP),
    }
}

/// Take an arena from the free list, or build a fresh one.
pub(crate) fn acquire(kind: ArenaKind) -> Arc<Arena> {
    let (pool, slots, _) = pool(kind);
    if let Some(arena) = pool.lock().unwrap().pop() {
        return arena;
    }
    Arc::new(Arena::with_capacity(slots))
}

/// Return an arena to the free list once nothing references it. Arenas
/// still retained by trees or node handles are left to plain `Arc`
/// reclamation.
pub(crate) fn recycle(mut arena: Arc<Arena>) {
    let kind = if arena.slots.len() >= FULL_PARSE_SLOTS {
        ArenaKind::FullParse
    } else {
        ArenaKind::Incremental
    };
    let Some(inner) = Arc::get_mut(&mut arena) else {
        return;
    };
    inner.reset();
    let (pool, _, cap) = pool(kind);
    let mut pool = pool.lock().unwrap();
    if pool.len() < cap {
        pool.push(arena);
    }
}
