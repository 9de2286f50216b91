//! GLR parse stacks.
//!
//! Each stack is a flat entry list; forks clone the whole list (node
//! handles are cheap `Arc` clones). Dynamic precedence accumulates into a
//! per-stack score that drives dedup survival and best-stack selection.

use stolyar_core::StateId;

use crate::tree::Node;

#[derive(Clone)]
pub(crate) struct StackEntry {
    /// State after this entry was pushed.
    pub state: StateId,
    pub node: Node,
    /// Extra entries (comments, synthetic error leaves) don't count as
    /// reduction children.
    pub extra: bool,
}

#[derive(Clone)]
pub(crate) struct ParseStack {
    pub entries: Vec<StackEntry>,
    /// Current top state.
    pub state: StateId,
    /// Accumulated dynamic precedence.
    pub score: i64,
    pub dead: bool,
    /// Finished at EOF (explicit accept or exhausted input).
    pub accepted: bool,
    /// Consumed the current lookahead; parked until the token advances.
    pub shifted: bool,
    /// Same-state reduce watchdog: (state, consecutive reduces).
    pub reduce_watch: (StateId, u32),
}

impl ParseStack {
    pub fn new(initial_state: StateId) -> Self {
        Self {
            entries: Vec::new(),
            state: initial_state,
            score: 0,
            dead: false,
            accepted: false,
            shifted: false,
            reduce_watch: (initial_state, 0),
        }
    }

    #[inline]
    pub fn alive(&self) -> bool {
        !self.dead && !self.accepted
    }

    pub fn push(&mut self, state: StateId, node: Node, extra: bool) {
        self.entries.push(StackEntry {
            state,
            node,
            extra,
        });
        self.state = state;
    }

    /// State under the top `keep` entries (the state a reduce returns to).
    pub fn state_below(&self, keep: usize, initial_state: StateId) -> StateId {
        match keep.checked_sub(1).and_then(|i| self.entries.get(i)) {
            Some(entry) => entry.state,
            None => initial_state,
        }
    }

    pub fn fork(&self) -> ParseStack {
        self.clone()
    }
}
