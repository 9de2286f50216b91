//! Incremental reuse index.
//!
//! Built once per incremental call from the old tree: every clean subtree
//! with positive width, bucketed by start byte in pre-order (so wider
//! candidates come first). Small sources use a CSR-packed bucket array —
//! counting sort over start bytes, no hashing on the hot path; sources
//! past the threshold fall back to a hash map to cap memory.
//!
//! The scratch is owned by the parser and reused across calls under a
//! mutex; concurrent incremental parses on one parser serialize here.

use std::collections::HashMap;

use stolyar_core::{Language, ParseAction, StateId, Token};

use crate::tree::{Node, Tree};

/// Sources up to this size use the dense CSR index.
const DENSE_LIMIT: usize = 256 * 1024;

#[derive(Default)]
pub(crate) struct ReuseScratch {
    /// Pre-order (start_byte, node) pairs, the counting-sort input.
    collected: Vec<(u32, Node)>,
    /// CSR bucket offsets, indexed by start byte; `offsets[b]..offsets[b+1]`
    /// addresses `nodes`.
    offsets: Vec<u32>,
    nodes: Vec<Node>,
    map: HashMap<u32, Vec<Node>>,
    dense: bool,
}

impl ReuseScratch {
    /// Rebuild the index from an old tree. The identity fast path —
    /// no edits, root still spans the whole source — registers the root
    /// alone so a clean reparse reuses the entire tree.
    pub fn build(&mut self, old: &Tree, source_len: u32) {
        self.collected.clear();
        self.offsets.clear();
        self.nodes.clear();
        self.map.clear();
        self.dense = (source_len as usize) <= DENSE_LIMIT;

        let Some(root) = old.root_node() else {
            return;
        };

        if old.edits().is_empty() {
            let range = root.range();
            if range.start_byte == 0 && range.end_byte == source_len {
                self.collected.push((range.start_byte, root));
                self.finish(source_len);
                return;
            }
        }

        let mut work = vec![root];
        while let Some(node) = work.pop() {
            let range = node.range();
            if node.is_clean() && !range.is_empty() && range.end_byte <= source_len {
                self.collected.push((range.start_byte, node.clone()));
            }
            // Children in reverse so the worklist pops in source order.
            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    work.push(child);
                }
            }
        }
        self.finish(source_len);
    }

    /// Pack collected pairs into buckets, preserving pre-order within each
    /// start byte (stable counting sort for the dense branch).
    fn finish(&mut self, source_len: u32) {
        if self.dense {
            let buckets = source_len as usize + 1;
            self.offsets.resize(buckets + 1, 0);
            for (start, _) in &self.collected {
                self.offsets[*start as usize + 1] += 1;
            }
            for i in 1..self.offsets.len() {
                self.offsets[i] += self.offsets[i - 1];
            }
            let mut cursors = self.offsets[..buckets].to_vec();
            let mut placed: Vec<Option<Node>> = vec![None; self.collected.len()];
            for (start, node) in self.collected.drain(..) {
                let slot = &mut cursors[start as usize];
                placed[*slot as usize] = Some(node);
                *slot += 1;
            }
            self.nodes.extend(placed.into_iter().flatten());
        } else {
            for (start, node) in self.collected.drain(..) {
                self.map.entry(start).or_default().push(node);
            }
        }
    }

    fn candidates(&self, byte: u32) -> &[Node] {
        if self.dense {
            let i = byte as usize;
            if i + 1 >= self.offsets.len() {
                return &[];
            }
            let lo = self.offsets[i] as usize;
            let hi = self.offsets[i + 1] as usize;
            &self.nodes[lo..hi]
        } else {
            self.map.get(&byte).map(Vec::as_slice).unwrap_or(&[])
        }
    }

    /// Find a graftable subtree starting exactly at the lookahead.
    ///
    /// Leaves need a matching symbol and a shift from `state` (extra
    /// shifts keep the state); non-leaves need a goto. Returns the node
    /// and the state to push it under, plus whether the lookahead token
    /// itself was consumed by the graft.
    pub fn find(
        &self,
        state: StateId,
        lookahead: &Token<'_>,
        language: &Language,
    ) -> Option<ReuseMatch> {
        for node in self.candidates(lookahead.range.start_byte) {
            if node.child_count() == 0 {
                if node.symbol() != lookahead.symbol
                    || node.end_byte() != lookahead.range.end_byte
                {
                    continue;
                }
                let Some(entry) = language.action_entry(state, lookahead.symbol) else {
                    continue;
                };
                if !entry.reusable {
                    continue;
                }
                for action in &entry.actions {
                    if let ParseAction::Shift {
                        state: target,
                        extra,
                        ..
                    } = action
                    {
                        return Some(ReuseMatch {
                            node: node.clone(),
                            state: if *extra { state } else { *target },
                            is_leaf: true,
                        });
                    }
                }
            } else if let Some(target) = language.goto_state(state, node.symbol()) {
                return Some(ReuseMatch {
                    node: node.clone(),
                    state: target,
                    is_leaf: false,
                });
            }
        }
        None
    }
}

pub(crate) struct ReuseMatch {
    pub node: Node,
    pub state: StateId,
    pub is_leaf: bool,
}
