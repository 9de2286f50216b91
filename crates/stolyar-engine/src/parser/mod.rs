//! GLR parser.
//!
//! The parse loop drives one decision per iteration: fetch (or keep) a
//! lookahead, try the incremental fast path, then dispatch the action
//! entry on every live stack. Multiple actions fork the stack; stacks
//! converging on one top state merge down to the highest
//! dynamic-precedence survivor. Parsing is total — recovery inserts
//! synthetic error leaves rather than failing — and bounded by
//! size-scaled caps on iterations, stack depth, and node allocations, so
//! every call returns a tree.

pub(crate) mod reuse;
mod stack;

#[cfg(test)]
mod reuse_tests;

use std::sync::{Arc, Mutex, MutexGuard};

use stolyar_core::{
    FIELD_NONE, FieldId, Language, ParseAction, Point, Range, SYMBOL_ERROR, StateId, Symbol, Token,
};

use crate::lexer::Lexer;
use crate::tokens::TokenSource;
use crate::trace::{NoopTracer, ParseTracer};
use crate::tree::{Node, NodeAlloc, Tree, arena};

use reuse::ReuseScratch;
use stack::{ParseStack, StackEntry};

/// Bounds on one parse. The stack cap prevents combinatorial blowup on
/// pathological grammars; the remaining caps scale with input size and
/// turn runaway parses into best-effort trees.
#[derive(Debug, Clone, Copy)]
pub struct ParserLimits {
    max_stacks: usize,
    max_consecutive_reduces: u32,
    depth_base: usize,
    depth_per_byte: usize,
    node_base: usize,
    nodes_per_byte: usize,
    iteration_base: usize,
    iterations_per_byte: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_stacks: 64,
            max_consecutive_reduces: 10,
            depth_base: 1000,
            depth_per_byte: 2,
            node_base: 50_000,
            nodes_per_byte: 10,
            iteration_base: 10_000,
            iterations_per_byte: 20,
        }
    }
}

impl ParserLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap on simultaneously live stacks.
    pub fn max_stacks(mut self, max: usize) -> Self {
        self.max_stacks = max.max(1);
        self
    }

    /// Consecutive same-state reduces tolerated before the lookahead is
    /// forcibly advanced.
    pub fn max_consecutive_reduces(mut self, max: u32) -> Self {
        self.max_consecutive_reduces = max;
        self
    }

    /// Primary-stack depth cap: `max(base, per_byte · input length)`.
    pub fn depth_cap_scaling(mut self, base: usize, per_byte: usize) -> Self {
        self.depth_base = base;
        self.depth_per_byte = per_byte;
        self
    }

    /// Node-allocation cap: `max(base, per_byte · input length)`.
    pub fn node_cap_scaling(mut self, base: usize, per_byte: usize) -> Self {
        self.node_base = base;
        self.nodes_per_byte = per_byte;
        self
    }

    /// Iteration cap: `max(base, per_byte · input length)`.
    pub fn iteration_cap_scaling(mut self, base: usize, per_byte: usize) -> Self {
        self.iteration_base = base;
        self.iterations_per_byte = per_byte;
        self
    }

    fn depth_cap(&self, source_len: usize) -> usize {
        self.depth_base.max(self.depth_per_byte * source_len)
    }

    fn node_cap(&self, source_len: usize) -> usize {
        self.node_base.max(self.nodes_per_byte * source_len)
    }

    fn iteration_cap(&self, source_len: usize) -> usize {
        self.iteration_base.max(self.iterations_per_byte * source_len)
    }
}

/// A reusable parser for one language.
///
/// One parser runs one parse at a time; distinct parsers are fully
/// independent. Two incremental parses issued concurrently through a
/// shared parser serialize on the reuse scratch below.
pub struct Parser {
    language: Arc<Language>,
    limits: ParserLimits,
    reuse_scratch: Mutex<ReuseScratch>,
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Parser {
    pub fn new(language: Arc<Language>) -> Self {
        Self {
            language,
            limits: ParserLimits::default(),
            reuse_scratch: Mutex::new(ReuseScratch::default()),
        }
    }

    pub fn with_limits(mut self, limits: ParserLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    /// Parse with the built-in DFA lexer.
    pub fn parse(&self, source: &str) -> Tree {
        self.parse_traced(source, &mut NoopTracer)
    }

    pub fn parse_traced<T: ParseTracer>(&self, source: &str, tracer: &mut T) -> Tree {
        let mut lexer = Lexer::new(source, self.language.clone());
        let mut tree = self.run(source, &mut lexer, None, tracer);
        tree.set_scanner_state(lexer.serialize_scanner());
        tree
    }

    /// Parse with a caller-supplied token source (custom lexer bridge).
    pub fn parse_with<'s>(&self, source: &'s str, tokens: &mut (dyn TokenSource<'s> + 's)) -> Tree {
        self.parse_with_traced(source, tokens, &mut NoopTracer)
    }

    pub fn parse_with_traced<'s, T: ParseTracer>(
        &self,
        source: &'s str,
        tokens: &mut (dyn TokenSource<'s> + 's),
        tracer: &mut T,
    ) -> Tree {
        self.run(source, tokens, None, tracer)
    }

    /// Reparse after edits, reusing clean subtrees of `old`.
    pub fn parse_incremental(&self, source: &str, old: &Tree) -> Tree {
        self.parse_incremental_traced(source, old, &mut NoopTracer)
    }

    pub fn parse_incremental_traced<T: ParseTracer>(
        &self,
        source: &str,
        old: &Tree,
        tracer: &mut T,
    ) -> Tree {
        if old.edits().is_empty() && old.source() == source {
            return old.clone();
        }
        let mut lexer =
            Lexer::new(source, self.language.clone()).with_scanner_state(old.scanner_state());
        let mut tree = self.run(source, &mut lexer, Some(old), tracer);
        tree.set_scanner_state(lexer.serialize_scanner());
        tree
    }

    pub fn parse_incremental_with<'s>(
        &self,
        source: &'s str,
        old: &Tree,
        tokens: &mut (dyn TokenSource<'s> + 's),
    ) -> Tree {
        if old.edits().is_empty() && old.source() == source {
            return old.clone();
        }
        self.run(source, tokens, Some(old), &mut NoopTracer)
    }

    fn run<'s, T: ParseTracer>(
        &self,
        source: &'s str,
        tokens: &mut (dyn TokenSource<'s> + 's),
        old: Option<&Tree>,
        tracer: &mut T,
    ) -> Tree {
        let language = &self.language;
        let source_len = source.len() as u32;
        let kind = if old.is_some() {
            arena::ArenaKind::Incremental
        } else {
            arena::ArenaKind::FullParse
        };
        let mut alloc = NodeAlloc::new(arena::acquire(kind));

        let reuse: Option<MutexGuard<'_, ReuseScratch>> = old.map(|tree| {
            let mut scratch = self.reuse_scratch.lock().unwrap();
            scratch.build(tree, source_len);
            scratch
        });
        let mut reused_any = false;

        let depth_cap = self.limits.depth_cap(source.len());
        let node_cap = self.limits.node_cap(source.len());
        let iteration_cap = self.limits.iteration_cap(source.len());

        let initial = language.initial_state();
        let mut stacks = vec![ParseStack::new(initial)];
        let mut finished: Vec<ParseStack> = Vec::new();
        let mut best_dead: Option<ParseStack> = None;
        let mut lookahead: Option<Token<'s>> = None;
        let mut iterations = 0usize;

        loop {
            iterations += 1;
            if iterations > iteration_cap {
                tracer.cap_hit("iterations");
                break;
            }

            // Retire dead and finished stacks; keep the best dead one as a
            // last-resort result.
            let mut alive = Vec::with_capacity(stacks.len());
            for stack in stacks.drain(..) {
                if stack.dead {
                    keep_better_dead(&mut best_dead, stack);
                } else if stack.accepted {
                    finished.push(stack);
                } else {
                    alive.push(stack);
                }
            }
            stacks = alive;
            if stacks.is_empty() {
                break;
            }

            // Best-first order; a stable sort keeps table order on ties,
            // then stacks converging on one top state merge down to the
            // highest-precedence survivor.
            stacks.sort_by_key(|s| std::cmp::Reverse(s.score));
            dedup_stacks(&mut stacks);
            if stacks.len() > self.limits.max_stacks {
                stacks.truncate(self.limits.max_stacks);
            }
            if stacks[0].entries.len() > depth_cap {
                tracer.cap_hit("depth");
                break;
            }
            if alloc.count() > node_cap {
                tracer.cap_hit("nodes");
                break;
            }

            // Fetch a token unless the previous iteration reduced.
            if lookahead.is_none() {
                tokens.set_mode(language.lex_mode(stacks[0].state));
                let token = tokens.next_token();
                tracer.token(&token);
                for stack in &mut stacks {
                    stack.shifted = false;
                }
                lookahead = Some(token);
            }
            let la = lookahead.unwrap();

            // Incremental fast path: graft a clean old subtree that starts
            // exactly at the lookahead.
            if stacks.len() == 1
                && !stacks[0].shifted
                && let Some(scratch) = reuse.as_deref()
                && let Some(m) = scratch.find(stacks[0].state, &la, language)
            {
                tracer.reuse(m.node.symbol(), m.node.end_byte());
                let end = m.node.end_byte();
                let is_leaf = m.is_leaf;
                let extra = m.node.is_extra();
                stacks[0].push(m.state, m.node, extra);
                reused_any = true;

                tokens.set_mode(language.lex_mode(stacks[0].state));
                let token = if is_leaf {
                    tokens.next_token()
                } else {
                    tokens.skip_to_byte(end)
                };
                tracer.token(&token);
                stacks[0].shifted = false;
                lookahead = Some(token);
                continue;
            }

            let mut any_reduced = false;
            let mut force_advance = false;
            let round = stacks.len();
            for idx in 0..round {
                if !stacks[idx].alive() || stacks[idx].shifted {
                    continue;
                }
                let actions = language.actions(stacks[idx].state, la.symbol);

                if actions.is_empty() {
                    if la.is_eof() {
                        // Exhausted input with nothing left to do: this
                        // stack is finished. When several stacks finish
                        // this way, best-stack selection picks the
                        // highest-precedence survivor.
                        stacks[idx].accepted = true;
                        continue;
                    }
                    if let Some((keep, target)) = self.find_recover(&stacks[idx], la.symbol) {
                        self.apply_recover(&mut stacks[idx], keep, target, &la, &mut alloc, tracer);
                        continue;
                    }
                    if alive_count(&stacks) > 1 {
                        stacks[idx].dead = true;
                        continue;
                    }
                    // Lone stack: swallow the lookahead into an error leaf
                    // and keep going.
                    tracer.error_leaf(la.range.start_byte);
                    let leaf = alloc.error_leaf(la.range);
                    let top = stacks[idx].state;
                    stacks[idx].push(top, leaf, true);
                    stacks[idx].shifted = true;
                    continue;
                }

                // Fork before the original is mutated; forks take the
                // remaining actions in table order.
                for action in &actions[1..] {
                    tracer.fork(actions.len());
                    let mut fork = stacks[idx].fork();
                    let accepted = self.apply_action(
                        &mut fork,
                        action,
                        &la,
                        &mut alloc,
                        &mut any_reduced,
                        &mut force_advance,
                        tracer,
                    );
                    if accepted {
                        return self.finish_tree(fork, source, alloc, old, reused_any);
                    }
                    stacks.push(fork);
                }
                let accepted = self.apply_action(
                    &mut stacks[idx],
                    &actions[0],
                    &la,
                    &mut alloc,
                    &mut any_reduced,
                    &mut force_advance,
                    tracer,
                );
                if accepted {
                    let stack = stacks.swap_remove(idx);
                    return self.finish_tree(stack, source, alloc, old, reused_any);
                }
            }

            // A reduce re-examines the same lookahead from the new top
            // state, unless the watchdog broke a reduce cycle.
            if !any_reduced || force_advance {
                lookahead = None;
            }
        }

        let mut pool = finished;
        pool.append(&mut stacks);
        if let Some(dead) = best_dead {
            pool.push(dead);
        }
        let best = select_best(pool);
        match best {
            Some(stack) => self.finish_tree(stack, source, alloc, old, reused_any),
            None => Tree::new(
                None,
                Arc::from(source),
                self.language.clone(),
                alloc.into_arena(),
                Vec::new(),
            ),
        }
    }

    fn apply_action<T: ParseTracer>(
        &self,
        stack: &mut ParseStack,
        action: &ParseAction,
        la: &Token<'_>,
        alloc: &mut NodeAlloc,
        any_reduced: &mut bool,
        force_advance: &mut bool,
        tracer: &mut T,
    ) -> bool {
        match action {
            ParseAction::Shift {
                state,
                extra,
                repetition: _,
            } => {
                let leaf = alloc.leaf(la, *extra, &self.language);
                if *extra {
                    // Extras attach without a state change.
                    let top = stack.state;
                    stack.push(top, leaf, true);
                } else {
                    stack.push(*state, leaf, false);
                }
                stack.shifted = true;
                stack.reduce_watch.1 = 0;
                tracer.shift(stack.state, *extra);
                false
            }
            ParseAction::Reduce {
                symbol,
                child_count,
                dynamic_precedence,
                production_id,
            } => {
                tracer.reduce(*symbol, *child_count);
                self.reduce(stack, *symbol, *child_count, *production_id, la, alloc);
                stack.score += *dynamic_precedence as i64;
                *any_reduced = true;

                if stack.reduce_watch.0 == stack.state {
                    stack.reduce_watch.1 += 1;
                    if stack.reduce_watch.1 > self.limits.max_consecutive_reduces {
                        // Empty productions can reduce forever at one
                        // state; force the token stream forward.
                        *force_advance = true;
                        stack.reduce_watch.1 = 0;
                    }
                } else {
                    stack.reduce_watch = (stack.state, 1);
                }
                false
            }
            ParseAction::Accept => {
                stack.accepted = true;
                tracer.accept();
                true
            }
            ParseAction::Recover { state } => {
                let leaf = alloc.error_leaf(la.range);
                stack.push(*state, leaf, false);
                stack.shifted = true;
                tracer.recover(*state);
                false
            }
        }
    }

    /// Pop `child_count` structural entries (extras in between come along),
    /// assemble the parent, and push it under the goto state.
    fn reduce(
        &self,
        stack: &mut ParseStack,
        symbol: Symbol,
        child_count: u16,
        production_id: stolyar_core::ProductionId,
        la: &Token<'_>,
        alloc: &mut NodeAlloc,
    ) {
        let language = &self.language;
        let initial = language.initial_state();

        let mut keep = stack.entries.len();
        let mut counted = 0u16;
        while keep > 0 && counted < child_count {
            keep -= 1;
            if !stack.entries[keep].extra {
                counted += 1;
            }
        }
        let removed = stack.entries.split_off(keep);

        let field_map = language.field_map(production_id);
        let mut children: Vec<(Node, FieldId)> = Vec::with_capacity(removed.len());
        let mut structural_index = 0u16;
        for entry in removed {
            let mut field = FIELD_NONE;
            if !entry.extra {
                for fm in field_map {
                    if fm.child_index == structural_index && !fm.inherited {
                        field = fm.field_id;
                        break;
                    }
                }
                structural_index += 1;
            }

            let splice = !entry.extra
                && entry.node.symbol() != SYMBOL_ERROR
                && entry.node.child_count() > 0
                && !language.symbol_metadata(entry.node.symbol()).visible;
            if splice {
                // Hidden nodes dissolve; their children join the parent.
                for child in entry.node.children() {
                    children.push((child, FIELD_NONE));
                }
            } else {
                children.push((entry.node, field));
            }
        }

        let fallback = Range::empty_at(la.range.start_byte, la.range.start_point);
        let top_state = stack.state_below(stack.entries.len(), initial);
        match language.goto_state(top_state, symbol) {
            Some(target) => {
                let parent = alloc.parent(symbol, production_id, children, false, fallback, language);
                stack.push(target, parent, false);
            }
            None => {
                // Missed goto: keep the material rather than the state
                // machine — push under the current top, flagged as
                // erroneous.
                let parent = alloc.parent(symbol, production_id, children, true, fallback, language);
                stack.push(top_state, parent, false);
            }
        }
    }

    /// Scan down the stack for an enclosing state with a `Recover` action
    /// on this lookahead. Returns how many entries to keep and the state
    /// to recover into.
    fn find_recover(&self, stack: &ParseStack, symbol: Symbol) -> Option<(usize, StateId)> {
        let initial = self.language.initial_state();
        for keep in (0..stack.entries.len()).rev() {
            let state = stack.state_below(keep, initial);
            for action in self.language.actions(state, symbol) {
                if let ParseAction::Recover { state: target } = action {
                    return Some((keep, *target));
                }
            }
        }
        None
    }

    /// Truncate to the recovery point, folding the cut-off entries and
    /// the offending lookahead into one error node.
    fn apply_recover<T: ParseTracer>(
        &self,
        stack: &mut ParseStack,
        keep: usize,
        target: StateId,
        la: &Token<'_>,
        alloc: &mut NodeAlloc,
        tracer: &mut T,
    ) {
        let removed: Vec<StackEntry> = stack.entries.split_off(keep);
        let error_leaf = alloc.error_leaf(la.range);
        let mut children: Vec<(Node, FieldId)> = removed
            .into_iter()
            .map(|entry| (entry.node, FIELD_NONE))
            .collect();
        children.push((error_leaf, FIELD_NONE));
        let parent = alloc.parent(SYMBOL_ERROR, 0, children, true, la.range, &self.language);
        stack.push(target, parent, false);
        stack.shifted = true;
        tracer.recover(target);
    }

    fn finish_tree(
        &self,
        stack: ParseStack,
        source: &str,
        mut alloc: NodeAlloc,
        old: Option<&Tree>,
        reused_any: bool,
    ) -> Tree {
        let language = &self.language;
        let nodes: Vec<Node> = stack.entries.into_iter().map(|entry| entry.node).collect();
        let structural = nodes.iter().filter(|n| !n.is_extra()).count();

        let root = match nodes.len() {
            0 => None,
            1 => nodes.into_iter().next(),
            _ if structural == 1 => {
                // Stray extras around a clean root: rebuild the root with
                // the extras folded into its children, byte-ordered.
                let anchor = nodes
                    .iter()
                    .find(|n| !n.is_extra())
                    .cloned()
                    .expect("structural root present");
                if anchor.child_count() == 0 {
                    Some(self.glue_roots(nodes, &mut alloc))
                } else {
                    let mut merged: Vec<(Node, FieldId)> = Vec::new();
                    for (i, child) in anchor.children().enumerate() {
                        merged.push((child, anchor.field_id_at(i)));
                    }
                    for node in nodes.into_iter().filter(|n| n.is_extra()) {
                        merged.push((node, FIELD_NONE));
                    }
                    merged.sort_by_key(|(node, _)| node.start_byte());
                    let fallback = anchor.range();
                    Some(alloc.parent(
                        anchor.symbol(),
                        anchor.production_id(),
                        merged,
                        anchor.has_error(),
                        fallback,
                        language,
                    ))
                }
            }
            _ => Some(self.glue_roots(nodes, &mut alloc)),
        };

        let retained = if reused_any {
            old.map(Tree::reusable_arenas).unwrap_or_default()
        } else {
            Vec::new()
        };
        Tree::new(
            root,
            Arc::from(source),
            self.language.clone(),
            alloc.into_arena(),
            retained,
        )
    }

    /// Multiple surviving roots glue under a synthetic error node.
    fn glue_roots(&self, nodes: Vec<Node>, alloc: &mut NodeAlloc) -> Node {
        let children: Vec<(Node, FieldId)> =
            nodes.into_iter().map(|node| (node, FIELD_NONE)).collect();
        let fallback = Range::empty_at(0, Point::ZERO);
        alloc.parent(SYMBOL_ERROR, 0, children, true, fallback, &self.language)
    }
}

fn alive_count(stacks: &[ParseStack]) -> usize {
    stacks.iter().filter(|s| s.alive()).count()
}

fn keep_better_dead(best: &mut Option<ParseStack>, stack: ParseStack) {
    let better = match best {
        None => true,
        Some(current) => stack.score > current.score,
    };
    if better {
        *best = Some(stack);
    }
}

/// Drop all but the first (highest-score) stack per `(state, shifted)`
/// pair. Stacks that already consumed the lookahead sit at a different
/// input position, so they never merge with ones that haven't.
fn dedup_stacks(stacks: &mut Vec<ParseStack>) {
    let mut seen: Vec<(StateId, bool)> = Vec::with_capacity(stacks.len());
    stacks.retain(|stack| {
        let key = (stack.state, stack.shifted);
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

/// Accepted beats alive beats dead; then score, then weight; ties keep
/// the earliest in iteration order.
fn select_best(pool: Vec<ParseStack>) -> Option<ParseStack> {
    let mut best: Option<ParseStack> = None;
    for stack in pool {
        let better = match &best {
            None => true,
            Some(current) => rank(&stack) > rank(current),
        };
        if better {
            best = Some(stack);
        }
    }
    best
}

fn rank(stack: &ParseStack) -> (bool, bool, i64, usize) {
    (
        stack.accepted,
        !stack.dead,
        stack.score,
        stack.entries.len(),
    )
}
