//! Pattern matching over syntax trees.
//!
//! The tree walk is an explicit worklist — error-recovery trees get deep
//! enough that recursing per node is not acceptable. Per node, only
//! patterns admitted by the root-symbol dispatch index are tried; the
//! per-pattern step walk recurses over the pattern (bounded by query
//! size, not tree size).

use regex_automata::Input;
use regex_automata::dfa::Automaton;

use stolyar_core::Language;
use stolyar_engine::{Node, Tree};

use crate::pattern::{AltBranch, EqOperand, Pattern, Predicate, Step, StepKind};
use crate::Query;

/// One pattern match: which pattern fired and what it captured.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub pattern_index: usize,
    pub captures: Vec<QueryCapture>,
}

/// One captured node. `index` points into [`Query::capture_names`].
#[derive(Debug, Clone)]
pub struct QueryCapture {
    pub index: u16,
    pub node: Node,
}

impl QueryMatch {
    /// First node captured under `index`.
    pub fn capture(&self, index: u16) -> Option<&Node> {
        self.captures
            .iter()
            .find(|c| c.index == index)
            .map(|c| &c.node)
    }
}

impl Query {
    /// Run the query over a whole tree. Predicates evaluate against the
    /// tree's source.
    pub fn execute(&self, tree: &Tree) -> Vec<QueryMatch> {
        let Some(root) = tree.root_node() else {
            return Vec::new();
        };
        self.execute_inner(&root, tree.language(), Some(tree.source()))
    }

    /// Run the query over one subtree. With no source buffer available,
    /// predicate-bearing patterns conservatively never match.
    pub fn execute_node(&self, node: &Node, language: &Language) -> Vec<QueryMatch> {
        self.execute_inner(node, language, None)
    }

    fn execute_inner(
        &self,
        root: &Node,
        language: &Language,
        source: Option<&str>,
    ) -> Vec<QueryMatch> {
        let mut matches = Vec::new();
        let mut work = vec![root.clone()];
        while let Some(node) = work.pop() {
            if let Some(bucket) = self.buckets.get(&node.symbol()) {
                for &pattern in bucket {
                    self.try_pattern(pattern, &node, language, source, &mut matches);
                }
            }
            for &pattern in &self.fallback {
                self.try_pattern(pattern, &node, language, source, &mut matches);
            }
            for index in (0..node.child_count()).rev() {
                if let Some(child) = node.child(index) {
                    work.push(child);
                }
            }
        }
        matches
    }

    fn try_pattern(
        &self,
        pattern_index: usize,
        node: &Node,
        language: &Language,
        source: Option<&str>,
        matches: &mut Vec<QueryMatch>,
    ) {
        let pattern = &self.patterns[pattern_index];
        let mut captures = Vec::new();
        if !match_step(pattern, 0, node, language, &mut captures) {
            return;
        }
        if !predicates_hold(pattern, &captures, source) {
            return;
        }
        matches.push(QueryMatch {
            pattern_index,
            captures,
        });
    }
}

fn match_step(
    pattern: &Pattern,
    index: usize,
    node: &Node,
    language: &Language,
    captures: &mut Vec<QueryCapture>,
) -> bool {
    let step = &pattern.steps[index];
    if !step_matches(step, node, language) {
        return false;
    }
    if let Some(capture) = step.capture {
        captures.push(QueryCapture {
            index: capture,
            node: node.clone(),
        });
    }

    for child_index in pattern.child_steps(index) {
        let child_step = &pattern.steps[child_index];
        if let Some(field) = child_step.field {
            // Field-constrained: the parent's field lookup picks the
            // child; no search.
            let Some(child) = node.child_by_field_id(field) else {
                return false;
            };
            if !match_step(pattern, child_index, &child, language, captures) {
                return false;
            }
        } else {
            let mark = captures.len();
            let mut satisfied = false;
            for child in node.children() {
                if match_step(pattern, child_index, &child, language, captures) {
                    satisfied = true;
                    break;
                }
                captures.truncate(mark);
            }
            if !satisfied {
                return false;
            }
        }
    }
    true
}

fn step_matches(step: &Step, node: &Node, language: &Language) -> bool {
    match &step.kind {
        StepKind::Wildcard { named_only } => !named_only || node.is_named(),
        StepKind::Text(literal) => !node.is_named() && node.kind(language) == literal,
        StepKind::Symbol { symbol, named } => {
            node.symbol() == *symbol && node.is_named() == *named
        }
        StepKind::Alternation(branches) => branches.iter().any(|branch| match branch {
            AltBranch::Wildcard => true,
            AltBranch::Symbol { symbol, named } => {
                node.symbol() == *symbol && node.is_named() == *named
            }
            AltBranch::Text(literal) => !node.is_named() && node.kind(language) == literal,
        }),
    }
}

fn predicates_hold(pattern: &Pattern, captures: &[QueryCapture], source: Option<&str>) -> bool {
    if pattern.predicates.is_empty() {
        return true;
    }
    // No source buffer: cannot read captured text, so fail closed.
    let Some(source) = source else {
        return false;
    };

    let text_of = |index: u16| -> Option<&str> {
        captures
            .iter()
            .find(|c| c.index == index)
            .map(|c| c.node.text(source))
    };

    pattern.predicates.iter().all(|predicate| match predicate {
        Predicate::Eq { capture, operand } => {
            let Some(text) = text_of(*capture) else {
                return false;
            };
            match operand {
                EqOperand::Literal(literal) => text == literal,
                EqOperand::Capture(other) => match text_of(*other) {
                    Some(other_text) => text == other_text,
                    None => false,
                },
            }
        }
        Predicate::Match { capture, dfa } => {
            let Some(text) = text_of(*capture) else {
                return false;
            };
            let input = Input::new(text);
            matches!(dfa.try_search_fwd(&input), Ok(Some(_)))
        }
    })
}
