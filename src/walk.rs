//! Joint trie walk and NFA simulation
//!
//! The walker descends the trie depth-first, feeding label bytes to the
//! active segment matcher. Each matcher owns a stack of DFA-states that
//! grows one entry per byte on the way down and shrinks on the way
//! back up, so backtracking never re-simulates a prefix. Crossing a
//! boundary node hands over to the next matcher; retreating across it
//! hands back, with the outer matcher's stack untouched in between.
//!
//! All walk state lives here, not on the compiled matchers: concurrent
//! queries over the same frozen index each bring their own scratch.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::glob::GlobMatcher;
use crate::nfa::StateId;
use crate::query::QueryOutcome;
use crate::trie::{Label, NodeId, PathTrie};
use crate::trigram::TrigramSketch;

/// One matcher's simulation stack
struct SimStack {
    stack: Vec<Vec<StateId>>,
}

impl SimStack {
    fn new(start: &[StateId]) -> Self {
        SimStack {
            stack: vec![start.to_vec()],
        }
    }

    fn reset(&mut self, start: &[StateId]) {
        self.stack.clear();
        self.stack.push(start.to_vec());
    }

    fn top(&self) -> &[StateId] {
        &self.stack[self.stack.len() - 1]
    }

    fn push(&mut self, dfa: Vec<StateId>) {
        self.stack.push(dfa);
    }

    /// Drop `n` entries, never below the initial one
    fn pop(&mut self, n: usize) {
        if self.stack.len() <= n {
            self.stack.truncate(1);
        } else {
            let keep = self.stack.len() - n;
            self.stack.truncate(keep);
        }
    }
}

#[derive(PartialEq)]
enum Flow {
    Continue,
    Stop,
}

/// Run the compiled matchers over the trie, appending matches to
/// `paths`/`leaves` until `limit` total entries have accumulated.
#[allow(clippy::too_many_arguments)]
pub(crate) fn walk(
    trie: &PathTrie,
    sketch: Option<&TrigramSketch>,
    matchers: &[GlobMatcher],
    limit: usize,
    cancel: Option<&AtomicBool>,
    paths: &mut Vec<String>,
    leaves: &mut Vec<bool>,
) -> QueryOutcome {
    let sims: Vec<SimStack> = matchers.iter().map(|m| SimStack::new(m.start())).collect();
    let mut walker = Walker {
        trie,
        sketch,
        matchers,
        sims,
        path: Vec::with_capacity(trie.depth() + 1),
        limit,
        exact: matchers.iter().all(|m| m.exact()),
        cancel,
        paths,
        leaves,
        outcome: QueryOutcome::Complete,
    };
    walker.visit_children(trie.root(), 0);
    walker.outcome
}

struct Walker<'a> {
    trie: &'a PathTrie,
    sketch: Option<&'a TrigramSketch>,
    matchers: &'a [GlobMatcher],
    sims: Vec<SimStack>,
    path: Vec<u8>,
    limit: usize,
    exact: bool,
    cancel: Option<&'a AtomicBool>,
    paths: &'a mut Vec<String>,
    leaves: &'a mut Vec<bool>,
    outcome: QueryOutcome,
}

impl<'a> Walker<'a> {
    fn matched(&self, m: usize) -> bool {
        self.matchers[m].nfa().matched(self.sims[m].top())
    }

    /// Visit the children of `node` with matcher `m` active
    fn visit_children(&mut self, node: NodeId, m: usize) -> Flow {
        let trie = self.trie;
        let matchers = self.matchers;
        for ci in 0..trie.children(node).len() {
            let child = trie.children(node)[ci];
            match trie.label(child) {
                Label::FileMark | Label::Root => {}
                Label::Slash => {
                    // only cross the boundary when the current segment
                    // is fully matched and another matcher remains
                    if m + 1 >= matchers.len() || !self.matched(m) {
                        continue;
                    }
                    self.sims[m + 1].reset(matchers[m + 1].start());
                    self.path.push(b'.');
                    let flow = self.visit_children(child, m + 1);
                    self.path.pop();
                    if flow == Flow::Stop {
                        return Flow::Stop;
                    }
                }
                Label::Fragment(bytes) => {
                    let matcher = &matchers[m];
                    if matcher.leading_star_complex() && !matcher.trigrams().is_empty() {
                        if let Some(sketch) = self.sketch {
                            // an unsketched node is not prunable
                            if let Some(bag) = sketch.bag(child) {
                                if matcher.trigrams().iter().any(|t| !bag.contains(t)) {
                                    continue;
                                }
                            }
                        }
                    }

                    let mut pushed = 0;
                    let mut dead = false;
                    for &b in bytes.iter() {
                        let next = matcher.nfa().step(self.sims[m].top(), b);
                        if next.is_empty() {
                            dead = true;
                            break;
                        }
                        self.sims[m].push(next);
                        pushed += 1;
                    }
                    if dead {
                        self.sims[m].pop(pushed);
                        continue;
                    }

                    self.path.extend_from_slice(bytes);
                    let flow = if m + 1 < matchers.len() {
                        self.visit_children(child, m)
                    } else {
                        self.visit_terminal(child, m)
                    };
                    self.path.truncate(self.path.len() - bytes.len());
                    self.sims[m].pop(bytes.len());
                    if flow == Flow::Stop {
                        return Flow::Stop;
                    }
                }
            }
        }
        Flow::Continue
    }

    /// The last matcher has consumed this node's label: decide whether
    /// the node terminates a metric, emit, and keep descending for
    /// longer sibling extensions.
    fn visit_terminal(&mut self, node: NodeId, m: usize) -> Flow {
        let trie = self.trie;
        let mut has_file = false;
        let mut has_dir = false;
        let mut has_more = false;
        for &c in trie.children(node) {
            match trie.label(c) {
                Label::FileMark => has_file = true,
                Label::Slash => has_dir = true,
                Label::Fragment(_) => has_more = true,
                Label::Root => {}
            }
        }

        if !(has_file || has_dir) {
            return self.visit_children(node, m);
        }
        if !self.matched(m) {
            if has_more {
                return self.visit_children(node, m);
            }
            return Flow::Continue;
        }

        if let Some(cancel) = self.cancel {
            if cancel.load(Ordering::Relaxed) {
                self.outcome = QueryOutcome::Cancelled;
                return Flow::Stop;
            }
        }
        if has_file && self.emit(true) == Flow::Stop {
            return Flow::Stop;
        }
        if has_dir && self.emit(false) == Flow::Stop {
            return Flow::Stop;
        }
        if self.exact {
            return Flow::Stop;
        }
        if has_more {
            return self.visit_children(node, m);
        }
        Flow::Continue
    }

    fn emit(&mut self, leaf: bool) -> Flow {
        if self.paths.len() >= self.limit {
            self.outcome = QueryOutcome::LimitReached;
            return Flow::Stop;
        }
        self.paths
            .push(String::from_utf8_lossy(&self.path).into_owned());
        self.leaves.push(leaf);
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glob::GlobMatcher;

    fn compile_all(pattern: &str) -> Vec<GlobMatcher> {
        pattern
            .split('/')
            .map(|s| GlobMatcher::compile(s).unwrap())
            .collect()
    }

    fn run(trie: &PathTrie, pattern: &str, limit: usize) -> (Vec<String>, Vec<bool>, QueryOutcome) {
        let matchers = compile_all(pattern);
        let mut paths = Vec::new();
        let mut leaves = Vec::new();
        let outcome = walk(trie, None, &matchers, limit, None, &mut paths, &mut leaves);
        (paths, leaves, outcome)
    }

    fn sample_trie() -> PathTrie {
        let mut trie = PathTrie::new(".wsp");
        trie.insert("/svc/host-a/cpu.wsp");
        trie.insert("/svc/host-b/cpu.wsp");
        trie.insert("/svc/host-b/mem.wsp");
        trie
    }

    #[test]
    fn test_walk_exact_path() {
        let trie = sample_trie();
        let (paths, leaves, outcome) = run(&trie, "svc/host-a/cpu", usize::MAX);
        assert_eq!(paths, vec!["svc.host-a.cpu"]);
        assert_eq!(leaves, vec![true]);
        assert_eq!(outcome, QueryOutcome::Complete);
    }

    #[test]
    fn test_walk_star_lists_directories() {
        let trie = sample_trie();
        let (mut paths, leaves, _) = run(&trie, "svc/*", usize::MAX);
        paths.sort();
        assert_eq!(paths, vec!["svc.host-a", "svc.host-b"]);
        assert!(leaves.iter().all(|&leaf| !leaf));
    }

    #[test]
    fn test_walk_limit_is_strict() {
        let trie = sample_trie();
        let (paths, _, outcome) = run(&trie, "svc/*/[cm]*", 2);
        assert_eq!(paths.len(), 2);
        assert_eq!(outcome, QueryOutcome::LimitReached);
    }

    #[test]
    fn test_walk_cancel_returns_partial() {
        let trie = sample_trie();
        let matchers = compile_all("svc/*/*");
        let cancel = AtomicBool::new(true);
        let mut paths = Vec::new();
        let mut leaves = Vec::new();
        let outcome = walk(
            &trie,
            None,
            &matchers,
            usize::MAX,
            Some(&cancel),
            &mut paths,
            &mut leaves,
        );
        assert_eq!(outcome, QueryOutcome::Cancelled);
        assert!(paths.is_empty());
    }

    #[test]
    fn test_walk_emits_both_file_and_directory() {
        let mut trie = PathTrie::new(".wsp");
        trie.insert("/a/b.wsp");
        trie.insert("/a/b/c.wsp");
        let (paths, leaves, _) = run(&trie, "a/b", usize::MAX);
        assert_eq!(paths, vec!["a.b", "a.b"]);
        assert_eq!(leaves, vec![true, false]);
    }

    #[test]
    fn test_sim_stack_pop_floors_at_one() {
        let mut stack = SimStack::new(&[]);
        stack.push(Vec::new());
        stack.push(Vec::new());
        stack.pop(5);
        assert_eq!(stack.stack.len(), 1);
    }
}
