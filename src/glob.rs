//! Glob segment compiler
//!
//! This module compiles a single query segment (no separator inside)
//! into an NFA plus the flags the walker needs: whether the segment is
//! exact, and whether it starts with a `*` followed by real content,
//! which enables trigram pruning of whole subtrees.
//!
//! Supported syntax: literal bytes, `?` (one byte), `*` (zero or more
//! bytes, runs collapse), `[abc]` / `[a-z]` / `[^...]` classes negated
//! against the printable range, and nestable `{a,b}` alternations. A
//! comma outside an alternation is an ordinary byte.

use crate::errors::{QueryError, Result};
use crate::nfa::{Accept, ByteSet, Nfa, StateId, MATCH};
use crate::trigram::query_trigrams;

/// A compiled segment matcher
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    expr: String,
    nfa: Nfa,
    start: Vec<StateId>,
    exact: bool,
    leading_star_complex: bool,
    trigrams: Vec<u32>,
}

impl GlobMatcher {
    /// Compile one segment glob
    pub fn compile(expr: &str) -> Result<GlobMatcher> {
        if expr.is_empty() {
            return Err(QueryError::EmptySegment);
        }

        let bytes = expr.as_bytes();
        let mut nfa = Nfa::new();
        let root = nfa.add(Accept::Split);
        let mut cur = root;
        let mut alters: Vec<(StateId, StateId)> = Vec::new();
        let mut exact = true;
        let mut leading_star_complex = false;

        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'[' => {
                    exact = false;
                    let (set, close) = parse_class(bytes, i + 1)?;
                    i = close;
                    cur = chain(&mut nfa, cur, Accept::Class(set));
                }
                b'?' => {
                    exact = false;
                    cur = chain(&mut nfa, cur, Accept::Any);
                }
                b'*' => {
                    exact = false;
                    if i == 0 && bytes.iter().any(|&b| b != b'*') {
                        leading_star_complex = true;
                    }
                    // runs of stars collapse to one loop
                    while i + 1 < bytes.len() && bytes[i + 1] == b'*' {
                        i += 1;
                    }
                    let split = nfa.add(Accept::Split);
                    let star = nfa.add(Accept::Any);
                    nfa.push_edge(split, star);
                    nfa.push_edge(star, split);
                    nfa.push_edge(cur, split);
                    cur = split;
                }
                b'{' => {
                    exact = false;
                    let start = nfa.add(Accept::Split);
                    let end = nfa.add(Accept::Split);
                    nfa.push_edge(cur, start);
                    cur = start;
                    alters.push((start, end));
                }
                b'}' => match alters.pop() {
                    Some((_, end)) => {
                        nfa.push_edge(cur, end);
                        cur = end;
                    }
                    None => return Err(QueryError::UnexpectedBrace),
                },
                b',' => match alters.last() {
                    Some(&(start, end)) => {
                        nfa.push_edge(cur, end);
                        cur = start;
                    }
                    None => {
                        cur = chain_literal(&mut nfa, cur, b',');
                    }
                },
                b => {
                    cur = chain_literal(&mut nfa, cur, b);
                }
            }
            i += 1;
        }
        nfa.push_edge(cur, MATCH);

        if !alters.is_empty() {
            return Err(QueryError::UnterminatedBrace);
        }

        let mut start = Vec::new();
        nfa.closure_into(&mut start, root);

        let trigrams = if leading_star_complex {
            query_trigrams(expr)
        } else {
            Vec::new()
        };

        Ok(GlobMatcher {
            expr: expr.to_string(),
            nfa,
            start,
            exact,
            leading_star_complex,
            trigrams,
        })
    }

    /// The original segment expression
    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn nfa(&self) -> &Nfa {
        &self.nfa
    }

    /// The initial DFA-state (epsilon closure of the compiled root)
    pub fn start(&self) -> &[StateId] {
        &self.start
    }

    /// True iff the segment contains no wildcard, class or alternation
    pub fn exact(&self) -> bool {
        self.exact
    }

    /// True iff the segment starts with `*` and has further content
    pub fn leading_star_complex(&self) -> bool {
        self.leading_star_complex
    }

    /// Trigrams every match of this segment must contain (only
    /// populated for leading-star segments)
    pub fn trigrams(&self) -> &[u32] {
        &self.trigrams
    }

    /// Run the matcher against a whole segment in one go. The walker
    /// drives the NFA byte by byte instead; this is the standalone form.
    pub fn matches(&self, segment: &str) -> bool {
        let mut dfa = self.start.clone();
        for &b in segment.as_bytes() {
            dfa = self.nfa.step(&dfa, b);
            if dfa.is_empty() {
                return false;
            }
        }
        self.nfa.matched(&dfa)
    }
}

fn chain(nfa: &mut Nfa, cur: StateId, accept: Accept) -> StateId {
    let s = nfa.add(accept);
    nfa.push_edge(cur, s);
    s
}

fn chain_literal(nfa: &mut Nfa, cur: StateId, b: u8) -> StateId {
    let mut set = ByteSet::new();
    set.insert(b);
    chain(nfa, cur, Accept::Class(set))
}

/// Parse a character class starting right after the `[`. Returns the
/// byte set and the index of the closing `]`. A `-` with no range
/// partner (first in the class, or right before the `]`) is a literal.
fn parse_class(bytes: &[u8], mut i: usize) -> Result<(ByteSet, usize)> {
    if i >= bytes.len() {
        return Err(QueryError::UnterminatedClass);
    }
    let negative = bytes[i] == b'^';
    if negative {
        i += 1;
    }

    let mut set = ByteSet::new();
    let mut prev: Option<u8> = None;
    while i < bytes.len() && bytes[i] != b']' {
        if bytes[i] == b'-' {
            if let Some(lo) = prev {
                if i + 1 < bytes.len() && bytes[i + 1] != b']' {
                    set.insert_range(lo, bytes[i + 1]);
                    prev = None;
                    i += 2;
                    continue;
                }
            }
            set.insert(b'-');
            prev = Some(b'-');
            i += 1;
            continue;
        }
        set.insert(bytes[i]);
        prev = Some(bytes[i]);
        i += 1;
    }
    if i >= bytes.len() {
        return Err(QueryError::UnterminatedClass);
    }

    if negative {
        set.negate();
    }
    Ok((set, i))
}
