//! Query frontend
//!
//! Public queries are dot-delimited. The frontend rewrites them to the
//! trie's slash form, compiles one matcher per segment and hands off to
//! the walker. One wrinkle needs special care: an alternation that
//! contains a separator (`{a.b,c}.x`) cannot be expressed by a single
//! per-segment matcher, because the walker treats the boundary as hard.
//! Such queries are pre-expanded into the Cartesian product of their
//! alternatives and each expansion walks independently.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{QueryError, Result};
use crate::glob::GlobMatcher;
use crate::trie::PathTrie;
use crate::trigram::TrigramSketch;
use crate::walk::walk;

/// How a query run ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOutcome {
    /// Every match was visited
    #[default]
    Complete,
    /// The result cap was reached; the results are a prefix of the
    /// full answer. Informational, not an error.
    LimitReached,
    /// The caller's cancel flag was observed; partial results returned
    Cancelled,
}

/// Matches of one query: paths in public dot form, with a parallel
/// flag telling files from directories
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResults {
    pub paths: Vec<String>,
    pub leaves: Vec<bool>,
    pub outcome: QueryOutcome,
}

/// Per-query knobs
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Result cap; falls back to the index's configured maximum
    pub limit: Option<usize>,
    /// Cooperative cancellation flag, checked between emissions
    pub cancel: Option<Arc<AtomicBool>>,
}

impl QueryOptions {
    pub fn with_limit(limit: usize) -> Self {
        QueryOptions {
            limit: Some(limit),
            ..QueryOptions::default()
        }
    }
}

/// Compile and run one public query against a frozen trie
pub(crate) fn run_query(
    trie: &PathTrie,
    sketch: Option<&TrigramSketch>,
    pattern: &str,
    limit: usize,
    cancel: Option<&AtomicBool>,
) -> Result<QueryResults> {
    let query = pattern.replace('.', "/");
    let globs = if slash_in_braces(&query) {
        expand_braces(&query)?
    } else {
        vec![query]
    };

    // compile everything up front: syntax errors surface before any
    // walking, with no partial results
    let mut compiled = Vec::with_capacity(globs.len());
    for glob in &globs {
        let matchers: Result<Vec<GlobMatcher>> =
            glob.split('/').map(GlobMatcher::compile).collect();
        compiled.push(matchers?);
    }

    let mut results = QueryResults::default();
    for matchers in &compiled {
        let outcome = walk(
            trie,
            sketch,
            matchers,
            limit,
            cancel,
            &mut results.paths,
            &mut results.leaves,
        );
        if outcome != QueryOutcome::Complete {
            results.outcome = outcome;
            break;
        }
    }
    Ok(results)
}

/// True iff a `/` occurs inside an alternation
fn slash_in_braces(query: &str) -> bool {
    let mut nesting = 0usize;
    for b in query.bytes() {
        match b {
            b'{' => nesting += 1,
            b'}' => nesting = nesting.saturating_sub(1),
            b'/' if nesting > 0 => return true,
            _ => {}
        }
    }
    false
}

/// Expand every alternation into the Cartesian product of its
/// alternatives. Nested groups expand through recursion. Balance is
/// validated up front so a malformed query fails before any walk.
pub(crate) fn expand_braces(query: &str) -> Result<Vec<String>> {
    let bytes = query.as_bytes();
    let mut depth = 0i32;
    let mut open = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' => {
                if depth == 0 && open.is_none() {
                    open = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(QueryError::UnexpectedBrace);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(QueryError::UnterminatedBrace);
    }
    let start = match open {
        Some(i) => i,
        None => return Ok(vec![query.to_string()]),
    };

    // matching close of the first group
    let mut close = start;
    let mut d = 0;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'{' => d += 1,
            b'}' => {
                d -= 1;
                if d == 0 {
                    close = i;
                    break;
                }
            }
            _ => {}
        }
    }

    // split the group body at its top-level commas
    let inner = &query[start + 1..close];
    let mut alternatives = Vec::new();
    let mut d = 0;
    let mut last = 0;
    for (i, &b) in inner.as_bytes().iter().enumerate() {
        match b {
            b'{' => d += 1,
            b'}' => d -= 1,
            b',' if d == 0 => {
                alternatives.push(&inner[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    alternatives.push(&inner[last..]);

    let prefix = &query[..start];
    let suffix = &query[close + 1..];
    let mut out = Vec::new();
    for alt in alternatives {
        out.extend(expand_braces(&format!("{}{}{}", prefix, alt, suffix))?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_in_braces() {
        assert!(slash_in_braces("a/{b/c,d}/e"));
        assert!(slash_in_braces("{x{y/z,w},v}"));
        assert!(!slash_in_braces("a/{b,c}/d"));
        assert!(!slash_in_braces("a/b/c"));
    }

    #[test]
    fn test_expand_single_group() {
        assert_eq!(
            expand_braces("a/{b,c}/d").unwrap(),
            vec!["a/b/d", "a/c/d"]
        );
    }

    #[test]
    fn test_expand_cartesian_product() {
        assert_eq!(
            expand_braces("{a,b}/{c,d}").unwrap(),
            vec!["a/c", "a/d", "b/c", "b/d"]
        );
    }

    #[test]
    fn test_expand_nested_groups() {
        assert_eq!(
            expand_braces("x/{a/b,{c,d}}/y").unwrap(),
            vec!["x/a/b/y", "x/c/y", "x/d/y"]
        );
    }

    #[test]
    fn test_expand_without_braces_is_identity() {
        assert_eq!(expand_braces("a/b/c").unwrap(), vec!["a/b/c"]);
    }

    #[test]
    fn test_expand_validates_balance() {
        assert_eq!(
            expand_braces("a/{b,c").unwrap_err(),
            QueryError::UnterminatedBrace
        );
        assert_eq!(
            expand_braces("a/b}").unwrap_err(),
            QueryError::UnexpectedBrace
        );
    }
}
