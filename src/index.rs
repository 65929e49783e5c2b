//! Index building, querying and publication
//!
//! The index lives through three phases: a single owner feeds paths to
//! an [`IndexBuilder`], freezes it with [`IndexBuilder::finalize`], and
//! publishes the resulting [`Index`] through an [`IndexHandle`]. From
//! then on the index is read-only and any number of queries may run
//! against it concurrently; a rescan builds a brand-new index and
//! republishes, while in-flight queries keep the old one alive through
//! their `Arc`.

use std::sync::{Arc, RwLock};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{QueryError, Result};
use crate::query::{run_query, QueryOptions, QueryResults};
use crate::trie::PathTrie;
use crate::trigram::{TrigramSketch, DEFAULT_SAMPLING_FACTOR};

/// Configuration for an index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Extension (dot included) that marks a path as a file; stripped
    /// before indexing and never stored
    pub file_extension: String,
    /// Depth-sampling factor for the trigram sketch
    pub trigram_factor: usize,
    /// Default cap on results per query
    pub max_globbed: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            file_extension: ".wsp".to_string(),
            trigram_factor: DEFAULT_SAMPLING_FACTOR,
            max_globbed: 30_000,
        }
    }
}

/// Accumulates paths into a trie before it is frozen
#[derive(Debug)]
pub struct IndexBuilder {
    trie: PathTrie,
    config: IndexConfig,
}

impl IndexBuilder {
    /// Create a builder for files carrying `extension` (e.g. `".wsp"`)
    pub fn new(extension: &str) -> Self {
        IndexBuilder::with_config(IndexConfig {
            file_extension: extension.to_string(),
            ..IndexConfig::default()
        })
    }

    pub fn with_config(config: IndexConfig) -> Self {
        IndexBuilder {
            trie: PathTrie::new(&config.file_extension),
            config,
        }
    }

    /// Insert one slash-delimited path
    pub fn insert(&mut self, path: &str) {
        self.trie.insert(path);
    }

    /// Freeze the trie, optionally building the trigram sketch.
    /// Consuming the builder makes inserting into or re-finalizing a
    /// frozen index unrepresentable.
    pub fn finalize(self, build_trigrams: bool) -> Index {
        let sketch = if build_trigrams {
            Some(TrigramSketch::build(&self.trie, self.config.trigram_factor))
        } else {
            None
        };
        let (nodes, depth) = self.trie.stat();
        debug!(
            "index finalized: {} files, {} nodes, depth {}, sketched nodes {}",
            self.trie.file_count(),
            nodes,
            depth,
            sketch.as_ref().map(|s| s.len()).unwrap_or(0),
        );
        Index {
            trie: self.trie,
            sketch,
            config: self.config,
        }
    }
}

/// A frozen, queryable path index
#[derive(Debug)]
pub struct Index {
    trie: PathTrie,
    sketch: Option<TrigramSketch>,
    config: IndexConfig,
}

impl Index {
    /// Run a dot-delimited glob query, returning at most `limit`
    /// entries
    pub fn query(&self, pattern: &str, limit: usize) -> Result<QueryResults> {
        self.query_with(pattern, &QueryOptions::with_limit(limit))
    }

    /// Run a query with explicit options
    pub fn query_with(&self, pattern: &str, opts: &QueryOptions) -> Result<QueryResults> {
        let limit = opts.limit.unwrap_or(self.config.max_globbed);
        debug!("query {:?} limit {}", pattern, limit);
        run_query(
            &self.trie,
            self.sketch.as_ref(),
            pattern,
            limit,
            opts.cancel.as_deref(),
        )
    }

    /// Every indexed file in public dot form
    pub fn all_metrics(&self) -> Vec<String> {
        self.trie.all_metrics()
    }

    pub fn file_count(&self) -> usize {
        self.trie.file_count()
    }

    /// Node count and max byte depth of the underlying trie
    pub fn stat(&self) -> (usize, usize) {
        self.trie.stat()
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }
}

/// Publication point for the current index. Readers grab an `Arc` once
/// per query; a republish swaps the pointer and old readers finish on
/// the index they started with.
#[derive(Default)]
pub struct IndexHandle {
    current: RwLock<Option<Arc<Index>>>,
}

impl IndexHandle {
    pub fn new() -> Self {
        IndexHandle::default()
    }

    /// Swap in a freshly built index
    pub fn publish(&self, index: Index) {
        let mut current = self.current.write().unwrap();
        *current = Some(Arc::new(index));
    }

    /// The live index, or [`QueryError::NotFinalized`] when nothing
    /// has been published yet
    pub fn current(&self) -> Result<Arc<Index>> {
        self.current
            .read()
            .unwrap()
            .clone()
            .ok_or(QueryError::NotFinalized)
    }
}
