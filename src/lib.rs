//! Metron: a path index for graphite-style metric trees
//!
//! This crate answers glob queries over large sets of slash-delimited
//! paths, presented to users as dot-delimited metric names. Paths live
//! in a compressed radix trie; each query segment compiles to a small
//! NFA that the walker simulates while descending the trie, and an
//! optional trigram sketch lets the walker skip whole subtrees when a
//! segment starts with `*` followed by literal text.
//!
//! Build once, query concurrently:
//!
//! ```
//! use metron::IndexBuilder;
//!
//! let mut builder = IndexBuilder::new(".wsp");
//! builder.insert("/service-00/server-000/cpu.wsp");
//! builder.insert("/service-00/server-001/cpu.wsp");
//! let index = builder.finalize(true);
//!
//! let results = index.query("service-00.server-00[0-1].cpu", 100).unwrap();
//! assert_eq!(results.paths.len(), 2);
//! ```

pub mod errors;
pub mod glob;
pub mod index;
pub mod nfa;
pub mod query;
pub mod trie;
pub mod trigram;
pub mod walk;

// Re-export commonly used items for convenience
pub use errors::{QueryError, Result};
pub use glob::GlobMatcher;
pub use index::{Index, IndexBuilder, IndexConfig, IndexHandle};
pub use query::{QueryOptions, QueryOutcome, QueryResults};
pub use trie::PathTrie;
pub use trigram::{TrigramSketch, DEFAULT_SAMPLING_FACTOR};
