//! Error types for metron
//!
//! This module defines the errors that can occur while compiling
//! a query or talking to an index handle.

use thiserror::Error;

/// Errors that can occur during query compilation and dispatch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Two consecutive dots, or a leading/trailing dot, in a query
    #[error("empty segment in query")]
    EmptySegment,

    /// A character class was opened with `[` but never closed
    #[error("glob: missing ]")]
    UnterminatedClass,

    /// An alternation was opened with `{` but never closed
    #[error("glob: missing }}")]
    UnterminatedBrace,

    /// A `}` with no matching `{`
    #[error("glob: unexpected }}")]
    UnexpectedBrace,

    /// A query was issued against a handle that has never been published
    #[error("no index has been published yet")]
    NotFinalized,
}

/// Result type for index operations
pub type Result<T> = std::result::Result<T, QueryError>;
