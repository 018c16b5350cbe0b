//! Filter construction, query planning and the query-string codec.
//!
//! # Responsibility
//! - Build boolean predicates from resolved attributes and selections.
//! - Plan and render the project-ID query with idempotent joins.
//! - Encode applied filters to query strings and decode them back.
//!
//! # Invariants
//! - Decoding an encoded filter set and rebuilding it selects the same
//!   projects as the original set.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod codec;
pub mod filter;
pub mod plan;
pub mod predicate;

/// Query planning failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A predicate reads a table with no join path to the root.
    Unreachable(String),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable(table) => {
                write!(f, "table `{table}` cannot be joined to the project query")
            }
        }
    }
}

impl Error for QueryError {}
