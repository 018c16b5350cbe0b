//! Read-only repositories over the portfolio store.
//!
//! # Responsibility
//! - Keep SQLite query details out of the resolver and report layers.
//! - Load vocabulary choices, matching project IDs and per-project values.
//!
//! # Invariants
//! - Repositories never write; every statement is a `SELECT`.
//! - Store failures propagate as `RepoError::Db` without retry.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod project_repo;
pub mod vocabulary_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for store reads.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Persisted rows do not match the declared catalog.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
