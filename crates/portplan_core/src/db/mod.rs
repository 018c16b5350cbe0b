//! Portfolio store access.
//!
//! # Responsibility
//! - Hand out SQLite connections to the project portfolio store.
//! - Install the `casefold` SQL function text search relies on.
//! - Stamp the store with the schema version the catalog was written for.
//!
//! # Invariants
//! - Callers only ever see a connection whose schema is current.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod functions;
pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to open or upgrade the portfolio store.
#[derive(Debug)]
pub enum DbError {
    /// SQLite rejected a statement, pragma or function registration.
    Sqlite(rusqlite::Error),
    /// `user_version` names a schema step this binary does not know; the
    /// store is left as found.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "portfolio store error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "portfolio store is at schema version {db_version}; this build reads up to {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
