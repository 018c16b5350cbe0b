//! Portfolio store schema steps.
//!
//! # Responsibility
//! - Create the portfolio working tables, their controlled vocabularies and
//!   the project-to-vocabulary association tables.
//! - Bring an older store forward to the layout the schema catalog declares.
//!
//! # Invariants
//! - Steps run in ascending `version` order, all inside one transaction.
//! - `PRAGMA user_version` records the last step that committed.
//! - A store stamped beyond [`latest_version`] is never touched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "portfolio_tables",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "vocabulary_links",
        sql: include_str!("0002_associations.sql"),
    },
];

/// Schema version this binary writes and understands.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings the store at `conn` up to [`latest_version`].
///
/// Returns how many steps were applied; `0` for a store that is already
/// current.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the store was stamped by a newer binary.
/// - `Sqlite` when a step fails; the store keeps its previous version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let store_version = current_user_version(conn)?;
    let latest = latest_version();
    if store_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: store_version,
            latest_supported: latest,
        });
    }

    let pending = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > store_version)
        .collect::<Vec<_>>();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", step.version))?;
    }
    tx.commit()?;

    for step in &pending {
        info!(
            "event=db_migrate module=db status=ok version={} step={}",
            step.version, step.name
        );
    }
    Ok(pending.len())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}
