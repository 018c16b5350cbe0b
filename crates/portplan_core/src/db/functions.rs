//! SQL functions registered on every store connection.
//!
//! # Invariants
//! - `casefold(x)` lowercases text with full Unicode case mapping.
//! - `casefold(NULL)` is `NULL`; numbers fold to their decimal text.

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use rusqlite::Connection;

/// Name under which [`register_functions`] installs the case folder.
pub const CASEFOLD_FUNCTION: &str = "casefold";

/// Installs the engine's scalar functions on `conn`.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        CASEFOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        casefold,
    )
}

fn casefold(ctx: &Context<'_>) -> rusqlite::Result<Option<String>> {
    let folded = match ctx.get_raw(0) {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).to_lowercase())
        }
    };
    Ok(folded)
}

#[cfg(test)]
mod tests {
    use super::register_functions;
    use rusqlite::Connection;

    fn fold(conn: &Connection, sql: &str) -> Option<String> {
        conn.query_row(sql, [], |row| row.get(0))
            .expect("casefold query should run")
    }

    #[test]
    fn casefold_lowercases_beyond_ascii() {
        let conn = Connection::open_in_memory().expect("in-memory store");
        register_functions(&conn).expect("functions register");

        assert_eq!(
            fold(&conn, "SELECT casefold('ÉCONOMIE Über');"),
            Some("économie über".to_string())
        );
        assert_eq!(fold(&conn, "SELECT casefold(42);"), Some("42".to_string()));
        assert_eq!(fold(&conn, "SELECT casefold(NULL);"), None);
    }
}
