use portplan_core::db::migrations::{apply_migrations, latest_version};
use portplan_core::db::{open_db, open_db_in_memory, DbError};
use portplan_core::schema::portfolio::portfolio_catalog;
use portplan_core::CatalogError;
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "description");
    assert_table_exists(&conn, "latest_disposition");
    assert_table_exists(&conn, "stakeholder");
    assert_table_exists(&conn, "strategylist");
}

#[test]
fn current_store_has_no_pending_migrations() {
    let mut conn = open_db_in_memory().unwrap();
    assert_eq!(apply_migrations(&mut conn).unwrap(), 0);

    let mut fresh = Connection::open_in_memory().unwrap();
    assert_eq!(apply_migrations(&mut fresh).unwrap(), latest_version() as usize);
    assert_eq!(schema_version(&fresh), latest_version());
}

#[test]
fn migrated_store_matches_the_catalog() {
    let conn = open_db_in_memory().unwrap();
    portfolio_catalog().unwrap().verify_store(&conn).unwrap();
}

#[test]
fn store_missing_a_declared_column_is_rejected() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE description (projectID INTEGER PRIMARY KEY);")
        .unwrap();

    let err = portfolio_catalog().unwrap().verify_store(&conn).unwrap_err();
    match err {
        CatalogError::MissingStoreColumn { table, column } => {
            assert_eq!(table, "description");
            assert_eq!(column, "name");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portfolio.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    conn_first
        .execute("INSERT INTO description (projectID, name) VALUES (1, 'kept');", [])
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let name: String = conn_second
        .query_row("SELECT name FROM description WHERE projectID = 1;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(name, "kept");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
