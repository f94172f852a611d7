// Integration tests for the revision ledger schema

use rusqlite::Connection;
use tempfile::TempDir;

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    // Given: An empty SQLite database
    let mut conn = setup_test_db();

    // When: Migrations are applied
    let result = revtrail_store::migrations::apply_migrations(&mut conn);

    // Then: The revision ledger exists
    assert!(result.is_ok(), "Migrations should succeed: {:?}", result.err());
    let tables = get_table_names(&conn);
    assert!(tables.contains(&"ledger_migrations".to_string()));
    assert!(tables.contains(&"revinfo".to_string()));
}

#[test]
fn test_migrations_are_idempotent() {
    // Given: A migrated database
    let mut conn = setup_test_db();
    revtrail_store::migrations::apply_migrations(&mut conn).unwrap();

    // When: Migrations are applied again
    revtrail_store::migrations::apply_migrations(&mut conn).unwrap();

    // Then: Each migration is recorded once
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM ledger_migrations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_open_migrated_file_survives_reopen() {
    // Given: A database file with one allocated revision
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("audit.db");
    {
        let conn = revtrail_store::db::open_migrated(&path).unwrap();
        revtrail_store::revision::allocate(&conn).unwrap();
    }

    // When: The file is reopened
    let conn = revtrail_store::db::open_migrated(&path).unwrap();

    // Then: The revision is still there and the next one follows it
    let latest = revtrail_store::revision::latest(&conn).unwrap().unwrap();
    let next = revtrail_store::revision::allocate(&conn).unwrap();
    assert_eq!(next.number(), latest.number() + 1);
}
