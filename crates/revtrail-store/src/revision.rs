//! Revision ledger.
//!
//! Revisions are allocated once per committing unit of work, inside the
//! committing transaction, so a rolled-back flush leaves no revision
//! behind.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use revtrail_core::model::Revision;
use rusqlite::{Connection, OptionalExtension};

/// Allocate the next revision, stamped with the current time
pub fn allocate(conn: &Connection) -> Result<Revision> {
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute("INSERT INTO revinfo (revtstmp) VALUES (?1)", [now])
        .map_err(from_rusqlite)?;
    let rev = conn.last_insert_rowid();
    tracing::debug!(revision = rev, "allocated revision");
    Ok(Revision(rev as u64))
}

/// Highest allocated revision, if any
pub fn latest(conn: &Connection) -> Result<Option<Revision>> {
    let rev: Option<i64> = conn
        .query_row("SELECT MAX(rev) FROM revinfo", [], |row| row.get(0))
        .map_err(from_rusqlite)?;
    Ok(rev.map(|r| Revision(r as u64)))
}

/// Commit time of a revision, in milliseconds since the epoch
pub fn timestamp_of(conn: &Connection, revision: Revision) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT revtstmp FROM revinfo WHERE rev = ?1",
        [revision.number() as i64],
        |row| row.get(0),
    )
    .optional()
    .map_err(from_rusqlite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::apply_migrations;

    #[test]
    fn test_revisions_increase() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();

        assert_eq!(latest(&conn).unwrap(), None);
        let first = allocate(&conn).unwrap();
        let second = allocate(&conn).unwrap();
        assert!(second > first);
        assert_eq!(latest(&conn).unwrap(), Some(second));
        assert!(timestamp_of(&conn, first).unwrap().is_some());
        assert_eq!(timestamp_of(&conn, Revision(99)).unwrap(), None);
    }

    #[test]
    fn test_rolled_back_allocation_is_discarded() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        {
            let tx = conn.transaction().unwrap();
            allocate(&tx).unwrap();
            tx.rollback().unwrap();
        }
        assert_eq!(latest(&conn).unwrap(), None);
    }
}
