//! Revision ledger schema.
//!
//! Each step is embedded SQL with a stable id. Its SHA-256 digest is stored
//! in `ledger_migrations` when applied; a step whose stored digest no longer
//! matches the embedded SQL is refused, never re-run.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use revtrail_core::errors::{ExError, ExErrorKind};
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    sql: &'static str,
}

impl Migration {
    /// Hex SHA-256 of the embedded SQL
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.sql.as_bytes()))
    }
}

/// Ledger steps in application order
pub const LEDGER_MIGRATIONS: &[Migration] = &[Migration {
    id: "001_revision_info",
    sql: include_str!("../migrations/001_revision_info.sql"),
}];

const BOOKKEEPING: &str = "CREATE TABLE IF NOT EXISTS ledger_migrations (
    id TEXT PRIMARY KEY,
    sha256 TEXT NOT NULL,
    applied_at INTEGER NOT NULL
)";

fn step_failed(migration: &Migration, reason: String) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("apply_migrations")
        .with_message(format!("ledger step {}: {}", migration.id, reason))
}

/// Bring the revision ledger up to date.
///
/// Returns how many steps were applied; zero on an up-to-date database.
///
/// # Errors
///
/// `Persistence` if a step fails to apply or an applied step was altered.
pub fn apply_migrations(conn: &mut Connection) -> Result<usize> {
    conn.execute_batch(BOOKKEEPING).map_err(from_rusqlite)?;

    let mut applied = 0;
    for migration in LEDGER_MIGRATIONS {
        let digest = migration.digest();
        let stored: Option<String> = conn
            .query_row(
                "SELECT sha256 FROM ledger_migrations WHERE id = ?1",
                [migration.id],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;

        match stored {
            Some(stored) if stored == digest => continue,
            Some(stored) => {
                return Err(step_failed(
                    migration,
                    format!("recorded digest {} differs from {}", stored, digest),
                ))
            }
            None => {}
        }

        let tx = conn.transaction().map_err(from_rusqlite)?;
        tx.execute_batch(migration.sql)
            .map_err(|e| step_failed(migration, e.to_string()))?;
        tx.execute(
            "INSERT INTO ledger_migrations (id, sha256, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![migration.id, digest, chrono::Utc::now().timestamp()],
        )
        .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;
        applied += 1;
    }

    if applied > 0 {
        tracing::info!(applied, "revision ledger migrated");
    }
    Ok(applied)
}
