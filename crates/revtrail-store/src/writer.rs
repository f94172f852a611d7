//! Application of buffered audit writes.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::query::to_sql;
use crate::sql::quote_ident;
use revtrail_core::model::WriteOp;
use rusqlite::types::ToSql;
use rusqlite::Connection;

/// Apply writes in order; returns the number of rows affected.
///
/// Callers pass the committing transaction. Closing an interval that
/// matches no open row is not an error.
pub fn apply_write_ops(conn: &Connection, ops: &[WriteOp]) -> Result<usize> {
    let mut affected = 0;
    for op in ops {
        affected += match op {
            WriteOp::Insert { table, row } => {
                let columns: Vec<String> = row.keys().map(|c| quote_ident(c)).collect();
                let placeholders: Vec<String> = (1..=row.len()).map(|i| format!("?{}", i)).collect();
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    quote_ident(table),
                    columns.join(", "),
                    placeholders.join(", ")
                );
                let values: Vec<rusqlite::types::Value> = row.values().map(to_sql).collect();
                let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
                conn.execute(&sql, params.as_slice()).map_err(from_rusqlite)?
            }
            WriteOp::CloseInterval {
                table,
                key,
                end_field,
                end_revision,
            } => {
                let mut conditions = vec![format!("{} IS NULL", quote_ident(end_field))];
                conditions.extend(
                    key.keys()
                        .enumerate()
                        .map(|(i, c)| format!("{} IS ?{}", quote_ident(c), i + 2)),
                );
                let sql = format!(
                    "UPDATE {} SET {} = ?1 WHERE {}",
                    quote_ident(table),
                    quote_ident(end_field),
                    conditions.join(" AND ")
                );
                let mut values = vec![rusqlite::types::Value::Integer(end_revision.number() as i64)];
                values.extend(key.values().map(to_sql));
                let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
                let closed = conn.execute(&sql, params.as_slice()).map_err(from_rusqlite)?;
                if closed == 0 {
                    tracing::trace!(table = %table, "no open row to close");
                }
                closed
            }
        };
    }
    Ok(affected)
}
