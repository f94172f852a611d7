//! Execution of bound logical queries.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, query_error, unsupported_value, Result};
use crate::sql::compile;
use revtrail_core::model::Value;
use revtrail_core::query::{BoundQuery, ResultRow};
use rusqlite::types::{ToSql, ValueRef};
use rusqlite::Connection;

/// Convert an audit value into a SQLite value
pub fn to_sql(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Int(i) => rusqlite::types::Value::Integer(*i),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
    }
}

/// Convert a SQLite value into an audit value
pub fn from_sql(column: &str, value: ValueRef<'_>) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Int(i)),
        ValueRef::Text(bytes) => Ok(Value::Text(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Real(_) => Err(unsupported_value(column, "real")),
        ValueRef::Blob(_) => Err(unsupported_value(column, "blob")),
    }
}

/// Compile and run a bound query, splitting each row per projected alias
pub fn execute(conn: &Connection, bound: &BoundQuery) -> Result<Vec<ResultRow>> {
    for name in bound.query.filter.params() {
        if bound.param(&name).is_none() {
            return Err(query_error(format!("parameter :{} is not bound", name)));
        }
    }

    let compiled = compile(conn, &bound.query)?;
    tracing::trace!(sql = %compiled.sql, "executing audit query");

    let mut stmt = conn.prepare(&compiled.sql).map_err(from_rusqlite)?;
    let names: Vec<String> = bound.params.iter().map(|(n, _)| format!(":{}", n)).collect();
    let values: Vec<rusqlite::types::Value> = bound.params.iter().map(|(_, v)| to_sql(v)).collect();
    let mut params: Vec<(&str, &dyn ToSql)> = Vec::with_capacity(names.len());
    for (name, value) in names.iter().zip(&values) {
        // Bound but unused parameters are skipped; SQLite rejects them.
        if stmt.parameter_index(name).map_err(from_rusqlite)?.is_some() {
            params.push((name.as_str(), value as &dyn ToSql));
        }
    }

    let mut rows = stmt.query(params.as_slice()).map_err(from_rusqlite)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(from_rusqlite)? {
        let mut result = ResultRow::default();
        for (i, (alias, column)) in compiled.columns.iter().enumerate() {
            let value = from_sql(column, row.get_ref(i).map_err(from_rusqlite)?)?;
            result
                .values
                .entry(alias.clone())
                .or_default()
                .insert(column.clone(), value);
        }
        out.push(result);
    }

    tracing::debug!(row_count = out.len(), "audit query returned");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use revtrail_core::query::{Operand, Predicate, QueryBuilder};
    use std::sync::Arc;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER, name TEXT);
             INSERT INTO t VALUES (1, 'a'), (2, NULL);",
        )
        .unwrap();
        conn
    }

    fn by_id() -> Arc<revtrail_core::query::LogicalQuery> {
        let mut qb = QueryBuilder::new("t", "e");
        qb.add_restriction(Predicate::equals(
            Operand::column("e", "id"),
            Operand::param("id"),
        ));
        Arc::new(qb.build())
    }

    #[test]
    fn test_rows_split_per_alias() {
        let conn = conn();
        let bound = BoundQuery {
            query: by_id(),
            params: vec![("id".to_string(), Value::Int(2))],
        };
        let rows = execute(&conn, &bound).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value("e", "id"), Some(&Value::Int(2)));
        assert_eq!(rows[0].value("e", "name"), Some(&Value::Null));
    }

    #[test]
    fn test_unbound_parameter() {
        let conn = conn();
        let bound = BoundQuery {
            query: by_id(),
            params: Vec::new(),
        };
        let err = execute(&conn, &bound).unwrap_err();
        assert_eq!(err.kind(), revtrail_core::ExErrorKind::InvalidInput);
    }
}
