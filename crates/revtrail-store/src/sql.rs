//! Compilation of logical queries to SQLite.
//!
//! Identifiers are always double-quoted. Parameters compile to `:name`.
//! Each projected alias expands to all of its table's columns, selected as
//! `"alias.column"` so rows can be split back per alias.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, unknown_table, Result};
use revtrail_core::model::Value;
use revtrail_core::query::{CmpOp, ColumnRef, FromEntry, LogicalQuery, Operand, Predicate};
use rusqlite::Connection;

/// SQL text plus the `(alias, column)` of each selected column, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub columns: Vec<(String, String)>,
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Column names of a table, in declaration order
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(from_rusqlite)?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    if columns.is_empty() {
        return Err(unknown_table(table));
    }
    Ok(columns)
}

fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

fn column(c: &ColumnRef) -> String {
    format!("{}.{}", quote_ident(&c.alias), quote_ident(&c.column))
}

fn from_entry(f: &FromEntry) -> String {
    format!("{} AS {}", quote_ident(&f.table), quote_ident(&f.alias))
}

fn operand(op: &Operand) -> String {
    match op {
        Operand::Column(c) => column(c),
        Operand::Param(name) => format!(":{}", name),
        Operand::Literal(v) => literal(v),
        Operand::Subquery(sub) => format!(
            "(SELECT MAX({}) FROM {} WHERE {})",
            column(&sub.max_of),
            from_entry(&sub.from),
            predicate(&sub.filter)
        ),
    }
}

fn cmp(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "=",
        CmpOp::Ne => "<>",
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
        CmpOp::NullSafeEq => "IS",
    }
}

pub fn predicate(p: &Predicate) -> String {
    match p {
        Predicate::And(ps) if ps.is_empty() => "1 = 1".to_string(),
        Predicate::Or(ps) if ps.is_empty() => "1 = 0".to_string(),
        Predicate::And(ps) => join(ps, " AND "),
        Predicate::Or(ps) => join(ps, " OR "),
        Predicate::Compare { left, op, right } => {
            format!("{} {} {}", operand(left), cmp(*op), operand(right))
        }
        Predicate::IsNull(o) => format!("{} IS NULL", operand(o)),
    }
}

fn join(ps: &[Predicate], sep: &str) -> String {
    let parts: Vec<String> = ps.iter().map(predicate).collect();
    format!("({})", parts.join(sep))
}

/// Compile a logical query against the live schema
pub fn compile(conn: &Connection, query: &LogicalQuery) -> Result<CompiledQuery> {
    let mut select = Vec::new();
    let mut columns = Vec::new();
    for alias in &query.projection {
        let table = query
            .table_of(alias)
            .ok_or_else(|| crate::errors::query_error(format!("projected alias {} is not in FROM", alias)))?;
        for name in table_columns(conn, table)? {
            select.push(format!(
                "{} AS {}",
                column(&ColumnRef::new(alias.as_str(), name.as_str())),
                quote_ident(&format!("{}.{}", alias, name))
            ));
            columns.push((alias.clone(), name));
        }
    }

    let from: Vec<String> = query.from.iter().map(from_entry).collect();
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select.join(", "),
        from.join(", "),
        predicate(&query.filter)
    );
    if !query.order_by.is_empty() {
        let order: Vec<String> = query.order_by.iter().map(column).collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));
    }
    Ok(CompiledQuery { sql, columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use revtrail_core::query::QueryBuilder;

    #[test]
    fn test_null_safe_and_subquery() {
        let mut qb = QueryBuilder::new("items", "ee");
        qb.add_restriction(Predicate::compare(
            Operand::column("ee", "code"),
            CmpOp::NullSafeEq,
            Operand::param("code"),
        ));
        let p = qb.build().filter;
        assert_eq!(predicate(&p), "(\"ee\".\"code\" IS :code)");
    }

    #[test]
    fn test_compile_expands_projection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER, name TEXT);")
            .unwrap();
        let mut qb = QueryBuilder::new("t", "e");
        qb.add_order(ColumnRef::new("e", "id"));
        let compiled = compile(&conn, &qb.build()).unwrap();
        assert_eq!(
            compiled.columns,
            vec![
                ("e".to_string(), "id".to_string()),
                ("e".to_string(), "name".to_string())
            ]
        );
        assert_eq!(
            compiled.sql,
            "SELECT \"e\".\"id\" AS \"e.id\", \"e\".\"name\" AS \"e.name\" \
             FROM \"t\" AS \"e\" WHERE 1 = 1 ORDER BY \"e\".\"id\""
        );
    }

    #[test]
    fn test_unknown_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = table_columns(&conn, "missing").unwrap_err();
        assert_eq!(err.kind(), revtrail_core::ExErrorKind::NotFound);
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(literal(&Value::from("it's")), "'it''s'");
        assert_eq!(literal(&Value::Null), "NULL");
    }
}
