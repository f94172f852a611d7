// Shared helpers for engine integration tests.
//
// Audit tables are created from hand-assembled column lists: every column
// is left untyped so SQLite keeps integers and text exactly as written.

#![allow(dead_code)]

use revtrail_core::config::{AuditMetadata, StrategyKind};
use revtrail_core::model::{DataMap, EntityId, Value};
use rusqlite::Connection;

pub const STRATEGIES: [StrategyKind; 2] = [StrategyKind::Default, StrategyKind::Validity];

pub fn setup_db(metadata: &AuditMetadata) -> Connection {
    metadata.validate().expect("test metadata must be valid");
    let mut conn = revtrail_store::db::open_in_memory().unwrap();
    revtrail_store::migrations::apply_migrations(&mut conn).unwrap();
    create_audit_tables(&conn, metadata);
    conn
}

pub fn create_audit_tables(conn: &Connection, metadata: &AuditMetadata) {
    let global = &metadata.global;
    let mut temporal = vec![global.revision_field.clone()];
    if global.strategy == StrategyKind::Validity {
        temporal.push(global.revision_end_field.clone());
    }

    for (name, config) in &metadata.entities {
        let mut columns = config.id_fields.clone();
        columns.extend(metadata.audited_state_fields(name).unwrap());
        columns.push(global.revision_type_field.clone());
        columns.extend(temporal.iter().cloned());
        create_table(conn, &config.audit_table, &columns);

        for property in config.collections.keys() {
            let layout = metadata.layout(name, property).unwrap();
            let mut columns = layout.original_id_columns();
            columns.extend(layout.data_columns());
            columns.extend(temporal.iter().cloned());
            create_table(conn, &layout.middle_table, &columns);
        }
    }
}

fn create_table(conn: &Connection, table: &str, columns: &[String]) {
    let columns: Vec<String> = columns.iter().map(|c| format!("\"{}\"", c)).collect();
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" ({});",
        table,
        columns.join(", ")
    ))
    .unwrap();
}

pub fn id(n: i64) -> EntityId {
    EntityId::single("id", n)
}

pub fn state(fields: &[(&str, Value)]) -> DataMap {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |r| {
        r.get(0)
    })
    .unwrap()
}

/// Keys with more than one open row under the validity strategy
pub fn keys_with_several_open_rows(conn: &Connection, table: &str, key_columns: &[String]) -> i64 {
    let key: Vec<String> = key_columns.iter().map(|c| format!("\"{}\"", c)).collect();
    conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM (SELECT 1 FROM \"{}\" WHERE REVEND IS NULL GROUP BY {} HAVING COUNT(*) > 1)",
            table,
            key.join(", ")
        ),
        [],
        |r| r.get(0),
    )
    .unwrap()
}
