//! Store error constructors.
//!
//! Every store failure is an [`ExError`]; SQLite errors map to `Persistence`.

use revtrail_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// A logical query that cannot be compiled or bound
pub fn query_error(reason: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::InvalidInput)
        .with_op("query_compile")
        .with_message(reason)
}

/// A table referenced by a query or write does not exist
pub fn unknown_table(table: &str) -> ExError {
    ExError::new(ExErrorKind::NotFound)
        .with_op("table_columns")
        .with_message(format!("Table {} does not exist", table))
}

/// A stored value the audit model cannot represent
pub fn unsupported_value(column: &str, sql_type: &str) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("read_row")
        .with_message(format!(
            "Column {} holds a {} value, expected integer, text or null",
            column, sql_type
        ))
}
