//! Buffered writes handed to the storage collaborator at commit.

use crate::model::revision::Revision;
use crate::model::value::DataMap;

/// A single storage mutation produced by an audit strategy.
///
/// The core never executes these; the storage collaborator applies them in
/// order inside the committing transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert one audit row
    Insert { table: String, row: DataMap },
    /// Set `end_field = end_revision` on rows of `table` matching `key`
    /// (null-safe) whose `end_field` is still null. Matching nothing is
    /// not an error.
    CloseInterval {
        table: String,
        key: DataMap,
        end_field: String,
        end_revision: Revision,
    },
}

impl WriteOp {
    pub fn table(&self) -> &str {
        match self {
            WriteOp::Insert { table, .. } | WriteOp::CloseInterval { table, .. } => table,
        }
    }
}
