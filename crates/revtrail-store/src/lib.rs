//! RevTrail Store - SQLite storage collaborator for the audit core
//!
//! Provides:
//! - Connection management and embedded, checksummed migrations
//! - The revision ledger and revision allocation
//! - Compilation of logical queries to SQLite and their execution
//! - Application of buffered audit writes

pub mod db;
pub mod errors;
pub mod migrations;
pub mod query;
pub mod revision;
pub mod sql;
pub mod writer;

// Re-export key types
pub use errors::Result;
