//! RevTrail Engine - unit-of-work and read-path orchestration
//!
//! Wires the pure audit core to the SQLite store:
//! - [`AuditProcess`] collects the changes of one host unit of work and
//!   writes them under a single freshly allocated revision
//! - [`AuditReader`] answers "what did this look like at revision R"
//!
//! ## Logging Ownership
//!
//! This layer owns lifecycle logging (`log_op_start!` / `log_op_end!` /
//! `log_op_error!`). The core and the store only emit `tracing::debug!`
//! and `tracing::trace!` details.

pub mod process;
pub mod reader;
mod work;

pub use process::AuditProcess;
pub use reader::AuditReader;
