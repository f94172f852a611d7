//! Structured-log vocabulary shared by every revtrail crate.
//!
//! Operation events are emitted through the `log_op_*` macros of
//! `revtrail-core`; the `event` field takes one of the values below.

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

/// Fields present on every operation event
pub const OPERATION_FIELDS: &[&str] = &["component", "op", "event"];

/// Fields added to an `end` or `end_error` event
pub const COMPLETION_FIELDS: &[&str] = &["duration_ms"];

/// Fields added to an `end_error` event, taken from the `ExError`
pub const FAILURE_FIELDS: &[&str] = &["err_kind", "err_code"];
