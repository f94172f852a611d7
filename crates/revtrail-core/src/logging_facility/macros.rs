//! Operation logging macros.
//!
//! Every event carries `component`, `op` and `event`; end events add
//! `duration_ms`, failures add the error's `err_kind` and `err_code`.

#[doc(hidden)]
#[macro_export]
macro_rules! __audit_event {
    ($level:ident, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        )
    };
}

/// ```
/// # use revtrail_core::log_op_start;
/// log_op_start!("flush");
/// log_op_start!("flush", entity = "Owner");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__audit_event!(
            info,
            $op,
            revtrail_core_types::schema::EVENT_START
            $(, $($field)*)?
        )
    };
}

/// ```
/// # use revtrail_core::log_op_end;
/// log_op_end!("flush", duration_ms = 3);
/// log_op_end!("flush", duration_ms = 3, revision = 7u64);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__audit_event!(
            info,
            $op,
            revtrail_core_types::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Failure of an operation. `$err` is anything convertible into `ExError`.
///
/// ```
/// # use revtrail_core::{log_op_error, AuditError};
/// let err = AuditError::UnknownEntity { entity: "Owner".to_string() };
/// log_op_error!("flush", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let failure: $crate::errors::ExError = $err.into();
        $crate::__audit_event!(
            error,
            $op,
            revtrail_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?failure.kind(),
            err_code = failure.code()
            $(, $($field)*)?
        )
    }};
}
