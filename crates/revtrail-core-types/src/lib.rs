//! Types shared by the revtrail crates that carry no audit semantics.
//!
//! - **Correlation**: [`RequestId`], [`TraceId`] and [`RequestContext`], one per
//!   host unit of work
//! - **Schema constants**: canonical structured-log field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{RequestContext, RequestId, TraceId};
