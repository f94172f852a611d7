//! Identity diff engine.
//!
//! Computes which members were added to and removed from a collection
//! between two snapshots.
//!
//! ## Guarantees
//!
//! - **Bag semantics**: duplicates count; `[a, a]` against `[a]` removes
//!   one `a`.
//! - **Fresh hashing**: each call rebuilds its hash structures from the
//!   snapshots it is given, never from state captured earlier.
//! - **Absent snapshots**: `None` on either side is the empty collection.

pub mod engine;

pub use engine::{diff, diff_snapshots, ChangeSet};
