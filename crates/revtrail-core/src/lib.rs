//! RevTrail Core - temporal audit engine for entity collections
//!
//! This crate provides the pure half of collection auditing:
//! - Identity diff of two collection snapshots with bag semantics
//! - Middle-table record construction (positions, synthetic ordinals,
//!   id-bag identifiers, embeddable flattening)
//! - Two temporal indexing strategies (snapshot-per-revision and
//!   validity-interval)
//! - Historical query generation over zero, one or two related entities
//! - Bidirectional relation mirroring
//! - Static, validated audit configuration
//!
//! Nothing here performs I/O. Storage and revision allocation belong to
//! the collaborator crates.

pub mod collection;
pub mod component;
pub mod config;
pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod middle;
pub mod model;
pub mod query;
pub mod strategy;
pub mod sync;

// Re-export commonly used types
pub use collection::{compute_changes, CollectionMapper, CollectionTarget, HistoricalCollection};
pub use config::AuditMetadata;
pub use errors::{AuditError, ExError, ExErrorKind, Result};
pub use model::{
    CollectionChange, CollectionSnapshot, Element, ElementRecord, EntityChange, EntityId,
    Revision, RevisionType, Value,
};
pub use strategy::AuditStrategy;
pub use sync::{plan_collection_change, CollectionPlan, Mirror};
