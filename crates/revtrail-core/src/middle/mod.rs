//! Middle-table record construction.

pub mod builder;
pub mod id_bag;

pub use builder::MiddleRecordBuilder;
pub use id_bag::IdentifierPool;
