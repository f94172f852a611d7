//! Historical query synthesis.
//!
//! Queries are logical values handed to the storage collaborator, which
//! compiles and executes them. Generation is pure: a generator built once
//! per collection can be bound to any owner id and revision.

pub mod builder;
pub mod generator;
pub mod model;

pub use builder::QueryBuilder;
pub use generator::{
    generator_for, EntityAtRevisionQueryGenerator, EntityRevisionsQueryGenerator,
    MiddleTableQueryGenerator, OneEntityQueryGenerator, Participant, QueryShape,
    RelationQueryGenerator, ThreeEntityQueryGenerator, DEL_REVISION_TYPE_PARAM, ELEMENT_ALIAS,
    INDEX_ALIAS, MIDDLE_ALIAS, REVISION_PARAM,
};
pub use model::{
    BoundQuery, CmpOp, ColumnRef, FromEntry, LogicalQuery, Operand, Predicate, ResultRow,
    SubQuery,
};
