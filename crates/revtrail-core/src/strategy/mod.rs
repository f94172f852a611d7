//! Temporal indexing strategies.
//!
//! Two interchangeable policies decide how an audit row is stamped and how
//! "state as of revision R" is expressed in generated queries. One is
//! selected per configuration via [`strategy_for`].

pub mod default;
pub mod validity;

pub use default::DefaultAuditStrategy;
pub use validity::ValidityAuditStrategy;

use crate::config::{GlobalConfig, StrategyKind};
use crate::model::{DataMap, Revision, RevisionType, Value, WriteOp};
use crate::query::{CmpOp, Operand, Predicate, QueryBuilder, DEL_REVISION_TYPE_PARAM};
use std::fmt;

/// Audit table participating in a historical query
#[derive(Debug, Clone, Copy)]
pub struct TemporalTarget<'a> {
    pub table: &'a str,
    pub alias: &'a str,
    /// Columns identifying one logical row across revisions
    pub key_columns: &'a [String],
    /// Compare key columns null-safely (embeddable data may be null)
    pub null_safe_key: bool,
}

pub trait AuditStrategy: Send + Sync + fmt::Debug {
    fn kind(&self) -> StrategyKind;

    /// Writes needed to persist `row` at `revision`.
    ///
    /// `key` holds the values of the row's logical key columns.
    fn stamp_on_insert(
        &self,
        global: &GlobalConfig,
        table: &str,
        key: &DataMap,
        row: DataMap,
        revision: Revision,
    ) -> Vec<WriteOp>;

    /// Restrict an entity audit table to its state at `:revision_param`,
    /// excluding deleted rows.
    fn add_entity_at_revision_restriction(
        &self,
        global: &GlobalConfig,
        qb: &mut QueryBuilder,
        target: &TemporalTarget<'_>,
        revision_param: &str,
    );

    /// Restrict a middle table to the associations present at
    /// `:revision_param`, excluding deleted rows.
    fn add_association_at_revision_restriction(
        &self,
        global: &GlobalConfig,
        qb: &mut QueryBuilder,
        target: &TemporalTarget<'_>,
        revision_param: &str,
    );
}

static DEFAULT_STRATEGY: DefaultAuditStrategy = DefaultAuditStrategy;
static VALIDITY_STRATEGY: ValidityAuditStrategy = ValidityAuditStrategy;

pub fn strategy_for(kind: StrategyKind) -> &'static dyn AuditStrategy {
    match kind {
        StrategyKind::Default => &DEFAULT_STRATEGY,
        StrategyKind::Validity => &VALIDITY_STRATEGY,
    }
}

/// `alias.REVTYPE != :delrevisiontype`
pub fn add_not_deleted_restriction(global: &GlobalConfig, qb: &mut QueryBuilder, alias: &str) {
    qb.add_restriction(Predicate::compare(
        Operand::column(alias, &global.revision_type_field),
        CmpOp::Ne,
        Operand::param(DEL_REVISION_TYPE_PARAM),
    ));
}

/// Value bound to the deleted-revision-type parameter
pub fn deleted_revision_type() -> Value {
    RevisionType::Del.to_value()
}

/// Key equality between a target alias and its correlated copy
pub(crate) fn key_correlation(target: &TemporalTarget<'_>, inner_alias: &str) -> Vec<Predicate> {
    let op = if target.null_safe_key {
        CmpOp::NullSafeEq
    } else {
        CmpOp::Eq
    };
    target
        .key_columns
        .iter()
        .map(|c| {
            Predicate::compare(
                Operand::column(inner_alias, c),
                op,
                Operand::column(target.alias, c),
            )
        })
        .collect()
}
