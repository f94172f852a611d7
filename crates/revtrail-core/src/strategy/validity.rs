use crate::config::{GlobalConfig, StrategyKind};
use crate::model::{DataMap, Revision, Value, WriteOp};
use crate::query::{CmpOp, Operand, Predicate, QueryBuilder};
use crate::strategy::{add_not_deleted_restriction, AuditStrategy, TemporalTarget};

/// Validity-interval strategy.
///
/// Each row also stores the revision that superseded it. Inserting a row
/// closes the open row of the same logical key, so at most one row per key
/// has a null end revision.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidityAuditStrategy;

impl ValidityAuditStrategy {
    /// `REV <= :revision AND (REVEND > :revision OR REVEND IS NULL)`
    fn interval_restriction(
        global: &GlobalConfig,
        qb: &mut QueryBuilder,
        alias: &str,
        revision_param: &str,
    ) {
        qb.add_restriction(Predicate::compare(
            Operand::column(alias, &global.revision_field),
            CmpOp::Le,
            Operand::param(revision_param),
        ));
        qb.add_restriction(Predicate::Or(vec![
            Predicate::compare(
                Operand::column(alias, &global.revision_end_field),
                CmpOp::Gt,
                Operand::param(revision_param),
            ),
            Predicate::IsNull(Operand::column(alias, &global.revision_end_field)),
        ]));
    }
}

impl AuditStrategy for ValidityAuditStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Validity
    }

    fn stamp_on_insert(
        &self,
        global: &GlobalConfig,
        table: &str,
        key: &DataMap,
        mut row: DataMap,
        revision: Revision,
    ) -> Vec<WriteOp> {
        row.insert(global.revision_field.clone(), revision.to_value());
        row.insert(global.revision_end_field.clone(), Value::Null);
        // Close first: the new row is itself open.
        vec![
            WriteOp::CloseInterval {
                table: table.to_string(),
                key: key.clone(),
                end_field: global.revision_end_field.clone(),
                end_revision: revision,
            },
            WriteOp::Insert {
                table: table.to_string(),
                row,
            },
        ]
    }

    fn add_entity_at_revision_restriction(
        &self,
        global: &GlobalConfig,
        qb: &mut QueryBuilder,
        target: &TemporalTarget<'_>,
        revision_param: &str,
    ) {
        Self::interval_restriction(global, qb, target.alias, revision_param);
        add_not_deleted_restriction(global, qb, target.alias);
    }

    fn add_association_at_revision_restriction(
        &self,
        global: &GlobalConfig,
        qb: &mut QueryBuilder,
        target: &TemporalTarget<'_>,
        revision_param: &str,
    ) {
        Self::interval_restriction(global, qb, target.alias, revision_param);
        add_not_deleted_restriction(global, qb, target.alias);
    }
}
