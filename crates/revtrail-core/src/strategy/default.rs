use crate::config::{GlobalConfig, StrategyKind};
use crate::model::{DataMap, Revision, WriteOp};
use crate::query::{CmpOp, ColumnRef, FromEntry, Operand, Predicate, QueryBuilder, SubQuery};
use crate::strategy::{add_not_deleted_restriction, key_correlation, AuditStrategy, TemporalTarget};

/// Snapshot-per-revision strategy.
///
/// Rows carry only their creation revision and are never updated. The
/// state at R is, per logical row, the row with the greatest revision not
/// after R.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAuditStrategy;

impl DefaultAuditStrategy {
    /// `alias.REV = (SELECT MAX(alias2.REV) FROM table alias2
    ///   WHERE alias2.REV <= :revision AND alias2.key = alias.key)`
    fn max_revision_restriction(
        global: &GlobalConfig,
        qb: &mut QueryBuilder,
        target: &TemporalTarget<'_>,
        revision_param: &str,
    ) {
        let inner = format!("{}2", target.alias);
        let mut filter = vec![Predicate::compare(
            Operand::column(&inner, &global.revision_field),
            CmpOp::Le,
            Operand::param(revision_param),
        )];
        filter.extend(key_correlation(target, &inner));

        let subquery = SubQuery {
            from: FromEntry {
                table: target.table.to_string(),
                alias: inner.clone(),
            },
            max_of: ColumnRef::new(&inner, &global.revision_field),
            filter: Predicate::and(filter),
        };
        qb.add_restriction(Predicate::equals(
            Operand::column(target.alias, &global.revision_field),
            Operand::Subquery(Box::new(subquery)),
        ));
    }
}

impl AuditStrategy for DefaultAuditStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Default
    }

    fn stamp_on_insert(
        &self,
        global: &GlobalConfig,
        table: &str,
        _key: &DataMap,
        mut row: DataMap,
        revision: Revision,
    ) -> Vec<WriteOp> {
        row.insert(global.revision_field.clone(), revision.to_value());
        vec![WriteOp::Insert {
            table: table.to_string(),
            row,
        }]
    }

    fn add_entity_at_revision_restriction(
        &self,
        global: &GlobalConfig,
        qb: &mut QueryBuilder,
        target: &TemporalTarget<'_>,
        revision_param: &str,
    ) {
        Self::max_revision_restriction(global, qb, target, revision_param);
        add_not_deleted_restriction(global, qb, target.alias);
    }

    fn add_association_at_revision_restriction(
        &self,
        global: &GlobalConfig,
        qb: &mut QueryBuilder,
        target: &TemporalTarget<'_>,
        revision_param: &str,
    ) {
        Self::max_revision_restriction(global, qb, target, revision_param);
        add_not_deleted_restriction(global, qb, target.alias);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn test_stamp_is_single_insert() {
        let global = GlobalConfig::default();
        let ops = DefaultAuditStrategy.stamp_on_insert(
            &global,
            "Owner_AUD",
            &DataMap::new(),
            DataMap::new(),
            Revision(3),
        );
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            WriteOp::Insert { row, .. } => assert_eq!(row.get("REV"), Some(&Value::Int(3))),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_entity_restriction_correlates_on_key() {
        let global = GlobalConfig::default();
        let key = vec!["id".to_string()];
        let mut qb = QueryBuilder::new("Owner_AUD", "e");
        DefaultAuditStrategy.add_entity_at_revision_restriction(
            &global,
            &mut qb,
            &TemporalTarget {
                table: "Owner_AUD",
                alias: "e",
                key_columns: &key,
                null_safe_key: false,
            },
            "revision",
        );
        let query = qb.build();
        let Predicate::And(conjuncts) = &query.filter else {
            panic!("expected conjunction");
        };
        assert_eq!(conjuncts.len(), 2);
        let Predicate::Compare {
            right: Operand::Subquery(sub),
            ..
        } = &conjuncts[0]
        else {
            panic!("expected max subquery");
        };
        assert_eq!(sub.from.alias, "e2");
        assert_eq!(
            query.filter.params(),
            vec!["revision".to_string(), "delrevisiontype".to_string()]
        );
    }
}
