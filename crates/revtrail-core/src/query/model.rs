//! Logical query values.

use crate::model::{DataMap, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromEntry {
    pub table: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Equality that also holds when both sides are null
    NullSafeEq,
}

/// `SELECT MAX(max_of) FROM from WHERE filter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubQuery {
    pub from: FromEntry,
    pub max_of: ColumnRef,
    pub filter: Predicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Column(ColumnRef),
    /// Named parameter, bound at execution
    Param(String),
    Literal(Value),
    Subquery(Box<SubQuery>),
}

impl Operand {
    pub fn column(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Operand::Column(ColumnRef::new(alias, column))
    }

    pub fn param(name: impl Into<String>) -> Self {
        Operand::Param(name.into())
    }
}

/// Where-clause tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Compare {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },
    IsNull(Operand),
}

impl Predicate {
    pub fn compare(left: Operand, op: CmpOp, right: Operand) -> Self {
        Predicate::Compare { left, op, right }
    }

    pub fn equals(left: Operand, right: Operand) -> Self {
        Self::compare(left, CmpOp::Eq, right)
    }

    /// Conjunction, flattening nested `And`s
    pub fn and(predicates: Vec<Predicate>) -> Self {
        let mut flat = Vec::with_capacity(predicates.len());
        for p in predicates {
            match p {
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Predicate::And(flat)
    }

    /// Every named parameter referenced, in first-use order
    pub fn params(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params(&self, out: &mut Vec<String>) {
        match self {
            Predicate::And(ps) | Predicate::Or(ps) => {
                for p in ps {
                    p.collect_params(out);
                }
            }
            Predicate::Compare { left, right, .. } => {
                for operand in [left, right] {
                    operand_params(operand, out);
                }
            }
            Predicate::IsNull(operand) => operand_params(operand, out),
        }
    }
}

fn operand_params(operand: &Operand, out: &mut Vec<String>) {
    match operand {
        Operand::Param(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        Operand::Subquery(sub) => sub.filter.collect_params(out),
        Operand::Column(_) | Operand::Literal(_) => {}
    }
}

/// A complete logical query.
///
/// `projection` lists from-entry aliases; each selected row carries every
/// column of each projected alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalQuery {
    pub from: Vec<FromEntry>,
    pub projection: Vec<String>,
    pub filter: Predicate,
    pub order_by: Vec<ColumnRef>,
}

impl LogicalQuery {
    pub fn table_of(&self, alias: &str) -> Option<&str> {
        self.from
            .iter()
            .find(|f| f.alias == alias)
            .map(|f| f.table.as_str())
    }
}

/// A shared query plus its parameter values, in binding order
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub query: Arc<LogicalQuery>,
    pub params: Vec<(String, Value)>,
}

impl BoundQuery {
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// One result row, split per projected alias
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    pub values: BTreeMap<String, DataMap>,
}

impl ResultRow {
    pub fn get(&self, alias: &str) -> Option<&DataMap> {
        self.values.get(alias)
    }

    pub fn value(&self, alias: &str, column: &str) -> Option<&Value> {
        self.values.get(alias).and_then(|row| row.get(column))
    }
}
