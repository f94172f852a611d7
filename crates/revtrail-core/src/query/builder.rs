use crate::query::model::{ColumnRef, FromEntry, LogicalQuery, Predicate};

/// Incremental construction of a [`LogicalQuery`].
///
/// Restrictions are accumulated as a conjunction.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    from: Vec<FromEntry>,
    projection: Vec<String>,
    conjuncts: Vec<Predicate>,
    order_by: Vec<ColumnRef>,
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            from: vec![FromEntry {
                table: table.into(),
                alias: alias.into(),
            }],
            projection: Vec::new(),
            conjuncts: Vec::new(),
            order_by: Vec::new(),
        }
    }

    pub fn add_from(&mut self, table: impl Into<String>, alias: impl Into<String>) -> &mut Self {
        self.from.push(FromEntry {
            table: table.into(),
            alias: alias.into(),
        });
        self
    }

    pub fn add_projection(&mut self, alias: impl Into<String>) -> &mut Self {
        self.projection.push(alias.into());
        self
    }

    pub fn add_restriction(&mut self, predicate: Predicate) -> &mut Self {
        self.conjuncts.push(predicate);
        self
    }

    pub fn add_order(&mut self, column: ColumnRef) -> &mut Self {
        self.order_by.push(column);
        self
    }

    /// Table bound to `alias`, if any
    pub fn table_of(&self, alias: &str) -> Option<&str> {
        self.from
            .iter()
            .find(|f| f.alias == alias)
            .map(|f| f.table.as_str())
    }

    /// Projects every from-entry when no projection was added
    pub fn build(self) -> LogicalQuery {
        let projection = if self.projection.is_empty() {
            self.from.iter().map(|f| f.alias.clone()).collect()
        } else {
            self.projection
        };
        LogicalQuery {
            from: self.from,
            projection,
            filter: Predicate::and(self.conjuncts),
            order_by: self.order_by,
        }
    }
}
