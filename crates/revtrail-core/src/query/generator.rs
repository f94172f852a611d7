//! Query generators for collection and entity history.
//!
//! Collection queries come in three shapes, by how many related entity
//! audit tables are joined to the middle table:
//!
//! - zero: the middle table alone (values, embeddables)
//! - one: the middle table and one related entity (`e` or `f`)
//! - three: the middle table, the element entity `e` and the map-key
//!   entity `f`
//!
//! Every participant is restricted to its own state at `:revision` by the
//! active audit strategy, and every participant excludes deleted rows.

use crate::config::{AuditMetadata, GlobalConfig, MiddleComponent, MiddleLayout};
use crate::errors::{AuditError, Result};
use crate::model::{EntityId, Revision, Value};
use crate::query::builder::QueryBuilder;
use crate::query::model::{BoundQuery, ColumnRef, LogicalQuery, Operand, Predicate};
use crate::strategy::{deleted_revision_type, AuditStrategy, TemporalTarget};
use std::fmt;
use std::sync::Arc;

pub const REVISION_PARAM: &str = "revision";
pub const DEL_REVISION_TYPE_PARAM: &str = "delrevisiontype";

pub const MIDDLE_ALIAS: &str = "ee";
pub const ELEMENT_ALIAS: &str = "e";
pub const INDEX_ALIAS: &str = "f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    ZeroEntity,
    OneEntity,
    ThreeEntity,
}

/// A related entity audit table joined into a collection query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub alias: String,
    pub entity: String,
    pub table: String,
    pub id_fields: Vec<String>,
    /// Middle-table column holding each id field, same order
    pub middle_columns: Vec<String>,
}

impl Participant {
    fn resolve(metadata: &AuditMetadata, alias: &str, component: &MiddleComponent) -> Result<Option<Self>> {
        let MiddleComponent::Entity { entity, prefix } = component else {
            return Ok(None);
        };
        let config = metadata.entity(entity)?;
        Ok(Some(Self {
            alias: alias.to_string(),
            entity: entity.clone(),
            table: config.audit_table.clone(),
            id_fields: config.id_fields.clone(),
            middle_columns: config
                .id_fields
                .iter()
                .map(|f| format!("{}{}", prefix, f))
                .collect(),
        }))
    }
}

/// Generates the history query of one relation.
///
/// The logical query is built once; [`bind`](Self::bind) only supplies
/// parameter values.
pub trait RelationQueryGenerator: Send + Sync + fmt::Debug {
    fn shape(&self) -> QueryShape;

    fn query(&self) -> &Arc<LogicalQuery>;

    /// Bind an owner id and a revision.
    ///
    /// Parameters are ordered `revision`, `delrevisiontype`, then one
    /// parameter per owner id field in declared order.
    ///
    /// # Errors
    ///
    /// `MissingIdComponent` if the owner id lacks a declared field.
    fn bind(&self, owner_id: &EntityId, revision: Revision) -> Result<BoundQuery>;
}

/// Owner id fields and the parameters they bind to
#[derive(Debug, Clone)]
struct IdBinding {
    entity: String,
    /// `(id field, parameter name)` in declared order
    fields: Vec<(String, String)>,
}

impl IdBinding {
    fn new(entity: &str, id_fields: &[String], param_prefix: &str) -> Self {
        Self {
            entity: entity.to_string(),
            fields: id_fields
                .iter()
                .map(|f| (f.clone(), format!("{}{}", param_prefix, f)))
                .collect(),
        }
    }

    fn restrict(&self, qb: &mut QueryBuilder, alias: &str, columns: &[String]) {
        for ((_, param), column) in self.fields.iter().zip(columns) {
            qb.add_restriction(Predicate::equals(
                Operand::column(alias, column),
                Operand::param(param),
            ));
        }
    }

    fn bind_into(&self, id: &EntityId, params: &mut Vec<(String, Value)>) -> Result<()> {
        for (field, param) in &self.fields {
            let value = id.get(field).ok_or_else(|| AuditError::MissingIdComponent {
                entity: self.entity.clone(),
                field: field.clone(),
            })?;
            params.push((param.clone(), value.clone()));
        }
        Ok(())
    }

    fn bind(&self, query: &Arc<LogicalQuery>, id: &EntityId, revision: Option<Revision>) -> Result<BoundQuery> {
        let mut params = Vec::with_capacity(self.fields.len() + 2);
        if let Some(revision) = revision {
            params.push((REVISION_PARAM.to_string(), revision.to_value()));
            params.push((DEL_REVISION_TYPE_PARAM.to_string(), deleted_revision_type()));
        }
        self.bind_into(id, &mut params)?;
        Ok(BoundQuery {
            query: Arc::clone(query),
            params,
        })
    }
}

/// Middle table joined with zero, one or two participants
fn build_collection_query(
    global: &GlobalConfig,
    strategy: &dyn AuditStrategy,
    layout: &MiddleLayout,
    owner: &IdBinding,
    participants: &[&Participant],
) -> LogicalQuery {
    let mut qb = QueryBuilder::new(&layout.middle_table, MIDDLE_ALIAS);
    qb.add_projection(MIDDLE_ALIAS);
    for p in participants {
        qb.add_from(&p.table, &p.alias);
        qb.add_projection(&p.alias);
    }

    // ee.<related id column> = e.<id field>
    for p in participants {
        for (field, column) in p.id_fields.iter().zip(&p.middle_columns) {
            qb.add_restriction(Predicate::equals(
                Operand::column(MIDDLE_ALIAS, column),
                Operand::column(&p.alias, field),
            ));
        }
    }

    let owner_columns: Vec<String> = layout.owner_columns.iter().map(|(_, c)| c.clone()).collect();
    owner.restrict(&mut qb, MIDDLE_ALIAS, &owner_columns);

    for p in participants {
        strategy.add_entity_at_revision_restriction(
            global,
            &mut qb,
            &TemporalTarget {
                table: &p.table,
                alias: &p.alias,
                key_columns: &p.id_fields,
                null_safe_key: false,
            },
            REVISION_PARAM,
        );
    }

    let key = layout.logical_key_columns();
    strategy.add_association_at_revision_restriction(
        global,
        &mut qb,
        &TemporalTarget {
            table: &layout.middle_table,
            alias: MIDDLE_ALIAS,
            key_columns: &key,
            null_safe_key: true,
        },
        REVISION_PARAM,
    );

    if let Some(position) = &layout.position_column {
        qb.add_order(ColumnRef::new(MIDDLE_ALIAS, position));
    }
    qb.build()
}

fn owner_binding(layout: &MiddleLayout) -> IdBinding {
    let fields: Vec<String> = layout.owner_columns.iter().map(|(f, _)| f.clone()).collect();
    IdBinding::new(&layout.owner_entity, &fields, "owner_")
}

macro_rules! relation_generator_impl {
    ($ty:ty, $shape:expr) => {
        impl RelationQueryGenerator for $ty {
            fn shape(&self) -> QueryShape {
                $shape
            }

            fn query(&self) -> &Arc<LogicalQuery> {
                &self.query
            }

            fn bind(&self, owner_id: &EntityId, revision: Revision) -> Result<BoundQuery> {
                self.owner.bind(&self.query, owner_id, Some(revision))
            }
        }
    };
}

/// Middle table only
#[derive(Debug, Clone)]
pub struct MiddleTableQueryGenerator {
    owner: IdBinding,
    query: Arc<LogicalQuery>,
}

impl MiddleTableQueryGenerator {
    pub fn new(metadata: &AuditMetadata, layout: &MiddleLayout) -> Self {
        let owner = owner_binding(layout);
        let query = build_collection_query(&metadata.global, metadata.strategy(), layout, &owner, &[]);
        Self {
            owner,
            query: Arc::new(query),
        }
    }
}

relation_generator_impl!(MiddleTableQueryGenerator, QueryShape::ZeroEntity);

/// Middle table joined with one related entity
#[derive(Debug, Clone)]
pub struct OneEntityQueryGenerator {
    owner: IdBinding,
    related: Participant,
    query: Arc<LogicalQuery>,
}

impl OneEntityQueryGenerator {
    pub fn new(metadata: &AuditMetadata, layout: &MiddleLayout, related: Participant) -> Self {
        let owner = owner_binding(layout);
        let query = build_collection_query(
            &metadata.global,
            metadata.strategy(),
            layout,
            &owner,
            &[&related],
        );
        Self {
            owner,
            related,
            query: Arc::new(query),
        }
    }

    pub fn related(&self) -> &Participant {
        &self.related
    }
}

relation_generator_impl!(OneEntityQueryGenerator, QueryShape::OneEntity);

/// Middle table joined with the referenced entity and the index entity
#[derive(Debug, Clone)]
pub struct ThreeEntityQueryGenerator {
    owner: IdBinding,
    referenced: Participant,
    index: Participant,
    query: Arc<LogicalQuery>,
}

impl ThreeEntityQueryGenerator {
    pub fn new(
        metadata: &AuditMetadata,
        layout: &MiddleLayout,
        referenced: Participant,
        index: Participant,
    ) -> Self {
        let owner = owner_binding(layout);
        let query = build_collection_query(
            &metadata.global,
            metadata.strategy(),
            layout,
            &owner,
            &[&referenced, &index],
        );
        Self {
            owner,
            referenced,
            index,
            query: Arc::new(query),
        }
    }

    pub fn referenced(&self) -> &Participant {
        &self.referenced
    }

    pub fn index(&self) -> &Participant {
        &self.index
    }
}

relation_generator_impl!(ThreeEntityQueryGenerator, QueryShape::ThreeEntity);

/// Pick the query shape for a collection from its element and index kinds.
///
/// # Errors
///
/// Lookup failures for the collection or its related entities.
pub fn generator_for(
    metadata: &AuditMetadata,
    entity: &str,
    property: &str,
) -> Result<Box<dyn RelationQueryGenerator>> {
    let layout = metadata.layout(entity, property)?;
    let collection = metadata.collection(entity, property)?;
    let element = Participant::resolve(metadata, ELEMENT_ALIAS, &collection.element)?;
    let index = match &collection.index {
        Some(index) => Participant::resolve(metadata, INDEX_ALIAS, index)?,
        None => None,
    };

    tracing::trace!(
        entity = entity,
        property = property,
        element_entity = element.as_ref().map(|p| p.entity.as_str()),
        index_entity = index.as_ref().map(|p| p.entity.as_str()),
        "selecting collection query shape"
    );

    Ok(match (element, index) {
        (Some(referenced), Some(index)) => Box::new(ThreeEntityQueryGenerator::new(
            metadata, &layout, referenced, index,
        )),
        (Some(related), None) | (None, Some(related)) => {
            Box::new(OneEntityQueryGenerator::new(metadata, &layout, related))
        }
        (None, None) => Box::new(MiddleTableQueryGenerator::new(metadata, &layout)),
    })
}

/// One entity's audit row valid at a revision
#[derive(Debug, Clone)]
pub struct EntityAtRevisionQueryGenerator {
    id: IdBinding,
    query: Arc<LogicalQuery>,
}

impl EntityAtRevisionQueryGenerator {
    /// # Errors
    ///
    /// `UnknownEntity`.
    pub fn new(metadata: &AuditMetadata, entity: &str) -> Result<Self> {
        let config = metadata.entity(entity)?;
        let id = IdBinding::new(entity, &config.id_fields, "id_");

        let mut qb = QueryBuilder::new(&config.audit_table, ELEMENT_ALIAS);
        id.restrict(&mut qb, ELEMENT_ALIAS, &config.id_fields);
        metadata.strategy().add_entity_at_revision_restriction(
            &metadata.global,
            &mut qb,
            &TemporalTarget {
                table: &config.audit_table,
                alias: ELEMENT_ALIAS,
                key_columns: &config.id_fields,
                null_safe_key: false,
            },
            REVISION_PARAM,
        );
        Ok(Self {
            id,
            query: Arc::new(qb.build()),
        })
    }

    pub fn query(&self) -> &Arc<LogicalQuery> {
        &self.query
    }

    /// # Errors
    ///
    /// `MissingIdComponent`.
    pub fn bind(&self, id: &EntityId, revision: Revision) -> Result<BoundQuery> {
        self.id.bind(&self.query, id, Some(revision))
    }
}

/// Every audit row of one entity, oldest first
#[derive(Debug, Clone)]
pub struct EntityRevisionsQueryGenerator {
    id: IdBinding,
    query: Arc<LogicalQuery>,
}

impl EntityRevisionsQueryGenerator {
    /// # Errors
    ///
    /// `UnknownEntity`.
    pub fn new(metadata: &AuditMetadata, entity: &str) -> Result<Self> {
        let config = metadata.entity(entity)?;
        let id = IdBinding::new(entity, &config.id_fields, "id_");

        let mut qb = QueryBuilder::new(&config.audit_table, ELEMENT_ALIAS);
        id.restrict(&mut qb, ELEMENT_ALIAS, &config.id_fields);
        qb.add_order(ColumnRef::new(ELEMENT_ALIAS, &metadata.global.revision_field));
        Ok(Self {
            id,
            query: Arc::new(qb.build()),
        })
    }

    /// # Errors
    ///
    /// `MissingIdComponent`.
    pub fn bind(&self, id: &EntityId) -> Result<BoundQuery> {
        self.id.bind(&self.query, id, None)
    }
}
