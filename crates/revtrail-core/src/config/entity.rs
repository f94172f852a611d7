//! Per-entity audit configuration.

use crate::config::collection::CollectionConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a relation property is mirrored on its inverse side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationKind {
    Unidirectional,
    /// Both sides are revisioned; touched related entities get a marker
    Bidirectional,
    /// Physically a foreign key `mapped_by` on the related entity
    FakeBidirectional { mapped_by: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescription {
    pub to_entity: String,
    #[serde(flatten)]
    pub kind: RelationKind,
}

/// Audit configuration of one entity type.
///
/// `id_fields` order is significant: it is the order in which composite
/// owner ids are bound as query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub audit_table: String,
    pub id_fields: Vec<String>,
    #[serde(default)]
    pub state_fields: Vec<String>,
    /// Mapped superclass, if any
    #[serde(default)]
    pub parent: Option<String>,
    /// Superclasses whose audited properties this entity inherits
    #[serde(default)]
    pub audit_parents: Vec<String>,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationDescription>,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,
}

impl EntityConfig {
    pub fn new(audit_table: impl Into<String>, id_fields: &[&str]) -> Self {
        Self {
            audit_table: audit_table.into(),
            id_fields: id_fields.iter().map(|f| f.to_string()).collect(),
            state_fields: Vec::new(),
            parent: None,
            audit_parents: Vec::new(),
            relations: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }

    pub fn with_state_fields(mut self, fields: &[&str]) -> Self {
        self.state_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_audit_parent(mut self, parent: impl Into<String>) -> Self {
        self.audit_parents.push(parent.into());
        self
    }

    pub fn with_relation(mut self, property: impl Into<String>, relation: RelationDescription) -> Self {
        self.relations.insert(property.into(), relation);
        self
    }

    pub fn with_collection(mut self, property: impl Into<String>, collection: CollectionConfig) -> Self {
        self.collections.insert(property.into(), collection);
        self
    }
}
