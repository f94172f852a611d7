//! Change requests reported by the host at flush time.

use crate::model::element::EntityId;
use crate::model::revision::RevisionType;
use crate::model::snapshot::CollectionSnapshot;
use crate::model::value::DataMap;

/// An entity was inserted, updated or deleted.
///
/// `state` holds the entity's audited field values after the change;
/// it is ignored for deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityChange {
    pub entity: String,
    pub id: EntityId,
    pub revision_type: RevisionType,
    pub state: DataMap,
}

impl EntityChange {
    pub fn added(entity: impl Into<String>, id: EntityId, state: DataMap) -> Self {
        Self {
            entity: entity.into(),
            id,
            revision_type: RevisionType::Add,
            state,
        }
    }

    pub fn modified(entity: impl Into<String>, id: EntityId, state: DataMap) -> Self {
        Self {
            entity: entity.into(),
            id,
            revision_type: RevisionType::Mod,
            state,
        }
    }

    pub fn deleted(entity: impl Into<String>, id: EntityId) -> Self {
        Self {
            entity: entity.into(),
            id,
            revision_type: RevisionType::Del,
            state: DataMap::new(),
        }
    }
}

/// A collection property changed between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChange {
    pub owner_entity: String,
    pub owner_id: EntityId,
    pub property: String,
    pub old: Option<CollectionSnapshot>,
    pub new: Option<CollectionSnapshot>,
}

impl CollectionChange {
    pub fn new(
        owner_entity: impl Into<String>,
        owner_id: EntityId,
        property: impl Into<String>,
        old: Option<CollectionSnapshot>,
        new: Option<CollectionSnapshot>,
    ) -> Self {
        Self {
            owner_entity: owner_entity.into(),
            owner_id,
            property: property.into(),
            old,
            new,
        }
    }
}
