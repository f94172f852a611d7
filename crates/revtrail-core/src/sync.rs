//! Bidirectional relation bookkeeping.
//!
//! Turns one reported collection change into everything that must be
//! audited for it: the middle records of the owning side, an "owner
//! changed" marker for the owner, and mirrors for related entities whose
//! history must also reflect the change.

use crate::collection::CollectionMapper;
use crate::config::{AuditMetadata, RelationKind};
use crate::diff::ChangeSet;
use crate::errors::Result;
use crate::model::{ChangedElement, CollectionChange, ElementRecord, EntityId, EntityRef};
use std::collections::BTreeSet;

/// A change another entity's audit history must record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mirror {
    /// The related entity changed only through the relation
    Marker { entity: String, id: EntityId },
    /// The relation is a foreign key on the related entity: its
    /// `mapped_by` reference now points at `value` (`None` = cleared)
    ForeignKey {
        entity: String,
        id: EntityId,
        mapped_by: String,
        value: Option<EntityId>,
    },
}

impl Mirror {
    pub fn entity(&self) -> &str {
        match self {
            Mirror::Marker { entity, .. } | Mirror::ForeignKey { entity, .. } => entity,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Mirror::Marker { id, .. } | Mirror::ForeignKey { id, .. } => id,
        }
    }
}

/// Everything one collection change produces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionPlan {
    pub records: Vec<ElementRecord>,
    pub mirrors: Vec<Mirror>,
    /// The owner gets a modification marker when anything changed
    pub owner_marker: Option<EntityRef>,
}

impl CollectionPlan {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.mirrors.is_empty() && self.owner_marker.is_none()
    }
}

/// Related entities referenced by changed members, in first-seen order,
/// without duplicates. Map keys count as touched too.
fn touched_entities(changes: &ChangeSet<ChangedElement>) -> Vec<&EntityRef> {
    let mut seen = BTreeSet::new();
    let mut touched = Vec::new();
    for changed in changes.added.iter().chain(&changes.removed) {
        for reference in changed
            .key()
            .into_iter()
            .chain(Some(changed.element()))
            .filter_map(|e| e.as_entity())
        {
            if seen.insert(reference) {
                touched.push(reference);
            }
        }
    }
    touched
}

/// Markers for related entities touched by a change set.
///
/// Related entities that are not audited are skipped.
pub fn mirror_markers(metadata: &AuditMetadata, changes: &ChangeSet<ChangedElement>) -> Vec<Mirror> {
    touched_entities(changes)
        .into_iter()
        .filter(|reference| {
            let audited = metadata.entities.contains_key(&reference.entity);
            if !audited {
                tracing::debug!(
                    entity = %reference.entity,
                    id = %reference.id,
                    "related entity is not audited, skipping mirror"
                );
            }
            audited
        })
        .map(|reference| Mirror::Marker {
            entity: reference.entity.clone(),
            id: reference.id.clone(),
        })
        .collect()
}

/// Foreign-key mirrors: removals clear the reference, additions set it.
/// Removals come first so a member that moved ends on its new owner.
fn foreign_key_mirrors(
    metadata: &AuditMetadata,
    owner_id: &EntityId,
    mapped_by: &str,
    changes: &ChangeSet<ChangedElement>,
) -> Vec<Mirror> {
    let removed = changes.removed.iter().map(|c| (c, None));
    let added = changes.added.iter().map(|c| (c, Some(owner_id.clone())));
    removed
        .chain(added)
        .filter_map(|(changed, value)| {
            let reference = changed.element().as_entity()?;
            if !metadata.entities.contains_key(&reference.entity) {
                tracing::debug!(
                    entity = %reference.entity,
                    "foreign-key side is not audited, skipping mirror"
                );
                return None;
            }
            Some(Mirror::ForeignKey {
                entity: reference.entity.clone(),
                id: reference.id.clone(),
                mapped_by: mapped_by.to_string(),
                value,
            })
        })
        .collect()
}

/// Plan the audit work for one collection change.
///
/// - collection auditing disabled globally: nothing
/// - relation resolved through a foreign key (`mapped_by`): no middle
///   records, one foreign-key mirror per changed member
/// - otherwise: the middle records, plus markers for touched related
///   entities when the relation is bidirectional
///
/// Any non-empty change also marks the owner as modified.
///
/// # Errors
///
/// Configuration lookups, shape mismatches and record building failures.
pub fn plan_collection_change(
    metadata: &AuditMetadata,
    change: &CollectionChange,
) -> Result<CollectionPlan> {
    if !metadata.global.generate_revisions_for_collections {
        return Ok(CollectionPlan::default());
    }

    let mapper = CollectionMapper::new(metadata, &change.owner_entity, &change.property)?;
    let changes = mapper.changes(change.old.as_ref(), change.new.as_ref())?;
    if changes.is_empty() {
        return Ok(CollectionPlan::default());
    }

    let owner_marker = Some(EntityRef::new(
        change.owner_entity.clone(),
        change.owner_id.clone(),
    ));
    let relation = metadata.relation(&change.owner_entity, &change.property);

    if let Some(RelationKind::FakeBidirectional { mapped_by }) = relation.map(|r| &r.kind) {
        return Ok(CollectionPlan {
            records: Vec::new(),
            mirrors: foreign_key_mirrors(metadata, &change.owner_id, mapped_by, &changes),
            owner_marker,
        });
    }

    let records = mapper.records_for(
        &change.owner_id,
        &changes,
        change.new.as_ref(),
        change.old.as_ref(),
    )?;
    let mirrors = match relation.map(|r| &r.kind) {
        Some(RelationKind::Bidirectional) => mirror_markers(metadata, &changes),
        _ => Vec::new(),
    };

    Ok(CollectionPlan {
        records,
        mirrors,
        owner_marker,
    })
}
