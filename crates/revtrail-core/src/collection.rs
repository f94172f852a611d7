//! Collection change computation and historical reconstruction.
//!
//! [`CollectionMapper`] ties the pieces together for one audited
//! collection: the diff engine and the record builder on the write side,
//! the query generator and materialisation on the read side.

use crate::component::ComponentMapper;
use crate::config::{AuditMetadata, CollectionConfig, CollectionKind, MiddleComponent, MiddleLayout};
use crate::diff::{diff_snapshots, ChangeSet};
use crate::errors::{AuditError, Result};
use crate::middle::{IdentifierPool, MiddleRecordBuilder};
use crate::model::{
    ChangedElement, CollectionSnapshot, DataMap, Element, ElementRecord, EntityId, EntityRef,
    Revision, RevisionType, Value,
};
use crate::query::{generator_for, RelationQueryGenerator, ResultRow, ELEMENT_ALIAS, INDEX_ALIAS, MIDDLE_ALIAS};
use std::collections::BTreeMap;

/// One member of a reconstructed collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalEntry {
    pub element: Element,
    /// Map key
    pub index: Option<Element>,
    pub position: Option<u32>,
    pub bag_id: Option<Value>,
    /// Audit row of the element entity at the queried revision
    pub element_state: Option<DataMap>,
    /// Audit row of the map-key entity at the queried revision
    pub index_state: Option<DataMap>,
}

/// A collection as it was at one revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalCollection {
    pub kind: CollectionKind,
    pub entries: Vec<HistoricalEntry>,
}

impl HistoricalCollection {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn elements(&self) -> Vec<&Element> {
        self.entries.iter().map(|e| &e.element).collect()
    }

    /// Rebuild a host snapshot of the collection's own shape
    pub fn to_snapshot(&self) -> CollectionSnapshot {
        let entries = self.entries.iter();
        match self.kind {
            CollectionKind::List | CollectionKind::Array => {
                CollectionSnapshot::Sequence(entries.map(|e| e.element.clone()).collect())
            }
            CollectionKind::Map | CollectionKind::SortedMap => CollectionSnapshot::Entries(
                entries
                    .map(|e| {
                        (
                            e.index.clone().unwrap_or(Element::Scalar(Value::Null)),
                            e.element.clone(),
                        )
                    })
                    .collect(),
            ),
            CollectionKind::IdBag => CollectionSnapshot::Identified(
                entries
                    .map(|e| (e.bag_id.clone().unwrap_or(Value::Null), e.element.clone()))
                    .collect(),
            ),
            CollectionKind::Set | CollectionKind::SortedSet | CollectionKind::Bag => {
                CollectionSnapshot::Elements(entries.map(|e| e.element.clone()).collect())
            }
        }
    }
}

/// Something a reconstructed collection can be written back onto
pub trait CollectionTarget {
    fn set_collection(&mut self, property: &str, content: CollectionSnapshot);
}

impl CollectionTarget for BTreeMap<String, CollectionSnapshot> {
    fn set_collection(&mut self, property: &str, content: CollectionSnapshot) {
        self.insert(property.to_string(), content);
    }
}

#[derive(Debug, Clone)]
pub struct CollectionMapper<'a> {
    metadata: &'a AuditMetadata,
    collection: &'a CollectionConfig,
    builder: MiddleRecordBuilder<'a>,
}

impl<'a> CollectionMapper<'a> {
    /// # Errors
    ///
    /// `UnknownEntity` / `UnknownCollection` and layout failures.
    pub fn new(metadata: &'a AuditMetadata, owner_entity: &str, property: &str) -> Result<Self> {
        Ok(Self {
            metadata,
            collection: metadata.collection(owner_entity, property)?,
            builder: MiddleRecordBuilder::new(metadata, owner_entity, property)?,
        })
    }

    pub fn layout(&self) -> &MiddleLayout {
        self.builder.layout()
    }

    pub fn config(&self) -> &CollectionConfig {
        self.collection
    }

    fn check_shape(&self, snapshot: Option<&CollectionSnapshot>) -> Result<()> {
        let expected = self.collection.kind.shape();
        match snapshot {
            Some(s) if s.shape() != expected => Err(AuditError::SnapshotShape {
                property: self.layout().property.clone(),
                expected: expected.as_str().to_string(),
                actual: s.shape().as_str().to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Shape-checked member diff
    ///
    /// # Errors
    ///
    /// `SnapshotShape` if either snapshot does not match the collection kind.
    pub fn changes(
        &self,
        old: Option<&CollectionSnapshot>,
        new: Option<&CollectionSnapshot>,
    ) -> Result<ChangeSet<ChangedElement>> {
        self.check_shape(old)?;
        self.check_shape(new)?;
        Ok(diff_snapshots(old, new))
    }

    /// Records for every added and removed member: additions first, then
    /// removals.
    ///
    /// Returns `None` when `referencing_property_name` is not the property
    /// this mapper audits.
    ///
    /// # Errors
    ///
    /// Shape mismatches and record building failures.
    pub fn map_collection_changes(
        &self,
        referencing_property_name: &str,
        owner_id: &EntityId,
        new: Option<&CollectionSnapshot>,
        old: Option<&CollectionSnapshot>,
    ) -> Result<Option<Vec<ElementRecord>>> {
        if referencing_property_name != self.layout().property {
            return Ok(None);
        }
        let changes = self.changes(old, new)?;
        self.records_for(owner_id, &changes, new, old).map(Some)
    }

    /// Records for an already computed change set
    pub(crate) fn records_for(
        &self,
        owner_id: &EntityId,
        changes: &ChangeSet<ChangedElement>,
        new: Option<&CollectionSnapshot>,
        old: Option<&CollectionSnapshot>,
    ) -> Result<Vec<ElementRecord>> {
        let (mut added_ids, mut removed_ids) = match self.collection.kind {
            CollectionKind::IdBag => (
                Some(IdentifierPool::assigned_since(new, old)),
                Some(IdentifierPool::from_snapshot(old)),
            ),
            CollectionKind::Bag => (
                Some(IdentifierPool::occurrences_beyond(new, old)),
                Some(IdentifierPool::occurrences_beyond(old, new)),
            ),
            _ => (None, None),
        };

        let mut records =
            self.builder
                .build(owner_id, &changes.added, RevisionType::Add, added_ids.as_mut())?;
        records.extend(self.builder.build(
            owner_id,
            &changes.removed,
            RevisionType::Del,
            removed_ids.as_mut(),
        )?);
        Ok(records)
    }

    /// # Errors
    ///
    /// Lookup failures for related entities.
    pub fn query_generator(&self) -> Result<Box<dyn RelationQueryGenerator>> {
        let layout = self.layout();
        generator_for(self.metadata, &layout.owner_entity, &layout.property)
    }

    /// Turn query result rows into the collection they describe.
    ///
    /// Lists come out in position order, everything else in a stable
    /// order by key and element.
    ///
    /// # Errors
    ///
    /// `Instantiation` if a row lacks the middle alias or a mapped column.
    pub fn materialize(&self, rows: &[ResultRow]) -> Result<HistoricalCollection> {
        let layout = self.layout();
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let middle = row.get(MIDDLE_ALIAS).ok_or_else(|| AuditError::Instantiation {
                type_name: layout.middle_table.clone(),
                reason: "result row carries no middle-table values".to_string(),
            })?;

            let element = self.read_component(&self.collection.element, middle)?;
            let index = match &self.collection.index {
                Some(index) => Some(self.read_component(index, middle)?),
                None => None,
            };
            let position = match &layout.position_column {
                Some(column) => self
                    .column(middle, column)?
                    .as_int()
                    .and_then(|p| u32::try_from(p).ok()),
                None => None,
            };
            let bag_id = match &layout.bag_id_column {
                Some(column) => Some(self.column(middle, column)?.clone()),
                None => None,
            };

            let element_state = self
                .collection
                .element
                .related_entity()
                .and_then(|_| row.get(ELEMENT_ALIAS).cloned());
            let index_state = self
                .collection
                .index
                .as_ref()
                .and_then(MiddleComponent::related_entity)
                .and_then(|_| row.get(INDEX_ALIAS).cloned());

            entries.push(HistoricalEntry {
                element,
                index,
                position,
                bag_id,
                element_state,
                index_state,
            });
        }

        if self.collection.kind.is_positional() {
            entries.sort_by_key(|e| e.position);
        } else {
            entries.sort_by(|a, b| {
                (&a.index, &a.element, &a.bag_id).cmp(&(&b.index, &b.element, &b.bag_id))
            });
        }

        Ok(HistoricalCollection {
            kind: self.collection.kind,
            entries,
        })
    }

    /// Write a reconstructed collection onto a target object
    pub fn apply_to_entity(
        &self,
        target: &mut dyn CollectionTarget,
        historical: &HistoricalCollection,
        revision: Revision,
    ) {
        let layout = self.layout();
        tracing::trace!(
            entity = %layout.owner_entity,
            property = %layout.property,
            revision = revision.number(),
            members = historical.len(),
            "applying historical collection"
        );
        target.set_collection(&layout.property, historical.to_snapshot());
    }

    fn column<'r>(&self, row: &'r DataMap, column: &str) -> Result<&'r Value> {
        row.get(column).ok_or_else(|| AuditError::Instantiation {
            type_name: self.layout().middle_table.clone(),
            reason: format!("column {} is missing from the audit row", column),
        })
    }

    fn read_component(&self, component: &MiddleComponent, row: &DataMap) -> Result<Element> {
        match component {
            MiddleComponent::Value { column } => {
                Ok(Element::Scalar(self.column(row, column)?.clone()))
            }
            MiddleComponent::Entity { entity, prefix } => {
                let mut components = Vec::new();
                for field in &self.metadata.entity(entity)?.id_fields {
                    let value = self.column(row, &format!("{}{}", prefix, field))?;
                    components.push((field.clone(), value.clone()));
                }
                if components.iter().all(|(_, v)| v.is_null()) {
                    return Ok(Element::Scalar(Value::Null));
                }
                Ok(Element::Entity(EntityRef::new(
                    entity.clone(),
                    EntityId::composite(components),
                )))
            }
            MiddleComponent::Embeddable { component, prefix } => Ok(Element::Composite(
                ComponentMapper::new(self.metadata, component, prefix)?.map_from_record(row)?,
            )),
        }
    }
}

/// Records describing how a collection changed between two snapshots.
///
/// # Errors
///
/// Configuration lookups, shape mismatches and record building failures.
pub fn compute_changes(
    metadata: &AuditMetadata,
    owner_entity: &str,
    owner_id: &EntityId,
    referencing_property_name: &str,
    new: Option<&CollectionSnapshot>,
    old: Option<&CollectionSnapshot>,
) -> Result<Vec<ElementRecord>> {
    let mapper = CollectionMapper::new(metadata, owner_entity, referencing_property_name)?;
    Ok(mapper
        .map_collection_changes(referencing_property_name, owner_id, new, old)?
        .unwrap_or_default())
}
