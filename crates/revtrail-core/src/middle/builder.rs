use crate::component::ComponentMapper;
use crate::config::{AuditMetadata, CollectionConfig, CollectionKind, MiddleComponent, MiddleLayout};
use crate::errors::{AuditError, Result};
use crate::middle::id_bag::IdentifierPool;
use crate::model::{
    ChangedElement, DataMap, Element, ElementRecord, EntityId, RevisionType, SnapshotShape, Value,
};

/// Builds one middle-table record per changed element.
///
/// Construction is pure: the records are returned, never persisted.
#[derive(Debug, Clone)]
pub struct MiddleRecordBuilder<'a> {
    metadata: &'a AuditMetadata,
    collection: &'a CollectionConfig,
    layout: MiddleLayout,
}

fn shape_of(changed: &ChangedElement) -> SnapshotShape {
    match changed {
        ChangedElement::Element(_) => SnapshotShape::Elements,
        ChangedElement::Positioned { .. } => SnapshotShape::Sequence,
        ChangedElement::Entry { .. } => SnapshotShape::Entries,
    }
}

impl<'a> MiddleRecordBuilder<'a> {
    /// # Errors
    ///
    /// Lookup failures for the owner entity or the collection.
    pub fn new(metadata: &'a AuditMetadata, entity: &str, property: &str) -> Result<Self> {
        Ok(Self {
            metadata,
            collection: metadata.collection(entity, property)?,
            layout: metadata.layout(entity, property)?,
        })
    }

    pub fn layout(&self) -> &MiddleLayout {
        &self.layout
    }

    /// One record per element, in iteration order.
    ///
    /// Lists take their position from each positioned element. Embeddable
    /// sets with `ordinal_in_id` get the 0-based iteration index as a
    /// synthetic ordinal, so rebuilding the same batch yields the same
    /// ordinals. Id-bags take their row identifier from `identifiers`;
    /// when no candidate is left the identifier is written as null. Plain
    /// bags take their occurrence number from the same pool.
    ///
    /// # Errors
    ///
    /// `MissingIdComponent` for an incomplete owner or element id,
    /// `ElementMismatch` / `SnapshotShape` for elements the configured
    /// mapping cannot hold.
    pub fn build(
        &self,
        owner_id: &EntityId,
        elements: &[ChangedElement],
        revision_type: RevisionType,
        mut identifiers: Option<&mut IdentifierPool>,
    ) -> Result<Vec<ElementRecord>> {
        let owner_columns = self.owner_columns(owner_id)?;
        let mut records = Vec::with_capacity(elements.len());

        for (ordinal, changed) in elements.iter().enumerate() {
            let mut original_id = owner_columns.clone();
            let mut data = DataMap::new();
            let mut record_ordinal = None;
            let mut bag_id = None;

            if self.collection.kind.is_positional() {
                let ChangedElement::Positioned { position, .. } = changed else {
                    return Err(self.shape_error(changed));
                };
                if let Some(column) = &self.layout.position_column {
                    original_id.insert(column.clone(), Value::from(*position));
                }
                record_ordinal = Some(*position);
            } else if shape_of(changed) != self.collection.kind.shape()
                && !(self.collection.kind == CollectionKind::IdBag
                    && matches!(changed, ChangedElement::Element(_)))
            {
                return Err(self.shape_error(changed));
            }

            if let Some(column) = &self.layout.set_ordinal_column {
                let ordinal = ordinal as u32;
                original_id.insert(column.clone(), Value::from(ordinal));
                record_ordinal = Some(ordinal);
            }

            if let Some(column) = &self.layout.bag_id_column {
                let id = identifiers
                    .as_deref_mut()
                    .and_then(|pool| pool.take(changed.element()));
                if id.is_none() {
                    tracing::debug!(
                        middle_table = %self.layout.middle_table,
                        element = ?changed.element(),
                        "no row identifier left for id-bag element"
                    );
                }
                original_id.insert(column.clone(), id.clone().unwrap_or(Value::Null));
                bag_id = id;
            }

            if let Some(column) = &self.layout.occurrence_column {
                let occurrence = identifiers
                    .as_deref_mut()
                    .and_then(|pool| pool.take(changed.element()))
                    .unwrap_or(Value::Int(0));
                original_id.insert(column.clone(), occurrence);
            }

            if let (Some(index), Some(key)) = (&self.collection.index, changed.key()) {
                self.map_component(index, key, &mut original_id)?;
            }

            let element_target = if self.layout.needs_data_comparison {
                &mut data
            } else {
                &mut original_id
            };
            self.map_component(&self.collection.element, changed.element(), element_target)?;

            let revision_type_target = if self.layout.revision_type_in_id {
                &mut original_id
            } else {
                &mut data
            };
            revision_type_target.insert(
                self.layout.revision_type_column.clone(),
                revision_type.to_value(),
            );

            let logical_key = self
                .layout
                .logical_key_columns()
                .into_iter()
                .map(|c| {
                    let v = original_id
                        .get(&c)
                        .or_else(|| data.get(&c))
                        .cloned()
                        .unwrap_or(Value::Null);
                    (c, v)
                })
                .collect();

            records.push(ElementRecord {
                middle_table: self.layout.middle_table.clone(),
                owner_id: owner_id.clone(),
                revision_type,
                original_id,
                data,
                ordinal: record_ordinal,
                bag_id,
                logical_key,
                changed: changed.clone(),
            });
        }
        Ok(records)
    }

    fn owner_columns(&self, owner_id: &EntityId) -> Result<DataMap> {
        let mut columns = DataMap::new();
        for (field, column) in &self.layout.owner_columns {
            let value = owner_id
                .get(field)
                .ok_or_else(|| AuditError::MissingIdComponent {
                    entity: self.layout.owner_entity.clone(),
                    field: field.clone(),
                })?;
            columns.insert(column.clone(), value.clone());
        }
        Ok(columns)
    }

    /// Write one element (or map key) into `target`
    fn map_component(
        &self,
        component: &MiddleComponent,
        element: &Element,
        target: &mut DataMap,
    ) -> Result<()> {
        match component {
            MiddleComponent::Value { column } => match element {
                Element::Scalar(v) => {
                    target.insert(column.clone(), v.clone());
                }
                other => return Err(self.mismatch(column, "scalar", other)),
            },
            MiddleComponent::Entity { entity, prefix } => {
                let id_fields = &self.metadata.entity(entity)?.id_fields;
                match element {
                    Element::Entity(reference) => {
                        for field in id_fields {
                            let value = reference.id.get(field).ok_or_else(|| {
                                AuditError::MissingIdComponent {
                                    entity: reference.entity.clone(),
                                    field: field.clone(),
                                }
                            })?;
                            target.insert(format!("{}{}", prefix, field), value.clone());
                        }
                    }
                    e if e.is_null() => {
                        for field in id_fields {
                            target.insert(format!("{}{}", prefix, field), Value::Null);
                        }
                    }
                    other => return Err(self.mismatch(entity, "entity", other)),
                }
            }
            MiddleComponent::Embeddable { component, prefix } => {
                let mapper = ComponentMapper::new(self.metadata, component, prefix)?;
                match element {
                    Element::Composite(value) => mapper.map_to_record(value, target)?,
                    e if e.is_null() => {
                        for column in mapper.columns()? {
                            target.insert(column, Value::Null);
                        }
                    }
                    other => return Err(self.mismatch(component, "composite", other)),
                }
            }
        }
        Ok(())
    }

    fn mismatch(&self, target: &str, expected: &str, actual: &Element) -> AuditError {
        AuditError::ElementMismatch {
            target: format!("{}.{}", self.layout.property, target),
            expected: expected.to_string(),
            actual: actual.variant_name().to_string(),
        }
    }

    fn shape_error(&self, changed: &ChangedElement) -> AuditError {
        AuditError::SnapshotShape {
            property: self.layout.property.clone(),
            expected: self.collection.kind.shape().as_str().to_string(),
            actual: shape_of(changed).as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CollectionConfig, ComponentDescriptor, ComponentProperty, EntityConfig, GlobalConfig,
    };
    use crate::model::{Composite, EntityRef};

    fn metadata() -> AuditMetadata {
        AuditMetadata::new(GlobalConfig::default())
            .with_entity("Item", EntityConfig::new("Item_AUD", &["id"]))
            .with_entity(
                "Owner",
                EntityConfig::new("Owner_AUD", &["id"])
                    .with_collection(
                        "items",
                        CollectionConfig::new(
                            "Owner_items_AUD",
                            CollectionKind::List,
                            MiddleComponent::Entity {
                                entity: "Item".into(),
                                prefix: "item_".into(),
                            },
                        )
                        .with_position_column("position"),
                    )
                    .with_collection(
                        "parts",
                        CollectionConfig::new(
                            "Owner_parts_AUD",
                            CollectionKind::Set,
                            MiddleComponent::Embeddable {
                                component: "Part".into(),
                                prefix: String::new(),
                            },
                        )
                        .with_ordinal_in_id(true),
                    )
                    .with_collection(
                        "tags",
                        CollectionConfig::new(
                            "Owner_tags_AUD",
                            CollectionKind::IdBag,
                            MiddleComponent::Value {
                                column: "tag".into(),
                            },
                        )
                        .with_bag_id_column("tag_row_id")
                        .with_revision_type_in_id(true),
                    ),
            )
            .with_component(
                "Part",
                ComponentDescriptor::new(vec![ComponentProperty::scalar("code")]),
            )
    }

    fn item(id: i64) -> Element {
        Element::from(EntityRef::new("Item", EntityId::single("id", id)))
    }

    #[test]
    fn test_list_positions_and_original_id() {
        let metadata = metadata();
        let builder = MiddleRecordBuilder::new(&metadata, "Owner", "items").unwrap();
        let elements = vec![
            ChangedElement::Positioned {
                position: 0,
                element: item(10),
            },
            ChangedElement::Positioned {
                position: 1,
                element: item(11),
            },
        ];
        let records = builder
            .build(&EntityId::single("id", 1), &elements, RevisionType::Add, None)
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].ordinal, Some(1));
        assert_eq!(records[1].original_id.get("position"), Some(&Value::Int(1)));
        assert_eq!(records[1].original_id.get("item_id"), Some(&Value::Int(11)));
        assert_eq!(records[1].original_id.get("owner_id"), Some(&Value::Int(1)));
        assert_eq!(records[1].data.get("REVTYPE"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_set_ordinals_are_deterministic_and_outside_key() {
        let metadata = metadata();
        let builder = MiddleRecordBuilder::new(&metadata, "Owner", "parts").unwrap();
        let elements: Vec<ChangedElement> = ["a", "b", "c"]
            .iter()
            .map(|code| ChangedElement::Element(Composite::new("Part").with("code", *code).into()))
            .collect();
        let owner = EntityId::single("id", 1);

        let first = builder.build(&owner, &elements, RevisionType::Add, None).unwrap();
        let second = builder.build(&owner, &elements, RevisionType::Add, None).unwrap();
        let ordinals: Vec<Option<u32>> = first.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(first, second);

        assert_eq!(first[2].original_id.get("SETORDINAL"), Some(&Value::Int(2)));
        assert_eq!(first[2].data.get("code"), Some(&Value::from("c")));
        assert!(!first[2].logical_key.contains_key("SETORDINAL"));
        assert_eq!(first[2].logical_key.get("code"), Some(&Value::from("c")));
    }

    #[test]
    fn test_id_bag_takes_identifier_and_revision_type_in_id() {
        let metadata = metadata();
        let builder = MiddleRecordBuilder::new(&metadata, "Owner", "tags").unwrap();
        let old = crate::model::CollectionSnapshot::Identified(vec![
            (Value::Int(1), Element::from("v")),
            (Value::Int(2), Element::from("v")),
        ]);
        let mut pool = IdentifierPool::from_snapshot(Some(&old));
        let records = builder
            .build(
                &EntityId::single("id", 1),
                &[ChangedElement::Element(Element::from("v"))],
                RevisionType::Del,
                Some(&mut pool),
            )
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bag_id, Some(Value::Int(1)));
        assert_eq!(records[0].original_id.get("REVTYPE"), Some(&Value::Int(2)));
        assert!(records[0].data.is_empty());
        assert!(!records[0].logical_key.contains_key("REVTYPE"));
    }

    #[test]
    fn test_missing_owner_component() {
        let metadata = metadata();
        let builder = MiddleRecordBuilder::new(&metadata, "Owner", "items").unwrap();
        let err = builder
            .build(&EntityId::single("uuid", 1), &[], RevisionType::Add, None)
            .unwrap_err();
        assert!(matches!(err, AuditError::MissingIdComponent { .. }));
    }

    #[test]
    fn test_wrong_element_kind() {
        let metadata = metadata();
        let builder = MiddleRecordBuilder::new(&metadata, "Owner", "items").unwrap();
        let err = builder
            .build(
                &EntityId::single("id", 1),
                &[ChangedElement::Positioned {
                    position: 0,
                    element: Element::from("not an entity"),
                }],
                RevisionType::Add,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, AuditError::ElementMismatch { .. }));
    }
}
