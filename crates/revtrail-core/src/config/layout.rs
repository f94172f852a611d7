//! Physical column layout of a middle table.

use crate::component::ComponentMapper;
use crate::config::{AuditMetadata, CollectionKind, MiddleComponent};
use crate::errors::{AuditError, Result};
use std::collections::BTreeSet;

/// Columns of one collection's middle table, derived from configuration.
///
/// The revision column (and the end-revision column under the validity
/// strategy) is owned by the audit strategy and not listed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddleLayout {
    pub middle_table: String,
    pub owner_entity: String,
    pub property: String,
    pub kind: CollectionKind,
    /// `(id field, column)` in declared id order
    pub owner_columns: Vec<(String, String)>,
    pub position_column: Option<String>,
    pub bag_id_column: Option<String>,
    pub element_columns: Vec<String>,
    pub index_columns: Vec<String>,
    pub set_ordinal_column: Option<String>,
    /// Plain bags only: numbers equal members 0, 1, ... so each copy is a
    /// row of its own
    pub occurrence_column: Option<String>,
    pub revision_type_column: String,
    pub revision_type_in_id: bool,
    pub needs_data_comparison: bool,
}

/// Columns a middle component occupies
pub(crate) fn component_columns(
    metadata: &AuditMetadata,
    component: &MiddleComponent,
) -> Result<Vec<String>> {
    match component {
        MiddleComponent::Value { column } => Ok(vec![column.clone()]),
        MiddleComponent::Entity { entity, prefix } => Ok(metadata
            .entity(entity)?
            .id_fields
            .iter()
            .map(|f| format!("{}{}", prefix, f))
            .collect()),
        MiddleComponent::Embeddable { component, prefix } => {
            ComponentMapper::new(metadata, component, prefix)?.columns()
        }
    }
}

impl MiddleLayout {
    pub(crate) fn resolve(metadata: &AuditMetadata, entity: &str, property: &str) -> Result<Self> {
        let owner = metadata.entity(entity)?;
        let collection = metadata.collection(entity, property)?;
        let global = &metadata.global;

        let index_columns = match &collection.index {
            Some(index) => component_columns(metadata, index)?,
            None => Vec::new(),
        };

        Ok(Self {
            middle_table: collection.middle_table.clone(),
            owner_entity: entity.to_string(),
            property: property.to_string(),
            kind: collection.kind,
            owner_columns: owner
                .id_fields
                .iter()
                .map(|f| (f.clone(), format!("{}{}", collection.owner_prefix, f)))
                .collect(),
            position_column: collection.position_column.clone(),
            bag_id_column: collection.bag_id_column.clone(),
            element_columns: component_columns(metadata, &collection.element)?,
            index_columns,
            set_ordinal_column: collection
                .uses_set_ordinal()
                .then(|| global.embeddable_set_ordinal_field.clone()),
            occurrence_column: (collection.kind == CollectionKind::Bag)
                .then(|| global.bag_occurrence_field.clone()),
            revision_type_column: global.revision_type_field.clone(),
            revision_type_in_id: collection.revision_type_in_id,
            needs_data_comparison: collection.needs_data_comparison(),
        })
    }

    /// Columns identifying one logical element across revisions.
    ///
    /// Excludes the revision type and the synthetic set ordinal; includes
    /// embeddable data columns when data comparison is needed and the bag
    /// occurrence number.
    pub fn logical_key_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.owner_columns.iter().map(|(_, c)| c.clone()).collect();
        columns.extend(self.position_column.iter().cloned());
        columns.extend(self.bag_id_column.iter().cloned());
        columns.extend(self.index_columns.iter().cloned());
        columns.extend(self.element_columns.iter().cloned());
        columns.extend(self.occurrence_column.iter().cloned());
        columns
    }

    /// Columns stored in the original-id part of a row
    pub fn original_id_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.owner_columns.iter().map(|(_, c)| c.clone()).collect();
        columns.extend(self.position_column.iter().cloned());
        columns.extend(self.bag_id_column.iter().cloned());
        columns.extend(self.index_columns.iter().cloned());
        if !self.needs_data_comparison {
            columns.extend(self.element_columns.iter().cloned());
        }
        columns.extend(self.set_ordinal_column.iter().cloned());
        columns.extend(self.occurrence_column.iter().cloned());
        if self.revision_type_in_id {
            columns.push(self.revision_type_column.clone());
        }
        columns
    }

    /// Columns stored in the data part of a row
    pub fn data_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        if self.needs_data_comparison {
            columns.extend(self.element_columns.iter().cloned());
        }
        if !self.revision_type_in_id {
            columns.push(self.revision_type_column.clone());
        }
        columns
    }

    pub(crate) fn check_distinct_columns(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for column in self.original_id_columns().into_iter().chain(self.data_columns()) {
            if !seen.insert(column.clone()) {
                return Err(AuditError::InvalidCollection {
                    entity: self.owner_entity.clone(),
                    property: self.property.clone(),
                    reason: format!("column {} is mapped twice", column),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CollectionConfig, ComponentDescriptor, ComponentProperty, EntityConfig, GlobalConfig,
    };

    fn metadata(collection: CollectionConfig) -> AuditMetadata {
        AuditMetadata::new(GlobalConfig::default())
            .with_entity(
                "Owner",
                EntityConfig::new("Owner_AUD", &["id"]).with_collection("parts", collection),
            )
            .with_component(
                "Part",
                ComponentDescriptor::new(vec![
                    ComponentProperty::scalar("code"),
                    ComponentProperty::scalar("note").not_audited(),
                ]),
            )
    }

    #[test]
    fn test_embeddable_set_layout() {
        let collection = CollectionConfig::new(
            "Owner_parts_AUD",
            CollectionKind::Set,
            MiddleComponent::Embeddable {
                component: "Part".into(),
                prefix: String::new(),
            },
        )
        .with_ordinal_in_id(true);
        let layout = metadata(collection).layout("Owner", "parts").unwrap();

        assert_eq!(layout.original_id_columns(), vec!["owner_id", "SETORDINAL"]);
        assert_eq!(layout.data_columns(), vec!["code", "REVTYPE"]);
        assert_eq!(layout.logical_key_columns(), vec!["owner_id", "code"]);
    }

    #[test]
    fn test_revision_type_in_id() {
        let collection = CollectionConfig::new(
            "Owner_parts_AUD",
            CollectionKind::Set,
            MiddleComponent::Value {
                column: "part".into(),
            },
        )
        .with_revision_type_in_id(true);
        let layout = metadata(collection).layout("Owner", "parts").unwrap();

        assert_eq!(
            layout.original_id_columns(),
            vec!["owner_id", "part", "REVTYPE"]
        );
        assert!(layout.data_columns().is_empty());
        assert_eq!(layout.logical_key_columns(), vec!["owner_id", "part"]);
    }

    #[test]
    fn test_plain_bag_numbers_occurrences() {
        let collection = CollectionConfig::new(
            "Owner_parts_AUD",
            CollectionKind::Bag,
            MiddleComponent::Value {
                column: "part".into(),
            },
        );
        let layout = metadata(collection).layout("Owner", "parts").unwrap();

        assert_eq!(layout.occurrence_column.as_deref(), Some("OCCURRENCE"));
        assert_eq!(
            layout.original_id_columns(),
            vec!["owner_id", "part", "OCCURRENCE"]
        );
        assert_eq!(
            layout.logical_key_columns(),
            vec!["owner_id", "part", "OCCURRENCE"]
        );
    }

    #[test]
    fn test_column_collision_rejected() {
        let collection = CollectionConfig::new(
            "Owner_parts_AUD",
            CollectionKind::Set,
            MiddleComponent::Value {
                column: "owner_id".into(),
            },
        );
        let metadata = metadata(collection);
        assert!(matches!(
            metadata.validate(),
            Err(AuditError::InvalidCollection { .. })
        ));
    }
}
