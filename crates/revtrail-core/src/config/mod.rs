//! Static audit configuration.
//!
//! Resolved once at start-up (by whatever reads the host's mapping
//! metadata), validated with [`AuditMetadata::validate`], then passed by
//! reference into every core call. The core never inspects type metadata
//! itself.

pub mod collection;
pub mod component;
pub mod entity;
pub mod global;
pub mod layout;

pub use collection::{CollectionConfig, CollectionKind, MiddleComponent};
pub use component::{ComponentDescriptor, ComponentProperty, PropertyKind};
pub use entity::{EntityConfig, RelationDescription, RelationKind};
pub use global::{GlobalConfig, StrategyKind};
pub use layout::MiddleLayout;

use crate::errors::{AuditError, Result};
use crate::strategy::{strategy_for, AuditStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Audit configuration for every audited type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub entities: BTreeMap<String, EntityConfig>,
    /// Embeddable types by name
    #[serde(default)]
    pub components: BTreeMap<String, ComponentDescriptor>,
}

impl AuditMetadata {
    pub fn new(global: GlobalConfig) -> Self {
        Self {
            global,
            entities: BTreeMap::new(),
            components: BTreeMap::new(),
        }
    }

    pub fn with_entity(mut self, name: impl Into<String>, config: EntityConfig) -> Self {
        self.entities.insert(name.into(), config);
        self
    }

    pub fn with_component(mut self, name: impl Into<String>, descriptor: ComponentDescriptor) -> Self {
        self.components.insert(name.into(), descriptor);
        self
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the document does not parse. The
    /// result is not validated.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the document does not parse.
    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// The active audit strategy
    pub fn strategy(&self) -> &'static dyn AuditStrategy {
        strategy_for(self.global.strategy)
    }

    /// # Errors
    ///
    /// `UnknownEntity` if the entity is not audited.
    pub fn entity(&self, name: &str) -> Result<&EntityConfig> {
        self.entities
            .get(name)
            .ok_or_else(|| AuditError::UnknownEntity {
                entity: name.to_string(),
            })
    }

    /// # Errors
    ///
    /// `InvalidConfiguration` if no such embeddable is declared.
    pub fn component(&self, name: &str) -> Result<&ComponentDescriptor> {
        self.components
            .get(name)
            .ok_or_else(|| AuditError::InvalidConfiguration {
                reason: format!("embeddable {} is not declared", name),
            })
    }

    /// `entity` followed by its parents, nearest first.
    ///
    /// Stops early at an unknown parent or a cycle; `validate` reports both.
    pub fn ancestry<'a>(&'a self, entity: &'a str) -> Vec<&'a str> {
        let mut chain = vec![entity];
        let mut seen = BTreeSet::from([entity]);
        let mut current = entity;
        while let Some(parent) = self
            .entities
            .get(current)
            .and_then(|c| c.parent.as_deref())
        {
            if !seen.insert(parent) || !self.entities.contains_key(parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Collection configuration, searching the parent chain.
    ///
    /// # Errors
    ///
    /// `UnknownEntity` / `UnknownCollection`.
    pub fn collection(&self, entity: &str, property: &str) -> Result<&CollectionConfig> {
        self.entity(entity)?;
        self.ancestry(entity)
            .into_iter()
            .filter_map(|name| self.entities.get(name))
            .find_map(|config| config.collections.get(property))
            .ok_or_else(|| AuditError::UnknownCollection {
                entity: entity.to_string(),
                property: property.to_string(),
            })
    }

    /// Relation description for a property, searching the parent chain.
    /// `None` means the property is not a described relation.
    pub fn relation(&self, entity: &str, property: &str) -> Option<&RelationDescription> {
        self.ancestry(entity)
            .into_iter()
            .filter_map(|name| self.entities.get(name))
            .find_map(|config| config.relations.get(property))
    }

    /// Audited state fields: the entity's own, then those of each declared
    /// audited parent, nearest first.
    ///
    /// # Errors
    ///
    /// `UnknownEntity`.
    pub fn audited_state_fields(&self, entity: &str) -> Result<Vec<String>> {
        let config = self.entity(entity)?;
        let mut fields = config.state_fields.clone();
        for ancestor in self.ancestry(entity).into_iter().skip(1) {
            if config.audit_parents.iter().any(|p| p == ancestor) {
                for field in &self.entity(ancestor)?.state_fields {
                    if !fields.contains(field) {
                        fields.push(field.clone());
                    }
                }
            }
        }
        Ok(fields)
    }

    /// Middle-table layout of one collection.
    ///
    /// # Errors
    ///
    /// Any lookup failure for the owner, the collection or its components.
    pub fn layout(&self, entity: &str, property: &str) -> Result<MiddleLayout> {
        MiddleLayout::resolve(self, entity, property)
    }

    /// Check the whole configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// The first inconsistency found, in entity name order.
    pub fn validate(&self) -> Result<()> {
        for (name, config) in &self.entities {
            if config.id_fields.is_empty() {
                return Err(AuditError::InvalidConfiguration {
                    reason: format!("entity {} declares no id fields", name),
                });
            }
            self.validate_parents(name, config)?;
            for (property, collection) in &config.collections {
                self.validate_collection(name, property, collection)?;
            }
        }
        for (name, descriptor) in &self.components {
            self.validate_component(name, descriptor, &mut Vec::new())?;
        }
        Ok(())
    }

    fn validate_parents(&self, name: &str, config: &EntityConfig) -> Result<()> {
        let mut seen = BTreeSet::from([name]);
        let mut current = config;
        while let Some(parent) = current.parent.as_deref() {
            if !seen.insert(parent) {
                return Err(AuditError::ParentCycle {
                    entity: name.to_string(),
                });
            }
            current = self
                .entities
                .get(parent)
                .ok_or_else(|| AuditError::InvalidConfiguration {
                    reason: format!("entity {} extends unknown entity {}", name, parent),
                })?;
        }

        let ancestors = self.ancestry(name);
        for declared in &config.audit_parents {
            if !ancestors.iter().skip(1).any(|a| a == declared) {
                return Err(AuditError::AuditedParentNotAncestor {
                    entity: name.to_string(),
                    parent: declared.clone(),
                });
            }
        }
        Ok(())
    }

    fn validate_collection(
        &self,
        entity: &str,
        property: &str,
        collection: &CollectionConfig,
    ) -> Result<()> {
        let invalid = |reason: &str| AuditError::InvalidCollection {
            entity: entity.to_string(),
            property: property.to_string(),
            reason: reason.to_string(),
        };

        let kind = collection.kind;
        if kind.is_positional() && collection.position_column.is_none() {
            return Err(invalid("lists and arrays need a position column"));
        }
        if kind == CollectionKind::IdBag && collection.bag_id_column.is_none() {
            return Err(invalid("id-bags need a bag id column"));
        }
        if kind.is_map() != collection.index.is_some() {
            return Err(invalid("an index is required for maps and only for maps"));
        }
        for component in std::iter::once(&collection.element).chain(collection.index.as_ref()) {
            match component {
                MiddleComponent::Entity { entity: target, .. } => {
                    self.entity(target)
                        .map_err(|_| invalid(&format!("related entity {} is not audited", target)))?;
                }
                MiddleComponent::Embeddable { component, .. } => {
                    self.component(component)
                        .map_err(|_| invalid(&format!("embeddable {} is not declared", component)))?;
                }
                MiddleComponent::Value { .. } => {}
            }
        }
        // Column collisions make rows ambiguous.
        self.layout(entity, property)?.check_distinct_columns()
    }

    fn validate_component<'a>(
        &'a self,
        name: &'a str,
        descriptor: &'a ComponentDescriptor,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        if path.contains(&name) {
            return Err(AuditError::InvalidConfiguration {
                reason: format!("embeddable {} contains itself", name),
            });
        }
        path.push(name);
        for property in descriptor.audited() {
            match &property.kind {
                PropertyKind::Scalar => {}
                PropertyKind::Nested { component } => {
                    let nested = self.component(component)?;
                    self.validate_component(component, nested, path)?;
                }
                PropertyKind::Entity { entity } => {
                    self.entity(entity)?;
                }
            }
        }
        path.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AuditMetadata {
        AuditMetadata::default()
            .with_entity(
                "Animal",
                EntityConfig::new("Animal_AUD", &["id"]).with_state_fields(&["name"]),
            )
            .with_entity(
                "Dog",
                EntityConfig::new("Dog_AUD", &["id"])
                    .with_state_fields(&["breed"])
                    .with_parent("Animal"),
            )
    }

    #[test]
    fn test_audit_parent_must_be_ancestor() {
        let metadata = base().with_entity(
            "Cat",
            EntityConfig::new("Cat_AUD", &["id"]).with_audit_parent("Dog"),
        );
        let err = metadata.validate().unwrap_err();
        assert_eq!(
            err,
            AuditError::AuditedParentNotAncestor {
                entity: "Cat".into(),
                parent: "Dog".into()
            }
        );
    }

    #[test]
    fn test_audit_parents_contribute_state_fields() {
        let mut metadata = base();
        metadata.validate().unwrap();
        assert_eq!(metadata.audited_state_fields("Dog").unwrap(), vec!["breed"]);

        metadata.entities.get_mut("Dog").unwrap().audit_parents = vec!["Animal".into()];
        metadata.validate().unwrap();
        assert_eq!(
            metadata.audited_state_fields("Dog").unwrap(),
            vec!["breed", "name"]
        );
    }

    #[test]
    fn test_parent_cycle_rejected() {
        let mut metadata = base();
        metadata.entities.get_mut("Animal").unwrap().parent = Some("Dog".into());
        assert!(matches!(
            metadata.validate(),
            Err(AuditError::ParentCycle { .. })
        ));
    }

    #[test]
    fn test_relations_and_collections_are_inherited() {
        let collection = CollectionConfig::new(
            "Animal_tags_AUD",
            CollectionKind::Set,
            MiddleComponent::Value {
                column: "tag".into(),
            },
        );
        let mut metadata = base();
        let animal = metadata.entities.get_mut("Animal").unwrap();
        animal.collections.insert("tags".into(), collection.clone());
        animal.relations.insert(
            "owner".into(),
            RelationDescription {
                to_entity: "Person".into(),
                kind: RelationKind::Unidirectional,
            },
        );

        assert_eq!(metadata.collection("Dog", "tags").unwrap(), &collection);
        assert!(metadata.relation("Dog", "owner").is_some());
        assert!(matches!(
            metadata.collection("Dog", "toys"),
            Err(AuditError::UnknownCollection { .. })
        ));
    }

    #[test]
    fn test_list_without_position_column_rejected() {
        let metadata = base().with_entity(
            "Owner",
            EntityConfig::new("Owner_AUD", &["id"]).with_collection(
                "items",
                CollectionConfig::new(
                    "Owner_items_AUD",
                    CollectionKind::List,
                    MiddleComponent::Value {
                        column: "item".into(),
                    },
                ),
            ),
        );
        assert!(matches!(
            metadata.validate(),
            Err(AuditError::InvalidCollection { .. })
        ));
    }
}
