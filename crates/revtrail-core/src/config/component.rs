//! Embeddable component descriptors.

use serde::{Deserialize, Serialize};

/// What a component property holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyKind {
    Scalar,
    /// A nested embeddable, columns prefixed `<name>_`
    Nested { component: String },
    /// A reference, stored as `<name>_<id field>` columns
    Entity { entity: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentProperty {
    pub name: String,
    /// Non-audited properties are neither written nor reconstructed
    #[serde(default = "default_audited")]
    pub audited: bool,
    #[serde(flatten)]
    pub kind: PropertyKind,
}

fn default_audited() -> bool {
    true
}

impl ComponentProperty {
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            audited: true,
            kind: PropertyKind::Scalar,
        }
    }

    pub fn nested(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            audited: true,
            kind: PropertyKind::Nested {
                component: component.into(),
            },
        }
    }

    pub fn entity(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            audited: true,
            kind: PropertyKind::Entity {
                entity: entity.into(),
            },
        }
    }

    pub fn not_audited(mut self) -> Self {
        self.audited = false;
        self
    }
}

/// Property list of one embeddable type, in column order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub properties: Vec<ComponentProperty>,
}

impl ComponentDescriptor {
    pub fn new(properties: Vec<ComponentProperty>) -> Self {
        Self { properties }
    }

    pub fn audited(&self) -> impl Iterator<Item = &ComponentProperty> {
        self.properties.iter().filter(|p| p.audited)
    }
}
