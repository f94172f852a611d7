//! Audited collection configuration.

use crate::model::SnapshotShape;
use serde::{Deserialize, Serialize};

/// Kind of the audited collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Set,
    SortedSet,
    Bag,
    List,
    Array,
    Map,
    SortedMap,
    IdBag,
}

impl CollectionKind {
    /// Snapshot shape the host must supply for this kind
    pub fn shape(self) -> SnapshotShape {
        match self {
            CollectionKind::Set | CollectionKind::SortedSet | CollectionKind::Bag => {
                SnapshotShape::Elements
            }
            CollectionKind::List | CollectionKind::Array => SnapshotShape::Sequence,
            CollectionKind::Map | CollectionKind::SortedMap => SnapshotShape::Entries,
            CollectionKind::IdBag => SnapshotShape::Identified,
        }
    }

    pub fn is_positional(self) -> bool {
        matches!(self, CollectionKind::List | CollectionKind::Array)
    }

    pub fn is_map(self) -> bool {
        matches!(self, CollectionKind::Map | CollectionKind::SortedMap)
    }

    pub fn is_sorted(self) -> bool {
        matches!(self, CollectionKind::SortedSet | CollectionKind::SortedMap)
    }
}

/// How an element (or map key) is stored in the middle table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MiddleComponent {
    /// A single scalar column
    Value { column: String },
    /// An embeddable flattened into `prefix` + property columns
    Embeddable {
        component: String,
        #[serde(default)]
        prefix: String,
    },
    /// A reference stored as `prefix` + id field columns
    Entity { entity: String, prefix: String },
}

impl MiddleComponent {
    pub fn related_entity(&self) -> Option<&str> {
        match self {
            MiddleComponent::Entity { entity, .. } => Some(entity),
            _ => None,
        }
    }

    pub fn is_embeddable(&self) -> bool {
        matches!(self, MiddleComponent::Embeddable { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub middle_table: String,
    pub kind: CollectionKind,
    /// Prefix of the owner id columns in the middle table
    #[serde(default = "default_owner_prefix")]
    pub owner_prefix: String,
    pub element: MiddleComponent,
    /// Map key
    #[serde(default)]
    pub index: Option<MiddleComponent>,
    /// Lists and arrays
    #[serde(default)]
    pub position_column: Option<String>,
    /// Id-bags
    #[serde(default)]
    pub bag_id_column: Option<String>,
    #[serde(default)]
    pub ordinal_in_id: bool,
    #[serde(default)]
    pub revision_type_in_id: bool,
}

fn default_owner_prefix() -> String {
    "owner_".to_string()
}

impl CollectionConfig {
    pub fn new(middle_table: impl Into<String>, kind: CollectionKind, element: MiddleComponent) -> Self {
        Self {
            middle_table: middle_table.into(),
            kind,
            owner_prefix: default_owner_prefix(),
            element,
            index: None,
            position_column: None,
            bag_id_column: None,
            ordinal_in_id: false,
            revision_type_in_id: false,
        }
    }

    pub fn with_owner_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.owner_prefix = prefix.into();
        self
    }

    pub fn with_index(mut self, index: MiddleComponent) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_position_column(mut self, column: impl Into<String>) -> Self {
        self.position_column = Some(column.into());
        self
    }

    pub fn with_bag_id_column(mut self, column: impl Into<String>) -> Self {
        self.bag_id_column = Some(column.into());
        self
    }

    pub fn with_ordinal_in_id(mut self, ordinal_in_id: bool) -> Self {
        self.ordinal_in_id = ordinal_in_id;
        self
    }

    pub fn with_revision_type_in_id(mut self, in_id: bool) -> Self {
        self.revision_type_in_id = in_id;
        self
    }

    /// Generated queries must compare element data, not only identifiers.
    ///
    /// Embeddable elements have no natural key of their own.
    pub fn needs_data_comparison(&self) -> bool {
        self.element.is_embeddable()
    }

    /// The synthetic iteration ordinal is written for this collection
    pub fn uses_set_ordinal(&self) -> bool {
        self.ordinal_in_id && self.kind != CollectionKind::IdBag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_follow_kind() {
        assert_eq!(CollectionKind::SortedSet.shape(), SnapshotShape::Elements);
        assert_eq!(CollectionKind::Array.shape(), SnapshotShape::Sequence);
        assert_eq!(CollectionKind::SortedMap.shape(), SnapshotShape::Entries);
        assert_eq!(CollectionKind::IdBag.shape(), SnapshotShape::Identified);
    }

    #[test]
    fn test_data_comparison_only_for_embeddables() {
        let values = CollectionConfig::new(
            "owner_tags_AUD",
            CollectionKind::Set,
            MiddleComponent::Value {
                column: "tag".into(),
            },
        );
        assert!(!values.needs_data_comparison());

        let parts = CollectionConfig::new(
            "owner_parts_AUD",
            CollectionKind::List,
            MiddleComponent::Embeddable {
                component: "Part".into(),
                prefix: String::new(),
            },
        );
        assert!(parts.needs_data_comparison());
    }

    #[test]
    fn test_set_ordinal_never_on_id_bags() {
        let bag = CollectionConfig::new(
            "owner_bag_AUD",
            CollectionKind::IdBag,
            MiddleComponent::Value {
                column: "v".into(),
            },
        )
        .with_ordinal_in_id(true);
        assert!(!bag.uses_set_ordinal());
    }
}
