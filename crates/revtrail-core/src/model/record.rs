//! Audited collection changes, before a revision is stamped on them.

use crate::model::element::EntityId;
use crate::model::revision::RevisionType;
use crate::model::snapshot::ChangedElement;
use crate::model::value::{DataMap, Value};

/// One audited change to a collection.
///
/// `original_id` holds the middle-row identity (owner key columns, element or
/// index key columns, position, bag identifier, synthetic ordinal and, when so
/// configured, the revision type). `data` holds the non-key columns. The
/// revision itself is added by the active audit strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRecord {
    pub middle_table: String,
    pub owner_id: EntityId,
    pub revision_type: RevisionType,
    pub original_id: DataMap,
    pub data: DataMap,
    /// List position, or the synthetic iteration ordinal of an embeddable set
    pub ordinal: Option<u32>,
    /// Backing row identifier of an id-bag element
    pub bag_id: Option<Value>,
    /// Columns identifying the same logical element across revisions
    pub logical_key: DataMap,
    pub changed: ChangedElement,
}

impl ElementRecord {
    /// Flattened persisted row: `original_id` merged with `data`
    pub fn row(&self) -> DataMap {
        let mut row = self.original_id.clone();
        row.extend(self.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::element::Element;

    #[test]
    fn test_row_merges_id_and_data() {
        let mut original_id = DataMap::new();
        original_id.insert("owner_id".into(), Value::Int(1));
        let mut data = DataMap::new();
        data.insert("REVTYPE".into(), Value::Int(0));
        let record = ElementRecord {
            middle_table: "owner_items_AUD".into(),
            owner_id: EntityId::single("id", 1),
            revision_type: RevisionType::Add,
            original_id,
            data,
            ordinal: None,
            bag_id: None,
            logical_key: DataMap::new(),
            changed: ChangedElement::Element(Element::from("x")),
        };
        let row = record.row();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("REVTYPE"), Some(&Value::Int(0)));
    }
}
