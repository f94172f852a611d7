//! Pending audit work of one unit of work, merged per target.

use revtrail_core::model::{DataMap, ElementRecord, EntityId, RevisionType};
use std::collections::BTreeMap;

/// What will be written for one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EntityUnit {
    /// Reported by the host, with the state after the change
    Change {
        revision_type: RevisionType,
        state: DataMap,
    },
    /// Changed only through a collection or relation
    Marker,
    /// Added and deleted in the same unit of work
    Cancelled,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingEntity {
    pub entity: String,
    pub id: EntityId,
    pub unit: EntityUnit,
    /// `mapped_by` property to the owner it now points at
    pub foreign_keys: BTreeMap<String, Option<EntityId>>,
}

/// Merge a later host-reported change into an earlier unit
fn merge_change(earlier: EntityUnit, revision_type: RevisionType, state: DataMap) -> EntityUnit {
    use RevisionType::{Add, Del, Mod};
    let change = |revision_type| EntityUnit::Change {
        revision_type,
        state: state.clone(),
    };
    match earlier {
        EntityUnit::Marker => change(revision_type),
        // A re-insert after a cancelled insert is a fresh insert
        EntityUnit::Cancelled => change(revision_type),
        EntityUnit::Change {
            revision_type: previous,
            ..
        } => match (previous, revision_type) {
            (Add, Del) => EntityUnit::Cancelled,
            (Add, _) => change(Add),
            (Mod, Del) | (Del, Del) | (Del, Mod) => change(Del),
            (Mod, _) => change(Mod),
            (Del, Add) => change(Mod),
        },
    }
}

#[derive(Debug, Default)]
pub(crate) struct PendingWork {
    entities: Vec<PendingEntity>,
    entity_index: BTreeMap<(String, EntityId), usize>,
    records: Vec<Option<ElementRecord>>,
    record_index: BTreeMap<(String, DataMap), usize>,
}

impl PendingWork {
    pub fn is_empty(&self) -> bool {
        self.entities().next().is_none() && self.records().next().is_none()
    }

    fn slot(&mut self, entity: &str, id: &EntityId) -> &mut PendingEntity {
        let key = (entity.to_string(), id.clone());
        let index = match self.entity_index.get(&key) {
            Some(index) => *index,
            None => {
                self.entities.push(PendingEntity {
                    entity: entity.to_string(),
                    id: id.clone(),
                    unit: EntityUnit::Marker,
                    foreign_keys: BTreeMap::new(),
                });
                self.entity_index.insert(key, self.entities.len() - 1);
                self.entities.len() - 1
            }
        };
        &mut self.entities[index]
    }

    pub fn add_entity_change(
        &mut self,
        entity: &str,
        id: &EntityId,
        revision_type: RevisionType,
        state: DataMap,
    ) {
        let existed = self
            .entity_index
            .contains_key(&(entity.to_string(), id.clone()));
        let slot = self.slot(entity, id);
        slot.unit = if existed {
            merge_change(slot.unit.clone(), revision_type, state)
        } else {
            EntityUnit::Change {
                revision_type,
                state,
            }
        };
    }

    /// A marker never overrides an existing unit
    pub fn add_marker(&mut self, entity: &str, id: &EntityId) {
        self.slot(entity, id);
    }

    pub fn add_foreign_key(
        &mut self,
        entity: &str,
        id: &EntityId,
        mapped_by: &str,
        value: Option<EntityId>,
    ) {
        self.slot(entity, id)
            .foreign_keys
            .insert(mapped_by.to_string(), value);
    }

    /// Opposite changes to the same logical row cancel out; a repeated
    /// change replaces the earlier one.
    pub fn add_record(&mut self, record: ElementRecord) {
        let key = (record.middle_table.clone(), record.logical_key.clone());
        if let Some(&index) = self.record_index.get(&key) {
            let cancels = self.records[index]
                .as_ref()
                .is_some_and(|earlier| earlier.revision_type != record.revision_type);
            if cancels {
                self.records[index] = None;
                self.record_index.remove(&key);
                return;
            }
            self.records[index] = Some(record);
            return;
        }
        self.records.push(Some(record));
        self.record_index.insert(key, self.records.len() - 1);
    }

    pub fn entities(&self) -> impl Iterator<Item = &PendingEntity> {
        self.entities
            .iter()
            .filter(|e| e.unit != EntityUnit::Cancelled)
    }

    pub fn records(&self) -> impl Iterator<Item = &ElementRecord> {
        self.records.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revtrail_core::model::{ChangedElement, Element, Value};

    fn state(name: &str) -> DataMap {
        let mut state = DataMap::new();
        state.insert("name".into(), Value::from(name));
        state
    }

    fn record(tag: &str, revision_type: RevisionType) -> ElementRecord {
        let mut logical_key = DataMap::new();
        logical_key.insert("tag".into(), Value::from(tag));
        ElementRecord {
            middle_table: "Owner_tags_AUD".into(),
            owner_id: EntityId::single("id", 1),
            revision_type,
            original_id: logical_key.clone(),
            data: DataMap::new(),
            ordinal: None,
            bag_id: None,
            logical_key,
            changed: ChangedElement::Element(Element::from(tag)),
        }
    }

    #[test]
    fn test_add_then_modify_stays_add_with_newest_state() {
        let mut work = PendingWork::default();
        let id = EntityId::single("id", 1);
        work.add_entity_change("Owner", &id, RevisionType::Add, state("a"));
        work.add_entity_change("Owner", &id, RevisionType::Mod, state("b"));

        let pending: Vec<_> = work.entities().collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending[0].unit,
            EntityUnit::Change {
                revision_type: RevisionType::Add,
                state: state("b")
            }
        );
    }

    #[test]
    fn test_add_then_delete_writes_nothing() {
        let mut work = PendingWork::default();
        let id = EntityId::single("id", 1);
        work.add_entity_change("Owner", &id, RevisionType::Add, state("a"));
        work.add_entity_change("Owner", &id, RevisionType::Del, DataMap::new());
        work.add_marker("Owner", &id);

        assert_eq!(work.entities().count(), 0);
    }

    #[test]
    fn test_modify_then_delete_is_delete() {
        let mut work = PendingWork::default();
        let id = EntityId::single("id", 1);
        work.add_marker("Owner", &id);
        work.add_entity_change("Owner", &id, RevisionType::Mod, state("a"));
        work.add_entity_change("Owner", &id, RevisionType::Del, DataMap::new());

        let pending: Vec<_> = work.entities().collect();
        assert!(matches!(
            pending[0].unit,
            EntityUnit::Change {
                revision_type: RevisionType::Del,
                ..
            }
        ));
    }

    #[test]
    fn test_opposite_records_cancel() {
        let mut work = PendingWork::default();
        work.add_record(record("x", RevisionType::Add));
        work.add_record(record("x", RevisionType::Del));
        assert!(work.is_empty());

        work.add_record(record("x", RevisionType::Add));
        work.add_record(record("y", RevisionType::Del));
        assert_eq!(work.records().count(), 2);
    }

    #[test]
    fn test_bag_copies_with_distinct_occurrences_are_kept() {
        let copy = |occurrence: i64| {
            let mut record = record("x", RevisionType::Add);
            record
                .logical_key
                .insert("OCCURRENCE".into(), Value::Int(occurrence));
            record
        };
        let mut work = PendingWork::default();
        work.add_record(copy(0));
        work.add_record(copy(1));
        assert_eq!(work.records().count(), 2);
    }
}
