// Middle records computed from snapshot pairs.

mod common;

use common::{component3, embeddable_set, owner_id, owner_with, value_bag, value_set};
use revtrail_core::compute_changes;
use revtrail_core::model::{CollectionSnapshot, Composite, Element, RevisionType, Value};

fn elements(items: Vec<Element>) -> CollectionSnapshot {
    CollectionSnapshot::Elements(items)
}

#[test]
fn test_changed_embeddable_is_an_add_and_a_delete() {
    let metadata = owner_with("components", embeddable_set("Owner_components_AUD"));
    let old = elements(vec![component3("a", "b"), component3("x", "y")]);
    let new = elements(vec![component3("a", "b"), component3("x", "z")]);

    let records = compute_changes(
        &metadata,
        "Owner",
        &owner_id(1),
        "components",
        Some(&new),
        Some(&old),
    )
    .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].revision_type, RevisionType::Add);
    assert_eq!(records[0].data.get("str2"), Some(&Value::from("z")));
    assert_eq!(records[1].revision_type, RevisionType::Del);
    assert_eq!(records[1].data.get("str2"), Some(&Value::from("y")));

    // Element columns live in the data part; the non-audited property is never written
    for record in &records {
        assert_eq!(record.original_id.get("owner_id"), Some(&Value::Int(1)));
        assert!(!record.original_id.contains_key("str1"));
        assert!(!record.row().contains_key("note"));
        assert_eq!(record.logical_key.get("str1"), Some(&Value::from("x")));
    }
}

#[test]
fn test_set_ordinals_restart_per_batch() {
    let collection = embeddable_set("Owner_components_AUD").with_ordinal_in_id(true);
    let metadata = owner_with("components", collection);
    let old = elements(vec![component3("gone", "1"), component3("gone", "2")]);
    let new = elements(vec![
        component3("new", "1"),
        component3("new", "2"),
        component3("new", "3"),
    ]);

    let records = compute_changes(
        &metadata,
        "Owner",
        &owner_id(1),
        "components",
        Some(&new),
        Some(&old),
    )
    .unwrap();

    let ordinals: Vec<(RevisionType, Option<u32>)> =
        records.iter().map(|r| (r.revision_type, r.ordinal)).collect();
    assert_eq!(
        ordinals,
        vec![
            (RevisionType::Add, Some(0)),
            (RevisionType::Add, Some(1)),
            (RevisionType::Add, Some(2)),
            (RevisionType::Del, Some(0)),
            (RevisionType::Del, Some(1)),
        ]
    );
    assert_eq!(records[4].original_id.get("SETORDINAL"), Some(&Value::Int(1)));
    assert!(records
        .iter()
        .all(|r| !r.logical_key.contains_key("SETORDINAL")));
}

#[test]
fn test_revision_type_can_be_part_of_the_row_id() {
    let collection = value_set("Owner_tags_AUD").with_revision_type_in_id(true);
    let metadata = owner_with("tags", collection);

    let records = compute_changes(
        &metadata,
        "Owner",
        &owner_id(3),
        "tags",
        Some(&elements(vec![Element::from("a")])),
        None,
    )
    .unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.original_id.get("REVTYPE"), Some(&Value::Int(0)));
    assert_eq!(record.original_id.get("element"), Some(&Value::from("a")));
    assert!(record.data.is_empty());
    assert_eq!(record.logical_key.len(), 2);
}

#[test]
fn test_cleared_collection_deletes_every_member() {
    let metadata = owner_with("tags", value_set("Owner_tags_AUD"));
    let old = elements(vec![Element::from("a"), Element::from("a"), Element::from("b")]);

    let records =
        compute_changes(&metadata, "Owner", &owner_id(1), "tags", None, Some(&old)).unwrap();

    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.revision_type == RevisionType::Del));
    assert!(records
        .iter()
        .all(|r| r.data.get("REVTYPE") == Some(&Value::Int(2))));
}

#[test]
fn test_bag_copies_get_their_own_occurrence() {
    let metadata = owner_with("tags", value_bag("Owner_tags_AUD"));
    let two = elements(vec![Element::from("v"), Element::from("v")]);
    let one = elements(vec![Element::from("v")]);

    let added =
        compute_changes(&metadata, "Owner", &owner_id(1), "tags", Some(&two), None).unwrap();
    let occurrences: Vec<Option<&Value>> = added
        .iter()
        .map(|r| r.original_id.get("OCCURRENCE"))
        .collect();
    assert_eq!(occurrences, vec![Some(&Value::Int(0)), Some(&Value::Int(1))]);
    assert_ne!(added[0].logical_key, added[1].logical_key);

    // Dropping one copy deletes the highest occurrence and leaves copy 0 alone
    let removed =
        compute_changes(&metadata, "Owner", &owner_id(1), "tags", Some(&one), Some(&two))
            .unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].revision_type, RevisionType::Del);
    assert_eq!(removed[0].logical_key, added[1].logical_key);
}

#[test]
fn test_null_field_against_restored_value_is_unchanged() {
    let metadata = owner_with("components", embeddable_set("Owner_components_AUD"));
    // The host spells out a null field; the value read back from the audit row omits it
    let host = Element::Composite(
        Composite::new("Component3")
            .with("str1", "a")
            .with("str2", Value::Null),
    );
    let restored = Element::Composite(Composite::new("Component3").with("str1", "a"));

    let records = compute_changes(
        &metadata,
        "Owner",
        &owner_id(1),
        "components",
        Some(&elements(vec![host])),
        Some(&elements(vec![restored])),
    )
    .unwrap();

    assert!(records.is_empty());
}
