// Property tests for the identity diff: bag arithmetic must hold for any
// pair of snapshots, duplicates included.

use proptest::prelude::*;
use revtrail_core::diff::diff;
use std::collections::HashMap;

fn counts(items: &[u8]) -> HashMap<u8, i64> {
    let mut counts = HashMap::new();
    for item in items {
        *counts.entry(*item).or_insert(0) += 1;
    }
    counts
}

fn small_bag() -> impl Strategy<Value = Vec<u8>> {
    // A narrow value range forces duplicates
    prop::collection::vec(0u8..6, 0..12)
}

proptest! {
    #[test]
    fn added_and_removed_swap_when_snapshots_swap(old in small_bag(), new in small_bag()) {
        let forward = diff(Some(old.as_slice()), Some(new.as_slice()));
        let backward = diff(Some(new.as_slice()), Some(old.as_slice()));
        prop_assert_eq!(counts(&forward.added), counts(&backward.removed));
        prop_assert_eq!(counts(&forward.removed), counts(&backward.added));
    }

    #[test]
    fn identical_snapshots_produce_nothing(snapshot in small_bag()) {
        let cs = diff(Some(snapshot.as_slice()), Some(snapshot.as_slice()));
        prop_assert!(cs.is_empty());
    }

    #[test]
    fn old_minus_removed_plus_added_is_new(old in small_bag(), new in small_bag()) {
        let cs = diff(Some(old.as_slice()), Some(new.as_slice()));
        let mut rebuilt = counts(&old);
        for item in &cs.removed {
            *rebuilt.entry(*item).or_insert(0) -= 1;
        }
        for item in &cs.added {
            *rebuilt.entry(*item).or_insert(0) += 1;
        }
        rebuilt.retain(|_, n| *n != 0);
        prop_assert_eq!(rebuilt, counts(&new));
    }

    #[test]
    fn added_and_removed_never_share_a_value(old in small_bag(), new in small_bag()) {
        let cs = diff(Some(old.as_slice()), Some(new.as_slice()));
        for item in &cs.added {
            prop_assert!(!cs.removed.contains(item));
        }
    }

    #[test]
    fn absent_snapshot_is_empty(snapshot in small_bag()) {
        let cs = diff(None, Some(snapshot.as_slice()));
        prop_assert_eq!(cs.added, snapshot);
        prop_assert!(cs.removed.is_empty());
    }
}
