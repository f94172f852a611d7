use crate::model::{ChangedElement, CollectionSnapshot};
use std::collections::HashMap;
use std::hash::Hash;

/// Added and removed members between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

impl<T> ChangeSet<T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// `minuend − subtrahend` as bags, in the minuend's order.
fn bag_difference<T: Hash + Eq + Clone>(minuend: &[T], subtrahend: &[T]) -> Vec<T> {
    let mut counts: HashMap<&T, usize> = HashMap::with_capacity(subtrahend.len());
    for item in subtrahend {
        *counts.entry(item).or_insert(0) += 1;
    }

    minuend
        .iter()
        .filter(|item| match counts.get_mut(*item) {
            Some(n) if *n > 0 => {
                *n -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

/// Multiset difference in both directions.
///
/// `added = new − old`, `removed = old − new`.
pub fn diff<T: Hash + Eq + Clone>(old: Option<&[T]>, new: Option<&[T]>) -> ChangeSet<T> {
    let old = old.unwrap_or(&[]);
    let new = new.unwrap_or(&[]);
    ChangeSet {
        added: bag_difference(new, old),
        removed: bag_difference(old, new),
    }
}

/// Diff two collection snapshots member by member.
///
/// List members carry their position, so moving an element is a removal
/// at the old position and an addition at the new one. Map members are
/// whole entries.
pub fn diff_snapshots(
    old: Option<&CollectionSnapshot>,
    new: Option<&CollectionSnapshot>,
) -> ChangeSet<ChangedElement> {
    let old_members = old.map(CollectionSnapshot::members).unwrap_or_default();
    let new_members = new.map(CollectionSnapshot::members).unwrap_or_default();
    diff(Some(old_members.as_slice()), Some(new_members.as_slice()))
}
