//! Backing identifiers of id-bag elements and occurrence numbers of plain
//! bag elements.

use crate::model::{CollectionSnapshot, Element, Value};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Element → candidate row identifiers, consumed first-available.
///
/// An element appearing several times maps to several identifiers. When
/// one of the duplicates is removed, the identifier handed out is the first
/// unused one, which need not be the row the host actually deleted.
#[derive(Debug, Clone, Default)]
pub struct IdentifierPool {
    candidates: HashMap<Element, VecDeque<Value>>,
}

impl IdentifierPool {
    /// Every identifier of an id-bag snapshot. Other shapes yield an empty
    /// pool.
    pub fn from_snapshot(snapshot: Option<&CollectionSnapshot>) -> Self {
        Self::build(snapshot, &BTreeSet::new())
    }

    /// Identifiers of `snapshot` that `previous` does not hold: the rows
    /// newly assigned since `previous`.
    pub fn assigned_since(
        snapshot: Option<&CollectionSnapshot>,
        previous: Option<&CollectionSnapshot>,
    ) -> Self {
        let existing: BTreeSet<Value> = match previous {
            Some(CollectionSnapshot::Identified(entries)) => {
                entries.iter().map(|(id, _)| id.clone()).collect()
            }
            _ => BTreeSet::new(),
        };
        Self::build(snapshot, &existing)
    }

    /// Occurrence numbers of the copies `snapshot` holds beyond `baseline`.
    ///
    /// The live copies of an equal value are numbered `0..count`, so going
    /// from `a` copies to `b > a` adds occurrences `a..b`. Called with the
    /// snapshots swapped it yields the occurrences a shrink removes.
    pub fn occurrences_beyond(
        snapshot: Option<&CollectionSnapshot>,
        baseline: Option<&CollectionSnapshot>,
    ) -> Self {
        let baseline_counts = element_counts(baseline);
        let mut candidates = HashMap::new();
        for (element, count) in element_counts(snapshot) {
            let from = baseline_counts.get(&element).copied().unwrap_or(0);
            if count > from {
                let numbers = (from..count).map(|n| Value::Int(n as i64)).collect();
                candidates.insert(element, numbers);
            }
        }
        Self { candidates }
    }

    fn build(snapshot: Option<&CollectionSnapshot>, exclude: &BTreeSet<Value>) -> Self {
        let mut candidates: HashMap<Element, VecDeque<Value>> = HashMap::new();
        if let Some(CollectionSnapshot::Identified(entries)) = snapshot {
            for (id, element) in entries {
                if !exclude.contains(id) {
                    candidates
                        .entry(element.clone())
                        .or_default()
                        .push_back(id.clone());
                }
            }
        }
        Self { candidates }
    }

    /// Pop the next identifier for `element`
    pub fn take(&mut self, element: &Element) -> Option<Value> {
        self.candidates.get_mut(element).and_then(VecDeque::pop_front)
    }

    pub fn remaining(&self, element: &Element) -> usize {
        self.candidates.get(element).map_or(0, VecDeque::len)
    }
}

fn element_counts(snapshot: Option<&CollectionSnapshot>) -> HashMap<Element, usize> {
    let mut counts = HashMap::new();
    if let Some(CollectionSnapshot::Elements(elements)) = snapshot {
        for element in elements {
            *counts.entry(element.clone()).or_insert(0) += 1;
        }
    }
    counts
}
