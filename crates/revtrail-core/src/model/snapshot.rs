//! Collection snapshots supplied by the host mapper.

use crate::model::element::Element;
use crate::model::value::Value;
use serde::{Deserialize, Serialize};

/// Full content of one collection at one point in time.
///
/// The variant is the collection's shape; which shape a collection must
/// use follows from its configured kind (see `CollectionKind::shape`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionSnapshot {
    /// Sets and bags: unordered, duplicates meaningful for bags
    Elements(Vec<Element>),
    /// Lists and arrays: element at index `i` has position `i`
    Sequence(Vec<Element>),
    /// Maps: `(key, value)` entries
    Entries(Vec<(Element, Element)>),
    /// Id-bags: `(row identifier, element)` pairs
    Identified(Vec<(Value, Element)>),
}

/// Shape discriminator of a [`CollectionSnapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotShape {
    Elements,
    Sequence,
    Entries,
    Identified,
}

impl SnapshotShape {
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotShape::Elements => "elements",
            SnapshotShape::Sequence => "sequence",
            SnapshotShape::Entries => "entries",
            SnapshotShape::Identified => "identified",
        }
    }
}

/// The unit the diff engine compares: what counts as "one member" of a
/// collection of the given shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangedElement {
    Element(Element),
    Positioned { position: u32, element: Element },
    Entry { key: Element, value: Element },
}

impl ChangedElement {
    /// The element (map value for entries)
    pub fn element(&self) -> &Element {
        match self {
            ChangedElement::Element(e) => e,
            ChangedElement::Positioned { element, .. } => element,
            ChangedElement::Entry { value, .. } => value,
        }
    }

    pub fn key(&self) -> Option<&Element> {
        match self {
            ChangedElement::Entry { key, .. } => Some(key),
            _ => None,
        }
    }
}

impl CollectionSnapshot {
    pub fn shape(&self) -> SnapshotShape {
        match self {
            CollectionSnapshot::Elements(_) => SnapshotShape::Elements,
            CollectionSnapshot::Sequence(_) => SnapshotShape::Sequence,
            CollectionSnapshot::Entries(_) => SnapshotShape::Entries,
            CollectionSnapshot::Identified(_) => SnapshotShape::Identified,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CollectionSnapshot::Elements(v) | CollectionSnapshot::Sequence(v) => v.len(),
            CollectionSnapshot::Entries(v) => v.len(),
            CollectionSnapshot::Identified(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in iteration order.
    ///
    /// Positions are dense per snapshot: the element at index `i` of a
    /// sequence is member `(i, element)`. Identified members compare by
    /// element only; their identifiers are recovered after the diff.
    pub fn members(&self) -> Vec<ChangedElement> {
        match self {
            CollectionSnapshot::Elements(v) => {
                v.iter().cloned().map(ChangedElement::Element).collect()
            }
            CollectionSnapshot::Sequence(v) => v
                .iter()
                .enumerate()
                .map(|(i, e)| ChangedElement::Positioned {
                    position: i as u32,
                    element: e.clone(),
                })
                .collect(),
            CollectionSnapshot::Entries(v) => v
                .iter()
                .map(|(k, e)| ChangedElement::Entry {
                    key: k.clone(),
                    value: e.clone(),
                })
                .collect(),
            CollectionSnapshot::Identified(v) => v
                .iter()
                .map(|(_, e)| ChangedElement::Element(e.clone()))
                .collect(),
        }
    }
}
