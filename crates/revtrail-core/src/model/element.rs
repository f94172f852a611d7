//! Collection element values.
//!
//! Elements form a closed tree: a leaf scalar, a reference to another
//! audited entity, or a composite (embeddable) value whose fields are
//! themselves elements. Each node owns its children.

use crate::model::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Identifier of an audited entity, possibly composite.
///
/// Compared by value, never by the identity of the owning object. Components
/// are keyed by id field name; the declared field order used for query
/// parameters comes from configuration, not from this map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(BTreeMap<String, Value>);

impl EntityId {
    /// Single-column identifier
    pub fn single(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut components = BTreeMap::new();
        components.insert(field.into(), value.into());
        Self(components)
    }

    /// Composite identifier from `(field, value)` pairs
    pub fn composite<I, K, V>(components: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self(
            components
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(","))
    }
}

/// Reference to an audited entity by name and id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity: String,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(entity: impl Into<String>, id: EntityId) -> Self {
        Self {
            entity: entity.into(),
            id,
        }
    }
}

/// An embeddable value: named fields, some of which may not be audited.
///
/// Compared over its present fields only: a field holding a null scalar
/// (or a nested composite with nothing present) equals an absent field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composite {
    pub type_name: String,
    pub fields: BTreeMap<String, Element>,
}

impl Composite {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, name: impl Into<String>, element: impl Into<Element>) -> Self {
        self.fields.insert(name.into(), element.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Element> {
        self.fields.get(name)
    }

    /// Fields that hold a value, in name order
    pub fn present_fields(&self) -> impl Iterator<Item = (&String, &Element)> {
        self.fields.iter().filter(|(_, e)| !e.is_vacant())
    }
}

impl PartialEq for Composite {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.present_fields().eq(other.present_fields())
    }
}

impl Eq for Composite {}

impl Hash for Composite {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);
        for (name, element) in self.present_fields() {
            name.hash(state);
            element.hash(state);
        }
    }
}

impl PartialOrd for Composite {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Composite {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_name
            .cmp(&other.type_name)
            .then_with(|| self.present_fields().cmp(other.present_fields()))
    }
}

/// One collection element, map key or map value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    Scalar(Value),
    Entity(EntityRef),
    Composite(Composite),
}

impl Element {
    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Element::Entity(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Element::Scalar(Value::Null))
    }

    fn is_vacant(&self) -> bool {
        match self {
            Element::Composite(c) => c.present_fields().next().is_none(),
            other => other.is_null(),
        }
    }

    /// Short variant name for error messages
    pub fn variant_name(&self) -> &'static str {
        match self {
            Element::Scalar(_) => "scalar",
            Element::Entity(_) => "entity",
            Element::Composite(_) => "composite",
        }
    }
}

impl From<Value> for Element {
    fn from(v: Value) -> Self {
        Element::Scalar(v)
    }
}

impl From<EntityRef> for Element {
    fn from(r: EntityRef) -> Self {
        Element::Entity(r)
    }
}

impl From<Composite> for Element {
    fn from(c: Composite) -> Self {
        Element::Composite(c)
    }
}

impl From<&str> for Element {
    fn from(v: &str) -> Self {
        Element::Scalar(Value::from(v))
    }
}

impl From<i64> for Element {
    fn from(v: i64) -> Self {
        Element::Scalar(Value::Int(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_equality_ignores_construction_order() {
        let a = EntityId::composite([("b", 2), ("a", 1)]);
        let b = EntityId::composite([("a", 1), ("b", 2)]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "{a=1,b=2}");
    }

    #[test]
    fn test_composite_equality_includes_all_fields() {
        let c1 = Composite::new("Component").with("key", "c1").with("value", "v");
        let c2 = Composite::new("Component").with("key", "c1").with("value", "w");
        assert_ne!(Element::from(c1.clone()), Element::from(c2));
        assert_eq!(c1.field("key"), Some(&Element::from("c1")));
    }

    #[test]
    fn test_null_field_equals_absent_field() {
        use std::collections::HashSet;

        let explicit = Composite::new("Component")
            .with("key", "c1")
            .with("value", Value::Null)
            .with("inner", Composite::new("Inner").with("x", Value::Null));
        let absent = Composite::new("Component").with("key", "c1");
        assert_eq!(explicit, absent);
        assert_eq!(explicit.cmp(&absent), Ordering::Equal);

        let set: HashSet<Element> = [Element::from(explicit), Element::from(absent)].into();
        assert_eq!(set.len(), 1);
    }
}
