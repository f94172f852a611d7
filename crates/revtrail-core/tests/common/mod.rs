use revtrail_core::config::{
    AuditMetadata, CollectionConfig, CollectionKind, ComponentDescriptor, ComponentProperty,
    EntityConfig, GlobalConfig, MiddleComponent,
};
use revtrail_core::model::{Composite, Element, EntityId};

/// Metadata with a single audited `Owner` holding one collection
#[allow(dead_code)]
pub fn owner_with(property: &str, collection: CollectionConfig) -> AuditMetadata {
    let metadata = AuditMetadata::new(GlobalConfig::default())
        .with_component(
            "Component3",
            ComponentDescriptor::new(vec![
                ComponentProperty::scalar("str1"),
                ComponentProperty::scalar("str2"),
                ComponentProperty::scalar("note").not_audited(),
            ]),
        )
        .with_entity(
            "Owner",
            EntityConfig::new("Owner_AUD", &["id"]).with_collection(property, collection),
        );
    metadata.validate().expect("fixture metadata must be valid");
    metadata
}

#[allow(dead_code)]
pub fn value_set(table: &str) -> CollectionConfig {
    CollectionConfig::new(
        table,
        CollectionKind::Set,
        MiddleComponent::Value {
            column: "element".into(),
        },
    )
}

#[allow(dead_code)]
pub fn value_bag(table: &str) -> CollectionConfig {
    CollectionConfig::new(
        table,
        CollectionKind::Bag,
        MiddleComponent::Value {
            column: "element".into(),
        },
    )
}

#[allow(dead_code)]
pub fn embeddable_set(table: &str) -> CollectionConfig {
    CollectionConfig::new(
        table,
        CollectionKind::Set,
        MiddleComponent::Embeddable {
            component: "Component3".into(),
            prefix: "".into(),
        },
    )
}

#[allow(dead_code)]
pub fn component3(str1: &str, str2: &str) -> Element {
    Element::Composite(Composite::new("Component3").with("str1", str1).with("str2", str2))
}

#[allow(dead_code)]
pub fn owner_id(n: i64) -> EntityId {
    EntityId::single("id", n)
}
