//! Flattening of embeddable values to and from flat records.

use crate::config::{AuditMetadata, ComponentDescriptor, PropertyKind};
use crate::errors::{AuditError, Result};
use crate::model::{Composite, DataMap, Element, EntityId, EntityRef, Value};

/// Maps one embeddable type to `prefix`-ed columns.
///
/// Nested embeddables recurse with prefix `<prefix><name>_`; entity-valued
/// properties occupy one `<prefix><name>_<id field>` column per id field.
/// Non-audited properties are skipped in both directions.
#[derive(Debug, Clone)]
pub struct ComponentMapper<'a> {
    metadata: &'a AuditMetadata,
    type_name: &'a str,
    descriptor: &'a ComponentDescriptor,
    prefix: String,
}

impl<'a> ComponentMapper<'a> {
    /// # Errors
    ///
    /// `InvalidConfiguration` if the embeddable is not declared.
    pub fn new(metadata: &'a AuditMetadata, type_name: &'a str, prefix: &str) -> Result<Self> {
        Ok(Self {
            metadata,
            type_name,
            descriptor: metadata.component(type_name)?,
            prefix: prefix.to_string(),
        })
    }

    /// Embeddables carry no identifier, so queries compare every column.
    pub fn needs_data_comparison(&self) -> bool {
        true
    }

    fn nested(&self, name: &str, component: &'a str) -> Result<ComponentMapper<'a>> {
        ComponentMapper::new(
            self.metadata,
            component,
            &format!("{}{}_", self.prefix, name),
        )
    }

    fn entity_columns(&self, name: &str, entity: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .metadata
            .entity(entity)?
            .id_fields
            .iter()
            .map(|f| (f.clone(), format!("{}{}_{}", self.prefix, name, f)))
            .collect())
    }

    /// Flat column list, in property order
    ///
    /// # Errors
    ///
    /// Configuration lookups for nested embeddables or referenced entities.
    pub fn columns(&self) -> Result<Vec<String>> {
        let mut columns = Vec::new();
        for property in self.descriptor.audited() {
            match &property.kind {
                PropertyKind::Scalar => {
                    columns.push(format!("{}{}", self.prefix, property.name));
                }
                PropertyKind::Nested { component } => {
                    columns.extend(self.nested(&property.name, component)?.columns()?);
                }
                PropertyKind::Entity { entity } => {
                    columns.extend(
                        self.entity_columns(&property.name, entity)?
                            .into_iter()
                            .map(|(_, c)| c),
                    );
                }
            }
        }
        Ok(columns)
    }

    /// Write `value` into `data`. Absent fields are written as null.
    ///
    /// # Errors
    ///
    /// `ElementMismatch` if the value is of another embeddable type or a
    /// field holds the wrong kind of element.
    pub fn map_to_record(&self, value: &Composite, data: &mut DataMap) -> Result<()> {
        if value.type_name != self.type_name {
            return Err(self.mismatch(&self.prefix, self.type_name, &value.type_name));
        }
        self.write_fields(Some(value), data)
    }

    fn write_fields(&self, value: Option<&Composite>, data: &mut DataMap) -> Result<()> {
        for property in self.descriptor.audited() {
            let field = value
                .and_then(|v| v.field(&property.name))
                .filter(|e| !e.is_null());
            match &property.kind {
                PropertyKind::Scalar => {
                    let column = format!("{}{}", self.prefix, property.name);
                    let v = match field {
                        None => Value::Null,
                        Some(Element::Scalar(v)) => v.clone(),
                        Some(other) => {
                            return Err(self.mismatch(&column, "scalar", other.variant_name()))
                        }
                    };
                    data.insert(column, v);
                }
                PropertyKind::Nested { component } => {
                    let mapper = self.nested(&property.name, component)?;
                    match field {
                        None => mapper.write_fields(None, data)?,
                        Some(Element::Composite(c)) => mapper.map_to_record(c, data)?,
                        Some(other) => {
                            return Err(self.mismatch(
                                &property.name,
                                "composite",
                                other.variant_name(),
                            ))
                        }
                    }
                }
                PropertyKind::Entity { entity } => {
                    let id = match field {
                        None => None,
                        Some(Element::Entity(r)) => Some(&r.id),
                        Some(other) => {
                            return Err(self.mismatch(&property.name, "entity", other.variant_name()))
                        }
                    };
                    for (id_field, column) in self.entity_columns(&property.name, entity)? {
                        let v = match id {
                            None => Value::Null,
                            Some(id) => id.get(&id_field).cloned().ok_or_else(|| {
                                AuditError::MissingIdComponent {
                                    entity: entity.clone(),
                                    field: id_field.clone(),
                                }
                            })?,
                        };
                        data.insert(column, v);
                    }
                }
            }
        }
        Ok(())
    }

    /// Rebuild a value from a stored record.
    ///
    /// Null scalars are left out of the rebuilt value; a nested embeddable
    /// or reference whose columns are all null is left out as well. The
    /// result still equals a value that spelled those fields out as null.
    ///
    /// # Errors
    ///
    /// `Instantiation` if a mapped column is absent from the record.
    pub fn map_from_record(&self, data: &DataMap) -> Result<Composite> {
        Ok(self
            .read_fields(data)?
            .unwrap_or_else(|| Composite::new(self.type_name)))
    }

    fn read_fields(&self, data: &DataMap) -> Result<Option<Composite>> {
        let mut composite = Composite::new(self.type_name);
        for property in self.descriptor.audited() {
            match &property.kind {
                PropertyKind::Scalar => {
                    let v = self.column(data, &format!("{}{}", self.prefix, property.name))?;
                    if !v.is_null() {
                        composite.fields.insert(property.name.clone(), Element::Scalar(v.clone()));
                    }
                }
                PropertyKind::Nested { component } => {
                    if let Some(nested) = self.nested(&property.name, component)?.read_fields(data)? {
                        composite.fields.insert(property.name.clone(), Element::Composite(nested));
                    }
                }
                PropertyKind::Entity { entity } => {
                    let mut components = Vec::new();
                    for (id_field, column) in self.entity_columns(&property.name, entity)? {
                        components.push((id_field, self.column(data, &column)?.clone()));
                    }
                    if components.iter().any(|(_, v)| !v.is_null()) {
                        composite.fields.insert(
                            property.name.clone(),
                            Element::Entity(EntityRef::new(
                                entity.clone(),
                                EntityId::composite(components),
                            )),
                        );
                    }
                }
            }
        }
        Ok((!composite.fields.is_empty()).then_some(composite))
    }

    fn column<'d>(&self, data: &'d DataMap, column: &str) -> Result<&'d Value> {
        data.get(column).ok_or_else(|| AuditError::Instantiation {
            type_name: self.type_name.to_string(),
            reason: format!("column {} is missing from the audit row", column),
        })
    }

    fn mismatch(&self, target: &str, expected: &str, actual: &str) -> AuditError {
        AuditError::ElementMismatch {
            target: format!("{}.{}", self.type_name, target),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
