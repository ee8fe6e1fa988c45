//! Schema types and schema instances
//!
//! A schema type is a named, ordered set of field descriptors, declared once
//! and immutable thereafter. A schema instance is a value binding of a schema
//! type: one conforming value per declared field.

use std::sync::Arc;

use crate::error::{InstanceError, SchemaDefinitionError};
use crate::field::{FieldDescriptor, FieldValue};

/// A named, ordered field declaration describing a structured shape
///
/// Cheap to clone; the declaration is shared behind an `Arc`. Two schema
/// types compare equal only when both name and field set match, so identical
/// fields under different names are not interchangeable.
#[derive(Debug, Clone)]
pub struct SchemaType {
    inner: Arc<TypeInner>,
}

#[derive(Debug)]
struct TypeInner {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl PartialEq for SchemaType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.name == other.inner.name && self.inner.fields == other.inner.fields)
    }
}

impl SchemaType {
    /// Declare a new schema type from an ordered list of field descriptors
    ///
    /// Field order is significant: it determines serialization and prompt
    /// order. Duplicate field names, empty names, and defaults that do not
    /// conform to their declared kind all fail here, at declaration time.
    pub fn declare(
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, SchemaDefinitionError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaDefinitionError::EmptyTypeName);
        }

        for (index, field) in fields.iter().enumerate() {
            if field.name().trim().is_empty() {
                return Err(SchemaDefinitionError::EmptyFieldName {
                    schema: name.clone(),
                });
            }
            if fields[..index].iter().any(|f| f.name() == field.name()) {
                return Err(SchemaDefinitionError::DuplicateField {
                    schema: name.clone(),
                    field: field.name().to_string(),
                });
            }
            if let Some(default) = field.default() {
                if !default.conforms_to(field.kind()) {
                    return Err(SchemaDefinitionError::DefaultTypeMismatch {
                        schema: name.clone(),
                        field: field.name().to_string(),
                        expected: field.kind().to_string(),
                    });
                }
            }
        }

        Ok(Self {
            inner: Arc::new(TypeInner { name, fields }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The declared fields, in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.inner.fields
    }

    /// Look up a field descriptor by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.inner.fields.iter().find(|f| f.name() == name)
    }

    /// Start building an instance of this schema type
    pub fn instance(&self) -> InstanceBuilder {
        InstanceBuilder {
            bound: vec![None; self.inner.fields.len()],
            schema: self.clone(),
        }
    }
}

/// A concrete value binding of a schema type
///
/// Instances are immutable once built and compare by value. Values are
/// stored aligned with the schema's field order.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaInstance {
    schema: SchemaType,
    values: Vec<FieldValue>,
}

impl SchemaInstance {
    /// Internal constructor for values already validated against the schema
    pub(crate) fn from_values(schema: SchemaType, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(schema.fields().len(), values.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &SchemaType {
        &self.schema
    }

    /// Look up a bound value by field name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema
            .fields()
            .iter()
            .position(|f| f.name() == name)
            .map(|index| &self.values[index])
    }

    /// Iterate (descriptor, value) pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldDescriptor, &FieldValue)> {
        self.schema.fields().iter().zip(self.values.iter())
    }

    /// Render the instance as a JSON object keyed by field name
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (field, value) in self.iter() {
            object.insert(field.name().to_string(), value.to_json());
        }
        serde_json::Value::Object(object)
    }
}

/// Builder for a schema instance
///
/// Unbound fields fall back to their declared default at `build` time;
/// a required field (no default) left unbound fails the build.
#[derive(Debug)]
pub struct InstanceBuilder {
    schema: SchemaType,
    bound: Vec<Option<FieldValue>>,
}

impl InstanceBuilder {
    /// Bind a value to a named field
    pub fn set(
        mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<Self, InstanceError> {
        let index = self
            .schema
            .fields()
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| InstanceError::UnknownField {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
            })?;

        let value = value.into();
        let kind = self.schema.fields()[index].kind();
        if !value.conforms_to(kind) {
            return Err(InstanceError::TypeMismatch {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
                expected: kind.to_string(),
            });
        }

        self.bound[index] = Some(value);
        Ok(self)
    }

    /// Finish the instance, substituting defaults for unbound fields
    pub fn build(self) -> Result<SchemaInstance, InstanceError> {
        let InstanceBuilder { schema, bound } = self;
        let mut values = Vec::with_capacity(bound.len());

        for (field, slot) in schema.fields().iter().zip(bound) {
            match slot {
                Some(value) => values.push(value),
                None => match field.default() {
                    Some(default) => values.push(default.clone()),
                    None => {
                        return Err(InstanceError::Unbound {
                            schema: schema.name().to_string(),
                            field: field.name().to_string(),
                        })
                    }
                },
            }
        }

        Ok(SchemaInstance::from_values(schema, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;

    fn person() -> SchemaType {
        SchemaType::declare(
            "Person",
            vec![
                FieldDescriptor::new("name", FieldKind::String),
                FieldDescriptor::new("age", FieldKind::Number).with_default(0i64),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_declare_preserves_field_order() {
        let schema = person();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["name", "age"]);
    }

    #[test]
    fn test_declare_rejects_duplicate_field() {
        let result = SchemaType::declare(
            "Broken",
            vec![
                FieldDescriptor::new("x", FieldKind::String),
                FieldDescriptor::new("x", FieldKind::Number),
            ],
        );

        assert_eq!(
            result.unwrap_err(),
            SchemaDefinitionError::DuplicateField {
                schema: "Broken".to_string(),
                field: "x".to_string(),
            }
        );
    }

    #[test]
    fn test_declare_rejects_nonconforming_default() {
        let result = SchemaType::declare(
            "Broken",
            vec![FieldDescriptor::new("count", FieldKind::Number).with_default("zero")],
        );

        assert!(matches!(
            result,
            Err(SchemaDefinitionError::DefaultTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_same_fields_different_names_not_equal() {
        let a = SchemaType::declare("A", vec![FieldDescriptor::new("x", FieldKind::String)]).unwrap();
        let b = SchemaType::declare("B", vec![FieldDescriptor::new("x", FieldKind::String)]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_build_substitutes_default() {
        let instance = person().instance().set("name", "Ada").unwrap().build().unwrap();
        assert_eq!(instance.get("age"), Some(&FieldValue::Number(0.0)));
    }

    #[test]
    fn test_build_fails_on_unbound_required_field() {
        let result = person().instance().build();
        assert_eq!(
            result.unwrap_err(),
            InstanceError::Unbound {
                schema: "Person".to_string(),
                field: "name".to_string(),
            }
        );
    }

    #[test]
    fn test_set_rejects_unknown_field() {
        let result = person().instance().set("height", 1.8);
        assert!(matches!(result, Err(InstanceError::UnknownField { .. })));
    }

    #[test]
    fn test_set_rejects_nonconforming_value() {
        let result = person().instance().set("age", "old");
        assert_eq!(
            result.unwrap_err(),
            InstanceError::TypeMismatch {
                schema: "Person".to_string(),
                field: "age".to_string(),
                expected: "number".to_string(),
            }
        );
    }

    #[test]
    fn test_nested_instance_value() {
        let address = SchemaType::declare(
            "Address",
            vec![FieldDescriptor::new("city", FieldKind::String)],
        )
        .unwrap();
        let contact = SchemaType::declare(
            "Contact",
            vec![
                FieldDescriptor::new("name", FieldKind::String),
                FieldDescriptor::new("address", FieldKind::Nested(address.clone())),
            ],
        )
        .unwrap();

        let home = address.instance().set("city", "Lisbon").unwrap().build().unwrap();
        let instance = contact
            .instance()
            .set("name", "Ada")
            .unwrap()
            .set("address", home)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            instance.to_json(),
            serde_json::json!({"name": "Ada", "address": {"city": "Lisbon"}})
        );
    }
}
