//! Field descriptors: the typed attributes a schema is made of

use std::fmt;

use serde_json::Value;

use crate::schema::{SchemaInstance, SchemaType};

/// The semantic value type a field may hold
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    /// A nested schema type
    Nested(SchemaType),
    /// A homogeneous sequence of another kind
    List(Box<FieldKind>),
}

impl FieldKind {
    /// Convenience constructor for `List`
    pub fn list(element: FieldKind) -> Self {
        Self::List(Box::new(element))
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Nested(schema) => write!(f, "schema '{}'", schema.name()),
            Self::List(element) => write!(f, "list of {element}"),
        }
    }
}

/// A concrete value bound to a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Nested(SchemaInstance),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Whether this value conforms to the given kind
    ///
    /// Nested values must belong to the exact nested schema type; list
    /// values must conform element by element.
    pub fn conforms_to(&self, kind: &FieldKind) -> bool {
        match (self, kind) {
            (Self::String(_), FieldKind::String) => true,
            (Self::Number(_), FieldKind::Number) => true,
            (Self::Boolean(_), FieldKind::Boolean) => true,
            (Self::Nested(instance), FieldKind::Nested(schema)) => instance.schema() == schema,
            (Self::List(items), FieldKind::List(element)) => {
                items.iter().all(|item| item.conforms_to(element))
            }
            _ => false,
        }
    }

    /// Render the value as plain JSON
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Nested(instance) => instance.to_json(),
            Self::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<SchemaInstance> for FieldValue {
    fn from(value: SchemaInstance) -> Self {
        Self::Nested(value)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(value: Vec<FieldValue>) -> Self {
        Self::List(value)
    }
}

/// One named, typed attribute of a schema type
///
/// The optional hint is a natural-language annotation that steers
/// generation/extraction for this field; it carries no validation weight.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    default: Option<FieldValue>,
    hint: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            hint: None,
        }
    }

    /// Attach a default value, used when the field is left unbound or is
    /// omitted from a backend response
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Attach a natural-language hint for the backend
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default(&self) -> Option<&FieldValue> {
        self.default.as_ref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// A field with no default must be bound explicitly
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(FieldKind::String.to_string(), "string");
        assert_eq!(FieldKind::list(FieldKind::Number).to_string(), "list of number");
        assert_eq!(
            FieldKind::list(FieldKind::list(FieldKind::Boolean)).to_string(),
            "list of list of boolean"
        );
    }

    #[test]
    fn test_value_conformance() {
        assert!(FieldValue::from("hi").conforms_to(&FieldKind::String));
        assert!(FieldValue::from(1.5).conforms_to(&FieldKind::Number));
        assert!(!FieldValue::from(true).conforms_to(&FieldKind::Number));

        let list = FieldValue::List(vec![FieldValue::from(1.0), FieldValue::from(2.0)]);
        assert!(list.conforms_to(&FieldKind::list(FieldKind::Number)));

        let mixed = FieldValue::List(vec![FieldValue::from(1.0), FieldValue::from("x")]);
        assert!(!mixed.conforms_to(&FieldKind::list(FieldKind::Number)));
    }

    #[test]
    fn test_descriptor_builder() {
        let field = FieldDescriptor::new("age", FieldKind::Number)
            .with_default(0i64)
            .with_hint("the person's age in years");

        assert_eq!(field.name(), "age");
        assert_eq!(field.default(), Some(&FieldValue::Number(0.0)));
        assert_eq!(field.hint(), Some("the person's age in years"));
        assert!(!field.is_required());
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(FieldValue::from("x").to_json(), serde_json::json!("x"));
        assert_eq!(FieldValue::from(2.0).to_json(), serde_json::json!(2.0));
        assert_eq!(
            FieldValue::List(vec![FieldValue::from(true)]).to_json(),
            serde_json::json!([true])
        );
    }
}
