//! Task manifest parsing (YAML)
//!
//! A task manifest declares the schema types a task works with, the input
//! binding, the target output type, and optional engine configuration. It is
//! parsed into raw typed structs first, then compiled into core declarations
//! so every schema rule is enforced at declaration time.

use std::collections::BTreeMap;

use lamina_core::error::{InstanceError, InvokeError, SchemaDefinitionError};
use lamina_core::field::{FieldDescriptor, FieldKind};
use lamina_core::protocol::coerce_field;
use lamina_core::registry::EngineConfig;
use lamina_core::schema::{SchemaInstance, SchemaType};
use serde::Deserialize;
use serde_json::Value;

/// Errors while parsing or compiling a task manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to parse task manifest: {0}")]
    Parse(String),

    #[error("manifest declares no schema types")]
    NoTypes,

    #[error("duplicate schema type '{0}' in manifest")]
    DuplicateType(String),

    #[error("unknown type '{0}' referenced in manifest")]
    UnknownType(String),

    #[error("manifest value for '{key}' is not representable as JSON: {detail}")]
    Unrepresentable { key: String, detail: String },

    #[error(transparent)]
    Schema(#[from] SchemaDefinitionError),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Value(#[from] InvokeError),
}

/// Raw manifest as written in YAML
#[derive(Debug, Deserialize)]
pub struct TaskManifest {
    pub types: Vec<TypeDecl>,
    pub input: InputDecl,
    pub output: String,
    #[serde(default)]
    pub engine: Option<EngineDecl>,
}

#[derive(Debug, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InputDecl {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub values: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
pub struct EngineDecl {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub config: BTreeMap<String, serde_yaml::Value>,
}

/// A manifest compiled into ready-to-invoke core declarations
#[derive(Debug)]
pub struct CompiledTask {
    pub input: SchemaInstance,
    pub output: SchemaType,
    pub engine_id: Option<String>,
    pub engine_config: EngineConfig,
}

impl TaskManifest {
    /// Parse a YAML manifest string
    pub fn parse(yaml: &str) -> Result<Self, ManifestError> {
        serde_yaml::from_str(yaml).map_err(|err| ManifestError::Parse(err.to_string()))
    }

    /// Compile the manifest into core schema declarations
    ///
    /// Types are declared in manifest order; a field may reference any type
    /// declared before it, so nested schemas must appear first.
    pub fn compile(&self) -> Result<CompiledTask, ManifestError> {
        if self.types.is_empty() {
            return Err(ManifestError::NoTypes);
        }

        let mut declared: BTreeMap<String, SchemaType> = BTreeMap::new();
        for decl in &self.types {
            if declared.contains_key(&decl.name) {
                return Err(ManifestError::DuplicateType(decl.name.clone()));
            }

            let mut fields = Vec::with_capacity(decl.fields.len());
            for field in &decl.fields {
                let kind = parse_kind(&field.kind, &declared)?;
                let mut descriptor = FieldDescriptor::new(&field.name, kind.clone());
                if let Some(default) = &field.default {
                    let raw = to_json(&field.name, default)?;
                    descriptor = descriptor.with_default(coerce_field(&field.name, &kind, &raw)?);
                }
                if let Some(hint) = &field.hint {
                    descriptor = descriptor.with_hint(hint);
                }
                fields.push(descriptor);
            }

            let schema = SchemaType::declare(&decl.name, fields)?;
            declared.insert(decl.name.clone(), schema);
        }

        let input_type = declared
            .get(&self.input.kind)
            .ok_or_else(|| ManifestError::UnknownType(self.input.kind.clone()))?
            .clone();
        let output = declared
            .get(&self.output)
            .ok_or_else(|| ManifestError::UnknownType(self.output.clone()))?
            .clone();

        let mut builder = input_type.instance();
        for (name, value) in &self.input.values {
            let field = input_type
                .field(name)
                .ok_or_else(|| InstanceError::UnknownField {
                    schema: input_type.name().to_string(),
                    field: name.clone(),
                })?;
            let raw = to_json(name, value)?;
            let value = coerce_field(name, field.kind(), &raw)?;
            builder = builder.set(name, value)?;
        }
        let input = builder.build()?;

        let (engine_id, engine_config) = match &self.engine {
            Some(engine) => {
                let mut config = EngineConfig::new();
                for (key, value) in &engine.config {
                    config.insert(key, to_json(key, value)?);
                }
                (engine.id.clone(), config)
            }
            None => (None, EngineConfig::new()),
        };

        Ok(CompiledTask {
            input,
            output,
            engine_id,
            engine_config,
        })
    }
}

/// Parse a textual kind: scalar names, `list<...>`, or a declared type name
fn parse_kind(
    spec: &str,
    declared: &BTreeMap<String, SchemaType>,
) -> Result<FieldKind, ManifestError> {
    let spec = spec.trim();
    if let Some(inner) = spec.strip_prefix("list<").and_then(|s| s.strip_suffix('>')) {
        return Ok(FieldKind::list(parse_kind(inner, declared)?));
    }

    match spec {
        "string" | "str" => Ok(FieldKind::String),
        "number" | "int" | "float" => Ok(FieldKind::Number),
        "boolean" | "bool" => Ok(FieldKind::Boolean),
        other => declared
            .get(other)
            .cloned()
            .map(FieldKind::Nested)
            .ok_or_else(|| ManifestError::UnknownType(other.to_string())),
    }
}

fn to_json(key: &str, value: &serde_yaml::Value) -> Result<Value, ManifestError> {
    serde_json::to_value(value).map_err(|err| ManifestError::Unrepresentable {
        key: key.to_string(),
        detail: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::field::FieldValue;
    use serde_json::json;

    const ECHO_TASK: &str = r#"
types:
  - name: Test
    fields:
      - name: test_string
        type: string
        default: "just a test"
input:
  type: Test
  values:
    test_string: "testing 123"
output: Test
engine:
  id: my_test
  config:
    production.key: "09631de17832509fdf5c0e3a690f273994b45f5f"
"#;

    #[test]
    fn test_compile_echo_task() {
        let task = TaskManifest::parse(ECHO_TASK).unwrap().compile().unwrap();

        assert_eq!(task.output.name(), "Test");
        assert_eq!(
            task.input.get("test_string"),
            Some(&FieldValue::String("testing 123".to_string()))
        );
        assert_eq!(task.engine_id.as_deref(), Some("my_test"));
        assert_eq!(
            task.engine_config.get("production.key"),
            Some(&json!("09631de17832509fdf5c0e3a690f273994b45f5f"))
        );
    }

    #[test]
    fn test_nested_types_and_lists() {
        let yaml = r#"
types:
  - name: Address
    fields:
      - name: city
        type: string
  - name: Contact
    fields:
      - name: name
        type: string
        hint: full legal name
      - name: address
        type: Address
      - name: tags
        type: list<string>
        default: []
input:
  type: Contact
  values:
    name: Ada
    address:
      city: Lisbon
output: Contact
"#;
        let task = TaskManifest::parse(yaml).unwrap().compile().unwrap();

        assert_eq!(
            task.input.to_json(),
            json!({"name": "Ada", "address": {"city": "Lisbon"}, "tags": []})
        );
        let field = task.output.field("name").unwrap();
        assert_eq!(field.hint(), Some("full legal name"));
    }

    #[test]
    fn test_unknown_type_reference_fails() {
        let yaml = r#"
types:
  - name: A
    fields:
      - name: b
        type: Missing
input:
  type: A
  values: {}
output: A
"#;
        let err = TaskManifest::parse(yaml).unwrap().compile().unwrap_err();
        assert!(matches!(err, ManifestError::UnknownType(name) if name == "Missing"));
    }

    #[test]
    fn test_duplicate_field_surfaces_schema_error() {
        let yaml = r#"
types:
  - name: A
    fields:
      - name: x
        type: string
      - name: x
        type: number
input:
  type: A
  values: {}
output: A
"#;
        let err = TaskManifest::parse(yaml).unwrap().compile().unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Schema(SchemaDefinitionError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_input_value_coercion() {
        let yaml = r#"
types:
  - name: Q
    fields:
      - name: score
        type: number
input:
  type: Q
  values:
    score: "3.5"
output: Q
"#;
        let task = TaskManifest::parse(yaml).unwrap().compile().unwrap();
        assert_eq!(task.input.get("score"), Some(&FieldValue::Number(3.5)));
    }
}
