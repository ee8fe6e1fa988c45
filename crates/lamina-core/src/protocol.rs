//! Invocation protocol: schema in, validated schema out
//!
//! Builds a backend-agnostic structured request from an input instance and a
//! target schema type, dispatches it through the backend capability, and
//! coerces the raw response back into a validated instance of the target
//! type. The pipeline is synchronous and never retries; retry and timeout
//! policy belong to the backend or the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BackendError, InvokeError};
use crate::field::{FieldKind, FieldValue};
use crate::registry::EngineHandle;
use crate::schema::{SchemaInstance, SchemaType};

/// One bound input field: name, serialized value, optional steering hint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputField {
    pub name: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// One expected output field: name, textual kind, optional steering hint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// The backend-agnostic structured request
///
/// Input fields appear in the input schema's declared order; output fields
/// describe the contract the backend is instructed to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredRequest {
    pub engine: String,
    pub input_type: String,
    pub output_type: String,
    pub inputs: Vec<InputField>,
    pub outputs: Vec<OutputField>,
}

/// The raw structured payload a backend returns: field name to raw value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredResponse {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl From<Map<String, Value>> for StructuredResponse {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// The external model-serving capability
///
/// This is the sole point where control leaves the pipeline. Implementations
/// are a black box: they take the structured request and either return a raw
/// payload or fail with a [`BackendError`].
pub trait Backend {
    /// Dispatch one structured request
    fn send(&self, request: &StructuredRequest) -> Result<StructuredResponse, BackendError>;

    /// Dotted configuration keys this capability demands on the engine handle
    ///
    /// Checked before any dispatch; a missing key fails the invocation with
    /// an [`EngineConfigurationError`].
    fn required_config(&self) -> &[&str] {
        &[]
    }

    /// Capability name used in diagnostics
    fn name(&self) -> &str {
        "backend"
    }
}

/// Serialize an input instance and an output contract into a request
pub fn build_request(
    engine: &EngineHandle,
    input: &SchemaInstance,
    output_type: &SchemaType,
) -> StructuredRequest {
    let inputs = input
        .iter()
        .map(|(field, value)| InputField {
            name: field.name().to_string(),
            value: value.to_json(),
            hint: field.hint().map(str::to_string),
        })
        .collect();

    let outputs = output_type
        .fields()
        .iter()
        .map(|field| OutputField {
            name: field.name().to_string(),
            kind: field.kind().to_string(),
            hint: field.hint().map(str::to_string),
        })
        .collect();

    StructuredRequest {
        engine: engine.id().to_string(),
        input_type: input.schema().name().to_string(),
        output_type: output_type.name().to_string(),
        inputs,
        outputs,
    }
}

/// Run one full invocation: build, dispatch, parse, validate
pub fn invoke(
    backend: &dyn Backend,
    engine: &EngineHandle,
    input: &SchemaInstance,
    output_type: &SchemaType,
) -> Result<SchemaInstance, InvokeError> {
    engine.require_keys(backend.required_config().iter().copied())?;

    let request = build_request(engine, input, output_type);
    let response = backend.send(&request)?;
    parse_response(&response, output_type)
}

/// Validate a raw payload against a target schema type
///
/// Fields absent from the payload take their declared default; a missing
/// field with no default fails. Payload fields not declared on the target
/// type are dropped silently, tolerating backend over-generation.
pub fn parse_response(
    response: &StructuredResponse,
    output_type: &SchemaType,
) -> Result<SchemaInstance, InvokeError> {
    let mut values = Vec::with_capacity(output_type.fields().len());

    for field in output_type.fields() {
        let value = match response.fields.get(field.name()) {
            Some(raw) => coerce_field(field.name(), field.kind(), raw)?,
            None => match field.default() {
                Some(default) => default.clone(),
                None => {
                    return Err(InvokeError::MissingField {
                        field: field.name().to_string(),
                    })
                }
            },
        };
        values.push(value);
    }

    Ok(SchemaInstance::from_values(output_type.clone(), values))
}

/// Coerce one raw value to a declared kind
///
/// Coercion is accepted only where unambiguous: scalars render to strings,
/// numeric strings parse as numbers, `"true"`/`"false"` parse as booleans.
/// Nested schemas recurse with the same default-substitution policy; `path`
/// grows dotted (`address.city`) and indexed (`tags[2]`) segments so errors
/// name the exact offending field.
pub fn coerce_field(path: &str, kind: &FieldKind, raw: &Value) -> Result<FieldValue, InvokeError> {
    let mismatch = || InvokeError::FieldType {
        field: path.to_string(),
        expected: kind.to_string(),
        raw: raw.clone(),
    };

    match kind {
        FieldKind::String => match raw {
            Value::String(s) => Ok(FieldValue::String(s.clone())),
            Value::Number(n) => Ok(FieldValue::String(n.to_string())),
            Value::Bool(b) => Ok(FieldValue::String(b.to_string())),
            _ => Err(mismatch()),
        },
        FieldKind::Number => match raw {
            Value::Number(n) => n.as_f64().map(FieldValue::Number).ok_or_else(mismatch),
            // Non-finite parses ("NaN", "inf") are rejected: they have no
            // JSON representation and break instance value equality.
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Number)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        FieldKind::Boolean => match raw {
            Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(FieldValue::Boolean(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(FieldValue::Boolean(false)),
            _ => Err(mismatch()),
        },
        FieldKind::Nested(schema) => {
            let object = raw.as_object().ok_or_else(mismatch)?;
            let mut values = Vec::with_capacity(schema.fields().len());

            for field in schema.fields() {
                let child_path = format!("{path}.{}", field.name());
                let value = match object.get(field.name()) {
                    Some(raw) => coerce_field(&child_path, field.kind(), raw)?,
                    None => match field.default() {
                        Some(default) => default.clone(),
                        None => return Err(InvokeError::MissingField { field: child_path }),
                    },
                };
                values.push(value);
            }

            Ok(FieldValue::Nested(SchemaInstance::from_values(
                schema.clone(),
                values,
            )))
        }
        FieldKind::List(element) => {
            let items = raw.as_array().ok_or_else(mismatch)?;
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                out.push(coerce_field(&format!("{path}[{index}]"), element, item)?);
            }
            Ok(FieldValue::List(out))
        }
    }
}
