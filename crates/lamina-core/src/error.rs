//! Error taxonomy for the contract layer
//!
//! Each failure mode is a distinct, catchable type. Nothing here is retried
//! internally; propagation is always up to the caller.

use serde_json::Value;

/// Errors raised while declaring a schema type
///
/// These are fatal at declaration time. A schema that failed to declare
/// cannot be used, so the failure must surface before any invocation runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaDefinitionError {
    #[error("schema type name cannot be empty")]
    EmptyTypeName,

    #[error("schema type '{schema}' declares a field with an empty name")]
    EmptyFieldName { schema: String },

    #[error("duplicate field '{field}' declared on schema type '{schema}'")]
    DuplicateField { schema: String, field: String },

    #[error("default for field '{field}' on schema type '{schema}' does not conform to {expected}")]
    DefaultTypeMismatch {
        schema: String,
        field: String,
        expected: String,
    },
}

/// Errors raised while binding values into a schema instance
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InstanceError {
    #[error("schema type '{schema}' has no field named '{field}'")]
    UnknownField { schema: String, field: String },

    #[error("value bound to field '{field}' on schema type '{schema}' does not conform to {expected}")]
    TypeMismatch {
        schema: String,
        field: String,
        expected: String,
    },

    #[error("field '{field}' on schema type '{schema}' is unbound and has no default")]
    Unbound { schema: String, field: String },
}

/// A required configuration key is absent after full precedence resolution
///
/// Surfaced before any dispatch occurs, either by the registry (for keys it
/// was told to require) or by the invocation pipeline (for keys the backend
/// capability demands).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("engine '{engine}' is missing required configuration key '{key}'")]
pub struct EngineConfigurationError {
    pub engine: String,
    pub key: String,
}

impl EngineConfigurationError {
    pub fn missing_key(engine: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            key: key.into(),
        }
    }
}

/// The backend capability itself failed (network, auth, quota)
///
/// Wraps the underlying cause; never retried by this layer.
#[derive(Debug, thiserror::Error)]
#[error("backend '{backend}' failed: {message}")]
pub struct BackendError {
    pub backend: String,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    pub fn new(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        backend: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            backend: backend.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// A failure in any stage of the invocation pipeline
///
/// `MissingField` and `FieldType` name the offending field with a dotted
/// path (`address.city`, `tags[2]`) when the failure is inside a nested
/// schema or a list element.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error(transparent)]
    Configuration(#[from] EngineConfigurationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("response is missing field '{field}' which has no default")]
    MissingField { field: String },

    #[error("response field '{field}' expects {expected}, got {raw}")]
    FieldType {
        field: String,
        expected: String,
        raw: Value,
    },

    #[error(transparent)]
    Instance(#[from] InstanceError),
}
