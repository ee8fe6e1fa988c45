//! # lamina-core
//!
//! Typed request/response contract layer between application code and a
//! model-serving capability, with no dependencies on OS, network, or any
//! specific LLM provider.
//!
//! This crate provides the full pipeline semantics:
//! - Declare named, ordered field schemas and bind instances of them
//! - Resolve engine identifiers into cached, configured handles
//! - Build a structured request, dispatch it through a backend capability,
//!   and coerce the raw response into a validated instance of the target type
//!
//! The actual model call lives behind the [`Backend`] trait; hosts supply it.

#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod protocol;
pub mod registry;
pub mod schema;

// Re-export commonly used types
pub use error::{
    BackendError, EngineConfigurationError, InstanceError, InvokeError, SchemaDefinitionError,
};
pub use field::{FieldDescriptor, FieldKind, FieldValue};
pub use protocol::{
    build_request, coerce_field, invoke, Backend, InputField, OutputField, StructuredRequest,
    StructuredResponse,
};
pub use registry::{EngineConfig, EngineHandle, EngineRegistry, EngineRegistryBuilder};
pub use schema::{InstanceBuilder, SchemaInstance, SchemaType};
