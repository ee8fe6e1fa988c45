//! HTTP JSON backend
//!
//! This module encapsulates the one place a concrete network provider is
//! involved: it posts the structured request as JSON to a hosted endpoint
//! and hands the JSON object that comes back to the core pipeline untouched.

use anyhow::{Context, Result};
use lamina_core::error::BackendError;
use lamina_core::protocol::{Backend, StructuredRequest, StructuredResponse};
use lamina_core::registry::EngineHandle;
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

/// Dotted config key holding the base URL of the hosted endpoint
pub const URL_KEY: &str = "production.url";

/// Dotted config key holding the access credential
pub const CREDENTIAL_KEY: &str = "production.key";

/// Built-in default base URL, overridable per engine
pub const DEFAULT_BASE_URL: &str = "https://api.lamina.dev";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Blocking HTTP backend bound to one engine's configuration
pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpBackend {
    /// Build a backend from a resolved engine handle
    ///
    /// Reads `production.url` (falling back to the built-in default) and
    /// `production.key` (required) from the handle's configuration.
    pub fn from_engine(engine: &EngineHandle) -> Result<Self> {
        engine.require_keys([CREDENTIAL_KEY])?;
        let api_key = engine
            .get(CREDENTIAL_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
            .with_context(|| format!("engine '{}': '{CREDENTIAL_KEY}' must be a string", engine.id()))?;

        let base_url = engine
            .get(URL_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/invocations", self.base_url.trim_end_matches('/'))
    }
}

impl Backend for HttpBackend {
    fn send(&self, request: &StructuredRequest) -> Result<StructuredResponse, BackendError> {
        let url = self.endpoint();
        tracing::debug!(%url, output_type = %request.output_type, "dispatching invocation");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .map_err(|err| BackendError::with_source(self.name(), "request failed", err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::new(
                self.name(),
                format!("server returned {status}: {}", body.trim()),
            ));
        }

        let payload: Value = response
            .json()
            .map_err(|err| BackendError::with_source(self.name(), "response is not JSON", err))?;

        match payload {
            Value::Object(fields) => Ok(fields.into()),
            other => Err(BackendError::new(
                self.name(),
                format!("expected a JSON object, got {other}"),
            )),
        }
    }

    fn required_config(&self) -> &[&str] {
        &[CREDENTIAL_KEY]
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::registry::{EngineConfig, EngineRegistry};

    #[test]
    fn test_from_engine_requires_credential() {
        let registry = EngineRegistry::new();
        let engine = registry.resolve("my_test").unwrap();

        let err = HttpBackend::from_engine(&engine)
            .err()
            .expect("missing credential must fail");
        assert!(err.to_string().contains(CREDENTIAL_KEY));
    }

    #[test]
    fn test_from_engine_reads_url_and_key() {
        let registry = EngineRegistry::builder()
            .builtin(URL_KEY, DEFAULT_BASE_URL)
            .build();
        let config = EngineConfig::new().with(CREDENTIAL_KEY, "s3cret");
        let engine = registry.resolve_with("my_test", Some(&config)).unwrap();

        let backend = HttpBackend::from_engine(&engine).unwrap();
        assert_eq!(backend.endpoint(), "https://api.lamina.dev/v1/invocations");
        assert_eq!(backend.required_config(), &[CREDENTIAL_KEY]);
    }
}
