//! Mapping source over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::MappingLoadError;
use crate::models::config::MappingConfig;

/// Source of raw mapping records.
#[async_trait]
pub trait MappingSource: Send + Sync {
    /// Fetch the full list of records.
    async fn fetch(&self) -> Result<Vec<Value>, MappingLoadError>;
}

/// Fetches a JSON array of records with HTTP GET.
pub struct HttpMappingSource {
    client: reqwest::Client,
    url: String,
}

impl HttpMappingSource {
    /// Create a source for `url`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MappingLoadError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Create a source from configuration.
    pub fn from_config(config: &MappingConfig) -> Result<Self, MappingLoadError> {
        Self::new(
            config.url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl MappingSource for HttpMappingSource {
    async fn fetch(&self) -> Result<Vec<Value>, MappingLoadError> {
        debug!("Fetching mapping from {}", self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MappingLoadError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        decode_records(&body)
    }
}

/// Decode a response body into a list of records.
pub(crate) fn decode_records(body: &[u8]) -> Result<Vec<Value>, MappingLoadError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Array(records)) => Ok(records),
        Ok(other) => Err(MappingLoadError::Decode(format!(
            "expected a JSON array, got {}",
            json_type(&other)
        ))),
        Err(e) => Err(MappingLoadError::Decode(e.to_string())),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
