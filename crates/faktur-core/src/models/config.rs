//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{FakturError, Result};

/// Main configuration for the faktur pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FakturConfig {
    /// Generative model configuration.
    pub model: ModelConfig,

    /// Item code mapping source configuration.
    pub mapping: MappingConfig,

    /// Batch processing configuration.
    pub batch: BatchConfig,

    /// Spreadsheet export configuration.
    pub export: ExportConfig,
}

/// Generative model service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the generative language API.
    pub endpoint: String,

    /// Model name.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl ModelConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Mapping source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// URL of the JSON mapping list.
    pub url: String,

    /// Record field holding the item code.
    pub code_field: String,

    /// Record field holding the secondary code.
    pub secondary_field: String,

    /// Seconds before a loaded table is considered stale.
    pub ttl_secs: u64,

    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            url: "https://raw.githubusercontent.com/magicmetapro/cimory/refs/heads/main/cimory.json"
                .to_string(),
            code_field: "KodeBarang".to_string(),
            secondary_field: "Scylla".to_string(),
            ttl_secs: 3600,
            request_timeout_secs: 30,
        }
    }
}

impl MappingConfig {
    /// Staleness window as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of documents processed concurrently (1 = sequential).
    pub concurrency: usize,

    /// Per-document model call timeout in seconds.
    pub document_timeout_secs: u64,

    /// Maximum characters kept in each text preview.
    pub preview_chars: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            document_timeout_secs: 120,
            preview_chars: 1000,
        }
    }
}

impl BatchConfig {
    /// Per-document timeout as a duration.
    pub fn document_timeout(&self) -> Duration {
        Duration::from_secs(self.document_timeout_secs)
    }
}

/// Spreadsheet export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Name of the line item sheet.
    pub items_sheet: String,

    /// Name of the extracted text sheet.
    pub texts_sheet: String,

    /// File name prefix for generated exports.
    pub file_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            items_sheet: "Data Faktur".to_string(),
            texts_sheet: "Teks Ekstrak".to_string(),
            file_prefix: "hasil_ekstraksi_faktur".to_string(),
        }
    }
}

impl FakturConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| FakturError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| FakturError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
