//! Error types for the faktur-core library.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the faktur library.
#[derive(Error, Debug)]
pub enum FakturError {
    /// Document text extraction error.
    #[error("text extraction error: {0}")]
    TextExtraction(#[from] TextExtractionError),

    /// Model call error.
    #[error("model call error: {0}")]
    ModelCall(#[from] ModelCallError),

    /// Model response could not be parsed.
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] ResponseError),

    /// Mapping source error.
    #[error("mapping error: {0}")]
    MappingLoad(#[from] MappingLoadError),

    /// Batch contract violation.
    #[error("batch error: {0}")]
    Batch(#[from] BatchError),

    /// Spreadsheet export error.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while reading the text layer of a document.
///
/// None of these fail a document on their own: the batch falls back to
/// sending the raw document bytes to the model.
#[derive(Error, Debug)]
pub enum TextExtractionError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Page text could not be decoded.
    #[error("failed to extract text: {0}")]
    Text(String),

    /// Extraction succeeded but produced only whitespace.
    #[error("document has no text layer")]
    NoTextLayer,

    /// The blocking extraction task did not complete.
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Errors from the external model service.
#[derive(Error, Debug)]
pub enum ModelCallError {
    /// No API key was configured.
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),

    /// Transport-level failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The call did not finish within the per-document timeout.
    #[error("model call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Quota exhausted or rate limited (HTTP 429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Non-success status from the service.
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The service refused to answer the prompt.
    #[error("prompt blocked: {0}")]
    Blocked(String),

    /// Response body did not have the expected envelope.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The service answered with no text.
    #[error("model returned no text")]
    EmptyResponse,
}

/// Errors for model output that does not contain a valid item array.
#[derive(Error, Debug, PartialEq)]
pub enum ResponseError {
    /// No `[` ... `]` pair in the response.
    #[error("no JSON array found in response: {0}")]
    NoJsonArray(String),

    /// The bracketed substring is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The bracketed substring parsed, but not to an array.
    #[error("expected a JSON array")]
    NotAnArray,

    /// An element is missing a field or has the wrong type.
    #[error("invalid item at index {index}: {reason}")]
    InvalidItem { index: usize, reason: String },
}

/// Errors loading the item code mapping.
#[derive(Error, Debug)]
pub enum MappingLoadError {
    /// Transport-level failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("mapping source returned {0}")]
    Status(u16),

    /// Body was not a JSON array.
    #[error("failed to decode mapping: {0}")]
    Decode(String),
}

/// Failure of a single document in a batch.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The model call failed.
    #[error(transparent)]
    ModelCall(#[from] ModelCallError),

    /// The model response was malformed.
    #[error(transparent)]
    MalformedResponse(#[from] ResponseError),

    /// The model returned an empty item array.
    #[error("no line items found in model response")]
    NoLineItems,

    /// The batch was cancelled before this document started.
    #[error("batch cancelled before processing")]
    Cancelled,
}

/// Coarse classification of a [`DocumentError`], kept on results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ModelCall,
    Timeout,
    MalformedResponse,
    NoLineItems,
    Cancelled,
}

impl DocumentError {
    /// Classify this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            DocumentError::ModelCall(ModelCallError::Timeout(_)) => FailureKind::Timeout,
            DocumentError::ModelCall(_) => FailureKind::ModelCall,
            DocumentError::MalformedResponse(_) => FailureKind::MalformedResponse,
            DocumentError::NoLineItems => FailureKind::NoLineItems,
            DocumentError::Cancelled => FailureKind::Cancelled,
        }
    }
}

/// Errors that abort a whole batch.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BatchError {
    /// The caller passed no documents.
    #[error("no documents to process")]
    EmptyBatch,
}

/// Errors writing the spreadsheet export.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Workbook writer error.
    #[error("workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// I/O error while saving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the faktur library.
pub type Result<T> = std::result::Result<T, FakturError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_document_error_kind() {
        let timeout = DocumentError::from(ModelCallError::Timeout(Duration::from_secs(5)));
        assert_eq!(timeout.kind(), FailureKind::Timeout);

        let api = DocumentError::from(ModelCallError::Api {
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(api.kind(), FailureKind::ModelCall);

        let malformed = DocumentError::from(ResponseError::NotAnArray);
        assert_eq!(malformed.kind(), FailureKind::MalformedResponse);
    }

    #[test]
    fn test_document_error_message_is_transparent() {
        let err = DocumentError::from(ResponseError::InvalidItem {
            index: 2,
            reason: "missing field kuantum".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "invalid item at index 2: missing field kuantum"
        );
    }
}
