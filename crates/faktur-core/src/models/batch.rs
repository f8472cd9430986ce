//! Batch input and result models.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use super::line_item::LineItem;
use crate::error::{DocumentError, FailureKind};

/// MIME type sent with raw PDF bytes.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Marker appended to truncated previews.
pub const PREVIEW_ELLIPSIS: &str = "...";

/// An uploaded document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name used for attribution.
    pub name: String,
    /// Raw document bytes.
    pub bytes: Arc<[u8]>,
    /// Format identifier sent in binary mode.
    pub mime_type: String,
}

impl Document {
    /// Create a PDF document.
    pub fn pdf(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            mime_type: PDF_MIME_TYPE.to_string(),
        }
    }
}

/// How the document was presented to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Extracted text was sent.
    Text,
    /// Raw document bytes were sent.
    Binary,
    /// The model was never called.
    Skipped,
}

/// Outcome of reading the document's text layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TextLayer {
    /// Non-empty text was extracted.
    Present,
    /// The document parsed but has no text.
    Absent,
    /// The document could not be read as a PDF.
    Unreadable(String),
    /// Extraction was not attempted.
    NotRead,
}

/// A failed document, with its name and message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentFailure {
    /// Offending document name.
    pub document: String,
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable message.
    pub message: String,
}

impl DocumentFailure {
    /// Build from a document error.
    pub fn new(document: impl Into<String>, error: &DocumentError) -> Self {
        Self {
            document: document.into(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.document, self.message)
    }
}

/// Exactly one of: extracted items, or a failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// Non-empty list of line items.
    Extracted { items: Vec<LineItem> },
    /// Document failed.
    Failed { failure: DocumentFailure },
}

/// Truncated extracted text kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedTextPreview {
    /// Document name.
    pub source_document: String,
    /// Preview text, or the failure message for failed documents.
    pub text: String,
}

impl ExtractedTextPreview {
    /// Build a preview, truncating `text` to `max_chars` characters.
    pub fn new(source_document: impl Into<String>, text: &str, max_chars: usize) -> Self {
        Self {
            source_document: source_document.into(),
            text: truncate_preview(text, max_chars),
        }
    }
}

/// Truncate to `max_chars` characters, appending an ellipsis when cut.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], PREVIEW_ELLIPSIS),
        None => text.to_string(),
    }
}

/// Result for one document in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentResult {
    /// Position in upload order.
    pub index: usize,
    /// Document name.
    pub name: String,
    /// How the model received the document.
    pub input_mode: InputMode,
    /// Text layer state.
    pub text_layer: TextLayer,
    /// Diagnostic preview.
    pub preview: ExtractedTextPreview,
    /// Items or failure.
    pub outcome: DocumentOutcome,
}

impl DocumentResult {
    /// Items if the document succeeded.
    pub fn items(&self) -> Option<&[LineItem]> {
        match &self.outcome {
            DocumentOutcome::Extracted { items } => Some(items),
            DocumentOutcome::Failed { .. } => None,
        }
    }

    /// Failure if the document failed.
    pub fn failure(&self) -> Option<&DocumentFailure> {
        match &self.outcome {
            DocumentOutcome::Extracted { .. } => None,
            DocumentOutcome::Failed { failure } => Some(failure),
        }
    }

    /// Whether items were extracted.
    pub fn is_success(&self) -> bool {
        self.items().is_some()
    }
}

/// Overall batch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every document produced items.
    Complete,
    /// Some documents failed.
    Partial,
    /// No document produced items.
    NoSuccess,
}

/// Aggregate statistics over successful documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStats {
    pub documents_total: usize,
    pub documents_succeeded: usize,
    pub documents_failed: usize,
    pub item_count: usize,
    pub resolved_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_quantity: Decimal,
}

/// Results of a whole batch, in upload order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// One entry per input document.
    pub documents: Vec<DocumentResult>,
    /// When processing started.
    pub started_at: DateTime<Utc>,
    /// When processing finished.
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    /// All line items, flattened in document order.
    pub fn line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.documents
            .iter()
            .filter_map(DocumentResult::items)
            .flatten()
    }

    /// Previews for every document.
    pub fn previews(&self) -> impl Iterator<Item = &ExtractedTextPreview> {
        self.documents.iter().map(|doc| &doc.preview)
    }

    /// Failed documents.
    pub fn failures(&self) -> impl Iterator<Item = &DocumentFailure> {
        self.documents.iter().filter_map(DocumentResult::failure)
    }

    /// Compute aggregate statistics.
    pub fn stats(&self) -> BatchStats {
        let documents_succeeded = self.documents.iter().filter(|d| d.is_success()).count();
        let mut item_count = 0;
        let mut resolved_count = 0;
        let mut total_quantity = Decimal::ZERO;

        for item in self.line_items() {
            item_count += 1;
            if item.secondary_code.is_resolved() {
                resolved_count += 1;
            }
            total_quantity = total_quantity.checked_add(item.quantity).unwrap_or_else(|| {
                warn!("Total quantity overflowed at {}, saturating", item.source_document);
                if item.quantity.is_sign_negative() {
                    Decimal::MIN
                } else {
                    Decimal::MAX
                }
            });
        }

        BatchStats {
            documents_total: self.documents.len(),
            documents_succeeded,
            documents_failed: self.documents.len() - documents_succeeded,
            item_count,
            resolved_count,
            total_quantity,
        }
    }

    /// Classify the batch.
    pub fn status(&self) -> BatchStatus {
        let succeeded = self.documents.iter().filter(|d| d.is_success()).count();
        if succeeded == 0 {
            BatchStatus::NoSuccess
        } else if succeeded == self.documents.len() {
            BatchStatus::Complete
        } else {
            BatchStatus::Partial
        }
    }
}
