//! PDF text layer extraction.

mod extractor;

pub use extractor::PdfTextExtractor;

use crate::error::TextExtractionError;

/// Result type for text extraction.
pub type Result<T> = std::result::Result<T, TextExtractionError>;

/// Trait for document text extraction implementations.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of every page, joined with newlines.
    ///
    /// Returns [`TextExtractionError::NoTextLayer`] when the document parses
    /// but contains only whitespace.
    fn extract_text(&self, data: &[u8]) -> Result<String>;
}
