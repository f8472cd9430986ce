//! PDF text extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::{debug, trace, warn};

use super::{Result, TextExtractor};
use crate::error::TextExtractionError;

/// Page-by-page PDF text extractor.
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor {
    max_pages: Option<usize>,
}

impl PdfTextExtractor {
    /// Create a new PDF text extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only read the first `max_pages` pages.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    fn load(&self, data: &[u8]) -> Result<(Document, Vec<u8>)> {
        let mut doc = Document::load_mem(data).map_err(|e| TextExtractionError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(TextExtractionError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted)
                .map_err(|e| TextExtractionError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        Ok((doc, raw_data))
    }

    fn page_texts(&self, doc: &Document, pages: &[u32]) -> std::result::Result<Vec<String>, lopdf::Error> {
        pages
            .iter()
            .map(|&page| {
                let text = doc.extract_text(&[page])?;
                trace!("Page {}: {} chars", page, text.len());
                Ok(text)
            })
            .collect()
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, data: &[u8]) -> Result<String> {
        let (mut doc, raw_data) = self.load(data)?;
        doc.decompress();

        let mut pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        if pages.is_empty() {
            return Err(TextExtractionError::NoPages);
        }
        pages.sort_unstable();
        if let Some(max) = self.max_pages {
            pages.truncate(max);
        }

        let text = match self.page_texts(&doc, &pages) {
            Ok(texts) => texts.join("\n"),
            Err(e) => {
                warn!("Page text extraction failed ({}), retrying with pdf-extract", e);
                pdf_extract::extract_text_from_mem(&raw_data)
                    .map_err(|e| TextExtractionError::Text(e.to_string()))?
            }
        };

        if text.trim().is_empty() {
            debug!("PDF with {} pages has no text layer", pages.len());
            return Err(TextExtractionError::NoTextLayer);
        }

        debug!("Extracted {} chars from {} pages", text.len(), pages.len());
        Ok(text)
    }
}
