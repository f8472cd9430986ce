//! Core library for invoice line-item extraction.
//!
//! This crate provides:
//! - PDF text layer extraction with a raw-bytes fallback
//! - Line item extraction through a generative model (Gemini)
//! - Response parsing and item code normalization
//! - Item code to secondary code mapping with a cached snapshot
//! - Concurrent batch processing with per-document failures
//! - Two-sheet spreadsheet export

pub mod batch;
pub mod error;
pub mod export;
pub mod extraction;
pub mod mapping;
pub mod models;
pub mod pdf;

#[cfg(test)]
mod test_support;

pub use batch::{BatchProcessor, BatchProgress};
pub use error::{FakturError, Result};
pub use export::{build_workbook, default_file_name, write_workbook};
pub use extraction::{normalize_code, parse_response, ExtractionClient, ExtractionInput, GeminiClient};
pub use mapping::{HttpMappingSource, MappingCache, MappingLoad, MappingSource, MappingTable};
pub use models::{
    BatchResult, BatchStats, BatchStatus, Document, DocumentResult, FakturConfig, LineItem,
    SecondaryCode,
};
pub use pdf::{PdfTextExtractor, TextExtractor};
