//! Data models for documents, line items, batch results, and configuration.

pub mod batch;
pub mod config;
pub mod line_item;

pub use batch::{
    BatchResult, BatchStats, BatchStatus, Document, DocumentFailure, DocumentOutcome,
    DocumentResult, ExtractedTextPreview, InputMode, TextLayer,
};
pub use config::FakturConfig;
pub use line_item::{LineItem, RawItem, SecondaryCode, SECONDARY_CODE_NOT_FOUND};
