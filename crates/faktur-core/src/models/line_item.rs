//! Line item models.

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// Text written in place of a secondary code that the mapping does not know.
pub const SECONDARY_CODE_NOT_FOUND: &str = "Tidak Ditemukan";

/// Item as returned by the model, before normalization and enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    /// Item code exactly as the model wrote it.
    pub item_code: String,
    /// Quantity (kuantum).
    pub quantity: Decimal,
}

/// Secondary code looked up from the mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecondaryCode {
    /// The mapping has an entry for the item code.
    Resolved(String),
    /// No entry for the item code.
    NotFound,
}

impl SecondaryCode {
    /// Whether a mapping entry was found.
    pub fn is_resolved(&self) -> bool {
        matches!(self, SecondaryCode::Resolved(_))
    }

    /// Display text, with the sentinel for missing codes.
    pub fn as_str(&self) -> &str {
        match self {
            SecondaryCode::Resolved(code) => code,
            SecondaryCode::NotFound => SECONDARY_CODE_NOT_FOUND,
        }
    }
}

impl std::fmt::Display for SecondaryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SecondaryCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A normalized, enriched line item from one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    /// Item code (kode barang), normalized.
    pub item_code: String,

    /// Quantity (kuantum).
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,

    /// Secondary (Scylla) code.
    pub secondary_code: SecondaryCode,

    /// Display name of the document the item came from.
    pub source_document: String,
}
