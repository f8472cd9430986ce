//! Item code to secondary code mapping.
//!
//! The table is fetched from an external JSON list, cached with a staleness
//! window by [`MappingCache`], and shared as an immutable `Arc` snapshot.

mod cache;
mod source;

pub use cache::{MappingCache, MappingLoad};
pub use source::{HttpMappingSource, MappingSource};

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, trace};

use crate::models::line_item::SecondaryCode;
use crate::models::config::MappingConfig;

/// Names of the record fields read from the mapping source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingFields {
    /// Field holding the item code.
    pub code: String,
    /// Field holding the secondary code.
    pub secondary: String,
}

impl Default for MappingFields {
    fn default() -> Self {
        Self {
            code: "KodeBarang".to_string(),
            secondary: "Scylla".to_string(),
        }
    }
}

impl From<&MappingConfig> for MappingFields {
    fn from(config: &MappingConfig) -> Self {
        Self {
            code: config.code_field.clone(),
            secondary: config.secondary_field.clone(),
        }
    }
}

/// Immutable item code to secondary code table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: HashMap<String, String>,
}

impl MappingTable {
    /// An empty table; every lookup resolves to [`SecondaryCode::NotFound`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from source records. Later records win over earlier ones with
    /// the same item code; records missing either field are skipped.
    pub fn from_records(records: &[Value], fields: &MappingFields) -> Self {
        let mut entries = HashMap::with_capacity(records.len());
        let mut skipped = 0usize;

        for record in records {
            let code = record.get(&fields.code).and_then(field_text);
            let secondary = record.get(&fields.secondary).and_then(field_text);
            match (code, secondary) {
                (Some(code), Some(secondary)) => {
                    if let Some(previous) = entries.insert(code, secondary) {
                        trace!("Duplicate item code overrides {}", previous);
                    }
                }
                _ => skipped += 1,
            }
        }

        debug!(
            "Built mapping with {} codes from {} records ({} skipped)",
            entries.len(),
            records.len(),
            skipped
        );
        Self { entries }
    }

    /// Look up the secondary code for an item code.
    pub fn resolve(&self, code: &str) -> SecondaryCode {
        match self.entries.get(code) {
            Some(secondary) => SecondaryCode::Resolved(secondary.clone()),
            None => SecondaryCode::NotFound,
        }
    }

    /// Number of item codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by item code.
    pub fn sorted_entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(code, secondary)| (code.as_str(), secondary.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }
}

impl FromIterator<(String, String)> for MappingTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Non-empty string, or a number rendered as JSON text.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_record_wins() {
        let records = vec![
            json!({"KodeBarang": "A1", "Scylla": "first"}),
            json!({"KodeBarang": "B2", "Scylla": "other"}),
            json!({"KodeBarang": "A1", "Scylla": "second"}),
        ];
        let table = MappingTable::from_records(&records, &MappingFields::default());
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("A1"), SecondaryCode::Resolved("second".to_string()));
    }

    #[test]
    fn test_incomplete_records_are_skipped() {
        let records = vec![
            json!({"KodeBarang": "A1"}),
            json!({"Scylla": "orphan"}),
            json!({"KodeBarang": "B2", "Scylla": ""}),
            json!({"KodeBarang": "C3", "Scylla": null}),
            json!("not an object"),
        ];
        let table = MappingTable::from_records(&records, &MappingFields::default());
        assert!(table.is_empty());
        assert_eq!(table.resolve("A1"), SecondaryCode::NotFound);
        assert_eq!(table.resolve("B2"), SecondaryCode::NotFound);
    }

    #[test]
    fn test_incomplete_duplicate_does_not_override() {
        let records = vec![
            json!({"KodeBarang": "A1", "Scylla": "kept"}),
            json!({"KodeBarang": "A1"}),
        ];
        let table = MappingTable::from_records(&records, &MappingFields::default());
        assert_eq!(table.resolve("A1"), SecondaryCode::Resolved("kept".to_string()));
    }

    #[test]
    fn test_numeric_fields_and_custom_names() {
        let fields = MappingFields {
            code: "sku".to_string(),
            secondary: "ref".to_string(),
        };
        let records = vec![json!({"sku": 12345, "ref": "R-9"})];
        let table = MappingTable::from_records(&records, &fields);
        assert_eq!(table.resolve("12345"), SecondaryCode::Resolved("R-9".to_string()));
    }

    #[test]
    fn test_resolve_is_exact() {
        let table: MappingTable = [("ABC123".to_string(), "X".to_string())].into_iter().collect();
        assert!(table.resolve("ABC123").is_resolved());
        assert!(!table.resolve("abc123").is_resolved());
        assert!(!table.resolve("'ABC123").is_resolved());
    }

    #[test]
    fn test_sorted_entries() {
        let table: MappingTable = [
            ("B".to_string(), "2".to_string()),
            ("A".to_string(), "1".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(table.sorted_entries(), vec![("A", "1"), ("B", "2")]);
    }
}
