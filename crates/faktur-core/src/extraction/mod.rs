//! Line item extraction with a generative model.

mod gemini;
pub mod normalize;
pub mod parser;

pub use gemini::GeminiClient;
pub use normalize::normalize_code;
pub use parser::parse_response;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ModelCallError;

/// Fixed instruction sent with every document.
///
/// Asks for a JSON array of `{"kode_barang": string, "kuantum": number}`
/// objects and for item codes without a leading apostrophe.
pub const INSTRUCTION: &str = r#"
Analisis dokumen PDF faktur ini dan ekstrak semua kode barang (SKU) dan kuantum (jumlah karton/CTN).
Format output harus JSON yang valid:
[{"kode_barang": "kode1", "kuantum": angka}, {"kode_barang": "kode2", "kuantum": angka}, ...]

Pastikan untuk:
1. Hanya mengekstrak data yang relevan
2. Mengembalikan format JSON yang valid
3. Mengonversi kuantum ke angka (bukan string)
4. Format kode_barang TANPA diawali dengan tanda kutip tunggal (')
"#;

/// Separator between the instruction and extracted document text.
pub const TEXT_PREAMBLE: &str = "\n\nIni adalah teks dari PDF:\n";

/// Document content sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionInput {
    /// Text extracted from the document.
    Text(String),
    /// Raw document bytes with their format identifier.
    Binary { bytes: Arc<[u8]>, mime_type: String },
}

impl ExtractionInput {
    /// Short label for logging.
    pub fn mode(&self) -> &'static str {
        match self {
            ExtractionInput::Text(_) => "text",
            ExtractionInput::Binary { .. } => "binary",
        }
    }
}

/// Build the text prompt for text mode.
pub fn text_prompt(instruction: &str, text: &str) -> String {
    format!("{}{}{}", instruction, TEXT_PREAMBLE, text)
}

/// Client for an external generative model.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Send the instruction plus document content and return the raw
    /// free-form response text.
    async fn extract_items(
        &self,
        instruction: &str,
        input: &ExtractionInput,
    ) -> Result<String, ModelCallError>;
}

#[async_trait]
impl<T: ExtractionClient + ?Sized> ExtractionClient for Arc<T> {
    async fn extract_items(
        &self,
        instruction: &str,
        input: &ExtractionInput,
    ) -> Result<String, ModelCallError> {
        (**self).extract_items(instruction, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_names_both_fields() {
        assert!(INSTRUCTION.contains("\"kode_barang\""));
        assert!(INSTRUCTION.contains("\"kuantum\""));
        assert!(INSTRUCTION.contains("tanda kutip tunggal (')"));
    }

    #[test]
    fn test_text_prompt_appends_document_text() {
        let prompt = text_prompt("INSTR", "page one\npage two");
        assert_eq!(prompt, "INSTR\n\nIni adalah teks dari PDF:\npage one\npage two");
    }
}
