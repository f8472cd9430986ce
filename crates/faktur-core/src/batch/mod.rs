//! Batch orchestration over uploaded documents.
//!
//! Each document runs text extraction, the model call, parsing,
//! normalization, and mapping lookup independently. Failures are captured
//! per document; the batch always yields one result per input, in upload
//! order, even when documents run concurrently.

use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::error::{BatchError, DocumentError, ModelCallError, TextExtractionError};
use crate::extraction::{normalize_code, parse_response, ExtractionClient, ExtractionInput, INSTRUCTION};
use crate::mapping::MappingTable;
use crate::models::batch::{
    truncate_preview, BatchResult, Document, DocumentFailure, DocumentOutcome, DocumentResult,
    ExtractedTextPreview, InputMode, TextLayer,
};
use crate::models::config::BatchConfig;
use crate::models::line_item::LineItem;
use crate::pdf::TextExtractor;

/// Progress notification sent after each document completes.
#[derive(Debug)]
pub struct BatchProgress<'a> {
    /// Zero-based position in upload order.
    pub index: usize,
    /// Number of documents in the batch.
    pub total: usize,
    /// Document name.
    pub document: &'a str,
    /// The finished document.
    pub result: &'a DocumentResult,
}

/// Drives documents through the extraction pipeline.
pub struct BatchProcessor<E, C> {
    extractor: Arc<E>,
    client: C,
    instruction: String,
    concurrency: usize,
    call_timeout: Duration,
    preview_chars: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl<E, C> BatchProcessor<E, C>
where
    E: TextExtractor + 'static,
    C: ExtractionClient,
{
    /// Create a sequential processor with default settings.
    pub fn new(extractor: E, client: C) -> Self {
        let defaults = BatchConfig::default();
        Self {
            extractor: Arc::new(extractor),
            client,
            instruction: INSTRUCTION.to_string(),
            concurrency: 1,
            call_timeout: defaults.document_timeout(),
            preview_chars: defaults.preview_chars,
            cancel: None,
        }
    }

    /// Create a processor from configuration.
    pub fn from_config(extractor: E, client: C, config: &BatchConfig) -> Self {
        Self::new(extractor, client)
            .with_concurrency(config.concurrency)
            .with_call_timeout(config.document_timeout())
            .with_preview_chars(config.preview_chars)
    }

    /// Number of documents processed at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Timeout applied to each model call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Maximum characters kept in each preview.
    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    /// Replace the instruction sent to the model.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Stop starting new documents once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Process a batch against one mapping snapshot.
    ///
    /// `on_progress` is called once per document, in upload order. Fails
    /// only when `documents` is empty.
    pub async fn process<F>(
        &self,
        mapping: Arc<MappingTable>,
        documents: Vec<Document>,
        mut on_progress: F,
    ) -> Result<BatchResult, BatchError>
    where
        F: FnMut(&BatchProgress<'_>),
    {
        if documents.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let total = documents.len();
        let started_at = Utc::now();
        let start = Instant::now();
        info!(
            "Processing {} documents ({} at a time, {} mapped codes)",
            total,
            self.concurrency,
            mapping.len()
        );

        let mapping = mapping.as_ref();
        let mut pending = pin!(stream::iter(documents.into_iter().enumerate())
            .map(|(index, document)| self.process_document(index, document, mapping))
            .buffered(self.concurrency));

        let mut results = Vec::with_capacity(total);
        while let Some(result) = pending.next().await {
            on_progress(&BatchProgress {
                index: result.index,
                total,
                document: &result.name,
                result: &result,
            });
            results.push(result);
        }

        let batch = BatchResult {
            documents: results,
            started_at,
            finished_at: Utc::now(),
        };
        let stats = batch.stats();
        info!(
            "Batch finished in {:?}: {} succeeded, {} failed, {} items",
            start.elapsed(),
            stats.documents_succeeded,
            stats.documents_failed,
            stats.item_count
        );
        Ok(batch)
    }

    async fn process_document(
        &self,
        index: usize,
        document: Document,
        mapping: &MappingTable,
    ) -> DocumentResult {
        if self.is_cancelled() {
            debug!("Skipping {} after cancellation", document.name);
            return self.failed(
                index,
                document.name,
                InputMode::Skipped,
                TextLayer::NotRead,
                DocumentError::Cancelled,
            );
        }

        let start = Instant::now();
        let (text_layer, text) = self.read_text(&document).await;

        let (input_mode, input) = match text {
            Some(text) => (InputMode::Text, ExtractionInput::Text(text)),
            None => (
                InputMode::Binary,
                ExtractionInput::Binary {
                    bytes: Arc::clone(&document.bytes),
                    mime_type: document.mime_type.clone(),
                },
            ),
        };

        match self.extract(&document.name, &input, mapping).await {
            Ok(items) => {
                info!(
                    "{}: {} items via {} mode in {:?}",
                    document.name,
                    items.len(),
                    input.mode(),
                    start.elapsed()
                );
                let preview_text = match &input {
                    ExtractionInput::Text(text) => truncate_preview(text, self.preview_chars),
                    ExtractionInput::Binary { .. } => String::new(),
                };
                DocumentResult {
                    index,
                    preview: ExtractedTextPreview {
                        source_document: document.name.clone(),
                        text: preview_text,
                    },
                    name: document.name,
                    input_mode,
                    text_layer,
                    outcome: DocumentOutcome::Extracted { items },
                }
            }
            Err(e) => {
                warn!("{}: {}", document.name, e);
                self.failed(index, document.name, input_mode, text_layer, e)
            }
        }
    }

    /// Extract the text layer; `None` means fall back to binary mode.
    async fn read_text(&self, document: &Document) -> (TextLayer, Option<String>) {
        let extractor = Arc::clone(&self.extractor);
        let bytes = Arc::clone(&document.bytes);
        let extracted = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .unwrap_or_else(|e| Err(TextExtractionError::Task(e.to_string())));

        match extracted {
            Ok(text) => (TextLayer::Present, Some(text)),
            Err(TextExtractionError::NoTextLayer) => {
                debug!("{}: no text layer, sending document bytes", document.name);
                (TextLayer::Absent, None)
            }
            Err(e) => {
                warn!("{}: {}, sending document bytes", document.name, e);
                (TextLayer::Unreadable(e.to_string()), None)
            }
        }
    }

    async fn extract(
        &self,
        name: &str,
        input: &ExtractionInput,
        mapping: &MappingTable,
    ) -> Result<Vec<LineItem>, DocumentError> {
        let raw = tokio::time::timeout(
            self.call_timeout,
            self.client.extract_items(&self.instruction, input),
        )
        .await
        .map_err(|_| ModelCallError::Timeout(self.call_timeout))??;

        let raw_items = parse_response(&raw)?;
        if raw_items.is_empty() {
            return Err(DocumentError::NoLineItems);
        }

        Ok(raw_items
            .into_iter()
            .map(|raw| {
                let item_code = normalize_code(&raw.item_code);
                LineItem {
                    secondary_code: mapping.resolve(&item_code),
                    item_code,
                    quantity: raw.quantity,
                    source_document: name.to_string(),
                }
            })
            .collect())
    }

    fn failed(
        &self,
        index: usize,
        name: String,
        input_mode: InputMode,
        text_layer: TextLayer,
        error: DocumentError,
    ) -> DocumentResult {
        let failure = DocumentFailure::new(name.clone(), &error);
        DocumentResult {
            index,
            preview: ExtractedTextPreview::new(name.clone(), &failure.message, self.preview_chars),
            name,
            input_mode,
            text_layer,
            outcome: DocumentOutcome::Failed { failure },
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}
