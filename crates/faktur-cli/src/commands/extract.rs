//! Extract command - run a batch of PDF invoices and export the line items.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use clap::{Args, ValueEnum};
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, warn};

use faktur_core::mapping::MappingFields;
use faktur_core::models::{BatchStats, DocumentFailure};
use faktur_core::{
    default_file_name, write_workbook, BatchProcessor, BatchResult, BatchStatus, Document,
    GeminiClient, HttpMappingSource, MappingCache, PdfTextExtractor,
};

use super::load_config;

/// Output format for the extracted line items.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Two-sheet spreadsheet
    Xlsx,
    /// Full batch result as JSON
    Json,
    /// Line items as CSV
    Csv,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF files or glob patterns
    #[arg(required = true)]
    input: Vec<String>,

    /// Output file (defaults to a timestamped name in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "xlsx")]
    format: OutputFormat,

    /// Number of documents processed in parallel
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Per-document model call timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Override the mapping source URL
    #[arg(long)]
    mapping_url: Option<String>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    status: BatchStatus,
    stats: BatchStats,
    #[serde(flatten)]
    result: &'a BatchResult,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if let Some(jobs) = args.jobs {
        config.batch.concurrency = jobs;
    }
    if let Some(timeout) = args.timeout {
        config.batch.document_timeout_secs = timeout;
        config.model.request_timeout_secs = timeout;
    }
    if let Some(url) = args.mapping_url.clone() {
        config.mapping.url = url;
    }

    let files = collect_files(&args.input)?;
    if files.is_empty() {
        anyhow::bail!("No matching PDF files found for: {}", args.input.join(", "));
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let documents = files
        .iter()
        .map(|path| read_document(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let client = GeminiClient::from_config(&config.model)?;

    let source = HttpMappingSource::from_config(&config.mapping)?;
    let cache = MappingCache::new(source)
        .with_fields(MappingFields::from(&config.mapping))
        .with_ttl(config.mapping.ttl());
    let mapping = cache.load().await;
    match &mapping.warning {
        Some(warning) => println!(
            "{} Mapping unavailable ({}); secondary codes will be reported as not found",
            style("⚠").yellow(),
            warning
        ),
        None => println!(
            "{} Loaded mapping with {} item codes",
            style("ℹ").blue(),
            mapping.table.len()
        ),
    }

    let cancel = Arc::new(AtomicBool::new(false));
    spawn_cancel_handler(Arc::clone(&cancel));

    let processor = BatchProcessor::from_config(PdfTextExtractor::new(), client, &config.batch)
        .with_cancel_flag(cancel);

    let progress = ProgressBar::new(documents.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let result = processor
        .process(Arc::clone(&mapping.table), documents, |update| {
            progress.set_message(update.document.to_string());
            if let Some(failure) = update.result.failure() {
                progress.println(format!("{} {}", style("✗").red(), failure));
            }
            progress.inc(1);
        })
        .await?;

    progress.finish_with_message("Complete");

    let stats = result.stats();
    print_summary(&stats, start);

    let failures: Vec<&DocumentFailure> = result.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for failure in &failures {
            println!("  - {}", failure);
        }
    }

    if result.status() == BatchStatus::NoSuccess {
        anyhow::bail!("No line items were extracted");
    }

    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(default_file_name(
            &config.export.file_prefix,
            Local::now().naive_local(),
        ))
        .with_extension(args.format.extension())
    });

    match args.format {
        OutputFormat::Xlsx => write_workbook(&result, &config.export, &output)?,
        OutputFormat::Json => {
            let report = JsonReport {
                status: result.status(),
                stats,
                result: &result,
            };
            fs::write(&output, serde_json::to_string_pretty(&report)?)?;
        }
        OutputFormat::Csv => write_items_csv(&output, &result)?,
    }

    println!(
        "{} Results written to {}",
        style("✓").green(),
        output.display()
    );

    Ok(())
}

/// Expand paths and glob patterns into PDF files, keeping argument order.
fn collect_files(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        for entry in glob(input)? {
            match entry {
                Ok(path) if is_pdf(&path) => files.push(path),
                Ok(path) => debug!("Skipping non-PDF {}", path.display()),
                Err(e) => warn!("Cannot read {}: {}", e.path().display(), e),
            }
        }
    }
    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn read_document(path: &Path) -> anyhow::Result<Document> {
    let bytes = fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());
    Ok(Document::pdf(name, bytes))
}

fn spawn_cancel_handler(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{} Cancelling, waiting for documents in flight...",
                style("⚠").yellow()
            );
            cancel.store(true, Ordering::SeqCst);
        }
    });
}

fn print_summary(stats: &BatchStats, start: Instant) {
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        stats.documents_total,
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(stats.documents_succeeded).green(),
        style(stats.documents_failed).red()
    );
    println!(
        "   {} line items, total quantity {}",
        stats.item_count, stats.total_quantity
    );
    println!(
        "   secondary code found for {} of {} items",
        stats.resolved_count, stats.item_count
    );
}

fn write_items_csv(path: &Path, result: &BatchResult) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    write_items(&mut wtr, result)?;
    wtr.flush()?;
    Ok(())
}

fn write_items<W: std::io::Write>(wtr: &mut csv::Writer<W>, result: &BatchResult) -> anyhow::Result<()> {
    wtr.write_record(faktur_core::export::ITEM_HEADERS)?;
    for item in result.line_items() {
        let quantity = item.quantity.to_string();
        wtr.write_record([
            item.item_code.as_str(),
            item.secondary_code.as_str(),
            quantity.as_str(),
            item.source_document.as_str(),
        ])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use faktur_core::models::{DocumentOutcome, DocumentResult, ExtractedTextPreview, InputMode, TextLayer};
    use faktur_core::{LineItem, SecondaryCode};

    fn sample() -> BatchResult {
        let item = |code: &str, secondary: SecondaryCode| LineItem {
            item_code: code.to_string(),
            quantity: 12.into(),
            secondary_code: secondary,
            source_document: "a.pdf".to_string(),
        };
        BatchResult {
            documents: vec![DocumentResult {
                index: 0,
                name: "a.pdf".to_string(),
                input_mode: InputMode::Text,
                text_layer: TextLayer::Present,
                preview: ExtractedTextPreview::new("a.pdf", "text", 1000),
                outcome: DocumentOutcome::Extracted {
                    items: vec![
                        item("0012", SecondaryCode::Resolved("S1".to_string())),
                        item("B,2", SecondaryCode::NotFound),
                    ],
                },
            }],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_collect_files_filters_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let pattern = dir.path().join("*").display().to_string();

        let files = collect_files(&[pattern]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_read_document_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faktur-01.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();

        let document = read_document(&path).unwrap();
        assert_eq!(document.name, "faktur-01.pdf");
        assert_eq!(&*document.bytes, b"%PDF-1.4");
    }

    #[test]
    fn test_items_csv() {
        let mut wtr = csv::Writer::from_writer(vec![]);
        write_items(&mut wtr, &sample()).unwrap();
        let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(
            data,
            "item_code,secondary_code,quantity,source_document\n\
             0012,S1,12,a.pdf\n\
             \"B,2\",Tidak Ditemukan,12,a.pdf\n"
        );
    }

    #[test]
    fn test_json_report_flattens_result() {
        let result = sample();
        let report = JsonReport {
            status: result.status(),
            stats: result.stats(),
            result: &result,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["stats"]["resolved_count"], 1);
        assert_eq!(json["documents"][0]["outcome"]["status"], "extracted");
        assert_eq!(json["documents"][0]["outcome"]["items"][1]["secondary_code"], "Tidak Ditemukan");
    }
}
