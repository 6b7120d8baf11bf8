//! Batch processing command for multiple invoices.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use vatstrip_core::{CorrectionEngine, CorrectionReport, CorrectionWarning, LayoutDocument};

use super::process::{OutputFormat, StyleArg, apply_overrides, format_report, write_corrected_pdf};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching layout files (JSON)
    #[arg(required = true)]
    input: String,

    /// Output directory for reports and corrected PDFs
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each report
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Highlight style
    #[arg(long, value_enum)]
    style: Option<StyleArg>,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    report: Option<CorrectionReport>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = super::load_config(config_path)?;
    apply_overrides(&mut config, args.style, None);
    let engine = Arc::new(CorrectionEngine::new(config)?);

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("json")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    // Documents are independent; each worker owns its own document.
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let permit = semaphore.clone().acquire_owned().await?;
        let engine = Arc::clone(&engine);
        let output_dir = args.output_dir.clone();
        let pb = overall_pb.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            let file_start = Instant::now();
            let result = process_single_file(&path, &engine, output_dir.as_deref());
            let processing_time_ms = file_start.elapsed().as_millis() as u64;
            pb.inc(1);
            drop(permit);

            match result {
                Ok(report) => ProcessResult {
                    path,
                    report: Some(report),
                    error: None,
                    processing_time_ms,
                },
                Err(e) => ProcessResult {
                    path,
                    report: None,
                    error: Some(e.to_string()),
                    processing_time_ms,
                },
            }
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await?);
    }

    overall_pb.finish_with_message("Complete");

    if !args.continue_on_error {
        if let Some(failed) = results.iter().find(|r| r.error.is_some()) {
            let error_msg = failed.error.as_deref().unwrap_or("unknown error");
            error!("Failed to process {}: {}", failed.path.display(), error_msg);
            anyhow::bail!("Processing failed: {}", error_msg);
        }
    }

    let successful: Vec<_> = results.iter().filter(|r| r.report.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    for result in &successful {
        if let (Some(report), Some(output_dir)) = (&result.report, &args.output_dir) {
            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("invoice");
            let output_path = output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            fs::write(&output_path, format_report(report, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Process one layout; a PDF with the same stem next to it is corrected too
/// when an output directory is given.
fn process_single_file(
    path: &Path,
    engine: &CorrectionEngine,
    output_dir: Option<&Path>,
) -> anyhow::Result<CorrectionReport> {
    let document = LayoutDocument::from_file(path)?;
    let report = engine.process(&document)?;

    if report.has_warning(&CorrectionWarning::NoPricesFound) {
        warn!("{}: tax rate detected but no prices found", path.display());
    }

    let pdf = path.with_extension("pdf");
    if let Some(output_dir) = output_dir {
        if pdf.exists() {
            let stem = pdf.file_stem().and_then(|s| s.to_str()).unwrap_or("invoice");
            let output = output_dir.join(format!("{}_corrected.pdf", stem));
            write_corrected_pdf(engine, &report, &document, &pdf, &output)?;
            debug!("Wrote corrected PDF to {}", output.display());
        }
    }

    Ok(report)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "detected_rate_percent",
        "country_code",
        "price_count",
        "prior_total",
        "corrected_total",
        "tax_amount",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result.path.file_name().and_then(|s| s.to_str()).unwrap_or("");

        if let Some(report) = &result.report {
            let summary = &report.summary;
            let status = if report.has_warning(&CorrectionWarning::NoPricesFound) {
                "no_prices"
            } else {
                "success"
            };
            wtr.write_record([
                filename,
                status,
                &summary.detected_rate_percent.to_string(),
                summary.country_code.as_deref().unwrap_or(""),
                &summary.price_count.to_string(),
                &summary.prior_total.to_string(),
                &summary.corrected_total.to_string(),
                &summary.tax_amount.map(|t| t.to_string()).unwrap_or_default(),
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
