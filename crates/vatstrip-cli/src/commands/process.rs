//! Process command - correct the prices of a single invoice.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use vatstrip_core::models::plan::HighlightStyle;
use vatstrip_core::{
    CorrectionEngine, CorrectionReport, CorrectionWarning, DocumentSource, LayoutDocument,
    PdfCanvas, VatstripConfig,
};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Page layout of the invoice (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// PDF to draw the corrections into
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Corrected PDF (default: <pdf>_corrected.pdf)
    #[arg(short, long, requires = "pdf")]
    output: Option<PathBuf>,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Highlight style
    #[arg(long, value_enum)]
    style: Option<StyleArg>,

    /// Currency symbol appended to corrected amounts
    #[arg(long)]
    currency: Option<String>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StyleArg {
    /// Light yellow highlights, old figures stay visible
    Review,
    /// White highlights that hide the old figures
    Download,
}

impl From<StyleArg> for HighlightStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Review => HighlightStyle::Review,
            StyleArg::Download => HighlightStyle::Download,
        }
    }
}

/// Apply command-line overrides to the loaded configuration.
pub fn apply_overrides(config: &mut VatstripConfig, style: Option<StyleArg>, currency: Option<String>) {
    if let Some(style) = style {
        config.overlay.style = style.into();
    }
    if let Some(currency) = currency {
        config.overlay.currency_symbol = Some(currency);
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = super::load_config(config_path)?;
    apply_overrides(&mut config, args.style, args.currency.clone());

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    if let Some(pdf) = &args.pdf {
        if !pdf.exists() {
            anyhow::bail!("PDF file not found: {}", pdf.display());
        }
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message("Detecting tax rate...");

    let engine = CorrectionEngine::new(config)?;
    let document = LayoutDocument::from_file(&args.input)?;
    let report = engine.process(&document)?;

    if let Some(pdf) = &args.pdf {
        pb.set_message("Drawing corrections...");
        let output = args.output.clone().unwrap_or_else(|| corrected_pdf_path(pdf));
        write_corrected_pdf(&engine, &report, &document, pdf, &output)?;
        pb.finish_and_clear();
        eprintln!(
            "{} Corrected PDF written to {}",
            style("✓").green(),
            output.display()
        );
    } else {
        pb.finish_and_clear();
    }

    if report.has_warning(&CorrectionWarning::NoPricesFound) {
        eprintln!(
            "{} Tax rate detected but no prices found",
            style("⚠").yellow()
        );
    }

    let output = format_report(&report, args.format)?;
    if let Some(report_path) = &args.report {
        fs::write(report_path, &output)?;
        eprintln!(
            "{} Report written to {}",
            style("✓").green(),
            report_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// `invoice.pdf` -> `invoice_corrected.pdf` in the same directory.
pub fn corrected_pdf_path(pdf: &Path) -> PathBuf {
    let stem = pdf.file_stem().and_then(|s| s.to_str()).unwrap_or("invoice");
    pdf.with_file_name(format!("{}_corrected.pdf", stem))
}

/// Draw the plan into a copy of `pdf` and save it to `output`.
pub fn write_corrected_pdf(
    engine: &CorrectionEngine,
    report: &CorrectionReport,
    document: &LayoutDocument,
    pdf: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    let mut canvas = PdfCanvas::open(pdf)?;
    if canvas.page_count() != document.page_count() {
        warn!(
            "Layout has {} pages but PDF has {}",
            document.page_count(),
            canvas.page_count()
        );
    }

    let applied = engine.apply(&report.plan, &mut canvas)?;
    for failure in &applied.failures {
        eprintln!(
            "{} Could not draw {:?} on page {}: {}",
            style("✗").red(),
            failure.text,
            failure.page + 1,
            failure.reason
        );
    }
    if applied.substituted > 0 {
        info!("{} overlays drawn with currency codes", applied.substituted);
    }

    canvas.save(output)?;
    Ok(())
}

pub fn format_report(report: &CorrectionReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => format_report_csv(report),
        OutputFormat::Text => Ok(format_report_text(report)),
    }
}

fn format_report_csv(report: &CorrectionReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let summary = &report.summary;

    wtr.write_record([
        "detected_rate_percent",
        "country_code",
        "price_count",
        "prior_total",
        "corrected_total",
        "tax_amount",
    ])?;

    wtr.write_record([
        &summary.detected_rate_percent.to_string(),
        summary.country_code.as_deref().unwrap_or(""),
        &summary.price_count.to_string(),
        &summary.prior_total.to_string(),
        &summary.corrected_total.to_string(),
        &summary.tax_amount.map(|t| t.to_string()).unwrap_or_default(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_report_text(report: &CorrectionReport) -> String {
    let summary = &report.summary;
    let mut output = String::new();

    output.push_str(&format!("Tax rate: {} %", summary.detected_rate_percent));
    if let (Some(code), Some(name)) = (&summary.country_code, &summary.country_name) {
        output.push_str(&format!(" ({}, {})", name, code));
    }
    output.push('\n');
    output.push_str(&format!("Matched: {}\n", report.rate.context_snippet));
    if let Some(tax) = summary.tax_amount {
        output.push_str(&format!("Tax amount: {}\n", tax));
    }
    output.push('\n');

    output.push_str("Prices:\n");
    for classified in &report.tokens {
        let token = &classified.token;
        let marker = if classified.is_tax_amount_line { "  (tax line)" } else { "" };
        output.push_str(&format!(
            "  p{} {:>14}{}\n",
            token.page + 1,
            token.raw_text,
            marker
        ));
    }
    output.push('\n');

    output.push_str(&format!("Price count:     {}\n", summary.price_count));
    output.push_str(&format!("Total incl. tax: {}\n", summary.prior_total));
    output.push_str(&format!("Total excl. tax: {}\n", summary.corrected_total));
    output.push_str(&format!(
        "Edits:           {} highlights, {} overlays\n",
        report.plan.highlights.len(),
        report.plan.overlays.len()
    ));

    output
}
