//! Detect command - report the tax rate of a document.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use vatstrip_core::{
    DocumentSource, FieldExtractor, LayoutDocument, PdfTextReader, RateCandidate, RateDetector,
};

/// Arguments for the detect command.
#[derive(Args)]
pub struct DetectArgs {
    /// Input file (PDF, layout JSON or plain text)
    #[arg(required = true)]
    input: PathBuf,

    /// List every plausible candidate instead of the chosen rate
    #[arg(long)]
    all: bool,

    /// Print JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: DetectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let text = match extension.as_str() {
        "pdf" => PdfTextReader::from_file(&args.input)?.text()?,
        "json" => LayoutDocument::from_file(&args.input)?.full_text()?,
        _ => fs::read_to_string(&args.input)?,
    };
    info!("Read {} characters from {}", text.len(), args.input.display());

    let detector = RateDetector::from_config(&config.detection)?;

    let candidates: Vec<RateCandidate> = if args.all {
        detector.extract_all(&text)
    } else {
        detector.extract(&text).into_iter().collect()
    };

    if candidates.is_empty() {
        anyhow::bail!("No plausible tax rate found in {}", args.input.display());
    }

    if args.json {
        if args.all {
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&candidates[0])?);
        }
        return Ok(());
    }

    for candidate in &candidates {
        let country = config
            .detection
            .country_for(candidate.value)
            .map(|k| format!(", {}", k.country_name))
            .unwrap_or_default();
        let marker = if candidate.canonical {
            style("canonical").green().to_string()
        } else {
            style(format!("rank {}", candidate.source_pattern_rank)).dim().to_string()
        };
        println!(
            "{} % ({}{}) [{}] {}",
            candidate.value, candidate.jurisdiction, country, marker, candidate.context_snippet
        );
    }

    Ok(())
}
