//! Config command - inspect, edit and validate the vatstrip configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use vatstrip_core::{RateDetector, VatstripConfig};

use super::default_config_path;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Write the default configuration to a file
    Init {
        /// Output path (default: the configuration file path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Print one value (e.g., "classification.tax_amount_ceiling" or "detection.patterns.0")
    Get {
        key: String,
    },

    /// Change one value; the result must still validate before it is saved
    Set {
        key: String,
        /// New value, as JSON or a bare string
        value: String,
    },

    /// Check thresholds and compile the rate patterns
    Check,

    /// Show configuration file path
    Path,
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    match args.command {
        ConfigCommand::Show => {
            let config = read_config(&path, true)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommand::Init { output, force } => init_config(&output.unwrap_or(path), force),
        ConfigCommand::Get { key } => {
            let json = serde_json::to_value(read_config(&path, false)?)?;
            let value = lookup(&json, &key)
                .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(())
        }
        ConfigCommand::Set { key, value } => set_config(&path, &key, &value),
        ConfigCommand::Check => check_config(&path),
        ConfigCommand::Path => show_path(&path),
    }
}

/// The file at `path`, or defaults when there is none.
fn read_config(path: &Path, announce_defaults: bool) -> anyhow::Result<VatstripConfig> {
    if path.exists() {
        return VatstripConfig::from_file(path)
            .with_context(|| format!("Cannot read configuration {}", path.display()));
    }
    if announce_defaults {
        eprintln!(
            "{} No config file at {}, using defaults.",
            style("ℹ").blue(),
            path.display()
        );
    }
    Ok(VatstripConfig::default())
}

/// Reject settings the engine would choke on or silently misuse.
///
/// Returns the number of rate patterns.
fn validate(config: &VatstripConfig) -> anyhow::Result<usize> {
    let detection = &config.detection;
    if detection.min_rate > detection.max_rate {
        anyhow::bail!(
            "detection.min_rate ({}) is above detection.max_rate ({})",
            detection.min_rate,
            detection.max_rate
        );
    }
    if detection.tax_keywords.iter().all(|k| k.trim().is_empty()) {
        anyhow::bail!("detection.tax_keywords has no usable keyword");
    }

    let extraction = &config.extraction;
    if extraction.min_price > extraction.max_price {
        anyhow::bail!(
            "extraction.min_price ({}) is above extraction.max_price ({})",
            extraction.min_price,
            extraction.max_price
        );
    }

    RateDetector::from_config(detection)?;
    Ok(detection.patterns.len())
}

/// Walk a dotted key; numeric parts index into arrays.
fn lookup<'a>(json: &'a Value, key: &str) -> Option<&'a Value> {
    let mut node = json;
    for part in key.split('.') {
        node = match node {
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            other => other.get(part)?,
        };
    }
    Some(node)
}

fn lookup_mut<'a>(json: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    let mut node = json;
    for part in key.split('.') {
        node = match node {
            Value::Array(items) => items.get_mut(part.parse::<usize>().ok()?)?,
            other => other.get_mut(part)?,
        };
    }
    Some(node)
}

fn init_config(output: &Path, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output.display()
        );
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    VatstripConfig::default().save(output)?;
    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output.display()
    );
    Ok(())
}

fn set_config(path: &Path, key: &str, raw: &str) -> anyhow::Result<()> {
    let mut json = serde_json::to_value(read_config(path, false)?)?;

    // Bare words are taken as strings.
    let value: Value =
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    let slot = lookup_mut(&mut json, key)
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
    *slot = value.clone();

    let updated: VatstripConfig = serde_json::from_value(json)
        .with_context(|| format!("Invalid value for {}: {}", key, raw))?;
    validate(&updated).with_context(|| format!("Rejected {} = {}", key, raw))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    updated.save(path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&value)?
    );
    Ok(())
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = read_config(path, true)?;
    let patterns = validate(&config)?;

    println!(
        "{} {} rate patterns compile, {} known rates, plausible rates {}..{} %",
        style("✓").green(),
        patterns,
        config.detection.known_rates.len(),
        config.detection.min_rate,
        config.detection.max_rate
    );
    Ok(())
}

fn show_path(path: &Path) -> anyhow::Result<()> {
    println!("Configuration file: {}", path.display());
    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'vatstrip config init' to create a configuration file.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_walks_objects_and_arrays() {
        let json = json!({ "detection": { "patterns": [ { "rank": 0 }, { "rank": 1 } ] } });
        assert_eq!(lookup(&json, "detection.patterns.1.rank"), Some(&json!(1)));
        assert_eq!(lookup(&json, "detection.patterns.2"), None);
        assert_eq!(lookup(&json, "detection.missing"), None);
    }

    #[test]
    fn test_defaults_validate() {
        let config = VatstripConfig::default();
        assert_eq!(validate(&config).unwrap(), config.detection.patterns.len());
    }

    #[test]
    fn test_inverted_price_range_is_rejected() {
        let mut config = VatstripConfig::default();
        config.extraction.min_price = config.extraction.max_price + config.extraction.max_price;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_pattern_without_group_is_rejected() {
        let mut config = VatstripConfig::default();
        config.detection.patterns[0].pattern = r"\d+\s*%\s*VAT".to_string();
        let message = validate(&config).unwrap_err().to_string();
        assert!(message.contains("capture group"));
    }
}
