//! Subcommands of the vatstrip binary.

pub mod batch;
pub mod config;
pub mod detect;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::debug;

use vatstrip_core::VatstripConfig;

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vatstrip")
        .join("config.json")
}

/// Load the configuration from `--config`, the default location, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<VatstripConfig> {
    if let Some(path) = config_path {
        return Ok(VatstripConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using configuration from {}", default_path.display());
        return Ok(VatstripConfig::from_file(&default_path)?);
    }

    Ok(VatstripConfig::default())
}
