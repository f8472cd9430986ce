pub mod config;
pub mod extract;
pub mod mapping;

use std::path::{Path, PathBuf};

use faktur_core::FakturConfig;
use tracing::debug;

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("faktur")
        .join("config.json")
}

/// Load the explicit config file, else the default one if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FakturConfig> {
    if let Some(path) = config_path {
        return Ok(FakturConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Using config {}", path.display());
        Ok(FakturConfig::from_file(&path)?)
    } else {
        Ok(FakturConfig::default())
    }
}
