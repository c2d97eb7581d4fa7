// src/config.rs

//! Configuration loading utilities.
//!
//! This module provides convenience functions for loading configuration
//! and the station registry from files.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Config, StationRegistry};

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::warn!("Config not found at {path:?}, using default configuration.");
        return Ok(Config::default());
    }
    Config::load(path)
}

/// Directory registry paths are resolved against.
pub fn base_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Load and validate the configuration, then load the station registry.
pub fn load_all(config_path: &Path) -> Result<(Config, StationRegistry)> {
    let config = load_config(config_path)?;
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))?;

    let registry = StationRegistry::load(&config.registries, base_dir(config_path))?;
    Ok((config, registry))
}
