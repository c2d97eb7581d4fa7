// src/pipeline/validate.rs

use std::path::Path;

use crate::config::{base_dir, load_config};
use crate::error::{AppError, Result};
use crate::models::StationRegistry;

/// Validate the configuration and every registry source it names.
///
/// Each source is checked on its own so all broken ones are reported.
pub fn run_validate(config_path: &Path) -> Result<()> {
    log::info!("Validating configuration...");

    let config = load_config(config_path)?;
    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    log::info!("✓ Config OK");
    log::info!("    User agent: {}", config.fetcher.user_agent);
    log::info!("    Timeout: {}s", config.fetcher.timeout_secs);
    log::info!("    Poll interval: {}s", config.scheduler.poll_interval_secs);
    log::info!("    Timezone: {}", config.board.timezone);

    let mut failures = 0;
    for source in &config.registries {
        match StationRegistry::load_source(source, base_dir(config_path)) {
            Ok(entries) => log::info!(
                "✓ {} registry OK ({} stations from {})",
                source.variant,
                entries.len(),
                source.path.display()
            ),
            Err(e) => {
                failures += 1;
                log::error!("✗ {} registry invalid: {}", source.variant, e);
            }
        }
    }

    if failures > 0 {
        return Err(AppError::registry(format!(
            "{failures} registry source(s) failed validation"
        )));
    }
    log::info!("All validations passed!");
    Ok(())
}
