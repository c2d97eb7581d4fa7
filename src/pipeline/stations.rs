// src/pipeline/stations.rs

use crate::models::{BoardVariant, StationRegistry};

/// Print station names of a variant, optionally filtered.
pub fn run_stations(registry: &StationRegistry, variant: BoardVariant, filter: Option<&str>) {
    let names = registry.search(variant, filter.unwrap_or(""));
    if names.is_empty() {
        log::warn!("No {variant} stations match");
        return;
    }

    for name in &names {
        println!("{name}");
    }
    log::info!("{} {} stations", names.len(), variant);
}
