// src/models/station.rs

//! Board variants and the station registry.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::RegistrySource;

/// The two board formats published by the transit operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardVariant {
    /// Metro boards listing absolute `HH:MM:SS` arrival clock times
    Subway,
    /// Bus boards listing relative `... - N min` texts
    Bus,
}

impl BoardVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardVariant::Subway => "subway",
            BoardVariant::Bus => "bus",
        }
    }
}

impl fmt::Display for BoardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A station and the URL of its arrival board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRegistryEntry {
    /// Station display name
    pub name: String,

    /// Board page listing upcoming arrivals
    pub board_url: String,

    /// Board format served at `board_url`
    pub variant: BoardVariant,
}

/// Read-only lookup of stations by variant and name.
///
/// Loaded once at startup and shared across every fetch.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    entries: BTreeMap<(BoardVariant, String), StationRegistryEntry>,
}

impl StationRegistry {
    /// Build a registry from entries. The first entry for a name wins.
    pub fn from_entries(entries: impl IntoIterator<Item = StationRegistryEntry>) -> Self {
        let mut registry = Self::default();
        for entry in entries {
            registry.insert(entry);
        }
        registry
    }

    /// Load every configured source, resolving relative paths against `base_dir`.
    ///
    /// A source that fails to load is logged and skipped so its stations
    /// are simply unknown; an empty result is an error.
    pub fn load(sources: &[RegistrySource], base_dir: &Path) -> Result<Self> {
        let mut registry = Self::default();
        for source in sources {
            match Self::load_source(source, base_dir) {
                Ok(entries) => {
                    log::info!(
                        "Loaded {} {} stations from {}",
                        entries.len(),
                        source.variant,
                        source.path.display()
                    );
                    for entry in entries {
                        registry.insert(entry);
                    }
                }
                Err(e) => log::error!(
                    "Skipping {} registry {}: {}",
                    source.variant,
                    source.path.display(),
                    e
                ),
            }
        }

        if registry.is_empty() {
            return Err(AppError::registry("no stations could be loaded"));
        }
        Ok(registry)
    }

    /// Read a single delimited source file.
    pub fn load_source(
        source: &RegistrySource,
        base_dir: &Path,
    ) -> Result<Vec<StationRegistryEntry>> {
        let path = base_dir.join(&source.path);
        let delimiter = u8::try_from(source.delimiter)
            .map_err(|_| AppError::registry("registry delimiter must be a single byte"))?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(&path)?;

        let headers = reader.headers()?.clone();
        let column = |wanted: &str| {
            headers
                .iter()
                .position(|h| h.trim() == wanted)
                .ok_or_else(|| {
                    AppError::registry(format!(
                        "column '{}' not found in {}",
                        wanted,
                        path.display()
                    ))
                })
        };
        let name_idx = column(&source.name_column)?;
        let url_idx = column(&source.url_column)?;

        let mut seen = BTreeMap::new();
        let mut entries = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let name = record.get(name_idx).unwrap_or("").trim();
            let board_url = record.get(url_idx).unwrap_or("").trim();

            if name.is_empty() || board_url.is_empty() {
                log::warn!("{}: row {} has no name or URL", path.display(), row + 1);
                continue;
            }
            if let Err(e) = Url::parse(board_url) {
                log::warn!(
                    "{}: station '{}' has an invalid URL '{}': {}",
                    path.display(),
                    name,
                    board_url,
                    e
                );
                continue;
            }
            if seen.insert(name.to_string(), row).is_some() {
                log::warn!(
                    "{}: duplicate station '{}' on row {}, keeping the first",
                    path.display(),
                    name,
                    row + 1
                );
                continue;
            }

            entries.push(StationRegistryEntry {
                name: name.to_string(),
                board_url: board_url.to_string(),
                variant: source.variant,
            });
        }

        if entries.is_empty() {
            return Err(AppError::registry(format!(
                "{} contains no usable stations",
                path.display()
            )));
        }
        Ok(entries)
    }

    fn insert(&mut self, entry: StationRegistryEntry) {
        let key = (entry.variant, entry.name.clone());
        self.entries.entry(key).or_insert(entry);
    }

    /// Look up a station by exact name.
    pub fn resolve(&self, variant: BoardVariant, name: &str) -> Result<&StationRegistryEntry> {
        self.entries
            .get(&(variant, name.to_string()))
            .ok_or_else(|| AppError::UnknownStation {
                variant,
                name: name.to_string(),
            })
    }

    /// Station names of a variant containing `query`, case-insensitively, sorted.
    pub fn search(&self, variant: BoardVariant, query: &str) -> Vec<&str> {
        let query = query.to_lowercase();
        self.stations(variant)
            .filter(|entry| entry.name.to_lowercase().contains(&query))
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// All stations of a variant in name order.
    pub fn stations(&self, variant: BoardVariant) -> impl Iterator<Item = &StationRegistryEntry> {
        self.entries
            .iter()
            .filter(move |((v, _), _)| *v == variant)
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
