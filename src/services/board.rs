// src/services/board.rs

//! Board reader.
//!
//! Fetches, parses and normalizes a station board into an [`ArrivalSnapshot`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::models::{ArrivalSnapshot, Config, StationRegistryEntry};
use crate::services::fetcher::{BoardFetcher, HttpBoardFetcher};
use crate::services::normalizer::normalize;
use crate::services::parser::BoardParser;
use crate::services::snapshot::build_snapshot;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Reads station boards into snapshots.
#[derive(Clone)]
pub struct BoardReader {
    fetcher: Arc<dyn BoardFetcher>,
    parser: BoardParser,
    clock: Arc<dyn Clock>,
    timezone: Tz,
    max_concurrent: usize,
}

impl BoardReader {
    pub fn new(
        fetcher: Arc<dyn BoardFetcher>,
        parser: BoardParser,
        clock: Arc<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            fetcher,
            parser,
            clock,
            timezone,
            max_concurrent: 1,
        }
    }

    /// Build a reader that fetches over HTTP with the system clock.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpBoardFetcher::new(&config.fetcher)?;
        let parser = BoardParser::new(&config.board.selectors)?;
        let reader = Self::new(
            Arc::new(fetcher),
            parser,
            Arc::new(SystemClock),
            config.board.timezone()?,
        );
        Ok(reader.with_max_concurrent(config.fetcher.max_concurrent))
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Capture a fresh snapshot for one station.
    pub async fn read(&self, station: &StationRegistryEntry) -> Result<ArrivalSnapshot> {
        let markup = self.fetcher.fetch(&station.board_url).await?;
        let entries = self.parser.parse(&markup)?;

        let captured_at = self.clock.now();
        let now = captured_at.with_timezone(&self.timezone).time();

        log::debug!(
            "Parsed {} arrivals for {} ({})",
            entries.len(),
            station.name,
            station.variant
        );

        let normalized = entries.into_iter().map(|entry| {
            let remaining = normalize(station.variant, &entry.raw_time, now);
            (entry, remaining)
        });
        Ok(build_snapshot(
            &station.name,
            station.variant,
            captured_at,
            normalized,
        ))
    }

    /// Read several stations concurrently, bounded by `max_concurrent`.
    ///
    /// Results come back in the order the stations were given.
    pub async fn read_many<'a>(
        &self,
        stations: &[&'a StationRegistryEntry],
    ) -> Vec<(&'a StationRegistryEntry, Result<ArrivalSnapshot>)> {
        stream::iter(stations.iter().copied())
            .map(|station| async move { (station, self.read(station).await) })
            .buffered(self.max_concurrent)
            .collect()
            .await
    }
}
