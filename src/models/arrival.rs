// src/models/arrival.rs

//! Arrival entries, normalized remaining times and board snapshots.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::models::BoardVariant;

/// Placeholder for any field the board markup did not provide.
pub const UNKNOWN: &str = "unknown";

/// One arrival as printed on the board, before any time normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RawArrivalEntry {
    /// Line identifier taken from the badge image filename
    pub line_id: String,

    /// Destination shown in bold on the board
    pub destination: String,

    /// Time text exactly as published
    pub raw_time: String,
}

impl RawArrivalEntry {
    /// Identity of this scheduled arrival across polling cycles.
    pub fn key(&self) -> ArrivalKey {
        ArrivalKey {
            line_id: self.line_id.clone(),
            destination: self.destination.clone(),
            raw_time: self.raw_time.clone(),
        }
    }
}

/// Distinguishes one scheduled arrival from another for notification dedupe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrivalKey {
    pub line_id: String,
    pub destination: String,
    pub raw_time: String,
}

/// Time left until an arrival.
///
/// `Unknown` sorts after every known duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Remaining {
    Known(Duration),
    Unknown,
}

impl Remaining {
    pub fn from_secs(secs: u64) -> Self {
        Remaining::Known(Duration::from_secs(secs))
    }

    pub fn from_minutes(minutes: u64) -> Self {
        Remaining::Known(Duration::from_secs(minutes * 60))
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Remaining::Known(_))
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Remaining::Known(d) => Some(*d),
            Remaining::Unknown => None,
        }
    }

    /// Whole minutes left, rounded down.
    pub fn whole_minutes(&self) -> Option<u64> {
        self.as_duration().map(|d| d.as_secs() / 60)
    }

    /// Render the way each board variant displays it.
    ///
    /// Subway: `MM:SS`, or `>1 hour` when unknown. Bus: `HH:MM`, or `unknown`.
    pub fn display(&self, variant: BoardVariant) -> String {
        match (self, variant) {
            (Remaining::Known(d), BoardVariant::Subway) => {
                let secs = d.as_secs();
                format!("{:02}:{:02}", secs / 60, secs % 60)
            }
            (Remaining::Known(d), BoardVariant::Bus) => {
                let minutes = d.as_secs() / 60;
                format!("{:02}:{:02}", minutes / 60, minutes % 60)
            }
            (Remaining::Unknown, BoardVariant::Subway) => ">1 hour".to_string(),
            (Remaining::Unknown, BoardVariant::Bus) => UNKNOWN.to_string(),
        }
    }
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Remaining::Known(d) => serializer.serialize_some(&d.as_secs()),
            Remaining::Unknown => serializer.serialize_none(),
        }
    }
}

/// A board entry joined with its normalized remaining time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedArrival {
    #[serde(flatten)]
    pub entry: RawArrivalEntry,

    #[serde(rename = "remaining_seconds")]
    pub remaining: Remaining,
}

impl NormalizedArrival {
    pub fn key(&self) -> ArrivalKey {
        self.entry.key()
    }
}

/// Arrivals of one station as captured by a single fetch.
#[derive(Debug, Clone, Serialize)]
pub struct ArrivalSnapshot {
    pub station: String,
    pub variant: BoardVariant,
    pub captured_at: DateTime<Utc>,
    pub arrivals: Vec<NormalizedArrival>,
}

impl ArrivalSnapshot {
    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }
}
