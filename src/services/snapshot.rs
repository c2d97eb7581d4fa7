// src/services/snapshot.rs

//! Arrival snapshot builder.

use chrono::{DateTime, Utc};

use crate::models::{ArrivalSnapshot, BoardVariant, NormalizedArrival, RawArrivalEntry, Remaining};

/// Join entries with their remaining times into a display-ready snapshot.
///
/// Subway arrivals are ordered by destination, bus arrivals by remaining
/// time with unknown times last. Both sorts are stable, so ties keep board
/// order.
pub fn build_snapshot(
    station: &str,
    variant: BoardVariant,
    captured_at: DateTime<Utc>,
    entries: impl IntoIterator<Item = (RawArrivalEntry, Remaining)>,
) -> ArrivalSnapshot {
    let mut arrivals: Vec<NormalizedArrival> = entries
        .into_iter()
        .map(|(entry, remaining)| NormalizedArrival { entry, remaining })
        .collect();

    match variant {
        BoardVariant::Subway => arrivals.sort_by(|a, b| a.entry.destination.cmp(&b.entry.destination)),
        BoardVariant::Bus => arrivals.sort_by_key(|a| a.remaining),
    }

    ArrivalSnapshot {
        station: station.to_string(),
        variant,
        captured_at,
        arrivals,
    }
}
