// src/pipeline/board.rs

//! Board display commands.

use std::time::Duration;

use chrono_tz::Tz;

use crate::error::Result;
use crate::models::{ArrivalSnapshot, StationRegistryEntry};
use crate::services::BoardReader;

/// Render a snapshot as a plain-text table.
///
/// A board without arrivals renders as an empty table, not an error.
pub fn format_snapshot(snapshot: &ArrivalSnapshot, timezone: Tz) -> String {
    let mut out = format!(
        "Next arrivals at {} ({}) as of {}\n",
        snapshot.station,
        snapshot.variant,
        snapshot
            .captured_at
            .with_timezone(&timezone)
            .format("%H:%M:%S")
    );
    out.push_str(&format!(
        "{:<6} {:<32} {:<28} {}\n",
        "Line", "Destination", "Board time", "Remaining"
    ));

    if snapshot.is_empty() {
        out.push_str("(no arrivals listed)\n");
    }
    for arrival in &snapshot.arrivals {
        out.push_str(&format!(
            "{:<6} {:<32} {:<28} {}\n",
            arrival.entry.line_id,
            arrival.entry.destination,
            arrival.entry.raw_time,
            arrival.remaining.display(snapshot.variant)
        ));
    }
    out
}

/// Fetch and print the current board of each station.
///
/// Every station is attempted; the first failure is returned after all
/// boards have been printed.
pub async fn run_board(
    reader: &BoardReader,
    stations: &[&StationRegistryEntry],
    timezone: Tz,
    json: bool,
) -> Result<()> {
    let mut first_error = None;

    for (station, result) in reader.read_many(stations).await {
        match result {
            Ok(snapshot) if json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            Ok(snapshot) => println!("{}", format_snapshot(&snapshot, timezone)),
            Err(e) => {
                log::error!("Could not read board for {}: {}", station.name, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Redisplay one station's board every `interval` until Ctrl-C.
///
/// Fetch failures are logged and the board is tried again next interval.
pub async fn run_watch(
    reader: &BoardReader,
    station: &StationRegistryEntry,
    timezone: Tz,
    interval: Duration,
) -> Result<()> {
    log::info!(
        "Watching {} every {}s, press Ctrl-C to stop",
        station.name,
        interval.as_secs()
    );

    loop {
        match reader.read(station).await {
            Ok(snapshot) => println!("{}", format_snapshot(&snapshot, timezone)),
            Err(e) => log::warn!("Board refresh for {} failed: {}", station.name, e),
        }

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    log::info!("Stopped watching {}", station.name);
    Ok(())
}
