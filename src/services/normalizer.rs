// src/services/normalizer.rs

//! Time normalization.
//!
//! Converts the time text of either board variant into a comparable
//! [`Remaining`]. Both functions are total: anything unparsable becomes
//! [`Remaining::Unknown`].

use std::sync::LazyLock;

use chrono::{NaiveTime, Timelike};
use regex::Regex;

use crate::models::{BoardVariant, Remaining};

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// `<number> min`, preceded by the start of text, whitespace or a dash.
static MINUTES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s-])(\d+)\s*min").expect("valid minutes pattern"));

/// Normalize `raw` using the strategy of the given board variant.
///
/// `now` is the current time of day in the board's timezone and is only
/// read for clock-time boards.
pub fn normalize(variant: BoardVariant, raw: &str, now: NaiveTime) -> Remaining {
    match variant {
        BoardVariant::Subway => remaining_until_clock(raw, now),
        BoardVariant::Bus => remaining_from_minutes(raw),
    }
}

/// Time from `now` until the `HH:MM:SS` clock time in `raw`.
///
/// An arrival earlier in the day than `now` is taken to be after
/// midnight, so the result is always within `[0, 24h)`.
pub fn remaining_until_clock(raw: &str, now: NaiveTime) -> Remaining {
    let Ok(arrival) = NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S") else {
        return Remaining::Unknown;
    };

    let arrival_secs = arrival.num_seconds_from_midnight();
    let now_secs = now.num_seconds_from_midnight();
    let secs = if arrival_secs < now_secs {
        arrival_secs + SECONDS_PER_DAY - now_secs
    } else {
        arrival_secs - now_secs
    };
    Remaining::from_secs(u64::from(secs))
}

/// Whole minutes from relative text such as `P. Congressos - 21 min`.
pub fn remaining_from_minutes(raw: &str) -> Remaining {
    MINUTES_PATTERN
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|minutes| Remaining::from_minutes(u64::from(minutes)))
        .unwrap_or(Remaining::Unknown)
}
