// src/models/subscription.rs

//! Standing requests to be alerted about arrivals at one station.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ArrivalKey, BoardVariant, NormalizedArrival, StationRegistryEntry};

/// Smallest and largest accepted lead time, in minutes.
pub const THRESHOLD_RANGE: std::ops::RangeInclusive<u32> = 1..=60;

/// Identifier handed out when monitoring starts.
pub type SubscriptionId = u64;

/// What a subscriber asks for when opting in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub station: String,
    pub variant: BoardVariant,
    pub address: String,
    pub threshold_minutes: u32,
}

impl SubscriptionRequest {
    pub fn validate(&self) -> Result<()> {
        if !THRESHOLD_RANGE.contains(&self.threshold_minutes) {
            return Err(AppError::validation(format!(
                "threshold must be between {} and {} minutes, got {}",
                THRESHOLD_RANGE.start(),
                THRESHOLD_RANGE.end(),
                self.threshold_minutes
            )));
        }
        if self.address.trim().is_empty() {
            return Err(AppError::validation("subscriber address is empty"));
        }
        if self.station.trim().is_empty() {
            return Err(AppError::validation("station name is empty"));
        }
        Ok(())
    }
}

/// An active subscription and the arrivals it has already announced.
///
/// Owned by exactly one monitoring loop; dropped when monitoring stops.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub station: StationRegistryEntry,
    pub address: String,
    pub threshold_minutes: u32,
    notified: HashSet<ArrivalKey>,
}

impl Subscription {
    /// Create a subscription for a station already resolved in the registry.
    pub fn new(
        id: SubscriptionId,
        request: &SubscriptionRequest,
        station: StationRegistryEntry,
    ) -> Result<Self> {
        request.validate()?;
        Ok(Self {
            id,
            station,
            address: request.address.trim().to_string(),
            threshold_minutes: request.threshold_minutes,
            notified: HashSet::new(),
        })
    }

    /// Whether an arrival falls inside the lead time and has not been announced.
    pub fn is_due(&self, arrival: &NormalizedArrival) -> bool {
        match arrival.remaining.whole_minutes() {
            Some(minutes) => {
                minutes <= u64::from(self.threshold_minutes) && !self.is_notified(&arrival.key())
            }
            None => false,
        }
    }

    pub fn is_notified(&self, key: &ArrivalKey) -> bool {
        self.notified.contains(key)
    }

    /// Record a successful notification. Returns false if already recorded.
    pub fn mark_notified(&mut self, key: ArrivalKey) -> bool {
        self.notified.insert(key)
    }

    pub fn notified_count(&self) -> usize {
        self.notified.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawArrivalEntry, Remaining};

    fn request(threshold_minutes: u32) -> SubscriptionRequest {
        SubscriptionRequest {
            station: "Benimaclet".to_string(),
            variant: BoardVariant::Subway,
            address: "rider@example.com".to_string(),
            threshold_minutes,
        }
    }

    fn station() -> StationRegistryEntry {
        StationRegistryEntry {
            name: "Benimaclet".to_string(),
            board_url: "https://boards.example.com/1".to_string(),
            variant: BoardVariant::Subway,
        }
    }

    fn arrival(raw_time: &str, remaining: Remaining) -> NormalizedArrival {
        NormalizedArrival {
            entry: RawArrivalEntry {
                line_id: "3".to_string(),
                destination: "Rafelbunyol".to_string(),
                raw_time: raw_time.to_string(),
            },
            remaining,
        }
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(request(0).validate().is_err());
        assert!(request(1).validate().is_ok());
        assert!(request(60).validate().is_ok());
        assert!(request(61).validate().is_err());
    }

    #[test]
    fn test_blank_address_rejected() {
        let mut req = request(10);
        req.address = "  ".to_string();
        assert!(Subscription::new(1, &req, station()).is_err());
    }

    #[test]
    fn test_is_due() {
        let mut sub = Subscription::new(1, &request(10), station()).unwrap();

        let soon = arrival("12:08:00", Remaining::from_minutes(8));
        let edge = arrival("12:10:59", Remaining::from_secs(10 * 60 + 59));
        let late = arrival("12:11:00", Remaining::from_minutes(11));
        let unknown = arrival("--", Remaining::Unknown);

        assert!(sub.is_due(&soon));
        assert!(sub.is_due(&edge));
        assert!(!sub.is_due(&late));
        assert!(!sub.is_due(&unknown));

        assert!(sub.mark_notified(soon.key()));
        assert!(!sub.mark_notified(soon.key()));
        assert!(!sub.is_due(&soon));
        assert_eq!(sub.notified_count(), 1);
    }
}
