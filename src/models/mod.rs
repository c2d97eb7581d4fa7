// src/models/mod.rs

//! Domain models for the arrival board application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod arrival;
mod config;
mod selectors;
mod station;
mod subscription;

// Re-export all public types
pub use arrival::{ArrivalKey, ArrivalSnapshot, NormalizedArrival, RawArrivalEntry, Remaining, UNKNOWN};
pub use config::{
    BoardConfig, Config, FetcherConfig, LoggingConfig, NotifyMode, RegistrySource,
    SchedulerConfig, SmtpConfig,
};
pub use selectors::{BoardSelectors, parse_selector};
pub use station::{BoardVariant, StationRegistry, StationRegistryEntry};
pub use subscription::{Subscription, SubscriptionId, SubscriptionRequest, THRESHOLD_RANGE};
