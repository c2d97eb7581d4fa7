//! Service layer for the arrival board application.
//!
//! This module contains the business logic for:
//! - Board fetching (`BoardFetcher`, `HttpBoardFetcher`)
//! - Board parsing (`BoardParser`)
//! - Time normalization (`normalizer`)
//! - Snapshot building and board reading (`build_snapshot`, `BoardReader`)
//! - Notification delivery (`Dispatcher`)
//! - Subscription monitoring (`Monitor`, `SubscriptionManager`)

pub mod board;
pub mod dispatcher;
pub mod fetcher;
pub mod normalizer;
pub mod parser;
pub mod scheduler;
pub mod snapshot;

pub use board::{BoardReader, Clock, FixedClock, SystemClock};
#[cfg(feature = "smtp")]
pub use dispatcher::SmtpDispatcher;
pub use dispatcher::{Dispatcher, LogDispatcher, Notification, compose};
pub use fetcher::{BoardFetcher, HttpBoardFetcher};
pub use parser::BoardParser;
pub use scheduler::{CycleReport, Monitor, MonitorSummary, SubscriptionManager};
pub use snapshot::build_snapshot;
