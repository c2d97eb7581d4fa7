// src/services/scheduler.rs

//! Notification scheduler.
//!
//! Each subscription runs its own polling loop as a background task:
//! capture a snapshot, notify about due arrivals, sleep, repeat. Cycles of
//! one subscription never overlap. Cancellation is observed only between
//! cycles, so a cycle in progress always completes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{
    NormalizedArrival, NotifyMode, StationRegistry, Subscription, SubscriptionId,
    SubscriptionRequest,
};
use crate::services::board::BoardReader;
use crate::services::dispatcher::{Dispatcher, compose};

/// Outcome of a single polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Arrivals on the board
    pub arrivals: usize,
    /// Arrivals inside the lead time and not yet announced
    pub due: usize,
    /// Messages delivered
    pub sent: usize,
    /// Messages that failed to deliver
    pub failed: usize,
}

/// Totals over the lifetime of one subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub cycles: usize,
    pub notifications_sent: usize,
    pub fetch_failures: usize,
    pub delivery_failures: usize,
    /// Distinct arrivals announced
    pub arrivals_notified: usize,
}

/// Runs polling cycles for subscriptions.
pub struct Monitor {
    reader: BoardReader,
    dispatcher: Arc<dyn Dispatcher>,
    interval: Duration,
    mode: NotifyMode,
}

impl Monitor {
    pub fn new(
        reader: BoardReader,
        dispatcher: Arc<dyn Dispatcher>,
        interval: Duration,
        mode: NotifyMode,
    ) -> Self {
        Self {
            reader,
            dispatcher,
            interval,
            mode,
        }
    }

    /// Run one cycle: fetch a fresh snapshot and notify about due arrivals.
    ///
    /// A fetch or parse failure is returned and nothing is sent. A delivery
    /// failure leaves its arrivals unmarked so the next cycle retries them.
    pub async fn run_cycle(&self, subscription: &mut Subscription) -> Result<CycleReport> {
        let snapshot = self.reader.read(&subscription.station).await?;

        let mut seen = HashSet::new();
        let due: Vec<&NormalizedArrival> = snapshot
            .arrivals
            .iter()
            .filter(|arrival| subscription.is_due(arrival))
            .filter(|arrival| seen.insert(arrival.key()))
            .collect();

        let mut report = CycleReport {
            arrivals: snapshot.arrivals.len(),
            due: due.len(),
            ..CycleReport::default()
        };

        for notification in compose(subscription, &due, self.mode) {
            match self
                .dispatcher
                .deliver(
                    &subscription.address,
                    &notification.subject,
                    &notification.body,
                )
                .await
            {
                Ok(()) => {
                    report.sent += 1;
                    for key in notification.keys {
                        subscription.mark_notified(key);
                    }
                    log::info!(
                        "Subscription {}: sent '{}' to {}",
                        subscription.id,
                        notification.subject,
                        subscription.address
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    log::warn!(
                        "Subscription {}: delivery failed, will retry next cycle: {}",
                        subscription.id,
                        e
                    );
                }
            }
        }

        Ok(report)
    }

    /// Poll until `cancel` fires, then return the lifetime totals.
    ///
    /// The subscription, with its dedupe state, is dropped on return.
    pub async fn run(
        self: Arc<Self>,
        mut subscription: Subscription,
        cancel: CancellationToken,
    ) -> MonitorSummary {
        let mut summary = MonitorSummary::default();
        log::info!(
            "Subscription {}: monitoring {} ({}) for {} with a {} minute lead",
            subscription.id,
            subscription.station.name,
            subscription.station.variant,
            subscription.address,
            subscription.threshold_minutes
        );

        while !cancel.is_cancelled() {
            summary.cycles += 1;
            match self.run_cycle(&mut subscription).await {
                Ok(report) => {
                    summary.notifications_sent += report.sent;
                    summary.delivery_failures += report.failed;
                    log::debug!(
                        "Subscription {}: cycle {} saw {} arrivals, {} due",
                        subscription.id,
                        summary.cycles,
                        report.arrivals,
                        report.due
                    );
                }
                Err(e) => {
                    summary.fetch_failures += 1;
                    log::warn!(
                        "Subscription {}: skipping cycle {}: {}",
                        subscription.id,
                        summary.cycles,
                        e
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        summary.arrivals_notified = subscription.notified_count();
        log::info!(
            "Subscription {}: stopped after {} cycles",
            subscription.id,
            summary.cycles
        );
        summary
    }
}

struct ActiveSubscription {
    cancel: CancellationToken,
    handle: JoinHandle<MonitorSummary>,
}

/// Starts and stops monitoring for subscribers.
pub struct SubscriptionManager {
    registry: Arc<StationRegistry>,
    monitor: Arc<Monitor>,
    active: HashMap<SubscriptionId, ActiveSubscription>,
    next_id: SubscriptionId,
}

impl SubscriptionManager {
    pub fn new(registry: Arc<StationRegistry>, monitor: Arc<Monitor>) -> Self {
        Self {
            registry,
            monitor,
            active: HashMap::new(),
            next_id: 1,
        }
    }

    /// Validate the request, resolve its station and start polling.
    ///
    /// Unknown stations are rejected before anything is fetched.
    pub fn start(&mut self, request: SubscriptionRequest) -> Result<SubscriptionId> {
        request.validate()?;
        let station = self
            .registry
            .resolve(request.variant, &request.station)?
            .clone();

        let id = self.next_id;
        let subscription = Subscription::new(id, &request, station)?;
        self.next_id += 1;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&self.monitor).run(subscription, cancel.clone()));
        self.active.insert(id, ActiveSubscription { cancel, handle });
        Ok(id)
    }

    /// Stop a subscription and wait for its current cycle to finish.
    pub async fn stop(&mut self, id: SubscriptionId) -> Result<MonitorSummary> {
        let active = self
            .active
            .remove(&id)
            .ok_or(AppError::SubscriptionNotFound(id))?;
        active.cancel.cancel();
        active.handle.await.map_err(|e| {
            AppError::validation(format!("subscription {id} task ended abnormally: {e}"))
        })
    }

    /// Stop every active subscription.
    pub async fn stop_all(&mut self) -> Vec<(SubscriptionId, Result<MonitorSummary>)> {
        let mut ids: Vec<SubscriptionId> = self.active.keys().copied().collect();
        ids.sort_unstable();

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            results.push((id, self.stop(id).await));
        }
        results
    }

    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::{BoardVariant, StationRegistryEntry};
    use crate::services::board::FixedClock;
    use crate::services::fetcher::BoardFetcher;
    use crate::services::board::tests::{
        StubFetcher, block, bus_station, metro_station, page, reader,
    };

    /// Records deliveries; fails the first `fail_first` attempts.
    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<(String, String)>>,
        attempts: AtomicUsize,
        fail_first: usize,
    }

    impl RecordingDispatcher {
        fn failing(fail_first: usize) -> Self {
            Self {
                fail_first,
                ..Self::default()
            }
        }

        fn subjects(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, subject)| subject.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn deliver(&self, address: &str, subject: &str, _body: &str) -> Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                return Err(AppError::delivery(address, "connection refused"));
            }
            self.sent
                .lock()
                .unwrap()
                .push((address.to_string(), subject.to_string()));
            Ok(())
        }
    }

    fn request(station: &StationRegistryEntry, threshold_minutes: u32) -> SubscriptionRequest {
        SubscriptionRequest {
            station: station.name.clone(),
            variant: station.variant,
            address: "rider@example.com".to_string(),
            threshold_minutes,
        }
    }

    fn subscription(station: StationRegistryEntry, threshold_minutes: u32) -> Subscription {
        Subscription::new(1, &request(&station, threshold_minutes), station).unwrap()
    }

    fn monitor(
        fetcher: Arc<StubFetcher>,
        dispatcher: Arc<RecordingDispatcher>,
        mode: NotifyMode,
    ) -> Monitor {
        Monitor::new(
            reader(fetcher, FixedClock(Utc::now())),
            dispatcher,
            Duration::from_secs(60),
            mode,
        )
    }

    #[tokio::test]
    async fn test_each_arrival_notified_once() {
        let station = bus_station();
        let fetcher = Arc::new(StubFetcher::default().serve(
            &station.board_url,
            vec![Ok(page(&[
                block("70", "Natzaret", "Natzaret - 8 min"),
                block("5", "Marítim", "Marítim - 25 min"),
            ]))],
        ));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let monitor = monitor(fetcher, Arc::clone(&dispatcher), NotifyMode::PerArrival);
        let mut sub = subscription(station, 10);

        let first = monitor.run_cycle(&mut sub).await.unwrap();
        assert_eq!(first, CycleReport { arrivals: 2, due: 1, sent: 1, failed: 0 });

        let second = monitor.run_cycle(&mut sub).await.unwrap();
        assert_eq!(second, CycleReport { arrivals: 2, due: 0, sent: 0, failed: 0 });

        assert_eq!(
            dispatcher.subjects(),
            vec!["Colón: line 70 to Natzaret in 8 min".to_string()]
        );
    }

    #[tokio::test]
    async fn test_same_key_not_renotified_as_it_gets_closer() {
        // Clock-time boards keep the same raw time as the arrival approaches.
        let station = metro_station();
        let fetcher = Arc::new(StubFetcher::default().serve(
            &station.board_url,
            vec![Ok(page(&[block("3", "Rafelbunyol", "12:08:00")]))],
        ));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let mut sub = subscription(station, 10);

        // 10:00 and 10:02 UTC are 12:00 and 12:02 in Madrid in June.
        for minute in [0, 2] {
            let clock = FixedClock(Utc.with_ymd_and_hms(2024, 6, 3, 10, minute, 0).unwrap());
            let monitor = Monitor::new(
                reader(Arc::clone(&fetcher) as Arc<dyn BoardFetcher>, clock),
                Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
                Duration::from_secs(60),
                NotifyMode::PerArrival,
            );
            monitor.run_cycle(&mut sub).await.unwrap();
        }

        assert_eq!(dispatcher.subjects().len(), 1);
        assert_eq!(
            dispatcher.subjects()[0],
            "Benimaclet: line 3 to Rafelbunyol in 8 min"
        );
    }

    #[tokio::test]
    async fn test_delivery_failure_retried_next_cycle() {
        let station = bus_station();
        let fetcher = Arc::new(StubFetcher::default().serve(
            &station.board_url,
            vec![Ok(page(&[block("70", "Natzaret", "Natzaret - 4 min")]))],
        ));
        let dispatcher = Arc::new(RecordingDispatcher::failing(1));
        let monitor = monitor(fetcher, Arc::clone(&dispatcher), NotifyMode::PerArrival);
        let mut sub = subscription(station, 10);

        let first = monitor.run_cycle(&mut sub).await.unwrap();
        assert_eq!(first.failed, 1);
        assert_eq!(sub.notified_count(), 0);

        let second = monitor.run_cycle(&mut sub).await.unwrap();
        assert_eq!(second.sent, 1);
        assert_eq!(sub.notified_count(), 1);

        let third = monitor.run_cycle(&mut sub).await.unwrap();
        assert_eq!(third.due, 0);
        assert_eq!(dispatcher.subjects().len(), 1);
    }

    #[tokio::test]
    async fn test_digest_marks_all_keys() {
        let station = bus_station();
        let fetcher = Arc::new(StubFetcher::default().serve(
            &station.board_url,
            vec![Ok(page(&[
                block("70", "Natzaret", "Natzaret - 4 min"),
                block("70", "Natzaret", "Natzaret - 4 min"),
                block("5", "Marítim", "Marítim - 9 min"),
                block("C1", "Cabanyal", "Cabanyal - llegando"),
            ]))],
        ));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let monitor = monitor(fetcher, Arc::clone(&dispatcher), NotifyMode::Digest);
        let mut sub = subscription(station, 10);

        let report = monitor.run_cycle(&mut sub).await.unwrap();
        assert_eq!(report, CycleReport { arrivals: 4, due: 2, sent: 1, failed: 0 });
        assert_eq!(sub.notified_count(), 2);
        assert_eq!(dispatcher.subjects(), vec!["Upcoming arrivals at Colón".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported_without_dispatch() {
        let station = bus_station();
        let fetcher = Arc::new(StubFetcher::default());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let monitor = monitor(fetcher, Arc::clone(&dispatcher), NotifyMode::PerArrival);
        let mut sub = subscription(station, 10);

        let err = monitor.run_cycle(&mut sub).await.unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
        assert!(dispatcher.subjects().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_fetch_failures_until_cancelled() {
        let station = bus_station();
        let fetcher = Arc::new(StubFetcher::default().serve(
            &station.board_url,
            vec![
                Err(AppError::fetch(&station.board_url, "request timed out")),
                Ok(page(&[block("70", "Natzaret", "Natzaret - 4 min")])),
            ],
        ));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let monitor = Arc::new(monitor(
            Arc::clone(&fetcher),
            Arc::clone(&dispatcher),
            NotifyMode::PerArrival,
        ));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(monitor.run(subscription(station, 10), cancel.clone()));

        // Cycles run at t=0, 60 and 120 seconds.
        tokio::time::sleep(Duration::from_secs(150)).await;
        cancel.cancel();
        let summary = handle.await.unwrap();

        assert_eq!(
            summary,
            MonitorSummary {
                cycles: 3,
                notifications_sent: 1,
                fetch_failures: 1,
                delivery_failures: 0,
                arrivals_notified: 1,
            }
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.subjects().len(), 1);
    }

    #[tokio::test]
    async fn test_manager_rejects_unknown_station_before_fetch() {
        let fetcher = Arc::new(StubFetcher::default());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let registry = Arc::new(StationRegistry::from_entries(vec![metro_station()]));
        let monitor = Arc::new(monitor(
            Arc::clone(&fetcher),
            dispatcher,
            NotifyMode::PerArrival,
        ));
        let mut manager = SubscriptionManager::new(registry, monitor);

        let mut unknown = request(&metro_station(), 10);
        unknown.station = "Atlantis".to_string();
        assert!(matches!(
            manager.start(unknown),
            Err(AppError::UnknownStation { .. })
        ));

        let mut wrong_variant = request(&metro_station(), 10);
        wrong_variant.variant = BoardVariant::Bus;
        assert!(manager.start(wrong_variant).is_err());

        assert!(matches!(
            manager.start(request(&metro_station(), 0)),
            Err(AppError::Validation(_))
        ));

        assert_eq!(manager.active_count(), 0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manager_start_and_stop() {
        let station = metro_station();
        let fetcher = Arc::new(StubFetcher::default().serve(
            &station.board_url,
            vec![Ok(page(&[block("3", "Rafelbunyol", "unknown")]))],
        ));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let registry = Arc::new(StationRegistry::from_entries(vec![station.clone()]));
        let monitor = Arc::new(monitor(fetcher, dispatcher, NotifyMode::PerArrival));
        let mut manager = SubscriptionManager::new(registry, monitor);

        let first = manager.start(request(&station, 10)).unwrap();
        let second = manager.start(request(&station, 5)).unwrap();
        assert_ne!(first, second);
        assert!(manager.is_active(first));

        tokio::time::sleep(Duration::from_secs(30)).await;

        let summary = manager.stop(first).await.unwrap();
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.notifications_sent, 0);
        assert!(!manager.is_active(first));
        assert!(matches!(
            manager.stop(first).await,
            Err(AppError::SubscriptionNotFound(_))
        ));

        let rest = manager.stop_all().await;
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].0, second);
        assert_eq!(manager.active_count(), 0);
    }
}
