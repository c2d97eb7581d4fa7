// src/pipeline/monitor.rs

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Config, StationRegistry, SubscriptionRequest};
use crate::services::{BoardReader, Dispatcher, LogDispatcher, Monitor, SubscriptionManager};

/// Pick the delivery backend for this run.
///
/// Dry runs, and builds without the `smtp` feature, only log messages.
pub fn select_dispatcher(config: &Config, dry_run: bool) -> Result<Arc<dyn Dispatcher>> {
    if dry_run {
        return Ok(Arc::new(LogDispatcher));
    }

    #[cfg(feature = "smtp")]
    {
        match &config.smtp {
            Some(smtp) => Ok(Arc::new(crate::services::SmtpDispatcher::from_config(smtp)?)),
            None => Err(crate::error::AppError::config(
                "no [smtp] section configured, use --dry-run to only log notifications",
            )),
        }
    }

    #[cfg(not(feature = "smtp"))]
    {
        if config.smtp.is_some() {
            log::warn!("Built without the smtp feature, notifications will only be logged");
        }
        Ok(Arc::new(LogDispatcher))
    }
}

/// Monitor one station for a subscriber until Ctrl-C.
pub async fn run_monitor(
    config: &Config,
    registry: Arc<StationRegistry>,
    request: SubscriptionRequest,
    dry_run: bool,
) -> Result<()> {
    let reader = BoardReader::from_config(config)?;
    let dispatcher = select_dispatcher(config, dry_run)?;
    let monitor = Arc::new(Monitor::new(
        reader,
        dispatcher,
        config.scheduler.poll_interval(),
        config.scheduler.notify_mode,
    ));

    let mut manager = SubscriptionManager::new(registry, monitor);
    let id = manager.start(request)?;
    log::info!("Subscription {id} started, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    log::info!("Interrupted, stopping subscriptions...");

    let summary = manager.stop(id).await?;
    log::info!(
        "Subscription {}: {} cycles, {} notifications sent, {} arrivals announced",
        id,
        summary.cycles,
        summary.notifications_sent,
        summary.arrivals_notified
    );
    if summary.fetch_failures > 0 || summary.delivery_failures > 0 {
        log::warn!(
            "Subscription {}: {} failed fetches, {} failed deliveries",
            id,
            summary.fetch_failures,
            summary.delivery_failures
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_always_selects_log_dispatcher() {
        assert!(select_dispatcher(&Config::default(), true).is_ok());
    }

    #[cfg(not(feature = "smtp"))]
    #[test]
    fn test_without_smtp_feature_falls_back_to_logging() {
        assert!(select_dispatcher(&Config::default(), false).is_ok());
    }

    #[cfg(feature = "smtp")]
    #[test]
    fn test_smtp_without_config_is_rejected() {
        assert!(matches!(
            select_dispatcher(&Config::default(), false),
            Err(crate::error::AppError::Config(_))
        ));
    }
}
