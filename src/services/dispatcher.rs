// src/services/dispatcher.rs

//! Notification composition and delivery.
//!
//! Delivery failures are reported to the caller and never retried here;
//! the scheduler's next cycle picks the arrival up again.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ArrivalKey, NormalizedArrival, NotifyMode, Subscription};

/// Capability to deliver a message to a subscriber address.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Deliver one message. Failures are [`AppError::Delivery`](crate::error::AppError::Delivery).
    async fn deliver(&self, address: &str, subject: &str, body: &str) -> Result<()>;
}

/// A composed message and the arrivals it announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub keys: Vec<ArrivalKey>,
}

/// Compose the messages announcing `due` arrivals.
pub fn compose(
    subscription: &Subscription,
    due: &[&NormalizedArrival],
    mode: NotifyMode,
) -> Vec<Notification> {
    if due.is_empty() {
        return Vec::new();
    }
    let station = &subscription.station.name;

    match mode {
        NotifyMode::PerArrival => due
            .iter()
            .map(|arrival| Notification {
                subject: format!(
                    "{}: line {} to {} in {} min",
                    station,
                    arrival.entry.line_id,
                    arrival.entry.destination,
                    minutes(arrival)
                ),
                body: format!(
                    "{}\n\nStation: {}\nScheduled: {}\n",
                    describe(arrival),
                    station,
                    arrival.entry.raw_time
                ),
                keys: vec![arrival.key()],
            })
            .collect(),
        NotifyMode::Digest => {
            let lines: Vec<String> = due.iter().map(|a| describe(a)).collect();
            vec![Notification {
                subject: format!("Upcoming arrivals at {station}"),
                body: format!(
                    "The following arrivals are due soon:\n{}\n",
                    lines.join("\n")
                ),
                keys: due.iter().map(|a| a.key()).collect(),
            }]
        }
    }
}

fn minutes(arrival: &NormalizedArrival) -> u64 {
    arrival.remaining.whole_minutes().unwrap_or_default()
}

fn describe(arrival: &NormalizedArrival) -> String {
    format!(
        "Line {} to {} in {} minutes",
        arrival.entry.line_id,
        arrival.entry.destination,
        minutes(arrival)
    )
}

/// Dry-run dispatcher that only logs what would be sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn deliver(&self, address: &str, subject: &str, body: &str) -> Result<()> {
        log::info!("[dry-run] To: {address} | Subject: {subject}");
        for line in body.lines().filter(|l| !l.is_empty()) {
            log::info!("[dry-run]     {line}");
        }
        Ok(())
    }
}

#[cfg(feature = "smtp")]
pub use smtp::SmtpDispatcher;

#[cfg(feature = "smtp")]
mod smtp {
    use async_trait::async_trait;
    use lettre::message::{Mailbox, Message, header};
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

    use super::Dispatcher;
    use crate::error::{AppError, Result};
    use crate::models::SmtpConfig;

    /// Sends notifications through an SMTP relay.
    pub struct SmtpDispatcher {
        mailer: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    }

    impl SmtpDispatcher {
        /// Build the transport; the password comes from `config.password_env`.
        pub fn from_config(config: &SmtpConfig) -> Result<Self> {
            let password = std::env::var(&config.password_env).map_err(|_| {
                AppError::config(format!("environment variable {} is not set", config.password_env))
            })?;
            let credentials = Credentials::new(config.username.clone(), password);

            let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| AppError::config(format!("invalid SMTP host {}: {}", config.host, e)))?
                .port(config.port)
                .credentials(credentials)
                .build();

            let from = config
                .from
                .parse()
                .map_err(|e| AppError::config(format!("invalid sender {}: {}", config.from, e)))?;

            Ok(Self { mailer, from })
        }
    }

    #[async_trait]
    impl Dispatcher for SmtpDispatcher {
        async fn deliver(&self, address: &str, subject: &str, body: &str) -> Result<()> {
            let to: Mailbox = address
                .parse()
                .map_err(|e| AppError::delivery(address, format!("invalid address: {e}")))?;

            let message = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(subject)
                .header(header::ContentType::TEXT_PLAIN)
                .body(body.to_string())
                .map_err(|e| AppError::delivery(address, e))?;

            self.mailer
                .send(message)
                .await
                .map_err(|e| AppError::delivery(address, e))?;
            Ok(())
        }
    }
}
