//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{BoardSelectors, BoardVariant};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetch behavior settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Board markup and clock settings
    #[serde(default)]
    pub board: BoardConfig,

    /// Subscription polling settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Station registry sources, one per board variant
    #[serde(default = "defaults::registries")]
    pub registries: Vec<RegistrySource>,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Outbound mail transport (only used with the `smtp` feature)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetcher.user_agent is empty"));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        if self.fetcher.max_concurrent == 0 {
            return Err(AppError::validation("fetcher.max_concurrent must be > 0"));
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(AppError::validation(
                "scheduler.poll_interval_secs must be > 0",
            ));
        }
        if !(1..=60).contains(&self.scheduler.default_threshold_minutes) {
            return Err(AppError::validation(
                "scheduler.default_threshold_minutes must be between 1 and 60",
            ));
        }
        self.board.timezone()?;
        self.board.selectors.validate()?;
        if self.registries.is_empty() {
            return Err(AppError::validation("No registries defined"));
        }
        for source in &self.registries {
            source.validate()?;
        }
        Ok(())
    }

    /// Find the registry source configured for a board variant.
    pub fn registry_for(&self, variant: BoardVariant) -> Option<&RegistrySource> {
        self.registries.iter().find(|r| r.variant == variant)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetcher: FetcherConfig::default(),
            board: BoardConfig::default(),
            scheduler: SchedulerConfig::default(),
            registries: defaults::registries(),
            logging: LoggingConfig::default(),
            smtp: None,
        }
    }
}

/// HTTP client settings for board fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds; a timed out fetch skips the cycle
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum boards fetched at once for multi-station reads
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Board markup and local clock settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// IANA zone the boards publish their clock times in
    #[serde(default = "defaults::timezone")]
    pub timezone: String,

    /// Selectors locating arrival blocks and their fields
    #[serde(default)]
    pub selectors: BoardSelectors,
}

impl BoardConfig {
    /// Parse the configured timezone.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| AppError::config(format!("invalid timezone '{}': {}", self.timezone, e)))
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            timezone: defaults::timezone(),
            selectors: BoardSelectors::default(),
        }
    }
}

/// How due arrivals are grouped into outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMode {
    /// One message per due arrival
    #[default]
    PerArrival,
    /// One message per cycle listing every due arrival
    Digest,
}

/// Subscription polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Pause between the end of one cycle and the start of the next
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,

    /// Lead time used when a subscriber does not pick one
    #[serde(default = "defaults::threshold")]
    pub default_threshold_minutes: u32,

    #[serde(default)]
    pub notify_mode: NotifyMode,
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: defaults::poll_interval(),
            default_threshold_minutes: defaults::threshold(),
            notify_mode: NotifyMode::default(),
        }
    }
}

/// A delimited file mapping station names to board URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySource {
    /// Board variant every station in this file uses
    pub variant: BoardVariant,

    /// Path to the delimited file, relative to the config directory
    pub path: PathBuf,

    /// Field delimiter
    #[serde(default = "defaults::delimiter")]
    pub delimiter: char,

    /// Header of the station name column
    #[serde(default = "defaults::name_column")]
    pub name_column: String,

    /// Header of the board URL column
    pub url_column: String,
}

impl RegistrySource {
    fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(AppError::validation(format!(
                "registry {} delimiter must be ASCII",
                self.path.display()
            )));
        }
        if self.name_column.trim().is_empty() || self.url_column.trim().is_empty() {
            return Err(AppError::validation(format!(
                "registry {} needs name_column and url_column",
                self.path.display()
            )));
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// SMTP relay settings. The password is read from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    #[serde(default = "defaults::smtp_port")]
    pub port: u16,

    pub username: String,

    /// Name of the environment variable holding the SMTP password
    #[serde(default = "defaults::smtp_password_env")]
    pub password_env: String,

    /// Sender mailbox, e.g. `Arrivals <alerts@example.com>`
    pub from: String,
}

mod defaults {
    use std::path::PathBuf;

    use super::RegistrySource;
    use crate::models::BoardVariant;

    // Fetcher defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; arrival-alerts/0.1)".into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Board defaults
    pub fn timezone() -> String {
        "Europe/Madrid".into()
    }

    // Scheduler defaults
    pub fn poll_interval() -> u64 {
        60
    }
    pub fn threshold() -> u32 {
        10
    }

    // Registry defaults
    pub fn delimiter() -> char {
        ';'
    }
    pub fn name_column() -> String {
        "Denominació / Denominación".into()
    }
    pub fn registries() -> Vec<RegistrySource> {
        vec![
            RegistrySource {
                variant: BoardVariant::Subway,
                path: PathBuf::from("fgv-bocas.csv"),
                delimiter: delimiter(),
                name_column: name_column(),
                url_column: "Pròximes Arribades / Próximas llegadas".into(),
            },
            RegistrySource {
                variant: BoardVariant::Bus,
                path: PathBuf::from("emt.csv"),
                delimiter: delimiter(),
                name_column: name_column(),
                url_column: "Pròximes Arribades / Proximas Llegadas".into(),
            },
        ]
    }

    pub fn log_level() -> String {
        "info".into()
    }

    // SMTP defaults
    pub fn smtp_port() -> u16 {
        587
    }
    pub fn smtp_password_env() -> String {
        "SMTP_PASSWORD".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.fetcher.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.scheduler.default_threshold_minutes = 61;
        assert!(config.validate().is_err());
        config.scheduler.default_threshold_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_timezone() {
        let mut config = Config::default();
        config.board.timezone = "Mars/Olympus".to_string();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scheduler]
            poll_interval_secs = 30
            notify_mode = "digest"

            [[registries]]
            variant = "bus"
            path = "stops.csv"
            url_column = "board"
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.scheduler.notify_mode, NotifyMode::Digest);
        assert_eq!(config.scheduler.default_threshold_minutes, 10);
        assert_eq!(config.fetcher.timeout_secs, 15);
        assert_eq!(config.registries.len(), 1);
        assert_eq!(config.registries[0].delimiter, ';');
        assert!(config.registry_for(BoardVariant::Subway).is_none());
        assert!(config.registry_for(BoardVariant::Bus).is_some());
        assert!(config.validate().is_ok());
    }
}
