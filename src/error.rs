// src/error.rs

//! Unified error handling for the arrival board and alert services.

use std::fmt;

use thiserror::Error;

use crate::models::BoardVariant;

/// Result type alias for arrival operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or a request failed outside a board fetch
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Delimited registry file could not be read
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Board could not be fetched (network, timeout or non-2xx status)
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Board document could not be read as markup at all
    #[error("Parse error: {0}")]
    Parse(String),

    /// Notification could not be delivered
    #[error("Delivery to {address} failed: {message}")]
    Delivery { address: String, message: String },

    /// Station name is not present in the registry
    #[error("Unknown {variant} station: {name}")]
    UnknownStation { variant: BoardVariant, name: String },

    /// Station registry could not be loaded
    #[error("Registry error: {0}")]
    Registry(String),

    /// No active subscription with that id
    #[error("Subscription {0} not found")]
    SubscriptionNotFound(u64),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for a board URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a delivery error for a subscriber address.
    pub fn delivery(address: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Delivery {
            address: address.into(),
            message: message.to_string(),
        }
    }

    /// Create a registry loading error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry(message.into())
    }

    /// Whether the error is transient and the next polling cycle may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Delivery { .. } | Self::Parse(_))
    }
}
